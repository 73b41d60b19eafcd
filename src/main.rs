use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::Receiver;
use tracing::{debug, info};

use grooveseq::audio::{pitch_shift, time_stretch, StretchParams, TransientOptions};
use grooveseq::audio_api::AudioCommand;
use grooveseq::generate::RandomPatternGenerator;
use grooveseq::loader::sample_loader;
use grooveseq::pipeline::{AcidMods, ParamLocks, SceneSnapshot, Step, TrigCondition};
use grooveseq::{EngineConfig, EngineContext, Middle, SystemClock};

const SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[command(name = "grooveseq")]
#[command(
    about = "Step sequencer core: plays a scene against the system clock and logs its triggers",
    long_about = None
)]
struct Cli {
    /// Engine config (JSON); defaults are used for missing keys
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene document to play instead of the built-in groove
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// WAV file to slice, stretch and pitch before playing
    #[arg(long)]
    sample: Option<PathBuf>,

    /// How long to run the transport
    #[arg(long, default_value = "4.0")]
    seconds: f64,

    #[arg(long, default_value = "120")]
    bpm: f32,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = tracing::Level::from_str(&cli.log_level)
        .with_context(|| format!("unknown log level {}", cli.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if let Some(path) = &cli.sample {
        analyse_sample(path)?;
    }

    let mut scene = match &cli.scene {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read scene {}", path.display()))?;
            SceneSnapshot::import_json(&data)
                .with_context(|| format!("bad scene {}", path.display()))?
        }
        None => demo_scene(),
    };
    if cli.scene.is_none() {
        scene.bpm = cli.bpm;
    }

    let poll = Duration::from_secs_f64(config.poll_interval_ms / 1000.0);
    let (ctx, rx) = EngineContext::with_channel(config, SystemClock::new());
    let mut middle = Middle::new(ctx, scene);
    if cli.scene.is_none() {
        middle.randomize_track(2, RandomPatternGenerator::new(0.6).with_velocity(50, 100));
    }
    info!(version = grooveseq::VERSION, bpm = middle.scheduler().bpm(), "starting");

    middle.play();
    let started = Instant::now();
    let mut triggers = 0usize;
    while started.elapsed().as_secs_f64() < cli.seconds {
        let report = middle.tick();
        triggers += drain_renderer(&rx);
        if report.poll.bars > 0 {
            debug!(triggers, positions = ?middle.scheduler().step_positions(), "bar");
        }
        std::thread::sleep(poll);
    }
    middle.stop();
    triggers += drain_renderer(&rx);

    info!(
        triggers,
        overruns = middle.scheduler().total_overruns(),
        dropped = middle.context().dropped_commands(),
        "done"
    );
    Ok(())
}

// stand-in for a renderer: log and count what arrives
fn drain_renderer(rx: &Receiver<AudioCommand>) -> usize {
    let mut n = 0;
    for cmd in rx.try_iter() {
        match cmd {
            AudioCommand::Trigger(t) => {
                n += 1;
                debug!(
                    track = t.track,
                    kind = t.kind.label(),
                    step = t.step,
                    at_ms = t.time_ms,
                    velocity = t.velocity,
                    envelope = ?t.envelope,
                    "trigger"
                );
            }
            other => debug!(?other, "renderer command"),
        }
    }
    n
}

fn analyse_sample(path: &std::path::Path) -> anyhow::Result<()> {
    let sliced = sample_loader::load_sliced(path, SAMPLE_RATE, TransientOptions::default(), 16)?;
    let buf = &sliced.buffer;
    info!(
        path = %path.display(),
        secs = buf.duration_secs(),
        onsets = sliced.onsets.len(),
        slices = sliced.slices.iter().filter(|s| s.is_some()).count(),
        "sample loaded"
    );
    let slower = time_stretch(buf, StretchParams::with_ratio(0.5));
    let fifth = pitch_shift(buf, 7.0, 0.0);
    info!(
        stretched_len = slower.len(),
        shifted_len = fifth.len(),
        peak = fifth.peak(),
        "sample processed"
    );
    Ok(())
}

fn demo_scene() -> SceneSnapshot {
    let mut scene = SceneSnapshot::default_kit();
    scene.name = "demo".into();
    scene.swing = 0.12;
    scene.humanize_ms = 3.0;

    if let Some(preset) = grooveseq::generate::preset("four on the floor") {
        preset.apply(&mut scene.tracks[0].pattern);
    }
    if let Some(preset) = grooveseq::generate::preset("offbeat") {
        preset.apply(&mut scene.tracks[1].pattern);
    }
    let ghost = Step::on().with_velocity(70).with_condition(TrigCondition::ratio(2, 2));
    scene.tracks[1].pattern.set_step(15, ghost);

    let synth = &mut scene.tracks[3].pattern;
    synth.resize(12);
    let accent = AcidMods { accent: true, ..AcidMods::default() };
    let slide = AcidMods { slide: true, ..AcidMods::default() };
    synth.set_step(0, Step::on().with_acid(accent));
    let up_a_fifth = ParamLocks { pitch: Some(7.0), ..ParamLocks::default() };
    synth.set_step(3, Step::on().with_locks(up_a_fifth).with_acid(slide));
    synth.set_step(6, Step::on().with_probability(60));
    synth.set_step(9, Step::on().with_locks(ParamLocks { ratchet: 3, ..ParamLocks::default() }));
    scene
}
