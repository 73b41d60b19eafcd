use rand::Rng;

use crate::pipeline::{Step, TrigCondition};
use crate::shared::MAX_PROBABILITY;

/// What a condition gets to look at for one step on one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConditionContext {
    /// Completed loops of this track's pattern since the transport started.
    pub repeat_count: u64,
    /// Fill is active for this step.
    pub fill: bool,
    /// The next step is the first one of a scheduled fill.
    pub pre_fill: bool,
}

pub fn condition_passes(condition: Option<TrigCondition>, cx: &ConditionContext) -> bool {
    match condition.map(TrigCondition::normalized) {
        None | Some(TrigCondition::Always) => true,
        Some(TrigCondition::Ratio { a, b }) => ratio_hits(cx.repeat_count, a, b),
        Some(TrigCondition::InverseRatio { a, b }) => !ratio_hits(cx.repeat_count, a, b),
        Some(TrigCondition::Fill) => cx.fill,
        Some(TrigCondition::NotFill) => !cx.fill,
        Some(TrigCondition::Pre) => cx.pre_fill,
        Some(TrigCondition::NotPre) => !cx.pre_fill,
    }
}

fn ratio_hits(repeat_count: u64, a: u8, b: u8) -> bool {
    repeat_count % b as u64 == (a - 1) as u64
}

/// Rolls against `probability` percent. A sure thing doesn't touch the rng,
/// so adding a 100% step never shifts the random sequence of the others.
pub fn probability_passes(probability: u8, rng: &mut impl Rng) -> bool {
    if probability >= MAX_PROBABILITY {
        return true;
    }
    if probability == 0 {
        return false;
    }
    rng.gen_range(0..MAX_PROBABILITY) < probability
}

/// Condition first, probability second; the step sounds only if both pass.
pub fn should_fire(step: &Step, cx: &ConditionContext, rng: &mut impl Rng) -> bool {
    step.active && condition_passes(step.condition, cx) && probability_passes(step.probability, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(repeat_count: u64) -> ConditionContext {
        ConditionContext { repeat_count, ..ConditionContext::default() }
    }

    #[test]
    fn ratio_one_of_two_partitions_repeats() {
        for r in 0..64 {
            let a = condition_passes(Some(TrigCondition::ratio(1, 2)), &at(r));
            let b = condition_passes(Some(TrigCondition::inverse_ratio(1, 2)), &at(r));
            assert!(a ^ b, "repeat {r}: ratio={a} inverse={b}");
            assert_eq!(a, r % 2 == 0);
        }
    }

    #[test]
    fn every_ratio_partitions_repeats() {
        for b in 1..=8u8 {
            for a in 1..=b {
                let hits = (0..(b as u64 * 4))
                    .filter(|&r| condition_passes(Some(TrigCondition::ratio(a, b)), &at(r)))
                    .count();
                assert_eq!(hits, 4, "{a}:{b}");
                for r in 0..(b as u64 * 4) {
                    let fwd = condition_passes(Some(TrigCondition::ratio(a, b)), &at(r));
                    let inv = condition_passes(Some(TrigCondition::inverse_ratio(a, b)), &at(r));
                    assert_ne!(fwd, inv);
                }
            }
        }
    }

    #[test]
    fn three_of_four() {
        let cond = Some(TrigCondition::ratio(3, 4));
        let fired: Vec<u64> = (0..12).filter(|&r| condition_passes(cond, &at(r))).collect();
        assert_eq!(fired, vec![2, 6, 10]);
    }

    #[test]
    fn fill_and_pre_follow_context() {
        let fill = ConditionContext { fill: true, ..ConditionContext::default() };
        let pre = ConditionContext { pre_fill: true, ..ConditionContext::default() };
        let plain = ConditionContext::default();
        assert!(condition_passes(Some(TrigCondition::Fill), &fill));
        assert!(!condition_passes(Some(TrigCondition::Fill), &plain));
        assert!(condition_passes(Some(TrigCondition::NotFill), &plain));
        assert!(condition_passes(Some(TrigCondition::Pre), &pre));
        assert!(!condition_passes(Some(TrigCondition::NotPre), &pre));
        assert!(condition_passes(Some(TrigCondition::Always), &plain));
        assert!(condition_passes(None, &plain));
    }

    #[test]
    fn probability_extremes_and_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..100).all(|_| probability_passes(100, &mut rng)));
        assert!((0..100).all(|_| !probability_passes(0, &mut rng)));
        let hits = (0..10_000).filter(|_| probability_passes(25, &mut rng)).count();
        assert!((2_000..3_000).contains(&hits), "{hits}");
    }

    #[test]
    fn failed_condition_skips_the_roll() {
        // the rng is only consumed once the condition passes
        let step = Step::on().with_probability(50).with_condition(TrigCondition::Fill);
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert!(!should_fire(&step, &ConditionContext::default(), &mut a));
        assert_eq!(a.gen_range(0..1000), b.gen_range(0..1000));
    }
}
