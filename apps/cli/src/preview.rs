//! Synthetic metric readings for rule previews.
//!
//! Randomness lives here, in the caller, so the evaluator stays deterministic.

use plan_rules::{evaluate, AutomationRule, EvaluationResult, RuleError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reading drawn uniformly within ±50% of `threshold` (±1 around zero).
pub fn sample_near(rng: &mut ChaCha8Rng, threshold: f64) -> f64 {
    let spread = if threshold == 0.0 {
        1.0
    } else {
        threshold.abs() * 0.5
    };
    rng.gen_range(threshold - spread..=threshold + spread)
}

/// Evaluate each rule against a seeded synthetic reading.
pub fn evaluate_with_seed(
    rules: &[AutomationRule],
    seed: u64,
) -> Result<Vec<EvaluationResult>, RuleError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rules
        .iter()
        .map(|rule| {
            if !rule.threshold.is_finite() {
                return Err(RuleError::NonFiniteThreshold);
            }
            let observed = sample_near(&mut rng, rule.threshold);
            evaluate(rule, observed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_rules::ActionSpec;

    fn rule(threshold: f64) -> AutomationRule {
        AutomationRule {
            name: None,
            metric: "CPA".to_string(),
            operator: ">".to_string(),
            threshold,
            action: ActionSpec::new("pauseCampaign", None),
        }
    }

    #[test]
    fn seeded_preview_is_reproducible() {
        let rules = vec![rule(200.0), rule(0.0), rule(-10.0)];
        let a = evaluate_with_seed(&rules, 42).unwrap();
        let b = evaluate_with_seed(&rules, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn samples_stay_near_threshold() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1_000 {
            let v = sample_near(&mut rng, 200.0);
            assert!((100.0..=300.0).contains(&v));
            let z = sample_near(&mut rng, 0.0);
            assert!((-1.0..=1.0).contains(&z));
        }
    }
}
