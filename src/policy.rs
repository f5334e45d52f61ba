//! Per-tenant processing policy evaluation
//!
//! Decides, for one incoming evaluation, whether it is processed
//! ("sampled-in") or dropped ("sampled-out"), and whether PII redaction
//! should run. The random draw is injected so tests can supply fixed
//! sequences.

use crate::types::{EvaluationConfig, RunPolicy};
use rand::Rng;

/// Outcome of a policy decision for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Whether the evaluation proceeds to redaction and persistence
    pub process: bool,

    /// Whether PII redaction runs (independent of the sampling outcome)
    pub redact: bool,
}

/// Decide whether to process an evaluation given the tenant's config and a
/// uniform random draw in [0, 100)
///
/// Pure function of its inputs: `always` processes unconditionally,
/// `sampled` processes iff `draw <= sample_rate_pct` (clamped to 0-100).
/// A rate of 0 never processes, even for a draw of exactly 0.0; a rate of
/// 100 always does.
pub fn decide(config: &EvaluationConfig, draw: f64) -> PolicyDecision {
    let process = match config.run_policy {
        RunPolicy::Always => true,
        RunPolicy::Sampled => {
            let rate = config.clamped_sample_rate();
            rate > 0 && draw <= rate as f64
        }
    };

    PolicyDecision {
        process,
        redact: config.obfuscate_pii,
    }
}

/// Source of uniform random draws in [0, 100)
///
/// Each call must be independent; production uses the thread-local RNG,
/// tests substitute fixed sequences.
pub trait SampleSource: Send + Sync {
    fn draw_pct(&self) -> f64;
}

/// Default sample source backed by `rand::thread_rng`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSource;

impl SampleSource for ThreadRngSource {
    fn draw_pct(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..100.0)
    }
}

/// Fixed sample source for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl SampleSource for FixedSource {
    fn draw_pct(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled_config(rate: i64) -> EvaluationConfig {
        EvaluationConfig {
            run_policy: RunPolicy::Sampled,
            sample_rate_pct: rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_always_processes_regardless_of_draw() {
        let config = EvaluationConfig::default();
        for draw in [0.0, 49.9, 99.9] {
            assert!(decide(&config, draw).process);
        }
    }

    #[test]
    fn test_sampled_zero_never_processes() {
        let config = sampled_config(0);
        for draw in [0.0, 0.1, 50.0, 99.9] {
            assert!(!decide(&config, draw).process);
        }
    }

    #[test]
    fn test_sampled_hundred_always_processes() {
        let config = sampled_config(100);
        for draw in [0.0, 50.0, 99.9] {
            assert!(decide(&config, draw).process);
        }
    }

    #[test]
    fn test_sampled_threshold() {
        let config = sampled_config(50);
        assert!(decide(&config, 25.0).process);
        assert!(decide(&config, 50.0).process);
        assert!(!decide(&config, 50.1).process);
        assert!(!decide(&config, 99.0).process);
    }

    #[test]
    fn test_out_of_range_rate_clamped() {
        assert!(decide(&sampled_config(250), 99.9).process);
        assert!(!decide(&sampled_config(-5), 0.5).process);
    }

    #[test]
    fn test_redact_mirrors_config_even_when_sampled_out() {
        let mut config = sampled_config(0);
        config.obfuscate_pii = true;

        let decision = decide(&config, 50.0);
        assert!(!decision.process);
        assert!(decision.redact);
    }

    #[test]
    fn test_thread_rng_source_in_range() {
        let source = ThreadRngSource;
        for _ in 0..100 {
            let draw = source.draw_pct();
            assert!((0.0..100.0).contains(&draw));
        }
    }
}
