//! Waitlist priority scoring.
//!
//! A score is `1000 + (latency mod A) + (age mod B) - (rapid mod C)`, floored
//! at zero. `A`, `B` and `C` come from a seed hashed out of stable project
//! identity data, so every process of one deployment ranks entries the same
//! way. The seed only needs to be stable, not secret.

use serde::Serialize;

use crate::constants::BASE_PRIORITY_SCORE;

/// Length in bytes of the seed (12 hex characters).
const SEED_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// The deployment-wide seed the coefficients are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectSeed([u8; SEED_LEN]);

impl ProjectSeed {
    /// Hash `identity` with BLAKE3 and keep the first six bytes.
    pub fn derive(identity: &str) -> Self {
        let hash = blake3::hash(identity.as_bytes());
        let mut bytes = [0u8; SEED_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..SEED_LEN]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ProjectSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Coefficients
// ---------------------------------------------------------------------------

/// Moduli applied to each scoring signal.
///
/// `a` is in 7..=11, `b` in 13..=19 and `c` in 3..=5 when derived from a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityCoefficients {
    pub a: u64,
    pub b: u64,
    pub c: u64,
}

impl PriorityCoefficients {
    pub fn from_seed(seed: &ProjectSeed) -> Self {
        Self {
            a: 7 + u64::from(seed.0[0] % 5),
            b: 13 + u64::from(seed.0[1] % 7),
            c: 3 + u64::from(seed.0[2] % 3),
        }
    }

    /// Shorthand for `from_seed(&ProjectSeed::derive(identity))`.
    pub fn derive(identity: &str) -> Self {
        Self::from_seed(&ProjectSeed::derive(identity))
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Inputs to a single score computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignupSignals {
    pub signup_latency_ms: u64,
    pub account_age_days: u64,
    /// Abuse signal: rapid repeated actions by the same user.
    pub rapid_actions: u32,
}

/// Pure scoring function parameterised by the deployment's coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityScorer {
    coefficients: PriorityCoefficients,
}

impl PriorityScorer {
    pub fn new(coefficients: PriorityCoefficients) -> Self {
        Self { coefficients }
    }

    /// Higher is better. Never negative.
    pub fn score(&self, signals: &SignupSignals) -> i64 {
        let PriorityCoefficients { a, b, c } = self.coefficients;

        let latency = (signals.signup_latency_ms % a.max(1)) as i64;
        let age = (signals.account_age_days % b.max(1)) as i64;
        let penalty = (u64::from(signals.rapid_actions) % c.max(1)) as i64;

        (BASE_PRIORITY_SCORE + latency + age - penalty).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> PriorityScorer {
        PriorityScorer::new(PriorityCoefficients { a: 7, b: 13, c: 3 })
    }

    #[test]
    fn test_coefficients_stay_in_range() {
        for i in 0..500 {
            let c = PriorityCoefficients::derive(&format!("deployment-{i}"));
            assert!((7..=11).contains(&c.a), "a out of range: {}", c.a);
            assert!((13..=19).contains(&c.b), "b out of range: {}", c.b);
            assert!((3..=5).contains(&c.c), "c out of range: {}", c.c);
        }
    }

    #[test]
    fn test_seed_is_deterministic() {
        let first = ProjectSeed::derive("dropspot");
        let second = ProjectSeed::derive("dropspot");
        assert_eq!(first, second);
        assert_eq!(first.to_hex().len(), 12);
        assert_ne!(first, ProjectSeed::derive("somewhere-else"));
    }

    #[test]
    fn test_score_formula() {
        let signals = SignupSignals {
            signup_latency_ms: 20, // 20 % 7 = 6
            account_age_days: 30,  // 30 % 13 = 4
            rapid_actions: 5,      // 5 % 3 = 2
        };
        assert_eq!(scorer().score(&signals), 1000 + 6 + 4 - 2);
    }

    #[test]
    fn test_score_baseline() {
        assert_eq!(scorer().score(&SignupSignals::default()), 1000);
    }

    #[test]
    fn test_rapid_actions_only_ever_lower_the_score() {
        let calm = SignupSignals {
            signup_latency_ms: 3,
            account_age_days: 3,
            rapid_actions: 0,
        };
        let busy = SignupSignals {
            rapid_actions: 2,
            ..calm
        };
        assert!(scorer().score(&busy) < scorer().score(&calm));
    }
}
