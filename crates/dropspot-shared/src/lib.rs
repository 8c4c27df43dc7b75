//! # dropspot-shared
//!
//! Pure building blocks shared by the store, the engine and the HTTP binding:
//! identity types, the waitlist priority scorer and claim code generation.
//! Nothing in this crate touches storage or the clock.

pub mod claim_code;
pub mod constants;
pub mod error;
pub mod priority;
pub mod types;

pub use claim_code::{ClaimCode, ClaimCodeSource, OsRandomCodes};
pub use error::SharedError;
pub use priority::{PriorityCoefficients, PriorityScorer, ProjectSeed, SignupSignals};
pub use types::{Identity, UserId};
