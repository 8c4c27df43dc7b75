/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Base value every waitlist priority score starts from
pub const BASE_PRIORITY_SCORE: i64 = 1000;

/// Identity string the priority seed is hashed from when none is configured
pub const DEFAULT_PRIORITY_SEED: &str = "dropspot|202501171430";

/// Upper bound (exclusive) of the placeholder signup latency in milliseconds
pub const SIGNUP_LATENCY_JITTER_MS: u64 = 1000;

/// Claim codes: three groups of four symbols
pub const CLAIM_CODE_GROUPS: usize = 3;
pub const CLAIM_CODE_GROUP_LEN: usize = 4;

/// Attempts at drawing an unused claim code before giving up
pub const MAX_CLAIM_CODE_ATTEMPTS: u32 = 10;
