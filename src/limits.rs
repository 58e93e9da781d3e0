//! Defensive caps. Requests beyond these fail with `EngineError::LimitExceeded`.

pub const MAX_SPACES_PER_TENANT: usize = 10_000;
pub const MAX_WINDOWS_PER_SPACE: usize = 64;
pub const MAX_BLOCKS_PER_SPACE: usize = 4_096;
pub const MAX_RULES_PER_SPACE: usize = 256;
pub const MAX_RESERVATIONS_PER_SPACE: usize = 100_000;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_REASON_LEN: usize = 1_024;
pub const MAX_RULE_KEY_LEN: usize = 128;
pub const MAX_RULE_VALUE_LEN: usize = 1_024;

/// Timestamps must be non-negative and before the year 3000.
pub const MIN_VALID_TIMESTAMP_MS: i64 = 0;
pub const MAX_VALID_TIMESTAMP_MS: i64 = 32_503_680_000_000;

/// No single reservation or block may span more than 90 days.
pub const MAX_SPAN_DURATION_MS: i64 = 90 * 24 * 3_600_000;

/// How long an operation waits for a space's booking lock before failing
/// with the retryable `LockTimeout`.
pub const LOCK_TIMEOUT_MS: u64 = 2_000;

pub const MAX_TENANTS: usize = 1_024;
pub const MAX_TENANT_NAME_LEN: usize = 256;
