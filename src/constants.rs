//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Pipeline constants
pub mod pipeline {
    /// Number of analysis stages (stage 5 is the synthesis stage)
    pub const STAGE_COUNT: u8 = 5;

    /// Per-stage collaborator timeout for multi-stage runs (seconds)
    pub const STAGE_TIMEOUT_SECS: u64 = 300;

    /// Collaborator timeout for single-shot runs (seconds)
    pub const FAST_TIMEOUT_SECS: u64 = 120;

    /// Placeholder written into every field of a fallback payload
    pub const UNKNOWN: &str = "Unknown";

    /// Marker substituted into prompts when a predecessor stage has no data
    pub const NO_DATA: &str = "no data available";
}

/// Credential store constants
pub mod keystore {
    /// Length of the random salt prefix (bytes)
    pub const SALT_LEN: usize = 16;

    /// Length of the AEAD nonce stored ahead of the ciphertext (bytes)
    pub const NONCE_LEN: usize = 12;

    /// Derived key length (bytes)
    pub const KEY_LEN: usize = 32;

    /// Iterations of the salted SHA-256 key derivation
    pub const KDF_ITERATIONS: u32 = 100_000;
}

/// Filesystem layout constants
pub mod dirs {
    /// Directory the final use case documents are written to
    pub const USE_CASES: &str = "use-cases";

    /// Directory the per-call audit logs are written to
    pub const AUDIT_LOGS: &str = ".cli_outputs";

    /// Directory stage scratch data is kept under, one subdir per run
    pub const STAGE_RUNS: &str = ".dossier/runs";

    /// Credential store file name under the config directory
    pub const KEYSTORE_FILE: &str = "keys.bin";
}

/// HTTP/Network constants
pub mod network {
    /// Default API request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
