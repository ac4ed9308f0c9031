//! Shared constants for the predictd service
//!
//! Centralizes protocol symbols and defaults so the session handler, the
//! codec and the configuration layer agree on them.

/// Protocol symbols exchanged on the wire
pub mod protocol {
    /// A line holding only this symbol ends the current protocol phase
    pub const TERMINATOR: &str = ".";

    /// Prefix of every error line sent to a client
    pub const ERROR_PREFIX: &str = "ERROR";

    /// Version of the reply schema (`index`, `dist`, `label`, in that order)
    pub const WIRE_VERSION: u32 = 1;

    /// Upper bound on a single inbound line (1 MiB)
    pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;
}

/// Maximum size limits
pub mod limits {
    /// Maximum size for a single model file (256MB)
    /// Also bounds what the bincode decoder may allocate for one document
    pub const MAX_MODEL_FILE_SIZE: u64 = 256 * 1024 * 1024;
}

/// Network defaults
pub mod network {
    /// Port used when none is given on the command line or in configuration
    pub const DEFAULT_PORT: u16 = 9100;

    /// Listen on all interfaces unless configured otherwise
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    /// Name announced in the handshake welcome line
    pub const DEFAULT_SERVICE_NAME: &str = "predictd";
}

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PREDICTD";
