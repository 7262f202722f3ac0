//! Error types for annwire.
//!
//! Only *fatal* conditions are represented here. A frame that fails to decode
//! or does not match the active test case is not an error anywhere in the
//! harness: decoding returns `Option` and the correlation engine discards
//! silently, since foreign traffic on the capture interfaces is expected.

use thiserror::Error;

/// Main error type for all harness operations.
#[derive(Debug, Error)]
pub enum AnnwireError {
    /// I/O error during interface or file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading the configuration file.
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error while reading the dataset or writing results.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration (bad layout, empty bindings, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A declared network interface does not exist on this host.
    #[error("network interface not found: {0}")]
    InterfaceNotFound(String),

    /// Opening a datalink channel on a declared interface failed.
    /// Fatal at startup: the harness cannot run without its interfaces.
    #[error("failed to open datalink channel on {iface}: {source}")]
    ChannelOpen {
        iface: String,
        #[source]
        source: std::io::Error,
    },

    /// A dataset row is missing a column referenced by a feature binding,
    /// or a referenced value is not an unsigned integer.
    #[error("malformed dataset row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// A dataset value does not fit the configured word size.
    #[error("value {value} in column {column} does not fit a {word_size}-bit data field")]
    ValueOutOfRange {
        column: String,
        value: u64,
        word_size: u32,
    },

    /// The capture inbox closed while the engine was still waiting.
    #[error("capture stopped while awaiting outputs")]
    CaptureStopped,

    /// Raw transmission on an interface failed.
    #[error("transmit failed on {iface}: {reason}")]
    Transmit { iface: String, reason: String },
}

/// Result type alias using AnnwireError.
pub type Result<T> = std::result::Result<T, AnnwireError>;
