/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by value validation and gateway writes.
///
/// `Unsupported` is an expected capability miss and callers skip past it;
/// `WriteFailed` is the only variant surfaced as a user-visible error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed value, rejected before any write is attempted.
    #[error("percent value {0} outside 0..=100")]
    InvalidRange(u8),

    /// The backing setting does not exist on this device.
    #[error("backing setting absent on this device")]
    NotFound,

    /// The write path is not available on this device tier.
    #[error("write path not supported on this device tier")]
    Unsupported,

    /// A write at the authoritative tier failed.
    #[error("setting write failed: {0}")]
    WriteFailed(String),
}
