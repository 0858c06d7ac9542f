//! Error types for oscport

use thiserror::Error;

/// Result type alias for oscport operations
pub type Result<T> = std::result::Result<T, Error>;

/// oscport error types
///
/// Every error is local and synchronous; there is nothing to unwind and
/// nothing is logged. Variants carry `&'static str` detail rather than
/// `String` so that constructing one on the audio thread allocates nothing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Encoded data does not fit the destination buffer
    #[error("buffer too small: need {needed} bytes, have {have}")]
    Overflow { needed: usize, have: usize },

    /// Address rejected by the encoder
    #[error("invalid address: {0}")]
    BadAddress(&'static str),

    /// Type tag outside the recognized set
    #[error("unknown type tag '{0}'")]
    UnknownTag(char),

    /// Tag string does not describe the supplied arguments
    #[error("type tags do not match the supplied arguments")]
    TagMismatch,

    /// String argument contains an interior NUL byte
    #[error("embedded NUL in string argument")]
    EmbeddedNul,

    /// Transport ring has no room; the message was dropped at the writer
    #[error("link ring full, message dropped")]
    LinkFull,

    /// Message exceeds the link's configured maximum
    #[error("message too long for link: {size} > {max}")]
    TooLong { size: usize, max: usize },

    /// Buffer shorter than any complete message
    #[error("not a complete message: {size} bytes")]
    TooShort { size: usize },
}
