//! The error taxonomy for the whole engine.
//!
//! Every failure the engine can produce is one variant of [`Error`]. There is
//! no partial recovery inside the engine: a failing `read`/`write`/`new` call
//! aborts immediately and the caller gets one of these back.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("unknown endian `{0}`, expected `little` or `big`")]
    UnknownEndian(String),

    #[error("parameter name `{0}` shadows a reserved identifier")]
    InvalidName(String),

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("field name `{0}` collides with a reserved identifier")]
    ReservedName(String),

    #[error("parameter `{0}` was given a nil value")]
    NilParameter(String),

    #[error("missing mandatory parameter `{0}`")]
    MissingParameter(String),

    #[error("parameters `{0}` and `{1}` are mutually exclusive")]
    MutualExclusionViolation(String, String),

    #[error("validity check failed: {0}")]
    ValidityError(String),

    #[error("offset mismatch: {0}")]
    OffsetMismatch(String),

    #[error("end of stream: wanted {wanted} bytes, got {got}")]
    EndOfStream { wanted: usize, got: usize },

    #[error("could not resolve symbol `{0}`")]
    UnresolvedSymbol(String),

    #[error("no choice registered for selector `{0}`")]
    UnknownChoice(String),
}

pub type Result<T> = std::result::Result<T, Error>;
