use std::error;
use std::fmt;

/// Crate-wide error type.
///
/// `DuplicateKey` is the one recoverable variant callers are expected to
/// handle; everything else signals a bug in the engine or its page store
/// and is propagated rather than panicked on (see `SPEC_FULL.md` §5/§7).
#[derive(Debug)]
pub enum Error {
    /// `insert` was called with a key already present in the tree. The
    /// tree is left unchanged.
    DuplicateKey,
    /// A structural invariant was violated while descending or mutating
    /// the tree (out-of-bounds cell index, missing child pointer, unknown
    /// node variant). Indicates a bug rather than bad input.
    InvariantViolation(String),
    /// The page store's allocator is exhausted.
    NoFreePages,
    /// Catch-all for page-store-implementation failures.
    Storage(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DuplicateKey => write!(f, "duplicate key"),
            Error::InvariantViolation(msg) => write!(f, "invariant violation: {}", msg),
            Error::NoFreePages => write!(f, "page store has no free pages"),
            Error::Storage(msg) => write!(f, "storage error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Builds a formatted `Error` variant tersely, e.g. `err!(Storage, "page {} missing", id)`.
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}

pub(crate) use err;
