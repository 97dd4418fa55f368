//! Error kinds shared by every backend.

/// Everything a backend can report. `Backend` wraps a native result code
/// together with the native function that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    Invalid(String),
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("{func} failed: {code}")]
    Backend { func: &'static str, code: String },
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        let e = Error::Invalid(msg.into());
        log::error!("{e}");
        e
    }

    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        let e = Error::OutOfMemory(msg.into());
        log::error!("{e}");
        e
    }

    pub fn backend(func: &'static str, code: impl ToString) -> Self {
        let e = Error::Backend {
            func,
            code: code.to_string(),
        };
        log::error!("{e}");
        e
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        let e = Error::Unsupported(msg.into());
        log::error!("{e}");
        e
    }
}
