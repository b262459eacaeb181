use indagate_core::{BoxError, Error, ErrorCode};
use thiserror::Error;

pub type KvResult<T> = std::result::Result<T, KvError>;

/// Engine-level conditions, translated into domain errors by the stores
#[derive(Error, Debug)]
pub enum KvError {
    #[error("key not found")]
    KeyNotFound,

    #[error("bucket is not writable in a read-only transaction")]
    NotWritable,

    #[error("invalid bucket name {0:?}")]
    InvalidBucket(String),

    #[error("storage engine failure: {source}")]
    Engine {
        #[source]
        source: BoxError,
    },
}

impl KvError {
    pub fn engine<E: Into<BoxError>>(source: E) -> Self {
        KvError::Engine {
            source: source.into(),
        }
    }

    pub fn is_key_not_found(&self) -> bool {
        matches!(self, KvError::KeyNotFound)
    }
}

impl From<KvError> for Error {
    fn from(err: KvError) -> Self {
        let code = match err {
            KvError::KeyNotFound => ErrorCode::NotFound,
            _ => ErrorCode::Internal,
        };
        Error {
            code: Some(code),
            message: None,
            op: None,
            source: Some(Box::new(err)),
        }
    }
}
