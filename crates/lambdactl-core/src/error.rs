use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
}
