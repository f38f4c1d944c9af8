use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaphorError {
    #[error("Framework '{0}' not found")]
    UnknownFramework(String),
    #[error("Framework '{0}' has no mapped elements to render")]
    EmptyFramework(String),
}
