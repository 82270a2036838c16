use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PtrError {
    #[error("pointer is null")]
    Null,
    #[error("value is shared between {count} handles")]
    Shared { count: usize }
}
