//! Error types for the memory backend

/// Errors raised by memory operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MemoryError {
    #[error("Memory not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MemoryError::NotFound("abc".into()).to_string(),
            "Memory not found: abc"
        );
        assert_eq!(
            MemoryError::Store("timeout".into()).to_string(),
            "Vector store error: timeout"
        );
    }
}
