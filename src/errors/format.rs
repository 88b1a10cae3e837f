use thiserror::Error;

/// Display format errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Format variant code with no known rendering rule
    #[error("Unknown format variant: {0}")]
    UnknownVariant(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant() {
        let err = FormatError::UnknownVariant(42);
        assert_eq!(err.to_string(), "Unknown format variant: 42");
    }
}
