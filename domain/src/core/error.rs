//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid safety rule: {0}")]
    InvalidSafetyRule(String),

    #[error("Invalid rubric '{0}': {1}")]
    InvalidRubric(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DomainError::InvalidSafetyRule("bad regex".to_string());
        assert_eq!(error.to_string(), "Invalid safety rule: bad regex");
    }

    #[test]
    fn test_rubric_error_display() {
        let error = DomainError::InvalidRubric("Safety".to_string(), "no dimensions".to_string());
        assert_eq!(error.to_string(), "Invalid rubric 'Safety': no dimensions");
    }
}
