//! Input validation limits for resource protection

/// Maximum nesting depth of a shape (64)
pub const MAX_SHAPE_DEPTH: usize = 64;

/// Maximum number of steps in a query path (16)
pub const MAX_PATH_LEN: usize = 16;

/// Maximum page size for edges queries (10000)
pub const MAX_PAGE_LIMIT: usize = 10_000;

/// Maximum number of statements in a single write (100000)
pub const MAX_MUTATION_STATEMENTS: usize = 100_000;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    ShapeTooDeep { depth: usize, max: usize },
    PathTooLong { len: usize, max: usize },
    PageTooLarge { limit: usize, max: usize },
    TooManyStatements { count: usize, max: usize },
    LengthTooLarge { length: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeTooDeep { depth, max } => {
                write!(f, "Shape too deep: {} levels (max {})", depth, max)
            }
            Self::PathTooLong { len, max } => {
                write!(f, "Path too long: {} steps (max {})", len, max)
            }
            Self::PageTooLarge { limit, max } => {
                write!(f, "Page too large: {} (max {})", limit, max)
            }
            Self::TooManyStatements { count, max } => {
                write!(f, "Too many statements in write: {} (max {})", count, max)
            }
            Self::LengthTooLarge { length } => {
                write!(f, "String length bound out of range: {}", length)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate shape nesting depth
pub fn validate_shape_depth(depth: usize) -> Result<(), ValidationError> {
    if depth > MAX_SHAPE_DEPTH {
        return Err(ValidationError::ShapeTooDeep {
            depth,
            max: MAX_SHAPE_DEPTH,
        });
    }
    Ok(())
}

/// Validate query path length
pub fn validate_path_len(len: usize) -> Result<(), ValidationError> {
    if len > MAX_PATH_LEN {
        return Err(ValidationError::PathTooLong {
            len,
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}

/// Validate page size; 0 means unlimited and is accepted
pub fn validate_page_limit(limit: usize) -> Result<(), ValidationError> {
    if limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::PageTooLarge {
            limit,
            max: MAX_PAGE_LIMIT,
        });
    }
    Ok(())
}

/// Validate mutation size
pub fn validate_mutation(count: usize) -> Result<(), ValidationError> {
    if count > MAX_MUTATION_STATEMENTS {
        return Err(ValidationError::TooManyStatements {
            count,
            max: MAX_MUTATION_STATEMENTS,
        });
    }
    Ok(())
}

/// Convert a string length bound to the integer compared in queries
pub fn validate_length(length: usize) -> Result<i64, ValidationError> {
    i64::try_from(length).map_err(|_| ValidationError::LengthTooLarge { length })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_shape_depth() {
        assert!(validate_shape_depth(1).is_ok());
        assert!(validate_shape_depth(MAX_SHAPE_DEPTH).is_ok());
        assert!(validate_shape_depth(MAX_SHAPE_DEPTH + 1).is_err());
    }

    #[test]
    fn test_validate_page_limit() {
        assert!(validate_page_limit(0).is_ok());
        assert!(validate_page_limit(100).is_ok());
        assert!(validate_page_limit(1_000_000).is_err());
    }

    #[test]
    fn test_validate_length() {
        assert_eq!(validate_length(12), Ok(12));
        assert_eq!(
            validate_length(usize::MAX),
            Err(ValidationError::LengthTooLarge { length: usize::MAX })
        );
    }

    #[test]
    fn test_validate_path_len() {
        assert!(validate_path_len(0).is_ok());
        assert_eq!(
            validate_path_len(20),
            Err(ValidationError::PathTooLong { len: 20, max: MAX_PATH_LEN })
        );
    }
}
