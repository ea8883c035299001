//! Result type alias for Dmed operations

use super::errors::DmedError;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, DmedError>;
