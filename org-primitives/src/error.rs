//! Shared error definitions for governance primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the governance runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating governance primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided identifier could not be parsed.
    #[error("invalid identifier: {source}")]
    InvalidId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A permission tier name did not match any known tier.
    #[error("unknown permission tier `{name}`")]
    UnknownTier {
        /// The offending tier name.
        name: String,
    },

    /// A severity name did not match any known severity.
    #[error("unknown severity `{name}`")]
    UnknownSeverity {
        /// The offending severity name.
        name: String,
    },
}
