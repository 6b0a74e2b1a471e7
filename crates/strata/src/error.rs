// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, sync::Arc};

use strata_tier::PatternError;

/// The result for fallible coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The fetch function supplied to `get` failed. The entry is left absent and the fetch
    /// error is available through [`std::error::Error::source`].
    Recompute,

    /// The shared tier could not be reached.
    ///
    /// Reads and writes recover from this on their own; only invalidations report it, since an
    /// unconfirmed invalidation must not look like a successful one.
    TierUnavailable,

    /// A value could not be encoded for the shared tier.
    Serialization,

    /// A key pattern was malformed. Reported before any scan starts.
    InvalidPattern,
}

/// An error returned by [`TieredCache`](crate::TieredCache) operations.
///
/// Errors are cheap to clone: concurrent callers that were collapsed onto one fetch all
/// receive the same failure.
///
/// # Examples
///
/// ```
/// use strata::ErrorKind;
///
/// # fn check(error: strata::Error) {
/// match error.kind() {
///     ErrorKind::Recompute => eprintln!("fetch failed: {:?}", std::error::Error::source(&error)),
///     ErrorKind::TierUnavailable => eprintln!("shared tier down"),
///     _ => eprintln!("{error}"),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Error(ErrorDetail);

#[derive(Debug, Clone, thiserror::Error)]
enum ErrorDetail {
    #[error("fetch for key `{key}` failed: {cause}")]
    Recompute { key: String, cause: Cause },

    #[error("shared tier unavailable during {operation}: {cause}")]
    TierUnavailable {
        operation: &'static str,
        cause: Arc<strata_tier::Error>,
    },

    #[error("value for key `{key}` could not be serialized: {cause}")]
    Serialization { key: String, cause: Arc<serde_json::Error> },

    #[error("invalid key pattern: {0}")]
    InvalidPattern(PatternError),
}

impl Error {
    pub(crate) fn recompute(key: &str, cause: Cause) -> Self {
        Self(ErrorDetail::Recompute {
            key: key.to_string(),
            cause,
        })
    }

    pub(crate) fn tier_unavailable(operation: &'static str, cause: strata_tier::Error) -> Self {
        Self(ErrorDetail::TierUnavailable {
            operation,
            cause: Arc::new(cause),
        })
    }

    pub(crate) fn serialization(key: &str, cause: serde_json::Error) -> Self {
        Self(ErrorDetail::Serialization {
            key: key.to_string(),
            cause: Arc::new(cause),
        })
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            ErrorDetail::Recompute { .. } => ErrorKind::Recompute,
            ErrorDetail::TierUnavailable { .. } => ErrorKind::TierUnavailable,
            ErrorDetail::Serialization { .. } => ErrorKind::Serialization,
            ErrorDetail::InvalidPattern(_) => ErrorKind::InvalidPattern,
        }
    }
}

impl From<PatternError> for Error {
    fn from(error: PatternError) -> Self {
        Self(ErrorDetail::InvalidPattern(error))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            ErrorDetail::Recompute { cause, .. } => Some(cause.as_ref()),
            ErrorDetail::TierUnavailable { cause, .. } => Some(cause.as_ref()),
            ErrorDetail::Serialization { cause, .. } => Some(cause.as_ref()),
            ErrorDetail::InvalidPattern(cause) => Some(cause),
        }
    }
}
