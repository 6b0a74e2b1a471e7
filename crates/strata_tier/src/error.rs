// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for tier operations.

/// An error from a tier operation.
///
/// This is an opaque error that wraps whatever the backend reported: a dropped connection,
/// a timeout, a protocol error. Use [`std::error::Error::source()`] to reach the cause.
///
/// # Example
///
/// ```
/// use strata_tier::Error;
///
/// let error = Error::from_message("connection refused");
/// assert!(error.to_string().contains("connection refused"));
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// This is the public API for creating tier errors from backend crates.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for tier operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_cause_message() {
        let error = Error::from_message("shared tier timed out");
        let display_str = format!("{error}");
        assert!(
            display_str.contains("shared tier timed out"),
            "display output should contain the cause message, got: {display_str}"
        );
    }

    #[test]
    fn error_wraps_io_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = Error::from_message(io);
        assert!(format!("{error:?}").contains("refused"));
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::from_message("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(format!("{err}").contains("expected failure"));
    }
}
