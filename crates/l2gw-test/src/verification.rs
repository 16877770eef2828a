//! Journal checks for the recording driver.

use crate::recording::RecordingDriver;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("expected driver call '{operation}' was not made")]
    MissingCall { operation: String },

    #[error("driver call '{later}' was made before '{earlier}'")]
    OutOfOrder { earlier: String, later: String },

    #[error("expected {expected} calls to '{operation}', found {actual}")]
    CallCount {
        operation: String,
        expected: usize,
        actual: usize,
    },

    #[error("driver call '{operation}' ran at transaction depth {actual:?}, expected {expected}")]
    TransactionDepth {
        operation: String,
        expected: usize,
        actual: Option<usize>,
    },
}

pub type VerifyResult<T> = Result<T, VerificationError>;

/// Assertions over a [`RecordingDriver`] journal.
pub struct JournalVerifier<'a> {
    driver: &'a RecordingDriver,
}

impl<'a> JournalVerifier<'a> {
    pub fn new(driver: &'a RecordingDriver) -> Self {
        Self { driver }
    }

    /// Checks that `operations` were each called, in this relative order.
    ///
    /// Other calls may be interleaved.
    pub fn assert_sequence(&self, operations: &[&str]) -> VerifyResult<()> {
        let journal = self.driver.operations();
        let mut cursor = 0;
        for (i, op) in operations.iter().enumerate() {
            match journal[cursor..].iter().position(|c| c == op) {
                Some(offset) => cursor += offset + 1,
                None if journal.iter().any(|c| c == op) => {
                    return Err(VerificationError::OutOfOrder {
                        earlier: operations[i.saturating_sub(1)].to_string(),
                        later: op.to_string(),
                    })
                }
                None => {
                    return Err(VerificationError::MissingCall {
                        operation: op.to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    pub fn assert_count(&self, operation: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.driver.count(operation);
        if actual != expected {
            return Err(VerificationError::CallCount {
                operation: operation.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn assert_not_called(&self, operation: &str) -> VerifyResult<()> {
        self.assert_count(operation, 0)
    }

    /// Checks every call to `operation` ran with `expected` open scopes.
    pub fn assert_tx_depth(&self, operation: &str, expected: usize) -> VerifyResult<()> {
        let calls = self.driver.calls_to(operation);
        if calls.is_empty() {
            return Err(VerificationError::MissingCall {
                operation: operation.to_string(),
            });
        }
        for call in calls {
            if call.tx_depth != Some(expected) {
                return Err(VerificationError::TransactionDepth {
                    operation: operation.to_string(),
                    expected,
                    actual: call.tx_depth,
                });
            }
        }
        Ok(())
    }
}
