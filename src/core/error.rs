// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for groupflow
//!
//! Construction-time validation failures, schema lookups, cursor protocol
//! violations, expression evaluation and storage errors all share one enum.

use thiserror::Error;

/// Result type alias for groupflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for plan construction and execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Construction errors
    // =========================================================================
    /// Malformed factory arguments (bad arity, negative counts, mismatched lists)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Row of an unexpected type reached an operator
    #[error("row type mismatch: expected {expected}, got {got}")]
    RowTypeMismatch { expected: String, got: String },

    // =========================================================================
    // Schema errors
    // =========================================================================
    /// Table not found in the schema
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Index not found in the schema
    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// Group not found in the schema
    #[error("group '{0}' not found")]
    GroupNotFound(String),

    /// Column not found in a table
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Collator not registered
    #[error("collator '{0}' not found")]
    CollatorNotFound(String),

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// next() called on a cursor that was never opened
    #[error("cursor '{0}' is not open")]
    CursorNotOpen(String),

    /// open() called on a cursor that is already open
    #[error("cursor '{0}' is already open")]
    CursorAlreadyOpen(String),

    /// No binding at the requested position
    #[error("no binding at position {0}")]
    BindingNotFound(usize),

    /// Binding exists but holds a different kind of value
    #[error("binding at position {position} is not a {expected}")]
    BindingTypeMismatch {
        position: usize,
        expected: &'static str,
    },

    /// Field index outside the row
    #[error("field {index} out of range for row of {len} fields")]
    FieldOutOfRange { index: usize, len: usize },

    /// Row carries no hKey where one is required
    #[error("row of type {0} has no hkey")]
    MissingHKey(String),

    /// Execution was cancelled through the query context
    #[error("query cancelled")]
    Cancelled,

    /// Cannot compare NULL with non-NULL
    #[error("cannot compare NULL with non-NULL value")]
    NullComparison,

    /// Types cannot be compared or combined
    #[error("type error: {0}")]
    Type(String),

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Row with the same hKey already stored
    #[error("duplicate key {0}")]
    DuplicateKey(String),

    /// Row to update or delete is not stored
    #[error("row not found at {0}")]
    RowNotFound(String),

    /// Storage collaborator failure
    #[error("storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a row type mismatch error
    pub fn row_type_mismatch(expected: impl ToString, got: impl ToString) -> Self {
        Error::RowTypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::Type(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Returns true for errors raised while building a plan
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_)
                | Error::TableNotFound(_)
                | Error::IndexNotFound(_)
                | Error::GroupNotFound(_)
                | Error::ColumnNotFound(_)
                | Error::CollatorNotFound(_)
        )
    }

    /// Returns true for "not found" errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TableNotFound(_)
                | Error::IndexNotFound(_)
                | Error::GroupNotFound(_)
                | Error::ColumnNotFound(_)
                | Error::CollatorNotFound(_)
                | Error::RowNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::invalid_argument("limit < 0").to_string(),
            "invalid argument: limit < 0"
        );
        assert_eq!(
            Error::TableNotFound("customer".to_string()).to_string(),
            "table 'customer' not found"
        );
        assert_eq!(
            Error::BindingNotFound(3).to_string(),
            "no binding at position 3"
        );
        assert_eq!(
            Error::BindingTypeMismatch {
                position: 1,
                expected: "row"
            }
            .to_string(),
            "binding at position 1 is not a row"
        );
        assert_eq!(
            Error::row_type_mismatch("order", "item").to_string(),
            "row type mismatch: expected order, got item"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::invalid_argument("x").is_construction_error());
        assert!(Error::IndexNotFound("i".to_string()).is_construction_error());
        assert!(!Error::Cancelled.is_construction_error());

        assert!(Error::RowNotFound("[1:(1)]".to_string()).is_not_found());
        assert!(!Error::storage("io").is_not_found());
    }
}
