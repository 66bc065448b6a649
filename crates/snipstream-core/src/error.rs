// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types surfaced by configuration and ingestion.
use thiserror::Error;

/// Rejected miner configuration. Raised at construction time only.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// `max_snippet_size` was zero.
    #[error("max snippet size must be at least 1 (got {0})")]
    MaxSnippetSize(usize),
    /// `window_size` was zero or negative.
    #[error("window size must be positive (got {0})")]
    WindowSize(i64),
    /// The view name is not one of `id`, `label`, `order`.
    #[error("unrecognized view: {0:?} (expected id, label or order)")]
    UnknownView(String),
    /// A score exponent was NaN or infinite.
    #[error("exponent {name} must be finite (got {value})")]
    Exponent {
        /// Exponent name (`alpha`, `beta`, `gamma`).
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Malformed update record or a failure reading the stream.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The record did not have 7 or 8 delimiter-separated fields.
    #[error("line {line}: expected 7 or 8 fields, found {found}")]
    FieldCount {
        /// 1-based line number.
        line: usize,
        /// Number of fields present.
        found: usize,
    },
    /// A node identifier field was empty.
    #[error("line {line}: field {field} is empty")]
    EmptyField {
        /// 1-based line number.
        line: usize,
        /// Field name.
        field: &'static str,
    },
    /// The timestamp field was not an integer.
    #[error("line {line}: invalid timestamp {value:?}")]
    Timestamp {
        /// 1-based line number.
        line: usize,
        /// Raw field text.
        value: String,
    },
    /// Reading the underlying stream failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
