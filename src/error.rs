//! # Error Types
//!
//! This module defines all error types for the beat-sheet engine.
//!
//! Only the document and project edges are fallible. The timing engine (clock,
//! playback sync, highlight broadcaster) never returns errors: a bad update is
//! skipped and the session keeps running.
//!
//! ## Error Types
//! - `ParseError` - Malformed beat-sheet document, with the offending line
//! - `MetadataError` - Front matter that does not deserialize or holds unknown values
//! - `UnknownSection` - Section key outside the section table
//! - `BarOutOfRange` - Write to a bar index past the section's capacity
//! - `AudioUnavailable` - Percussion output could not be triggered (never fatal)
//!
//! ## Usage
//! ```rust
//! use beatsheet::{sheet, BeatSheetError};
//!
//! match sheet::parse("---\ntitle: Demo\n") {
//!     Ok(project) => println!("Loaded {}", project.name),
//!     Err(BeatSheetError::ParseError { line, message }) => {
//!         eprintln!("Parse error at line {}: {}", line, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeatSheetError {
    /// Parse error with line information.
    ///
    /// # Example
    /// ```
    /// # use beatsheet::BeatSheetError;
    /// let err = BeatSheetError::ParseError {
    ///     line: 1,
    ///     message: "Unterminated front matter".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at line 1: Unterminated front matter");
    /// ```
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid front matter.
    ///
    /// # Example
    /// ```
    /// # use beatsheet::BeatSheetError;
    /// let err = BeatSheetError::MetadataError("drum-pattern must be 1-4".to_string());
    /// assert_eq!(err.to_string(), "Invalid metadata: drum-pattern must be 1-4");
    /// ```
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Bar {index} is out of range for section {section} ({len} bars)")]
    BarOutOfRange {
        section: String,
        index: usize,
        len: usize,
    },

    /// The audio output refused a trigger (suspended context, blocked autoplay).
    ///
    /// Sessions surface this as a notice and keep ticking.
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),
}
