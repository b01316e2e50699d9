//! Core types for buildinputs
//!
//! This module holds the error taxonomy shared by the analysis core and the
//! outer layers:
//! - [`BuildInputsError`] - Enumerated error types covering every failure mode
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! # Examples
//!
//! ```rust
//! use buildinputs::core::{BuildInputsError, user_friendly_error};
//!
//! fn example_operation() -> anyhow::Result<String> {
//!     Err(BuildInputsError::MissingEnvVar {
//!         name: "TARGETPLATFORM".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.suggestion.is_some());
//! }
//! ```

pub mod error;

pub use error::{BuildInputsError, ErrorContext, Result, user_friendly_error};
