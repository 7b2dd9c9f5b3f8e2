// Copyright (C) 2023-2026  The Arx Project Developers.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the error handling system used across all of the Arx
//! Rust code.
//!
//! Constructed errors are automatically logged as warnings, and carry the
//! backtrace of source errors with them, along with extra context if any.
//!
//! # Details
//!
//! Use `std::result::Result<T, arxerror::Error<E>>`, or equivalently
//! `arxerror::Result<T, E>`, as the return type of fallible functions.
//!
//! The error type `E` in `arxerror::Error<E>` must implement the [`ArxError`]
//! trait, so every concrete error enum in our crates implements [`ArxError`].
//!
//! The initial, root error is constructed via [`Error::root`], which also
//! logs a warning.
//!
//! Error types that are not defined by us, i.e. implement
//! [`std::error::Error`] but not [`ArxError`], are "foreign errors" and are
//! converted & propagated via the [`ForeignError`][traits::ForeignError]
//! trait (or [`ForeignBoxed`][traits::ForeignBoxed] for boxed ones).
//!
//! Propagating an `arxerror::Error<E>` into another error type is done via
//! the [`PropagateError`][traits::PropagateError] trait instead of plain `?`,
//! so the trace of source errors is preserved.
//!
//! Additional context is attached with [`Error::ctx`], or with the
//! [`ErrorContext`][traits::ErrorContext] extension on [`Result`].
//!
//! # Examples
//!
//! ```
//! use arxerror::traits::{ErrorContext, ForeignError, PropagateError};
//!
//! enum ParseError {
//!     Negative,
//!     NotANumber,
//! }
//!
//! impl std::fmt::Display for ParseError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         match self {
//!             ParseError::Negative => write!(f, "ParseError::Negative"),
//!             ParseError::NotANumber => write!(f, "ParseError::NotANumber"),
//!         }
//!     }
//! }
//!
//! impl arxerror::ArxError for ParseError {}
//!
//! fn parse_non_negative(s: &str) -> arxerror::Result<i32, ParseError> {
//!     let num: i32 = s
//!         .parse()
//!         // Propagate a foreign error, logging it as a warning.
//!         .foreign_err(|| ParseError::NotANumber)
//!         // Attach context to the error.
//!         .ctx(|| format!("parsing {s}"))?;
//!     if num < 0 {
//!         // Construct and log the root error.
//!         Err(arxerror::Error::root(ParseError::Negative))
//!     } else {
//!         Ok(num)
//!     }
//! }
//!
//! struct ConfigError;
//!
//! impl std::fmt::Display for ConfigError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "ConfigError")
//!     }
//! }
//!
//! impl arxerror::ArxError for ConfigError {}
//!
//! fn read_config() -> arxerror::Result<(), ConfigError> {
//!     // Propagate `ParseError` as the source error for `ConfigError`.
//!     parse_non_negative("blah").with_err(|| ConfigError)?;
//!     Ok(())
//! }
//! ```

use crate::traits::loggable::Warnable;

mod display;
pub mod traits;

/// The trait required for compatibility with the [`Error`] wrapper.
pub trait ArxError: std::fmt::Display + Send + Sync + 'static {}

// This impl covers all boxed error types, including `dyn ArxError`.
impl<E: ArxError + ?Sized> ArxError for Box<E> {}

trait KnownError: std::error::Error + Send + Sync {
    fn as_err(&self) -> &(dyn std::error::Error + 'static);
}

impl<T> KnownError for Error<T>
where
    T: ArxError,
{
    fn as_err(&self) -> &(dyn std::error::Error + 'static) {
        self
    }
}

enum ErrorSource {
    KnownError(Box<dyn KnownError>),
    ForeignError(Box<dyn std::error::Error + Send + Sync>),
}

/// The wrapper used for all errors in the Arx crates.
///
/// It wraps concrete error enums which model the different error groups;
/// those enums implement [`ArxError`] and must *not* implement
/// [`std::error::Error`] themselves, as that is handled here.
///
/// The wrapper keeps track of the whole error chain, as well as any context
/// attached along the way, and renders both in its [`std::fmt::Debug`]
/// output.
pub struct Error<E>
where
    E: ArxError,
{
    /// The concrete error variant.
    pub error: E,
    /// The optional contexts attached to the error.
    context: Vec<Box<dyn std::fmt::Display + Send + Sync>>,
    /// The error source, for backtracing errors.
    source: Option<ErrorSource>,
}

/// The [`std::result::Result`] alias that wraps the error into [`Error`].
pub type Result<T, E> = std::result::Result<T, Error<E>>;

impl<E> Error<E>
where
    E: ArxError,
{
    /// Create a root error (one without a source) and log a warning.
    ///
    /// Use this where an error condition is first detected. Do *not* use it
    /// to propagate another error, as the error chain would be lost; use a
    /// method from [`traits::ForeignError`] or [`traits::PropagateError`]
    /// instead.
    #[track_caller]
    pub fn root(error: E) -> Self {
        Self {
            error,
            context: Vec::new(),
            source: None,
        }
        .log_warn(*std::panic::Location::caller())
    }

    /// Creates an error whose source is a foreign (unknown) error.
    fn from_foreign_source<S>(error: E, source: S) -> Self
    where
        S: std::error::Error + Send + Sync + 'static,
    {
        Self {
            error,
            context: Vec::new(),
            source: Some(ErrorSource::ForeignError(Box::new(source))),
        }
    }

    /// Creates an error whose source is another known error.
    fn from_known_source<S>(error: E, source: S) -> Self
    where
        S: KnownError + 'static,
    {
        Self {
            error,
            context: Vec::new(),
            source: Some(ErrorSource::KnownError(Box::new(source))),
        }
    }

    /// Creates an error whose source is a boxed foreign error of a type not
    /// known at compile time.
    fn from_foreign_boxed_source(
        error: E,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            error,
            context: Vec::new(),
            source: Some(ErrorSource::ForeignError(source)),
        }
    }

    /// Attaches additional context to the error and returns it.
    ///
    /// Takes ownership of `self` so the method can be chained; context can be
    /// added multiple times and every context is retained.
    pub fn ctx<C>(mut self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.context.push(Box::new(context));
        self
    }
}

// Make the wrapper a std::error::Error type.
impl<E> std::error::Error for Error<E>
where
    E: ArxError,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| match source {
            ErrorSource::KnownError(source) => source.as_ref().as_err(),
            // Cast from (Error + Send + Sync) to (Error + 'static).
            ErrorSource::ForeignError(source) => source.as_ref() as _,
        })
    }
}
