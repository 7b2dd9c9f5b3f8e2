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

use crate::traits::loggable::Warnable;

/// Trait for converting foreign errors into [`crate::Error`] types.
///
/// Implemented for [`std::result::Result`], converting the contained error
/// into a [`crate::Error`] while automatically capturing it as the source.
///
/// This is only for errors originating outside our system. Errors that are
/// already a [`crate::Error`] are propagated with
/// [`PropagateError`][crate::traits::PropagateError] instead.
pub trait ForeignError<T, S, E>
where
    S: std::error::Error + Send + Sync + 'static,
    E: crate::ArxError,
{
    /// Maps a `Result<T, S>` to `Result<T, crate::Error<E>>`.
    ///
    /// The [Ok] variant is left untouched. The error `E` is wrapped inside a
    /// [`crate::Error`], with the [Err] value as its source.
    fn foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;

    /// Maps a `Result<T, S>` to `Result<T, crate::Error<E>>`, choosing the
    /// error by inspecting the received error value `S`.
    fn match_foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> ForeignError<T, S, E> for std::result::Result<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
    E: crate::ArxError,
{
    #[track_caller]
    fn foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_source(f(), source))
            .log_warn(*std::panic::Location::caller())
    }

    #[track_caller]
    fn match_foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_source(f(&source), source))
            .log_warn(*std::panic::Location::caller())
    }
}

/// Trait for converting boxed foreign errors into [`crate::Error`] types.
///
/// This is [`ForeignError`] for results whose error type is already erased to
/// `Box<dyn std::error::Error + Send + Sync>`, as returned by the capability
/// traits.
pub trait ForeignBoxed<T, E>
where
    E: crate::ArxError,
{
    /// Maps a `Result<T, Box<dyn Error + Send + Sync>>` to
    /// `Result<T, crate::Error<E>>`, with the boxed error as the source.
    fn foreign_boxed_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;
}

impl<T, E> ForeignBoxed<T, E> for std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    E: crate::ArxError,
{
    #[track_caller]
    fn foreign_boxed_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_boxed_source(f(), source))
            .log_warn(*std::panic::Location::caller())
    }
}
