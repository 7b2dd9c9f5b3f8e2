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

/// Trait for propagating errors that are already part of the
/// [`crate::Error`] system into a different error type.
///
/// Implemented for [`crate::Result`], converting the contained error into the
/// return-type error while capturing it as the source.
///
/// For errors from outside the system, use
/// [`ForeignError`][crate::traits::ForeignError] instead.
pub trait PropagateError<T, S, E>
where
    S: crate::ArxError,
    E: crate::ArxError,
{
    /// Maps a `Result<T, Error<S>>` to `Result<T, Error<E>>`.
    ///
    /// The [Ok] variant is left untouched. The error `E` is wrapped inside a
    /// [`crate::Error`], with the [Err] value as its source.
    fn with_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;

    /// Maps a `Result<T, Error<S>>` to `Result<T, Error<E>>`, choosing the
    /// error by inspecting the source error value `S`.
    fn match_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> PropagateError<T, S, E> for crate::Result<T, S>
where
    S: crate::ArxError,
    E: crate::ArxError,
{
    fn with_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_known_source(f(), source))
    }

    fn match_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| crate::Error::from_known_source(f(&source.error), source))
    }
}
