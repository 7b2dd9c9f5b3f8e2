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

/// Extension trait for attaching context to errors within [`crate::Result`].
///
/// The errors stay the same, but are enriched with additional explanations
/// rendered in their debug output.
pub trait ErrorContext<T, E>
where
    E: crate::ArxError,
{
    /// Attaches context to the [Err] variant, leaving the rest untouched.
    ///
    /// The context is lazily evaluated.
    fn ctx<C, F>(self, f: F) -> crate::Result<T, E>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for crate::Result<T, E>
where
    E: crate::ArxError,
{
    fn ctx<C, F>(self, f: F) -> crate::Result<T, E>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| error.ctx(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorContext as _;

    #[derive(Debug, PartialEq)]
    struct DummyError;

    impl std::fmt::Display for DummyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "DummyError")
        }
    }

    impl crate::ArxError for DummyError {}

    #[test]
    fn ctx_is_attached_only_on_err() {
        let ok: crate::Result<(), DummyError> = Ok(());
        assert!(ok.ctx(|| "some error context").is_ok());

        let err: crate::Result<(), DummyError> = Err(crate::Error::root(DummyError));
        let err = err.ctx(|| "some error context").unwrap_err();
        assert!(format!("{err:?}").contains("some error context"));
    }
}
