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

//! The tilde-delimited on-wire formats of SD-JWTs: assembly and splitting of
//! the Combined Format for Issuance and the Combined Format for Presentation.

use arxerror::Error;

use crate::error::FormatError;

pub(crate) const SEGMENT_DELIMITER: &str = "~";

/// The Combined Format for Issuance, as sent from an issuer to a holder.
///
/// On the wire:
/// `<Issuer-signed JWT>~<Disclosure 1>~…~<Disclosure N>~`.
///
/// The trailing tilde is mandatory, including with zero disclosures
/// (`<Issuer-signed JWT>~`). Parsing performs no validation beyond the
/// segment structure, e.g. there is no check of the JWT signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedFormatForIssuance {
    pub(crate) jwt: String,
    pub(crate) disclosures: Vec<String>,
}

impl CombinedFormatForIssuance {
    pub(crate) fn new(jwt: String, disclosures: Vec<String>) -> Self {
        Self { jwt, disclosures }
    }

    /// The issuer-signed JWT segment, in JWS compact serialization.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The disclosure segments, verbatim as received.
    pub fn disclosures(&self) -> &[String] {
        &self.disclosures
    }
}

/// The Combined Format for Presentation, as sent from a holder to a verifier.
///
/// On the wire:
/// `<Issuer-signed JWT>~<Disclosure i>~…~<Holder-binding JWT>`.
///
/// A trailing tilde indicates the absence of a holder-binding JWT; a final
/// non-empty segment not followed by a tilde is the holder-binding JWT.
/// Parsing performs no validation beyond the segment structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedFormatForPresentation {
    pub(crate) jwt: String,
    pub(crate) disclosures: Vec<String>,
    pub(crate) holder_binding_jwt: Option<String>,
}

impl CombinedFormatForPresentation {
    pub(crate) fn new(
        jwt: String,
        disclosures: Vec<String>,
        holder_binding_jwt: Option<String>,
    ) -> Self {
        Self {
            jwt,
            disclosures,
            holder_binding_jwt,
        }
    }

    /// The issuer-signed JWT segment, in JWS compact serialization.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The disclosure segments, verbatim as received.
    pub fn disclosures(&self) -> &[String] {
        &self.disclosures
    }

    /// The holder-binding JWT, if one is present.
    pub fn holder_binding_jwt(&self) -> Option<&str> {
        self.holder_binding_jwt.as_deref()
    }
}

/// Splits the common `<jwt>~<disclosure>~…` prefix; `segments` must not
/// include the final segment (empty or holder binding).
fn split_jwt_and_disclosures(
    segments: &[&str],
    error: FormatError,
) -> Result<(String, Vec<String>), Error<FormatError>> {
    let Some((jwt, disclosures)) = segments.split_first() else {
        return Err(Error::root(error));
    };

    if jwt.is_empty() || disclosures.iter().any(|segment| segment.is_empty()) {
        return Err(Error::root(error));
    }

    let disclosures = disclosures.iter().map(|&s| s.to_owned()).collect();

    Ok((jwt.to_string(), disclosures))
}

impl std::str::FromStr for CombinedFormatForIssuance {
    type Err = Error<FormatError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !value.ends_with(SEGMENT_DELIMITER) {
            return Err(Error::root(FormatError::MalformedCfi));
        }
        let segments: Vec<&str> = value.split(SEGMENT_DELIMITER).collect();

        // The final segment is the empty string collected after the required
        // trailing delimiter.
        debug_assert!(segments.last().unwrap().is_empty());
        let (jwt, disclosures) =
            split_jwt_and_disclosures(&segments[0..segments.len() - 1], FormatError::MalformedCfi)?;

        Ok(Self::new(jwt, disclosures))
    }
}

impl std::str::FromStr for CombinedFormatForPresentation {
    type Err = Error<FormatError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = value.split(SEGMENT_DELIMITER).collect();

        if segments.len() < 2 {
            return Err(Error::root(FormatError::MalformedCfp));
        }

        let last = segments[segments.len() - 1];
        let holder_binding_jwt = (!last.is_empty()).then(|| last.to_owned());

        let (jwt, disclosures) =
            split_jwt_and_disclosures(&segments[0..segments.len() - 1], FormatError::MalformedCfp)?;

        Ok(Self::new(jwt, disclosures, holder_binding_jwt))
    }
}

impl std::fmt::Display for CombinedFormatForIssuance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.jwt, SEGMENT_DELIMITER)?;

        for disclosure in &self.disclosures {
            write!(f, "{}{}", disclosure, SEGMENT_DELIMITER)?;
        }

        Ok(())
    }
}

impl std::fmt::Display for CombinedFormatForPresentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.jwt, SEGMENT_DELIMITER)?;

        for disclosure in &self.disclosures {
            write!(f, "{}{}", disclosure, SEGMENT_DELIMITER)?;
        }

        if let Some(holder_binding_jwt) = &self.holder_binding_jwt {
            write!(f, "{}", holder_binding_jwt)?;
        }

        Ok(())
    }
}
