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

use arx_jws_utils::SigningAlgorithm;

/// Format error related to parsing the SD-JWT wire strings.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum FormatError {
    /// Error indicating that a Combined Format for Issuance string is
    /// malformed.
    #[strum(to_string = "Malformed Combined Format for Issuance")]
    MalformedCfi,

    /// Error indicating that a Combined Format for Presentation string is
    /// malformed.
    #[strum(to_string = "Malformed Combined Format for Presentation")]
    MalformedCfp,

    /// Error indicating that the issuer-signed JWT is not parsable.
    #[strum(to_string = "Provided JWT is not parsable")]
    NonParseableJwt,

    /// Error indicating that a disclosure string is in an invalid format.
    #[strum(to_string = "Invalid disclosure: {0}")]
    InvalidDisclosure(String),
}

impl arxerror::ArxError for FormatError {}

/// Error type for signature-related issues in SD-JWTs.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SignatureError {
    /// Error indicating that the JWT signature is invalid.
    #[strum(to_string = "Invalid Jwt signature")]
    InvalidJwtSignature,

    /// Error indicating that the configured signature verifier does not
    /// support the algorithm alleged by the JWT header.
    #[strum(to_string = "Missing signature verifier for algorithm {0}")]
    MissingSignatureVerifier(SigningAlgorithm),
}

impl arxerror::ArxError for SignatureError {}

/// Result type used across the crate.
pub type Result<T, E> = arxerror::Result<T, E>;
