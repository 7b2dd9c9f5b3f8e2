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

use crate::utils::VecDisplayWrapper;

/// Error type defining the ways reconstructing the disclosed claims of an
/// SD-JWT can fail.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum DecodingError {
    /// Error indicating that a disclosure of the wrong form (object member
    /// vs. array element) was referenced from a digest.
    #[strum(to_string = "Mismatched disclosure format")]
    MismatchedDisclosureFormat,

    /// Error indicating that a reserved key name is being used
    /// inappropriately.
    #[strum(to_string = "Reserved key name {0} usage")]
    ReservedKeyName(&'static str),

    /// Error indicating that a digest is not in the expected format.
    #[strum(to_string = "Malformed digest: {0}")]
    MalformedDigest(String),

    /// Error indicating that two received disclosures produce the same
    /// digest.
    #[strum(to_string = "Disclosure digest collision")]
    DigestCollision,

    /// Error indicating that the same digest appears more than once in the
    /// signed payload.
    #[strum(to_string = "Duplicated digest: {0}")]
    DuplicateDigest(String),

    /// Error indicating that received disclosures match no digest in the
    /// signed payload.
    #[strum(to_string = "Orphan disclosures: {0}")]
    OrphanDisclosures(VecDisplayWrapper<String>),

    /// Error indicating that a disclosed claim would overwrite an existing
    /// member.
    #[strum(to_string = "Claim collision on: {0}")]
    ClaimCollision(String),

    /// Error indicating that the hash algorithm name is unknown or not
    /// supported.
    #[strum(to_string = "Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl arxerror::ArxError for DecodingError {}

pub type DecodingResult<T> = arxerror::Result<T, DecodingError>;
