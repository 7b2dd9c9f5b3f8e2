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

use arx_jws_utils::{jwt, JwkPublic, JwtVerifier as _, SignatureVerifier};
use arxerror::{
    traits::{ForeignBoxed, ForeignError},
    Error,
};
pub use jwt::claims::SecondsSinceEpoch;
use serde::{Deserialize, Serialize};
pub use serde_json::{Map, Value};

use crate::{
    error::{FormatError, Result, SignatureError},
    issuer::{SdJwtHeader, SdJwtPayload},
    utils::SD_ALG_FIELD_NAME,
};

mod disclosure;
mod error;

pub use disclosure::*;
pub use error::DecodingError;
pub(crate) use error::DecodingResult;

/// The `cnf` claim of the SD-JWT, containing the public key to bind with the
/// credential.
///
/// See the [draft] and [RFC7800] for details.
///
/// [draft]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-08#section-5.1.2
/// [RFC7800]: https://www.rfc-editor.org/rfc/rfc7800.html#section-3
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CnfClaim {
    /// Public key bound to the credential.
    pub jwk: JwkPublic,
}

/// A JSON object, i.e. a mapping from [`String`] to [`Value`].
pub type JsonObject = Map<String, Value>;

/// Panics if the argument is not a JSON object.
#[inline(always)]
pub(crate) fn into_object(value: Value) -> JsonObject {
    if let Value::Object(object) = value {
        object
    } else {
        panic!("Argument wasn't an object")
    }
}

/// Helper macro with the same syntax as [`serde_json::json`] specialized for
/// constructing JSON objects.
///
/// It will construct a more specific type ([`serde_json::Map<String,Value>`])
/// than just [`serde_json::Value`] when constructing an object, and panic if
/// the syntax is valid JSON but not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}

pub(crate) const SD: &str = "_sd";
pub(crate) const ELLIPSIS: &str = "...";
pub(crate) static RESERVED_CLAIM_NAMES: &[&str] = &[SD, SD_ALG_FIELD_NAME, ELLIPSIS];

/// Issuer-signed JWT of an SD-JWT, parsed but not yet signature-verified,
/// borrowing from the wire string it was split out of.
pub(crate) type SdJwtUnverified<'a> = jwt::Token<SdJwtHeader, SdJwtPayload, jwt::Unverified<'a>>;

/// Issuer-signed JWT of an SD-JWT with a verified signature.
pub(crate) type SdJwtVerified = jwt::Token<SdJwtHeader, SdJwtPayload, jwt::Verified>;

/// Further parse the JWT and disclosure segments of a wire string into
/// to-be-verified form.
///
/// Despite the documentation of `jwt::Token::parse_unverified` (rightfully)
/// not recommending using it (to prevent reading contents without prior
/// verification), we need it here in order to get access to the header whose
/// `alg` drives verifier selection -- and, on the holder path with no
/// verifier configured, to the claims themselves.
pub(crate) fn parse_sd_jwt<'a>(
    jwt_str: &'a str,
    disclosure_strings: &[String],
) -> Result<(SdJwtUnverified<'a>, Vec<Disclosure>), FormatError> {
    let jwt =
        jwt::Token::parse_unverified(jwt_str).foreign_err(|| FormatError::NonParseableJwt)?;

    let disclosures = disclosure_strings
        .iter()
        .cloned()
        .map(Disclosure::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((jwt, disclosures))
}

/// Verify the issuer signature of a parsed JWT against the provided
/// [`SignatureVerifier`] capability.
///
/// The `alg` header parameter is authoritative for algorithm selection: a
/// capability for a different algorithm is rejected up front rather than
/// fed a signature it cannot interpret.
///
/// The verifier receives no per-call public key; issuer trust anchors live
/// inside the capability itself.
pub(crate) fn verify_sd_jwt(
    unverified: SdJwtUnverified<'_>,
    signature_verifier: &dyn SignatureVerifier,
) -> Result<SdJwtVerified, SignatureError> {
    let alleged_signing_algorithm = unverified.header().alg;
    if signature_verifier.algorithm() != alleged_signing_algorithm {
        return Err(Error::root(SignatureError::MissingSignatureVerifier(
            alleged_signing_algorithm,
        )));
    }

    signature_verifier
        .verify_jwt_signature(unverified, None)
        .foreign_boxed_err(|| SignatureError::InvalidJwtSignature)
}
