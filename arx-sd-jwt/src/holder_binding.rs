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

//! Construction and validation of the holder-binding JWT: the second JWT of
//! a presentation, signed by the holder with the key whose public part the
//! issuer pinned in the `cnf` claim.

use arx_jws_utils::{
    jwt, JwkPublic, JwtSigner, JwtVerifier as _, SignatureVerifier, Signer, SigningAlgorithm,
};
use arxerror::{
    traits::{ForeignBoxed, ForeignError},
    Error,
};
use serde::{Deserialize, Serialize};

use crate::{
    holder::{HolderError, Result as HolderResult},
    Result, SecondsSinceEpoch,
};

/// Error type related to holder-binding JWT validation.
#[derive(strum_macros::Display, PartialEq, Debug, Clone)]
pub enum BindingError {
    /// Error indicating that the issuer payload carries no `cnf` key to
    /// verify the binding against.
    #[strum(to_string = "Missing cnf confirmation key")]
    MissingConfirmationKey,

    /// Error when the holder-binding JWT syntax is invalid.
    #[strum(to_string = "Invalid holder binding JWT syntax: {0}")]
    InvalidSyntax(String),

    /// Error when the holder-binding JWT signature does not verify against
    /// the `cnf` key.
    #[strum(to_string = "Invalid holder binding JWT signature")]
    InvalidSignature,

    /// Error when the holder-binding JWT `typ` header is not set to the
    /// expected value.
    #[strum(to_string = "Invalid holder binding JWT type {0}")]
    InvalidType(String),

    /// Error when the holder-binding JWT `iat` is too far in the past.
    #[strum(to_string = "Holder binding expired: iat is {0}, expiration offset {1} and current time {2}")]
    Expired(u64, u64, u64),

    /// Error when the holder-binding JWT `iat` lies in the future.
    #[strum(to_string = "Holder binding issued in the future: iat is {0}, current time {1}")]
    IssuedInFuture(u64, u64),

    /// Error when the holder-binding JWT nonce differs from the expected one.
    #[strum(to_string = "Invalid holder binding nonce. Provided nonce was {0}")]
    NonceMismatch(String),

    /// Error when the holder-binding JWT `aud` differs from the expected one.
    #[strum(to_string = "Invalid holder binding aud. Provided aud was `{0}`; expected `{1}`")]
    AudienceMismatch(String, String),

    /// Error when the configured signature verifier does not support the
    /// algorithm the holder-binding JWT alleges.
    #[strum(to_string = "Missing signature verifier: {0}")]
    UnsupportedAlgorithm(SigningAlgorithm),
}

impl arxerror::ArxError for BindingError {}

/// The required value of the holder-binding JWT header `typ` element, as
/// specified [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-07#section-5.3-3.1.2.1
pub(crate) const BINDING_JWT_HEADER_TYP: &str = "kb+jwt";

/// A maximum difference between the time a holder-binding JWT is verified
/// and the time it was created by the holder, expressed in seconds.
///
/// The current default is set to 5 minutes.
pub(crate) const BINDING_JWT_EXPIRATION_OFFSET: SecondsSinceEpoch = 5 * 60;

/// The contents of the holder-binding JWT requested by the verifier: a fresh
/// nonce, the verifier's identifier as the audience, and the signing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPayload {
    /// A value used to ensure the freshness of the signature.
    pub nonce: String,
    /// The intended receiver of the holder-binding JWT.
    pub audience: String,
    /// The time at which the holder-binding JWT is being issued.
    pub issued_at: SecondsSinceEpoch,
}

/// Header of the holder-binding JWT, as specified [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-07#section-5.3-3.1.1
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BindingJwtHeader {
    /// Always [`BINDING_JWT_HEADER_TYP`] on creation; validated on receipt.
    pub(crate) typ: String,

    /// A digital signature algorithm identifier.
    pub(crate) alg: SigningAlgorithm,
}

impl jwt::JoseHeader for BindingJwtHeader {
    fn algorithm_type(&self) -> jwt::AlgorithmType {
        self.alg.into()
    }
}

/// Claims of the holder-binding JWT, as specified [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-07#section-5.3-3.2.1
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BindingJwtClaims {
    /// The time at which the holder-binding JWT was issued.
    pub(crate) iat: SecondsSinceEpoch,

    /// The intended receiver of the holder-binding JWT.
    ///
    /// See also: [RFC7519](https://datatracker.ietf.org/doc/html/rfc7519#section-4.1.3)
    pub(crate) aud: String,

    /// A value used to ensure the freshness of the signature.
    pub(crate) nonce: String,
}

type BindingJwtUnverified<'a> = jwt::Token<BindingJwtHeader, BindingJwtClaims, jwt::Unverified<'a>>;
type BindingJwtVerified = jwt::Token<BindingJwtHeader, BindingJwtClaims, jwt::Verified>;

/// Creates a **signed** holder-binding JWT from the given payload, using the
/// caller's [`Signer`] capability.
///
/// The signing key must be the private counterpart of the `cnf` JWK pinned at
/// issuance; this is not verified here, the verifier enforces it.
pub(crate) fn sign_binding_jwt(
    payload: &BindingPayload,
    signer: &dyn Signer,
) -> HolderResult<String> {
    let header = BindingJwtHeader {
        typ: BINDING_JWT_HEADER_TYP.to_owned(),
        alg: signer.algorithm(),
    };
    let claims = BindingJwtClaims {
        iat: payload.issued_at,
        aud: payload.audience.clone(),
        nonce: payload.nonce.clone(),
    };

    let token_unsigned = jwt::Token::new(header, claims);
    let token_signed: jwt::Token<_, _, jwt::token::Signed> = signer
        .sign_jwt(token_unsigned)
        .foreign_boxed_err(|| HolderError::BindingSignatureFailure)?;

    Ok(token_signed.into())
}

/// Parses and validates a holder-binding JWT: signature against the
/// `cnf` public key, the `typ` header, `iat` freshness, and -- when the
/// verifier expects specific values -- the `nonce` and `aud` claims.
pub(crate) fn validate_binding_jwt(
    binding_jwt: &str,
    cnf_public_key: &JwkPublic,
    signature_verifier: &dyn SignatureVerifier,
    expected_nonce: Option<&str>,
    expected_audience: Option<&str>,
    current_time: SecondsSinceEpoch,
    leeway: SecondsSinceEpoch,
) -> Result<(), BindingError> {
    // !!! Start of direct access to not-yet-integrity-verified fields
    let token_unverified: BindingJwtUnverified = jwt::Token::parse_unverified(binding_jwt)
        .foreign_err(|| BindingError::InvalidSyntax(binding_jwt.to_string()))?;

    let alleged_signing_algorithm = token_unverified.header().alg;
    if signature_verifier.algorithm() != alleged_signing_algorithm {
        return Err(Error::root(BindingError::UnsupportedAlgorithm(
            alleged_signing_algorithm,
        )));
    }
    // !!! End of direct access to not-yet-integrity-verified fields

    let token_verified: BindingJwtVerified = signature_verifier
        .verify_jwt_signature(token_unverified, Some(cnf_public_key))
        .foreign_boxed_err(|| BindingError::InvalidSignature)?;

    validate_header(token_verified.header())?;
    validate_claims(
        token_verified.claims(),
        expected_nonce,
        expected_audience,
        current_time,
        leeway,
    )
}

/// The header is valid if its `typ` field is set to `kb+jwt`.
fn validate_header(header: &BindingJwtHeader) -> Result<(), BindingError> {
    if header.typ != BINDING_JWT_HEADER_TYP {
        return Err(Error::root(BindingError::InvalidType(header.typ.clone())));
    }

    Ok(())
}

/// The following validation steps are performed:
///   - `iat`: the creation time needs to be within an acceptable window, i.e.
///     neither in the future nor older than [`BINDING_JWT_EXPIRATION_OFFSET`],
///     both extended by the caller's `leeway`,
///   - `nonce`: it needs to match the expected one, when one is expected,
///   - `aud`: it needs to match the expected one, when one is expected.
fn validate_claims(
    claims: &BindingJwtClaims,
    expected_nonce: Option<&str>,
    expected_audience: Option<&str>,
    current_time: SecondsSinceEpoch,
    leeway: SecondsSinceEpoch,
) -> Result<(), BindingError> {
    if claims.iat > current_time + leeway {
        return Err(Error::root(BindingError::IssuedInFuture(
            claims.iat,
            current_time,
        )));
    }

    if claims.iat + BINDING_JWT_EXPIRATION_OFFSET + leeway < current_time {
        return Err(Error::root(BindingError::Expired(
            claims.iat,
            BINDING_JWT_EXPIRATION_OFFSET,
            current_time,
        )));
    }

    if let Some(expected_nonce) = expected_nonce {
        if claims.nonce != expected_nonce {
            return Err(Error::root(BindingError::NonceMismatch(
                claims.nonce.clone(),
            )));
        }
    }

    if let Some(expected_audience) = expected_audience {
        if claims.aud != expected_audience {
            return Err(Error::root(BindingError::AudienceMismatch(
                claims.aud.clone(),
                expected_audience.to_owned(),
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::symbolic_crypto::{holder_public_jwk, StubSigner, StubVerifier};

    const AUDIENCE: &str = "https://test.com/verifier";
    const NONCE: &str = "nonce";

    fn binding_payload(issued_at: SecondsSinceEpoch) -> BindingPayload {
        BindingPayload {
            nonce: NONCE.to_owned(),
            audience: AUDIENCE.to_owned(),
            issued_at,
        }
    }

    fn holder_signer() -> StubSigner {
        StubSigner::new(holder_public_jwk())
    }

    fn validate(
        binding_jwt: &str,
        expected_nonce: Option<&str>,
        expected_audience: Option<&str>,
        current_time: SecondsSinceEpoch,
    ) -> Result<(), BindingError> {
        validate_binding_jwt(
            binding_jwt,
            &holder_public_jwk(),
            &StubVerifier::default(),
            expected_nonce,
            expected_audience,
            current_time,
            0,
        )
    }

    #[test]
    fn valid_binding_jwt_passes() {
        let binding_jwt = sign_binding_jwt(&binding_payload(100), &holder_signer()).unwrap();

        validate(&binding_jwt, Some(NONCE), Some(AUDIENCE), 100).unwrap();
    }

    #[test]
    fn expectations_are_optional() {
        let binding_jwt = sign_binding_jwt(&binding_payload(100), &holder_signer()).unwrap();

        validate(&binding_jwt, None, None, 100).unwrap();
    }

    #[test]
    fn wrong_key_is_rejected() {
        // Signed by a key other than the cnf one.
        let binding_jwt = sign_binding_jwt(&binding_payload(100), &StubSigner::default()).unwrap();

        let error = validate(&binding_jwt, Some(NONCE), Some(AUDIENCE), 100).unwrap_err();
        assert_eq!(error.error, BindingError::InvalidSignature);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let mut binding_jwt = sign_binding_jwt(&binding_payload(100), &holder_signer()).unwrap();
        let last = binding_jwt.pop().unwrap();
        binding_jwt.push(if last == '0' { '1' } else { '0' });

        let error = validate(&binding_jwt, Some(NONCE), Some(AUDIENCE), 100).unwrap_err();
        assert_eq!(error.error, BindingError::InvalidSignature);
    }

    #[test]
    fn garbage_binding_jwt_is_rejected() {
        let error = validate("garbage", Some(NONCE), Some(AUDIENCE), 100).unwrap_err();
        assert!(matches!(error.error, BindingError::InvalidSyntax(_)));
    }

    #[test]
    fn stale_iat_is_rejected() {
        let binding_jwt = sign_binding_jwt(&binding_payload(100), &holder_signer()).unwrap();

        let current_time = 100 + BINDING_JWT_EXPIRATION_OFFSET + 10;
        let error = validate(&binding_jwt, Some(NONCE), Some(AUDIENCE), current_time).unwrap_err();
        assert_eq!(
            error.error,
            BindingError::Expired(100, BINDING_JWT_EXPIRATION_OFFSET, current_time)
        );
    }

    #[test]
    fn future_iat_is_rejected() {
        let binding_jwt = sign_binding_jwt(&binding_payload(200), &holder_signer()).unwrap();

        let error = validate(&binding_jwt, Some(NONCE), Some(AUDIENCE), 100).unwrap_err();
        assert_eq!(error.error, BindingError::IssuedInFuture(200, 100));
    }

    #[test]
    fn leeway_extends_the_window() {
        let binding_jwt = sign_binding_jwt(&binding_payload(200), &holder_signer()).unwrap();

        validate_binding_jwt(
            &binding_jwt,
            &holder_public_jwk(),
            &StubVerifier::default(),
            Some(NONCE),
            Some(AUDIENCE),
            100,
            100,
        )
        .unwrap();
    }

    #[test]
    fn nonce_mismatch_is_rejected() {
        let binding_jwt = sign_binding_jwt(&binding_payload(100), &holder_signer()).unwrap();

        let error = validate(&binding_jwt, Some("other-nonce"), Some(AUDIENCE), 100).unwrap_err();
        assert_eq!(error.error, BindingError::NonceMismatch(NONCE.to_owned()));
    }

    #[test]
    fn audience_mismatch_is_rejected() {
        let binding_jwt = sign_binding_jwt(&binding_payload(100), &holder_signer()).unwrap();

        let error =
            validate(&binding_jwt, Some(NONCE), Some("https://other.example"), 100).unwrap_err();
        assert_eq!(
            error.error,
            BindingError::AudienceMismatch(
                AUDIENCE.to_owned(),
                "https://other.example".to_owned()
            )
        );
    }
}
