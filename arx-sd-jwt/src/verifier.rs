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

//! The verifier side of the protocol: validating a presentation and
//! reconstructing the disclosed claims.

use arx_jws_utils::SignatureVerifier;
use arxerror::{traits::PropagateError, Error};

use crate::{
    decoder::decode_disclosed_claims,
    error::{FormatError, SignatureError},
    holder_binding::{validate_binding_jwt, BindingError},
    models::{parse_sd_jwt, verify_sd_jwt},
    CombinedFormatForPresentation, DecodingError, JsonObject, SecondsSinceEpoch,
};

/// Error type for the ways verifying a presentation can fail.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum VerifierError {
    /// Error indicating that the presentation is not in a valid format.
    #[strum(to_string = "Format error: {0}")]
    Format(FormatError),

    /// Error indicating that the issuer signature verification failed.
    #[strum(to_string = "Signature error: {0}")]
    Signature(SignatureError),

    /// Error indicating that reconstructing the disclosed claims failed.
    #[strum(to_string = "Decoding error: {0}")]
    Decoding(DecodingError),

    /// Error indicating that the JWT is not yet valid, i.e. the `nbf` (not
    /// before) claim is set to a future time.
    #[strum(to_string = "Jwt not yet valid: current time is {0}, nbf is {1}")]
    JwtNotYetValid(u64, u64),

    /// Error indicating that the JWT has expired, i.e. the `exp` (expiration)
    /// claim is set to a time in the past.
    #[strum(to_string = "Jwt expired, current time is {0}, expiration is {1}")]
    JwtExpired(u64, u64),

    /// Error indicating that holder binding was required but the presentation
    /// carries no holder-binding JWT.
    #[strum(to_string = "Missing holder binding")]
    HolderBindingMissing,

    /// Error with the holder-binding JWT.
    #[strum(to_string = "Holder binding invalid: {0}")]
    HolderBinding(BindingError),
}

impl arxerror::ArxError for VerifierError {}

/// Result type used by the [`verifier`][crate::verifier] module.
pub type Result<T> = arxerror::Result<T, VerifierError>;

/// Configuration of [`parse`].
///
/// The issuer signature verifier is required: there is deliberately no way
/// to construct options that skip signature verification on this path.
pub struct VerifierOptions<'a> {
    signature_verifier: &'a dyn SignatureVerifier,
    holder_binding_required: bool,
    expected_audience: Option<String>,
    expected_nonce: Option<String>,
    leeway: SecondsSinceEpoch,
}

impl<'a> VerifierOptions<'a> {
    /// Construct options around the mandatory issuer signature verifier.
    ///
    /// The same capability verifies the holder-binding JWT (against the
    /// `cnf` key), so it must support the algorithm the holder signs with.
    pub fn new(signature_verifier: &'a dyn SignatureVerifier) -> Self {
        Self {
            signature_verifier,
            holder_binding_required: false,
            expected_audience: None,
            expected_nonce: None,
            leeway: 0,
        }
    }

    /// Require a holder-binding JWT.
    ///
    /// Whether to require holder binding is the verifier's *policy* decision;
    /// it must never be derived from whether the presentation happens to
    /// carry a binding JWT. A presented binding is validated even when not
    /// required.
    #[must_use]
    pub fn with_holder_binding_required(mut self, required: bool) -> Self {
        self.holder_binding_required = required;
        self
    }

    /// Expect the given `aud` claim in the holder-binding JWT.
    #[must_use]
    pub fn with_expected_audience_for_holder_binding(mut self, aud: impl Into<String>) -> Self {
        self.expected_audience = Some(aud.into());
        self
    }

    /// Expect the given `nonce` claim in the holder-binding JWT.
    #[must_use]
    pub fn with_expected_nonce_for_holder_binding(mut self, nonce: impl Into<String>) -> Self {
        self.expected_nonce = Some(nonce.into());
        self
    }

    /// Allow the given clock skew, in seconds, on every time-claim check.
    #[must_use]
    pub fn with_leeway(mut self, leeway: SecondsSinceEpoch) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Verify a Combined Format for Presentation and reconstruct the disclosed
/// claims.
///
/// # Algorithm
///
/// 1. Split the presentation into the issuer-signed JWT, the disclosures,
///    and the optional holder-binding JWT.
/// 2. Verify the issuer signature.
/// 3. Validate the `nbf` and `exp` claims against `current_time`, with the
///    configured leeway.
/// 4. When holder binding is required or present: verify the binding JWT
///    signature against the issuer-pinned `cnf` key, and validate its `typ`,
///    `iat`, `nonce` and `aud`.
/// 5. Reconstruct the claims: every digest with a matching disclosure is
///    replaced by the disclosed member; digests without disclosures are
///    dropped (those claims simply were not disclosed); disclosures without
///    digests are an error.
///
/// The returned object contains the registered JWT claims in the clear plus
/// every disclosed claim, with all SD-JWT bookkeeping (`_sd`, `_sd_alg`)
/// removed.
pub fn parse(
    combined_presentation: &str,
    current_time: SecondsSinceEpoch,
    options: VerifierOptions<'_>,
) -> Result<JsonObject> {
    let cfp: CombinedFormatForPresentation = combined_presentation
        .parse()
        .match_err(|error: &FormatError| VerifierError::Format(error.clone()))?;

    let (unverified_jwt, disclosures) = parse_sd_jwt(&cfp.jwt, &cfp.disclosures)
        .match_err(|error: &FormatError| VerifierError::Format(error.clone()))?;

    let verified_jwt = verify_sd_jwt(unverified_jwt, options.signature_verifier)
        .match_err(|error| VerifierError::Signature(error.clone()))?;
    let payload = verified_jwt.claims();

    validate_time_claims(payload, current_time, options.leeway)?;

    match cfp.holder_binding_jwt() {
        None if options.holder_binding_required => {
            return Err(Error::root(VerifierError::HolderBindingMissing));
        }
        None => {}
        Some(binding_jwt) => {
            let cnf = payload.cnf.as_ref().ok_or_else(|| {
                Error::root(VerifierError::HolderBinding(
                    BindingError::MissingConfirmationKey,
                ))
            })?;

            validate_binding_jwt(
                binding_jwt,
                &cnf.jwk,
                options.signature_verifier,
                options.expected_nonce.as_deref(),
                options.expected_audience.as_deref(),
                current_time,
                options.leeway,
            )
            .match_err(|error| VerifierError::HolderBinding(error.clone()))?;
        }
    }

    decode_disclosed_claims(&payload.to_object(), &disclosures)
        .match_err(|error| VerifierError::Decoding(error.clone()))
}

fn validate_time_claims(
    payload: &crate::SdJwtPayload,
    current_time: SecondsSinceEpoch,
    leeway: SecondsSinceEpoch,
) -> Result<()> {
    // https://www.rfc-editor.org/rfc/rfc7519.html#section-4.1.5
    if let Some(nbf) = payload.nbf {
        if current_time + leeway < nbf {
            return Err(Error::root(VerifierError::JwtNotYetValid(
                current_time,
                nbf,
            )));
        }
    }

    // RFC: "on or after"
    // https://www.rfc-editor.org/rfc/rfc7519.html#section-4.1.4
    if let Some(exp) = payload.exp {
        if current_time.saturating_sub(leeway) >= exp {
            return Err(Error::root(VerifierError::JwtExpired(current_time, exp)));
        }
    }

    Ok(())
}
