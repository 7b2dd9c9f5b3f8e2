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

//! Issuance of SD-JWTs: turning a claim object into salted disclosures and a
//! signed JWT carrying only their digests.

use arx_jws_utils::{jwt, JwkPublic, JwtSigner};
use arxerror::{traits::ForeignBoxed, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    encoder, CnfClaim, CombinedFormatForIssuance, Digest, Disclosure, HashingAlgorithm,
    JsonObject, SecondsSinceEpoch, SD,
};

/// Error type related to the issuance operations.
#[derive(strum_macros::Display, Debug, PartialEq, Eq)]
pub enum IssuerError {
    /// Error indicating that a claim name is reserved for the SD-JWT format
    /// itself and cannot appear in the selectively disclosable claims.
    #[strum(to_string = "Use of reserved claim name {0}")]
    ReservedClaimName(&'static str),

    /// Error indicating that a value does not have the shape the operation
    /// requires, e.g. a non-object `credentialSubject`.
    #[strum(to_string = "Invalid claim shape: {0}")]
    ClaimShape(String),

    /// Error indicating that two disclosures produced the same digest.
    #[strum(to_string = "Disclosure digest collision")]
    DigestCollision,

    /// Error indicating that drawing salt entropy from the provided random
    /// source failed.
    #[strum(to_string = "Entropy acquisition failed")]
    EntropyFailure,

    /// Error indicating that the signing of the JWT failed.
    #[strum(to_string = "Signing failed")]
    SignatureFailure,
}

impl arxerror::ArxError for IssuerError {}

/// Result type used by the [`issuer`][crate::issuer] module.
pub type Result<T> = arxerror::Result<T, IssuerError>;

/// Value of the `typ` header parameter written when issuing an SD-JWT.
const TYP_JWT: &str = "JWT";

/// JWT header of an issued SD-JWT.
///
/// Header field values are what a consumer uses to select the verification
/// algorithm (`alg` is authoritative) and, optionally, the key (`kid`).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdJwtHeader {
    /// Type of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Algorithm used to sign the payload.
    pub alg: arx_jws_utils::SigningAlgorithm,

    /// Optional identifier of the key used for signing, sourced from the
    /// signer capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl jwt::JoseHeader for SdJwtHeader {
    fn algorithm_type(&self) -> jwt::AlgorithmType {
        self.alg.into()
    }
}

/// The signed payload of an SD-JWT: registered JWT claims, the digest set,
/// the digest algorithm, and whatever open claims were not concealed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct SdJwtPayload {
    /// Issuer of the credential. Left out of the payload when empty, which
    /// only the envelope-credential path uses.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iss: String,

    /// The principal that is the subject of the JWT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// The recipients that the JWT is intended for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Unique identifier of the JWT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// The time at which the JWT was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<SecondsSinceEpoch>,

    /// The time before which the JWT MUST NOT be accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<SecondsSinceEpoch>,

    /// The expiry time after which the JWT is no longer valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<SecondsSinceEpoch>,

    /// Holder's public JWK for holder-binding purposes, present iff the
    /// credential was bound to a holder key at issuance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnf: Option<CnfClaim>,

    /// The top-level digest set of the concealed claims.
    #[serde(rename = "_sd", default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) sd: Vec<Digest>,

    /// The hash algorithm used to conceal the claims, as specified [here].
    ///
    /// Kept as the raw registry name; consumers parse it (and reject unknown
    /// names) when reconstructing.
    ///
    /// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-07#name-hash-function-claim
    #[serde(rename = "_sd_alg", skip_serializing_if = "Option::is_none")]
    pub(crate) sd_alg: Option<String>,

    /// Remaining open claims. In structured mode these carry the nested
    /// objects with their local `_sd` arrays.
    #[serde(flatten)]
    pub claims: JsonObject,
}

impl SdJwtPayload {
    fn empty() -> Self {
        Self {
            iss: String::new(),
            sub: None,
            aud: None,
            jti: None,
            iat: None,
            nbf: None,
            exp: None,
            cnf: None,
            sd: Vec::new(),
            sd_alg: None,
            claims: JsonObject::new(),
        }
    }

    /// Serializes the payload into a `JSON` object.
    pub fn to_object(&self) -> JsonObject {
        crate::models::into_object(
            serde_json::to_value(self).expect("Implementation error: cannot serialize as JSON"),
        )
    }

    /// Applies the registered claims chosen via [`IssuerOptions`], leaving
    /// unset options alone.
    fn apply_options(&mut self, options: &IssuerOptions) {
        if let Some(sub) = &options.sub {
            self.sub = Some(sub.clone());
        }
        if let Some(aud) = &options.aud {
            self.aud = Some(aud.clone());
        }
        if let Some(jti) = &options.jti {
            self.jti = Some(jti.clone());
        }
        if let Some(iat) = options.iat {
            self.iat = Some(iat);
        }
        if let Some(nbf) = options.nbf {
            self.nbf = Some(nbf);
        }
        if let Some(exp) = options.exp {
            self.exp = Some(exp);
        }
        if let Some(jwk) = &options.holder_public_key {
            self.cnf = Some(CnfClaim { jwk: jwk.clone() });
        }
    }
}

/// Configuration of one issuance, with defaulted fields and `with_*` setters
/// for each recognized option.
#[derive(Debug, Default, Clone)]
pub struct IssuerOptions {
    structured: bool,
    hash_algorithm: HashingAlgorithm,
    nbf: Option<SecondsSinceEpoch>,
    iat: Option<SecondsSinceEpoch>,
    exp: Option<SecondsSinceEpoch>,
    jti: Option<String>,
    sub: Option<String>,
    aud: Option<String>,
    holder_public_key: Option<JwkPublic>,
}

impl IssuerOptions {
    /// Choose between flat (default) and structured claim concealment.
    ///
    /// Flat conceals every top-level claim whole; structured recurses into
    /// object claims, giving each nested object its own digest set.
    #[must_use]
    pub fn with_structured_claims(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    /// Choose the digest algorithm; the default is `sha-256`.
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashingAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Set the `nbf` (not before) registered claim.
    #[must_use]
    pub fn with_not_before(mut self, nbf: SecondsSinceEpoch) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Set the `iat` (issued at) registered claim.
    #[must_use]
    pub fn with_issued_at(mut self, iat: SecondsSinceEpoch) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Set the `exp` (expiration time) registered claim.
    #[must_use]
    pub fn with_expiry(mut self, exp: SecondsSinceEpoch) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Set the `jti` (JWT ID) registered claim.
    #[must_use]
    pub fn with_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Set the `sub` (subject) registered claim.
    #[must_use]
    pub fn with_subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Set the `aud` (audience) registered claim.
    #[must_use]
    pub fn with_audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Pin the holder's public JWK into the credential's `cnf` claim,
    /// enabling holder binding at presentation time.
    #[must_use]
    pub fn with_holder_public_key(mut self, jwk: JwkPublic) -> Self {
        self.holder_public_key = Some(jwk);
        self
    }
}

/// An issued SD-JWT: the signed JWT together with the disclosure set whose
/// digests it carries.
pub struct SelectiveDisclosureJwt {
    jwt: jwt::Token<SdJwtHeader, SdJwtPayload, jwt::token::Signed>,
    disclosures: Vec<Disclosure>,
}

impl SelectiveDisclosureJwt {
    /// Serialize into the Combined Format for Issuance:
    /// `<Issuer-signed JWT>~<Disclosure 1>~…~<Disclosure N>~`.
    pub fn serialize(&self) -> String {
        CombinedFormatForIssuance::new(
            self.jwt.as_str().to_owned(),
            self.disclosures
                .iter()
                .map(|disclosure| disclosure.as_str().to_owned())
                .collect(),
        )
        .to_string()
    }

    /// The signed payload, with the concealed claims replaced by digests.
    pub fn payload(&self) -> &SdJwtPayload {
        self.jwt.claims()
    }

    /// The disclosures whose digests the signed payload carries.
    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }
}

/// Issue a new SD-JWT over the given claim object.
///
/// Every member of `claims` is selectively disclosable; the registered JWT
/// claims (`iss` from `issuer_id`, plus whatever [`IssuerOptions`] set) are
/// carried in the clear and are never concealed.
///
/// The `rng` must be cryptographically secure: it provides the disclosure
/// salts and the shuffling of the digest arrays.
///
/// # Errors
/// Fails on reserved claim names in `claims`, on entropy acquisition
/// failure, on a digest collision, and on signer failure.
pub fn new<S, R>(
    issuer_id: impl Into<String>,
    claims: JsonObject,
    signer: &S,
    rng: &mut R,
    options: IssuerOptions,
) -> Result<SelectiveDisclosureJwt>
where
    S: JwtSigner,
    R: rand_core::CryptoRngCore + ?Sized,
{
    let hasher = crate::traits::hasher_for(options.hash_algorithm);
    let encoded = encoder::encode_claims(claims, options.structured, &hasher, rng)?;

    let mut payload = SdJwtPayload::empty();
    payload.iss = issuer_id.into();
    payload.claims = encoded.claims;
    payload.sd = encoded.sd;
    payload.sd_alg = Some(options.hash_algorithm.as_str().to_owned());
    payload.apply_options(&options);

    sign_payload(payload, encoded.disclosures, signer)
}

/// Issue an SD-JWT over a Verifiable Credential envelope.
///
/// This is a thin adapter around the core issuance: the object at
/// `vc.credentialSubject` goes through the claim concealment, the transformed
/// subject is spliced back into the envelope, and the **whole envelope** is
/// signed. The `_sd_alg` claim (and `cnf`, when a holder key is pinned) live
/// at the envelope's top level. Registered claims already present in the
/// envelope are kept unless overridden via [`IssuerOptions`].
///
/// # Errors
/// In addition to the failure modes of [`new`], fails with
/// [`IssuerError::ClaimShape`] when the envelope has no object-valued
/// `vc.credentialSubject`.
pub fn new_from_vc<S, R>(
    vc: JsonObject,
    signer: &S,
    rng: &mut R,
    options: IssuerOptions,
) -> Result<SelectiveDisclosureJwt>
where
    S: JwtSigner,
    R: rand_core::CryptoRngCore + ?Sized,
{
    let mut payload: SdJwtPayload = serde_json::from_value(Value::Object(vc))
        .map_err(|err| Error::root(IssuerError::ClaimShape("invalid envelope".into())).ctx(err))?;

    let subject = take_credential_subject(&mut payload)?;

    let hasher = crate::traits::hasher_for(options.hash_algorithm);
    let encoded = encoder::encode_claims(subject, options.structured, &hasher, rng)?;

    let mut transformed = encoded.claims;
    if !encoded.sd.is_empty() {
        transformed.insert(
            SD.to_owned(),
            Value::Array(encoded.sd.into_iter().map(Value::String).collect()),
        );
    }
    put_credential_subject(&mut payload, transformed);

    payload.sd_alg = Some(options.hash_algorithm.as_str().to_owned());
    payload.apply_options(&options);

    sign_payload(payload, encoded.disclosures, signer)
}

fn sign_payload<S: JwtSigner>(
    payload: SdJwtPayload,
    disclosures: Vec<Disclosure>,
    signer: &S,
) -> Result<SelectiveDisclosureJwt> {
    let header = SdJwtHeader {
        typ: Some(TYP_JWT.to_owned()),
        alg: signer.algorithm(),
        kid: signer.kid().map(str::to_owned),
    };

    let unsigned_token = jwt::Token::new(header, payload);
    let signed_token = signer
        .sign_jwt(unsigned_token)
        .foreign_boxed_err(|| IssuerError::SignatureFailure)?;

    Ok(SelectiveDisclosureJwt {
        jwt: signed_token,
        disclosures,
    })
}

fn vc_member_of(payload: &mut SdJwtPayload) -> Result<&mut JsonObject> {
    payload
        .claims
        .get_mut("vc")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            Error::root(IssuerError::ClaimShape(
                "envelope has no object-valued `vc` member".into(),
            ))
        })
}

fn take_credential_subject(payload: &mut SdJwtPayload) -> Result<JsonObject> {
    let subject = vc_member_of(payload)?
        .remove("credentialSubject")
        .ok_or_else(|| {
            Error::root(IssuerError::ClaimShape(
                "envelope has no `credentialSubject`".into(),
            ))
        })?;

    match subject {
        Value::Object(subject) => Ok(subject),
        other => Err(Error::root(IssuerError::ClaimShape(format!(
            "`credentialSubject` is not an object: {other}"
        )))),
    }
}

fn put_credential_subject(payload: &mut SdJwtPayload, subject: JsonObject) {
    // The `vc` member was already validated by `take_credential_subject`.
    if let Ok(vc) = vc_member_of(payload) {
        vc.insert("credentialSubject".to_owned(), Value::Object(subject));
    }
}
