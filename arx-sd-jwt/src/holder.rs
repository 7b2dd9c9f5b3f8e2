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

//! The holder side of the protocol: importing an issued SD-JWT, choosing
//! which disclosures to forward, and building a presentation, optionally
//! with holder binding.

use std::collections::HashSet;

use arx_jws_utils::{SignatureVerifier, Signer};
use arxerror::{traits::PropagateError, Error};
use serde_json::Value;

use crate::{
    decoder::decode_disclosed_claims,
    error::{FormatError, SignatureError},
    holder_binding::{sign_binding_jwt, BindingPayload},
    models::{parse_sd_jwt, verify_sd_jwt},
    CombinedFormatForIssuance, CombinedFormatForPresentation, DecodingError, Disclosure,
};

/// Error type representing the ways holder operations can fail.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum HolderError {
    /// Error indicating that the issued SD-JWT is not in a valid format.
    #[strum(to_string = "{0}")]
    Format(FormatError),

    /// Error related to issuer signature verification.
    #[strum(to_string = "{0}")]
    Signature(SignatureError),

    /// Error while matching the received disclosures against the signed
    /// payload.
    #[strum(to_string = "{0}")]
    Decoding(DecodingError),

    /// Error indicating that a disclosure selected for presentation is not
    /// part of the issued SD-JWT.
    #[strum(to_string = "Unknown disclosure: {0}")]
    UnknownDisclosure(String),

    /// Error indicating that signing the holder-binding JWT failed.
    #[strum(to_string = "Holder binding signing failed")]
    BindingSignatureFailure,
}

impl arxerror::ArxError for HolderError {}

/// Result type used by the [`holder`][crate::holder] module.
pub type Result<T> = arxerror::Result<T, HolderError>;

/// One claim the holder may choose to reveal: its name, its value, and the
/// verbatim disclosure string that reveals it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The claim name; [`None`] for the array-element disclosure form.
    pub name: Option<String>,
    /// The claim value.
    pub value: Value,
    /// The disclosure string, exactly as it appeared in the issued SD-JWT.
    /// Presentations are built from these verbatim strings.
    pub disclosure: String,
}

impl Claim {
    fn from_disclosure(disclosure: &Disclosure) -> Self {
        Self {
            name: disclosure.claim_name().map(str::to_owned),
            value: disclosure.value().clone(),
            disclosure: disclosure.as_str().to_owned(),
        }
    }
}

/// Configuration of [`parse`], with defaulted fields and `with_*` setters.
#[derive(Default)]
pub struct HolderOptions<'a> {
    signature_verifier: Option<&'a dyn SignatureVerifier>,
}

impl<'a> HolderOptions<'a> {
    /// Verify the issuer signature at parse time with the given capability.
    ///
    /// Without a verifier the signature is **not** checked; the holder is the
    /// trust boundary for itself, so skipping is permitted, and the caller
    /// assumes the risk.
    #[must_use]
    pub fn with_signature_verifier(mut self, verifier: &'a dyn SignatureVerifier) -> Self {
        self.signature_verifier = Some(verifier);
        self
    }
}

/// Import a Combined Format for Issuance, returning the claims the holder
/// can selectively disclose.
///
/// Every received disclosure is matched, by digest, against the digest sets
/// anywhere in the signed payload; a disclosure matching nothing is an
/// error, while a digest without a disclosure is tolerated. The full payload
/// reconstruction is performed to validate consistency (digest duplicates,
/// claim collisions, reserved names) even though only the per-disclosure
/// claims are returned.
pub fn parse(combined_issuance: &str, options: HolderOptions<'_>) -> Result<Vec<Claim>> {
    let cfi: CombinedFormatForIssuance = combined_issuance
        .parse()
        .match_err(|error: &FormatError| HolderError::Format(error.clone()))?;

    let (unverified_jwt, disclosures) = parse_sd_jwt(&cfi.jwt, &cfi.disclosures)
        .match_err(|error: &FormatError| HolderError::Format(error.clone()))?;

    let full_payload = match options.signature_verifier {
        Some(verifier) => verify_sd_jwt(unverified_jwt, verifier)
            .match_err(|error| HolderError::Signature(error.clone()))?
            .claims()
            .to_object(),
        None => unverified_jwt.claims().to_object(),
    };

    decode_disclosed_claims(&full_payload, &disclosures)
        .match_err(|error| HolderError::Decoding(error.clone()))?;

    Ok(disclosures.iter().map(Claim::from_disclosure).collect())
}

/// The holder-binding request: the payload values the verifier challenged
/// the holder with, and the signer holding the private counterpart of the
/// `cnf` key pinned at issuance.
///
/// Whether the signer actually matches the `cnf` key is not verified here;
/// the verifier enforces it.
pub struct BindingInfo<'a> {
    /// The claims of the holder-binding JWT.
    pub payload: BindingPayload,
    /// The signer producing the holder-binding signature.
    pub signer: &'a dyn Signer,
}

/// Configuration of [`create_presentation`], with defaulted fields and
/// `with_*` setters.
#[derive(Default)]
pub struct PresentationOptions<'a> {
    holder_binding: Option<BindingInfo<'a>>,
}

impl<'a> PresentationOptions<'a> {
    /// Attach a holder-binding JWT to the presentation.
    #[must_use]
    pub fn with_holder_binding(mut self, binding: BindingInfo<'a>) -> Self {
        self.holder_binding = Some(binding);
        self
    }
}

/// Build a Combined Format for Presentation disclosing exactly
/// `selected_disclosures`, which must be verbatim disclosure strings from
/// the issued SD-JWT.
///
/// # Errors
/// Fails with [`HolderError::UnknownDisclosure`] when a selected string is
/// not part of the issued SD-JWT, and with
/// [`HolderError::BindingSignatureFailure`] when holder binding was
/// requested and its signing fails.
pub fn create_presentation(
    combined_issuance: &str,
    selected_disclosures: &[String],
    options: PresentationOptions<'_>,
) -> Result<String> {
    let cfi: CombinedFormatForIssuance = combined_issuance
        .parse()
        .match_err(|error: &FormatError| HolderError::Format(error.clone()))?;

    let available: HashSet<&str> = cfi.disclosures.iter().map(String::as_str).collect();
    for selected in selected_disclosures {
        if !available.contains(selected.as_str()) {
            return Err(Error::root(HolderError::UnknownDisclosure(
                selected.clone(),
            )));
        }
    }

    let holder_binding_jwt = options
        .holder_binding
        .map(|binding| sign_binding_jwt(&binding.payload, binding.signer))
        .transpose()?;

    let presentation = CombinedFormatForPresentation::new(
        cfi.jwt,
        selected_disclosures.to_vec(),
        holder_binding_jwt,
    );

    Ok(presentation.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        issuer::{
            self,
            tests::{simple_claims, TEST_ISSUER},
            IssuerOptions,
        },
        json_object,
        test_utils::symbolic_crypto::{holder_public_jwk, StubSigner, StubVerifier},
    };

    pub(crate) fn issued_cfi(options: IssuerOptions) -> String {
        issuer::new(
            TEST_ISSUER,
            simple_claims(),
            &StubSigner::default(),
            &mut rand::thread_rng(),
            options,
        )
        .unwrap()
        .serialize()
    }

    pub(crate) fn disclosures_for_names(claims: &[Claim], names: &[&str]) -> Vec<String> {
        claims
            .iter()
            .filter(|claim| {
                claim
                    .name
                    .as_deref()
                    .is_some_and(|name| names.contains(&name))
            })
            .map(|claim| claim.disclosure.clone())
            .collect()
    }

    #[test]
    fn parse_returns_all_selectable_claims() {
        let cfi = issued_cfi(IssuerOptions::default());

        let verifier = StubVerifier::default();
        let claims = parse(
            &cfi,
            HolderOptions::default().with_signature_verifier(&verifier),
        )
        .unwrap();

        assert_eq!(claims.len(), 2);

        let given_name = claims
            .iter()
            .find(|claim| claim.name.as_deref() == Some("given_name"))
            .unwrap();
        assert_eq!(given_name.value, "Albert");
        assert!(!given_name.disclosure.is_empty());
    }

    #[test]
    fn parse_without_verifier_skips_signature_checks() {
        let mut cfi = issued_cfi(IssuerOptions::default());

        // Corrupt the signature; an unverified parse doesn't notice, a
        // verified one does.
        let tilde = cfi.find('~').unwrap();
        let flipped = if &cfi[tilde - 1..tilde] == "X" { "Y" } else { "X" };
        cfi.replace_range(tilde - 1..tilde, flipped);

        let claims = parse(&cfi, HolderOptions::default()).unwrap();
        assert_eq!(claims.len(), 2);

        let verifier = StubVerifier::default();
        let error = parse(
            &cfi,
            HolderOptions::default().with_signature_verifier(&verifier),
        )
        .unwrap_err();
        assert_eq!(
            error.error,
            HolderError::Signature(SignatureError::InvalidJwtSignature)
        );
    }

    #[test]
    fn parse_rejects_orphan_disclosure() {
        let cfi = issued_cfi(IssuerOptions::default());

        // Append a disclosure the payload knows nothing about.
        let foreign = Disclosure::new(
            "foreign-salt".to_owned(),
            Some("intruder".to_owned()),
            "value".into(),
        );
        let cfi = format!("{cfi}{}~", foreign.as_str());

        let error = parse(&cfi, HolderOptions::default()).unwrap_err();
        assert!(matches!(
            error.error,
            HolderError::Decoding(DecodingError::OrphanDisclosures(_))
        ));
    }

    #[test]
    fn parse_tolerates_partial_disclosure_sets() {
        let cfi = issued_cfi(IssuerOptions::default());
        let claims = parse(&cfi, HolderOptions::default()).unwrap();

        // Drop one disclosure from the wire string; its digest remains in the
        // payload, which is fine.
        let dropped = &claims[0].disclosure;
        let partial = cfi.replace(&format!("{dropped}~"), "");

        let remaining = parse(&partial, HolderOptions::default()).unwrap();
        assert_eq!(remaining.len(), claims.len() - 1);
    }

    #[test]
    fn parse_rejects_malformed_cfi() {
        let error = parse("not a cfi", HolderOptions::default()).unwrap_err();
        assert_eq!(error.error, HolderError::Format(FormatError::MalformedCfi));
    }

    #[test]
    fn presentation_carries_only_selected_disclosures() {
        let cfi = issued_cfi(IssuerOptions::default());
        let claims = parse(&cfi, HolderOptions::default()).unwrap();

        let selected = disclosures_for_names(&claims, &["given_name"]);
        let presentation =
            create_presentation(&cfi, &selected, PresentationOptions::default()).unwrap();

        let cfp: CombinedFormatForPresentation = presentation.parse().unwrap();
        assert_eq!(cfp.disclosures(), selected.as_slice());
        assert_eq!(cfp.holder_binding_jwt(), None);
        assert!(presentation.ends_with('~'));
    }

    #[test]
    fn presentation_with_empty_selection_is_valid() {
        let cfi = issued_cfi(IssuerOptions::default());

        let presentation =
            create_presentation(&cfi, &[], PresentationOptions::default()).unwrap();

        let cfp: CombinedFormatForPresentation = presentation.parse().unwrap();
        assert!(cfp.disclosures().is_empty());
    }

    #[test]
    fn presentation_rejects_foreign_disclosure() {
        let cfi = issued_cfi(IssuerOptions::default());

        let foreign = "WyJmb3JlaWduLXNhbHQiLCJpbnRydWRlciIsInZhbHVlIl0".to_owned();
        let error =
            create_presentation(&cfi, &[foreign.clone()], PresentationOptions::default())
                .unwrap_err();

        assert_eq!(error.error, HolderError::UnknownDisclosure(foreign));
    }

    #[test]
    fn presentation_with_holder_binding_appends_binding_jwt() {
        let cfi = issued_cfi(
            IssuerOptions::default().with_holder_public_key(holder_public_jwk()),
        );
        let claims = parse(&cfi, HolderOptions::default()).unwrap();
        let selected = disclosures_for_names(&claims, &["given_name"]);

        let holder_signer = StubSigner::new(holder_public_jwk());
        let presentation = create_presentation(
            &cfi,
            &selected,
            PresentationOptions::default().with_holder_binding(BindingInfo {
                payload: BindingPayload {
                    nonce: "nonce".to_owned(),
                    audience: "https://test.com/verifier".to_owned(),
                    issued_at: 100,
                },
                signer: &holder_signer,
            }),
        )
        .unwrap();

        let cfp: CombinedFormatForPresentation = presentation.parse().unwrap();
        assert!(cfp.holder_binding_jwt().is_some());
        assert!(!presentation.ends_with('~'));
    }

    #[test]
    fn structured_issuance_yields_nested_claims() {
        let cfi = issuer::new(
            TEST_ISSUER,
            crate::encoder::tests::complex_claims(),
            &StubSigner::default(),
            &mut rand::thread_rng(),
            IssuerOptions::default().with_structured_claims(true),
        )
        .unwrap()
        .serialize();

        let verifier = StubVerifier::default();
        let claims = parse(
            &cfi,
            HolderOptions::default().with_signature_verifier(&verifier),
        )
        .unwrap();

        assert_eq!(claims.len(), 10);
        let names: Vec<&str> = claims
            .iter()
            .filter_map(|claim| claim.name.as_deref())
            .collect();
        assert!(names.contains(&"street_address"));
        assert!(names.contains(&"given_name"));
    }

    #[test]
    fn parse_rejects_unsupported_sd_alg() {
        // Hand-roll a payload with an unknown `_sd_alg`.
        let signer = StubSigner::default();
        let jwt: String = arx_jws_utils::JwtSigner::sign_jwt(
            &signer,
            json_object!({ "iss": TEST_ISSUER, "_sd": [], "_sd_alg": "md5" }),
        )
        .unwrap();

        let error = parse(&format!("{jwt}~"), HolderOptions::default()).unwrap_err();
        assert_eq!(
            error.error,
            HolderError::Decoding(DecodingError::UnsupportedAlgorithm("md5".to_owned()))
        );
    }
}
