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

use std::collections::HashSet;

use arxerror::Error;
use rand::seq::SliceRandom;
use rand_core::CryptoRngCore;
use serde_json::Value;

use crate::{
    issuer::IssuerError,
    utils::{check_claim_names_object, is_reserved_key_name},
    Digest, Disclosure, Hasher, JsonObject, Salt, SD,
};

type Result<T> = arxerror::Result<T, IssuerError>;

/// The outcome of concealing a claim set: the payload-side remainder, the
/// top-level digest set, and every produced disclosure.
#[derive(Debug)]
pub(crate) struct EncodedClaims {
    /// What remains of the claim object in the signed payload. Empty in flat
    /// mode; in structured mode it holds the nested objects, each carrying
    /// its own local `_sd` array.
    pub(crate) claims: JsonObject,
    /// The top-level `_sd` digest set, shuffled.
    pub(crate) sd: Vec<Digest>,
    /// All disclosures produced, across every nesting level.
    pub(crate) disclosures: Vec<Disclosure>,
}

/// Conceals the members of `claims` behind disclosure digests, as described
/// [here].
///
/// # Arguments
/// - `claims` : the claim object to transform; registered JWT claims are the
///   caller's concern and must not be part of it
/// - `structured` : when `false`, every top-level member becomes one
///   disclosure; when `true`, nested objects are recursed into and gain their
///   own `_sd` arrays while their scalar members become disclosures
/// - `hasher` : hashing function used to generate digest values, see [1]
/// - `rng` : cryptographically secure randomness for disclosure salts and for
///   shuffling the digest arrays, see [2]
///
/// Every produced `_sd` array is shuffled with an unbiased shuffle so that
/// digest order cannot leak the original member order.
///
/// # Errors
/// Encoding will fail if:
/// - `claims` contains a reserved claim name (`_sd`, `_sd_alg`, `...`) at any
///   depth
/// - drawing salt entropy from `rng` fails
/// - two disclosures end up with the same digest
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-disclosures
/// [1]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-hashing-disclosures
/// [2]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#section-5.2.1-2.1.2.1
pub(crate) fn encode_claims<H: Hasher, R: CryptoRngCore + ?Sized>(
    claims: JsonObject,
    structured: bool,
    hasher: &H,
    rng: &mut R,
) -> Result<EncodedClaims> {
    if let Some(name) = check_claim_names_object(&claims, &is_reserved_key_name, true) {
        return Err(Error::root(IssuerError::ReservedClaimName(name)));
    }

    let mut disclosures = Vec::new();

    let (remainder, sd) = if structured {
        encode_object(claims, hasher, rng, &mut disclosures)?
    } else {
        let mut sd = Vec::with_capacity(claims.len());
        for (name, value) in claims {
            sd.push(conceal_member(name, value, hasher, rng, &mut disclosures)?);
        }
        sd.shuffle(rng);
        (JsonObject::new(), sd)
    };

    check_digest_uniqueness(&disclosures, hasher)?;

    Ok(EncodedClaims {
        claims: remainder,
        sd,
        disclosures,
    })
}

/// Structured-mode recursion: scalar and array members of `object` become
/// disclosures at this level, object members keep their name and are
/// transformed in place, gaining a local `_sd` array of their own.
fn encode_object<H: Hasher, R: CryptoRngCore + ?Sized>(
    object: JsonObject,
    hasher: &H,
    rng: &mut R,
    disclosures: &mut Vec<Disclosure>,
) -> Result<(JsonObject, Vec<Digest>)> {
    let mut remainder = JsonObject::new();
    let mut sd = Vec::new();

    for (name, value) in object {
        match value {
            Value::Object(inner) => {
                let (inner_remainder, inner_sd) = encode_object(inner, hasher, rng, disclosures)?;

                let mut transformed = inner_remainder;
                if !inner_sd.is_empty() {
                    transformed.insert(
                        SD.to_owned(),
                        Value::Array(inner_sd.into_iter().map(Value::String).collect()),
                    );
                }
                remainder.insert(name, Value::Object(transformed));
            }
            terminal => {
                sd.push(conceal_member(name, terminal, hasher, rng, disclosures)?);
            }
        }
    }

    sd.shuffle(rng);

    Ok((remainder, sd))
}

/// Creates a disclosure for one object member and returns its digest, as
/// specified in [object properties].
///
/// [object properties]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-disclosures-for-object-prop
fn conceal_member<H: Hasher, R: CryptoRngCore + ?Sized>(
    name: String,
    value: Value,
    hasher: &H,
    rng: &mut R,
    disclosures: &mut Vec<Disclosure>,
) -> Result<Digest> {
    let salt = generate_salt(rng)?;
    let disclosure = Disclosure::new(salt, Some(name), value);
    let digest = disclosure.digest(hasher);

    disclosures.push(disclosure);

    Ok(digest)
}

/// Generate a salt for the SD-JWT disclosure hashes.
///
/// The salt **MUST** be highly unpredictable and carry at least 128 bits of
/// entropy; see draft sections [11.3] and [11.4].
///
/// [11.3]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-entropy-of-the-salt
/// [11.4]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-minimum-length-of-the-salt
fn generate_salt<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Salt> {
    let mut salt = [0u8; SALT_ENTROPY_BYTES];
    rng.try_fill_bytes(&mut salt)
        .map_err(|err| Error::root(IssuerError::EntropyFailure).ctx(err))?;
    Ok(arx_jws_utils::base64_url_encode(salt))
}

/// No two disclosures of a single credential may share a digest; a collision
/// on the hash output is a fatal issuer-side error.
fn check_digest_uniqueness<H: Hasher>(disclosures: &[Disclosure], hasher: &H) -> Result<()> {
    let mut seen = HashSet::new();
    for disclosure in disclosures {
        if !seen.insert(disclosure.digest(hasher)) {
            return Err(Error::root(IssuerError::DigestCollision));
        }
    }
    Ok(())
}

const SALT_ENTROPY_BYTES: usize = 16;

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::{json_object, utils::SD_ALG_FIELD_NAME, Sha256, ELLIPSIS};

    pub(crate) fn complex_claims() -> JsonObject {
        json_object!({
            "sub": "john_doe_42",
            "given_name": "John",
            "family_name": "Doe",
            "email": "johndoe@example.com",
            "phone_number": "+1-202-555-0101",
            "birthdate": "1940-01-01",
            "address": {
                "street_address": "123 Main St",
                "locality": "Anytown",
                "region": "Anystate",
                "country": "US"
            },
        })
    }

    fn digest_set(disclosures: &[Disclosure], names: &[&str]) -> HashSet<String> {
        disclosures
            .iter()
            .filter(|d| names.contains(&d.claim_name().unwrap()))
            .map(|d| d.digest(Sha256))
            .collect()
    }

    #[test]
    fn flat_encoding_conceals_every_member() {
        let encoded = encode_claims(complex_claims(), false, &Sha256, &mut rand::thread_rng())
            .expect("encoding failed");

        assert!(encoded.claims.is_empty());
        assert_eq!(encoded.disclosures.len(), 7);
        assert_eq!(encoded.sd.len(), 7);

        // The `address` object is concealed whole.
        let address = encoded
            .disclosures
            .iter()
            .find(|d| d.claim_name() == Some("address"))
            .unwrap();
        assert_eq!(
            address.value(),
            &json!({
                "street_address": "123 Main St",
                "locality": "Anytown",
                "region": "Anystate",
                "country": "US"
            })
        );

        // Each payload digest corresponds to exactly one disclosure.
        let expected: HashSet<String> = encoded
            .disclosures
            .iter()
            .map(|d| d.digest(Sha256))
            .collect();
        assert_eq!(encoded.sd.iter().cloned().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn structured_encoding_recurses_into_objects() {
        let encoded = encode_claims(complex_claims(), true, &Sha256, &mut rand::thread_rng())
            .expect("encoding failed");

        assert_eq!(encoded.disclosures.len(), 10);
        assert_eq!(encoded.sd.len(), 6);

        // The remainder holds only the `address` skeleton with its local
        // digest set.
        assert_eq!(encoded.claims.len(), 1);
        let address = encoded.claims.get("address").unwrap().as_object().unwrap();
        assert_eq!(address.len(), 1);
        let address_sd: HashSet<String> = address
            .get(SD)
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|digest| digest.as_str().unwrap().to_owned())
            .collect();

        assert_eq!(
            address_sd,
            digest_set(
                &encoded.disclosures,
                &["street_address", "locality", "region", "country"],
            )
        );

        assert_eq!(
            encoded.sd.iter().cloned().collect::<HashSet<_>>(),
            digest_set(
                &encoded.disclosures,
                &[
                    "sub",
                    "given_name",
                    "family_name",
                    "email",
                    "phone_number",
                    "birthdate",
                ],
            )
        );
    }

    #[test]
    fn structured_encoding_of_empty_object_emits_no_sd() {
        let encoded = encode_claims(
            json_object!({ "empty": {} }),
            true,
            &Sha256,
            &mut rand::thread_rng(),
        )
        .unwrap();

        assert!(encoded.disclosures.is_empty());
        assert!(encoded.sd.is_empty());
        assert_eq!(
            encoded.claims.get("empty").unwrap(),
            &Value::Object(JsonObject::new())
        );
    }

    #[test]
    fn reserved_claim_names_are_rejected() {
        let cases = [
            (json_object!({ SD: ["fake digest"] }), SD),
            (json_object!({ SD_ALG_FIELD_NAME: "md5" }), SD_ALG_FIELD_NAME),
            (json_object!({ ELLIPSIS: "fake digest" }), ELLIPSIS),
            (
                json_object!({ "a": { "b": { SD: ["fake digest"] } } }),
                SD,
            ),
            (
                json_object!({ "array": [{ ELLIPSIS: "fake digest" }] }),
                ELLIPSIS,
            ),
        ];

        for (claims, reserved) in cases {
            for structured in [false, true] {
                let error =
                    encode_claims(claims.clone(), structured, &Sha256, &mut rand::thread_rng())
                        .unwrap_err();
                assert_eq!(error.error, IssuerError::ReservedClaimName(reserved));
            }
        }
    }

    #[test]
    fn salts_are_fresh_per_disclosure() {
        let claims = json_object!({ "a": "same", "b": "same" });

        let encoded = encode_claims(claims, false, &Sha256, &mut rand::thread_rng()).unwrap();

        // Identical name-value pairs must still produce distinct disclosures.
        assert_eq!(encoded.disclosures.len(), 2);
        assert_ne!(
            encoded.disclosures[0].as_str(),
            encoded.disclosures[1].as_str()
        );
    }

    #[test]
    fn entropy_failure_is_surfaced() {
        struct NoEntropy;

        impl rand_core::RngCore for NoEntropy {
            fn next_u32(&mut self) -> u32 {
                0
            }

            fn next_u64(&mut self) -> u64 {
                0
            }

            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0);
            }

            fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
                Err(rand_core::Error::new("entropy source exhausted"))
            }
        }

        impl rand_core::CryptoRng for NoEntropy {}

        let error = encode_claims(
            json_object!({ "foo": "bar" }),
            false,
            &Sha256,
            &mut NoEntropy,
        )
        .unwrap_err();

        assert_eq!(error.error, IssuerError::EntropyFailure);
    }

    #[test]
    fn identical_disclosures_collide_under_constant_salts() {
        struct ConstRng;

        impl rand_core::RngCore for ConstRng {
            fn next_u32(&mut self) -> u32 {
                0
            }

            fn next_u64(&mut self) -> u64 {
                0
            }

            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0);
            }

            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
                dest.fill(0);
                Ok(())
            }
        }

        impl rand_core::CryptoRng for ConstRng {}

        // With a constant salt, the same name-value pair appearing in two
        // sibling objects serializes to the same disclosure.
        let claims = json_object!({
            "a": { "x": 1 },
            "b": { "x": 1 },
        });

        let error = encode_claims(claims, true, &Sha256, &mut ConstRng).unwrap_err();

        assert_eq!(error.error, IssuerError::DigestCollision);
    }

    #[test]
    fn flat_and_structured_agree_on_scalar_only_input() {
        let claims = json_object!({ "given_name": "Albert", "last_name": "Smith" });

        let flat =
            encode_claims(claims.clone(), false, &Sha256, &mut rand::thread_rng()).unwrap();
        let structured = encode_claims(claims, true, &Sha256, &mut rand::thread_rng()).unwrap();

        assert!(flat.claims.is_empty());
        assert!(structured.claims.is_empty());
        assert_eq!(flat.disclosures.len(), 2);
        assert_eq!(structured.disclosures.len(), 2);
    }
}
