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

use std::{collections::HashSet, str::FromStr};

use arxerror::Error;
use serde_json::Value;

use crate::{
    traits::hasher_for,
    utils::{is_reserved_key_name, VecDisplayWrapper, SD_ALG_FIELD_NAME},
    DecodingError, DecodingResult, Disclosure, DisclosureByDigestTable, DisclosureData,
    HashingAlgorithm, JsonObject, ELLIPSIS, SD,
};

/// **Creates** a [JsonObject] from the provided claims and disclosures by
/// resolving the digests found in the claims against the disclosures, as
/// described in [the draft's verification section].
///
/// # Behavior
///
/// - The hash algorithm is taken from the top-level `_sd_alg` claim,
///   defaulting to `sha-256`; an unknown name is fatal.
/// - A digest with no matching disclosure is skipped: it represents a claim
///   that simply was not disclosed.
/// - A disclosure matching no digest is an error: every received disclosure
///   must be accounted for by the signed payload.
/// - Disclosed values are decoded recursively, so disclosures may themselves
///   contain digests of further disclosures.
/// - `_sd` arrays and the top-level `_sd_alg` claim are removed from the
///   output; the decoded claims contain no reserved claim names.
///
/// [the draft's verification section]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1
pub(crate) fn decode_disclosed_claims(
    claims: &JsonObject,
    disclosures: &[Disclosure],
) -> DecodingResult<JsonObject> {
    // Identify the hashing algorithm used for the digests in this payload
    let sd_alg = fetch_hashing_algorithm(claims)?;
    let hasher = hasher_for(sd_alg);

    let mut state = DecoderState::new(DisclosureByDigestTable::new(disclosures, &hasher)?);

    let decoded_claims = decode_object(claims, &mut state, true)?;

    state.finalize()?;

    Ok(decoded_claims)
}

struct DecoderState<'json, 'dis> {
    /// Precomputed disclosure digests for fast lookup. Entries are removed as
    /// they are matched; whatever remains at the end is orphaned.
    disclosures_by_digest: DisclosureByDigestTable<'dis>,

    /// Every digest encountered in the payload so far, to reject duplicates.
    processed_digests: HashSet<&'json str>,
}

impl<'dis> DecoderState<'_, 'dis> {
    fn new(disclosures_by_digest: DisclosureByDigestTable<'dis>) -> Self {
        Self {
            processed_digests: HashSet::new(),
            disclosures_by_digest,
        }
    }

    fn finalize(self) -> DecodingResult<()> {
        if !self.disclosures_by_digest.0.is_empty() {
            let orphan_digests = self.disclosures_by_digest.0.into_keys().collect();
            return Err(Error::root(DecodingError::OrphanDisclosures(
                VecDisplayWrapper(orphan_digests),
            )));
        }

        Ok(())
    }
}

/// Identifies the hashing algorithm used to generate the disclosure digests
/// from the `_sd_alg` claim, as described [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-4.1.1
fn fetch_hashing_algorithm(claims: &JsonObject) -> DecodingResult<HashingAlgorithm> {
    let sd_alg_name = claims
        .get(SD_ALG_FIELD_NAME)
        .map_or(Some(HashingAlgorithm::default().as_str()), |value| {
            value.as_str()
        })
        .ok_or_else(|| Error::root(DecodingError::ReservedKeyName(SD_ALG_FIELD_NAME)))?;

    HashingAlgorithm::from_str(sd_alg_name)
}

fn decode_object<'json, 'dis: 'json>(
    object: &'json JsonObject,
    state: &mut DecoderState<'json, 'dis>,
    top_level: bool,
) -> DecodingResult<JsonObject> {
    let mut decoded_object = JsonObject::new();

    if let Some(sd) = object.get(SD) {
        let sd_array = sd
            .as_array()
            .ok_or_else(|| Error::root(DecodingError::MalformedDigest(sd.to_string())))?;

        for digest in sd_array {
            let Some(disclosure) = process_digest(digest, state)? else {
                // No matching disclosure: the claim was not disclosed.
                continue;
            };

            match disclosure.data {
                DisclosureData::ObjectMember {
                    ref name,
                    ref value,
                    ..
                } => process_member(name, value, &mut decoded_object, state)?,
                _ => {
                    // An array-element disclosure cannot be referenced from
                    // an object's digest set.
                    return Err(Error::root(DecodingError::MismatchedDisclosureFormat));
                }
            }
        }
    }

    for (name, value) in object {
        if name.eq(SD) {
            continue;
        }
        // The `_sd_alg` claim lives only at the top level and is dropped from
        // the output; anywhere else it is a reserved-name violation caught
        // below.
        if name.eq(SD_ALG_FIELD_NAME) && top_level {
            continue;
        }
        process_member(name, value, &mut decoded_object, state)?;
    }

    Ok(decoded_object)
}

/// Processes one (`name`, `value`) member by checking the name for validity,
/// recursively decoding the value, and inserting the result into `object`.
///
/// Fails if `name` is reserved, if recursive decoding fails, or if the
/// insertion would overwrite an existing member.
fn process_member<'json, 'dis: 'json>(
    name: &'json str,
    value: &'json Value,
    object: &mut JsonObject,
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<()> {
    if let Some(reserved) = is_reserved_key_name(name) {
        return Err(Error::root(DecodingError::ReservedKeyName(reserved)));
    }

    let decoded_value = decode_value(value, state)?;

    if object.insert(name.to_string(), decoded_value).is_some() {
        return Err(Error::root(DecodingError::ClaimCollision(name.to_string())));
    }

    Ok(())
}

/// Decodes an array, resolving `{"...": <digest>}` element pointers.
///
/// Array-element disclosures are not *issued* by this crate, but the decode
/// path understands them so that payloads using the draft's extended form
/// still reconstruct.
fn decode_array<'json, 'dis: 'json>(
    array: &'json [Value],
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<Value> {
    let mut decoded_array = Vec::new();

    fn resolve_element<'json, 'dis: 'json>(
        value: &'json Value,
        state: &mut DecoderState<'json, 'dis>,
    ) -> DecodingResult<Option<&'json Value>> {
        let Some(object) = value.as_object() else {
            return Ok(Some(value));
        };
        let Some(digest) = object.get(ELLIPSIS) else {
            return Ok(Some(value));
        };
        if object.len() != 1 {
            return Err(Error::root(DecodingError::MalformedDigest(
                value.to_string(),
            )));
        }

        let Some(disclosure) = process_digest(digest, state)? else {
            return Ok(None);
        };

        if let DisclosureData::ArrayElement { value, .. } = &disclosure.data {
            Ok(Some(value))
        } else {
            // An object-member disclosure cannot be referenced from an array
            // element pointer.
            Err(Error::root(DecodingError::MismatchedDisclosureFormat))
        }
    }

    for value in array {
        if let Some(value) = resolve_element(value, state)? {
            decoded_array.push(decode_value(value, state)?);
        };
    }

    Ok(Value::Array(decoded_array))
}

fn decode_value<'json, 'dis: 'json>(
    value: &'json Value,
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<Value> {
    match value {
        Value::Object(object) => Ok(Value::Object(decode_object(object, state, false)?)),
        Value::Array(array) => decode_array(array, state),
        _ => Ok(value.to_owned()),
    }
}

/// Checks that the digest was not already processed, and resolves it to the
/// matching disclosure (if any), marking that disclosure as used.
fn process_digest<'json, 'dis>(
    digest: &'json Value,
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<Option<&'dis Disclosure>> {
    let digest = digest
        .as_str()
        .ok_or_else(|| Error::root(DecodingError::MalformedDigest(digest.to_string())))?;
    if !state.processed_digests.insert(digest) {
        return Err(Error::root(DecodingError::DuplicateDigest(
            digest.to_owned(),
        )));
    }

    Ok(state.disclosures_by_digest.0.remove(digest))
}

#[cfg(test)]
pub(crate) mod tests {

    use serde_json::{json, Value};

    use crate::{
        decoder::decode_disclosed_claims,
        models::into_object,
        utils::{VecDisplayWrapper, SD_ALG_FIELD_NAME},
        DecodingError, Disclosure, Sha256, ELLIPSIS, SD,
    };

    fn simple_disclosure(name: Option<String>) -> Disclosure {
        Disclosure::new("salt".to_string(), name, Value::String("value".to_string()))
    }

    fn calculate_digest(disclosure: &Disclosure) -> String {
        disclosure.digest(Sha256)
    }

    #[test]
    fn flat_payload_reconstructs() {
        let address = json!({
            "street_address": "Schulstr. 12",
            "locality": "Schulpforta",
            "region": "Sachsen-Anhalt",
            "country": "DE"
        });
        let disclosure = Disclosure::new(
            "2GLC42sKQveCfGfryNRN9w".to_string(),
            Some("address".to_string()),
            address.clone(),
        );

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure)],
            "iss": "https://issuer.example.com",
            "iat": 1683000000,
            "exp": 1883000000,
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            "_sd_alg": "sha-256"
        }));

        let expected_payload = into_object(json!({
            "address": address,
            "iss": "https://issuer.example.com",
            "iat": 1683000000,
            "exp": 1883000000,
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
        }));

        let decoded = decode_disclosed_claims(&payload, &[disclosure]).unwrap();

        assert_eq!(expected_payload, decoded);
    }

    #[test]
    fn structured_payload_reconstructs() {
        let members = [
            ("street_address", "Schulstr. 12"),
            ("locality", "Schulpforta"),
            ("region", "Sachsen-Anhalt"),
            ("country", "DE"),
        ];
        let disclosures: Vec<Disclosure> = members
            .iter()
            .map(|(name, value)| {
                Disclosure::new(
                    format!("salt-{name}"),
                    Some((*name).to_string()),
                    Value::String((*value).to_string()),
                )
            })
            .collect();
        let digests: Vec<Value> = disclosures
            .iter()
            .map(|d| Value::String(calculate_digest(d)))
            .collect();

        let payload = into_object(json!({
            "iss": "https://issuer.example.com",
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            "address": { "_sd": digests },
            "_sd_alg": "sha-256"
        }));

        let expected_payload = into_object(json!({
            "iss": "https://issuer.example.com",
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            "address": {
                "street_address": "Schulstr. 12",
                "locality": "Schulpforta",
                "region": "Sachsen-Anhalt",
                "country": "DE"
            },
        }));

        let decoded = decode_disclosed_claims(&payload, &disclosures).unwrap();

        assert_eq!(expected_payload, decoded);
    }

    #[test]
    fn recursive_disclosure_reconstructs() {
        // The `street_address` digest is hidden inside the `address`
        // disclosure's own value.
        let inner = simple_disclosure(Some("street_address".to_string()));
        let outer = Disclosure::new(
            "outer-salt".to_string(),
            Some("address".to_string()),
            json!({ "_sd": [calculate_digest(&inner)] }),
        );

        let payload = into_object(json!({
            "_sd": [calculate_digest(&outer)],
            "_sd_alg": "sha-256"
        }));

        let expected_payload = into_object(json!({
            "address": { "street_address": "value" },
        }));

        let decoded = decode_disclosed_claims(&payload, &[outer, inner]).unwrap();

        assert_eq!(expected_payload, decoded);
    }

    #[test]
    fn array_element_pointers_reconstruct() {
        let element = Disclosure::new("salt".to_string(), None, Value::String("US".to_string()));

        let payload = into_object(json!({
            "nationalities": [
                "DE",
                { "...": calculate_digest(&element) }
            ],
        }));

        let expected_payload = into_object(json!({
            "nationalities": ["DE", "US"],
        }));

        let decoded = decode_disclosed_claims(&payload, &[element]).unwrap();

        assert_eq!(expected_payload, decoded);
    }

    #[test]
    fn undisclosed_digests_are_dropped() {
        let disclosure = simple_disclosure(Some("key".to_string()));

        let payload = into_object(json!({
            "_sd": [
                calculate_digest(&disclosure),
                "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d2", // no match
                "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d3", // no match
            ],
            "array": [{"...": "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d4"}], // no match
            "_sd_alg": "sha-256"
        }));
        let disclosures = &[disclosure];

        let expected_payload = into_object(json!({
            "key": "value",
            "array": [],
        }));

        let decoded = decode_disclosed_claims(&payload, disclosures).unwrap();

        assert_eq!(expected_payload, decoded);
    }

    #[test]
    fn orphan_disclosure_is_an_error() {
        let used = simple_disclosure(Some("key".to_string()));

        let payload = into_object(json!({
            "address": {
                "_sd": [calculate_digest(&used)]
            },
            "_sd_alg": "sha-256"
        }));

        let orphan = Disclosure::new(
            "other-salt".to_string(),
            Some("key2".to_string()),
            Value::Bool(false),
        );
        let orphan_digest = calculate_digest(&orphan);

        let disclosures = [used, orphan];

        let error = decode_disclosed_claims(&payload, &disclosures).unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::OrphanDisclosures(VecDisplayWrapper(vec![orphan_digest]))
        );
    }

    #[test]
    fn duplicate_digest_in_payload_is_an_error() {
        let duplicate_digest = "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d3".to_string();
        let payload = into_object(json!({
            "_sd": [duplicate_digest.as_str()],
            "array": [{"...": duplicate_digest.as_str()}],
            "_sd_alg": "sha-256"
        }));

        let error = decode_disclosed_claims(&payload, &[]).unwrap_err();

        assert_eq!(error.error, DecodingError::DuplicateDigest(duplicate_digest));
    }

    #[test]
    fn colliding_received_disclosures_are_an_error() {
        let disclosure = simple_disclosure(Some("key".to_string()));

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure)],
        }));
        // The same disclosure twice trivially collides on the digest.
        let disclosures = [disclosure.clone(), disclosure];

        let error = decode_disclosed_claims(&payload, &disclosures).unwrap_err();

        assert_eq!(error.error, DecodingError::DigestCollision);
    }

    #[test]
    fn disclosed_claim_must_not_overwrite_existing_member() {
        let disclosure = simple_disclosure(Some("address".to_string()));

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure)],
            "address": "address_value",
            "_sd_alg": "sha-256"
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures).unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::ClaimCollision("address".to_string())
        );
    }

    #[test]
    fn array_element_disclosure_in_object_digest_set_is_rejected() {
        let disclosure = simple_disclosure(None);

        let payload = into_object(json!({
            SD: [calculate_digest(&disclosure)],
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures).unwrap_err();

        assert_eq!(error.error, DecodingError::MismatchedDisclosureFormat);
    }

    #[test]
    fn object_member_disclosure_in_array_pointer_is_rejected() {
        let disclosure = simple_disclosure(Some("key".to_string()));

        let payload = into_object(json!({
            "array": [{ ELLIPSIS: calculate_digest(&disclosure) }]
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures).unwrap_err();

        assert_eq!(error.error, DecodingError::MismatchedDisclosureFormat);
    }

    #[test]
    fn reserved_name_in_disclosure_is_rejected() {
        for reserved in [SD, ELLIPSIS, SD_ALG_FIELD_NAME] {
            let disclosure = simple_disclosure(Some(reserved.to_string()));

            let payload = into_object(json!({
                SD: [calculate_digest(&disclosure)],
            }));
            let disclosures = &[disclosure];

            let error = decode_disclosed_claims(&payload, disclosures).unwrap_err();

            assert_eq!(error.error, DecodingError::ReservedKeyName(reserved));
        }
    }

    #[test]
    fn reserved_name_inside_disclosed_object_is_rejected() {
        let disclosure = Disclosure::new(
            "salt".to_string(),
            Some("a".to_string()),
            json!({
                ELLIPSIS: 1,
                "b": 2
            }),
        );

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure)]
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures).unwrap_err();

        assert_eq!(error.error, DecodingError::ReservedKeyName(ELLIPSIS));
    }

    #[test]
    fn malformed_array_pointer_with_extra_members_is_rejected() {
        let payload = into_object(json!({
            "address": [
                {"...": "digest1", "extra": "member"}
            ]
        }));

        let error = decode_disclosed_claims(&payload, &[]).unwrap_err();

        assert!(matches!(error.error, DecodingError::MalformedDigest(_)));
    }

    #[test]
    fn non_string_sd_alg_is_rejected() {
        let payload = into_object(json!({
            "_sd_alg": ["sha-256"]
        }));

        let error = decode_disclosed_claims(&payload, &[]).unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::ReservedKeyName(SD_ALG_FIELD_NAME)
        );
    }

    #[test]
    fn unknown_hash_algorithm_is_rejected() {
        let payload = into_object(json!({
            "_sd": [],
            "_sd_alg": "esh-512"
        }));

        let error = decode_disclosed_claims(&payload, &[]).unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::UnsupportedAlgorithm("esh-512".to_owned())
        );
    }

    #[test]
    fn missing_sd_alg_defaults_to_sha256() {
        let disclosure = simple_disclosure(Some("key".to_string()));

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure)],
        }));
        let disclosures = &[disclosure];

        let decoded = decode_disclosed_claims(&payload, disclosures).unwrap();

        assert_eq!(decoded, into_object(json!({ "key": "value" })));
    }

    #[test]
    fn sd_alg_variants_are_honored() {
        for (alg_name, hasher) in [
            ("sha-384", crate::traits::hasher_for(crate::HashingAlgorithm::Sha384)),
            ("sha-512", crate::traits::hasher_for(crate::HashingAlgorithm::Sha512)),
        ] {
            let disclosure = simple_disclosure(Some("key".to_string()));

            let payload = into_object(json!({
                "_sd": [disclosure.digest(&hasher)],
                "_sd_alg": alg_name
            }));
            let disclosures = &[disclosure];

            let decoded = decode_disclosed_claims(&payload, disclosures).unwrap();

            assert_eq!(decoded, into_object(json!({ "key": "value" })));
        }
    }
}
