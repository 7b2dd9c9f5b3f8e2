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

use core::fmt;
use std::collections::HashMap;

use arx_jws_utils::base64_url_decode;
use arxerror::{
    traits::{ErrorContext, ForeignError},
    Error,
};

use super::{error::DecodingResult, Value};
use crate::{error::FormatError, utils, DecodingError, Hasher};

/// A single revealable fact of an SD-JWT, in both parsed form and the
/// original serialized form.
///
/// The serialized form is canonical: it is what gets hashed into the signed
/// payload *and* what travels on the wire. It is therefore kept verbatim from
/// construction or parsing onwards; re-encoding the JSON would change the
/// digest.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Disclosure {
    pub(crate) data: DisclosureData,
    // serialized-as-hashed
    serialized: String,
}

impl TryFrom<String> for Disclosure {
    type Error = Error<FormatError>;

    fn try_from(serialized: String) -> Result<Self, Self::Error> {
        let decoded = base64_url_decode(&serialized)
            .foreign_err(|| {
                FormatError::InvalidDisclosure("provided string is not base64".to_string())
            })
            .ctx(|| serialized.clone())?;

        let array: Vec<Value> = serde_json::from_slice(&decoded)
            .foreign_err(|| {
                FormatError::InvalidDisclosure(
                    "decoded string is not a JSON array".to_string(),
                )
            })
            .ctx(|| serialized.clone())?;

        let data = match array.len() {
            3 => {
                let [salt, name, value] = array.try_into().unwrap();
                disclosure_data_object_member(salt, name, value)
            }
            2 => {
                let [salt, value] = array.try_into().unwrap();
                disclosure_data_array_element(salt, value)
            }
            _ => Err(Error::root(FormatError::InvalidDisclosure(format!(
                "deserialized disclosure array has invalid length {}",
                array.len(),
            )))),
        }
        .ctx(|| serialized.clone())?;

        Ok(Self { data, serialized })
    }
}

fn disclosure_data_object_member(
    salt: Value,
    name: Value,
    value: Value,
) -> crate::Result<DisclosureData, FormatError> {
    let Value::String(salt) = salt else {
        return Err(Error::root(FormatError::InvalidDisclosure(
            "salt value is not a string".to_string(),
        )));
    };
    let Value::String(name) = name else {
        return Err(Error::root(FormatError::InvalidDisclosure(
            "claim name is not a string".to_string(),
        )));
    };

    Ok(DisclosureData::ObjectMember { salt, name, value })
}

fn disclosure_data_array_element(salt: Value, value: Value) -> crate::Result<DisclosureData, FormatError> {
    let Value::String(salt) = salt else {
        return Err(Error::root(FormatError::InvalidDisclosure(
            "salt value is not a string".to_string(),
        )));
    };

    Ok(DisclosureData::ArrayElement { salt, value })
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            DisclosureData::ObjectMember { salt, name, value } => {
                write!(f, "[{}, {}, {}]", salt, name, value)
            }
            DisclosureData::ArrayElement { salt, value } => write!(f, "[{}, {}]", salt, value),
        }
    }
}

impl Disclosure {
    /// Construct a new [`Disclosure`] from the given `salt`, `claim_name` and
    /// `claim_value`.
    ///
    /// The serialized form is the base64url encoding (no padding) of the
    /// compact JSON array `[salt, claim_name, claim_value]`, or
    /// `[salt, claim_value]` for the unnamed array-element form.
    pub fn new(salt: Salt, claim_name: Option<String>, claim_value: Value) -> Self {
        let array = match &claim_name {
            Some(name) => Value::Array(vec![
                Value::String(salt.clone()),
                Value::String(name.clone()),
                claim_value.clone(),
            ]),
            None => Value::Array(vec![Value::String(salt.clone()), claim_value.clone()]),
        };

        let serialized = arx_jws_utils::base64_url_encode(array.to_string());

        let data = match claim_name {
            Some(name) => DisclosureData::ObjectMember {
                salt,
                name,
                value: claim_value,
            },
            None => DisclosureData::ArrayElement {
                salt,
                value: claim_value,
            },
        };

        Self { data, serialized }
    }

    /// Disclosure data value.
    pub fn value(&self) -> &Value {
        match &self.data {
            DisclosureData::ObjectMember { value, .. } => value,
            DisclosureData::ArrayElement { value, .. } => value,
        }
    }

    /// Disclosure claim name; [`None`] for the array-element form.
    pub fn claim_name(&self) -> Option<&str> {
        match &self.data {
            DisclosureData::ObjectMember { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Compute the digest of the serialized form under the given [`Hasher`],
    /// base64url-encoded without padding.
    ///
    /// The digest is always computed over the verbatim serialized ASCII
    /// bytes, never over a re-serialization.
    pub fn digest(&self, hasher: impl Hasher) -> Digest {
        utils::base64_url_digest(self.serialized.as_bytes(), hasher)
    }

    /// Serialized form of [`Self`]
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Serialize [`Self`] into an owned [`String`].
    pub fn into_string(self) -> String {
        self.serialized
    }
}

/// Parsed form of a disclosure.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum DisclosureData {
    /// An object member disclosure.
    ObjectMember {
        /// Disclosure hash salt.
        salt: Salt,
        /// Claim name of the disclosure.
        name: String,
        /// Value of the disclosure.
        value: Value,
    },
    /// An array element disclosure.
    ArrayElement {
        /// Disclosure hash salt.
        salt: Salt,
        /// Value of the disclosure.
        value: Value,
    },
}

/// Base64url encoded disclosure hash salt.
pub type Salt = String;

/// Base64url encoded hash value.
pub type Digest = String;

/// Table of received disclosures keyed by their digest, for matching against
/// the digests of the signed payload.
#[derive(Debug)]
pub(crate) struct DisclosureByDigestTable<'a>(pub(crate) HashMap<Digest, &'a Disclosure>);

impl<'a> DisclosureByDigestTable<'a> {
    pub(crate) fn new(
        disclosures: &'a [Disclosure],
        hasher: impl crate::Hasher,
    ) -> DecodingResult<Self> {
        let mut disclosure_by_digest = HashMap::new();
        for disclosure in disclosures {
            let digest = disclosure.digest(&hasher);
            if disclosure_by_digest.insert(digest, disclosure).is_some() {
                return Err(Error::root(DecodingError::DigestCollision));
            }
        }
        Ok(Self(disclosure_by_digest))
    }
}
