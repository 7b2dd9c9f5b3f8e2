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

use std::{borrow::Cow, str::FromStr};

use arx_jws_utils::{BoxError, JwkPublic, SignatureVerifier, Signer, SigningAlgorithm};
use serde::{Deserialize, Serialize};

use crate::{json_object, JsonObject};

/// Symbolic signature over the given message with the would-be private key
/// corresponding to the given public key, in lieu of a real signature
/// algorithm.
///
/// Bulky, but tests the important thing: over which message and using which
/// key pair was the signature produced, regardless of the (correctness of
/// the) implementation of the signature algorithm.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct StubSignature<'m, 'k>(Cow<'m, [u8]>, Cow<'k, JwkPublic>);

impl StubSignature<'_, '_> {
    pub(crate) fn matches(&self, message: &[u8], public_key: &JwkPublic) -> bool {
        self == &StubSignature(message.into(), Cow::Borrowed(public_key))
    }
}

/// Signer whose "signature" symbolically records the message and the signing
/// key pair's public half.
pub(crate) struct StubSigner {
    pub(crate) public_jwk: JwkPublic,
}

impl StubSigner {
    pub(crate) fn new(public_jwk: JwkPublic) -> Self {
        Self { public_jwk }
    }
}

impl Default for StubSigner {
    fn default() -> Self {
        Self::new(dummy_public_jwk())
    }
}

impl Signer for StubSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::from_str(self.public_jwk.get("alg").unwrap().as_str().unwrap()).unwrap()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_string(&StubSignature(
            message.into(),
            Cow::Borrowed(&self.public_jwk),
        ))?
        .into_bytes())
    }

    fn kid(&self) -> Option<&str> {
        self.public_jwk.get("kid").and_then(|kid| kid.as_str())
    }

    fn public_jwk(&self) -> Result<JwkPublic, BoxError> {
        Ok(self.public_jwk.clone())
    }
}

/// Verifier counterpart of [`StubSigner`].
///
/// The key pinned at construction stands in for the verifier's trust anchor
/// and is used when the call site pins no key of its own (the issuer-JWT
/// path); a per-call key (the `cnf` path) takes precedence, exactly like the
/// production implementations.
#[derive(Clone)]
pub(crate) struct StubVerifier {
    pub(crate) public_jwk: JwkPublic,
}

impl Default for StubVerifier {
    fn default() -> Self {
        Self::new(dummy_public_jwk())
    }
}

impl StubVerifier {
    pub(crate) fn new(public_jwk: JwkPublic) -> Self {
        Self { public_jwk }
    }
}

impl SignatureVerifier for StubVerifier {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::from_str(self.public_jwk.get("alg").unwrap().as_str().unwrap()).unwrap()
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: Option<&JwkPublic>,
    ) -> Result<bool, BoxError> {
        let Ok(symbolic_signature) = serde_json::from_slice::<StubSignature>(signature) else {
            return Ok(false);
        };
        let expected_key = public_key.unwrap_or(&self.public_jwk);
        Ok(symbolic_signature.matches(message, expected_key))
    }
}

pub(crate) fn dummy_public_jwk() -> JsonObject {
    json_object!({
        "kid": "issuer-key-1",
        "alg": "ES256",
    })
}

pub(crate) fn holder_public_jwk() -> JsonObject {
    json_object!({
        "kid": "holder-key-1",
        "alg": "ES256",
    })
}
