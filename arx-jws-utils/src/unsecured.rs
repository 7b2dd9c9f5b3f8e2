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

use crate::{BoxError, JwkPublic, SignatureVerifier, Signer, SigningAlgorithm};

/// [`Signer`] implementation for the `none` algorithm (*Unsecured JWS*, see
/// [RFC7515 Appendix A.5][1]).
///
/// The produced signature is the empty octet string. Only meant for payloads
/// whose integrity is protected by an outer mechanism, e.g. a credential
/// envelope that is itself signed.
///
/// [1]: https://www.rfc-editor.org/rfc/rfc7515.html#appendix-A.5
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsecuredSigner;

impl Signer for UnsecuredSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::None
    }

    fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(Vec::new())
    }

    fn public_jwk(&self) -> Result<JwkPublic, BoxError> {
        Err("unsecured signer has no key material".into())
    }
}

/// [`SignatureVerifier`] counterpart of [`UnsecuredSigner`].
///
/// Accepts exactly the empty signature, rejecting everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsecuredVerifier;

impl SignatureVerifier for UnsecuredVerifier {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::None
    }

    fn verify(
        &self,
        _message: &[u8],
        signature: &[u8],
        _public_key: Option<&JwkPublic>,
    ) -> Result<bool, BoxError> {
        Ok(signature.is_empty())
    }
}
