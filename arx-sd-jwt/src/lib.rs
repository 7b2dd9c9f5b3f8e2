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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate implements Selective Disclosure JSON Web Tokens.
//!
//! It provides functionality to create, sign, and verify JWTs that support
//! selective disclosure of claims, in accordance with the IETF draft
//! [Selective Disclosure for JWTs (SD-JWT)][1].
//!
//! [1]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt>
//!
//! # Details
//!
//! The protocol involves three parties, each served by one module.
//!
//! * [`issuer`] -- Turns a claim set into salted [`Disclosure`]s, embeds only
//!   their digests in a signed JWT, and emits the Combined Format for
//!   Issuance.
//! * [`holder`] -- Parses an issued credential, lets the caller choose which
//!   disclosures to forward, optionally proves possession of a bound key, and
//!   emits the Combined Format for Presentation.
//! * [`verifier`] -- Validates a presentation: issuer signature, time claims,
//!   holder binding, and reconstruction of the disclosed claims.
//!
//! Cryptography enters only through the [`Signer`][arx_jws_utils::Signer] and
//! [`SignatureVerifier`][arx_jws_utils::SignatureVerifier] capabilities of
//! [`arx_jws_utils`], plus a caller-supplied cryptographically secure random
//! source, so the protocol logic itself is deterministic and stateless per
//! transaction.
//!
//! # Example
//!
//! A round trip over all three parties:
//!
//! ```
//! use arx_jws_utils::{Es256Signer, Es256Verifier};
//! use arx_sd_jwt::{holder, issuer, json_object, verifier};
//!
//! let signer = Es256Signer::generate("issuer-key-1".to_owned()).unwrap();
//!
//! let token = issuer::new(
//!     "https://example.com/issuer",
//!     json_object!({ "given_name": "Albert", "last_name": "Smith" }),
//!     &signer,
//!     &mut rand::thread_rng(),
//!     issuer::IssuerOptions::default(),
//! )
//! .unwrap();
//!
//! let issuance = token.serialize();
//!
//! let issuer_verifier = Es256Verifier::new(signer.public_jwk().unwrap());
//! let claims = holder::parse(
//!     &issuance,
//!     holder::HolderOptions::default().with_signature_verifier(&issuer_verifier),
//! )
//! .unwrap();
//!
//! let selected: Vec<String> = claims
//!     .iter()
//!     .filter(|claim| claim.name.as_deref() == Some("given_name"))
//!     .map(|claim| claim.disclosure.clone())
//!     .collect();
//!
//! let presentation = holder::create_presentation(
//!     &issuance,
//!     &selected,
//!     holder::PresentationOptions::default(),
//! )
//! .unwrap();
//!
//! let verified = verifier::parse(
//!     &presentation,
//!     100, // current UNIX time, injected for testability
//!     verifier::VerifierOptions::new(&issuer_verifier),
//! )
//! .unwrap();
//!
//! assert_eq!(verified.get("given_name").unwrap(), "Albert");
//! assert!(verified.get("last_name").is_none());
//! ```

// Re-export the `arx-jws-utils` crate
pub use arx_jws_utils;
pub use error::{FormatError, Result, SignatureError};

mod combined;
mod decoder;
mod encoder;
mod error;
mod holder_binding;
mod models;
#[cfg(test)]
mod test_utils;
mod traits;
mod utils;

pub mod holder;
pub mod issuer;
pub mod verifier;

pub use combined::{CombinedFormatForIssuance, CombinedFormatForPresentation};
pub use holder_binding::{BindingError, BindingPayload};
pub use issuer::{SdJwtHeader, SdJwtPayload};
pub use models::*;
pub use traits::*;
