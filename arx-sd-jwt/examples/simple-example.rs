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

use arx_jws_utils::{Es256Signer, Es256Verifier};
use arx_sd_jwt::{
    holder::{self, BindingInfo, HolderOptions, PresentationOptions},
    issuer::{self, IssuerOptions},
    json_object,
    verifier::{self, VerifierOptions},
    BindingPayload,
};

/// Current time in seconds from the UNIX epoch.
const CURRENT_TIME: u64 = 100;

/// The claims the holder chooses to reveal.
const REVEALED_CLAIMS: &[&str] = &["given_name", "locality"];

fn main() {
    // the actual issued claims
    let claims = json_object!({
        "given_name": "John",
        "family_name": "Doe",
        "address": {
            "street_address": "Street 17",
            "locality": "New York",
            "postal_code": "07008",
            "country": "US"
        },
    });

    // used to sign the issued credential
    let issuer_signer = Es256Signer::generate("issuer_kid".to_owned()).unwrap();
    let issuer_verifier = Es256Verifier::new(issuer_signer.public_jwk().unwrap());

    // used by the holder to prove possession of the bound key
    let holder_signer = Es256Signer::generate("holder_kid".to_owned()).unwrap();

    let mut rng = rand::thread_rng();

    // issue the given credential, with the nested `address` members
    // disclosable one by one
    let issued = issuer::new(
        "https://example.com/issuer",
        claims,
        &issuer_signer,
        &mut rng,
        IssuerOptions::default()
            .with_structured_claims(true)
            .with_issued_at(CURRENT_TIME)
            .with_expiry(CURRENT_TIME + 365 * 24 * 60 * 60)
            .with_holder_public_key(holder_signer.public_jwk().unwrap()),
    )
    .unwrap()
    .serialize();

    println!("Issued SD-JWT:\n{issued}\n");

    // accept the issued credential on the holder (wallet) side
    let selectable = holder::parse(
        &issued,
        HolderOptions::default().with_signature_verifier(&issuer_verifier),
    )
    .unwrap();

    println!("Selectable Claims: [");
    for claim in &selectable {
        println!("  {}: {}", claim.name.as_deref().unwrap_or("..."), claim.value);
    }
    println!("]\n");

    // disclose only the requested claims, proving key possession for the
    // verifier's challenge
    let revealed: Vec<String> = selectable
        .iter()
        .filter(|claim| {
            claim
                .name
                .as_deref()
                .is_some_and(|name| REVEALED_CLAIMS.contains(&name))
        })
        .map(|claim| claim.disclosure.clone())
        .collect();

    let presentation = holder::create_presentation(
        &issued,
        &revealed,
        PresentationOptions::default().with_holder_binding(BindingInfo {
            payload: BindingPayload {
                nonce: "a-fresh-nonce".to_owned(),
                audience: "https://example.com/verifier".to_owned(),
                issued_at: CURRENT_TIME + 20,
            },
            signer: &holder_signer,
        }),
    )
    .unwrap();

    println!("Presented SD-JWT:\n{presentation}\n");

    // verify the presented credential
    let received_claims = verifier::parse(
        &presentation,
        CURRENT_TIME + 30,
        VerifierOptions::new(&issuer_verifier)
            .with_holder_binding_required(true)
            .with_expected_audience_for_holder_binding("https://example.com/verifier")
            .with_expected_nonce_for_holder_binding("a-fresh-nonce"),
    )
    .unwrap();

    println!(
        "Verified Claims:\n{}",
        serde_json::to_string_pretty(&received_claims).unwrap()
    );
}
