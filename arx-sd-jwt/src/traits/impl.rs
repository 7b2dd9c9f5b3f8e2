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

use sha2::Digest as _;

use crate::{Hasher, HashingAlgorithm};

/// A [`Hasher`] implementation for the `SHA-256` hash function.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha256;

impl Hasher for Sha256 {
    fn algorithm(&self) -> HashingAlgorithm {
        HashingAlgorithm::Sha256
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        sha2::Sha256::digest(input).to_vec()
    }
}

/// A [`Hasher`] implementation for the `SHA-384` hash function.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha384;

impl Hasher for Sha384 {
    fn algorithm(&self) -> HashingAlgorithm {
        HashingAlgorithm::Sha384
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        sha2::Sha384::digest(input).to_vec()
    }
}

/// A [`Hasher`] implementation for the `SHA-512` hash function.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha512;

impl Hasher for Sha512 {
    fn algorithm(&self) -> HashingAlgorithm {
        HashingAlgorithm::Sha512
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        sha2::Sha512::digest(input).to_vec()
    }
}

/// Resolve a [`Hasher`] for the given registry algorithm.
///
/// Every [`HashingAlgorithm`] variant has a built-in implementation, so this
/// is total; unknown algorithm *names* are already rejected when parsing the
/// `_sd_alg` claim.
pub(crate) fn hasher_for(algorithm: HashingAlgorithm) -> Box<dyn Hasher> {
    match algorithm {
        HashingAlgorithm::Sha256 => Box::new(Sha256),
        HashingAlgorithm::Sha384 => Box::new(Sha384),
        HashingAlgorithm::Sha512 => Box::new(Sha512),
    }
}
