//! Domain-separated random oracle over vectors of integers.
//!
//! Two instantiations are available: a binary-preimage-resistant hash
//! (SHA-512/256, the default) and an algebraic sponge (Poseidon over the
//! BN254 scalar field, for ZK-friendly deployments). The oracle is selected
//! per protocol instance and backs session ids, commitments, and Schnorr
//! challenges; the EdDSA signature hash is fixed per curve and never routed
//! through here.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::errors::{InternalError, Result};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use tracing::error;
use unknown_order::BigNumber;

/// Widest Poseidon permutation we instantiate. Longer input vectors are
/// absorbed in chained chunks.
const POSEIDON_MAX_INPUTS: usize = 8;

/// Hash from a vector of integers to an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomOracle {
    /// SHA-512 truncated to 256 bits over length-prefixed big-endian
    /// encodings of the inputs.
    #[default]
    Sha512_256,
    /// Poseidon sponge over the BN254 scalar field, with circom parameters.
    /// Inputs are reduced into the field before absorption.
    Poseidon,
}

impl RandomOracle {
    /// Hash a vector of integers to an integer.
    ///
    /// The output is uniform over the oracle's native range (256 bits for
    /// SHA-512/256, the BN254 scalar field for Poseidon); callers reduce it
    /// into their target group with [`rejection_sample`].
    pub fn hash_to_bn(&self, inputs: &[BigNumber]) -> Result<BigNumber> {
        match self {
            RandomOracle::Sha512_256 => Ok(sha512_256i(inputs)),
            RandomOracle::Poseidon => poseidon_hash(inputs),
        }
    }
}

/// SHA-512/256 over the concatenation of `8-byte big-endian length || bytes`
/// for each input, so that no two distinct input vectors collide on framing.
fn sha512_256i(inputs: &[BigNumber]) -> BigNumber {
    let mut hasher = Sha512_256::new();
    for input in inputs {
        let bytes = input.to_bytes();
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(&bytes);
    }
    BigNumber::from_slice(hasher.finalize())
}

/// Poseidon over the BN254 scalar field with circom parameters, matching the
/// iden3 instance. Input vectors wider than the permutation are folded by
/// chaining: each subsequent chunk is absorbed together with the running
/// digest.
pub(crate) fn poseidon_hash(inputs: &[BigNumber]) -> Result<BigNumber> {
    if inputs.is_empty() {
        error!("poseidon hash requires at least one input");
        return Err(InternalError::InternalInvariantFailed);
    }

    let elements: Vec<Fr> = inputs
        .iter()
        .map(|input| Fr::from_be_bytes_mod_order(&input.to_bytes()))
        .collect();

    let mut chunks = elements.chunks(POSEIDON_MAX_INPUTS);
    let first = chunks.next().expect("inputs is non-empty");
    let mut state = poseidon_permutation(first)?;
    for chunk in chunks {
        let mut absorbed = Vec::with_capacity(chunk.len() + 1);
        absorbed.push(state);
        absorbed.extend_from_slice(chunk);
        state = poseidon_permutation(&absorbed)?;
    }

    Ok(BigNumber::from_slice(state.into_bigint().to_bytes_be()))
}

fn poseidon_permutation(elements: &[Fr]) -> Result<Fr> {
    let mut hasher = Poseidon::<Fr>::new_circom(elements.len()).map_err(|e| {
        error!("failed to instantiate poseidon for {} inputs: {e}", elements.len());
        InternalError::InternalInvariantFailed
    })?;
    hasher.hash(elements).map_err(|e| {
        error!("poseidon hashing failed: {e}");
        InternalError::InternalInvariantFailed
    })
}

/// Reduce a hash output into `[0, q)`.
pub(crate) fn rejection_sample(q: &BigNumber, hash: &BigNumber) -> BigNumber {
    hash % q
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(values: &[u32]) -> Vec<BigNumber> {
        values.iter().map(|v| BigNumber::from(*v)).collect()
    }

    #[test]
    fn sha_oracle_is_deterministic_and_framed() {
        let oracle = RandomOracle::Sha512_256;
        let a = oracle.hash_to_bn(&inputs(&[1, 2, 3])).unwrap();
        let b = oracle.hash_to_bn(&inputs(&[1, 2, 3])).unwrap();
        assert_eq!(a, b);

        // Same concatenated bytes, different element boundaries.
        let split = oracle
            .hash_to_bn(&[BigNumber::from(0x0102u32), BigNumber::from(0x03u32)])
            .unwrap();
        let joined = oracle.hash_to_bn(&[BigNumber::from(0x010203u32)]).unwrap();
        assert_ne!(split, joined);
    }

    #[test]
    fn poseidon_oracle_is_deterministic() {
        let oracle = RandomOracle::Poseidon;
        let a = oracle.hash_to_bn(&inputs(&[7, 11])).unwrap();
        let b = oracle.hash_to_bn(&inputs(&[7, 11])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, oracle.hash_to_bn(&inputs(&[7, 12])).unwrap());
    }

    #[test]
    fn poseidon_handles_wide_input_vectors() {
        let oracle = RandomOracle::Poseidon;
        let wide: Vec<BigNumber> = (1..=30u32).map(BigNumber::from).collect();
        let a = oracle.hash_to_bn(&wide).unwrap();
        let b = oracle.hash_to_bn(&wide).unwrap();
        assert_eq!(a, b);

        // Chunk chaining must still separate distinct vectors.
        let mut tweaked = wide.clone();
        tweaked[29] = BigNumber::from(31u32);
        assert_ne!(a, oracle.hash_to_bn(&tweaked).unwrap());
    }

    #[test]
    fn rejection_sample_bounds_output() {
        let q = BigNumber::from(97u32);
        let h = RandomOracle::Sha512_256.hash_to_bn(&inputs(&[42])).unwrap();
        let reduced = rejection_sample(&q, &h);
        assert!(reduced < q);
    }
}
