//! Hash-based commit / decommit over vectors of integers.
//!
//! `commit` samples a 256-bit blinding factor `r`, forms the decommitment
//! `D = [r] ++ values`, and publishes `C = H(D)`. The scheme is binding under
//! collision resistance of the oracle and hiding under its preimage
//! resistance.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::Result,
    oracle::RandomOracle,
    utils::{bn_to_fixed_bytes, random_positive_bn},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

/// Bits of entropy in the blinding factor.
const BLINDING_BITS: usize = 256;

/// A published commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCommitment(pub(crate) BigNumber);

/// The opening of a [`HashCommitment`]: the blinding factor followed by the
/// committed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDecommitment(pub(crate) Vec<BigNumber>);

impl HashDecommitment {
    /// The committed values, without the blinding factor.
    pub fn values(&self) -> &[BigNumber] {
        &self.0[1..]
    }

    /// Number of committed values, excluding the blinding factor.
    pub fn len(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// True if no values were committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Zeroize for HashDecommitment {
    fn zeroize(&mut self) {
        for value in &mut self.0 {
            value.zeroize();
        }
    }
}

/// Commit to `values`, returning the commitment and its opening.
pub fn commit<R: RngCore + CryptoRng>(
    oracle: &RandomOracle,
    values: Vec<BigNumber>,
    rng: &mut R,
) -> Result<(HashCommitment, HashDecommitment)> {
    let bound = BigNumber::one() << BLINDING_BITS;
    let blinding = random_positive_bn(rng, &bound);

    let mut opening = Vec::with_capacity(values.len() + 1);
    opening.push(blinding);
    opening.extend(values);

    let commitment = oracle.hash_to_bn(&opening)?;
    Ok((HashCommitment(commitment), HashDecommitment(opening)))
}

/// Verify an opening against a commitment, returning the committed values on
/// success. The hash comparison is constant time.
pub fn open<'a>(
    oracle: &RandomOracle,
    commitment: &HashCommitment,
    decommitment: &'a HashDecommitment,
) -> Result<Option<&'a [BigNumber]>> {
    if decommitment.0.is_empty() {
        error!("decommitment is missing its blinding factor");
        return Ok(None);
    }

    let recomputed = oracle.hash_to_bn(&decommitment.0)?;

    // Fixed-width encodings so the comparison does not leak length.
    let expected = bn_to_fixed_bytes(&commitment.0, 64)?;
    let actual = bn_to_fixed_bytes(&recomputed, 64)?;
    if bool::from(expected.ct_eq(&actual)) {
        Ok(Some(decommitment.values()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;

    fn values(values: &[u32]) -> Vec<BigNumber> {
        values.iter().map(|v| BigNumber::from(*v)).collect()
    }

    #[test]
    fn commit_then_open_succeeds() {
        let mut rng = init_testing();
        let oracle = RandomOracle::default();
        let committed = values(&[5, 10, 15]);
        let (commitment, decommitment) = commit(&oracle, committed.clone(), &mut rng).unwrap();
        let opened = open(&oracle, &commitment, &decommitment).unwrap();
        assert_eq!(opened, Some(committed.as_slice()));
    }

    #[test]
    fn tampered_decommitment_is_rejected() {
        let mut rng = init_testing();
        let oracle = RandomOracle::default();
        let (commitment, decommitment) = commit(&oracle, values(&[5, 10, 15]), &mut rng).unwrap();

        // Flip a value.
        let mut tampered = decommitment.clone();
        tampered.0[2] = BigNumber::from(11u32);
        assert!(open(&oracle, &commitment, &tampered).unwrap().is_none());

        // Flip the blinding factor.
        let mut tampered = decommitment.clone();
        tampered.0[0] = &tampered.0[0] + BigNumber::one();
        assert!(open(&oracle, &commitment, &tampered).unwrap().is_none());

        // Drop a value.
        let mut tampered = decommitment;
        tampered.0.pop();
        assert!(open(&oracle, &commitment, &tampered).unwrap().is_none());
    }

    #[test]
    fn commitments_are_randomized() {
        let mut rng = init_testing();
        let oracle = RandomOracle::default();
        let (first, _) = commit(&oracle, values(&[1]), &mut rng).unwrap();
        let (second, _) = commit(&oracle, values(&[1]), &mut rng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn poseidon_oracle_commitments_work() {
        let mut rng = init_testing();
        let oracle = RandomOracle::Poseidon;
        let committed = values(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let (commitment, decommitment) = commit(&oracle, committed.clone(), &mut rng).unwrap();
        let opened = open(&oracle, &commitment, &decommitment).unwrap();
        assert_eq!(opened, Some(committed.as_slice()));
    }
}
