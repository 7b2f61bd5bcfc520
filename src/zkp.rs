//! Non-interactive Schnorr proof of knowledge of a discrete logarithm.
//!
//! For a public `X = x · G`, the prover publishes `(A, t)` with `A = α · G`,
//! `c = H(ssid, G, X, A)` and `t = α + c·x`. The session id binds the proof
//! to the protocol transcript it was issued in, preventing cross-session
//! replay.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::Result,
    oracle::{rejection_sample, RandomOracle},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

/// Proof of knowledge of the discrete log of a group element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DlogProof<C: CurveTrait> {
    /// The prover's commitment `A = α · G`.
    pub(crate) alpha: C,
    /// The response `t = α + c·x`.
    pub(crate) t: C::Scalar,
}

impl<C: CurveTrait> DlogProof<C> {
    /// Prove knowledge of `x` such that `public = x · G`.
    pub fn prove<R: RngCore + CryptoRng>(
        oracle: &RandomOracle,
        ssid: &BigNumber,
        x: &C::Scalar,
        public: &C,
        rng: &mut R,
    ) -> Result<Self> {
        let mut mask = C::Scalar::random(rng);
        let alpha = C::mul_base(&mask);
        let challenge = Self::challenge(oracle, ssid, public, &alpha)?;
        let t = mask.add(&challenge.mul(x));
        mask.zeroize();
        Ok(Self { alpha, t })
    }

    /// Verify the proof against the statement `public = x · G`.
    pub fn verify(&self, oracle: &RandomOracle, ssid: &BigNumber, public: &C) -> bool {
        if self.alpha.is_identity() {
            error!("schnorr commitment is the identity point");
            return false;
        }
        let challenge = match Self::challenge(oracle, ssid, public, &self.alpha) {
            Ok(challenge) => challenge,
            Err(_) => return false,
        };
        C::mul_base(&self.t) == self.alpha + public.mul(&challenge)
    }

    /// Fiat-Shamir challenge `c = H(ssid, G, X, A) mod N`.
    fn challenge(
        oracle: &RandomOracle,
        ssid: &BigNumber,
        public: &C,
        alpha: &C,
    ) -> Result<C::Scalar> {
        let inputs = [
            ssid.clone(),
            C::generator().to_bn(),
            public.to_bn(),
            alpha.to_bn(),
        ];
        let digest = oracle.hash_to_bn(&inputs)?;
        C::bn_to_scalar(&rejection_sample(&C::order(), &digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{baby_jubjub::BabyJubjub, ed25519::Ed25519, utils::testing::init_testing};

    fn test_ssid() -> BigNumber {
        BigNumber::from(7291u32)
    }

    #[test]
    fn proof_verifies() {
        let mut rng = init_testing();
        let oracle = RandomOracle::default();
        let ssid = test_ssid();

        let x = <Ed25519 as CurveTrait>::Scalar::random(&mut rng);
        let public = Ed25519::mul_base(&x);
        let proof = DlogProof::prove(&oracle, &ssid, &x, &public, &mut rng).unwrap();
        assert!(proof.verify(&oracle, &ssid, &public));
    }

    #[test]
    fn tampered_proofs_are_rejected() {
        let mut rng = init_testing();
        let oracle = RandomOracle::default();
        let ssid = test_ssid();

        let x = <Ed25519 as CurveTrait>::Scalar::random(&mut rng);
        let public = Ed25519::mul_base(&x);
        let proof = DlogProof::prove(&oracle, &ssid, &x, &public, &mut rng).unwrap();

        // Tampered response.
        let mut bad = proof.clone();
        bad.t = bad.t.add(&<Ed25519 as CurveTrait>::Scalar::one());
        assert!(!bad.verify(&oracle, &ssid, &public));

        // Tampered commitment.
        let mut bad = proof.clone();
        bad.alpha = Ed25519::mul_base(&<Ed25519 as CurveTrait>::Scalar::random(&mut rng));
        assert!(!bad.verify(&oracle, &ssid, &public));

        // Identity commitment.
        let mut bad = proof.clone();
        bad.alpha = Ed25519::identity();
        assert!(!bad.verify(&oracle, &ssid, &public));

        // Wrong statement.
        let y = <Ed25519 as CurveTrait>::Scalar::random(&mut rng);
        assert!(!proof.verify(&oracle, &ssid, &Ed25519::mul_base(&y)));
    }

    #[test]
    fn proof_is_bound_to_the_session() {
        let mut rng = init_testing();
        let oracle = RandomOracle::default();

        let x = <Ed25519 as CurveTrait>::Scalar::random(&mut rng);
        let public = Ed25519::mul_base(&x);
        let proof =
            DlogProof::prove(&oracle, &BigNumber::from(1u32), &x, &public, &mut rng).unwrap();
        assert!(!proof.verify(&oracle, &BigNumber::from(2u32), &public));
    }

    #[test]
    fn works_over_baby_jubjub_with_poseidon() {
        let mut rng = init_testing();
        let oracle = RandomOracle::Poseidon;
        let ssid = test_ssid();

        let x = <BabyJubjub as CurveTrait>::Scalar::random(&mut rng);
        let public = BabyJubjub::mul_base(&x);
        let proof = DlogProof::prove(&oracle, &ssid, &x, &public, &mut rng).unwrap();
        assert!(proof.verify(&oracle, &ssid, &public));

        let mut bad = proof;
        bad.t = bad.t.add(&<BabyJubjub as CurveTrait>::Scalar::one());
        assert!(!bad.verify(&oracle, &ssid, &public));
    }
}
