//! Baby Jubjub curve backend.
//!
//! The twisted Edwards curve embedded in BN254's scalar field, used for
//! ZK-friendly deployments. Points are restricted to the prime-order subgroup
//! (cofactor 8). Wire encoding is the native affine pair `X || Y`, each a
//! 32-byte big-endian field element.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::{CurveName, CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
    oracle,
};
use ark_ec::{AffineRepr, CurveGroup, Group};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsProjective, Fq, Fr};
use ark_ff::{BigInteger, Field, PrimeField};
use ark_std::{UniformRand, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

/// Wrapper around an [`EdwardsProjective`] Baby Jubjub point so that we can
/// define our own serialization/deserialization for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BabyJubjub(pub(crate) EdwardsProjective);

/// Wrapper around the Baby Jubjub subgroup scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BjjScalar(pub(crate) Fr);

fn fq_to_bn(element: &Fq) -> BigNumber {
    BigNumber::from_slice(element.into_bigint().to_bytes_be())
}

fn fq_from_canonical_bytes(bytes: &[u8]) -> Result<Fq> {
    if BigNumber::from_slice(bytes) >= BabyJubjub::field_modulus() {
        error!("Baby Jubjub coordinate is not a reduced field element");
        Err(CallerError::DeserializationFailed)?;
    }
    Ok(Fq::from_be_bytes_mod_order(bytes))
}

impl std::ops::Add for BabyJubjub {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Zeroize for BabyJubjub {
    fn zeroize(&mut self) {
        self.0 = EdwardsProjective::zero();
    }
}

impl Serialize for BabyJubjub {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BabyJubjub {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        BabyJubjub::try_from_bytes(&bytes)
            .map_err(|_| serde::de::Error::custom("invalid Baby Jubjub point encoding"))
    }
}

impl CurveTrait for BabyJubjub {
    const NAME: CurveName = CurveName::BabyJubjub;
    const POINT_BYTES: usize = 64;
    const SCALAR_BYTES: usize = 32;

    type Scalar = BjjScalar;

    fn generator() -> Self {
        Self(EdwardsProjective::generator())
    }

    fn identity() -> Self {
        Self(EdwardsProjective::zero())
    }

    fn is_identity(&self) -> bool {
        self.0.is_zero()
    }

    fn order() -> BigNumber {
        BigNumber::from_slice(Fr::MODULUS.to_bytes_be())
    }

    fn field_modulus() -> BigNumber {
        BigNumber::from_slice(Fq::MODULUS.to_bytes_be())
    }

    fn generator_coords() -> (BigNumber, BigNumber) {
        let generator = EdwardsAffine::generator();
        (fq_to_bn(&generator.x), fq_to_bn(&generator.y))
    }

    fn mul(&self, scalar: &Self::Scalar) -> Self {
        Self(self.0 * scalar.0)
    }

    fn mul_base(scalar: &Self::Scalar) -> Self {
        Self(EdwardsProjective::generator() * scalar.0)
    }

    fn bn_to_scalar(x: &BigNumber) -> Result<Self::Scalar> {
        let reduced = x % Self::order();
        let bytes = crate::utils::bn_to_fixed_bytes(&reduced, 32)?;
        let mut scalar = Fr::from_be_bytes_mod_order(&bytes);

        // Mirror the sign if the original input was negative.
        if x < &BigNumber::zero() {
            scalar = -scalar;
        }
        Ok(BjjScalar(scalar))
    }

    fn scalar_to_bn(x: &Self::Scalar) -> BigNumber {
        BigNumber::from_slice(x.0.into_bigint().to_bytes_be())
    }

    fn to_bytes(&self) -> Vec<u8> {
        let affine = self.0.into_affine();
        let mut bytes = affine.x.into_bigint().to_bytes_be();
        bytes.extend(affine.y.into_bigint().to_bytes_be());
        bytes
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::POINT_BYTES {
            error!(
                "Baby Jubjub point encoding must be exactly {} bytes",
                Self::POINT_BYTES
            );
            Err(CallerError::DeserializationFailed)?;
        }
        let x = fq_from_canonical_bytes(&bytes[..32])?;
        let y = fq_from_canonical_bytes(&bytes[32..])?;

        let affine = EdwardsAffine::new_unchecked(x, y);
        if !affine.is_on_curve() {
            error!("the given coordinates are not on Baby Jubjub");
            Err(CallerError::DeserializationFailed)?;
        }
        if !affine.is_in_correct_subgroup_assuming_on_curve() {
            error!("Baby Jubjub point is not in the prime-order subgroup");
            Err(CallerError::DeserializationFailed)?;
        }
        Ok(Self(EdwardsProjective::from(affine)))
    }

    /// EdDSA-Poseidon challenge, the curve's native convention:
    /// `Poseidon(R.x, R.y, A.x, A.y, m)` reduced mod the subgroup order.
    fn challenge(
        group_commitment: &Self,
        public_key: &Self,
        message: &[u8],
    ) -> Result<Self::Scalar> {
        let r = group_commitment.0.into_affine();
        let a = public_key.0.into_affine();
        let inputs = [
            fq_to_bn(&r.x),
            fq_to_bn(&r.y),
            fq_to_bn(&a.x),
            fq_to_bn(&a.y),
            BigNumber::from_slice(message),
        ];
        let digest = oracle::poseidon_hash(&inputs)?;
        Self::bn_to_scalar(&(digest % Self::order()))
    }

    fn encode_signature(group_commitment: &Self, s: &Self::Scalar) -> Vec<u8> {
        let mut signature = group_commitment.to_bytes();
        signature.extend(ScalarTrait::to_bytes(s));
        signature
    }
}

impl Zeroize for BjjScalar {
    fn zeroize(&mut self) {
        self.0 = Fr::zero();
    }
}

impl Serialize for BjjScalar {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ScalarTrait::to_bytes(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BjjScalar {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        <BjjScalar as ScalarTrait>::from_bytes(&bytes)
            .map_err(|_| serde::de::Error::custom("invalid Baby Jubjub scalar encoding"))
    }
}

impl ScalarTrait for BjjScalar {
    fn zero() -> Self {
        Self(Fr::zero())
    }

    fn one() -> Self {
        Self(Fr::from(1u64))
    }

    fn add(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    fn sub(&self, other: &Self) -> Self {
        Self(self.0 - other.0)
    }

    fn mul(&self, other: &Self) -> Self {
        Self(self.0 * other.0)
    }

    fn negate(&self) -> Self {
        Self(-self.0)
    }

    fn invert(&self) -> Option<Self> {
        self.0.inverse().map(Self)
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(Fr::rand(rng))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.into_bigint().to_bytes_be()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BabyJubjub::SCALAR_BYTES {
            error!(
                "Baby Jubjub scalar encoding must be exactly {} bytes",
                BabyJubjub::SCALAR_BYTES
            );
            Err(CallerError::DeserializationFailed)?;
        }
        if BigNumber::from_slice(bytes) >= BabyJubjub::order() {
            error!("Baby Jubjub scalar encoding is not fully reduced");
            Err(CallerError::DeserializationFailed)?;
        }
        Ok(Self(Fr::from_be_bytes_mod_order(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;

    #[test]
    fn generator_is_on_curve_and_in_subgroup() {
        let generator = BabyJubjub::generator();
        let bytes = generator.to_bytes();
        assert_eq!(bytes.len(), BabyJubjub::POINT_BYTES);
        // try_from_bytes re-runs the on-curve and subgroup checks.
        assert_eq!(BabyJubjub::try_from_bytes(&bytes).unwrap(), generator);
    }

    #[test]
    fn point_arithmetic_is_consistent() {
        let mut rng = init_testing();
        let a = BjjScalar::random(&mut rng);
        let b = BjjScalar::random(&mut rng);
        let sum = BabyJubjub::mul_base(&a.add(&b));
        assert_eq!(sum, BabyJubjub::mul_base(&a) + BabyJubjub::mul_base(&b));
    }

    #[test]
    fn off_curve_coordinates_are_rejected() {
        let mut bytes = BabyJubjub::generator().to_bytes();
        // Perturb the y coordinate.
        bytes[63] ^= 0x01;
        assert!(BabyJubjub::try_from_bytes(&bytes).is_err());
    }

    #[test]
    fn unreduced_coordinates_are_rejected() {
        let mut bytes = vec![0xffu8; 64];
        bytes[32..].copy_from_slice(&BabyJubjub::generator().to_bytes()[32..]);
        assert!(BabyJubjub::try_from_bytes(&bytes).is_err());
    }

    #[test]
    fn scalar_codec_round_trips() {
        let mut rng = init_testing();
        let scalar = BjjScalar::random(&mut rng);
        let bytes = ScalarTrait::to_bytes(&scalar);
        assert_eq!(bytes.len(), BabyJubjub::SCALAR_BYTES);
        assert_eq!(BjjScalar::from_bytes(&bytes).unwrap(), scalar);

        let order_bytes = crate::utils::bn_to_fixed_bytes(&BabyJubjub::order(), 32).unwrap();
        assert!(BjjScalar::from_bytes(&order_bytes).is_err());
    }

    #[test]
    fn bignum_bridge_agrees_with_scalar_arithmetic() {
        let mut rng = init_testing();
        let scalar = BjjScalar::random(&mut rng);
        let via_bn = BabyJubjub::bn_to_scalar(&BabyJubjub::scalar_to_bn(&scalar)).unwrap();
        assert_eq!(via_bn, scalar);
    }

    #[test]
    fn subgroup_order_kills_the_generator() {
        let order = BabyJubjub::order();
        let point = BabyJubjub::generator().multiply_by_bignum(&order).unwrap();
        assert!(point.is_identity());
    }
}
