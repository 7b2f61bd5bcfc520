//! Ed25519 curve backend.
//!
//! Points live in the prime-order subgroup of edwards25519; every decoded
//! point is checked to be torsion free, so protocol arithmetic never leaves
//! the subgroup. Wire encoding is the RFC 8032 32-byte compressed form.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::{CurveName, CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
};
use curve25519_dalek::{
    constants::ED25519_BASEPOINT_POINT,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
    traits::{Identity, IsIdentity},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

/// The prime-order subgroup constant `27742317777372353535851937790883648493`,
/// i.e. `L - 2^252`.
const GROUP_ORDER_TAIL: [u8; 16] = [
    0x14, 0xde, 0xf9, 0xde, 0xa2, 0xf7, 0x9c, 0xd6, 0x58, 0x12, 0x63, 0x1a, 0x5c, 0xf5, 0xd3,
    0xed,
];

/// Affine x-coordinate of the basepoint.
const BASEPOINT_X: [u8; 32] = [
    0x21, 0x69, 0x36, 0xd3, 0xcd, 0x6e, 0x53, 0xfe, 0xc0, 0xa4, 0xe2, 0x31, 0xfd, 0xd6, 0xdc,
    0x5c, 0x69, 0x2c, 0xc7, 0x60, 0x95, 0x25, 0xa7, 0xb2, 0xc9, 0x56, 0x2d, 0x60, 0x8f, 0x25,
    0xd5, 0x1a,
];

/// Affine y-coordinate of the basepoint, `4/5 mod p`.
const BASEPOINT_Y: [u8; 32] = [
    0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
    0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
    0x66, 0x58,
];

/// Wrapper around [`EdwardsPoint`] so that we can define our own
/// serialization/deserialization for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519(pub(crate) EdwardsPoint);

impl Ed25519 {
    pub(crate) fn compressed(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }
}

impl std::ops::Add for Ed25519 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Zeroize for Ed25519 {
    fn zeroize(&mut self) {
        self.0 = EdwardsPoint::identity();
    }
}

impl Serialize for Ed25519 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ed25519 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Ed25519::try_from_bytes(&bytes)
            .map_err(|_| serde::de::Error::custom("invalid ed25519 point encoding"))
    }
}

impl CurveTrait for Ed25519 {
    const NAME: CurveName = CurveName::Ed25519;
    const POINT_BYTES: usize = 32;
    const SCALAR_BYTES: usize = 32;

    type Scalar = Scalar;

    fn generator() -> Self {
        Self(ED25519_BASEPOINT_POINT)
    }

    fn identity() -> Self {
        Self(EdwardsPoint::identity())
    }

    fn is_identity(&self) -> bool {
        self.0.is_identity()
    }

    fn order() -> BigNumber {
        (BigNumber::one() << 252) + BigNumber::from_slice(GROUP_ORDER_TAIL)
    }

    fn field_modulus() -> BigNumber {
        (BigNumber::one() << 255) - BigNumber::from(19u32)
    }

    fn generator_coords() -> (BigNumber, BigNumber) {
        (
            BigNumber::from_slice(BASEPOINT_X),
            BigNumber::from_slice(BASEPOINT_Y),
        )
    }

    fn mul(&self, scalar: &Self::Scalar) -> Self {
        Self(self.0 * scalar)
    }

    fn mul_base(scalar: &Self::Scalar) -> Self {
        Self(EdwardsPoint::mul_base(scalar))
    }

    fn bn_to_scalar(x: &BigNumber) -> Result<Self::Scalar> {
        let reduced = x % Self::order();
        let mut le_bytes: [u8; 32] = crate::utils::bn_to_fixed_bytes(&reduced, 32)?
            .try_into()
            .map_err(|_| CallerError::SerializationFailed)?;
        le_bytes.reverse();

        let mut scalar = Scalar::from_bytes_mod_order(le_bytes);
        le_bytes.zeroize();

        // Mirror the sign if the original input was negative.
        if x < &BigNumber::zero() {
            scalar = -scalar;
        }
        Ok(scalar)
    }

    fn scalar_to_bn(x: &Self::Scalar) -> BigNumber {
        let mut be_bytes = x.to_bytes();
        be_bytes.reverse();
        BigNumber::from_slice(be_bytes)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.compressed().to_vec()
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        let compressed = CompressedEdwardsY::from_slice(bytes).map_err(|_| {
            error!("ed25519 point encoding must be exactly 32 bytes");
            CallerError::DeserializationFailed
        })?;
        let point = compressed.decompress().ok_or_else(|| {
            error!("failed to decompress bytes as an ed25519 point");
            CallerError::DeserializationFailed
        })?;
        if !point.is_torsion_free() {
            error!("ed25519 point is not in the prime-order subgroup");
            Err(CallerError::DeserializationFailed)?;
        }
        Ok(Self(point))
    }

    /// RFC 8032 challenge: `SHA-512(enc(R) || enc(A) || M)` reduced mod `L`.
    fn challenge(
        group_commitment: &Self,
        public_key: &Self,
        message: &[u8],
    ) -> Result<Self::Scalar> {
        let digest = Sha512::new()
            .chain_update(group_commitment.compressed())
            .chain_update(public_key.compressed())
            .chain_update(message)
            .finalize();
        Ok(Scalar::from_bytes_mod_order_wide(&digest.into()))
    }

    fn encode_signature(group_commitment: &Self, s: &Self::Scalar) -> Vec<u8> {
        let mut signature = Vec::with_capacity(64);
        signature.extend_from_slice(&group_commitment.compressed());
        signature.extend_from_slice(&s.to_bytes());
        signature
    }
}

impl ScalarTrait for Scalar {
    fn zero() -> Self {
        Scalar::ZERO
    }

    fn one() -> Self {
        Scalar::ONE
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    fn mul(&self, other: &Self) -> Self {
        self * other
    }

    fn negate(&self) -> Self {
        -self
    }

    fn invert(&self) -> Option<Self> {
        if ScalarTrait::is_zero(self) {
            return None;
        }
        Some(Scalar::invert(self))
    }

    fn is_zero(&self) -> bool {
        self == &Scalar::ZERO
    }

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Scalar::random(rng)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Scalar::to_bytes(self);
        bytes.reverse();
        bytes.to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut le_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            error!("ed25519 scalar encoding must be exactly 32 bytes");
            CallerError::DeserializationFailed
        })?;
        le_bytes.reverse();
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(le_bytes).into();
        scalar.ok_or_else(|| {
            error!("ed25519 scalar encoding is not fully reduced");
            CallerError::DeserializationFailed.into()
        })
    }
}
