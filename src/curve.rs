//! Elliptic curve abstraction.
//!
//! The protocols in this crate are generic over a twisted Edwards curve with
//! a prime-order subgroup. Two backends are provided: [`crate::Ed25519`] and
//! [`crate::BabyJubjub`]. Serialized artifacts carry a [`CurveName`] so they
//! can be resolved through the [`registry`] on a different host without any
//! ambient state.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::errors::Result;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, ops::Add};
use unknown_order::BigNumber;
use zeroize::Zeroize;

/// Generic elliptic curve point.
///
/// Implementors wrap a concrete point type and expose the operations the
/// protocols need: group arithmetic, canonical byte codecs with on-curve and
/// subgroup validation, bridges to [`BigNumber`] for transcript hashing, and
/// the curve-fixed EdDSA challenge.
pub trait CurveTrait:
    'static
    + Clone
    + Copy
    + Debug
    + Send
    + Sync
    + Eq
    + PartialEq
    + Serialize
    + for<'de> Deserialize<'de>
    + Add<Output = Self>
    + Zeroize
{
    /// The registry name of the curve, written into serialized artifacts.
    const NAME: CurveName;

    /// Width of the canonical point encoding in bytes.
    const POINT_BYTES: usize;

    /// Width of the canonical scalar encoding in bytes.
    const SCALAR_BYTES: usize;

    /// The type of scalars.
    type Scalar: ScalarTrait;

    /// The canonical generator of the prime-order subgroup.
    fn generator() -> Self;

    /// The identity point, used to initialize point aggregations.
    fn identity() -> Self;

    /// True if this is the identity point.
    fn is_identity(&self) -> bool;

    /// The order of the prime subgroup, `N`.
    fn order() -> BigNumber;

    /// The modulus of the base field, `P`.
    fn field_modulus() -> BigNumber;

    /// Affine coordinates of the generator, `(Gx, Gy)`, as integers. Used in
    /// session id computation.
    fn generator_coords() -> (BigNumber, BigNumber);

    /// Multiply `self` by a [`Self::Scalar`].
    fn mul(&self, scalar: &Self::Scalar) -> Self;

    /// Multiply the generator by a [`Self::Scalar`].
    fn mul_base(scalar: &Self::Scalar) -> Self;

    /// Multiply `self` by a [`BigNumber`], which is first reduced into the
    /// scalar field.
    fn multiply_by_bignum(&self, scalar: &BigNumber) -> Result<Self> {
        Ok(self.mul(&Self::bn_to_scalar(scalar)?))
    }

    /// Multiply the generator by a [`BigNumber`] scalar.
    fn scale_generator(scalar: &BigNumber) -> Result<Self> {
        Ok(Self::mul_base(&Self::bn_to_scalar(scalar)?))
    }

    /// Reduce a [`BigNumber`] mod `N` into a scalar.
    fn bn_to_scalar(x: &BigNumber) -> Result<Self::Scalar>;

    /// Lift a scalar into a [`BigNumber`].
    fn scalar_to_bn(x: &Self::Scalar) -> BigNumber;

    /// Serialize the point with its canonical wire encoding.
    fn to_bytes(&self) -> Vec<u8>;

    /// Deserialize a point from its canonical wire encoding, verifying that
    /// it lies on the curve and in the prime-order subgroup.
    fn try_from_bytes(bytes: &[u8]) -> Result<Self>;

    /// The canonical transcript encoding of the point: its wire bytes read as
    /// a big-endian integer. Used universally when points enter a hash.
    fn to_bn(&self) -> BigNumber {
        BigNumber::from_slice(self.to_bytes())
    }

    /// The EdDSA signature challenge for this curve.
    ///
    /// This hash is fixed by the signature standard of each curve (SHA-512
    /// for ed25519, Poseidon for Baby Jubjub) so that the produced signature
    /// verifies under the curve's ordinary verifier. It is deliberately not
    /// pluggable.
    fn challenge(group_commitment: &Self, public_key: &Self, message: &[u8])
        -> Result<Self::Scalar>;

    /// Pack `(R, s)` into the curve's standard signature encoding.
    fn encode_signature(group_commitment: &Self, s: &Self::Scalar) -> Vec<u8>;
}

/// Scalar trait.
pub trait ScalarTrait:
    'static
    + Clone
    + Copy
    + Debug
    + Send
    + Sync
    + Eq
    + PartialEq
    + Serialize
    + for<'de> Deserialize<'de>
    + Zeroize
{
    /// Return the zero scalar.
    fn zero() -> Self;

    /// Return the one scalar.
    fn one() -> Self;

    /// Add two scalars.
    fn add(&self, other: &Self) -> Self;

    /// Subtract `other` from `self`.
    fn sub(&self, other: &Self) -> Self;

    /// Multiply two scalars.
    fn mul(&self, other: &Self) -> Self;

    /// Negate.
    fn negate(&self) -> Self;

    /// Invert the scalar. Returns `None` for zero.
    fn invert(&self) -> Option<Self>;

    /// True if this is the zero scalar.
    fn is_zero(&self) -> bool;

    /// Sample a uniformly random scalar.
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self;

    /// Canonical fixed-width big-endian encoding.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decode a canonical fixed-width big-endian encoding. Rejects values
    /// that are not fully reduced.
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Name of a supported curve, as written into serialized artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveName {
    /// The prime-order subgroup of edwards25519 (RFC 8032).
    Ed25519,
    /// Baby Jubjub, the twisted Edwards curve embedded in BN254's scalar
    /// field.
    BabyJubjub,
}

impl CurveName {
    /// The wire spelling of the name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveName::Ed25519 => "ed25519",
            CurveName::BabyJubjub => "babyjubjub",
        }
    }
}

impl std::fmt::Display for CurveName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The curve registry.
///
/// Deserialization of persisted key material resolves curve names through
/// this registry; an unregistered name is a hard load error.
pub mod registry {
    use super::CurveName;
    use crate::errors::{CallerError, Result};
    use tracing::error;

    /// All curves known to this build.
    pub const REGISTERED: &[CurveName] = &[CurveName::Ed25519, CurveName::BabyJubjub];

    /// Resolve a wire-level curve name.
    pub fn lookup(name: &str) -> Result<CurveName> {
        REGISTERED
            .iter()
            .copied()
            .find(|curve| curve.as_str() == name)
            .ok_or_else(|| {
                error!("curve `{name}` is not registered");
                CallerError::UnknownCurveName(name.to_string()).into()
            })
    }

    /// True if `name` resolves to a registered curve.
    pub fn is_registered(name: &str) -> bool {
        lookup(name).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_names() {
        assert_eq!(registry::lookup("ed25519").unwrap(), CurveName::Ed25519);
        assert_eq!(
            registry::lookup("babyjubjub").unwrap(),
            CurveName::BabyJubjub
        );
        assert!(registry::lookup("secp256k1").is_err());
        assert!(registry::is_registered("ed25519"));
        assert!(!registry::is_registered("ed448"));
    }
}
