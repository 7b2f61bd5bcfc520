//! Feldman verifiable secret sharing over a curve's scalar field.
//!
//! A dealer splits a secret `s` into evaluations of a degree-`t` polynomial
//! `p` with `p(0) = s`, and publishes the commitments `vs[k] = a_k · G` to
//! the coefficients. Any holder of a share `(id, p(id))` can check it against
//! the commitments; any `t + 1` distinct shares reconstruct `s`.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

/// One party's share of a dealt secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share<C: CurveTrait> {
    /// The dealing threshold; `threshold + 1` shares reconstruct.
    pub threshold: usize,
    /// The evaluation point assigned to the holder.
    pub id: C::Scalar,
    /// The polynomial evaluation `p(id)`.
    pub share: C::Scalar,
}

impl<C: CurveTrait> Zeroize for Share<C> {
    fn zeroize(&mut self) {
        self.share.zeroize();
    }
}

/// Feldman commitments to a dealt polynomial: `vs[k] = a_k · G` for
/// `k = 0..=t`, with `vs[0]` committing to the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Vss<C: CurveTrait> {
    pub(crate) threshold: usize,
    pub(crate) commitments: Vec<C>,
}

impl<C: CurveTrait> Vss<C> {
    /// Deal `secret` to the parties identified by `ids`.
    ///
    /// Shares are returned in the order of `ids`. Requires `|ids| > t >= 1`
    /// and ids that are pairwise distinct and nonzero mod the group order.
    pub fn create<R: RngCore + CryptoRng>(
        threshold: usize,
        secret: &C::Scalar,
        ids: &[BigNumber],
        rng: &mut R,
    ) -> Result<(Self, Vec<Share<C>>)> {
        if threshold < 1 || ids.len() <= threshold {
            error!(
                "vss requires more parties than the threshold (t={threshold}, n={})",
                ids.len()
            );
            Err(CallerError::ParticipantConfig)?;
        }
        Self::check_indices(ids)?;

        let mut coefficients = Vec::with_capacity(threshold + 1);
        coefficients.push(*secret);
        for _ in 0..threshold {
            coefficients.push(C::Scalar::random(rng));
        }

        let commitments = coefficients.iter().map(|a| C::mul_base(a)).collect();

        let shares = ids
            .iter()
            .map(|id| {
                let point = C::bn_to_scalar(id)?;
                Ok(Share {
                    threshold,
                    id: point,
                    share: evaluate_polynomial::<C>(&coefficients, &point),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for coefficient in &mut coefficients {
            coefficient.zeroize();
        }

        Ok((
            Self {
                threshold,
                commitments,
            },
            shares,
        ))
    }

    /// Check that every id is usable as an evaluation point: nonzero mod the
    /// group order and pairwise distinct after reduction.
    pub fn check_indices(ids: &[BigNumber]) -> Result<()> {
        let order = C::order();
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            let reduced = id % &order;
            if reduced == BigNumber::zero() {
                error!("party id is zero mod the group order");
                Err(CallerError::ParticipantConfig)?;
            }
            if !seen.insert(reduced.to_bytes()) {
                error!("party ids are not pairwise distinct mod the group order");
                Err(CallerError::ParticipantConfig)?;
            }
        }
        Ok(())
    }

    /// Reassemble a commitment vector received from a dealer. The caller is
    /// responsible for having validated each point.
    pub(crate) fn from_commitments(threshold: usize, commitments: Vec<C>) -> Self {
        Self {
            threshold,
            commitments,
        }
    }

    /// The commitments to the polynomial coefficients.
    pub fn commitments(&self) -> &[C] {
        &self.commitments
    }

    /// The commitment to the secret, `s · G`.
    pub fn secret_commitment(&self) -> &C {
        &self.commitments[0]
    }

    /// The dealing threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Evaluate the committed polynomial in the exponent at `id`, i.e.
    /// `p(id) · G` computed from public data only.
    pub fn evaluate_at(&self, id: &C::Scalar) -> C {
        let mut acc = C::identity();
        for commitment in self.commitments.iter().rev() {
            acc = acc.mul(id) + *commitment;
        }
        acc
    }

    /// Check a share against the commitments. Rejection is conclusive
    /// evidence against the dealer.
    pub fn verify_share(&self, share: &Share<C>) -> bool {
        if share.threshold != self.threshold {
            return false;
        }
        self.evaluate_at(&share.id) == C::mul_base(&share.share)
    }
}

/// Reconstruct a secret from at least `threshold + 1` shares with pairwise
/// distinct ids.
pub fn reconstruct<C: CurveTrait>(shares: &[Share<C>], threshold: usize) -> Result<C::Scalar> {
    let mut unique: Vec<&Share<C>> = Vec::with_capacity(shares.len());
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if seen.insert(share.id.to_bytes()) {
            unique.push(share);
        }
    }
    if unique.len() < threshold + 1 {
        error!(
            "reconstruction requires {} distinct shares, got {}",
            threshold + 1,
            unique.len()
        );
        Err(CallerError::InsufficientShares {
            have: unique.len(),
            need: threshold + 1,
        })?;
    }

    let ids: Vec<C::Scalar> = unique.iter().map(|share| share.id).collect();
    let mut secret = C::Scalar::zero();
    for share in unique {
        let coefficient = lagrange_coefficient_at_zero::<C>(&share.id, &ids)?;
        secret = secret.add(&coefficient.mul(&share.share));
    }
    Ok(secret)
}

/// Compute the Lagrange coefficient of `my_point` evaluated at zero, relative
/// to `points`: `λ_i = Π_{j ≠ i} (−x_j) · (x_i − x_j)^{-1}`.
///
/// The distinctness invariant on ids guarantees every denominator is
/// invertible.
pub(crate) fn lagrange_coefficient_at_zero<C: CurveTrait>(
    my_point: &C::Scalar,
    points: &[C::Scalar],
) -> Result<C::Scalar> {
    let mut result = C::Scalar::one();
    for point in points {
        if point != my_point {
            let numerator = point.negate();
            let denominator = my_point.sub(point);
            let inverse = denominator.invert().ok_or_else(|| {
                error!("lagrange denominator is zero; ids were not distinct");
                CallerError::ParticipantConfig
            })?;
            result = result.mul(&numerator.mul(&inverse));
        }
    }
    Ok(result)
}

/// Evaluate `p(x)` by Horner's rule.
fn evaluate_polynomial<C: CurveTrait>(coefficients: &[C::Scalar], x: &C::Scalar) -> C::Scalar {
    let mut acc = C::Scalar::zero();
    for coefficient in coefficients.iter().rev() {
        acc = acc.mul(x).add(coefficient);
    }
    acc
}
