//! Protocol-level identities and instance parameters.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::CurveTrait,
    errors::{CallerError, Result},
    oracle::RandomOracle,
    vss::Vss,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::error;
use unknown_order::BigNumber;

/// Identity of a protocol participant.
///
/// The `key` is the scalar that identifies the party in protocol math (it is
/// the party's VSS evaluation point); `index` is the party's position in the
/// ordered participant set; `moniker` is a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyId {
    moniker: String,
    key: BigNumber,
    index: usize,
}

impl PartyId {
    /// Create a party id. The index is assigned when the id enters a
    /// [`PeerContext`].
    pub fn new(moniker: impl Into<String>, key: BigNumber) -> Self {
        Self {
            moniker: moniker.into(),
            key,
            index: 0,
        }
    }

    /// Human-readable label.
    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    /// The scalar identifying this party in protocol math.
    pub fn key(&self) -> &BigNumber {
        &self.key
    }

    /// Position in the ordered participant set.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.moniker, self.index)
    }
}

/// The ordered, immutable set of participants of one protocol instance.
///
/// Construction sorts the ids by key and assigns indexes, so that every
/// party that starts from the same id set derives a bit-for-bit identical
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerContext {
    ids: Vec<PartyId>,
}

impl PeerContext {
    /// Build a context from an unordered id set.
    pub fn new(mut ids: Vec<PartyId>) -> Self {
        ids.sort_by(|a, b| a.key.cmp(&b.key));
        for (index, id) in ids.iter_mut().enumerate() {
            id.index = index;
        }
        Self { ids }
    }

    /// The ordered participant ids.
    pub fn ids(&self) -> &[PartyId] {
        &self.ids
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if the context is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The participant keys, in context order.
    pub fn keys(&self) -> Vec<BigNumber> {
        self.ids.iter().map(|id| id.key.clone()).collect()
    }

    /// Locate a party in the context. Requires an exact match on moniker,
    /// key, and index.
    pub fn position(&self, id: &PartyId) -> Option<usize> {
        self.ids.get(id.index).filter(|known| *known == id)?;
        Some(id.index)
    }

    /// True if `id` is a member of this context.
    pub fn contains(&self, id: &PartyId) -> bool {
        self.position(id).is_some()
    }
}

/// Immutable parameters of one protocol instance.
#[derive(Debug, Clone)]
pub struct Parameters<C: CurveTrait> {
    peers: PeerContext,
    self_id: PartyId,
    total: usize,
    threshold: usize,
    oracle: RandomOracle,
    _curve: PhantomData<C>,
}

impl<C: CurveTrait> Parameters<C> {
    /// Build and validate parameters with the default (SHA-512/256) oracle.
    ///
    /// Invariants: `total == |peers| >= 2`, `1 <= threshold < total`, the
    /// local party is a member of `peers`, and all party keys are usable as
    /// VSS evaluation points.
    pub fn new(
        peers: PeerContext,
        self_id: PartyId,
        total: usize,
        threshold: usize,
    ) -> Result<Self> {
        Self::with_oracle(peers, self_id, total, threshold, RandomOracle::default())
    }

    /// Build and validate parameters with an explicit random oracle.
    pub fn with_oracle(
        peers: PeerContext,
        self_id: PartyId,
        total: usize,
        threshold: usize,
        oracle: RandomOracle,
    ) -> Result<Self> {
        if total != peers.len() || total < 2 {
            error!(
                "party count {} does not describe the peer context ({} ids)",
                total,
                peers.len()
            );
            Err(CallerError::ParticipantConfig)?;
        }
        if threshold < 1 || threshold >= total {
            error!("threshold {threshold} is out of range for {total} parties");
            Err(CallerError::ParticipantConfig)?;
        }
        if !peers.contains(&self_id) {
            error!("local party {self_id} is not in the peer context");
            Err(CallerError::ParticipantConfig)?;
        }
        Vss::<C>::check_indices(&peers.keys())?;

        Ok(Self {
            peers,
            self_id,
            total,
            threshold,
            oracle,
            _curve: PhantomData,
        })
    }

    /// The participant set.
    pub fn peers(&self) -> &PeerContext {
        &self.peers
    }

    /// The local party.
    pub fn self_id(&self) -> &PartyId {
        &self.self_id
    }

    /// Index of the local party in the participant set.
    pub fn self_index(&self) -> usize {
        self.self_id.index()
    }

    /// Total number of parties, `n`.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Corruption threshold, `t`. Any `t + 1` parties can sign.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The random oracle backing session ids, commitments, and proofs for
    /// this instance.
    pub fn oracle(&self) -> &RandomOracle {
        &self.oracle
    }

    /// All party keys, in context order.
    pub fn party_keys(&self) -> Vec<BigNumber> {
        self.peers.keys()
    }
}

/// Derive the transcript-binding session id for a round.
///
/// Hashes the curve description, the ordered party keys, the parties' public
/// key points when available (signing), the round number, and the
/// per-instance nonce.
pub(crate) fn compute_ssid<C: CurveTrait>(
    params: &Parameters<C>,
    public_key_points: Option<&[C]>,
    round_number: u16,
    nonce: &BigNumber,
) -> Result<BigNumber> {
    let (gx, gy) = C::generator_coords();
    let mut inputs = vec![C::field_modulus(), C::order(), gx, gy];
    inputs.extend(params.party_keys());
    if let Some(points) = public_key_points {
        inputs.extend(points.iter().map(|point| point.to_bn()));
    }
    inputs.push(BigNumber::from(round_number as u64));
    inputs.push(nonce.clone());
    params.oracle().hash_to_bn(&inputs)
}

/// Generate `count` party ids with fresh random keys.
///
/// Intended for hosts that do not derive party keys from long-term identity
/// material, and for tests.
pub fn generate_party_ids<R: RngCore + CryptoRng>(count: usize, rng: &mut R) -> Vec<PartyId> {
    // Keys are sampled below both supported group orders, so one id set can
    // serve either curve.
    let bound = BigNumber::one() << 250;
    let mut keys = std::collections::HashSet::new();
    let mut ids = Vec::with_capacity(count);
    for i in 1..=count {
        loop {
            let key = crate::utils::random_nonzero_bn(rng, &bound);
            if keys.insert(key.to_bytes()) {
                ids.push(PartyId::new(format!("party-{i}"), key));
                break;
            }
        }
    }
    ids
}
