//! Output of distributed key generation: the local party's long-term share
//! and the public key material of the whole group.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::{registry, CurveTrait},
    errors::{CallerError, InternalError, Result},
    protocol::{PartyId, PeerContext},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use zeroize::Zeroize;

/// One party's public key point, `BigX_j = x_j · G`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct KeySharePublic<C: CurveTrait> {
    participant: PartyId,
    point: C,
}

impl<C: CurveTrait> KeySharePublic<C> {
    pub(crate) fn new(participant: PartyId, point: C) -> Self {
        Self { participant, point }
    }

    /// The party this key share belongs to.
    pub fn participant(&self) -> &PartyId {
        &self.participant
    }

    /// The public key point.
    pub fn point(&self) -> &C {
        &self.point
    }
}

/// Per-party keygen output, persisted by the host between key generation and
/// signing.
///
/// # 🔒 Storage requirements
/// The `private_share` field is the party's long-term secret. The caller is
/// responsible for storing the serialized record securely and for wiping any
/// plaintext copies; [`Output`] implements [`Zeroize`] to help with the
/// latter.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Output<C: CurveTrait> {
    threshold: usize,
    private_share: C::Scalar,
    public_key: C,
    public_key_shares: Vec<KeySharePublic<C>>,
    peers: PeerContext,
}

/// Curve-tagged wrapper for the persisted encoding.
#[derive(Serialize, Deserialize)]
struct TaggedRecord {
    curve: String,
    record: Vec<u8>,
}

impl<C: CurveTrait> Output<C> {
    pub(crate) fn from_parts(
        threshold: usize,
        private_share: C::Scalar,
        public_key: C,
        public_key_shares: Vec<KeySharePublic<C>>,
        peers: PeerContext,
    ) -> Result<Self> {
        if public_key_shares.len() != peers.len() {
            error!("every party must have exactly one public key share");
            return Err(InternalError::InternalInvariantFailed);
        }
        Ok(Self {
            threshold,
            private_share,
            public_key,
            public_key_shares,
            peers,
        })
    }

    /// The threshold the key was generated under.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The local party's long-term secret share, `x_i`.
    pub fn private_share(&self) -> &C::Scalar {
        &self.private_share
    }

    /// The aggregate group public key, `Y`.
    pub fn public_key(&self) -> &C {
        &self.public_key
    }

    /// Every party's public key point, in peer-context order.
    pub fn public_key_shares(&self) -> &[KeySharePublic<C>] {
        &self.public_key_shares
    }

    /// The participant set the key was generated with.
    pub fn peers(&self) -> &PeerContext {
        &self.peers
    }

    /// The public key points alone, in peer-context order.
    pub(crate) fn share_points(&self) -> Vec<C> {
        self.public_key_shares
            .iter()
            .map(|share| *share.point())
            .collect()
    }

    /// Deterministically encode the record, tagged with the curve name.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let tagged = TaggedRecord {
            curve: C::NAME.as_str().to_string(),
            record: serialize!(self)?,
        };
        Ok(serialize!(&tagged)?)
    }

    /// Decode a record produced by [`Output::to_bytes`].
    ///
    /// The embedded curve name is resolved through the curve registry;
    /// unknown names and records for a different curve are hard errors.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let tagged: TaggedRecord = deserialize!(bytes)?;
        let name = registry::lookup(&tagged.curve)?;
        if name != C::NAME {
            error!(
                "key share record is for curve {} but was loaded as {}",
                tagged.curve,
                C::NAME
            );
            Err(CallerError::CurveMismatch {
                expected: C::NAME.as_str(),
                got: tagged.curve,
            })?;
        }
        Ok(deserialize!(&tagged.record)?)
    }
}

impl<C: CurveTrait> Zeroize for Output<C> {
    fn zeroize(&mut self) {
        self.private_share.zeroize();
    }
}

// Implement custom Debug to avoid leaking secret information.
impl<C: CurveTrait> std::fmt::Debug for Output<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("keygen::Output")
            .field("threshold", &self.threshold)
            .field("public_key", &self.public_key)
            .field("peers", &self.peers)
            .field("private_share", &"[redacted]")
            .finish()
    }
}
