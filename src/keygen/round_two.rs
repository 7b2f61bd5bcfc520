//! Keygen round 2: distribute shares point-to-point and open the round 1
//! commitment with a proof of knowledge of the dealt secret.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::CurveTrait,
    errors::{InternalError, Result},
    keygen::{
        messages::{KGRound2Decommit, KGRound2Share},
        round_three::RoundThree,
        rounds::Base,
    },
    messages::{KeygenMessageType, Message, MessageType},
    zkp::DlogProof,
};
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};

/// Keygen round 2.
pub struct RoundTwo<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> RoundTwo<C> {
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        self.base.begin(2)?;
        let ssid = self.base.ssid_for(2)?;
        self.base.temp.ssid = ssid.clone();

        let i = self.base.self_index();

        // Private shares travel point-to-point over the host's authenticated
        // transport; our own lands directly in its slot.
        let peers = self.base.params.peers().ids().to_vec();
        for (j, peer) in peers.iter().enumerate() {
            let content = KGRound2Share::<C> {
                share: self.base.temp.shares[j].share,
            };
            if j == i {
                self.base.temp.round2_shares[i] = Some(content);
            } else {
                info!("sending keygen share to {peer}");
                let message = Message::p2p(
                    MessageType::Keygen(KeygenMessageType::R2Share),
                    self.base.params.self_id(),
                    peer,
                    &content,
                )?;
                self.base.send(message)?;
            }
        }

        let vss = self.base.temp.vss.as_ref().ok_or_else(|| {
            error!("round 2 started without a round 1 dealing");
            InternalError::InternalInvariantFailed
        })?;
        let proof = DlogProof::prove(
            self.base.params.oracle(),
            &ssid,
            &self.base.temp.ui,
            vss.secret_commitment(),
            rng,
        )?;
        let decommitment = self.base.temp.decommit.clone().ok_or_else(|| {
            error!("round 2 started without a round 1 decommitment");
            InternalError::InternalInvariantFailed
        })?;

        let content = KGRound2Decommit {
            decommitment,
            proof,
        };
        self.base.temp.round2_decommits[i] = Some(content.clone());

        info!("broadcasting keygen round 2 decommitment");
        let message = Message::broadcast(
            MessageType::Keygen(KeygenMessageType::R2Decommit),
            self.base.params.self_id(),
            &content,
        )?;
        self.base.send(message)
    }

    pub(crate) fn finish(mut self) -> RoundThree<C> {
        self.base.started = false;
        RoundThree { base: self.base }
    }
}
