//! Signing round 2: reveal the nonce point with a proof of knowledge.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::CurveTrait,
    errors::{InternalError, Result},
    messages::{Message, MessageType, SigningMessageType},
    signing::{messages::SignRound2Decommit, round_three::RoundThree, rounds::Base},
    zkp::DlogProof,
};
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};

/// Signing round 2.
pub struct RoundTwo<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> RoundTwo<C> {
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        self.base.begin(2)?;
        let i = self.base.self_index();
        let ssid = self.base.ssid_for(2)?;
        self.base.temp.ssid = ssid.clone();

        let big_ri = self.base.temp.big_ri.clone().ok_or_else(|| {
            error!("round 2 started without a round 1 nonce");
            InternalError::InternalInvariantFailed
        })?;
        let proof = DlogProof::prove(
            self.base.params.oracle(),
            &ssid,
            &self.base.temp.ri,
            &big_ri,
            rng,
        )?;
        let decommitment = self.base.temp.decommit.clone().ok_or_else(|| {
            error!("round 2 started without a round 1 decommitment");
            InternalError::InternalInvariantFailed
        })?;

        let content = SignRound2Decommit {
            decommitment,
            proof,
        };
        self.base.temp.round2_decommits[i] = Some(content.clone());

        info!("broadcasting signing round 2 decommitment");
        let message = Message::broadcast(
            MessageType::Signing(SigningMessageType::R2Decommit),
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
