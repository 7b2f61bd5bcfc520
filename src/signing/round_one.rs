//! Signing round 1: derive the signing weight and commit to a fresh nonce.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    commitments,
    curve::{CurveTrait, ScalarTrait},
    errors::Result,
    messages::{Message, MessageType, SigningMessageType},
    signing::{messages::SignRound1Commit, round_two::RoundTwo, rounds::Base},
    utils::message_nonce,
    vss::lagrange_coefficient_at_zero,
};
use rand::{CryptoRng, RngCore};
use tracing::{info, instrument};

/// Signing round 1.
pub struct RoundOne<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> RoundOne<C> {
    pub(crate) fn new(base: Base<C>) -> Self {
        Self { base }
    }

    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        self.base.begin(1)?;
        let i = self.base.self_index();

        self.base.temp.ssid_nonce = message_nonce(&self.base.message);
        let ssid = self.base.ssid_for(1)?;
        self.base.temp.ssid = ssid.clone();

        // Re-weight the Shamir share into an additive share for this
        // committee: w_i = λ_i(0) · x_i.
        let committee: Vec<C::Scalar> = self
            .base
            .params
            .party_keys()
            .iter()
            .map(|key| C::bn_to_scalar(key))
            .collect::<Result<_>>()?;
        let my_id = C::bn_to_scalar(self.base.params.self_id().key())?;
        let coefficient = lagrange_coefficient_at_zero::<C>(&my_id, &committee)?;
        self.base.temp.wi = coefficient.mul(self.base.key.private_share());

        let ri = C::Scalar::random(rng);
        let big_ri = C::mul_base(&ri);

        let committed = vec![ssid, big_ri.to_bn()];
        let (commitment, decommitment) =
            commitments::commit(self.base.params.oracle(), committed, rng)?;

        self.base.temp.ri = ri;
        self.base.temp.big_ri = Some(big_ri);
        self.base.temp.decommit = Some(decommitment);

        let content = SignRound1Commit { commitment };
        self.base.temp.round1_commits[i] = Some(content.clone());

        info!("broadcasting signing round 1 commitment");
        let message = Message::broadcast(
            MessageType::Signing(SigningMessageType::R1Commit),
            self.base.params.self_id(),
            &content,
        )?;
        self.base.send(message)
    }

    pub(crate) fn finish(mut self) -> RoundTwo<C> {
        self.base.started = false;
        RoundTwo { base: self.base }
    }
}
