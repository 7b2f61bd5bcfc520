//! Keygen round 1: commit to a fresh VSS dealing of the local contribution.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    commitments,
    curve::{CurveTrait, ScalarTrait},
    keygen::{messages::KGRound1Commit, rounds::Base, round_two::RoundTwo},
    errors::Result,
    messages::{KeygenMessageType, Message, MessageType},
    vss::Vss,
};
use rand::{CryptoRng, RngCore};
use tracing::{info, instrument};
use unknown_order::BigNumber;

/// Keygen round 1.
pub struct RoundOne<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> RoundOne<C> {
    pub(crate) fn new(base: Base<C>) -> Self {
        Self { base }
    }

    /// Sample the local contribution `u_i`, deal it with Feldman VSS, and
    /// broadcast a commitment binding the dealing to this session.
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        self.base.begin(1)?;
        let i = self.base.self_index();

        // Keygen instances use a zero nonce; there is no prior shared state
        // to derive one from.
        self.base.temp.ssid_nonce = BigNumber::zero();
        let ssid = self.base.ssid_for(1)?;
        self.base.temp.ssid = ssid.clone();

        let ui = C::Scalar::random(rng);
        let (vss, shares) = Vss::<C>::create(
            self.base.params.threshold(),
            &ui,
            &self.base.params.party_keys(),
            rng,
        )?;

        // The commitment covers the session id and the canonical encodings
        // of the dealt polynomial commitments.
        let mut committed = Vec::with_capacity(vss.commitments().len() + 1);
        committed.push(ssid);
        committed.extend(vss.commitments().iter().map(|point| point.to_bn()));
        let (commitment, decommitment) = commitments::commit(self.base.params.oracle(), committed, rng)?;

        self.base.temp.ui = ui;
        self.base.temp.vss = Some(vss);
        self.base.temp.shares = shares;
        self.base.temp.decommit = Some(decommitment);

        let content = KGRound1Commit { commitment };
        self.base.temp.round1_commits[i] = Some(content.clone());

        info!("broadcasting keygen round 1 commitment");
        let message = Message::broadcast(
            MessageType::Keygen(KeygenMessageType::R1Commit),
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
