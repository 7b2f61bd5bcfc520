//! Round chain of the key generation protocol.
//!
//! The four rounds share a single [`Base`] record that moves from variant to
//! variant: instance parameters, the channels back to the host, the per-peer
//! `ok` vector, and the ephemeral [`TempData`] holding per-sender message
//! slots and the local secrets of the run.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    commitments::HashDecommitment,
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, InternalError, ProtocolFailure, Result},
    keygen::{
        messages::{KGRound1Commit, KGRound2Decommit, KGRound2Share},
        output::Output,
        round_one::RoundOne,
        round_three::RoundThree,
        round_two::RoundTwo,
        Finalization,
    },
    messages::{KeygenMessageType, Message, MessageType},
    party::{Round, Transition},
    protocol::{compute_ssid, Parameters, PartyId},
    vss::{Share, Vss},
};
use rand::{CryptoRng, RngCore};
use std::sync::mpsc::Sender;
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

pub(crate) const TASK_NAME: &str = "eddsa-keygen";

/// Ephemeral state of one keygen run. Dropped (and wiped) when the protocol
/// terminates, successfully or not.
pub(crate) struct TempData<C: CurveTrait> {
    /// Per-instance nonce mixed into every session id. Zero for keygen.
    pub ssid_nonce: BigNumber,
    /// Session id of the current round.
    pub ssid: BigNumber,
    /// The local contribution `u_i` to the joint secret.
    pub ui: C::Scalar,
    /// The local dealing: commitments and the shares for every party.
    pub vss: Option<Vss<C>>,
    pub shares: Vec<Share<C>>,
    /// Opening of the local round 1 commitment.
    pub decommit: Option<HashDecommitment>,
    /// Per-sender message slots, one per `(round, sender)` pair.
    pub round1_commits: Vec<Option<KGRound1Commit>>,
    pub round2_shares: Vec<Option<KGRound2Share<C>>>,
    pub round2_decommits: Vec<Option<KGRound2Decommit<C>>>,
    /// Results computed in round 3, consumed by finalization.
    pub xi: Option<C::Scalar>,
    pub big_xs: Vec<C>,
    pub public_key: Option<C>,
}

impl<C: CurveTrait> TempData<C> {
    fn new(total: usize) -> Self {
        Self {
            ssid_nonce: BigNumber::zero(),
            ssid: BigNumber::zero(),
            ui: C::Scalar::zero(),
            vss: None,
            shares: Vec::new(),
            decommit: None,
            round1_commits: vec![None; total],
            round2_shares: vec![None; total],
            round2_decommits: vec![None; total],
            xi: None,
            big_xs: Vec::new(),
            public_key: None,
        }
    }
}

impl<C: CurveTrait> Drop for TempData<C> {
    fn drop(&mut self) {
        self.ui.zeroize();
        for share in &mut self.shares {
            share.zeroize();
        }
        if let Some(decommit) = &mut self.decommit {
            decommit.zeroize();
        }
        if let Some(xi) = &mut self.xi {
            xi.zeroize();
        }
    }
}

/// State shared by all keygen rounds.
pub(crate) struct Base<C: CurveTrait> {
    pub params: Parameters<C>,
    pub temp: TempData<C>,
    pub out: Sender<Message>,
    pub end: Sender<Output<C>>,
    /// `ok[j]` records that peer `j`'s input for the current round has been
    /// accepted.
    pub ok: Vec<bool>,
    pub started: bool,
    pub number: u16,
}

impl<C: CurveTrait> Base<C> {
    pub(crate) fn new(
        params: Parameters<C>,
        out: Sender<Message>,
        end: Sender<Output<C>>,
    ) -> Self {
        let total = params.total();
        Self {
            params,
            temp: TempData::new(total),
            out,
            end,
            ok: vec![false; total],
            started: false,
            number: 0,
        }
    }

    /// Enter a round: bump the round number, flip `started`, and clear the
    /// per-peer acceptance vector.
    pub(crate) fn begin(&mut self, number: u16) -> Result<()> {
        if self.started {
            error!("keygen round {number} was started twice");
            Err(CallerError::BadInput)?;
        }
        self.number = number;
        self.started = true;
        for ok in &mut self.ok {
            *ok = false;
        }
        Ok(())
    }

    pub(crate) fn self_index(&self) -> usize {
        self.params.self_index()
    }

    /// Send an outbound message, detecting host cancellation.
    pub(crate) fn send(&self, message: Message) -> Result<()> {
        self.out.send(message).map_err(|_| {
            error!("host dropped the outbound channel; cancelling keygen");
            CallerError::Cancelled.into()
        })
    }

    /// Deliver the final output, detecting host cancellation.
    pub(crate) fn deliver(&self, output: Output<C>) -> Result<()> {
        self.end.send(output).map_err(|_| {
            error!("host dropped the end channel; cancelling keygen");
            CallerError::Cancelled.into()
        })
    }

    /// The session id for a given round of this instance.
    pub(crate) fn ssid_for(&self, round_number: u16) -> Result<BigNumber> {
        compute_ssid(&self.params, None, round_number, &self.temp.ssid_nonce)
    }

    /// Build a culprit error naming peer `index`.
    pub(crate) fn culprit(&self, reason: &'static str, index: usize) -> InternalError {
        let id = self.params.peers().ids()[index].clone();
        error!("{TASK_NAME} round {}: {reason} (culprit {id})", self.number);
        InternalError::ProtocolError(ProtocolFailure {
            task: TASK_NAME,
            round: self.number,
            reason,
            culprits: vec![id],
        })
    }

    pub(crate) fn waiting_for(&self) -> Vec<PartyId> {
        self.params
            .peers()
            .ids()
            .iter()
            .zip(&self.ok)
            .filter(|(_, ok)| !**ok)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Mark `ok[j]` for every peer whose slot satisfies `present`; returns
    /// true when all peers are accounted for.
    pub(crate) fn mark_ok_where(
        &mut self,
        present: impl Fn(&TempData<C>, usize) -> bool,
    ) -> bool {
        let mut all = true;
        for j in 0..self.ok.len() {
            if !self.ok[j] {
                if present(&self.temp, j) {
                    self.ok[j] = true;
                } else {
                    all = false;
                }
            }
        }
        all
    }

    pub(crate) fn mark_all_ok(&mut self) {
        for ok in &mut self.ok {
            *ok = true;
        }
    }

    pub(crate) fn can_proceed(&self) -> bool {
        self.started && self.ok.iter().all(|ok| *ok)
    }

    /// File a message into its `(round, sender)` slot. Slots are write-once:
    /// a second delivery from the same sender is attributed as misbehavior,
    /// as is content that fails to parse or validate.
    pub(crate) fn store_message(&mut self, message: &Message) -> Result<()> {
        let sender = match self.params.peers().position(message.from()) {
            Some(index) => index,
            None => {
                error!("message sender is not in the peer context");
                return Err(CallerError::BadInput.into());
            }
        };

        match message.message_type() {
            MessageType::Keygen(KeygenMessageType::R1Commit) => {
                if self.temp.round1_commits[sender].is_some() {
                    return Err(self.culprit("duplicate round 1 commitment", sender));
                }
                let content = KGRound1Commit::from_message(message)
                    .map_err(|_| self.culprit("malformed round 1 commitment", sender))?;
                if !content.validate_basic() {
                    return Err(self.culprit("round 1 commitment failed validation", sender));
                }
                self.temp.round1_commits[sender] = Some(content);
            }
            MessageType::Keygen(KeygenMessageType::R2Share) => {
                if self.temp.round2_shares[sender].is_some() {
                    return Err(self.culprit("duplicate round 2 share", sender));
                }
                let content = KGRound2Share::from_message(message)
                    .map_err(|_| self.culprit("malformed round 2 share", sender))?;
                if !content.validate_basic() {
                    return Err(self.culprit("round 2 share failed validation", sender));
                }
                self.temp.round2_shares[sender] = Some(content);
            }
            MessageType::Keygen(KeygenMessageType::R2Decommit) => {
                if self.temp.round2_decommits[sender].is_some() {
                    return Err(self.culprit("duplicate round 2 decommitment", sender));
                }
                let content = KGRound2Decommit::from_message(message)
                    .map_err(|_| self.culprit("malformed round 2 decommitment", sender))?;
                if !content.validate_basic() {
                    return Err(self.culprit("round 2 decommitment failed validation", sender));
                }
                self.temp.round2_decommits[sender] = Some(content);
            }
            MessageType::Signing(_) => {
                error!("a signing message was routed to a keygen party");
                return Err(InternalError::InternalInvariantFailed);
            }
        }
        Ok(())
    }
}

/// The keygen round chain: three communication rounds plus finalization.
pub enum KeygenRound<C: CurveTrait> {
    /// Broadcast a commitment to the local VSS dealing.
    One(RoundOne<C>),
    /// Distribute shares point-to-point; reveal the dealing with a proof.
    Two(RoundTwo<C>),
    /// Verify every dealing and assemble the key material.
    Three(RoundThree<C>),
    /// Persist the output and signal termination.
    Final(Finalization<C>),
}

impl<C: CurveTrait> KeygenRound<C> {
    fn base(&self) -> &Base<C> {
        match self {
            KeygenRound::One(r) => &r.base,
            KeygenRound::Two(r) => &r.base,
            KeygenRound::Three(r) => &r.base,
            KeygenRound::Final(r) => &r.base,
        }
    }

    fn base_mut(&mut self) -> &mut Base<C> {
        match self {
            KeygenRound::One(r) => &mut r.base,
            KeygenRound::Two(r) => &mut r.base,
            KeygenRound::Three(r) => &mut r.base,
            KeygenRound::Final(r) => &mut r.base,
        }
    }
}

impl<C: CurveTrait> Round for KeygenRound<C> {
    fn task_name(&self) -> &'static str {
        TASK_NAME
    }

    fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        match self {
            KeygenRound::One(r) => r.start(rng),
            KeygenRound::Two(r) => r.start(rng),
            KeygenRound::Three(r) => r.start(),
            KeygenRound::Final(r) => r.start(),
        }
    }

    fn can_accept(&self, message: &Message) -> bool {
        match self {
            KeygenRound::One(_) => {
                message.message_type() == MessageType::Keygen(KeygenMessageType::R1Commit)
                    && message.is_broadcast()
            }
            KeygenRound::Two(_) => match message.message_type() {
                MessageType::Keygen(KeygenMessageType::R2Share) => !message.is_broadcast(),
                MessageType::Keygen(KeygenMessageType::R2Decommit) => message.is_broadcast(),
                _ => false,
            },
            // The last two rounds expect no incoming messages.
            KeygenRound::Three(_) | KeygenRound::Final(_) => false,
        }
    }

    fn store_message(&mut self, message: &Message) -> Result<()> {
        self.base_mut().store_message(message)
    }

    fn update(&mut self) -> Result<bool> {
        let ready = match self {
            KeygenRound::One(r) => r
                .base
                .mark_ok_where(|temp, j| temp.round1_commits[j].is_some()),
            KeygenRound::Two(r) => r.base.mark_ok_where(|temp, j| {
                temp.round2_shares[j].is_some() && temp.round2_decommits[j].is_some()
            }),
            // No messages expected; ready as soon as the round has run.
            KeygenRound::Three(r) => r.base.started,
            KeygenRound::Final(r) => r.base.started,
        };
        Ok(ready)
    }

    fn next_round(self) -> Result<Transition<Self>> {
        match self {
            KeygenRound::One(r) => Ok(Transition::Next(KeygenRound::Two(r.finish()))),
            KeygenRound::Two(r) => Ok(Transition::Next(KeygenRound::Three(r.finish()))),
            KeygenRound::Three(r) => Ok(Transition::Next(KeygenRound::Final(r.finish()))),
            // Dropping the final round wipes the temp data.
            KeygenRound::Final(_) => Ok(Transition::Terminal),
        }
    }

    fn can_proceed(&self) -> bool {
        self.base().can_proceed()
    }

    fn waiting_for(&self) -> Vec<PartyId> {
        self.base().waiting_for()
    }

    fn round_number(&self) -> u16 {
        self.base().number
    }

    fn is_started(&self) -> bool {
        self.base().started
    }
}
