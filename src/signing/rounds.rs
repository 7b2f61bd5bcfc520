//! Round chain of the signing protocol.

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
    keygen::Output,
    messages::{Message, MessageType, SigningMessageType},
    party::{Round, Transition},
    protocol::{compute_ssid, Parameters, PartyId},
    signing::{
        messages::{SignRound1Commit, SignRound2Decommit, SignRound3Share},
        round_one::RoundOne,
        round_three::RoundThree,
        round_two::RoundTwo,
        signature::SignatureData,
        Finalization,
    },
};
use rand::{CryptoRng, RngCore};
use std::sync::mpsc::Sender;
use tracing::error;
use unknown_order::BigNumber;
use zeroize::Zeroize;

pub(crate) const TASK_NAME: &str = "eddsa-signing";

/// Ephemeral state of one signing run. Dropped (and wiped) when the protocol
/// terminates, successfully or not.
pub(crate) struct TempData<C: CurveTrait> {
    /// Per-instance nonce mixed into every session id; derived from the
    /// message so all signers agree without coordination.
    pub ssid_nonce: BigNumber,
    /// Session id of the current round.
    pub ssid: BigNumber,
    /// The local effective additive share `w_i · x_i`, where `w_i` is the
    /// Lagrange coefficient of our id within the signing committee.
    pub wi: C::Scalar,
    /// The local nonce `r_i` and its point `R_i`.
    pub ri: C::Scalar,
    pub big_ri: Option<C>,
    /// Opening of the local round 1 commitment.
    pub decommit: Option<HashDecommitment>,
    /// Per-sender message slots, one per `(round, sender)` pair.
    pub round1_commits: Vec<Option<SignRound1Commit>>,
    pub round2_decommits: Vec<Option<SignRound2Decommit<C>>>,
    pub round3_shares: Vec<Option<SignRound3Share<C>>>,
    /// Results computed in round 3, consumed by finalization.
    pub big_r: Option<C>,
    pub challenge: Option<C::Scalar>,
    pub si: Option<C::Scalar>,
}

impl<C: CurveTrait> TempData<C> {
    fn new(total: usize) -> Self {
        Self {
            ssid_nonce: BigNumber::zero(),
            ssid: BigNumber::zero(),
            wi: C::Scalar::zero(),
            ri: C::Scalar::zero(),
            big_ri: None,
            decommit: None,
            round1_commits: vec![None; total],
            round2_decommits: vec![None; total],
            round3_shares: vec![None; total],
            big_r: None,
            challenge: None,
            si: None,
        }
    }
}

impl<C: CurveTrait> Drop for TempData<C> {
    fn drop(&mut self) {
        self.wi.zeroize();
        self.ri.zeroize();
        if let Some(decommit) = &mut self.decommit {
            decommit.zeroize();
        }
        if let Some(si) = &mut self.si {
            si.zeroize();
        }
    }
}

/// State shared by all signing rounds.
pub(crate) struct Base<C: CurveTrait> {
    pub params: Parameters<C>,
    /// The persisted keygen output this signature is produced under.
    pub key: Output<C>,
    /// The message being signed.
    pub message: Vec<u8>,
    pub temp: TempData<C>,
    pub out: Sender<Message>,
    pub end: Sender<SignatureData<C>>,
    /// `ok[j]` records that peer `j`'s input for the current round has been
    /// accepted.
    pub ok: Vec<bool>,
    pub started: bool,
    pub number: u16,
}

impl<C: CurveTrait> Base<C> {
    pub(crate) fn new(
        params: Parameters<C>,
        key: Output<C>,
        message: Vec<u8>,
        out: Sender<Message>,
        end: Sender<SignatureData<C>>,
    ) -> Self {
        let total = params.total();
        Self {
            params,
            key,
            message,
            temp: TempData::new(total),
            out,
            end,
            ok: vec![false; total],
            started: false,
            number: 0,
        }
    }

    pub(crate) fn begin(&mut self, number: u16) -> Result<()> {
        if self.started {
            error!("signing round {number} was started twice");
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

    pub(crate) fn send(&self, message: Message) -> Result<()> {
        self.out.send(message).map_err(|_| {
            error!("host dropped the outbound channel; cancelling signing");
            CallerError::Cancelled.into()
        })
    }

    pub(crate) fn deliver(&self, data: SignatureData<C>) -> Result<()> {
        self.end.send(data).map_err(|_| {
            error!("host dropped the end channel; cancelling signing");
            CallerError::Cancelled.into()
        })
    }

    /// The session id for a given round. Signing ids additionally bind the
    /// parties' public key points.
    pub(crate) fn ssid_for(&self, round_number: u16) -> Result<BigNumber> {
        compute_ssid(
            &self.params,
            Some(&self.key.share_points()),
            round_number,
            &self.temp.ssid_nonce,
        )
    }

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

    /// File a message into its `(round, sender)` slot; write-once semantics
    /// identical to keygen.
    pub(crate) fn store_message(&mut self, message: &Message) -> Result<()> {
        let sender = match self.params.peers().position(message.from()) {
            Some(index) => index,
            None => {
                error!("message sender is not in the signing committee");
                return Err(CallerError::BadInput.into());
            }
        };

        match message.message_type() {
            MessageType::Signing(SigningMessageType::R1Commit) => {
                if self.temp.round1_commits[sender].is_some() {
                    return Err(self.culprit("duplicate round 1 commitment", sender));
                }
                let content = SignRound1Commit::from_message(message)
                    .map_err(|_| self.culprit("malformed round 1 commitment", sender))?;
                if !content.validate_basic() {
                    return Err(self.culprit("round 1 commitment failed validation", sender));
                }
                self.temp.round1_commits[sender] = Some(content);
            }
            MessageType::Signing(SigningMessageType::R2Decommit) => {
                if self.temp.round2_decommits[sender].is_some() {
                    return Err(self.culprit("duplicate round 2 decommitment", sender));
                }
                let content = SignRound2Decommit::from_message(message)
                    .map_err(|_| self.culprit("malformed round 2 decommitment", sender))?;
                if !content.validate_basic() {
                    return Err(self.culprit("round 2 decommitment failed validation", sender));
                }
                self.temp.round2_decommits[sender] = Some(content);
            }
            MessageType::Signing(SigningMessageType::R3Share) => {
                if self.temp.round3_shares[sender].is_some() {
                    return Err(self.culprit("duplicate round 3 share", sender));
                }
                let content = SignRound3Share::from_message(message)
                    .map_err(|_| self.culprit("malformed round 3 share", sender))?;
                if !content.validate_basic() {
                    return Err(self.culprit("round 3 share failed validation", sender));
                }
                self.temp.round3_shares[sender] = Some(content);
            }
            MessageType::Keygen(_) => {
                error!("a keygen message was routed to a signing party");
                return Err(InternalError::InternalInvariantFailed);
            }
        }
        Ok(())
    }
}

/// The signing round chain: three communication rounds plus finalization.
pub enum SigningRound<C: CurveTrait> {
    /// Commit to a fresh nonce point.
    One(RoundOne<C>),
    /// Reveal the nonce point with a proof of knowledge.
    Two(RoundTwo<C>),
    /// Verify every nonce, derive the challenge, share the response.
    Three(RoundThree<C>),
    /// Aggregate, self-verify, and deliver the signature.
    Final(Finalization<C>),
}

impl<C: CurveTrait> SigningRound<C> {
    fn base(&self) -> &Base<C> {
        match self {
            SigningRound::One(r) => &r.base,
            SigningRound::Two(r) => &r.base,
            SigningRound::Three(r) => &r.base,
            SigningRound::Final(r) => &r.base,
        }
    }

    fn base_mut(&mut self) -> &mut Base<C> {
        match self {
            SigningRound::One(r) => &mut r.base,
            SigningRound::Two(r) => &mut r.base,
            SigningRound::Three(r) => &mut r.base,
            SigningRound::Final(r) => &mut r.base,
        }
    }
}

impl<C: CurveTrait> Round for SigningRound<C> {
    fn task_name(&self) -> &'static str {
        TASK_NAME
    }

    fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        match self {
            SigningRound::One(r) => r.start(rng),
            SigningRound::Two(r) => r.start(rng),
            SigningRound::Three(r) => r.start(),
            SigningRound::Final(r) => r.start(),
        }
    }

    fn can_accept(&self, message: &Message) -> bool {
        let expected = match self {
            SigningRound::One(_) => MessageType::Signing(SigningMessageType::R1Commit),
            SigningRound::Two(_) => MessageType::Signing(SigningMessageType::R2Decommit),
            SigningRound::Three(_) => MessageType::Signing(SigningMessageType::R3Share),
            SigningRound::Final(_) => return false,
        };
        message.message_type() == expected && message.is_broadcast()
    }

    fn store_message(&mut self, message: &Message) -> Result<()> {
        self.base_mut().store_message(message)
    }

    fn update(&mut self) -> Result<bool> {
        let ready = match self {
            SigningRound::One(r) => r
                .base
                .mark_ok_where(|temp, j| temp.round1_commits[j].is_some()),
            SigningRound::Two(r) => r
                .base
                .mark_ok_where(|temp, j| temp.round2_decommits[j].is_some()),
            SigningRound::Three(r) => r
                .base
                .mark_ok_where(|temp, j| temp.round3_shares[j].is_some()),
            // No messages expected; ready as soon as the round has run.
            SigningRound::Final(r) => r.base.started,
        };
        Ok(ready)
    }

    fn next_round(self) -> Result<Transition<Self>> {
        match self {
            SigningRound::One(r) => Ok(Transition::Next(SigningRound::Two(r.finish()))),
            SigningRound::Two(r) => Ok(Transition::Next(SigningRound::Three(r.finish()))),
            SigningRound::Three(r) => Ok(Transition::Next(SigningRound::Final(r.finish()))),
            // Dropping the final round wipes the temp data.
            SigningRound::Final(_) => Ok(Transition::Terminal),
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
