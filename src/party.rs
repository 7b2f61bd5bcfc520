//! The round state machine and the per-party message router.
//!
//! A protocol is a chain of [`Round`]s. The [`Party`] shell owns the current
//! round, feeds it inbound messages, and advances it whenever all of the
//! round's preconditions are met. Messages for future rounds are buffered in
//! their slots; messages for past rounds are dropped; duplicate deliveries
//! from the same sender are attributed as misbehavior.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{CallerError, InternalError, ProtocolFailure, Result},
    messages::Message,
    protocol::{PartyId, PeerContext},
};
use rand::{CryptoRng, RngCore};
use tracing::{error, info};

/// One round of a multi-round protocol.
///
/// Implemented by per-protocol tagged enums whose variants share a single
/// base record, so state moves from round to round without copying.
pub trait Round: Sized {
    /// Name of the protocol task, used in error attribution.
    fn task_name(&self) -> &'static str;

    /// Execute the round's work and emit its outbound messages.
    fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()>;

    /// True if this message's content tag is valid input for this round.
    fn can_accept(&self, message: &Message) -> bool;

    /// Deserialize, validate, and file a message into its `(round, sender)`
    /// slot. Duplicate or malformed input is attributed to the sender.
    fn store_message(&mut self, message: &Message) -> Result<()>;

    /// Scan the per-sender slots, marking peers whose input for this round
    /// has arrived. Returns true when every precondition is satisfied.
    fn update(&mut self) -> Result<bool>;

    /// True once this round has started and every peer's input has been
    /// accepted.
    fn can_proceed(&self) -> bool;

    /// Consume this round and produce its successor, or signal termination.
    fn next_round(self) -> Result<Transition<Self>>;

    /// Peers whose input for this round is still missing.
    fn waiting_for(&self) -> Vec<PartyId>;

    /// This round's number, starting at 1.
    fn round_number(&self) -> u16;

    /// True once `start` has run for this round.
    fn is_started(&self) -> bool;
}

/// Result of advancing past a round.
pub enum Transition<R> {
    /// The protocol continues with this round.
    Next(R),
    /// The protocol terminated; its output was delivered on the end channel.
    Terminal,
}

/// A local protocol participant: the current round plus the message router.
///
/// A party runs exactly one protocol instance. It is single-writer: the host
/// must not call [`Party::update`] concurrently from multiple threads.
#[derive(Debug)]
pub struct Party<R> {
    round: Option<R>,
    self_id: PartyId,
    peers: PeerContext,
    current_round: u16,
}

impl<R: Round> Party<R> {
    pub(crate) fn new(round: R, self_id: PartyId, peers: PeerContext) -> Self {
        let current_round = round.round_number();
        Self {
            round: Some(round),
            self_id,
            peers,
            current_round,
        }
    }

    /// Kick off round 1. Must be called exactly once, before any messages
    /// are delivered.
    pub fn start<Rng: RngCore + CryptoRng>(&mut self, rng: &mut Rng) -> Result<()> {
        let round = self.round.as_mut().ok_or_else(|| {
            error!("attempted to start a terminated party");
            InternalError::from(CallerError::ProtocolAlreadyTerminated)
        })?;
        if round.is_started() {
            error!("attempted to start a party twice");
            Err(CallerError::BadInput)?;
        }
        info!("{}: starting round 1", self.self_id);
        round.start(rng)?;
        self.current_round = round.round_number();
        self.advance(rng)
    }

    /// Deliver an inbound message.
    ///
    /// Returns whether the message was accepted. Self-echoes and messages
    /// for already-completed rounds are discarded with `Ok(false)`; messages
    /// from unknown senders are a caller error; duplicates and malformed
    /// content abort the protocol with a culprit error.
    pub fn update<Rng: RngCore + CryptoRng>(
        &mut self,
        message: &Message,
        rng: &mut Rng,
    ) -> Result<bool> {
        if self.round.is_none() {
            Err(CallerError::ProtocolAlreadyTerminated)?;
        }

        // The host must not echo a party's own messages back to it.
        if message.from() == &self.self_id {
            return Ok(false);
        }
        if !self.peers.contains(message.from()) {
            error!(
                "discarding message from {}: sender is not in the peer context",
                message.from()
            );
            Err(CallerError::BadInput)?;
        }
        if message.is_broadcast() != message.message_type().expects_broadcast() {
            return Err(self.culprit("message routing flag does not match its type", message));
        }

        let round = self.round.as_mut().expect("checked above");
        if message.message_type().round_number() < round.round_number() {
            // Late duplicate-free traffic for a finished round is harmless.
            return Ok(false);
        }

        round.store_message(message)?;
        self.advance(rng)?;
        Ok(true)
    }

    /// Peers whose input the current round is still missing. Empty once the
    /// protocol has terminated.
    pub fn waiting_for(&self) -> Vec<PartyId> {
        self.round
            .as_ref()
            .map(Round::waiting_for)
            .unwrap_or_default()
    }

    /// The current round number. After termination, the number of the final
    /// round.
    pub fn round_number(&self) -> u16 {
        self.current_round
    }

    /// True once the protocol has delivered its output.
    pub fn is_complete(&self) -> bool {
        self.round.is_none()
    }

    /// The local party's identity.
    pub fn party_id(&self) -> &PartyId {
        &self.self_id
    }

    /// Advance through as many rounds as the buffered messages allow.
    fn advance<Rng: RngCore + CryptoRng>(&mut self, rng: &mut Rng) -> Result<()> {
        loop {
            let Some(round) = self.round.as_mut() else {
                break;
            };
            if !round.is_started() {
                break;
            }
            if !round.update()? || !round.can_proceed() {
                break;
            }
            let round = self.round.take().expect("round is present");
            match round.next_round()? {
                Transition::Next(mut next) => {
                    next.start(rng)?;
                    self.current_round = next.round_number();
                    info!("{}: advanced to round {}", self.self_id, self.current_round);
                    self.round = Some(next);
                }
                Transition::Terminal => {
                    info!("{}: protocol complete", self.self_id);
                    self.round = None;
                }
            }
        }
        Ok(())
    }

    fn culprit(&self, reason: &'static str, message: &Message) -> InternalError {
        error!("{reason} (sender {})", message.from());
        InternalError::ProtocolError(ProtocolFailure {
            task: self
                .round
                .as_ref()
                .map(Round::task_name)
                .unwrap_or("terminated"),
            round: self.current_round,
            reason,
            culprits: vec![message.from().clone()],
        })
    }
}
