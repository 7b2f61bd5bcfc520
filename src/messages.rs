//! Wire messages exchanged between parties.
//!
//! A [`Message`] carries routing metadata and the serialized round content.
//! Content bytes stay unverified until the receiving round deserializes and
//! validates them; the field name is a reminder.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{InternalError, Result},
    protocol::PartyId,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Message types of the key generation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeygenMessageType {
    /// Round 1: broadcast commitment to the VSS commitments.
    R1Commit,
    /// Round 2: point-to-point secret share.
    R2Share,
    /// Round 2: broadcast decommitment plus Schnorr proof.
    R2Decommit,
}

/// Message types of the signing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningMessageType {
    /// Round 1: broadcast commitment to the nonce point.
    R1Commit,
    /// Round 2: broadcast decommitment plus Schnorr proof.
    R2Decommit,
    /// Round 3: broadcast signature share.
    R3Share,
}

/// Content tag of a [`Message`]; identifies the protocol, round, and variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Key generation traffic.
    Keygen(KeygenMessageType),
    /// Signing traffic.
    Signing(SigningMessageType),
}

impl MessageType {
    /// The round this message type belongs to.
    pub(crate) fn round_number(&self) -> u16 {
        match self {
            MessageType::Keygen(KeygenMessageType::R1Commit) => 1,
            MessageType::Keygen(KeygenMessageType::R2Share) => 2,
            MessageType::Keygen(KeygenMessageType::R2Decommit) => 2,
            MessageType::Signing(SigningMessageType::R1Commit) => 1,
            MessageType::Signing(SigningMessageType::R2Decommit) => 2,
            MessageType::Signing(SigningMessageType::R3Share) => 3,
        }
    }

    /// Whether this message type travels as a broadcast.
    pub(crate) fn expects_broadcast(&self) -> bool {
        !matches!(self, MessageType::Keygen(KeygenMessageType::R2Share))
    }
}

/// A routed protocol message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    message_type: MessageType,
    from: PartyId,
    /// Recipients of a point-to-point message; `None` for broadcasts.
    to: Option<Vec<PartyId>>,
    is_broadcast: bool,
    /// Round content; unvalidated until the receiving round parses it.
    pub(crate) unverified_bytes: Vec<u8>,
}

impl Message {
    /// Build a broadcast message.
    pub(crate) fn broadcast<T: Serialize>(
        message_type: MessageType,
        from: &PartyId,
        content: &T,
    ) -> Result<Self> {
        Ok(Self {
            message_type,
            from: from.clone(),
            to: None,
            is_broadcast: true,
            unverified_bytes: serialize!(content)?,
        })
    }

    /// Build a point-to-point message.
    pub(crate) fn p2p<T: Serialize>(
        message_type: MessageType,
        from: &PartyId,
        to: &PartyId,
        content: &T,
    ) -> Result<Self> {
        Ok(Self {
            message_type,
            from: from.clone(),
            to: Some(vec![to.clone()]),
            is_broadcast: false,
            unverified_bytes: serialize!(content)?,
        })
    }

    /// The content tag.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The sender.
    pub fn from(&self) -> &PartyId {
        &self.from
    }

    /// The recipients; `None` for broadcasts.
    pub fn to(&self) -> Option<&[PartyId]> {
        self.to.as_deref()
    }

    /// Whether the sender flagged this message as a broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.is_broadcast
    }

    /// Assert the message carries the expected content tag.
    pub(crate) fn check_type(&self, expected: MessageType) -> Result<()> {
        if self.message_type != expected {
            error!(
                "a {:?} message was routed to a handler expecting {:?}",
                self.message_type, expected
            );
            return Err(InternalError::InternalInvariantFailed);
        }
        Ok(())
    }
}
