//! Round message contents for distributed key generation.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    commitments::{HashCommitment, HashDecommitment},
    curve::CurveTrait,
    errors::Result,
    messages::{KeygenMessageType, Message, MessageType},
    zkp::DlogProof,
};
use serde::{Deserialize, Serialize};
use unknown_order::BigNumber;

/// Round 1 broadcast: commitment to the dealer's VSS commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KGRound1Commit {
    pub commitment: HashCommitment,
}

impl KGRound1Commit {
    pub(crate) fn from_message(message: &Message) -> Result<Self> {
        message.check_type(MessageType::Keygen(KeygenMessageType::R1Commit))?;
        let content: KGRound1Commit = deserialize!(&message.unverified_bytes)?;
        Ok(content)
    }

    pub(crate) fn validate_basic(&self) -> bool {
        // The oracle never produces more than 256 bits.
        self.commitment.0 > BigNumber::zero() && self.commitment.0.to_bytes().len() <= 32
    }
}

/// Round 2 point-to-point: the dealer's secret share for the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KGRound2Share<C: CurveTrait> {
    pub share: C::Scalar,
}

impl<C: CurveTrait> KGRound2Share<C> {
    pub(crate) fn from_message(message: &Message) -> Result<Self> {
        message.check_type(MessageType::Keygen(KeygenMessageType::R2Share))?;
        let content: KGRound2Share<C> = deserialize!(&message.unverified_bytes)?;
        Ok(content)
    }

    pub(crate) fn validate_basic(&self) -> bool {
        // Scalar canonicality is enforced during deserialization.
        true
    }
}

/// Round 2 broadcast: the opening of the round 1 commitment, which
/// reconstitutes the dealer's VSS commitments, plus a Schnorr proof of
/// knowledge of the dealt secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub(crate) struct KGRound2Decommit<C: CurveTrait> {
    pub decommitment: HashDecommitment,
    pub proof: DlogProof<C>,
}

impl<C: CurveTrait> KGRound2Decommit<C> {
    pub(crate) fn from_message(message: &Message) -> Result<Self> {
        message.check_type(MessageType::Keygen(KeygenMessageType::R2Decommit))?;
        let content: KGRound2Decommit<C> = deserialize!(&message.unverified_bytes)?;
        Ok(content)
    }

    pub(crate) fn validate_basic(&self) -> bool {
        !self.decommitment.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ed25519::Ed25519, messages::SigningMessageType, protocol::PartyId,
        utils::testing::init_testing,
    };

    #[test]
    fn round_one_content_round_trips() {
        let _rng = init_testing();
        let from = PartyId::new("alice", BigNumber::from(3u32));
        let content = KGRound1Commit {
            commitment: HashCommitment(BigNumber::from(1234u32)),
        };
        assert!(content.validate_basic());

        let message = Message::broadcast(
            MessageType::Keygen(KeygenMessageType::R1Commit),
            &from,
            &content,
        )
        .unwrap();
        assert_eq!(KGRound1Commit::from_message(&message).unwrap(), content);
    }

    #[test]
    fn empty_commitment_fails_basic_validation() {
        let content = KGRound1Commit {
            commitment: HashCommitment(BigNumber::zero()),
        };
        assert!(!content.validate_basic());
    }

    #[test]
    fn mistyped_messages_are_rejected() {
        let from = PartyId::new("alice", BigNumber::from(3u32));
        let message = Message::broadcast(
            MessageType::Signing(SigningMessageType::R1Commit),
            &from,
            &KGRound1Commit {
                commitment: HashCommitment(BigNumber::one()),
            },
        )
        .unwrap();
        assert!(KGRound1Commit::from_message(&message).is_err());
        assert!(KGRound2Share::<Ed25519>::from_message(&message).is_err());
    }
}
