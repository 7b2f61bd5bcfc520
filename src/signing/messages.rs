//! Round message contents for distributed signing.

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
    messages::{Message, MessageType, SigningMessageType},
    zkp::DlogProof,
};
use serde::{Deserialize, Serialize};
use unknown_order::BigNumber;

/// Round 1 broadcast: commitment to the local nonce point `R_i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SignRound1Commit {
    pub commitment: HashCommitment,
}

impl SignRound1Commit {
    pub(crate) fn from_message(message: &Message) -> Result<Self> {
        message.check_type(MessageType::Signing(SigningMessageType::R1Commit))?;
        let content: SignRound1Commit = deserialize!(&message.unverified_bytes)?;
        Ok(content)
    }

    pub(crate) fn validate_basic(&self) -> bool {
        // The oracle never produces more than 256 bits.
        self.commitment.0 > BigNumber::zero() && self.commitment.0.to_bytes().len() <= 32
    }
}

/// Round 2 broadcast: the opening of the round 1 commitment (revealing
/// `R_i`) plus a Schnorr proof of knowledge of the nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub(crate) struct SignRound2Decommit<C: CurveTrait> {
    pub decommitment: HashDecommitment,
    pub proof: DlogProof<C>,
}

impl<C: CurveTrait> SignRound2Decommit<C> {
    pub(crate) fn from_message(message: &Message) -> Result<Self> {
        message.check_type(MessageType::Signing(SigningMessageType::R2Decommit))?;
        let content: SignRound2Decommit<C> = deserialize!(&message.unverified_bytes)?;
        Ok(content)
    }

    pub(crate) fn validate_basic(&self) -> bool {
        !self.decommitment.is_empty()
    }
}

/// Round 3 broadcast: the sender's signature share `s_j`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SignRound3Share<C: CurveTrait> {
    pub si: C::Scalar,
}

impl<C: CurveTrait> SignRound3Share<C> {
    pub(crate) fn from_message(message: &Message) -> Result<Self> {
        message.check_type(MessageType::Signing(SigningMessageType::R3Share))?;
        let content: SignRound3Share<C> = deserialize!(&message.unverified_bytes)?;
        Ok(content)
    }

    pub(crate) fn validate_basic(&self) -> bool {
        // Scalar canonicality is enforced during deserialization.
        true
    }
}
