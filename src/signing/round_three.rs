//! Signing round 3: verify every nonce, derive the challenge, and broadcast
//! the local response share.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    commitments,
    curve::{CurveTrait, ScalarTrait},
    errors::{InternalError, Result},
    messages::{Message, MessageType, SigningMessageType},
    signing::{messages::SignRound3Share, rounds::Base, Finalization},
    utils::bn_to_fixed_bytes,
};
use tracing::{error, info, instrument};

/// Signing round 3.
pub struct RoundThree<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> RoundThree<C> {
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start(&mut self) -> Result<()> {
        self.base.begin(3)?;
        self.base.temp.ssid = self.base.ssid_for(3)?;

        // Proofs and commitments were issued under the earlier rounds' ids.
        let r1_ssid = self.base.ssid_for(1)?;
        let r2_ssid = self.base.ssid_for(2)?;

        let i = self.base.self_index();
        let mut big_r = self.base.temp.big_ri.clone().ok_or_else(|| {
            error!("round 3 started without a round 1 nonce");
            InternalError::InternalInvariantFailed
        })?;

        for j in 0..self.base.params.total() {
            if j == i {
                continue;
            }

            let commit = self.base.temp.round1_commits[j]
                .as_ref()
                .ok_or(InternalError::InternalInvariantFailed)?;
            let decommit = self.base.temp.round2_decommits[j]
                .as_ref()
                .ok_or(InternalError::InternalInvariantFailed)?;

            let opened = commitments::open(
                self.base.params.oracle(),
                &commit.commitment,
                &decommit.decommitment,
            )?;
            let values = match opened {
                Some(values) => values,
                None => {
                    return Err(self
                        .base
                        .culprit("decommitment does not match the round 1 commitment", j))
                }
            };

            // Expected layout: session id followed by the nonce point.
            if values.len() != 2 {
                return Err(self.base.culprit("decommitment has the wrong arity", j));
            }
            if values[0] != r1_ssid {
                return Err(self
                    .base
                    .culprit("decommitment is bound to a different session", j));
            }

            let bytes = bn_to_fixed_bytes(&values[1], C::POINT_BYTES)
                .map_err(|_| self.base.culprit("nonce point is oversized", j))?;
            let big_rj = C::try_from_bytes(&bytes)
                .map_err(|_| self.base.culprit("nonce point is invalid", j))?;

            if !decommit
                .proof
                .verify(self.base.params.oracle(), &r2_ssid, &big_rj)
            {
                return Err(self.base.culprit("schnorr proof of the nonce failed", j));
            }

            big_r = big_r + big_rj;
        }

        // The signature challenge is fixed by the curve's standard; it is
        // what makes the final signature verify under an ordinary verifier.
        let challenge = C::challenge(&big_r, self.base.key.public_key(), &self.base.message)?;
        let si = self
            .base
            .temp
            .ri
            .add(&challenge.mul(&self.base.temp.wi));

        self.base.temp.big_r = Some(big_r);
        self.base.temp.challenge = Some(challenge);
        self.base.temp.si = Some(si);

        let content = SignRound3Share::<C> { si };
        self.base.temp.round3_shares[i] = Some(content.clone());

        info!("broadcasting signing round 3 share");
        let message = Message::broadcast(
            MessageType::Signing(SigningMessageType::R3Share),
            self.base.params.self_id(),
            &content,
        )?;
        self.base.send(message)
    }

    pub(crate) fn finish(mut self) -> Finalization<C> {
        self.base.started = false;
        Finalization { base: self.base }
    }
}
