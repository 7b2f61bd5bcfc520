//! Keygen round 3: verify every dealing and assemble the key material.
//!
//! For each peer `j` this round opens the round 1 commitment, reconstitutes
//! the dealt polynomial commitments, checks the Schnorr proof of the dealt
//! secret, and verifies the private share received in round 2. Every failed
//! check aborts the protocol naming `j`. On success the local long-term
//! share, every party's public key point, and the group key are computed.

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
    keygen::{rounds::Base, Finalization},
    utils::bn_to_fixed_bytes,
    vss::{Share, Vss},
};
use tracing::{error, info, instrument};

/// Keygen round 3.
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
        let threshold = self.base.params.threshold();
        let my_id = C::bn_to_scalar(self.base.params.self_id().key())?;

        let mut dealings: Vec<Vss<C>> = Vec::with_capacity(self.base.params.total());
        let mut xi = C::Scalar::zero();

        for j in 0..self.base.params.total() {
            if j == i {
                let own = self.base.temp.vss.clone().ok_or_else(|| {
                    error!("round 3 started without the local dealing");
                    InternalError::InternalInvariantFailed
                })?;
                xi = xi.add(&self.base.temp.shares[i].share);
                dealings.push(own);
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

            // Expected layout: session id followed by t + 1 points.
            if values.len() != threshold + 2 {
                return Err(self.base.culprit("dealing has the wrong arity", j));
            }
            if values[0] != r1_ssid {
                return Err(self.base.culprit("dealing is bound to a different session", j));
            }

            let mut commitments_j = Vec::with_capacity(threshold + 1);
            for value in &values[1..] {
                let bytes = bn_to_fixed_bytes(value, C::POINT_BYTES)
                    .map_err(|_| self.base.culprit("dealing contains an oversized point", j))?;
                let point = C::try_from_bytes(&bytes)
                    .map_err(|_| self.base.culprit("dealing contains an invalid point", j))?;
                commitments_j.push(point);
            }
            let vss_j = Vss::from_commitments(threshold, commitments_j);

            if !decommit
                .proof
                .verify(self.base.params.oracle(), &r2_ssid, vss_j.secret_commitment())
            {
                return Err(self
                    .base
                    .culprit("schnorr proof of the dealt secret failed", j));
            }

            let share_content = self.base.temp.round2_shares[j]
                .as_ref()
                .ok_or(InternalError::InternalInvariantFailed)?;
            let share = Share {
                threshold,
                id: my_id,
                share: share_content.share,
            };
            if !vss_j.verify_share(&share) {
                return Err(self.base.culprit("vss share verification failed", j));
            }

            xi = xi.add(&share.share);
            dealings.push(vss_j);
        }

        // Each party's public key point is the sum of every dealing
        // evaluated (in the exponent) at that party's id; the group key is
        // the sum of the dealt secrets' commitments.
        let mut big_xs = Vec::with_capacity(self.base.params.total());
        for peer in self.base.params.peers().ids() {
            let id = C::bn_to_scalar(peer.key())?;
            let mut point = C::identity();
            for dealing in &dealings {
                point = point + dealing.evaluate_at(&id);
            }
            big_xs.push(point);
        }
        let mut public_key = C::identity();
        for dealing in &dealings {
            public_key = public_key + *dealing.secret_commitment();
        }

        info!("keygen verification complete; key material assembled");
        self.base.temp.xi = Some(xi);
        self.base.temp.big_xs = big_xs;
        self.base.temp.public_key = Some(public_key);

        // This round emits and expects no messages.
        self.base.mark_all_ok();
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Finalization<C> {
        self.base.started = false;
        Finalization { base: self.base }
    }
}
