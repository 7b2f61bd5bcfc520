//! Signing finalization: aggregate the response shares, self-verify, and
//! deliver the signature.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{InternalError, Result},
    signing::{rounds::Base, signature::SignatureData},
};
use tracing::{error, info, instrument};

/// Signing finalization.
pub struct Finalization<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> Finalization<C> {
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start(&mut self) -> Result<()> {
        self.base.begin(4)?;

        let i = self.base.self_index();
        let mut s = self.base.temp.si.ok_or_else(|| {
            error!("finalization reached without a local response share");
            InternalError::InternalInvariantFailed
        })?;
        for j in 0..self.base.params.total() {
            if j == i {
                continue;
            }
            let share = self.base.temp.round3_shares[j]
                .as_ref()
                .ok_or(InternalError::InternalInvariantFailed)?;
            s = s.add(&share.si);
        }

        let big_r = self
            .base
            .temp
            .big_r
            .clone()
            .ok_or(InternalError::InternalInvariantFailed)?;
        let challenge = self
            .base
            .temp
            .challenge
            .ok_or(InternalError::InternalInvariantFailed)?;

        // Self-verify before releasing the signature. A failure here means a
        // peer defeated every earlier check, which the protocol cannot
        // attribute; treat it as fatal.
        let expected = big_r + self.base.key.public_key().mul(&challenge);
        if C::mul_base(&s) != expected {
            error!("aggregated signature failed self-verification");
            return Err(InternalError::InternalInvariantFailed);
        }

        let data = SignatureData::new(big_r, s, self.base.message.clone());
        info!("signing finished; delivering the signature");
        self.base.deliver(data)?;
        self.base.mark_all_ok();
        Ok(())
    }
}
