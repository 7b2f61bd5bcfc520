//! Keygen finalization: package the key material and deliver it to the host.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::CurveTrait,
    errors::{InternalError, Result},
    keygen::{
        output::{KeySharePublic, Output},
        rounds::Base,
    },
};
use tracing::{error, info, instrument};

/// Keygen finalization.
pub struct Finalization<C: CurveTrait> {
    pub(crate) base: Base<C>,
}

impl<C: CurveTrait> Finalization<C> {
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn start(&mut self) -> Result<()> {
        self.base.begin(4)?;

        let xi = self.base.temp.xi.take().ok_or_else(|| {
            error!("finalization reached without a computed share");
            InternalError::InternalInvariantFailed
        })?;
        let public_key = self.base.temp.public_key.clone().ok_or_else(|| {
            error!("finalization reached without a group public key");
            InternalError::InternalInvariantFailed
        })?;

        let peers = self.base.params.peers().clone();
        let public_key_shares = peers
            .ids()
            .iter()
            .cloned()
            .zip(self.base.temp.big_xs.iter().copied())
            .map(|(id, point)| KeySharePublic::new(id, point))
            .collect();

        let output = Output::from_parts(
            self.base.params.threshold(),
            xi,
            public_key,
            public_key_shares,
            peers,
        )?;

        info!("keygen finished; delivering the key share record");
        self.base.deliver(output)?;
        self.base.mark_all_ok();
        Ok(())
    }
}
