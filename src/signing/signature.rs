//! The signing protocol's terminal output.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::curve::CurveTrait;
use serde::{Deserialize, Serialize};

/// A completed threshold signature on a message.
///
/// Carries both the split `(R, s)` pair and the packed standard encoding
/// (`R || s`, 64 bytes for ed25519), which verifies under the curve's
/// ordinary verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SignatureData<C: CurveTrait> {
    r: C,
    s: C::Scalar,
    message: Vec<u8>,
    signature: Vec<u8>,
}

impl<C: CurveTrait> SignatureData<C> {
    pub(crate) fn new(r: C, s: C::Scalar, message: Vec<u8>) -> Self {
        let signature = C::encode_signature(&r, &s);
        Self {
            r,
            s,
            message,
            signature,
        }
    }

    /// The group commitment `R`.
    pub fn r(&self) -> &C {
        &self.r
    }

    /// The aggregated response scalar `s`.
    pub fn s(&self) -> &C::Scalar {
        &self.s
    }

    /// The message that was signed.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// The packed signature in the curve's standard encoding.
    pub fn signature_bytes(&self) -> &[u8] {
        &self.signature
    }

    /// Check `s · G == R + k · Y` against a public key.
    pub fn verify(&self, public_key: &C) -> bool {
        match C::challenge(&self.r, public_key, &self.message) {
            Ok(challenge) => C::mul_base(&self.s) == self.r + public_key.mul(&challenge),
            Err(_) => false,
        }
    }
}
