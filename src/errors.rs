//! Error types produced by the protocol engine.
//!
//! Errors fall into two families, mirrored in the two enums below:
//! - [`CallerError`]: the calling application did something wrong — bad
//!   parameters, malformed serialized data, use of a terminated party, or a
//!   dropped channel (cancellation).
//! - [`InternalError`]: the protocol itself failed. This is either a
//!   non-attributable invariant violation or a [`ProtocolFailure`] naming the
//!   peers whose input was conclusively invalid.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::protocol::PartyId;
use thiserror::Error;

/// The default Result type used in this crate.
pub type Result<T> = std::result::Result<T, InternalError>;

/// Errors triggered by the calling application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CallerError {
    /// The set of parties or the threshold failed a basic invariant.
    #[error("invalid protocol parameters (check n >= 2, 1 <= t < n, self in committee, distinct party keys)")]
    ParticipantConfig,
    /// Input provided to a protocol constructor was malformed.
    #[error("protocol input was not well formed")]
    BadInput,
    /// A value could not be serialized for the wire.
    #[error("message serialization failed")]
    SerializationFailed,
    /// A wire value could not be decoded into the expected type.
    #[error("message deserialization failed")]
    DeserializationFailed,
    /// A message was delivered to a party that already produced its output.
    #[error("protocol instance has already terminated")]
    ProtocolAlreadyTerminated,
    /// A serialized artifact referenced a curve that is not registered.
    #[error("curve `{0}` is not in the curve registry")]
    UnknownCurveName(String),
    /// A serialized artifact was produced for a different curve.
    #[error("artifact was produced for curve `{got}`, expected `{expected}`")]
    CurveMismatch {
        /// The curve the caller asked to load the artifact under.
        expected: &'static str,
        /// The curve recorded in the artifact.
        got: String,
    },
    /// Secret reconstruction was attempted with too few distinct shares.
    #[error("insufficient shares for reconstruction: have {have}, need {need}")]
    InsufficientShares {
        /// Number of distinct shares supplied.
        have: usize,
        /// Minimum number of distinct shares required (`t + 1`).
        need: usize,
    },
    /// The host dropped the outbound or end channel; the protocol run is
    /// cancelled.
    #[error("host channel closed; protocol cancelled")]
    Cancelled,
    /// A rejection-sampling loop failed to produce a value in bound.
    #[error("cryptographic sampling failed to terminate")]
    RetryFailed,
}

/// Errors that can occur while running the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InternalError {
    /// An invariant the protocol relies on was violated despite all peer
    /// checks passing. Fatal and non-attributable.
    #[error("internal invariant failed")]
    InternalInvariantFailed,
    /// The calling application made a mistake; see the inner error.
    #[error("calling application mistake: {0}")]
    CallingApplicationMistake(#[from] CallerError),
    /// A peer sent something conclusively invalid; the failure names the
    /// culprits.
    #[error("{0}")]
    ProtocolError(ProtocolFailure),
}

/// Attribution record for a protocol abort: the task that failed, the round
/// it failed in, and the peers whose input caused the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFailure {
    /// Name of the protocol task, e.g. `"eddsa-keygen"`.
    pub task: &'static str,
    /// Round number during which the failure was detected.
    pub round: u16,
    /// Short description of the failed check.
    pub reason: &'static str,
    /// Peers whose input was conclusively invalid. Empty when a failure is
    /// detected before it can be attributed.
    pub culprits: Vec<PartyId>,
}

impl std::fmt::Display for ProtocolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task {}, round {}: {}", self.task, self.round, self.reason)?;
        if !self.culprits.is_empty() {
            let names: Vec<_> = self.culprits.iter().map(|id| id.moniker()).collect();
            write!(f, " (culprits: {})", names.join(", "))?;
        }
        Ok(())
    }
}

impl ProtocolFailure {
    /// The culprits named by this failure.
    pub fn culprits(&self) -> &[PartyId] {
        &self.culprits
    }
}

impl InternalError {
    /// If this error attributes blame to specific peers, return them.
    pub fn culprits(&self) -> Option<&[PartyId]> {
        match self {
            InternalError::ProtocolError(failure) => Some(failure.culprits()),
            _ => None,
        }
    }
}
