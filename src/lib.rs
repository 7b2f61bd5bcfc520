//! A multi-party threshold signature scheme for EdDSA.
//!
//! `n` mutually distrusting parties jointly generate an EdDSA public key
//! such that the private key never exists in one place, and any `t + 1` of
//! them can later produce an ordinary EdDSA signature on a message of their
//! choice. Every protocol message is checked with hash commitments, Schnorr
//! zero-knowledge proofs, and Feldman verifiable secret sharing, so active
//! misbehavior is detected and attributed to the offending party.
//!
//! Two twisted Edwards curves are supported: [`Ed25519`] (signatures verify
//! under any RFC 8032 verifier) and [`BabyJubjub`] (for ZK-friendly
//! deployments, with an EdDSA-Poseidon challenge).
//!
//! # Running a protocol
//!
//! The host creates one [`Party`] per local participant, wires its outbound
//! and end channels to the network layer, and feeds inbound messages to
//! [`Party::update`]. The network layer needs to provide reliable delivery
//! and sender authentication, nothing more: rounds only advance once every
//! required peer input has arrived, and per-sender message slots are
//! write-once, so ordering does not matter.
//!
//! ```no_run
//! use rand::rngs::OsRng;
//! use std::sync::mpsc::channel;
//! use tss_eddsa::{keygen, Ed25519, Parameters, PeerContext};
//!
//! # fn main() -> tss_eddsa::Result<()> {
//! let mut rng = OsRng;
//! let ids = tss_eddsa::generate_party_ids(3, &mut rng);
//! let context = PeerContext::new(ids);
//!
//! // One party; the host runs the others elsewhere.
//! let me = context.ids()[0].clone();
//! let params = Parameters::<Ed25519>::new(context, me, 3, 1)?;
//! let (out_tx, _out_rx) = channel();
//! let (end_tx, _end_rx) = channel();
//! let mut party = keygen::new_party(params, out_tx, end_tx)?;
//! party.start(&mut rng)?;
//! // ...deliver messages from the network with `party.update(...)`.
//! # Ok(())
//! # }
//! ```
//!
//! Keygen output is persisted by the host ([`keygen::Output::to_bytes`])
//! and fed back into [`signing::new_party`] together with the message to
//! sign.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

/// Serialize a value with the crate's wire codec.
macro_rules! serialize {
    ($x:expr) => {{
        bincode::serialize($x).map_err(|_| crate::errors::CallerError::SerializationFailed)
    }};
}

/// Deserialize a value with the crate's wire codec.
macro_rules! deserialize {
    ($x:expr) => {{
        bincode::deserialize($x).map_err(|_| crate::errors::CallerError::DeserializationFailed)
    }};
}

pub mod baby_jubjub;
pub mod commitments;
pub mod curve;
pub mod ed25519;
pub mod errors;
pub mod keygen;
pub mod messages;
pub mod oracle;
pub mod party;
pub mod protocol;
pub mod signing;
pub mod vss;
pub mod zkp;

mod utils;

pub use baby_jubjub::{BabyJubjub, BjjScalar};
pub use curve::{registry, CurveName, CurveTrait, ScalarTrait};
pub use ed25519::Ed25519;
pub use errors::{CallerError, InternalError, ProtocolFailure, Result};
pub use messages::{Message, MessageType};
pub use oracle::RandomOracle;
pub use party::{Party, Round, Transition};
pub use protocol::{generate_party_ids, Parameters, PartyId, PeerContext};
pub use signing::SignatureData;
