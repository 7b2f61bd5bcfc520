//! Distributed signing producing a standards-compatible EdDSA signature.
//!
//! # High-level protocol description
//! A committee of at least `t + 1` key-share holders runs three rounds plus
//! a finalization step:
//! - In round 1, each signer re-weights its Shamir share into an additive
//!   share for this committee, samples a nonce `r_i`, and broadcasts a hash
//!   commitment to the nonce point `R_i = r_i · G`.
//! - In round 2, each signer opens its commitment and proves knowledge of
//!   its nonce with a Schnorr proof.
//! - In round 3, each signer checks every peer's opening and proof (failures
//!   abort the run naming the peer), aggregates `R = Σ R_j`, derives the
//!   curve's standard signature challenge `k`, and broadcasts its response
//!   share `s_i = r_i + k · w_i · x_i`.
//! - Finalization sums the response shares, checks `s · G == R + k · Y`, and
//!   delivers `{R, s, m}` plus the packed signature on the end channel. The
//!   packed signature verifies under the curve's ordinary EdDSA verifier.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod finalize;
mod messages;
mod round_one;
mod round_three;
mod round_two;
mod rounds;
mod signature;

pub use finalize::Finalization;
pub use round_one::RoundOne;
pub use round_three::RoundThree;
pub use round_two::RoundTwo;
pub use rounds::SigningRound;
pub use signature::SignatureData;

use crate::{
    curve::CurveTrait,
    errors::{CallerError, Result},
    keygen::Output,
    messages::Message,
    party::Party,
    protocol::Parameters,
};
use rounds::Base;
use std::{collections::HashSet, sync::mpsc::Sender};
use tracing::error;

/// Create a signing party.
///
/// `params` describes the signing committee (which may be any subset of the
/// keygen parties of size at least `t + 1`); `key` is this party's persisted
/// keygen output; `message` is the byte string to sign. The final
/// [`SignatureData`] is delivered on `end`.
pub fn new_party<C: CurveTrait>(
    params: Parameters<C>,
    key: Output<C>,
    message: Vec<u8>,
    out: Sender<Message>,
    end: Sender<SignatureData<C>>,
) -> Result<Party<SigningRound<C>>> {
    if params.threshold() != key.threshold() {
        error!(
            "signing threshold {} disagrees with the key's threshold {}",
            params.threshold(),
            key.threshold()
        );
        Err(CallerError::BadInput)?;
    }
    // Parameters already guarantee `threshold < total`, so any accepted
    // committee has the `t + 1` members needed to reconstruct in the
    // exponent.

    // Every committee member must hold a share of this key.
    let key_holders: HashSet<Vec<u8>> = key
        .peers()
        .keys()
        .iter()
        .map(|key| key.to_bytes())
        .collect();
    for id in params.peers().ids() {
        if !key_holders.contains(&id.key().to_bytes()) {
            error!("committee member {id} does not hold a share of this key");
            Err(CallerError::BadInput)?;
        }
    }

    let self_id = params.self_id().clone();
    let peers = params.peers().clone();
    let base = Base::new(params, key, message, out, end);
    Ok(Party::new(
        SigningRound::One(RoundOne::new(base)),
        self_id,
        peers,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        baby_jubjub::BabyJubjub,
        curve::ScalarTrait,
        ed25519::Ed25519,
        errors::InternalError,
        keygen::tests::run_keygen,
        messages::{MessageType, SigningMessageType},
        party::testing::deliver,
        protocol::{PartyId, PeerContext},
        utils::testing::init_testing,
        zkp::DlogProof,
    };
    use rand::rngs::StdRng;
    use std::sync::mpsc::{channel, Receiver};

    /// Build signing parties for the first `committee_size` keygen parties.
    #[allow(clippy::type_complexity)]
    fn make_signers<C: CurveTrait>(
        keygen_context: &PeerContext,
        outputs: &[crate::keygen::Output<C>],
        committee_size: usize,
        message: &[u8],
    ) -> (
        Vec<Party<SigningRound<C>>>,
        Vec<Receiver<Message>>,
        Vec<Receiver<SignatureData<C>>>,
        PeerContext,
    ) {
        let committee_ids: Vec<PartyId> = keygen_context.ids()[..committee_size].to_vec();
        let committee = PeerContext::new(committee_ids);

        let threshold = outputs[0].threshold();
        let mut parties = Vec::new();
        let mut receivers = Vec::new();
        let mut ends = Vec::new();
        for id in committee.ids() {
            // Find this member's keygen output by key.
            let keygen_index = keygen_context
                .ids()
                .iter()
                .position(|kid| kid.key() == id.key())
                .unwrap();
            let params = Parameters::new(
                committee.clone(),
                id.clone(),
                committee.len(),
                threshold,
            )
            .unwrap();
            let (out_tx, out_rx) = channel();
            let (end_tx, end_rx) = channel();
            parties.push(
                new_party(
                    params,
                    outputs[keygen_index].clone(),
                    message.to_vec(),
                    out_tx,
                    end_tx,
                )
                .unwrap(),
            );
            receivers.push(out_rx);
            ends.push(end_rx);
        }
        (parties, receivers, ends, committee)
    }

    fn run_signing<C: CurveTrait>(
        parties: &mut [Party<SigningRound<C>>],
        receivers: &[Receiver<Message>],
        rng: &mut StdRng,
    ) {
        for party in parties.iter_mut() {
            party.start(rng).unwrap();
        }
        loop {
            let mut queue = Vec::new();
            for receiver in receivers {
                while let Ok(message) = receiver.try_recv() {
                    queue.push(message);
                }
            }
            if queue.is_empty() {
                break;
            }
            for message in queue {
                deliver(parties, &message, rng).unwrap();
            }
        }
        assert!(parties.iter().all(|party| party.is_complete()));
    }

    #[test]
    fn threshold_signature_verifies_under_ed25519_dalek() {
        let mut rng = init_testing();
        // Keygen among 3 parties with threshold 1; a 32-byte message with a
        // leading zero byte.
        let run = run_keygen::<Ed25519>(3, 1, &mut rng);
        let message =
            hex::decode("00f163ee51bcaeff9cdff5e0e3c1a646abd19885fffbab0b3b4236e0cf95c9f5")
                .unwrap();

        // Any t + 1 = 2 parties form a signing committee.
        let (mut parties, receivers, ends, _) =
            make_signers(&run.context, &run.outputs, 2, &message);
        run_signing(&mut parties, &receivers, &mut rng);

        let signatures: Vec<SignatureData<Ed25519>> =
            ends.iter().map(|end| end.try_recv().unwrap()).collect();
        assert_eq!(signatures[0], signatures[1]);

        let signature = &signatures[0];
        assert_eq!(signature.signature_bytes().len(), 64);
        assert!(signature.verify(run.outputs[0].public_key()));

        // The packed signature verifies under an off-the-shelf verifier.
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(
            &run.outputs[0].public_key().to_bytes().try_into().unwrap(),
        )
        .unwrap();
        let dalek_signature = ed25519_dalek::Signature::from_bytes(
            signature.signature_bytes().try_into().unwrap(),
        );
        assert!(verifying_key.verify_strict(&message, &dalek_signature).is_ok());
    }

    #[test]
    fn five_party_committee_of_three_signs() {
        let mut rng = init_testing();
        let run = run_keygen::<Ed25519>(5, 2, &mut rng);
        let message = 200u64.to_be_bytes().to_vec();

        let (mut parties, receivers, ends, _) =
            make_signers(&run.context, &run.outputs, 3, &message);
        run_signing(&mut parties, &receivers, &mut rng);

        let signature: SignatureData<Ed25519> = ends[0].try_recv().unwrap();
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(
            &run.outputs[0].public_key().to_bytes().try_into().unwrap(),
        )
        .unwrap();
        let dalek_signature = ed25519_dalek::Signature::from_bytes(
            signature.signature_bytes().try_into().unwrap(),
        );
        assert!(verifying_key.verify_strict(&message, &dalek_signature).is_ok());
    }

    #[test]
    fn baby_jubjub_signature_satisfies_the_curve_equation() {
        let mut rng = init_testing();
        let run = run_keygen::<BabyJubjub>(3, 1, &mut rng);
        let message = b"zk-friendly message".to_vec();

        let (mut parties, receivers, ends, _) =
            make_signers(&run.context, &run.outputs, 2, &message);
        run_signing(&mut parties, &receivers, &mut rng);

        let signatures: Vec<SignatureData<BabyJubjub>> =
            ends.iter().map(|end| end.try_recv().unwrap()).collect();
        assert_eq!(signatures[0], signatures[1]);
        assert!(signatures[0].verify(run.outputs[0].public_key()));

        // s · G == R + k · Y, spelled out.
        let signature = &signatures[0];
        let challenge = BabyJubjub::challenge(
            signature.r(),
            run.outputs[0].public_key(),
            &message,
        )
        .unwrap();
        assert_eq!(
            BabyJubjub::mul_base(signature.s()),
            *signature.r() + run.outputs[0].public_key().mul(&challenge)
        );
    }

    #[test]
    fn tampered_decommitment_is_attributed_to_its_sender() {
        let mut rng = init_testing();
        let run = run_keygen::<Ed25519>(3, 1, &mut rng);
        let message = b"attributable".to_vec();

        let (mut parties, receivers, _ends, committee) =
            make_signers(&run.context, &run.outputs, 3, &message);
        for party in parties.iter_mut() {
            party.start(&mut rng).unwrap();
        }

        let culprit = committee.ids()[0].clone();
        let result = (|| -> crate::errors::Result<()> {
            loop {
                let mut queue = Vec::new();
                for receiver in &receivers {
                    while let Ok(message) = receiver.try_recv() {
                        queue.push(message);
                    }
                }
                if queue.is_empty() {
                    return Ok(());
                }
                for mut wire_message in queue {
                    // Replace the culprit's round 2 proof with one for a
                    // nonce it does not actually use.
                    if wire_message.message_type()
                        == MessageType::Signing(SigningMessageType::R2Decommit)
                        && wire_message.from() == &culprit
                    {
                        let mut forged =
                            super::messages::SignRound2Decommit::<Ed25519>::from_message(
                                &wire_message,
                            )
                            .unwrap();
                        let wrong_nonce = <Ed25519 as CurveTrait>::Scalar::random(&mut rng);
                        forged.proof = DlogProof::prove(
                            &crate::oracle::RandomOracle::default(),
                            &unknown_order::BigNumber::zero(),
                            &wrong_nonce,
                            &Ed25519::mul_base(&wrong_nonce),
                            &mut rng,
                        )
                        .unwrap();
                        wire_message.unverified_bytes = serialize!(&forged).unwrap();
                    }
                    deliver(&mut parties, &wire_message, &mut rng)?;
                }
            }
        })();

        match result {
            Err(InternalError::ProtocolError(failure)) => {
                assert_eq!(failure.culprits(), &[culprit]);
                assert_eq!(failure.round, 3);
            }
            other => panic!("expected a culprit error, got {other:?}"),
        }
    }

    #[test]
    fn committee_must_hold_shares_of_the_key() {
        let mut rng = init_testing();
        let run = run_keygen::<Ed25519>(3, 1, &mut rng);

        // A committee containing a stranger is rejected.
        let mut ids = run.context.ids()[..1].to_vec();
        ids.push(PartyId::new(
            "stranger",
            unknown_order::BigNumber::from(123456u32),
        ));
        let committee = PeerContext::new(ids);
        let me = committee
            .ids()
            .iter()
            .find(|id| id.moniker() != "stranger")
            .unwrap()
            .clone();
        let params = Parameters::new(committee.clone(), me, 2, 1).unwrap();
        let (out_tx, _out_rx) = channel();
        let (end_tx, _end_rx) = channel();
        assert!(new_party::<Ed25519>(
            params,
            run.outputs[0].clone(),
            b"m".to_vec(),
            out_tx,
            end_tx
        )
        .is_err());
    }

    #[test]
    fn undersized_committees_and_mismatched_thresholds_are_rejected() {
        let mut rng = init_testing();
        let run = run_keygen::<Ed25519>(4, 2, &mut rng);

        // A 2-party committee cannot meet threshold 2: the parameter
        // invariant `t < n` already refuses it.
        let committee = PeerContext::new(run.context.ids()[..2].to_vec());
        let me = committee.ids()[0].clone();
        assert!(Parameters::<Ed25519>::new(committee, me, 2, 2).is_err());

        // A valid committee signing under the wrong threshold is refused at
        // party construction.
        let committee = PeerContext::new(run.context.ids()[..3].to_vec());
        let me = committee.ids()[0].clone();
        let params = Parameters::<Ed25519>::new(committee, me, 3, 1).unwrap();
        let (out_tx, _out_rx) = channel();
        let (end_tx, _end_rx) = channel();
        assert!(new_party::<Ed25519>(
            params,
            run.outputs[0].clone(),
            b"m".to_vec(),
            out_tx,
            end_tx
        )
        .is_err());
    }
}
