//! Distributed key generation for EdDSA keys.
//!
//! Produces an EdDSA public key whose private key is Shamir-shared among `n`
//! parties with threshold `t`; the key itself is never materialized
//! anywhere.
//!
//! # High-level protocol description
//! The protocol runs in three rounds plus a finalization step:
//! - In round 1, each party samples its contribution `u_i` to the joint
//!   secret, deals it with Feldman VSS across all parties, and broadcasts a
//!   hash commitment to the dealing.
//! - In round 2, each party sends every other party its private share of
//!   `u_i`, and broadcasts the opening of its commitment together with a
//!   Schnorr proof of knowledge of `u_i`.
//! - In round 3, each party checks every dealer: the opening against the
//!   round 1 commitment, the Schnorr proof against the dealt secret's
//!   commitment, and its own private share against the dealt polynomial.
//!   Every failed check aborts the run naming the dealer. The party then
//!   sums the shares dealt to it into its long-term share `x_i`, and
//!   aggregates the dealings into each party's public key point and the
//!   group public key `Y`.
//! - Finalization packages the key material into an [`Output`] and delivers
//!   it on the end channel.

// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod finalize;
mod messages;
mod output;
mod round_one;
mod round_three;
mod round_two;
mod rounds;

pub use finalize::Finalization;
pub use output::{KeySharePublic, Output};
pub use round_one::RoundOne;
pub use round_three::RoundThree;
pub use round_two::RoundTwo;
pub use rounds::KeygenRound;

use crate::{
    curve::CurveTrait,
    errors::Result,
    messages::Message,
    party::Party,
    protocol::Parameters,
};
use rounds::Base;
use std::sync::mpsc::Sender;

/// Create a keygen party.
///
/// `out` receives the party's outbound messages; the final [`Output`] is
/// delivered on `end`. Call [`Party::start`] to kick off round 1.
pub fn new_party<C: CurveTrait>(
    params: Parameters<C>,
    out: Sender<Message>,
    end: Sender<Output<C>>,
) -> Result<Party<KeygenRound<C>>> {
    let self_id = params.self_id().clone();
    let peers = params.peers().clone();
    let base = Base::new(params, out, end);
    Ok(Party::new(
        KeygenRound::One(RoundOne::new(base)),
        self_id,
        peers,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        baby_jubjub::BabyJubjub,
        curve::ScalarTrait,
        ed25519::Ed25519,
        errors::InternalError,
        keygen,
        messages::{KeygenMessageType, MessageType},
        party::testing::deliver,
        protocol::{generate_party_ids, PeerContext},
        utils::testing::init_testing,
        vss::{self, Share},
    };
    use rand::rngs::StdRng;
    use std::sync::mpsc::{channel, Receiver};

    pub(crate) struct KeygenRun<C: CurveTrait> {
        pub context: PeerContext,
        pub outputs: Vec<Output<C>>,
        /// Every message exchanged, in delivery order.
        pub transcript: Vec<Message>,
    }

    /// Run a full keygen among `n` honest parties and collect the outputs.
    pub(crate) fn run_keygen<C: CurveTrait>(
        n: usize,
        t: usize,
        rng: &mut StdRng,
    ) -> KeygenRun<C> {
        let context = PeerContext::new(generate_party_ids(n, rng));
        let (mut parties, receivers, ends) = make_parties::<C>(&context, t);

        for party in &mut parties {
            party.start(rng).unwrap();
        }

        let mut transcript = Vec::new();
        loop {
            let mut queue = Vec::new();
            for receiver in &receivers {
                while let Ok(message) = receiver.try_recv() {
                    queue.push(message);
                }
            }
            if queue.is_empty() {
                break;
            }
            for message in queue {
                transcript.push(message.clone());
                deliver(&mut parties, &message, rng).unwrap();
            }
        }

        assert!(parties.iter().all(|party| party.is_complete()));
        let outputs = ends.iter().map(|end| end.try_recv().unwrap()).collect();
        KeygenRun {
            context,
            outputs,
            transcript,
        }
    }

    #[allow(clippy::type_complexity)]
    pub(crate) fn make_parties<C: CurveTrait>(
        context: &PeerContext,
        t: usize,
    ) -> (
        Vec<Party<KeygenRound<C>>>,
        Vec<Receiver<Message>>,
        Vec<Receiver<Output<C>>>,
    ) {
        let n = context.len();
        let mut parties = Vec::with_capacity(n);
        let mut receivers = Vec::with_capacity(n);
        let mut ends = Vec::with_capacity(n);
        for id in context.ids() {
            let params = Parameters::new(context.clone(), id.clone(), n, t).unwrap();
            let (out_tx, out_rx) = channel();
            let (end_tx, end_rx) = channel();
            parties.push(keygen::new_party(params, out_tx, end_tx).unwrap());
            receivers.push(out_rx);
            ends.push(end_rx);
        }
        (parties, receivers, ends)
    }

    #[test]
    fn keygen_produces_consistent_key_material() {
        let mut rng = init_testing();
        let n = 4;
        let t = 1;
        let run = run_keygen::<Ed25519>(n, t, &mut rng);

        // Everybody agrees on the public material.
        let reference = &run.outputs[0];
        for output in &run.outputs {
            assert_eq!(output.public_key(), reference.public_key());
            assert_eq!(output.public_key_shares(), reference.public_key_shares());
            assert_eq!(output.peers(), reference.peers());
        }

        // Each party's public point matches its private share.
        for (i, output) in run.outputs.iter().enumerate() {
            assert_eq!(
                output.public_key_shares()[i].point(),
                &Ed25519::mul_base(output.private_share())
            );
        }

        // The private shares are Shamir shares of the group secret.
        let shares: Vec<Share<Ed25519>> = run
            .outputs
            .iter()
            .zip(run.context.ids())
            .map(|(output, id)| Share {
                threshold: t,
                id: Ed25519::bn_to_scalar(id.key()).unwrap(),
                share: *output.private_share(),
            })
            .collect();
        let secret = vss::reconstruct(&shares[..t + 1], t).unwrap();
        assert_eq!(&Ed25519::mul_base(&secret), reference.public_key());
    }

    #[test]
    fn keygen_over_baby_jubjub_with_five_parties() {
        let mut rng = init_testing();
        let n = 5;
        let t = 2;
        let run = run_keygen::<BabyJubjub>(n, t, &mut rng);

        // BigX_i == x_i · G for every party.
        for (i, output) in run.outputs.iter().enumerate() {
            assert_eq!(
                output.public_key_shares()[i].point(),
                &BabyJubjub::mul_base(output.private_share())
            );
        }

        // Collect the dealt shares from the wire transcript, per dealer.
        let mut dealt: Vec<Vec<Share<BabyJubjub>>> = vec![Vec::new(); n];
        for message in &run.transcript {
            if message.message_type() != MessageType::Keygen(KeygenMessageType::R2Share) {
                continue;
            }
            let dealer = run.context.position(message.from()).unwrap();
            let recipient = &message.to().unwrap()[0];
            let content =
                super::messages::KGRound2Share::<BabyJubjub>::from_message(message).unwrap();
            dealt[dealer].push(Share {
                threshold: t,
                id: BabyJubjub::bn_to_scalar(recipient.key()).unwrap(),
                share: content.share,
            });
        }

        // Any t + 1 of a dealer's shares reconstruct the same contribution,
        // and the contributions sum to the group secret.
        let mut group_secret = <BabyJubjub as CurveTrait>::Scalar::zero();
        for shares in &dealt {
            // Each dealer sent n - 1 shares over the wire (its own stayed
            // local); that is still more than t + 1.
            assert_eq!(shares.len(), n - 1);
            let contribution = vss::reconstruct(&shares[..t + 1], t).unwrap();
            let from_other_subset = vss::reconstruct(&shares[1..t + 2], t).unwrap();
            assert_eq!(contribution, from_other_subset);
            group_secret = group_secret.add(&contribution);
        }
        assert_eq!(
            &BabyJubjub::mul_base(&group_secret),
            run.outputs[0].public_key()
        );
    }

    #[test]
    fn corrupt_share_is_attributed_to_its_dealer() {
        let mut rng = init_testing();
        let n = 3;
        let t = 1;
        let context = PeerContext::new(generate_party_ids(n, &mut rng));
        let (mut parties, receivers, _ends) = make_parties::<Ed25519>(&context, t);

        for party in &mut parties {
            party.start(&mut rng).unwrap();
        }

        let culprit = context.ids()[0].clone();
        let victim = context.ids()[1].clone();

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
                for mut message in queue {
                    // The culprit deals the victim a share that does not lie
                    // on its committed polynomial.
                    if message.message_type() == MessageType::Keygen(KeygenMessageType::R2Share)
                        && message.from() == &culprit
                        && message.to().unwrap()[0] == victim
                    {
                        let forged = super::messages::KGRound2Share::<Ed25519> {
                            share: <Ed25519 as CurveTrait>::Scalar::random(&mut rng),
                        };
                        message.unverified_bytes = serialize!(&forged).unwrap();
                    }
                    deliver(&mut parties, &message, &mut rng)?;
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
    fn flipped_decommitment_is_attributed_to_its_sender() {
        let mut rng = init_testing();
        let context = PeerContext::new(generate_party_ids(3, &mut rng));
        let (mut parties, receivers, _ends) = make_parties::<Ed25519>(&context, 1);

        for party in &mut parties {
            party.start(&mut rng).unwrap();
        }

        let culprit = context.ids()[2].clone();
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
                for mut message in queue {
                    // A blinding-factor flip invalidates the opening.
                    if message.message_type()
                        == MessageType::Keygen(KeygenMessageType::R2Decommit)
                        && message.from() == &culprit
                    {
                        let mut content =
                            super::messages::KGRound2Decommit::<Ed25519>::from_message(&message)
                                .unwrap();
                        content.decommitment.0[0] =
                            &content.decommitment.0[0] + unknown_order::BigNumber::one();
                        message.unverified_bytes = serialize!(&content).unwrap();
                    }
                    deliver(&mut parties, &message, &mut rng)?;
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
    fn duplicate_delivery_is_attributed_to_the_sender() {
        let mut rng = init_testing();
        let context = PeerContext::new(generate_party_ids(3, &mut rng));
        let (mut parties, receivers, _ends) = make_parties::<Ed25519>(&context, 1);

        for party in &mut parties {
            party.start(&mut rng).unwrap();
        }

        // Grab one round 1 broadcast and deliver it to a recipient twice.
        let message = receivers[0].try_recv().unwrap();
        let sender = message.from().clone();
        assert!(parties[1].update(&message, &mut rng).unwrap());
        let result = parties[1].update(&message, &mut rng);
        match result {
            Err(InternalError::ProtocolError(failure)) => {
                assert_eq!(failure.culprits(), &[sender]);
            }
            other => panic!("expected a culprit error, got {other:?}"),
        }
    }

    #[test]
    fn dropped_message_leaves_the_victim_waiting() {
        let mut rng = init_testing();
        let n = 4;
        let context = PeerContext::new(generate_party_ids(n, &mut rng));
        let (mut parties, receivers, _ends) = make_parties::<Ed25519>(&context, 1);

        for party in &mut parties {
            party.start(&mut rng).unwrap();
        }

        let silenced = context.ids()[0].clone();
        let victim_index = n - 1;
        let victim = context.ids()[victim_index].clone();

        loop {
            let mut queue = Vec::new();
            for receiver in &receivers {
                while let Ok(message) = receiver.try_recv() {
                    queue.push(message);
                }
            }
            if queue.is_empty() {
                break;
            }
            for message in queue {
                // The network loses the silenced party's round 1 broadcast
                // to the victim (and only to the victim).
                if message.message_type() == MessageType::Keygen(KeygenMessageType::R1Commit)
                    && message.from() == &silenced
                {
                    for (j, party) in parties.iter_mut().enumerate() {
                        if j != victim_index && party.party_id() != message.from() {
                            party.update(&message, &mut rng).unwrap();
                        }
                    }
                } else {
                    deliver(&mut parties, &message, &mut rng).unwrap();
                }
            }
        }

        // The victim is stuck in round 1 waiting for exactly the silenced
        // party; everyone else advanced and is waiting for the victim's
        // round 2 traffic.
        assert_eq!(parties[victim_index].round_number(), 1);
        assert_eq!(parties[victim_index].waiting_for(), vec![silenced]);
        for (j, party) in parties.iter().enumerate() {
            assert!(!party.is_complete());
            if j != victim_index {
                assert_eq!(party.round_number(), 2);
                assert_eq!(party.waiting_for(), vec![victim.clone()]);
            }
        }
    }
}
