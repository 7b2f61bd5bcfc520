// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::errors::{CallerError, Result};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512_256};
use tracing::error;
use unknown_order::BigNumber;

/// Sample a number uniformly at random from the range [0, n). This can be used
/// for sampling from a prime field `F_p` or the integers modulo `n` (for any
/// `n`).
pub(crate) fn random_positive_bn<R: RngCore + CryptoRng>(rng: &mut R, n: &BigNumber) -> BigNumber {
    BigNumber::from_rng(n, rng)
}

/// Sample a nonzero number uniformly at random from the range (0, n).
pub(crate) fn random_nonzero_bn<R: RngCore + CryptoRng>(rng: &mut R, n: &BigNumber) -> BigNumber {
    loop {
        let value = BigNumber::from_rng(n, rng);
        if value != BigNumber::zero() {
            return value;
        }
    }
}

/// Encode `value` as exactly `len` big-endian bytes.
///
/// Fails if the minimal encoding of `value` is longer than `len`.
pub(crate) fn bn_to_fixed_bytes(value: &BigNumber, len: usize) -> Result<Vec<u8>> {
    let bytes = value.to_bytes();
    if bytes.len() > len {
        error!(
            "cannot encode a {}-byte integer into {} bytes",
            bytes.len(),
            len
        );
        Err(CallerError::SerializationFailed)?;
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Derive the per-instance session nonce for signing from the message bytes.
///
/// All signers of the same message derive the same nonce without
/// coordination.
pub(crate) fn message_nonce(message: &[u8]) -> BigNumber {
    let digest = Sha512_256::new().chain_update(message).finalize();
    BigNumber::from_slice(digest)
}

////////////////////////////
// Test Utility Functions //
////////////////////////////

/// Returns an rng to be used for testing. This will print the rng seed
/// to stderr so that if a test fails, the failing seed can be recovered
/// and used for debugging.
#[cfg(test)]
pub(crate) mod testing {
    use rand::{
        rngs::{OsRng, StdRng},
        Rng, SeedableRng,
    };

    /// Initialize any fields necessary for our tests. This should be called at
    /// the top of all our tests. This function is idempotent.
    ///
    /// This will print the rng seed to stderr so that if a test fails, the
    /// failing seed can be recovered and used for debugging.
    pub(crate) fn init_testing() -> StdRng {
        let mut seeder = OsRng;
        let seed = seeder.gen();
        eprintln!(
            "To re-run test with the same randomness, use init_testing_with_seed() with the following seed:"
        );
        eprintln!("\t{seed:?}");
        StdRng::from_seed(seed)
    }

    /// A seeded version of [`init_testing`]. This function can be used when a
    /// test fails unexpectedly, and you want to reproduce the run using a
    /// specific RNG seed.
    ///
    /// **Additionally, turns on logging by default.**
    #[allow(unused)]
    pub(crate) fn init_testing_with_seed(seed: [u8; 32]) -> StdRng {
        use tracing_subscriber::{
            filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
        };

        let logging_level = EnvFilter::from_default_env()
            .max_level_hint()
            .unwrap()
            .into_level()
            .unwrap();

        // Only capture logging events from this crate.
        let targets = Targets::new().with_target("tss_eddsa", logging_level);
        let stdout_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_filter(targets);

        // It's okay if this fails. It just means logging has already been set
        // up for this thread.
        let _ = tracing_subscriber::registry().with(stdout_layer).try_init();

        StdRng::from_seed(seed)
    }
}
