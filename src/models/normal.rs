use crate::models::{NormalSource, NormalSourceFactory};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::f64::consts::TAU;

/// Box-Muller normal generator over any uniform RNG.
///
/// z0 = sqrt(-2 ln u1) * cos(2 pi u2)
/// z1 = sqrt(-2 ln u1) * sin(2 pi u2)
///
/// z0 is returned immediately, z1 is held as a spare for the next call.
/// u1 == 0 is resampled (ln 0 is undefined).
pub struct BoxMuller<R> {
    rng: R,
    spare: Option<f64>,
}

impl<R: RngCore> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, spare: None }
    }

    #[inline]
    fn open_unit(&mut self) -> f64 {
        loop {
            let u: f64 = self.rng.gen();
            if u > 0.0 {
                return u;
            }
        }
    }
}

impl BoxMuller<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> NormalSource for BoxMuller<R> {
    #[inline]
    fn next_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }

        let u1 = self.open_unit();
        let u2: f64 = self.rng.gen();

        let mag = (-2.0 * u1.ln()).sqrt();
        let (sin, cos) = (TAU * u2).sin_cos();

        self.spare = Some(mag * sin);
        mag * cos
    }
}

/// Seeded Box-Muller streams, one per partition.
/// Partition seeds are derived with a SplitMix64 finalizer so neighbouring
/// partitions do not start from correlated StdRng states.
#[derive(Debug, Clone, Copy)]
pub struct SeededBoxMuller {
    pub seed: u64,
}

impl SeededBoxMuller {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl NormalSourceFactory for SeededBoxMuller {
    type Source = BoxMuller<StdRng>;

    #[inline]
    fn source_for_partition(&self, partition: usize) -> Self::Source {
        BoxMuller::seeded(partition_seed(self.seed, partition as u64))
    }
}

#[inline]
fn partition_seed(seed: u64, partition: u64) -> u64 {
    let mut z = seed
        .wrapping_add(partition.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
