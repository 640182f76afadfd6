use rand::rand_core::impls;
use rand::RngCore;

use crate::types::{EventId, GroupId};

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Multiplier applied to the group id when deriving a sample seed.
pub const GROUP_SEED_MULTIPLIER: i64 = 1_543_270_363;
/// Multiplier applied to the event id when deriving a sample seed.
pub const EVENT_SEED_MULTIPLIER: i64 = 1_943_272_559;
const SEED_MODULUS: i64 = 1 << 31;

/// 32-bit Mersenne Twister.
#[derive(Clone, Debug)]
pub struct Mt19937 {
    key: [u32; N],
    pos: usize,
}

impl Mt19937 {
    /// Classic `init_genrand` seeding.
    pub fn new(seed: u32) -> Self {
        let mut key = [0u32; N];
        key[0] = seed;
        for i in 1..N {
            let prev = key[i - 1];
            key[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Mt19937 { key, pos: N }
    }

    /// Seeding through a SeedSequence-style entropy pool, as numpy's
    /// `MT19937(seed)` bit generator does.
    ///
    /// Word 0 is forced to `0x80000000` so the state is never all zero, and
    /// the read position starts at the last word, so the first output is
    /// that word tempered and the first twist happens on the second draw.
    pub fn from_seed_sequence(entropy: u32) -> Self {
        let mut key = seed_sequence_words::<N>(entropy);
        key[0] = UPPER_MASK;
        Mt19937 { key, pos: N - 1 }
    }

    fn twist(&mut self) {
        for i in 0..N {
            let y = (self.key[i] & UPPER_MASK) | (self.key[(i + 1) % N] & LOWER_MASK);
            let mut next = self.key[(i + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.key[i] = next;
        }
        self.pos = 0;
    }

    /// Uniform in `[0, 1)` with 53 bits of precision, from two outputs.
    pub fn next_f64(&mut self) -> f64 {
        let a = (self.next_u32() >> 5) as f64;
        let b = (self.next_u32() >> 6) as f64;
        (a * 67_108_864.0 + b) / 9_007_199_254_740_992.0
    }

    /// Uniform integer in `[0, max]` by masked rejection.
    pub fn next_at_most(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        let mut mask = max;
        mask |= mask >> 1;
        mask |= mask >> 2;
        mask |= mask >> 4;
        mask |= mask >> 8;
        mask |= mask >> 16;
        loop {
            let value = self.next_u32() & mask;
            if value <= max {
                return value;
            }
        }
    }

    /// In-place Fisher-Yates, swapping from the last position down.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_at_most(i as u32) as usize;
            items.swap(i, j);
        }
    }
}

impl RngCore for Mt19937 {
    fn next_u32(&mut self) -> u32 {
        if self.pos >= N {
            self.twist();
        }
        let mut y = self.key[self.pos];
        self.pos += 1;
        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^ (y >> 18)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

const POOL_SIZE: usize = 4;
const INIT_A: u32 = 0x43b0_d7e5;
const MULT_A: u32 = 0x931e_8875;
const INIT_B: u32 = 0x8b51_f9dd;
const MULT_B: u32 = 0x58f3_8ded;
const MIX_MULT_L: u32 = 0xca01_f9dd;
const MIX_MULT_R: u32 = 0x4973_f715;
const XSHIFT: u32 = 16;

fn hashmix(value: u32, hash_const: &mut u32) -> u32 {
    let mut value = value ^ *hash_const;
    *hash_const = hash_const.wrapping_mul(MULT_A);
    value = value.wrapping_mul(*hash_const);
    value ^ (value >> XSHIFT)
}

fn mix(x: u32, y: u32) -> u32 {
    let result = MIX_MULT_L.wrapping_mul(x).wrapping_sub(MIX_MULT_R.wrapping_mul(y));
    result ^ (result >> XSHIFT)
}

/// Expand a single 32-bit entropy word into `W` state words.
fn seed_sequence_words<const W: usize>(entropy: u32) -> [u32; W] {
    let mut hash_const = INIT_A;
    let mut pool = [0u32; POOL_SIZE];
    pool[0] = hashmix(entropy, &mut hash_const);
    for slot in pool.iter_mut().skip(1) {
        *slot = hashmix(0, &mut hash_const);
    }
    for src in 0..POOL_SIZE {
        for dst in 0..POOL_SIZE {
            if src != dst {
                let hashed = hashmix(pool[src], &mut hash_const);
                pool[dst] = mix(pool[dst], hashed);
            }
        }
    }

    let mut hash_const = INIT_B;
    let mut words = [0u32; W];
    for (i, word) in words.iter_mut().enumerate() {
        let mut value = pool[i % POOL_SIZE] ^ hash_const;
        hash_const = hash_const.wrapping_mul(MULT_B);
        value = value.wrapping_mul(hash_const);
        *word = value ^ (value >> XSHIFT);
    }
    words
}

/// Seed of the sample stream for an (event, group) pair.
pub fn sample_seed(event_id: EventId, group_id: GroupId) -> u32 {
    let group_part = (group_id.0 as i64 * GROUP_SEED_MULTIPLIER).rem_euclid(SEED_MODULUS);
    let event_part = (event_id.0 as i64 * EVENT_SEED_MULTIPLIER).rem_euclid(SEED_MODULUS);
    ((group_part + event_part) % SEED_MODULUS) as u32
}

/// Uniform draws for the Monte-Carlo samples of an (event, group) pair.
#[derive(Debug, Clone, Copy)]
pub struct SampleGenerator {
    pub number_of_samples: u32,
}

impl SampleGenerator {
    pub fn new(number_of_samples: u32) -> Self {
        SampleGenerator { number_of_samples }
    }

    pub fn draws(&self, event_id: EventId, group_id: GroupId) -> Vec<f64> {
        let mut rng = Mt19937::from_seed_sequence(sample_seed(event_id, group_id));
        (0..self.number_of_samples).map(|_| rng.next_f64()).collect()
    }
}
