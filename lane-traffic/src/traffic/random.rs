// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Deterministic per-tick random streams
//!
//! Each tick derives one ChaCha8 key from `(seed, tick)`. Slot tasks draw
//! from disjoint streams of that key, selected by slot index, so the draws
//! do not depend on which worker runs which slot or in what order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random source for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRandom {
    key: u64,
}

impl TickRandom {
    /// Derive the tick's key
    pub fn new(seed: u64, tick: u64) -> Self {
        TickRandom { key: mix(seed, tick) }
    }

    /// Generator for one slot
    pub fn slot_stream(&self, slot_index: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.key);
        rng.set_stream(slot_index as u64);
        rng
    }
}

/// SplitMix64 finalizer over the seed and tick
fn mix(seed: u64, tick: u64) -> u64 {
    let mut z = seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
