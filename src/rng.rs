/// Source of randomness for generation, spawning, enemy AI and question picking.
///
/// A session owns exactly one source, seeded once; nothing reseeds it mid-game.
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    fn next_int(&mut self, bound: u32) -> u32 {
        if bound <= 1 {
            return 0;
        }
        ((self.next_u32() as u64 * bound as u64) >> 32) as u32
    }

    /// Uniform float in `[0, 1)`.
    fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    fn chance_percent(&mut self, percent: u32) -> bool {
        self.next_int(100) < percent
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.next_int(len.min(u32::MAX as usize) as u32) as usize
    }
}

#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl RandomSource for Rng {
    fn next_u32(&mut self) -> u32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }
}

/// Replays a fixed list of `next_int` results, then falls back to a seeded [`Rng`].
///
/// Scripted values are reduced modulo the requested bound so a test can force a
/// branch without knowing the draw order of unrelated code.
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    script: std::collections::VecDeque<u32>,
    fallback: Rng,
}

impl ScriptedRng {
    pub fn new(values: &[u32]) -> Self {
        Self {
            script: values.iter().copied().collect(),
            fallback: Rng::new(7),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.fallback.next_u32()
    }

    fn next_int(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        match self.script.pop_front() {
            Some(value) => value % bound,
            None => self.fallback.next_int(bound),
        }
    }
}
