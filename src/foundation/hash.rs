use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

/// 128-bit structural fingerprint of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

/// Deterministic, seed-stable hasher used for operation structural keys.
///
/// Unlike `std::hash::DefaultHasher` the output does not change between runs or processes, so
/// keys may be logged and compared across graph rebuilds.
pub struct StableHasher {
    inner: Xxh3,
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StableHasher {
    /// Create a hasher with the crate-wide seed.
    pub fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    /// Feed raw bytes.
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    /// Feed a string, length-prefixed so adjacent strings cannot alias.
    pub fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    /// Feed one byte.
    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    /// Feed a boolean.
    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    /// Feed a little-endian `u32`.
    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Feed a little-endian `i32`.
    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Feed a little-endian `u64`.
    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Feed the bit pattern of an `f32`.
    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    /// Feed a slice of `f32` values.
    pub fn write_f32s(&mut self, v: &[f32]) {
        self.write_u32(v.len() as u32);
        for x in v {
            self.write_f32(*x);
        }
    }

    /// Finish as a 64-bit digest.
    pub fn finish_u64(self) -> u64 {
        self.inner.digest()
    }

    /// Finish as a 128-bit fingerprint.
    pub fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}
