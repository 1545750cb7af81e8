// Copyright (c) 2017-2024 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Seeded test payloads.
//!
//! A sweep sends the same payload at every setting, so the payload is
//! generated once, up front, from an explicit [`PayloadSource`]. Using a
//! fixed seed makes every run reproducible.

use std::fmt;
use std::ops::Deref;

/// A source of pseudo-random bytes.
pub trait PayloadSource {
    /// Fills `dest` with the next `dest.len()` bytes.
    fn fill_bytes(&mut self, dest: &mut [u8]);
}

/// xorshift64* generator.
///
/// Not suitable for anything but test patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Constructs a new `XorShift64` from `seed`.
    ///
    /// The seed is scrambled with a SplitMix64 step first, so small seeds
    /// such as `0` and `1` still produce well-mixed output.
    pub fn seed_from_u64(seed: u64) -> XorShift64 {
        let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;

        // An all-zero state would only ever produce zeroes
        if z == 0 {
            z = 0x9E37_79B9_7F4A_7C15;
        }

        XorShift64 { state: z }
    }

    /// Returns the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

impl PayloadSource for XorShift64 {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// A fixed-length, read-only byte sequence sent during a sweep.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    /// Generates a payload of `len` bytes from `source`.
    pub fn generate<S: PayloadSource + ?Sized>(source: &mut S, len: usize) -> Payload {
        let mut bytes = vec![0u8; len];
        source.fill_bytes(&mut bytes);

        Payload { bytes }
    }

    /// Generates a payload of `len` bytes from a [`XorShift64`] seeded with `seed`.
    pub fn seeded(seed: u64, len: usize) -> Payload {
        Payload::generate(&mut XorShift64::seed_from_u64(seed), len)
    }

    /// Returns the payload as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Payload {
        Payload { bytes }
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.bytes.len())
    }
}
