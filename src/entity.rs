// Copyright 2024 Saptak Santra
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

//! Entity handle: an opaque, self-decoding 64-bit identifier. Unlike a
//! generational-key + indirection-table design, an [`EntityHandle`] carries
//! its own archetype ordinal and hive index, so no separate location table is
//! needed to resolve one back to its row.

/// Bit layout (LSB -> MSB): generation (0-15), archetype ordinal (16-31), row
/// index / hive index (32-63).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub fn new(generation: u16, archetype_ordinal: u16, row_index: u32) -> Self {
        let bits = generation as u64 | ((archetype_ordinal as u64) << 16) | ((row_index as u64) << 32);
        Self(bits)
    }

    /// Reserved for future use-after-free detection; this core emits 0 and
    /// never consumes it.
    pub fn generation(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn archetype_ordinal(self) -> u16 {
        ((self.0 >> 16) & 0xFFFF) as u16
    }

    pub fn row_index(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn to_bits(self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bits() {
        let handle = EntityHandle::new(0, 3, 0xDEAD_BEEF);
        assert_eq!(handle.generation(), 0);
        assert_eq!(handle.archetype_ordinal(), 3);
        assert_eq!(handle.row_index(), 0xDEAD_BEEF);
        assert_eq!(EntityHandle::from_bits(handle.to_bits()), handle);
    }

    #[test]
    fn fields_occupy_disjoint_bit_ranges() {
        let handle = EntityHandle::new(0xFFFF, 0, 0);
        assert_eq!(handle.archetype_ordinal(), 0);
        assert_eq!(handle.row_index(), 0);
        let handle = EntityHandle::new(0, 0xFFFF, 0);
        assert_eq!(handle.generation(), 0);
        assert_eq!(handle.row_index(), 0);
    }
}
