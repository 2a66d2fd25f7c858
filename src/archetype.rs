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

//! Archetype storage: one hive parameterized by a component-set mask and a
//! row stride. An archetype does not know the component schema; it treats
//! rows as opaque bytes of width `stride`.

use crate::hive::{Hive, HiveIndex};
use crate::mask::Mask;

pub struct Archetype {
    mask: Mask,
    stride: usize,
    hive: Hive,
}

impl Archetype {
    pub fn new(mask: Mask, stride: usize) -> Self {
        Self { mask, stride, hive: Hive::new(stride) }
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Copy `row` (must be exactly `stride` bytes) into a freshly allocated slot.
    pub fn insert(&mut self, row: &[u8]) -> HiveIndex {
        debug_assert_eq!(row.len(), self.stride, "row width does not match archetype stride");
        let idx = self.hive.allocate();
        self.hive.get_mut(idx).copy_from_slice(row);
        idx
    }

    pub fn at(&self, idx: HiveIndex) -> &[u8] {
        self.hive.get(idx)
    }

    pub fn at_mut(&mut self, idx: HiveIndex) -> &mut [u8] {
        self.hive.get_mut(idx)
    }

    pub fn remove(&mut self, idx: HiveIndex) {
        self.hive.free(idx);
    }

    pub fn iter(&self) -> crate::hive::Iter<'_> {
        self.hive.iter()
    }

    pub fn iter_mut(&mut self) -> crate::hive::IterMut<'_> {
        self.hive.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.hive.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_read_back() {
        let mask = Mask::from_ordinals([0, 1]);
        let mut arch = Archetype::new(mask, 8);
        let idx = arch.insert(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(arch.at(idx), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(arch.len(), 1);
    }

    #[test]
    fn remove_then_reinsert_reuses_slot() {
        let mask = Mask::from_ordinals([0]);
        let mut arch = Archetype::new(mask, 4);
        let idx = arch.insert(&[1, 1, 1, 1]);
        arch.remove(idx);
        assert_eq!(arch.len(), 0);
        let idx2 = arch.insert(&[2, 2, 2, 2]);
        assert_eq!(idx, idx2);
        assert_eq!(arch.at(idx2), &[2, 2, 2, 2]);
    }
}
