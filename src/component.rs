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

//! Component kinds, the two registry flavors, and bundles of components
//! written into a row at insert.

use std::any::TypeId;
use std::mem;

use smallvec::{smallvec, SmallVec};

use crate::error::{EcsError, Result};
use crate::mask::Mask;
use crate::utils::InlineVec;

/// Maximum number of components supported by a single `Bundle`.
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Default `Nmax` used by [`DynamicRegistry::default`].
pub const DEFAULT_NMAX: usize = 8;

/// Capacity of the dynamic registry's inline entry table. Lower than
/// [`crate::mask::MAX_NMAX`] (the raw bit width `Mask` can address) because
/// it sizes a non-heap-allocating inline array, and this is comfortably past
/// what any real component vocabulary needs.
pub const MAX_REGISTRY_CAPACITY: usize = 32;

/// A component kind: plain-old data, moved by byte copy, no destructors, no
/// borrowed data.
pub trait Component: 'static + Copy {}

impl<T: 'static + Copy> Component for T {}

/// Anything that can report the byte size of an ordinal. Implemented by both
/// registry flavors so [`offset_in`] is agnostic to which one produced the mask.
pub trait ComponentSizes {
    fn size_of(&self, ordinal: usize) -> usize;
}

/// Offset of ordinal `ordinal` within a row laid out for `mask`: the sum of
/// sizes of every lower ordinal also present in `mask`.
pub fn offset_in(ordinal: usize, mask: Mask, sizes: &impl ComponentSizes) -> usize {
    mask.ones().take_while(|&i| i < ordinal).map(|i| sizes.size_of(i)).sum()
}

#[derive(Clone, Copy, Default)]
struct RegistryEntry {
    type_id: Option<TypeId>,
    size: usize,
}

/// Runtime component registry: assigns ordinals on first mention, in a flat
/// inline table scanned linearly. `Nmax` is small by construction, so a
/// linear scan is the documented, acceptable cost (§4.B).
pub struct DynamicRegistry {
    entries: InlineVec<RegistryEntry, MAX_REGISTRY_CAPACITY>,
    capacity: usize,
}

impl DynamicRegistry {
    /// `capacity` (the registry's `Nmax`) must not exceed [`MAX_REGISTRY_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity <= MAX_REGISTRY_CAPACITY, "Nmax exceeds inline registry capacity");
        Self { entries: InlineVec::new(), capacity }
    }

    pub fn ordinal_of<T: Component>(&mut self) -> Result<usize> {
        self.ordinal_of_raw(TypeId::of::<T>(), mem::size_of::<T>())
    }

    /// Non-generic counterpart of [`Self::ordinal_of`], used by [`Bundle`]
    /// writers that already have a `TypeId`/size pair in hand.
    pub fn ordinal_of_raw(&mut self, type_id: TypeId, size: usize) -> Result<usize> {
        if let Some(ordinal) = self.find_ordinal(type_id) {
            return Ok(ordinal);
        }
        if self.entries.len() >= self.capacity {
            return Err(EcsError::RegistryFull { attempted: self.entries.len(), capacity: self.capacity });
        }
        #[cfg(feature = "profiling")]
        tracing::debug!(ordinal = self.entries.len(), size, "registering component kind");
        self.entries.push(RegistryEntry { type_id: Some(type_id), size });
        #[cfg(feature = "profiling")]
        if self.entries.len() + 1 >= self.capacity {
            tracing::warn!(
                used = self.entries.len(),
                capacity = self.capacity,
                "component registry nearly exhausted"
            );
        }
        Ok(self.entries.len() - 1)
    }

    /// Ordinal of an already-registered kind, without registering it.
    pub fn find_ordinal(&self, type_id: TypeId) -> Option<usize> {
        self.entries.iter().position(|e| e.type_id == Some(type_id))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DynamicRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NMAX)
    }
}

impl ComponentSizes for DynamicRegistry {
    fn size_of(&self, ordinal: usize) -> usize {
        self.entries[ordinal].size
    }
}

/// Marker trait implemented once per `(kind, schema)` pair by
/// [`static_components!`], giving each kind a compile-time-fixed ordinal. A
/// type outside the declared set has no impl and fails to compile, satisfying
/// the static registry's "compile-time error" contract (§4.B).
pub trait StaticOrdinal<Schema> {
    const ORDINAL: usize;
}

pub fn static_ordinal_of<Schema, T: StaticOrdinal<Schema>>() -> usize {
    T::ORDINAL
}

/// Declares a compile-time-fixed component registry.
///
/// ```ignore
/// static_components!(Schema = [Pos, Vel, Health]);
/// assert_eq!(static_ordinal_of::<Schema, Vel>(), 1);
/// assert_eq!(Schema::size_of(1), std::mem::size_of::<Vel>());
/// ```
#[macro_export]
macro_rules! static_components {
    ($name:ident = [$t0:ty]) => {
        pub struct $name;
        impl $name {
            pub const NMAX: usize = 1;
            pub fn size_of(ordinal: usize) -> usize {
                const SIZES: [usize; 1] = [::std::mem::size_of::<$t0>()];
                SIZES[ordinal]
            }
        }
        impl $crate::component::StaticOrdinal<$name> for $t0 {
            const ORDINAL: usize = 0;
        }
    };
    ($name:ident = [$t0:ty, $t1:ty]) => {
        pub struct $name;
        impl $name {
            pub const NMAX: usize = 2;
            pub fn size_of(ordinal: usize) -> usize {
                const SIZES: [usize; 2] = [::std::mem::size_of::<$t0>(), ::std::mem::size_of::<$t1>()];
                SIZES[ordinal]
            }
        }
        impl $crate::component::StaticOrdinal<$name> for $t0 {
            const ORDINAL: usize = 0;
        }
        impl $crate::component::StaticOrdinal<$name> for $t1 {
            const ORDINAL: usize = 1;
        }
    };
    ($name:ident = [$t0:ty, $t1:ty, $t2:ty]) => {
        pub struct $name;
        impl $name {
            pub const NMAX: usize = 3;
            pub fn size_of(ordinal: usize) -> usize {
                const SIZES: [usize; 3] =
                    [::std::mem::size_of::<$t0>(), ::std::mem::size_of::<$t1>(), ::std::mem::size_of::<$t2>()];
                SIZES[ordinal]
            }
        }
        impl $crate::component::StaticOrdinal<$name> for $t0 {
            const ORDINAL: usize = 0;
        }
        impl $crate::component::StaticOrdinal<$name> for $t1 {
            const ORDINAL: usize = 1;
        }
        impl $crate::component::StaticOrdinal<$name> for $t2 {
            const ORDINAL: usize = 2;
        }
    };
    ($name:ident = [$t0:ty, $t1:ty, $t2:ty, $t3:ty]) => {
        pub struct $name;
        impl $name {
            pub const NMAX: usize = 4;
            pub fn size_of(ordinal: usize) -> usize {
                const SIZES: [usize; 4] = [
                    ::std::mem::size_of::<$t0>(),
                    ::std::mem::size_of::<$t1>(),
                    ::std::mem::size_of::<$t2>(),
                    ::std::mem::size_of::<$t3>(),
                ];
                SIZES[ordinal]
            }
        }
        impl $crate::component::StaticOrdinal<$name> for $t0 {
            const ORDINAL: usize = 0;
        }
        impl $crate::component::StaticOrdinal<$name> for $t1 {
            const ORDINAL: usize = 1;
        }
        impl $crate::component::StaticOrdinal<$name> for $t2 {
            const ORDINAL: usize = 2;
        }
        impl $crate::component::StaticOrdinal<$name> for $t3 {
            const ORDINAL: usize = 3;
        }
    };
}

/// A tuple of components that can be written into a fresh row at insert time.
///
/// `write_components` receives one pointer per tuple position, each already
/// resolved to that component's canonical offset — the implementation never
/// needs to sort anything; it just scatters each value to its slot (§9
/// "Argument-order canonicalization at insert").
pub trait Bundle: Sized + 'static {
    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]>;
    fn sizes() -> SmallVec<[usize; MAX_BUNDLE_COMPONENTS]>;

    /// # Safety
    /// `ptrs` must contain one valid, correctly aligned, writable pointer per
    /// tuple position, each pointing at least `size_of` that position's type.
    unsafe fn write_components(self, ptrs: &[*mut u8]);
}

macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(TypeId::of::<$T>()),*]
            }

            fn sizes() -> SmallVec<[usize; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(mem::size_of::<$T>()),*]
            }

            #[allow(non_snake_case)]
            unsafe fn write_components(self, ptrs: &[*mut u8]) {
                let ($($T,)*) = self;
                let mut i = 0;
                $(
                    unsafe { std::ptr::write(ptrs[i] as *mut $T, $T); }
                    i += 1;
                )*
                let _ = i;
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[test]
    fn single_component_bundle() {
        let type_ids = <(Position,)>::type_ids();
        assert_eq!(type_ids.len(), 1);
        assert_eq!(type_ids[0], TypeId::of::<Position>());
    }

    #[test]
    fn multi_component_bundle_sizes_match_type_ids() {
        let type_ids = <(Position, Velocity)>::type_ids();
        let sizes = <(Position, Velocity)>::sizes();
        assert_eq!(type_ids.len(), 2);
        assert_eq!(sizes[0], mem::size_of::<Position>());
        assert_eq!(sizes[1], mem::size_of::<Velocity>());
    }

    #[test]
    fn dynamic_registry_assigns_stable_ordinals() {
        let mut registry = DynamicRegistry::with_capacity(4);
        let a = registry.ordinal_of::<Position>().unwrap();
        let b = registry.ordinal_of::<Velocity>().unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.ordinal_of::<Position>().unwrap(), a);
    }

    #[test]
    fn dynamic_registry_reports_registry_full() {
        let mut registry = DynamicRegistry::with_capacity(1);
        registry.ordinal_of::<Position>().unwrap();
        let err = registry.ordinal_of::<Velocity>().unwrap_err();
        assert_eq!(err, EcsError::RegistryFull { attempted: 1, capacity: 1 });
    }

    #[test]
    fn offset_in_sums_lower_ordinals_present_in_mask() {
        let mut registry = DynamicRegistry::with_capacity(4);
        let po = registry.ordinal_of::<Position>().unwrap(); // size 8
        let vo = registry.ordinal_of::<Velocity>().unwrap(); // size 8
        let mask = Mask::from_ordinals([po, vo]);
        assert_eq!(offset_in(po, mask, &registry), 0);
        assert_eq!(offset_in(vo, mask, &registry), 8);
    }

    static_components!(TestSchema = [Position, Velocity]);

    #[test]
    fn static_schema_assigns_compile_time_ordinals() {
        assert_eq!(static_ordinal_of::<TestSchema, Position>(), 0);
        assert_eq!(static_ordinal_of::<TestSchema, Velocity>(), 1);
        assert_eq!(TestSchema::size_of(0), mem::size_of::<Position>());
        assert_eq!(TestSchema::NMAX, 2);
    }
}
