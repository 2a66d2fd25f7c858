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

//! Query iterator: walks archetypes whose mask is a superset of a requested
//! set, and for each, walks its rows yielding typed tuple views over column
//! offsets computed once per archetype.

use std::any::TypeId;
use std::marker::PhantomData;

#[cfg(feature = "profiling")]
use tracing::trace_span;

use smallvec::SmallVec;

use crate::archetype::Archetype;
use crate::component::{offset_in, Component, DynamicRegistry, MAX_BUNDLE_COMPONENTS};
use crate::hive::{Iter as HiveIter, IterMut as HiveIterMut};
use crate::mask::Mask;
use crate::world::World;

/// A tuple of shared references fetchable from a row, with a `prepare`/`fetch`
/// split: `prepare` resolves each member's row offset once per archetype,
/// `fetch` reuses it for every row. Implemented for `&T` and tuples of up to
/// four such references.
pub trait ComponentRefs<'a>: Sized {
    type Offsets: Copy;

    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]>;

    /// `None` if `mask` is missing one of the requested kinds.
    fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<Self::Offsets>;

    /// # Safety
    /// `row` must be at least as long as the archetype's stride, and
    /// `offsets` must have come from [`Self::prepare`] for that same mask.
    unsafe fn fetch(row: &'a [u8], offsets: &Self::Offsets) -> Self;
}

impl<'a, T: Component> ComponentRefs<'a> for &'a T {
    type Offsets = usize;

    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
        SmallVec::from_slice(&[TypeId::of::<T>()])
    }

    fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<usize> {
        let ordinal = registry.find_ordinal(TypeId::of::<T>())?;
        if !mask.contains(ordinal) {
            return None;
        }
        Some(offset_in(ordinal, mask, registry))
    }

    unsafe fn fetch(row: &'a [u8], offset: &usize) -> Self {
        unsafe { &*(row.as_ptr().add(*offset) as *const T) }
    }
}

macro_rules! impl_component_refs {
    ($($T:ident),+) => {
        impl<'a, $($T: ComponentRefs<'a>),+> ComponentRefs<'a> for ($($T,)+) {
            type Offsets = ($($T::Offsets,)+);

            fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
                let mut ids = SmallVec::new();
                $(ids.extend($T::type_ids());)+
                ids
            }

            fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<Self::Offsets> {
                Some(($($T::prepare(mask, registry)?,)+))
            }

            #[allow(non_snake_case)]
            unsafe fn fetch(row: &'a [u8], offsets: &Self::Offsets) -> Self {
                let ($($T,)+) = offsets;
                unsafe { ($($T::fetch(row, $T),)+) }
            }
        }
    };
}

impl_component_refs!(A);
impl_component_refs!(A, B);
impl_component_refs!(A, B, C);
impl_component_refs!(A, B, C, D);

/// Mutable counterpart of [`ComponentRefs`]. Implemented for `&mut T` and
/// tuples of up to four such references.
pub trait ComponentRefsMut<'a>: Sized {
    type Offsets: Copy;

    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]>;
    fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<Self::Offsets>;

    /// # Safety
    /// `row` must be at least as long as the archetype's stride, and
    /// `offsets` must have come from [`Self::prepare`] for that same mask.
    /// The caller must not call this twice for overlapping rows concurrently.
    unsafe fn fetch(row: &'a mut [u8], offsets: &Self::Offsets) -> Self;
}

impl<'a, T: Component> ComponentRefsMut<'a> for &'a mut T {
    type Offsets = usize;

    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
        SmallVec::from_slice(&[TypeId::of::<T>()])
    }

    fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<usize> {
        let ordinal = registry.find_ordinal(TypeId::of::<T>())?;
        if !mask.contains(ordinal) {
            return None;
        }
        Some(offset_in(ordinal, mask, registry))
    }

    unsafe fn fetch(row: &'a mut [u8], offset: &usize) -> Self {
        unsafe { &mut *(row.as_mut_ptr().add(*offset) as *mut T) }
    }
}

impl<'a, T: Component> ComponentRefsMut<'a> for &'a T {
    type Offsets = usize;

    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
        SmallVec::from_slice(&[TypeId::of::<T>()])
    }

    fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<usize> {
        let ordinal = registry.find_ordinal(TypeId::of::<T>())?;
        if !mask.contains(ordinal) {
            return None;
        }
        Some(offset_in(ordinal, mask, registry))
    }

    unsafe fn fetch(row: &'a mut [u8], offset: &usize) -> Self {
        unsafe { &*(row.as_ptr().add(*offset) as *const T) }
    }
}

macro_rules! impl_component_refs_mut {
    ($($T:ident),+) => {
        impl<'a, $($T: ComponentRefsMut<'a>),+> ComponentRefsMut<'a> for ($($T,)+) {
            type Offsets = ($($T::Offsets,)+);

            fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
                let mut ids = SmallVec::new();
                $(ids.extend($T::type_ids());)+
                ids
            }

            fn prepare(mask: Mask, registry: &DynamicRegistry) -> Option<Self::Offsets> {
                Some(($($T::prepare(mask, registry)?,)+))
            }

            #[allow(non_snake_case)]
            unsafe fn fetch(row: &'a mut [u8], offsets: &Self::Offsets) -> Self {
                let ($($T,)+) = offsets;
                // SAFETY: each $T::fetch casts a disjoint byte range of the
                // same row to a distinct pointer type; offsets never overlap
                // because they were derived from one archetype's canonical
                // ascending-ordinal layout.
                unsafe {
                    let ptr = row.as_mut_ptr();
                    let len = row.len();
                    ($($T::fetch(std::slice::from_raw_parts_mut(ptr, len), $T),)+)
                }
            }
        }
    };
}

impl_component_refs_mut!(A);
impl_component_refs_mut!(A, B);
impl_component_refs_mut!(A, B, C);
impl_component_refs_mut!(A, B, C, D);

fn required_mask<T>(world: &World) -> Option<Mask>
where
    for<'a> T: ComponentRefs<'a>,
{
    let mut mask = Mask::EMPTY;
    for type_id in T::type_ids() {
        let ordinal = world.registry().find_ordinal(type_id)?;
        mask.set(ordinal);
    }
    Some(mask)
}

fn required_mask_mut<T>(world: &World) -> Option<Mask>
where
    for<'a> T: ComponentRefsMut<'a>,
{
    let mut mask = Mask::EMPTY;
    for type_id in T::type_ids() {
        let ordinal = world.registry().find_ordinal(type_id)?;
        mask.set(ordinal);
    }
    Some(mask)
}

struct Positioned<'w, O> {
    archetype: &'w Archetype,
    offsets: O,
    rows: HiveIter<'w>,
}

/// Immutable query iterator. *PositioningArchetype*: scans the world's
/// archetype vector for one whose mask is a superset of the requested set.
/// *InRow*: yields one typed tuple per live row in that archetype, offsets
/// computed once on entry. *Done*: archetype vector exhausted.
pub struct Query<'w, T>
where
    for<'a> T: ComponentRefs<'a>,
{
    world: &'w World,
    required: Option<Mask>,
    archetype_cursor: usize,
    current: Option<Positioned<'w, <T as ComponentRefs<'w>>::Offsets>>,
}

impl<'w, T> Query<'w, T>
where
    for<'a> T: ComponentRefs<'a>,
{
    pub fn new(world: &'w World) -> Self {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("query_new").entered();
        Self { world, required: required_mask::<T>(world), archetype_cursor: 0, current: None }
    }
}

impl<'w, T> Iterator for Query<'w, T>
where
    for<'a> T: ComponentRefs<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let required = self.required?;
        loop {
            if self.current.is_none() {
                let mut found = None;
                while self.archetype_cursor < self.world.archetype_count() {
                    let archetype = self.world.archetype_at(self.archetype_cursor);
                    self.archetype_cursor += 1;
                    if archetype.mask().is_superset_of(&required) {
                        if let Some(offsets) = T::prepare(archetype.mask(), self.world.registry()) {
                            found = Some(Positioned { archetype, offsets, rows: archetype.iter() });
                            break;
                        }
                    }
                }
                self.current = found;
                if self.current.is_none() {
                    return None;
                }
            }

            let cur = self.current.as_mut().unwrap();
            match cur.rows.next() {
                Some(row) => return Some(unsafe { T::fetch(row, &cur.offsets) }),
                None => {
                    self.current = None;
                    continue;
                }
            }
        }
    }
}

struct PositionedMut<'w, O> {
    offsets: O,
    rows: HiveIterMut<'w>,
}

/// Mutable counterpart of [`Query`]; yields `&mut` references instead.
pub struct QueryMut<'w, T>
where
    for<'a> T: ComponentRefsMut<'a>,
{
    archetypes: std::slice::IterMut<'w, Archetype>,
    registry: &'w DynamicRegistry,
    required: Option<Mask>,
    current: Option<PositionedMut<'w, <T as ComponentRefsMut<'w>>::Offsets>>,
}

impl<'w, T> QueryMut<'w, T>
where
    for<'a> T: ComponentRefsMut<'a>,
{
    pub fn new(world: &'w mut World) -> Self {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("query_mut_new").entered();
        let required = required_mask_mut::<T>(world);
        let (registry, archetypes) = world.registry_and_archetypes_mut();
        Self { archetypes: archetypes.iter_mut(), registry, required, current: None }
    }
}

impl<'w, T> Iterator for QueryMut<'w, T>
where
    for<'a> T: ComponentRefsMut<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let required = self.required?;
        loop {
            if self.current.is_none() {
                let mut found = None;
                for archetype in self.archetypes.by_ref() {
                    if archetype.mask().is_superset_of(&required) {
                        if let Some(offsets) = T::prepare(archetype.mask(), self.registry) {
                            found = Some(PositionedMut { offsets, rows: archetype.iter_mut() });
                            break;
                        }
                    }
                }
                self.current = found;
                if self.current.is_none() {
                    return None;
                }
            }

            let cur = self.current.as_mut().unwrap();
            match cur.rows.next() {
                Some(row) => return Some(unsafe { T::fetch(row, &cur.offsets) }),
                None => {
                    self.current = None;
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel {
        x: f32,
        y: f32,
    }

    #[test]
    fn query_visits_only_matching_archetypes() {
        let mut world = World::default();
        for i in 0..3 {
            world.insert((Pos { x: i as f32, y: 0.0 }, Vel { x: 0.0, y: 0.0 })).unwrap();
        }
        world.insert((Pos { x: 9.0, y: 9.0 },)).unwrap();

        let xs: Vec<f32> = Query::<&Pos>::new(&world).map(|p| p.x).collect();
        let mut sorted = xs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted, vec![0.0, 1.0, 2.0, 9.0]);

        let count = Query::<(&Pos, &Vel)>::new(&world).count();
        assert_eq!(count, 3);
    }

    #[test]
    fn query_mut_mutation_is_visible_to_later_query() {
        let mut world = World::default();
        world.insert((Pos { x: 1.0, y: 1.0 }, Vel { x: 0.0, y: 0.0 })).unwrap();
        world.insert((Pos { x: 2.0, y: 2.0 }, Vel { x: 0.0, y: 0.0 })).unwrap();

        for pos in QueryMut::<&mut Pos>::new(&mut world) {
            pos.x += 1.0;
        }

        let mut xs: Vec<f32> = Query::<&Pos>::new(&world).map(|p| p.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![2.0, 3.0]);
    }

    #[test]
    fn query_with_never_registered_component_is_empty() {
        let mut world = World::default();
        world.insert((Pos { x: 1.0, y: 1.0 },)).unwrap();

        #[derive(Clone, Copy)]
        struct NeverUsed(u8);

        assert_eq!(Query::<&NeverUsed>::new(&world).count(), 0);
    }
}
