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

//! World: owns the component registry and the append-only vector of
//! archetypes, resolves component sets to archetypes, and decodes entity
//! handles back to row bytes.

use ahash::AHashMap;

#[cfg(feature = "profiling")]
use tracing::{debug, trace_span};

use crate::archetype::Archetype;
use crate::component::{offset_in, Bundle, DynamicRegistry, DEFAULT_NMAX};
use crate::entity::EntityHandle;
use crate::error::{EcsError, Result};
use crate::mask::Mask;
use crate::query::{ComponentRefs, ComponentRefsMut, Query, QueryMut};

/// Central ECS world: a registry plus an ordered, append-only vector of
/// archetypes, one per distinct component-set mask.
pub struct World {
    registry: DynamicRegistry,
    archetypes: Vec<Archetype>,
    archetype_index: AHashMap<Mask, usize>,
}

impl World {
    /// An empty world whose registry can hold up to `nmax` distinct component
    /// kinds.
    pub fn with_capacity(nmax: usize) -> Self {
        Self {
            registry: DynamicRegistry::with_capacity(nmax),
            archetypes: Vec::new(),
            archetype_index: AHashMap::new(),
        }
    }

    /// Insert a bundle of components as a new entity. Argument order is
    /// immaterial: components are scattered into the row at their canonical
    /// ascending-ordinal offsets regardless of tuple position.
    pub fn insert<B: Bundle>(&mut self, bundle: B) -> Result<EntityHandle> {
        let type_ids = B::type_ids();
        let sizes = B::sizes();

        let mut ordinals = Vec::with_capacity(type_ids.len());
        for (&type_id, &size) in type_ids.iter().zip(sizes.iter()) {
            ordinals.push(self.registry.ordinal_of_raw(type_id, size)?);
        }
        let mask = Mask::from_ordinals(ordinals.iter().copied());
        let stride: usize = mask.ones().map(|o| self.registry.size_of(o)).sum();

        let archetype_ordinal = self.archetype_for(mask, stride);
        let archetype = &mut self.archetypes[archetype_ordinal];

        let mut row = vec![0u8; stride];
        let ptrs: Vec<*mut u8> = ordinals
            .iter()
            .map(|&ordinal| unsafe { row.as_mut_ptr().add(offset_in(ordinal, mask, &self.registry)) })
            .collect();
        unsafe {
            bundle.write_components(&ptrs);
        }

        let hive_index = archetype.insert(&row);
        Ok(EntityHandle::new(0, archetype_ordinal as u16, hive_index.as_u32()))
    }

    /// Decode `handle` and fetch a tuple of shared references into its row.
    /// Fails with `InvalidHandle` if the archetype ordinal is out of range,
    /// `MissingComponents` if that archetype's mask lacks a requested kind.
    pub fn entity<'w, T>(&'w self, handle: EntityHandle) -> Result<T>
    where
        T: ComponentRefs<'w>,
    {
        let archetype = self
            .archetypes
            .get(handle.archetype_ordinal() as usize)
            .ok_or(EcsError::InvalidHandle)?;
        let offsets =
            T::prepare(archetype.mask(), &self.registry).ok_or(EcsError::MissingComponents)?;
        let row = archetype.at(crate::hive::HiveIndex::from_u32(handle.row_index()));
        Ok(unsafe { T::fetch(row, &offsets) })
    }

    /// Mutable counterpart of [`Self::entity`].
    pub fn entity_mut<'w, T>(&'w mut self, handle: EntityHandle) -> Result<T>
    where
        T: ComponentRefsMut<'w>,
    {
        let archetype = self
            .archetypes
            .get_mut(handle.archetype_ordinal() as usize)
            .ok_or(EcsError::InvalidHandle)?;
        let offsets =
            T::prepare(archetype.mask(), &self.registry).ok_or(EcsError::MissingComponents)?;
        let row = archetype.at_mut(crate::hive::HiveIndex::from_u32(handle.row_index()));
        Ok(unsafe { T::fetch(row, &offsets) })
    }

    /// Iterate every live row of every archetype whose mask is a superset of
    /// `T`'s requested component set.
    pub fn query<'w, T>(&'w self) -> Query<'w, T>
    where
        T: ComponentRefs<'w>,
    {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("world_query").entered();
        Query::new(self)
    }

    /// Mutable counterpart of [`Self::query`].
    pub fn query_mut<'w, T>(&'w mut self) -> QueryMut<'w, T>
    where
        T: ComponentRefsMut<'w>,
    {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("world_query_mut").entered();
        QueryMut::new(self)
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub(crate) fn archetype_at(&self, ordinal: usize) -> &Archetype {
        &self.archetypes[ordinal]
    }

    pub(crate) fn registry(&self) -> &DynamicRegistry {
        &self.registry
    }

    pub(crate) fn registry_and_archetypes_mut(&mut self) -> (&DynamicRegistry, &mut Vec<Archetype>) {
        (&self.registry, &mut self.archetypes)
    }

    /// One archetype exists per distinct mask (§8 invariant 6); find it or
    /// append a new one with the given stride.
    fn archetype_for(&mut self, mask: Mask, stride: usize) -> usize {
        if let Some(&ordinal) = self.archetype_index.get(&mask) {
            return ordinal;
        }
        #[cfg(feature = "profiling")]
        debug!(?mask, stride, "creating new archetype");
        self.archetypes.push(Archetype::new(mask, stride));
        let ordinal = self.archetypes.len() - 1;
        self.archetype_index.insert(mask, ordinal);
        ordinal
    }
}

impl Default for World {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NMAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn argument_order_is_immaterial() {
        let mut world = World::default();
        let h1 = world.insert((Pos { x: 1.0, y: 2.0 }, Vel { x: 3.0, y: 4.0 })).unwrap();
        let h2 = world.insert((Vel { x: 3.0, y: 4.0 }, Pos { x: 1.0, y: 2.0 })).unwrap();

        assert_eq!(h1.archetype_ordinal(), h2.archetype_ordinal());
        assert_eq!(world.archetype_count(), 1);

        let (p1, v1) = world.entity::<(&Pos, &Vel)>(h1).unwrap();
        let (p2, v2) = world.entity::<(&Pos, &Vel)>(h2).unwrap();
        assert_eq!(*p1, *p2);
        assert_eq!(*v1, *v2);
    }

    #[test]
    fn handle_is_stable_across_unrelated_inserts() {
        let mut world = World::default();
        let h = world.insert((Pos { x: 5.0, y: 5.0 }, Vel { x: 1.0, y: 1.0 })).unwrap();
        for i in 0..1000 {
            world.insert((Pos { x: i as f32, y: 0.0 },)).unwrap();
        }
        let (pos, vel) = world.entity::<(&Pos, &Vel)>(h).unwrap();
        assert_eq!(*pos, Pos { x: 5.0, y: 5.0 });
        assert_eq!(*vel, Vel { x: 1.0, y: 1.0 });
    }

    #[test]
    fn entity_missing_requested_component_is_an_error() {
        let mut world = World::default();
        let h = world.insert((Pos { x: 0.0, y: 0.0 },)).unwrap();
        let err = world.entity::<(&Pos, &Vel)>(h).unwrap_err();
        assert_eq!(err, EcsError::MissingComponents);
    }

    #[test]
    fn invalid_handle_is_an_error() {
        let world = World::default();
        let bogus = EntityHandle::new(0, 42, 0);
        let err = world.entity::<&Pos>(bogus).unwrap_err();
        assert_eq!(err, EcsError::InvalidHandle);
    }

    #[test]
    fn registry_full_propagates_from_insert() {
        let mut world = World::with_capacity(2);
        world.insert((Pos { x: 0.0, y: 0.0 },)).unwrap();
        world.insert((Vel { x: 0.0, y: 0.0 },)).unwrap();

        #[derive(Clone, Copy)]
        struct Health(u32);
        let err = world.insert((Health(10),)).unwrap_err();
        assert_eq!(err, EcsError::RegistryFull { attempted: 2, capacity: 2 });
    }
}
