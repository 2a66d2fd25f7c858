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

//! Archetype ECS core
//!
//! An archetype-based entity-component store: structure-of-arrays storage
//! partitioned by the exact component set each entity carries, with a query
//! engine that walks archetypes by component-set superset test.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod hive;
pub mod mask;
pub mod query;
pub mod utils;
pub mod world;

pub use archetype::Archetype;
pub use component::{
    Bundle, Component, ComponentSizes, DynamicRegistry, StaticOrdinal, DEFAULT_NMAX,
    MAX_BUNDLE_COMPONENTS, MAX_REGISTRY_CAPACITY,
};
pub use entity::EntityHandle;
pub use error::{EcsError, Result};
pub use hive::{Hive, HiveIndex, CHUNK_CAPACITY};
pub use mask::{Mask, MAX_NMAX};
pub use query::{ComponentRefs, ComponentRefsMut, Query, QueryMut};
pub use world::World;
