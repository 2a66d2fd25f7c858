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

//! Error types

use std::fmt;

/// ECS error type. Only caller-triggerable invariant violations are represented
/// here; a broken internal bookkeeping invariant is a `panic!`, not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// The dynamic registry was asked to assign an ordinal beyond its capacity.
    RegistryFull { attempted: usize, capacity: usize },

    /// `entity`/`entity_mut` was asked for a component kind the archetype doesn't carry.
    MissingComponents,

    /// An entity handle decoded to an out-of-range archetype ordinal or hive index.
    InvalidHandle,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::RegistryFull { attempted, capacity } => {
                write!(f, "registry full: attempted ordinal {attempted}, capacity {capacity}")
            }
            EcsError::MissingComponents => write!(f, "archetype does not carry all requested components"),
            EcsError::InvalidHandle => write!(f, "entity handle does not resolve to a live row"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
