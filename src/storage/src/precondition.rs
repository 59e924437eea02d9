// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Conditional requests against the version of an object held in a handle.
//!
//! A [Precondition] names the field of the object the request depends on,
//! but not its value. The value is taken from the handle when the request is
//! made:
//!
//! ```
//! # use google_cloud_storage_blob::model::Object;
//! # use google_cloud_storage_blob::options::{GetOption, SourceOption};
//! use google_cloud_storage_blob::precondition::{Precondition, resolve_for_mutate, resolve_for_read};
//! let object = Object::new()
//!     .set_bucket("my-bucket")
//!     .set_name("my-object")
//!     .set_generation(7)
//!     .set_metageneration(3);
//! assert_eq!(
//!     resolve_for_read(Precondition::GenerationNotMatch, &object),
//!     GetOption::IfGenerationNotMatch(7)
//! );
//! assert_eq!(
//!     resolve_for_mutate(Precondition::MetagenerationMatch, &object),
//!     SourceOption::IfMetagenerationMatch(3)
//! );
//! ```
//!
//! Handles created from service responses always have a generation and a
//! metageneration. Resolving a precondition against an object without the
//! corresponding field is a bug in the caller, and these functions panic.

use crate::model::Object;
use crate::options::{GetOption, SourceOption};

/// The fields of an object a conditional request can depend on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precondition {
    /// The request succeeds only if the generation is unchanged.
    GenerationMatch,
    /// The request succeeds only if the generation changed.
    GenerationNotMatch,
    /// The request succeeds only if the metageneration is unchanged.
    MetagenerationMatch,
    /// The request succeeds only if the metageneration changed.
    MetagenerationNotMatch,
}

impl Precondition {
    fn generation(object: &Object) -> i64 {
        object.generation.unwrap_or_else(|| {
            panic!(
                "a generation precondition was resolved against {}, which has no generation",
                object.id()
            )
        })
    }

    fn metageneration(object: &Object) -> i64 {
        object.metageneration.unwrap_or_else(|| {
            panic!(
                "a metageneration precondition was resolved against {}, which has no metageneration",
                object.id()
            )
        })
    }
}

/// Resolves `precondition` for a metadata read, using the values in `object`.
///
/// # Panics
///
/// If `object` does not have the generation (or metageneration) the
/// precondition refers to.
pub fn resolve_for_read(precondition: Precondition, object: &Object) -> GetOption {
    match precondition {
        Precondition::GenerationMatch => {
            GetOption::IfGenerationMatch(Precondition::generation(object))
        }
        Precondition::GenerationNotMatch => {
            GetOption::IfGenerationNotMatch(Precondition::generation(object))
        }
        Precondition::MetagenerationMatch => {
            GetOption::IfMetagenerationMatch(Precondition::metageneration(object))
        }
        Precondition::MetagenerationNotMatch => {
            GetOption::IfMetagenerationNotMatch(Precondition::metageneration(object))
        }
    }
}

/// Resolves `precondition` for a request that reads the data, deletes, or
/// copies an existing object, using the values in `object`.
///
/// # Panics
///
/// If `object` does not have the generation (or metageneration) the
/// precondition refers to.
pub fn resolve_for_mutate(precondition: Precondition, object: &Object) -> SourceOption {
    match precondition {
        Precondition::GenerationMatch => {
            SourceOption::IfGenerationMatch(Precondition::generation(object))
        }
        Precondition::GenerationNotMatch => {
            SourceOption::IfGenerationNotMatch(Precondition::generation(object))
        }
        Precondition::MetagenerationMatch => {
            SourceOption::IfMetagenerationMatch(Precondition::metageneration(object))
        }
        Precondition::MetagenerationNotMatch => {
            SourceOption::IfMetagenerationNotMatch(Precondition::metageneration(object))
        }
    }
}

/// Resolves each precondition with [resolve_for_read], in order.
pub fn resolve_all_for_read(preconditions: &[Precondition], object: &Object) -> Vec<GetOption> {
    preconditions
        .iter()
        .map(|p| resolve_for_read(*p, object))
        .collect()
}

/// Resolves each precondition with [resolve_for_mutate], in order.
pub fn resolve_all_for_mutate(
    preconditions: &[Precondition],
    object: &Object,
) -> Vec<SourceOption> {
    preconditions
        .iter()
        .map(|p| resolve_for_mutate(*p, object))
        .collect()
}
