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

//! Google Cloud Client Libraries for Rust - Storage object handles
//!
//! This crate contains types to work with a single object in [Google Cloud
//! Storage]. Most applications will use:
//!
//! * [Blob][blob::Blob]: an object's metadata bound to the client that
//!   fetched it. It checks, reads, updates, copies, deletes, and signs URLs
//!   for that object.
//! * [Precondition][precondition::Precondition]: request preconditions that
//!   take their values from the handle's own metadata.
//! * [Storage][client::Storage]: the client the handles delegate to.
//!
//! The client forwards each request to a [stub][stub::Storage]. Applications
//! provide their own stub to reach the service, or use
//! [InMemoryStorage][in_memory::InMemoryStorage] in tests.
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases.
//!
//! [Google Cloud Storage]: https://cloud.google.com/storage

pub mod error;
pub use error::Error;

/// The result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub mod blob;
pub mod client;
pub mod copy_writer;
pub mod in_memory;
pub mod model;
pub mod options;
pub mod precondition;
pub mod read_channel;
pub mod signer;
pub mod stub;
pub mod write_channel;

mod signed_url;
