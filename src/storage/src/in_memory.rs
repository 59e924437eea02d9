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

//! An in-process implementation of the storage [stub][crate::stub::Storage].
//!
//! [InMemoryStorage] keeps the live version of each object, and enforces the
//! generation and metageneration preconditions the way the service does. It is
//! intended for tests and local development.
//!
//! Objects written with a customer-supplied [encryption key][TargetOption::EncryptionKey]
//! remember that key. Reading their contents, or copying them, requires the
//! same key as a [decryption key][SourceOption::DecryptionKey]. The data is not
//! actually encrypted, and fetching the metadata does not need the key.

use crate::error::rpc::{Code, Status};
use crate::model::{CopyRequest, Object, ObjectId, ObjectPatch, RewriteProgress};
use crate::options::{
    Conditions, GetOption, KeyAes256, ObjectField, SourceOption, TargetOption, WriteOption,
};
use crate::read_channel::{BytesReadChannel, ReadChannel};
use crate::signer::Signer;
use crate::write_channel::WriteChannel;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const MIB: u64 = 1024 * 1024;
const DEFAULT_REWRITE_CHUNK_SIZE: u64 = 16 * MIB;
const DEFAULT_READ_CHUNK_SIZE: usize = 2 * MIB as usize;

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<(String, String), Entry>,
    last_generation: i64,
}

impl State {
    fn next_generation(&mut self) -> i64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Finds the live version of `id`. An `id` with a generation only matches
    /// that generation.
    fn find(&self, id: &ObjectId) -> Option<&Entry> {
        self.objects
            .get(&(id.bucket.clone(), id.name.clone()))
            .filter(|e| id.generation.is_none_or(|g| e.object.generation == Some(g)))
    }
}

#[derive(Debug)]
struct Entry {
    object: Object,
    data: Bytes,
    key: Option<KeyAes256>,
}

impl Entry {
    /// Verifies `key` unlocks the contents of this entry.
    fn check_key(&self, key: Option<&KeyAes256>) -> Result<()> {
        let id = self.object.id();
        match (self.key.as_ref(), key) {
            (None, None) => Ok(()),
            (Some(want), Some(got)) if want == got => Ok(()),
            (Some(_), None) => Err(invalid_argument(format!(
                "{id} is encrypted with a customer-supplied key, the request has no key"
            ))),
            (Some(_), Some(_)) => Err(invalid_argument(format!(
                "the customer-supplied key does not match the key of {id}"
            ))),
            (None, Some(_)) => Err(invalid_argument(format!(
                "{id} is not encrypted with a customer-supplied key"
            ))),
        }
    }
}

/// The position of a multi-step copy.
///
/// The token names the source generation, a continuation fails if that
/// generation is no longer live.
#[derive(Debug, PartialEq)]
struct RewriteToken {
    generation: i64,
    offset: u64,
}

impl RewriteToken {
    fn parse(token: &str) -> Result<Self> {
        let invalid = || invalid_argument(format!("invalid rewrite token {token:?}"));
        let (generation, offset) = token.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            generation: generation.parse().map_err(|_| invalid())?,
            offset: offset.parse().map_err(|_| invalid())?,
        })
    }
}

impl std::fmt::Display for RewriteToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.generation, self.offset)
    }
}

/// Stores objects in memory.
///
/// Clones share the same objects.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::client::Storage;
/// # use google_cloud_storage_blob::in_memory::InMemoryStorage;
/// # use google_cloud_storage_blob::model::Object;
/// # use google_cloud_storage_blob::precondition::Precondition;
/// # tokio_test::block_on(async {
/// let client = Storage::from_stub(InMemoryStorage::new());
/// let blob = client
///     .create(Object::new().set_bucket("b").set_name("o"), "hello", &[])
///     .await?;
/// assert_eq!(blob.content(&[Precondition::GenerationMatch]).await?, "hello");
/// assert!(blob.delete(&[]).await?);
/// assert!(!blob.exists(&[]).await?);
/// # Ok::<(), anyhow::Error>(()) });
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStorage {
    state: Arc<Mutex<State>>,
    rewrite_chunk_size: u64,
    read_chunk_size: usize,
    default_signer: Option<Signer>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            rewrite_chunk_size: DEFAULT_REWRITE_CHUNK_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            default_signer: None,
        }
    }

    /// Copies at most `v` bytes per [rewrite][crate::stub::Storage::rewrite]
    /// round trip, unless the request sets
    /// [megabytes_copied_per_chunk][CopyRequest::megabytes_copied_per_chunk].
    pub fn with_rewrite_chunk_size(mut self, v: u64) -> Self {
        self.rewrite_chunk_size = v.max(1);
        self
    }

    /// Returns at most `v` bytes per chunk in [ReadChannel].
    pub fn with_read_chunk_size(mut self, v: usize) -> Self {
        self.read_chunk_size = v.max(1);
        self
    }

    /// Returns `v` from [default_signer][crate::stub::Storage::default_signer].
    pub fn with_default_signer<V: Into<Signer>>(mut self, v: V) -> Self {
        self.default_signer = Some(v.into());
        self
    }

    /// Finds the live version of `id` and verifies the preconditions.
    async fn checked_data(&self, id: &ObjectId, options: &[SourceOption]) -> Result<Bytes> {
        let conditions = Conditions::from_source_options(options);
        let state = self.state.lock().await;
        let entry = state.find(id).ok_or_else(|| not_found(id))?;
        if !conditions.check(&entry.object) {
            return Err(precondition_failed(id, &conditions));
        }
        entry.check_key(decryption_key(options))?;
        Ok(entry.data.clone())
    }

    async fn finalize(&self, object: Object, options: Vec<WriteOption>, data: Bytes) -> Result<Object> {
        let md5 = Bytes::from_iter(md5::compute(&data).0);
        let crc32c = crc32c::crc32c(&data);
        let mut target_options = Vec::new();
        for option in options {
            match option {
                WriteOption::Target(o) => target_options.push(o),
                WriteOption::Md5Match => match object.md5_hash.as_ref() {
                    None => {
                        return Err(invalid_argument(format!(
                            "MD5 verification requested, but {} has no MD5 hash",
                            object.id()
                        )));
                    }
                    Some(want) if want != &md5 => {
                        return Err(invalid_argument(format!(
                            "the MD5 hash of the data does not match the hash in {}",
                            object.id()
                        )));
                    }
                    Some(_) => {}
                },
                WriteOption::Crc32cMatch => match object.crc32c {
                    None => {
                        return Err(invalid_argument(format!(
                            "CRC32C verification requested, but {} has no CRC32C checksum",
                            object.id()
                        )));
                    }
                    Some(want) if want != crc32c => {
                        return Err(invalid_argument(format!(
                            "the CRC32C checksum of the data does not match the checksum in {}",
                            object.id()
                        )));
                    }
                    Some(_) => {}
                },
            }
        }
        let conditions = Conditions::from_target_options(&object, &target_options)?;
        let key = encryption_key(&target_options);

        let mut state = self.state.lock().await;
        let path = (object.bucket.clone(), object.name.clone());
        check_target(state.objects.get(&path), &conditions, &object.id())?;
        let generation = state.next_generation();
        let now = Utc::now();
        let mut created = Object::new()
            .set_bucket(&object.bucket)
            .set_name(&object.name)
            .set_size(data.len() as u64)
            .set_md5_hash(md5)
            .set_crc32c(crc32c)
            .set_create_time(now)
            .set_update_time(now);
        ObjectPatch::from(&object).apply(&mut created);
        let created = assign_versions(created, generation, 1);
        tracing::debug!(object = %created.id(), size = data.len(), "in-memory write");
        state.objects.insert(
            path,
            Entry {
                object: created.clone(),
                data,
                key,
            },
        );
        Ok(created)
    }
}

impl crate::stub::Storage for InMemoryStorage {
    async fn get(&self, id: ObjectId, options: Vec<GetOption>) -> Result<Option<Object>> {
        let conditions = Conditions::from_get_options(&options);
        let state = self.state.lock().await;
        let Some(entry) = state.find(&id) else {
            return Ok(None);
        };
        if !conditions.check(&entry.object) {
            return Err(precondition_failed(&id, &conditions));
        }
        let fields = options.iter().find_map(|o| match o {
            GetOption::Fields(f) => Some(f.as_slice()),
            _ => None,
        });
        let object = match fields {
            Some(f) => ObjectField::project(&entry.object, f),
            None => entry.object.clone(),
        };
        Ok(Some(object))
    }

    async fn update(&self, object: Object, options: Vec<TargetOption>) -> Result<Object> {
        let conditions = Conditions::from_target_options(&object, &options)?;
        let id = ObjectId::new(&object.bucket, &object.name);
        let mut state = self.state.lock().await;
        let entry = state
            .objects
            .get_mut(&(object.bucket.clone(), object.name.clone()))
            .ok_or_else(|| not_found(&id))?;
        if !conditions.check(&entry.object) {
            return Err(precondition_failed(&id, &conditions));
        }
        ObjectPatch::from(&object).apply(&mut entry.object);
        let generation = entry.object.generation.unwrap_or_default();
        let metageneration = entry.object.metageneration.unwrap_or_default() + 1;
        entry.object = assign_versions(entry.object.clone(), generation, metageneration)
            .set_update_time(Utc::now());
        tracing::debug!(object = %entry.object.id(), metageneration, "in-memory update");
        Ok(entry.object.clone())
    }

    async fn delete(&self, id: ObjectId, options: Vec<SourceOption>) -> Result<bool> {
        let conditions = Conditions::from_source_options(&options);
        let mut state = self.state.lock().await;
        let Some(entry) = state.find(&id) else {
            return Ok(false);
        };
        if !conditions.check(&entry.object) {
            return Err(precondition_failed(&id, &conditions));
        }
        state.objects.remove(&(id.bucket.clone(), id.name.clone()));
        tracing::debug!(object = %id, "in-memory delete");
        Ok(true)
    }

    async fn rewrite(
        &self,
        request: CopyRequest,
        rewrite_token: Option<String>,
    ) -> Result<RewriteProgress> {
        let source_conditions = Conditions::from_source_options(&request.source_options);
        let target_conditions =
            Conditions::from_target_options(&request.target, &request.target_options)?;
        let chunk_size = request
            .megabytes_copied_per_chunk
            .and_then(|m| u64::try_from(m).ok())
            .map(|m| m.saturating_mul(MIB))
            .unwrap_or(self.rewrite_chunk_size)
            .max(1);
        let token = rewrite_token.as_deref().map(RewriteToken::parse).transpose()?;
        // Continuations copy the generation the copy started with.
        let source_id = match &token {
            None => request.source.clone(),
            Some(t) => request.source.clone().with_generation(t.generation),
        };

        let mut state = self.state.lock().await;
        let source = state
            .find(&source_id)
            .ok_or_else(|| not_found(&source_id))?;
        if !source_conditions.check(&source.object) {
            return Err(precondition_failed(&source_id, &source_conditions));
        }
        source.check_key(decryption_key(&request.source_options))?;
        let size = source.data.len() as u64;
        let offset = token.as_ref().map_or(0, |t| t.offset);
        let copied = size.min(offset.saturating_add(chunk_size));
        if copied < size {
            let next = RewriteToken {
                generation: source.object.generation.unwrap_or_default(),
                offset: copied,
            };
            return Ok(RewriteProgress::new()
                .set_total_bytes_rewritten(copied)
                .set_object_size(size)
                .set_rewrite_token(next.to_string()));
        }

        let mut object = source.object.clone();
        let data = source.data.clone();
        let path = (request.target.bucket.clone(), request.target.name.clone());
        let target_id = ObjectId::new(&request.target.bucket, &request.target.name);
        check_target(state.objects.get(&path), &target_conditions, &target_id)?;
        let generation = state.next_generation();
        let now = Utc::now();
        object.bucket = request.target.bucket.clone();
        object.name = request.target.name.clone();
        ObjectPatch::from(&request.target).apply(&mut object);
        let object = assign_versions(object, generation, 1)
            .set_create_time(now)
            .set_update_time(now);
        tracing::debug!(source = %source_id, target = %object.id(), size, "in-memory copy");
        state.objects.insert(
            path,
            Entry {
                object: object.clone(),
                data,
                key: encryption_key(&request.target_options),
            },
        );
        Ok(RewriteProgress::new()
            .set_done(true)
            .set_total_bytes_rewritten(size)
            .set_object_size(size)
            .set_resource(object))
    }

    async fn read_all_bytes(&self, id: ObjectId, options: Vec<SourceOption>) -> Result<Bytes> {
        self.checked_data(&id, &options).await
    }

    async fn reader(&self, id: ObjectId, options: Vec<SourceOption>) -> Result<ReadChannel> {
        let data = self.checked_data(&id, &options).await?;
        Ok(ReadChannel::new(BytesReadChannel::new(
            data,
            self.read_chunk_size,
        )))
    }

    async fn writer(&self, object: Object, options: Vec<WriteOption>) -> Result<WriteChannel> {
        Ok(WriteChannel::new(InMemoryWriter {
            storage: self.clone(),
            object,
            options,
            buffer: Vec::new(),
        }))
    }

    fn default_signer(&self) -> Option<Signer> {
        self.default_signer.clone()
    }
}

/// Buffers the data until the channel is closed.
#[derive(Debug)]
struct InMemoryWriter {
    storage: InMemoryStorage,
    object: Object,
    options: Vec<WriteOption>,
    buffer: Vec<u8>,
}

impl crate::stub::WriteChannel for InMemoryWriter {
    async fn write(&mut self, data: Bytes) -> Result<()> {
        self.buffer.extend_from_slice(&data);
        Ok(())
    }

    async fn close(&mut self) -> Result<Object> {
        let data = Bytes::from(std::mem::take(&mut self.buffer));
        self.storage
            .finalize(self.object.clone(), std::mem::take(&mut self.options), data)
            .await
    }
}

fn assign_versions(object: Object, generation: i64, metageneration: i64) -> Object {
    let id = format!("{}/{}/{generation}", object.bucket, object.name);
    let etag = format!("{generation:x}.{metageneration:x}");
    object
        .set_generated_id(id)
        .set_etag(etag)
        .set_generation(generation)
        .set_metageneration(metageneration)
}

fn decryption_key(options: &[SourceOption]) -> Option<&KeyAes256> {
    options.iter().rev().find_map(|o| match o {
        SourceOption::DecryptionKey(k) => Some(k),
        _ => None,
    })
}

fn encryption_key(options: &[TargetOption]) -> Option<KeyAes256> {
    options.iter().rev().find_map(|o| match o {
        TargetOption::EncryptionKey(k) => Some(k.clone()),
        _ => None,
    })
}

fn check_target(current: Option<&Entry>, conditions: &Conditions, id: &ObjectId) -> Result<()> {
    let holds = match current {
        Some(e) => conditions.check(&e.object),
        None => conditions.check_absent(),
    };
    if holds {
        Ok(())
    } else {
        Err(precondition_failed(id, conditions))
    }
}

fn not_found(id: &ObjectId) -> Error {
    Error::service(
        Status::default()
            .set_code(Code::NotFound)
            .set_message(format!("no such object: {id}")),
    )
}

fn precondition_failed(id: &ObjectId, conditions: &Conditions) -> Error {
    Error::service(
        Status::default()
            .set_code(Code::FailedPrecondition)
            .set_message(format!("the conditions {conditions:?} do not hold for {id}")),
    )
}

fn invalid_argument(message: String) -> Error {
    Error::service(
        Status::default()
            .set_code(Code::InvalidArgument)
            .set_message(message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::Storage as _;
    use pretty_assertions::assert_eq;

    const LAZY: &str = "the quick brown fox jumps over the lazy dog";

    async fn create(store: &InMemoryStorage, name: &str, data: &'static str) -> Result<Object> {
        let object = Object::new()
            .set_bucket("b")
            .set_name(name)
            .set_content_type("text/plain");
        store
            .finalize(object, Vec::new(), Bytes::from_static(data.as_bytes()))
            .await
    }

    #[tokio::test]
    async fn write_assigns_versions() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let first = create(&store, "o", LAZY).await?;
        assert_eq!(first.generation, Some(1));
        assert_eq!(first.metageneration, Some(1));
        assert_eq!(first.size, Some(LAZY.len() as u64));
        assert_eq!(first.content_type.as_deref(), Some("text/plain"));
        assert_eq!(first.crc32c, Some(crc32c::crc32c(LAZY.as_bytes())));
        assert_eq!(
            first.md5_hash.as_deref(),
            Some(md5::compute(LAZY).0.as_slice())
        );
        assert_eq!(first.generated_id, "b/o/1");

        let other = create(&store, "other", LAZY).await?;
        assert_eq!(other.generation, Some(2));
        let second = create(&store, "o", "new contents").await?;
        assert_eq!(second.generation, Some(3));
        assert_eq!(second.metageneration, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn get_with_conditions() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let object = create(&store, "o", LAZY).await?;
        let id = ObjectId::new("b", "o");

        let got = store.get(id.clone(), vec![GetOption::generation_match(1)]).await?;
        assert_eq!(got, Some(object.clone()));

        let err = store
            .get(id.clone(), vec![GetOption::generation_not_match(1)])
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed(), "{err:?}");

        let got = store.get(id.clone().with_generation(2), vec![]).await?;
        assert_eq!(got, None);
        let got = store.get(ObjectId::new("b", "missing"), vec![]).await?;
        assert_eq!(got, None);
        Ok(())
    }

    #[tokio::test]
    async fn get_fields() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        create(&store, "o", LAZY).await?;
        let got = store
            .get(
                ObjectId::new("b", "o"),
                vec![GetOption::fields([ObjectField::Generation])],
            )
            .await?;
        let want = Object::new().set_bucket("b").set_name("o").set_generation(1);
        assert_eq!(got, Some(want));
        Ok(())
    }

    #[tokio::test]
    async fn update_bumps_metageneration() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let object = create(&store, "o", LAZY).await?;
        let patch = object.clone().set_cache_control("no-cache");
        let updated = store
            .update(patch.clone(), vec![TargetOption::metageneration_match()])
            .await?;
        assert_eq!(updated.generation, Some(1));
        assert_eq!(updated.metageneration, Some(2));
        assert_eq!(updated.cache_control.as_deref(), Some("no-cache"));

        // `patch` still has metageneration 1.
        let err = store
            .update(patch, vec![TargetOption::metageneration_match()])
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn update_missing() {
        let store = InMemoryStorage::new();
        let err = store
            .update(Object::new().set_bucket("b").set_name("o"), vec![])
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err:?}");
    }

    #[tokio::test]
    async fn delete() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        create(&store, "o", LAZY).await?;
        let id = ObjectId::new("b", "o");
        let err = store
            .delete(id.clone(), vec![SourceOption::generation_match(5)])
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed(), "{err:?}");
        assert!(store.delete(id.clone(), vec![SourceOption::generation_match(1)]).await?);
        assert!(!store.delete(id, vec![]).await?);
        Ok(())
    }

    #[tokio::test]
    async fn read() -> anyhow::Result<()> {
        let store = InMemoryStorage::new().with_read_chunk_size(10);
        create(&store, "o", LAZY).await?;
        let id = ObjectId::new("b", "o");
        assert_eq!(store.read_all_bytes(id.clone(), vec![]).await?, LAZY);

        let mut reader = store.reader(id.clone(), vec![]).await?;
        let first = reader.next().await.transpose()?;
        assert_eq!(first.as_deref(), Some(&LAZY.as_bytes()[..10]));
        reader.close();

        let err = store
            .read_all_bytes(ObjectId::new("b", "missing"), vec![])
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn rewrite_in_chunks() -> anyhow::Result<()> {
        let store = InMemoryStorage::new().with_rewrite_chunk_size(16);
        create(&store, "o", LAZY).await?;
        let request = CopyRequest::new(ObjectId::new("b", "o"), ObjectId::new("b2", "copy"));

        let progress = store.rewrite(request.clone(), None).await?;
        assert!(!progress.done);
        assert_eq!(progress.total_bytes_rewritten, 16);
        assert_eq!(progress.object_size, LAZY.len() as u64);
        let progress = store
            .rewrite(request.clone(), Some(progress.rewrite_token))
            .await?;
        assert_eq!(progress.total_bytes_rewritten, 32);
        let progress = store
            .rewrite(request.clone(), Some(progress.rewrite_token))
            .await?;
        assert!(progress.done);
        let copy = progress.resource.expect("done copies include the object");
        assert_eq!(copy.bucket, "b2");
        assert_eq!(copy.name, "copy");
        assert_eq!(copy.generation, Some(2));
        assert_eq!(copy.content_type.as_deref(), Some("text/plain"));
        assert_eq!(
            store.read_all_bytes(ObjectId::new("b2", "copy"), vec![]).await?,
            LAZY
        );
        Ok(())
    }

    #[tokio::test]
    async fn rewrite_bad_token() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        create(&store, "o", LAZY).await?;
        let request = CopyRequest::new(ObjectId::new("b", "o"), ObjectId::new("b", "copy"));
        for token in ["not-a-number", "16", "1:x", "x:16"] {
            let err = store
                .rewrite(request.clone(), Some(token.to_string()))
                .await
                .unwrap_err();
            assert_eq!(
                err.status().map(|s| s.code),
                Some(Code::InvalidArgument),
                "{token}"
            );
        }
        Ok(())
    }

    #[test]
    fn rewrite_token_format() -> anyhow::Result<()> {
        let token = RewriteToken {
            generation: 7,
            offset: 1024,
        };
        assert_eq!(token.to_string(), "7:1024");
        assert_eq!(RewriteToken::parse("7:1024")?, token);
        Ok(())
    }

    #[tokio::test]
    async fn rewrite_source_replaced() -> anyhow::Result<()> {
        let store = InMemoryStorage::new().with_rewrite_chunk_size(16);
        create(&store, "o", LAZY).await?;
        let request = CopyRequest::new(ObjectId::new("b", "o"), ObjectId::new("b", "copy"));
        let progress = store.rewrite(request.clone(), None).await?;
        assert!(!progress.done);
        assert_eq!(progress.rewrite_token, "1:16");

        // A new generation replaces the source before the copy completes.
        create(&store, "o", "tiny").await?;
        let err = store
            .rewrite(request.clone(), Some(progress.rewrite_token))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err:?}");
        let copy = store.get(ObjectId::new("b", "copy"), vec![]).await?;
        assert_eq!(copy, None);

        // A new copy starts from the new generation.
        let progress = store.rewrite(request, None).await?;
        assert!(progress.done);
        assert_eq!(progress.resource.and_then(|o| o.size), Some(4));
        Ok(())
    }

    #[tokio::test]
    async fn rewrite_target_does_not_exist() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        create(&store, "o", LAZY).await?;
        create(&store, "copy", "existing").await?;
        let request = CopyRequest::new(ObjectId::new("b", "o"), ObjectId::new("b", "copy"))
            .set_target_options([TargetOption::does_not_exist()]);
        let err = store.rewrite(request, None).await.unwrap_err();
        assert!(err.is_precondition_failed(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn writer_checksums() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let object = Object::new()
            .set_bucket("b")
            .set_name("o")
            .set_crc32c(crc32c::crc32c(LAZY.as_bytes()));

        let mut writer = store
            .writer(object.clone(), vec![WriteOption::crc32c_match()])
            .await?;
        writer.write(LAZY).await?;
        let created = writer.close().await?;
        assert_eq!(created.crc32c, object.crc32c);

        let mut writer = store
            .writer(object.clone(), vec![WriteOption::crc32c_match()])
            .await?;
        writer.write("something else").await?;
        let err = writer.close().await.unwrap_err();
        assert_eq!(err.status().map(|s| s.code), Some(Code::InvalidArgument));

        let object = object.set_md5_hash(vec![0_u8; 16]);
        let mut writer = store
            .writer(object, vec![WriteOption::md5_match()])
            .await?;
        writer.write(LAZY).await?;
        let err = writer.close().await.unwrap_err();
        assert_eq!(err.status().map(|s| s.code), Some(Code::InvalidArgument));
        Ok(())
    }

    #[tokio::test]
    async fn writer_checksum_missing() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let object = Object::new().set_bucket("b").set_name("o");
        for option in [WriteOption::md5_match(), WriteOption::crc32c_match()] {
            let mut writer = store.writer(object.clone(), vec![option.clone()]).await?;
            writer.write(LAZY).await?;
            let err = writer.close().await.unwrap_err();
            assert_eq!(
                err.status().map(|s| s.code),
                Some(Code::InvalidArgument),
                "{option:?}"
            );
        }
        let got = store.get(ObjectId::new("b", "o"), vec![]).await?;
        assert_eq!(got, None);
        Ok(())
    }

    #[tokio::test]
    async fn customer_supplied_keys() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let key = KeyAes256::new(&[0x42; 32])?;
        let other = KeyAes256::new(&[0x24; 32])?;
        let object = Object::new().set_bucket("b").set_name("o");
        let mut writer = store
            .writer(
                object,
                vec![WriteOption::Target(TargetOption::encryption_key(key.clone()))],
            )
            .await?;
        writer.write(LAZY).await?;
        writer.close().await?;
        let id = ObjectId::new("b", "o");

        // The metadata is available without the key.
        assert!(store.get(id.clone(), vec![]).await?.is_some());

        for options in [vec![], vec![SourceOption::decryption_key(other.clone())]] {
            let err = store
                .read_all_bytes(id.clone(), options.clone())
                .await
                .unwrap_err();
            assert_eq!(
                err.status().map(|s| s.code),
                Some(Code::InvalidArgument),
                "{options:?}"
            );
        }
        let data = store
            .read_all_bytes(id.clone(), vec![SourceOption::decryption_key(key.clone())])
            .await?;
        assert_eq!(data, LAZY);

        let request = CopyRequest::new(id.clone(), ObjectId::new("b", "copy"));
        let err = store.rewrite(request.clone(), None).await.unwrap_err();
        assert_eq!(err.status().map(|s| s.code), Some(Code::InvalidArgument));
        let request = request
            .set_source_options([SourceOption::decryption_key(key.clone())])
            .set_target_options([TargetOption::encryption_key(other.clone())]);
        let progress = store.rewrite(request, None).await?;
        assert!(progress.done);
        let copy = ObjectId::new("b", "copy");
        let data = store
            .read_all_bytes(copy.clone(), vec![SourceOption::decryption_key(other)])
            .await?;
        assert_eq!(data, LAZY);
        let err = store
            .read_all_bytes(copy, vec![SourceOption::decryption_key(key)])
            .await
            .unwrap_err();
        assert_eq!(err.status().map(|s| s.code), Some(Code::InvalidArgument));

        // Objects without a key reject one.
        create(&store, "plain", LAZY).await?;
        let err = store
            .read_all_bytes(
                ObjectId::new("b", "plain"),
                vec![SourceOption::decryption_key(KeyAes256::new(&[1; 32])?)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.status().map(|s| s.code), Some(Code::InvalidArgument));
        Ok(())
    }

    #[tokio::test]
    async fn writer_does_not_exist() -> anyhow::Result<()> {
        let store = InMemoryStorage::new();
        let object = Object::new().set_bucket("b").set_name("o");
        let options = vec![WriteOption::Target(TargetOption::does_not_exist())];
        let mut writer = store.writer(object.clone(), options.clone()).await?;
        writer.write(LAZY).await?;
        writer.close().await?;

        let mut writer = store.writer(object, options).await?;
        writer.write(LAZY).await?;
        let err = writer.close().await.unwrap_err();
        assert!(err.is_precondition_failed(), "{err:?}");
        Ok(())
    }

    #[test]
    fn default_signer() {
        use crate::stub::Storage as _;
        assert!(InMemoryStorage::new().default_signer().is_none());
    }
}
