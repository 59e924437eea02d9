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

//! Handles to the objects in Cloud Storage.
//!
//! A [Blob] is an immutable snapshot of the object metadata, plus the client
//! used to fetch it. Operations on the handle never change it: they return a
//! new handle describing the object after the operation.

use crate::Result;
use crate::client::{ClientConfig, Storage};
use crate::copy_writer::CopyWriter;
use crate::error::SigningError;
use crate::model::{CopyRequest, Object, ObjectAccessControl, ObjectId};
use crate::options::{GetOption, ObjectField, SignUrlOption, TargetOption, WriteOption};
use crate::precondition::{Precondition, resolve_all_for_mutate, resolve_all_for_read};
use crate::read_channel::ReadChannel;
use crate::write_channel::WriteChannel;
use std::time::Duration;

/// A handle to an object, and the client used to operate on it.
///
/// Two handles are equal if they describe the same object metadata and their
/// clients have the same [configuration][ClientConfig].
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::blob::Blob;
/// use google_cloud_storage_blob::precondition::Precondition;
/// # async fn sample(blob: Blob) -> anyhow::Result<()> {
/// // Only delete the object if nobody changed it since it was fetched.
/// let deleted = blob
///     .delete(&[Precondition::GenerationMatch, Precondition::MetagenerationMatch])
///     .await?;
/// println!("deleted={deleted}");
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Blob {
    object: Object,
    storage: Storage,
}

impl Blob {
    pub(crate) fn new(storage: Storage, object: Object) -> Self {
        Self { object, storage }
    }

    /// The object metadata.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Consumes the handle, returning the object metadata.
    pub fn into_object(self) -> Object {
        self.object
    }

    /// The bucket, name, and generation of the object.
    pub fn id(&self) -> ObjectId {
        self.object.id()
    }

    /// The client used by this handle.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Starts a builder to change the mutable attributes of this object.
    ///
    /// The changes are only sent to the service with [Blob::update].
    pub fn to_builder(&self) -> BlobBuilder {
        BlobBuilder {
            object: self.object.clone(),
            storage: self.storage.clone(),
        }
    }

    /// Returns `true` if this object exists.
    ///
    /// Only the identity fields are requested from the service.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::blob::Blob;
    /// # use google_cloud_storage_blob::precondition::Precondition;
    /// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
    /// if blob.exists(&[Precondition::MetagenerationMatch]).await? {
    ///     println!("{} is unchanged", blob.id());
    /// }
    /// # Ok(()) }
    /// ```
    pub async fn exists(&self, preconditions: &[Precondition]) -> Result<bool> {
        let mut options = resolve_all_for_read(preconditions, &self.object);
        options.push(GetOption::fields([
            ObjectField::Bucket,
            ObjectField::Name,
            ObjectField::Generation,
        ]));
        let found = self.storage.get(self.id(), &options).await?;
        Ok(found.is_some())
    }

    /// Reads the full contents of this object.
    pub async fn content(&self, preconditions: &[Precondition]) -> Result<bytes::Bytes> {
        let options = resolve_all_for_mutate(preconditions, &self.object);
        self.storage.read_all_bytes(self.id(), &options).await
    }

    /// Fetches the latest metadata of this object.
    ///
    /// Returns `Ok(None)` if the object no longer exists. The request does not
    /// include this handle's generation, the live version is returned.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::blob::Blob;
    /// # use google_cloud_storage_blob::precondition::Precondition;
    /// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
    /// match blob.reload(&[Precondition::GenerationNotMatch]).await {
    ///     Ok(Some(newer)) => println!("new content at {}", newer.id()),
    ///     Ok(None) => println!("the object was deleted"),
    ///     Err(e) if e.is_precondition_failed() => println!("no new content"),
    ///     Err(e) => return Err(e.into()),
    /// }
    /// # Ok(()) }
    /// ```
    pub async fn reload(&self, preconditions: &[Precondition]) -> Result<Option<Blob>> {
        let options = resolve_all_for_read(preconditions, &self.object);
        let id = ObjectId::new(&self.object.bucket, &self.object.name);
        self.storage.get(id, &options).await
    }

    /// Sends the mutable attributes of this handle to the service.
    ///
    /// The options are forwarded unchanged. Preconditions such as
    /// [TargetOption::MetagenerationMatch] refer to this handle's values.
    ///
    /// The custom metadata is merged into the service metadata. To remove all
    /// the keys use [BlobBuilder::clear_metadata].
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::blob::Blob;
    /// # use google_cloud_storage_blob::options::TargetOption;
    /// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
    /// let updated = blob
    ///     .to_builder()
    ///     .set_content_type("text/plain")
    ///     .build()
    ///     .update(&[TargetOption::metageneration_match()])
    ///     .await?;
    /// println!("new metageneration {:?}", updated.object().metageneration);
    /// # Ok(()) }
    /// ```
    pub async fn update(&self, options: &[TargetOption]) -> Result<Blob> {
        self.storage.update(self.object.clone(), options).await
    }

    /// Deletes this object.
    ///
    /// Returns `Ok(false)` if the object does not exist.
    pub async fn delete(&self, preconditions: &[Precondition]) -> Result<bool> {
        let options = resolve_all_for_mutate(preconditions, &self.object);
        self.storage.delete(self.id(), &options).await
    }

    /// Copies this object to `target`.
    ///
    /// The copy may need more round trips, see [CopyWriter].
    pub async fn copy_to(
        &self,
        target: ObjectId,
        preconditions: &[Precondition],
    ) -> Result<CopyWriter> {
        let request = CopyRequest::new(
            ObjectId::new(&self.object.bucket, &self.object.name),
            target,
        )
        .set_source_options(resolve_all_for_mutate(preconditions, &self.object));
        self.storage.copy(request).await
    }

    /// Copies this object to `bucket`, keeping its name.
    pub async fn copy_to_bucket<B>(
        &self,
        bucket: B,
        preconditions: &[Precondition],
    ) -> Result<CopyWriter>
    where
        B: Into<String>,
    {
        self.copy_to_object(bucket, self.object.name.clone(), preconditions)
            .await
    }

    /// Copies this object to `name` in `bucket`.
    pub async fn copy_to_object<B, N>(
        &self,
        bucket: B,
        name: N,
        preconditions: &[Precondition],
    ) -> Result<CopyWriter>
    where
        B: Into<String>,
        N: Into<String>,
    {
        self.copy_to(ObjectId::new(bucket, name), preconditions)
            .await
    }

    /// Opens a channel to read this object incrementally.
    pub async fn reader(&self, preconditions: &[Precondition]) -> Result<ReadChannel> {
        let options = resolve_all_for_mutate(preconditions, &self.object);
        self.storage.reader(self.id(), &options).await
    }

    /// Opens a channel to replace the contents of this object.
    ///
    /// The handle's MD5 hash and CRC32C checksum are ignored unless requested
    /// with [WriteOption::Md5Match] or [WriteOption::Crc32cMatch].
    pub async fn writer(&self, options: &[WriteOption]) -> Result<WriteChannel> {
        self.storage.writer(self.object.clone(), options).await
    }

    /// Creates a signed URL for this object, valid for `duration`.
    ///
    /// See [Storage::sign_url] for how the signer is chosen.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::blob::Blob;
    /// # use google_cloud_storage_blob::options::SignUrlOption;
    /// # use std::time::Duration;
    /// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
    /// let url = blob
    ///     .sign_url(
    ///         Duration::from_secs(15 * 60),
    ///         vec![SignUrlOption::http_method(http::Method::PUT), SignUrlOption::with_content_type()],
    ///     )
    ///     .await?;
    /// println!("upload with: curl -X PUT -H 'content-type: text/plain' '{url}'");
    /// # Ok(()) }
    /// ```
    pub async fn sign_url(
        &self,
        duration: Duration,
        options: Vec<SignUrlOption>,
    ) -> std::result::Result<url::Url, SigningError> {
        self.storage.sign_url(&self.object, duration, options).await
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object && self.storage.config() == other.storage.config()
    }
}

/// Changes the mutable attributes of a [Blob].
///
/// The generation, metageneration, and other attributes assigned by the
/// service cannot be changed.
#[derive(Clone, Debug)]
pub struct BlobBuilder {
    object: Object,
    storage: Storage,
}

impl BlobBuilder {
    pub fn set_content_type<T: Into<String>>(mut self, v: T) -> Self {
        self.object.content_type = Some(v.into());
        self
    }

    pub fn set_content_encoding<T: Into<String>>(mut self, v: T) -> Self {
        self.object.content_encoding = Some(v.into());
        self
    }

    pub fn set_content_disposition<T: Into<String>>(mut self, v: T) -> Self {
        self.object.content_disposition = Some(v.into());
        self
    }

    pub fn set_content_language<T: Into<String>>(mut self, v: T) -> Self {
        self.object.content_language = Some(v.into());
        self
    }

    pub fn set_cache_control<T: Into<String>>(mut self, v: T) -> Self {
        self.object.cache_control = Some(v.into());
        self
    }

    /// Sets the custom metadata sent in the next update.
    ///
    /// In an update, these keys are merged into the service metadata. An
    /// empty iterator removes all the keys, like [clear_metadata][Self::clear_metadata].
    pub fn set_metadata<T, K, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.object = self.object.set_metadata(v);
        self
    }

    /// Removes all the custom metadata in the next update.
    pub fn clear_metadata(mut self) -> Self {
        self.object.metadata = Some(Default::default());
        self
    }

    /// Leaves the custom metadata unchanged in the next update.
    pub fn keep_metadata(mut self) -> Self {
        self.object.metadata = None;
        self
    }

    pub fn set_acl<T, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = V>,
        V: Into<ObjectAccessControl>,
    {
        self.object = self.object.set_acl(v);
        self
    }

    /// Sets the MD5 hash verified by [WriteOption::Md5Match].
    pub fn set_md5_hash<T: Into<bytes::Bytes>>(mut self, v: T) -> Self {
        self.object.md5_hash = Some(v.into());
        self
    }

    /// Sets the CRC32C checksum verified by [WriteOption::Crc32cMatch].
    pub fn set_crc32c(mut self, v: u32) -> Self {
        self.object.crc32c = Some(v);
        self
    }

    pub fn build(self) -> Blob {
        Blob::new(self.storage, self.object)
    }
}

#[derive(serde::Serialize)]
struct PersistedBlobRef<'a> {
    object: &'a Object,
    config: &'a ClientConfig,
}

#[derive(serde::Deserialize)]
struct PersistedBlob {
    object: Object,
    config: ClientConfig,
}

/// Persists the object metadata and the client configuration.
///
/// The client itself is not persisted. Use [BlobSeed] to restore a handle.
impl serde::Serialize for Blob {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PersistedBlobRef {
            object: &self.object,
            config: self.storage.config(),
        }
        .serialize(serializer)
    }
}

/// Creates the client for a restored [Blob].
///
/// Closures taking a `&ClientConfig` and returning a `Result<Storage>`
/// implement this trait.
pub trait ServiceFactory {
    fn create(&self, config: &ClientConfig) -> Result<Storage>;
}

impl<F> ServiceFactory for F
where
    F: Fn(&ClientConfig) -> Result<Storage>,
{
    fn create(&self, config: &ClientConfig) -> Result<Storage> {
        self(config)
    }
}

/// Restores a persisted [Blob], creating its client with a [ServiceFactory].
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::blob::{Blob, BlobSeed};
/// # use google_cloud_storage_blob::client::{ClientBuilder, ClientConfig};
/// # use google_cloud_storage_blob::in_memory::InMemoryStorage;
/// use serde::de::DeserializeSeed;
/// # fn sample(blob: &Blob, store: InMemoryStorage) -> anyhow::Result<()> {
/// let json = serde_json::to_string(blob)?;
/// let factory = |config: &ClientConfig| -> google_cloud_storage_blob::Result<_> {
///     Ok(ClientBuilder::from_config(config.clone()).build(store.clone()))
/// };
/// let mut deserializer = serde_json::Deserializer::from_str(&json);
/// let restored = BlobSeed::new(&factory).deserialize(&mut deserializer)?;
/// assert_eq!(&restored, blob);
/// # Ok(()) }
/// ```
pub struct BlobSeed<'a, F> {
    factory: &'a F,
}

impl<'a, F: ServiceFactory> BlobSeed<'a, F> {
    pub fn new(factory: &'a F) -> Self {
        Self { factory }
    }
}

impl<'de, F: ServiceFactory> serde::de::DeserializeSeed<'de> for BlobSeed<'_, F> {
    type Value = Blob;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;
        use serde::de::Error as _;
        let persisted = PersistedBlob::deserialize(deserializer)?;
        let storage = self
            .factory
            .create(&persisted.config)
            .map_err(D::Error::custom)?;
        Ok(Blob::new(storage, persisted.object))
    }
}
