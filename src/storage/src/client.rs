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

//! Contains the Storage client and its builder.

use crate::Result;
use crate::blob::Blob;
use crate::copy_writer::CopyWriter;
use crate::error::SigningError;
use crate::model::{CopyRequest, Object, ObjectId};
use crate::options::{GetOption, SignUrlOption, SourceOption, TargetOption, WriteOption};
use crate::read_channel::ReadChannel;
use crate::signed_url::SignedUrlBuilder;
use crate::signer::Signer;
use crate::stub::dynamic::Storage as StorageStub;
use crate::write_channel::WriteChannel;
use base64::{Engine, prelude::BASE64_STANDARD};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_UNIVERSE_DOMAIN: &str = "googleapis.com";

/// Implements a client for the Cloud Storage API.
///
/// The client delegates every request to a [stub][crate::stub::Storage]. The
/// stub owns the transport, authentication, and retry policies. The client
/// converts the responses to [Blob] handles, and creates signed URLs.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::client::Storage;
/// # use google_cloud_storage_blob::in_memory::InMemoryStorage;
/// # use google_cloud_storage_blob::model::{Object, ObjectId};
/// # tokio_test::block_on(async {
/// let client = Storage::builder()
///     .with_project_id("my-project")
///     .build(InMemoryStorage::new());
/// let blob = client
///     .create(Object::new().set_bucket("my-bucket").set_name("greeting.txt"), "hello", &[])
///     .await?;
/// let found = client.get(ObjectId::new("my-bucket", "greeting.txt"), &[]).await?;
/// assert_eq!(found, Some(blob));
/// # Ok::<(), anyhow::Error>(()) });
/// ```
///
/// # Pooling and Cloning
///
/// `Storage` holds an [Arc] to the stub, and copies of its configuration.
/// Cloning the client is cheap, and all the clones share the same stub.
/// Every [Blob] holds such a clone.
#[derive(Clone, Debug)]
pub struct Storage {
    stub: Arc<dyn StorageStub>,
    config: ClientConfig,
    signer: Option<Signer>,
}

impl Storage {
    /// Returns a builder for [Storage].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a new client from the provided stub, using the default
    /// configuration.
    ///
    /// The most common case for calling this function is in tests mocking the
    /// client's behavior.
    pub fn from_stub<T>(stub: T) -> Self
    where
        T: crate::stub::Storage + 'static,
    {
        ClientBuilder::new().build(stub)
    }

    /// The configuration used to create this client.
    ///
    /// Two [Blob] handles with the same object are equal only if their
    /// clients have equal configurations.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches the metadata of an object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    pub async fn get(&self, id: ObjectId, options: &[GetOption]) -> Result<Option<Blob>> {
        tracing::debug!(bucket = %id.bucket, object = %id.name, generation = ?id.generation, "get");
        let object = self.stub.get(id, options.to_vec()).await?;
        Ok(object.map(|o| Blob::new(self.clone(), o)))
    }

    /// Updates the mutable attributes of an object.
    ///
    /// See [ObjectPatch][crate::model::ObjectPatch] for the attributes sent
    /// to the service, and how the metadata is merged or cleared.
    pub async fn update(&self, object: Object, options: &[TargetOption]) -> Result<Blob> {
        tracing::debug!(bucket = %object.bucket, object = %object.name, generation = ?object.generation, "update");
        let object = self.stub.update(object, options.to_vec()).await?;
        Ok(Blob::new(self.clone(), object))
    }

    /// Deletes an object.
    ///
    /// Returns `Ok(false)` if the object does not exist.
    pub async fn delete(&self, id: ObjectId, options: &[SourceOption]) -> Result<bool> {
        tracing::debug!(bucket = %id.bucket, object = %id.name, generation = ?id.generation, "delete");
        self.stub.delete(id, options.to_vec()).await
    }

    /// Starts a copy and returns a handle to track its progress.
    ///
    /// The first round trip happens before this function returns. Small
    /// objects are often copied in this first round trip.
    pub async fn copy(&self, request: CopyRequest) -> Result<CopyWriter> {
        tracing::debug!(
            source = %request.source,
            target_bucket = %request.target.bucket,
            target_object = %request.target.name,
            "copy"
        );
        let progress = self.stub.rewrite(request.clone(), None).await?;
        Ok(CopyWriter::new(self.clone(), request, progress))
    }

    pub(crate) async fn rewrite(
        &self,
        request: CopyRequest,
        rewrite_token: String,
    ) -> Result<crate::model::RewriteProgress> {
        tracing::debug!(source = %request.source, "copy chunk");
        self.stub.rewrite(request, Some(rewrite_token)).await
    }

    /// Reads the full contents of an object.
    pub async fn read_all_bytes(
        &self,
        id: ObjectId,
        options: &[SourceOption],
    ) -> Result<bytes::Bytes> {
        tracing::debug!(bucket = %id.bucket, object = %id.name, generation = ?id.generation, "read_all_bytes");
        self.stub.read_all_bytes(id, options.to_vec()).await
    }

    /// Opens a channel to read the contents of an object incrementally.
    pub async fn reader(&self, id: ObjectId, options: &[SourceOption]) -> Result<ReadChannel> {
        tracing::debug!(bucket = %id.bucket, object = %id.name, generation = ?id.generation, "reader");
        self.stub.reader(id, options.to_vec()).await
    }

    /// Opens a channel to upload new contents for an object.
    pub async fn writer(&self, object: Object, options: &[WriteOption]) -> Result<WriteChannel> {
        tracing::debug!(bucket = %object.bucket, object = %object.name, "writer");
        self.stub.writer(object, options.to_vec()).await
    }

    /// Creates (or replaces) an object with `contents`.
    pub async fn create<T>(
        &self,
        object: Object,
        contents: T,
        options: &[WriteOption],
    ) -> Result<Blob>
    where
        T: Into<bytes::Bytes>,
    {
        let mut writer = self.writer(object, options).await?;
        writer.write(contents).await?;
        let object = writer.close().await?;
        Ok(Blob::new(self.clone(), object))
    }

    /// Creates a [V4 signed URL] granting time-limited access to `object`.
    ///
    /// The signer is, in order of precedence, the one in
    /// [SignUrlOption::SignWith], the one configured with
    /// [ClientBuilder::with_signer], or the one derived from the default
    /// credentials by the stub.
    ///
    /// The options and the object are validated before any signer is used.
    ///
    /// [V4 signed URL]: https://cloud.google.com/storage/docs/access-control/signed-urls
    pub async fn sign_url(
        &self,
        object: &Object,
        duration: Duration,
        options: Vec<SignUrlOption>,
    ) -> std::result::Result<url::Url, SigningError> {
        tracing::debug!(bucket = %object.bucket, object = %object.name, duration_secs = duration.as_secs(), "sign_url");
        let mut builder = SignedUrlBuilder::new(&object.bucket, &object.name)
            .with_expiration(duration)
            .with_endpoint(self.config.endpoint());
        let mut explicit = None;
        for option in options {
            builder = match option {
                SignUrlOption::HttpMethod(m) => builder.with_method(m),
                SignUrlOption::WithContentType => {
                    let content_type = object.content_type.as_ref().ok_or_else(|| {
                        SigningError::invalid_parameter(
                            "content_type",
                            format!("{} has no content type", object.id()),
                        )
                    })?;
                    builder.with_header("content-type", content_type)
                }
                SignUrlOption::WithMd5 => {
                    let md5 = object.md5_hash.as_ref().ok_or_else(|| {
                        SigningError::invalid_parameter(
                            "md5",
                            format!("{} has no MD5 hash", object.id()),
                        )
                    })?;
                    builder.with_header("content-md5", BASE64_STANDARD.encode(md5))
                }
                SignUrlOption::SignWith(s) => {
                    explicit = Some(s);
                    builder
                }
                SignUrlOption::WithEndpoint(e) => builder.with_endpoint(e),
                SignUrlOption::WithHeader(k, v) => builder.with_header(k, v),
                SignUrlOption::WithQueryParameter(k, v) => builder.with_query_param(k, v),
            };
        }
        builder.validate()?;
        let signer = explicit
            .or_else(|| self.signer.clone())
            .or_else(|| self.stub.default_signer())
            .ok_or_else(SigningError::missing_signer)?;
        builder.sign_with(&signer).await
    }
}

/// The configuration of a [Storage] client.
///
/// This is the part of the client persisted with a [Blob], see
/// [BlobSeed][crate::blob::BlobSeed].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ClientConfig {
    /// Overrides the service endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// The project used for billing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// The universe domain, `googleapis.com` unless configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe_domain: Option<String>,
}

impl ClientConfig {
    /// The endpoint used in requests and signed URLs.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::client::ClientConfig;
    /// let config = ClientConfig::default();
    /// assert_eq!(config.endpoint(), "https://storage.googleapis.com");
    /// ```
    pub fn endpoint(&self) -> String {
        match (&self.endpoint, &self.universe_domain) {
            (Some(e), _) => e.clone(),
            (None, Some(u)) => format!("https://storage.{u}"),
            (None, None) => format!("https://storage.{DEFAULT_UNIVERSE_DOMAIN}"),
        }
    }
}

/// A builder for [Storage].
///
/// ```
/// # use google_cloud_storage_blob::client::Storage;
/// # use google_cloud_storage_blob::in_memory::InMemoryStorage;
/// let client = Storage::builder()
///     .with_endpoint("https://private.googleapis.com")
///     .build(InMemoryStorage::new());
/// assert_eq!(client.config().endpoint(), "https://private.googleapis.com");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    signer: Option<Signer>,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts from a persisted configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Sets the endpoint.
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.config.endpoint = Some(v.into());
        self
    }

    /// Sets the project used for billing.
    pub fn with_project_id<V: Into<String>>(mut self, v: V) -> Self {
        self.config.project_id = Some(v.into());
        self
    }

    /// Sets the universe domain.
    pub fn with_universe_domain<V: Into<String>>(mut self, v: V) -> Self {
        self.config.universe_domain = Some(v.into());
        self
    }

    /// Sets the signer used for [Storage::sign_url].
    ///
    /// The signer is not part of the [ClientConfig]. Persisted handles must
    /// configure it again when they are restored.
    pub fn with_signer<V: Into<Signer>>(mut self, v: V) -> Self {
        self.signer = Some(v.into());
        self
    }

    /// Creates a client using `stub` for all requests.
    pub fn build<T>(self, stub: T) -> Storage
    where
        T: crate::stub::Storage + 'static,
    {
        Storage {
            stub: Arc::new(stub),
            config: self.config,
            signer: self.signer,
        }
    }
}
