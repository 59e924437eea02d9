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

//! Traits to mock the storage service.
//!
//! The handles in this crate delegate every request to an implementation of
//! [Storage]. Application developers may implement this trait to mock
//! `client::Storage`, or to adapt an existing transport. The crate includes an
//! in-process implementation in [in_memory][crate::in_memory].

use crate::Result;
use crate::model::{CopyRequest, Object, ObjectId, RewriteProgress};
use crate::options::{GetOption, SourceOption, TargetOption, WriteOption};
use crate::read_channel::ReadChannel as ReadChannelHandle;
use crate::signer::Signer;
use crate::write_channel::WriteChannel as WriteChannelHandle;

/// Defines the trait used to implement [crate::client::Storage].
///
/// Services gain new RPCs routinely. Consequently, this trait gains new methods
/// too. To avoid breaking applications the trait provides a default
/// implementation of each method. Most of these implementations just panic.
pub trait Storage: std::fmt::Debug + Send + Sync {
    /// Fetches the metadata of an object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn get(
        &self,
        _id: ObjectId,
        _options: Vec<GetOption>,
    ) -> impl std::future::Future<Output = Result<Option<Object>>> + Send {
        unimplemented_stub::<Option<Object>>()
    }

    /// Updates the mutable attributes of an object, see
    /// [ObjectPatch][crate::model::ObjectPatch].
    ///
    /// Fails with `NOT_FOUND` if the object does not exist.
    fn update(
        &self,
        _object: Object,
        _options: Vec<TargetOption>,
    ) -> impl std::future::Future<Output = Result<Object>> + Send {
        unimplemented_stub::<Object>()
    }

    /// Deletes an object.
    ///
    /// Returns `Ok(false)` if the object does not exist.
    fn delete(
        &self,
        _id: ObjectId,
        _options: Vec<SourceOption>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send {
        unimplemented_stub::<bool>()
    }

    /// Performs one round trip of a copy.
    ///
    /// The first call has no `rewrite_token`, following calls use the token
    /// from the previous [RewriteProgress].
    fn rewrite(
        &self,
        _request: CopyRequest,
        _rewrite_token: Option<String>,
    ) -> impl std::future::Future<Output = Result<RewriteProgress>> + Send {
        unimplemented_stub::<RewriteProgress>()
    }

    /// Reads the full contents of an object.
    fn read_all_bytes(
        &self,
        _id: ObjectId,
        _options: Vec<SourceOption>,
    ) -> impl std::future::Future<Output = Result<bytes::Bytes>> + Send {
        unimplemented_stub::<bytes::Bytes>()
    }

    /// Opens a channel to read the contents of an object incrementally.
    fn reader(
        &self,
        _id: ObjectId,
        _options: Vec<SourceOption>,
    ) -> impl std::future::Future<Output = Result<ReadChannelHandle>> + Send {
        unimplemented_stub::<ReadChannelHandle>()
    }

    /// Opens a channel to upload new contents for an object.
    fn writer(
        &self,
        _object: Object,
        _options: Vec<WriteOption>,
    ) -> impl std::future::Future<Output = Result<WriteChannelHandle>> + Send {
        unimplemented_stub::<WriteChannelHandle>()
    }

    /// The signer derived from the default credentials, if any.
    ///
    /// Used to sign URLs when neither the request nor the client configure a
    /// signer.
    fn default_signer(&self) -> Option<Signer> {
        None
    }
}

/// The implementation behind [ReadChannel][crate::read_channel::ReadChannel].
pub trait ReadChannel: std::fmt::Debug + Send {
    /// The next chunk of data, `None` at the end of the object.
    fn next(&mut self) -> impl std::future::Future<Output = Option<Result<bytes::Bytes>>> + Send;

    /// Moves the read position to `offset`, counted from the start of the
    /// object.
    fn seek(&mut self, offset: u64) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The implementation behind [WriteChannel][crate::write_channel::WriteChannel].
pub trait WriteChannel: std::fmt::Debug + Send {
    /// Appends `data` to the upload.
    fn write(&mut self, data: bytes::Bytes) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Finalizes the upload and returns the new object.
    fn close(&mut self) -> impl std::future::Future<Output = Result<Object>> + Send;
}

pub(crate) mod dynamic {
    use super::*;

    /// A dyn-compatible, crate-private version of [super::Storage].
    #[async_trait::async_trait]
    pub trait Storage: std::fmt::Debug + Send + Sync {
        async fn get(&self, id: ObjectId, options: Vec<GetOption>) -> Result<Option<Object>>;
        async fn update(&self, object: Object, options: Vec<TargetOption>) -> Result<Object>;
        async fn delete(&self, id: ObjectId, options: Vec<SourceOption>) -> Result<bool>;
        async fn rewrite(
            &self,
            request: CopyRequest,
            rewrite_token: Option<String>,
        ) -> Result<RewriteProgress>;
        async fn read_all_bytes(
            &self,
            id: ObjectId,
            options: Vec<SourceOption>,
        ) -> Result<bytes::Bytes>;
        async fn reader(
            &self,
            id: ObjectId,
            options: Vec<SourceOption>,
        ) -> Result<ReadChannelHandle>;
        async fn writer(
            &self,
            object: Object,
            options: Vec<WriteOption>,
        ) -> Result<WriteChannelHandle>;
        fn default_signer(&self) -> Option<Signer>;
    }

    /// All implementations of [super::Storage] also implement [Storage].
    #[async_trait::async_trait]
    impl<T: super::Storage> Storage for T {
        async fn get(&self, id: ObjectId, options: Vec<GetOption>) -> Result<Option<Object>> {
            T::get(self, id, options).await
        }

        async fn update(&self, object: Object, options: Vec<TargetOption>) -> Result<Object> {
            T::update(self, object, options).await
        }

        async fn delete(&self, id: ObjectId, options: Vec<SourceOption>) -> Result<bool> {
            T::delete(self, id, options).await
        }

        async fn rewrite(
            &self,
            request: CopyRequest,
            rewrite_token: Option<String>,
        ) -> Result<RewriteProgress> {
            T::rewrite(self, request, rewrite_token).await
        }

        async fn read_all_bytes(
            &self,
            id: ObjectId,
            options: Vec<SourceOption>,
        ) -> Result<bytes::Bytes> {
            T::read_all_bytes(self, id, options).await
        }

        async fn reader(
            &self,
            id: ObjectId,
            options: Vec<SourceOption>,
        ) -> Result<ReadChannelHandle> {
            T::reader(self, id, options).await
        }

        async fn writer(
            &self,
            object: Object,
            options: Vec<WriteOption>,
        ) -> Result<WriteChannelHandle> {
            T::writer(self, object, options).await
        }

        fn default_signer(&self) -> Option<Signer> {
            T::default_signer(self)
        }
    }

    /// A dyn-compatible, crate-private version of [super::ReadChannel].
    #[async_trait::async_trait]
    pub trait ReadChannel: std::fmt::Debug + Send {
        async fn next(&mut self) -> Option<Result<bytes::Bytes>>;
        async fn seek(&mut self, offset: u64) -> Result<()>;
    }

    #[async_trait::async_trait]
    impl<T: super::ReadChannel> ReadChannel for T {
        async fn next(&mut self) -> Option<Result<bytes::Bytes>> {
            T::next(self).await
        }

        async fn seek(&mut self, offset: u64) -> Result<()> {
            T::seek(self, offset).await
        }
    }

    /// A dyn-compatible, crate-private version of [super::WriteChannel].
    #[async_trait::async_trait]
    pub trait WriteChannel: std::fmt::Debug + Send {
        async fn write(&mut self, data: bytes::Bytes) -> Result<()>;
        async fn close(&mut self) -> Result<Object>;
    }

    #[async_trait::async_trait]
    impl<T: super::WriteChannel> WriteChannel for T {
        async fn write(&mut self, data: bytes::Bytes) -> Result<()> {
            T::write(self, data).await
        }

        async fn close(&mut self) -> Result<Object> {
            T::close(self).await
        }
    }
}

const UNIMPLEMENTED: &str = concat!(
    "to prevent breaking changes as the service gains new operations, the stub ",
    "traits provide default implementations of each method. The implementations ",
    "in this crate override all methods. The only expected context for this ",
    "error is test code mocking the storage service. If that is how you got ",
    "this error, verify that you have mocked all methods used in your test."
);

async fn unimplemented_stub<T: Send>() -> Result<T> {
    unimplemented!("{UNIMPLEMENTED}");
}
