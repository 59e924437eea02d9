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

use crate::model::Object;
use crate::stub::dynamic::WriteChannel as WriteChannelStub;
use crate::{Error, Result};

/// Uploads new contents for an object.
///
/// The object is only created when the channel is [closed][WriteChannel::close].
/// Dropping the channel without closing it abandons the upload and logs a
/// warning.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::blob::Blob;
/// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
/// let mut writer = blob.writer(&[]).await?;
/// writer.write("hello ").await?;
/// writer.write("world").await?;
/// let object = writer.close().await?;
/// println!("new generation: {:?}", object.generation);
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct WriteChannel {
    inner: Option<Box<dyn WriteChannelStub>>,
}

impl WriteChannel {
    /// Wraps a stub implementation.
    ///
    /// Use this function in [Storage::writer][crate::stub::Storage::writer]
    /// implementations.
    pub fn new<T>(inner: T) -> Self
    where
        T: crate::stub::WriteChannel + 'static,
    {
        Self {
            inner: Some(Box::new(inner)),
        }
    }

    /// Appends `data` to the upload.
    pub async fn write<T: Into<bytes::Bytes>>(&mut self, data: T) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.write(data.into()).await,
            None => Err(Error::other("the channel is closed")),
        }
    }

    /// Finalizes the upload and returns the new object.
    pub async fn close(mut self) -> Result<Object> {
        match self.inner.take() {
            Some(mut inner) => inner.close().await,
            None => Err(Error::other("the channel is closed")),
        }
    }
}

impl Drop for WriteChannel {
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::warn!("a WriteChannel was dropped without calling close(), the upload is abandoned");
        }
    }
}
