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

use crate::stub::dynamic::ReadChannel as ReadChannelStub;
use crate::{Error, Result};
use futures::Stream;

/// Reads the contents of an object incrementally.
///
/// The channel holds transport resources. Call [close][ReadChannel::close]
/// (or consume the channel with [all_bytes][ReadChannel::all_bytes]) when
/// done. Dropping an open channel releases the resources too, but logs a
/// warning.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::blob::Blob;
/// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
/// let mut reader = blob.reader(&[]).await?;
/// while let Some(chunk) = reader.next().await.transpose()? {
///     println!("received {} bytes", chunk.len());
/// }
/// reader.close();
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct ReadChannel {
    inner: Option<Box<dyn ReadChannelStub>>,
}

impl ReadChannel {
    /// Wraps a stub implementation.
    ///
    /// Use this function in [Storage::reader][crate::stub::Storage::reader]
    /// implementations.
    pub fn new<T>(inner: T) -> Self
    where
        T: crate::stub::ReadChannel + 'static,
    {
        Self {
            inner: Some(Box::new(inner)),
        }
    }

    /// Creates a channel returning `data` in chunks of at most `chunk_size`
    /// bytes.
    ///
    /// Useful to mock [Storage::reader][crate::stub::Storage::reader].
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::read_channel::ReadChannel;
    /// # tokio_test::block_on(async {
    /// let reader = ReadChannel::from_bytes("the quick brown fox", 4);
    /// let contents = reader.all_bytes().await?;
    /// assert_eq!(contents, "the quick brown fox");
    /// # Ok::<(), anyhow::Error>(()) });
    /// ```
    pub fn from_bytes<T: Into<bytes::Bytes>>(data: T, chunk_size: usize) -> Self {
        Self::new(BytesReadChannel::new(data.into(), chunk_size))
    }

    /// The next chunk of data, `None` at the end of the object.
    pub async fn next(&mut self) -> Option<Result<bytes::Bytes>> {
        match self.inner.as_mut() {
            Some(inner) => inner.next().await,
            None => Some(Err(closed())),
        }
    }

    /// Moves the read position to `offset`, counted from the start of the
    /// object.
    pub async fn seek(&mut self, offset: u64) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.seek(offset).await,
            None => Err(closed()),
        }
    }

    /// Reads the remaining data and closes the channel.
    pub async fn all_bytes(mut self) -> Result<bytes::Bytes> {
        let mut contents = Vec::new();
        while let Some(chunk) = self.next().await.transpose()? {
            contents.extend_from_slice(&chunk);
        }
        self.close();
        Ok(bytes::Bytes::from_owner(contents))
    }

    /// Releases the transport resources.
    pub fn close(mut self) {
        self.inner = None;
    }

    /// Converts the channel to a [Stream]. The channel is closed when the
    /// stream is exhausted.
    pub fn into_stream(self) -> impl Stream<Item = Result<bytes::Bytes>> + Unpin {
        use futures::stream::unfold;
        Box::pin(unfold(Some(self), move |state| async move {
            if let Some(mut this) = state {
                if let Some(chunk) = this.next().await {
                    return Some((chunk, Some(this)));
                }
                this.close();
            };
            None
        }))
    }
}

impl Drop for ReadChannel {
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::warn!("a ReadChannel was dropped without calling close()");
        }
    }
}

fn closed() -> Error {
    Error::other("the channel is closed")
}

/// Serves an in-memory buffer.
#[derive(Debug)]
pub(crate) struct BytesReadChannel {
    data: bytes::Bytes,
    offset: usize,
    chunk_size: usize,
}

impl BytesReadChannel {
    pub(crate) fn new(data: bytes::Bytes, chunk_size: usize) -> Self {
        Self {
            data,
            offset: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl crate::stub::ReadChannel for BytesReadChannel {
    async fn next(&mut self) -> Option<Result<bytes::Bytes>> {
        if self.offset >= self.data.len() {
            return None;
        }
        let end = self.data.len().min(self.offset + self.chunk_size);
        let chunk = self.data.slice(self.offset..end);
        self.offset = end;
        Some(Ok(chunk))
    }

    async fn seek(&mut self, offset: u64) -> Result<()> {
        let offset = usize::try_from(offset).map_err(Error::other)?;
        if offset > self.data.len() {
            return Err(Error::other(format!(
                "cannot seek to {offset}, the object has {} bytes",
                self.data.len()
            )));
        }
        self.offset = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    const LAZY: &str = "the quick brown fox jumps over the lazy dog";

    #[tokio::test]
    async fn chunks() -> anyhow::Result<()> {
        let mut reader = ReadChannel::from_bytes(LAZY, 10);
        let mut got = Vec::new();
        while let Some(chunk) = reader.next().await.transpose()? {
            assert!(chunk.len() <= 10, "{chunk:?}");
            got.push(chunk);
        }
        reader.close();
        assert_eq!(got.len(), 5);
        assert_eq!(got.concat(), LAZY.as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn seek() -> anyhow::Result<()> {
        let mut reader = ReadChannel::from_bytes(LAZY, 1024);
        reader.seek(4).await?;
        let contents = reader.all_bytes().await?;
        assert_eq!(contents, LAZY[4..]);
        Ok(())
    }

    #[tokio::test]
    async fn seek_to_end() -> anyhow::Result<()> {
        let mut reader = ReadChannel::from_bytes(LAZY, 1024);
        reader.seek(LAZY.len() as u64).await?;
        assert!(reader.next().await.is_none());
        let err = reader.seek(LAZY.len() as u64 + 1).await.unwrap_err();
        assert!(err.to_string().contains("cannot seek"), "{err}");
        reader.close();
        Ok(())
    }

    #[tokio::test]
    async fn stream() -> anyhow::Result<()> {
        let reader = ReadChannel::from_bytes(LAZY, 7);
        let chunks: Vec<bytes::Bytes> = reader.into_stream().try_collect().await?;
        assert_eq!(chunks.concat(), LAZY.as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn empty() -> anyhow::Result<()> {
        let contents = ReadChannel::from_bytes("", 7).all_bytes().await?;
        assert!(contents.is_empty(), "{contents:?}");
        Ok(())
    }

    #[test]
    fn traits() {
        static_assertions::assert_impl_all!(ReadChannel: Send, std::fmt::Debug);
    }
}
