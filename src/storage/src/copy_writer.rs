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

use crate::blob::Blob;
use crate::client::Storage;
use crate::model::{CopyRequest, RewriteProgress};
use crate::{Error, Result};

/// Tracks a copy that may need multiple round trips.
///
/// The service copies large objects (or objects crossing locations and storage
/// classes) in chunks. Each call to [copy_chunk][CopyWriter::copy_chunk]
/// continues the copy where the previous round trip stopped.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::blob::Blob;
/// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
/// let mut writer = blob.copy_to_bucket("backup-bucket", &[]).await?;
/// while !writer.is_done() {
///     writer.copy_chunk().await?;
///     println!("copied {} of {} bytes", writer.total_bytes_copied(), writer.blob_size());
/// }
/// let copy = writer.result().await?;
/// println!("copied to {}", copy.id());
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct CopyWriter {
    storage: Storage,
    request: CopyRequest,
    progress: RewriteProgress,
}

impl CopyWriter {
    pub(crate) fn new(storage: Storage, request: CopyRequest, progress: RewriteProgress) -> Self {
        Self {
            storage,
            request,
            progress,
        }
    }

    /// Performs one more round trip. Does nothing if the copy is done.
    pub async fn copy_chunk(&mut self) -> Result<()> {
        if self.progress.done {
            return Ok(());
        }
        let token = self.progress.rewrite_token.clone();
        self.progress = self.storage.rewrite(self.request.clone(), token).await?;
        tracing::debug!(
            total_bytes_rewritten = self.progress.total_bytes_rewritten,
            object_size = self.progress.object_size,
            done = self.progress.done,
            "copy progress"
        );
        Ok(())
    }

    /// Completes the copy and returns the new object.
    pub async fn result(mut self) -> Result<Blob> {
        while !self.progress.done {
            self.copy_chunk().await?;
        }
        let object = self.progress.resource.take().ok_or_else(|| {
            Error::other(format!(
                "the copy to gs://{}/{} finished without returning the new object",
                self.request.target.bucket, self.request.target.name
            ))
        })?;
        Ok(Blob::new(self.storage, object))
    }

    /// Returns `true` once the copy is finished.
    pub fn is_done(&self) -> bool {
        self.progress.done
    }

    pub fn total_bytes_copied(&self) -> u64 {
        self.progress.total_bytes_rewritten
    }

    /// The size of the source object.
    pub fn blob_size(&self) -> u64 {
        self.progress.object_size
    }

    /// The request driving this copy.
    pub fn request(&self) -> &CopyRequest {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::rpc::{Code, Status};
    use crate::model::{Object, ObjectId};

    mockall::mock! {
        #[derive(Debug)]
        Storage {}
        impl crate::stub::Storage for Storage {
            async fn rewrite(&self, request: CopyRequest, rewrite_token: Option<String>) -> Result<RewriteProgress>;
        }
    }

    fn request() -> CopyRequest {
        CopyRequest::new(ObjectId::new("src", "o"), ObjectId::new("dst", "o"))
    }

    fn in_progress(token: &str, copied: u64) -> RewriteProgress {
        RewriteProgress::new()
            .set_done(false)
            .set_rewrite_token(token)
            .set_total_bytes_rewritten(copied)
            .set_object_size(300)
    }

    #[tokio::test]
    async fn until_done() -> anyhow::Result<()> {
        let final_object = Object::new().set_bucket("dst").set_name("o").set_generation(1);

        let mut mock = MockStorage::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_rewrite()
            .withf(|_, token| token.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(in_progress("token1", 100)));
        mock.expect_rewrite()
            .withf(|_, token| token.as_deref() == Some("token1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(in_progress("token2", 200)));
        mock.expect_rewrite()
            .withf(|_, token| token.as_deref() == Some("token2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning({
                let obj = final_object.clone();
                move |_, _| {
                    Ok(RewriteProgress::new()
                        .set_done(true)
                        .set_total_bytes_rewritten(300)
                        .set_object_size(300)
                        .set_resource(obj.clone()))
                }
            });

        let client = Storage::from_stub(mock);
        let mut writer = client.copy(request()).await?;
        assert!(!writer.is_done());
        assert_eq!(writer.total_bytes_copied(), 100);
        assert_eq!(writer.blob_size(), 300);

        writer.copy_chunk().await?;
        assert!(!writer.is_done());
        assert_eq!(writer.total_bytes_copied(), 200);

        let blob = writer.result().await?;
        assert_eq!(blob.object(), &final_object);
        Ok(())
    }

    #[tokio::test]
    async fn copy_chunk_after_done() -> anyhow::Result<()> {
        let mut mock = MockStorage::new();
        mock.expect_rewrite().times(1).returning(|_, _| {
            Ok(RewriteProgress::new()
                .set_done(true)
                .set_resource(Object::new().set_bucket("dst").set_name("o")))
        });
        let client = Storage::from_stub(mock);
        let mut writer = client.copy(request()).await?;
        assert!(writer.is_done());
        // No more calls to the stub.
        writer.copy_chunk().await?;
        writer.copy_chunk().await?;
        let blob = writer.result().await?;
        assert_eq!(blob.id(), ObjectId::new("dst", "o"));
        Ok(())
    }

    #[tokio::test]
    async fn error_in_chunk() -> anyhow::Result<()> {
        let mut mock = MockStorage::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_rewrite()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(in_progress("token1", 100)));
        mock.expect_rewrite()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(Error::service(
                    Status::default().set_code(Code::FailedPrecondition),
                ))
            });
        let client = Storage::from_stub(mock);
        let writer = client.copy(request()).await?;
        let err = writer.result().await.unwrap_err();
        assert!(err.is_precondition_failed(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn done_without_resource() -> anyhow::Result<()> {
        let mut mock = MockStorage::new();
        mock.expect_rewrite()
            .returning(|_, _| Ok(RewriteProgress::new().set_done(true)));
        let client = Storage::from_stub(mock);
        let writer = client.copy(request()).await?;
        let err = writer.result().await.unwrap_err();
        assert!(err.to_string().contains("gs://dst/o"), "{err}");
        Ok(())
    }
}
