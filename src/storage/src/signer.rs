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

//! Signers for [signed URLs][crate::blob::Blob::sign_url].
//!
//! Applications rarely implement [SigningProvider] directly. The credentials
//! libraries provide signers backed by service account keys or by the IAM
//! `signBlob` API, and wrap them in a [Signer].

use crate::error::SigningError;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, SigningError>;

/// A shared, type-erased [SigningProvider].
#[derive(Clone, Debug)]
pub struct Signer {
    pub(crate) inner: Arc<dyn dynamic::SigningProvider>,
}

impl<T> std::convert::From<T> for Signer
where
    T: SigningProvider + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl Signer {
    /// The account used to sign, e.g. `sa@my-project.iam.gserviceaccount.com`.
    pub async fn client_email(&self) -> Result<String> {
        self.inner.client_email().await
    }

    /// Signs `content` and returns the hex encoded signature.
    pub async fn sign(&self, content: &[u8]) -> Result<String> {
        self.inner.sign(content).await
    }
}

/// Creates `GOOG4-RSA-SHA256` signatures.
#[async_trait::async_trait]
pub trait SigningProvider: Send + Sync + std::fmt::Debug {
    /// The authorizer of the signed URL, typically a service account email.
    async fn client_email(&self) -> Result<String>;

    /// Signs `content` with RSA-SHA256 and returns the hex encoded signature.
    async fn sign(&self, content: &[u8]) -> Result<String>;
}

pub(crate) mod dynamic {
    use super::Result;

    /// A dyn-compatible, crate-private version of `SigningProvider`.
    #[async_trait::async_trait]
    pub trait SigningProvider: Send + Sync + std::fmt::Debug {
        async fn client_email(&self) -> Result<String>;
        async fn sign(&self, content: &[u8]) -> Result<String>;
    }

    /// All implementations of [super::SigningProvider] implement this trait.
    #[async_trait::async_trait]
    impl<T> SigningProvider for T
    where
        T: super::SigningProvider + Send + Sync,
    {
        async fn client_email(&self) -> Result<String> {
            T::client_email(self).await
        }

        async fn sign(&self, content: &[u8]) -> Result<String> {
            T::sign(self, content).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedSigner;

    #[async_trait::async_trait]
    impl SigningProvider for FixedSigner {
        async fn client_email(&self) -> Result<String> {
            Ok("test@example.com".to_string())
        }

        async fn sign(&self, content: &[u8]) -> Result<String> {
            Ok(hex::encode(content))
        }
    }

    #[derive(Debug)]
    struct FailSigner;

    #[async_trait::async_trait]
    impl SigningProvider for FailSigner {
        async fn client_email(&self) -> Result<String> {
            Err(SigningError::signing("no email"))
        }

        async fn sign(&self, _content: &[u8]) -> Result<String> {
            Err(SigningError::signing("no key"))
        }
    }

    #[tokio::test]
    async fn delegates() -> anyhow::Result<()> {
        let signer = Signer::from(FixedSigner);
        assert_eq!(signer.client_email().await?, "test@example.com");
        assert_eq!(signer.sign(b"abc").await?, "616263");
        let clone = signer.clone();
        assert_eq!(clone.sign(b"abc").await?, "616263");
        Ok(())
    }

    #[tokio::test]
    async fn errors() {
        let signer = Signer::from(FailSigner);
        let err = signer.client_email().await.unwrap_err();
        assert!(err.is_signing(), "{err:?}");
        let err = signer.sign(b"abc").await.unwrap_err();
        assert!(err.is_signing(), "{err:?}");
    }

    #[test]
    fn traits() {
        static_assertions::assert_impl_all!(Signer: Clone, Send, Sync, std::fmt::Debug);
    }
}
