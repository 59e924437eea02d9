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

//! Errors for the storage object handles.
//!
//! Most operations return [Error]. The handles do not translate errors: a
//! failure reported by the [stub][crate::stub::Storage] reaches the caller
//! unchanged. Signed URL creation has its own error type, [SigningError], as
//! it fails for reasons unrelated to the service.

pub mod rpc;

use rpc::{Code, Status};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The core error returned by the storage object handles.
///
/// # Example
/// ```
/// use google_cloud_storage_blob::Error;
/// use google_cloud_storage_blob::error::rpc::{Code, Status};
/// let error = Error::service(Status::default().set_code(Code::FailedPrecondition));
/// assert!(error.is_precondition_failed());
/// assert!(!error.is_not_found());
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

#[derive(Debug)]
enum ErrorKind {
    Service(Box<Status>),
    Io,
    Serialization,
    Deserialization,
    Other,
}

impl Error {
    /// Creates an error with the information returned by the service.
    ///
    /// # Example
    /// ```
    /// use google_cloud_storage_blob::Error;
    /// use google_cloud_storage_blob::error::rpc::{Code, Status};
    /// let status = Status::default().set_code(Code::NotFound).set_message("NOT FOUND");
    /// let error = Error::service(status.clone());
    /// assert_eq!(error.status(), Some(&status));
    /// ```
    pub fn service(status: Status) -> Self {
        Self {
            kind: ErrorKind::Service(Box::new(status)),
            source: None,
        }
    }

    /// The status returned by the service, if any.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// The service reported that the object (or its bucket) does not exist.
    ///
    /// The object handles report a missing object as `None` or `false` where
    /// that is meaningful, for example in [Blob::exists][crate::blob::Blob::exists].
    /// Operations that require the object to exist, such as
    /// [Blob::update][crate::blob::Blob::update], return this error instead.
    pub fn is_not_found(&self) -> bool {
        self.status().is_some_and(|s| s.code == Code::NotFound)
    }

    /// A generation or metageneration precondition did not hold.
    ///
    /// # Troubleshooting
    ///
    /// The object changed since the handle was fetched. Reload the handle and
    /// decide whether the operation still makes sense against the new version.
    pub fn is_precondition_failed(&self) -> bool {
        self.status()
            .is_some_and(|s| s.code == Code::FailedPrecondition)
    }

    /// Creates an error representing an I/O problem, typically in the
    /// transport used by the stub.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Io,
            source: Some(source.into()),
        }
    }

    /// The request could not be sent, or the response could not be received.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ErrorKind::Io)
    }

    /// Creates an error representing a serialization problem.
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// The request could not be serialized.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// Creates an error representing a deserialization problem.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response, or a persisted handle, could not be deserialized.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error that does not fit any other category.
    pub fn other<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Other,
            source: Some(source.into()),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Service(s), _) => write!(f, "the service reports an error: {s}"),
            (ErrorKind::Io, Some(e)) => write!(f, "an I/O problem in the transport: {e}"),
            (ErrorKind::Serialization, Some(e)) => {
                write!(f, "cannot serialize the request: {e}")
            }
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response: {e}")
            }
            (_, Some(e)) => write!(f, "{e}"),
            (_, None) => write!(f, "unknown error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Represents errors that can occur when converting to [KeyAes256] instances.
///
/// # Example:
/// ```
/// # use google_cloud_storage_blob::{options::KeyAes256, error::KeyAes256Error};
/// let invalid_key_bytes: &[u8] = b"too_short_key"; // Less than 32 bytes
/// let result = KeyAes256::new(invalid_key_bytes);
///
/// assert!(matches!(result, Err(KeyAes256Error::InvalidLength)));
/// ```
///
/// [KeyAes256]: crate::options::KeyAes256
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum KeyAes256Error {
    /// The provided key's length was not exactly 32 bytes.
    #[error("Key has an invalid length: expected 32 bytes.")]
    InvalidLength,
}

/// Signed URL creation errors.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::blob::Blob;
/// # async fn sample(blob: &Blob) -> anyhow::Result<()> {
/// use google_cloud_storage_blob::options::SignUrlOption;
/// use std::time::Duration;
/// match blob.sign_url(Duration::from_secs(600), vec![SignUrlOption::with_md5()]).await {
///     Ok(url) => println!("signed url: {url}"),
///     Err(e) if e.is_missing_signer() => println!("configure a signer first: {e}"),
///     Err(e) if e.is_invalid_parameter() => println!("bad request: {e}"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(()) }
/// ```
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct SigningError(SigningErrorKind);

impl SigningError {
    /// The signer failed to produce a signature.
    pub fn is_signing(&self) -> bool {
        matches!(self.0, SigningErrorKind::Signing(_))
    }

    /// An option, or the object, does not have the fields the signed URL
    /// requires.
    ///
    /// These errors are detected before any signer is contacted.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self.0, SigningErrorKind::InvalidParameter(_, _))
    }

    /// No signer was supplied, configured in the client, or available from
    /// the default credentials.
    ///
    /// # Troubleshooting
    ///
    /// Pass [SignUrlOption::sign_with][crate::options::SignUrlOption::sign_with],
    /// or configure the client with
    /// [ClientBuilder::with_signer][crate::client::ClientBuilder::with_signer].
    pub fn is_missing_signer(&self) -> bool {
        matches!(self.0, SigningErrorKind::MissingSigner)
    }

    /// Creates an error for a failed signing operation.
    ///
    /// [SigningProvider][crate::signer::SigningProvider] implementations use
    /// this to report their failures.
    pub fn signing<T>(source: T) -> SigningError
    where
        T: Into<BoxError>,
    {
        SigningError(SigningErrorKind::Signing(source.into()))
    }

    /// A problem to sign the URL due to invalid input.
    pub(crate) fn invalid_parameter<S: Into<String>, T>(field: S, source: T) -> SigningError
    where
        T: Into<BoxError>,
    {
        SigningError(SigningErrorKind::InvalidParameter(
            field.into(),
            source.into(),
        ))
    }

    pub(crate) fn missing_signer() -> SigningError {
        SigningError(SigningErrorKind::MissingSigner)
    }
}

#[derive(thiserror::Error, Debug)]
enum SigningErrorKind {
    /// The signing operation failed.
    #[error("signing failed: {0}")]
    Signing(#[source] BoxError),

    /// An invalid input was provided to generate a signed URL.
    #[error("invalid `{0}` parameter: {1}")]
    InvalidParameter(String, #[source] BoxError),

    /// There is no signer to use.
    #[error("signing key was not provided and could not be derived")]
    MissingSigner,
}
