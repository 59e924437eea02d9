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

use crate::error::SigningError;
use crate::signer::Signer;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use url::form_urlencoded;

const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// V4 signed URLs expire after at most 7 days.
pub(crate) const MAX_EXPIRATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub(crate) const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Builds a V4 signed URL for one object.
#[derive(Debug)]
pub(crate) struct SignedUrlBuilder {
    bucket: String,
    object: String,
    method: http::Method,
    expiration: Duration,
    headers: BTreeMap<String, String>,
    query_parameters: BTreeMap<String, String>,
    endpoint: String,
    timestamp: Option<DateTime<Utc>>,
}

impl SignedUrlBuilder {
    pub fn new<B, O>(bucket: B, object: O) -> Self
    where
        B: Into<String>,
        O: Into<String>,
    {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            method: http::Method::GET,
            expiration: MAX_EXPIRATION,
            headers: BTreeMap::new(),
            query_parameters: BTreeMap::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timestamp: None,
        }
    }

    pub fn with_method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Adds a header the request must include. Header names are case
    /// insensitive and stored in lowercase.
    pub fn with_header<K: AsRef<str>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into().trim().to_string());
        self
    }

    pub fn with_query_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Fixes the signing time, the current time is used otherwise.
    #[cfg(test)]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Checks the arguments, the same checks run in [sign_with][Self::sign_with].
    pub fn validate(&self) -> Result<url::Url, SigningError> {
        if self.expiration > MAX_EXPIRATION {
            return Err(SigningError::invalid_parameter(
                "expiration",
                format!(
                    "the expiration ({}s) exceeds the maximum of {}s",
                    self.expiration.as_secs(),
                    MAX_EXPIRATION.as_secs()
                ),
            ));
        }
        let endpoint = url::Url::parse(&self.endpoint)
            .map_err(|e| SigningError::invalid_parameter("endpoint", e))?;
        if endpoint.host_str().is_none() {
            return Err(SigningError::invalid_parameter(
                "endpoint",
                format!("the endpoint ({}) has no host", self.endpoint),
            ));
        }
        Ok(endpoint)
    }

    /// Generates the signed URL using the provided signer.
    pub async fn sign_with(self, signer: &Signer) -> Result<url::Url, SigningError> {
        let endpoint = self.validate()?;
        // validate() rejects endpoints without a host.
        let endpoint_host = endpoint.host_str().unwrap_or_default();
        let host = format!("{}.{}", self.bucket, endpoint_host);

        let now = self.timestamp.unwrap_or_else(Utc::now);
        let request_timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let datestamp = now.format("%Y%m%d");
        let credential_scope = format!("{datestamp}/auto/storage/goog4_request");
        let client_email = signer.client_email().await?;
        let credential = format!("{client_email}/{credential_scope}");

        let mut headers = self.headers;
        headers.insert("host".to_string(), host.clone());
        let signed_headers = headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");

        let mut query_parameters = self.query_parameters;
        query_parameters.insert("X-Goog-Algorithm".to_string(), ALGORITHM.to_string());
        query_parameters.insert("X-Goog-Credential".to_string(), credential);
        query_parameters.insert("X-Goog-Date".to_string(), request_timestamp.clone());
        query_parameters.insert(
            "X-Goog-Expires".to_string(),
            self.expiration.as_secs().to_string(),
        );
        query_parameters.insert("X-Goog-SignedHeaders".to_string(), signed_headers.clone());

        let canonical_uri = format!("/{}", utf8_percent_encode(&self.object, PATH_ENCODE_SET));
        let canonical_query_string = canonical_query(&query_parameters);
        let canonical_request = canonical_request(
            &self.method,
            &canonical_uri,
            &canonical_query_string,
            &headers,
            &signed_headers,
        );
        let string_to_sign = [
            ALGORITHM.to_string(),
            request_timestamp,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes())),
        ]
        .join("\n");

        let signature = signer.sign(string_to_sign.as_bytes()).await?;

        let signed_url = format!(
            "{}://{}{}?{}&X-Goog-Signature={}",
            endpoint.scheme(),
            host,
            canonical_uri,
            canonical_query_string,
            signature
        );
        url::Url::parse(&signed_url).map_err(|e| SigningError::invalid_parameter("endpoint", e))
    }
}

fn canonical_query(parameters: &BTreeMap<String, String>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    parameters.iter().for_each(|(k, v)| {
        serializer.append_pair(k, v);
    });
    serializer.finish()
}

fn canonical_request(
    method: &http::Method,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &BTreeMap<String, String>,
    signed_headers: &str,
) -> String {
    let canonical_headers = headers
        .iter()
        .fold(String::new(), |acc, (k, v)| format!("{acc}{k}:{v}\n"));
    [
        method.as_str(),
        canonical_uri,
        canonical_query,
        &canonical_headers,
        signed_headers,
        "UNSIGNED-PAYLOAD",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::SigningProvider;
    use std::sync::{Arc, Mutex};

    type TestResult = anyhow::Result<()>;

    #[derive(Debug, Default)]
    struct RecordingSigner {
        signed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl SigningProvider for RecordingSigner {
        async fn client_email(&self) -> crate::signer::Result<String> {
            Ok("test@example.com".to_string())
        }

        async fn sign(&self, content: &[u8]) -> crate::signer::Result<String> {
            self.signed
                .lock()
                .expect("never poisoned")
                .push(String::from_utf8_lossy(content).to_string());
            Ok("deadbeef".to_string())
        }
    }

    fn timestamp() -> DateTime<Utc> {
        "2025-06-01T12:30:00Z".parse().expect("valid timestamp")
    }

    #[tokio::test]
    async fn signed_url_generation() -> TestResult {
        let signer = Signer::from(RecordingSigner::default());
        let url = SignedUrlBuilder::new("test-bucket", "test-object")
            .with_method(http::Method::PUT)
            .with_expiration(Duration::from_secs(3600))
            .with_header("X-Goog-Meta-Test", "value")
            .with_timestamp(timestamp())
            .sign_with(&signer)
            .await?;

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("test-bucket.storage.googleapis.com"));
        assert_eq!(url.path(), "/test-object");
        let query: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("X-Goog-Signature").map(String::as_str), Some("deadbeef"));
        assert_eq!(
            query.get("X-Goog-Algorithm").map(String::as_str),
            Some(ALGORITHM)
        );
        assert_eq!(
            query.get("X-Goog-Credential").map(String::as_str),
            Some("test@example.com/20250601/auto/storage/goog4_request")
        );
        assert_eq!(
            query.get("X-Goog-Date").map(String::as_str),
            Some("20250601T123000Z")
        );
        assert_eq!(query.get("X-Goog-Expires").map(String::as_str), Some("3600"));
        assert_eq!(
            query.get("X-Goog-SignedHeaders").map(String::as_str),
            Some("host;x-goog-meta-test")
        );
        Ok(())
    }

    #[tokio::test]
    async fn string_to_sign() -> TestResult {
        let recorder = RecordingSigner::default();
        let signed = recorder.signed.clone();
        let signer = Signer::from(recorder);
        let _ = SignedUrlBuilder::new("b", "o")
            .with_expiration(Duration::from_secs(60))
            .with_timestamp(timestamp())
            .sign_with(&signer)
            .await?;

        let mut query = BTreeMap::new();
        query.insert("X-Goog-Algorithm".to_string(), ALGORITHM.to_string());
        query.insert(
            "X-Goog-Credential".to_string(),
            "test@example.com/20250601/auto/storage/goog4_request".to_string(),
        );
        query.insert("X-Goog-Date".to_string(), "20250601T123000Z".to_string());
        query.insert("X-Goog-Expires".to_string(), "60".to_string());
        query.insert("X-Goog-SignedHeaders".to_string(), "host".to_string());
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "b.storage.googleapis.com".to_string());
        let request = canonical_request(
            &http::Method::GET,
            "/o",
            &canonical_query(&query),
            &headers,
            "host",
        );
        let want = [
            ALGORITHM.to_string(),
            "20250601T123000Z".to_string(),
            "20250601/auto/storage/goog4_request".to_string(),
            hex::encode(Sha256::digest(request.as_bytes())),
        ]
        .join("\n");

        let got = signed.lock().expect("never poisoned").clone();
        assert_eq!(got, vec![want]);
        Ok(())
    }

    #[test]
    fn canonical_request_format() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        headers.insert("host".to_string(), "b.example.com".to_string());
        let got = canonical_request(
            &http::Method::PUT,
            "/o",
            "a=1&b=2",
            &headers,
            "content-type;host",
        );
        let want = "PUT\n/o\na=1&b=2\ncontent-type:text/plain\nhost:b.example.com\n\ncontent-type;host\nUNSIGNED-PAYLOAD";
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn escaping() -> TestResult {
        let signer = Signer::from(RecordingSigner::default());
        let url = SignedUrlBuilder::new("test-bucket", "folder/test object.txt")
            .with_header("content-type", "text/plain")
            .sign_with(&signer)
            .await?;
        assert_eq!(url.path(), "/folder/test%20object.txt");
        Ok(())
    }

    #[tokio::test]
    async fn query_parameters_are_signed() -> TestResult {
        let signer = Signer::from(RecordingSigner::default());
        let url = SignedUrlBuilder::new("b", "o")
            .with_query_param("generation", "7")
            .with_endpoint("http://localhost:8080")
            .sign_with(&signer)
            .await?;
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("b.localhost"));
        assert!(url.query_pairs().any(|(k, v)| k == "generation" && v == "7"), "{url}");
        Ok(())
    }

    #[tokio::test]
    async fn signing_error() {
        #[derive(Debug)]
        struct FailSigner;
        #[async_trait::async_trait]
        impl SigningProvider for FailSigner {
            async fn client_email(&self) -> crate::signer::Result<String> {
                Ok("test@example.com".to_string())
            }
            async fn sign(&self, _content: &[u8]) -> crate::signer::Result<String> {
                Err(SigningError::signing("test"))
            }
        }
        let signer = Signer::from(FailSigner);
        let err = SignedUrlBuilder::new("b", "o")
            .sign_with(&signer)
            .await
            .unwrap_err();
        assert!(err.is_signing(), "{err:?}");
    }

    #[tokio::test]
    async fn invalid_endpoint() {
        let signer = Signer::from(RecordingSigner::default());
        let err = SignedUrlBuilder::new("b", "o")
            .with_endpoint("invalid-url")
            .sign_with(&signer)
            .await
            .unwrap_err();
        assert!(err.is_invalid_parameter(), "{err:?}");
    }

    #[test]
    fn expiration_limit() {
        let builder = SignedUrlBuilder::new("b", "o").with_expiration(MAX_EXPIRATION);
        assert!(builder.validate().is_ok());
        let builder = SignedUrlBuilder::new("b", "o")
            .with_expiration(MAX_EXPIRATION + Duration::from_secs(1));
        let err = builder.validate().unwrap_err();
        assert!(err.is_invalid_parameter(), "{err:?}");
    }
}
