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

//! Request-level options accepted by the storage [stub][crate::stub::Storage].
//!
//! Each operation has its own option type. The preconditions in [GetOption]
//! and [SourceOption] carry concrete values, typically produced by resolving a
//! [Precondition][crate::precondition::Precondition] against a
//! [Blob][crate::blob::Blob]. The preconditions in [TargetOption] carry no
//! values: the stub takes them from the object it receives.

use crate::error::KeyAes256Error;
use crate::model::Object;
use crate::signer::Signer;
use crate::{Error, Result};
use base64::{Engine, prelude::BASE64_STANDARD};
use sha2::{Digest, Sha256};

/// Options for metadata reads.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum GetOption {
    /// Only return the object if its generation matches.
    IfGenerationMatch(i64),
    /// Only return the object if its generation does not match.
    IfGenerationNotMatch(i64),
    /// Only return the object if its metageneration matches.
    IfMetagenerationMatch(i64),
    /// Only return the object if its metageneration does not match.
    IfMetagenerationNotMatch(i64),
    /// Return only these fields in the response.
    Fields(Vec<ObjectField>),
    /// The key used to encrypt the object.
    DecryptionKey(KeyAes256),
}

impl GetOption {
    pub fn generation_match(v: i64) -> Self {
        Self::IfGenerationMatch(v)
    }

    pub fn generation_not_match(v: i64) -> Self {
        Self::IfGenerationNotMatch(v)
    }

    pub fn metageneration_match(v: i64) -> Self {
        Self::IfMetagenerationMatch(v)
    }

    pub fn metageneration_not_match(v: i64) -> Self {
        Self::IfMetagenerationNotMatch(v)
    }

    /// Request a partial response.
    ///
    /// The bucket and name are always returned.
    pub fn fields<T: IntoIterator<Item = ObjectField>>(v: T) -> Self {
        Self::Fields(v.into_iter().collect())
    }

    pub fn decryption_key(v: KeyAes256) -> Self {
        Self::DecryptionKey(v)
    }
}

/// Options for operations reading or deleting an existing object.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum SourceOption {
    /// Fail unless the object generation matches.
    IfGenerationMatch(i64),
    /// Fail unless the object generation does not match.
    IfGenerationNotMatch(i64),
    /// Fail unless the object metageneration matches.
    IfMetagenerationMatch(i64),
    /// Fail unless the object metageneration does not match.
    IfMetagenerationNotMatch(i64),
    /// The key used to encrypt the object.
    DecryptionKey(KeyAes256),
}

impl SourceOption {
    pub fn generation_match(v: i64) -> Self {
        Self::IfGenerationMatch(v)
    }

    pub fn generation_not_match(v: i64) -> Self {
        Self::IfGenerationNotMatch(v)
    }

    pub fn metageneration_match(v: i64) -> Self {
        Self::IfMetagenerationMatch(v)
    }

    pub fn metageneration_not_match(v: i64) -> Self {
        Self::IfMetagenerationNotMatch(v)
    }

    pub fn decryption_key(v: KeyAes256) -> Self {
        Self::DecryptionKey(v)
    }
}

/// Options for operations creating or updating an object.
///
/// The generation and metageneration preconditions refer to the object sent
/// with the request. For example, in an update,
/// [TargetOption::MetagenerationMatch] means "only if the metadata did not
/// change since this object was fetched".
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum TargetOption {
    /// Apply a predefined set of access controls, e.g. `publicRead`.
    PredefinedAcl(String),
    /// Fail if the object already exists.
    DoesNotExist,
    /// Fail unless the object generation matches the request's object.
    GenerationMatch,
    /// Fail if the object generation matches the request's object.
    GenerationNotMatch,
    /// Fail unless the object metageneration matches the request's object.
    MetagenerationMatch,
    /// Fail if the object metageneration matches the request's object.
    MetagenerationNotMatch,
    /// Encrypt the object with a customer-supplied key.
    EncryptionKey(KeyAes256),
}

impl TargetOption {
    pub fn predefined_acl<T: Into<String>>(v: T) -> Self {
        Self::PredefinedAcl(v.into())
    }

    pub fn does_not_exist() -> Self {
        Self::DoesNotExist
    }

    pub fn generation_match() -> Self {
        Self::GenerationMatch
    }

    pub fn generation_not_match() -> Self {
        Self::GenerationNotMatch
    }

    pub fn metageneration_match() -> Self {
        Self::MetagenerationMatch
    }

    pub fn metageneration_not_match() -> Self {
        Self::MetagenerationNotMatch
    }

    pub fn encryption_key(v: KeyAes256) -> Self {
        Self::EncryptionKey(v)
    }
}

/// Options for streaming writes.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum WriteOption {
    /// Any of the create/update options.
    Target(TargetOption),
    /// Verify the uploaded data against the object's MD5 hash.
    ///
    /// The object must have an [MD5 hash][Object::md5_hash], the upload fails
    /// with `INVALID_ARGUMENT` otherwise.
    Md5Match,
    /// Verify the uploaded data against the object's CRC32C checksum.
    ///
    /// The object must have a [CRC32C checksum][Object::crc32c], the upload
    /// fails with `INVALID_ARGUMENT` otherwise.
    Crc32cMatch,
}

impl WriteOption {
    pub fn md5_match() -> Self {
        Self::Md5Match
    }

    pub fn crc32c_match() -> Self {
        Self::Crc32cMatch
    }
}

impl From<TargetOption> for WriteOption {
    fn from(value: TargetOption) -> Self {
        Self::Target(value)
    }
}

/// Options for [Blob::sign_url][crate::blob::Blob::sign_url].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SignUrlOption {
    /// The HTTP method allowed by the URL. The default is `GET`.
    HttpMethod(http::Method),
    /// Require the object's content type in the request.
    WithContentType,
    /// Require the object's MD5 hash in the request.
    WithMd5,
    /// Sign with this signer, ignoring any signer configured in the client.
    SignWith(Signer),
    /// The endpoint used in the URL, `https://storage.googleapis.com` by default.
    WithEndpoint(String),
    /// An extension header that must be present in the request.
    WithHeader(String, String),
    /// An additional query parameter included in the signature.
    WithQueryParameter(String, String),
}

impl SignUrlOption {
    pub fn http_method(v: http::Method) -> Self {
        Self::HttpMethod(v)
    }

    pub fn with_content_type() -> Self {
        Self::WithContentType
    }

    pub fn with_md5() -> Self {
        Self::WithMd5
    }

    pub fn sign_with<T: Into<Signer>>(v: T) -> Self {
        Self::SignWith(v.into())
    }

    pub fn with_endpoint<T: Into<String>>(v: T) -> Self {
        Self::WithEndpoint(v.into())
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(k: K, v: V) -> Self {
        Self::WithHeader(k.into(), v.into())
    }

    pub fn with_query_parameter<K: Into<String>, V: Into<String>>(k: K, v: V) -> Self {
        Self::WithQueryParameter(k.into(), v.into())
    }
}

/// The [Object] fields that can be selected in a partial response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ObjectField {
    Acl,
    Bucket,
    CacheControl,
    ComponentCount,
    ContentDisposition,
    ContentEncoding,
    ContentLanguage,
    ContentType,
    Crc32c,
    Etag,
    Generation,
    Id,
    MediaLink,
    Md5Hash,
    Metadata,
    Metageneration,
    Name,
    Owner,
    SelfLink,
    Size,
    TimeCreated,
    TimeDeleted,
    Updated,
}

impl ObjectField {
    /// The JSON API name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Acl => "acl",
            Self::Bucket => "bucket",
            Self::CacheControl => "cacheControl",
            Self::ComponentCount => "componentCount",
            Self::ContentDisposition => "contentDisposition",
            Self::ContentEncoding => "contentEncoding",
            Self::ContentLanguage => "contentLanguage",
            Self::ContentType => "contentType",
            Self::Crc32c => "crc32c",
            Self::Etag => "etag",
            Self::Generation => "generation",
            Self::Id => "id",
            Self::MediaLink => "mediaLink",
            Self::Md5Hash => "md5Hash",
            Self::Metadata => "metadata",
            Self::Metageneration => "metageneration",
            Self::Name => "name",
            Self::Owner => "owner",
            Self::SelfLink => "selfLink",
            Self::Size => "size",
            Self::TimeCreated => "timeCreated",
            Self::TimeDeleted => "timeDeleted",
            Self::Updated => "updated",
        }
    }

    /// Formats a `fields` query parameter. The bucket and name are always
    /// included.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_blob::options::ObjectField;
    /// let selector = ObjectField::selector(&[ObjectField::Generation]);
    /// assert_eq!(selector, "bucket,name,generation");
    /// ```
    pub fn selector(fields: &[ObjectField]) -> String {
        let mut names = vec![Self::Bucket.name(), Self::Name.name()];
        fields
            .iter()
            .map(|f| f.name())
            .filter(|n| *n != "bucket" && *n != "name")
            .for_each(|n| {
                if !names.contains(&n) {
                    names.push(n);
                }
            });
        names.join(",")
    }

    /// Returns a copy of `object` with only `fields` (and the bucket and
    /// name) set.
    pub fn project(object: &Object, fields: &[ObjectField]) -> Object {
        let mut projected = Object::new()
            .set_bucket(object.bucket.clone())
            .set_name(object.name.clone());
        for field in fields {
            match field {
                Self::Acl => projected.acl = object.acl.clone(),
                Self::Bucket | Self::Name => {}
                Self::CacheControl => projected.cache_control = object.cache_control.clone(),
                Self::ComponentCount => projected.component_count = object.component_count,
                Self::ContentDisposition => {
                    projected.content_disposition = object.content_disposition.clone()
                }
                Self::ContentEncoding => {
                    projected.content_encoding = object.content_encoding.clone()
                }
                Self::ContentLanguage => {
                    projected.content_language = object.content_language.clone()
                }
                Self::ContentType => projected.content_type = object.content_type.clone(),
                Self::Crc32c => projected.crc32c = object.crc32c,
                Self::Etag => projected.etag = object.etag.clone(),
                Self::Generation => projected.generation = object.generation,
                Self::Id => projected.generated_id = object.generated_id.clone(),
                Self::MediaLink => projected.media_link = object.media_link.clone(),
                Self::Md5Hash => projected.md5_hash = object.md5_hash.clone(),
                Self::Metadata => projected.metadata = object.metadata.clone(),
                Self::Metageneration => projected.metageneration = object.metageneration,
                Self::Owner => projected.owner = object.owner.clone(),
                Self::SelfLink => projected.self_link = object.self_link.clone(),
                Self::Size => projected.size = object.size,
                Self::TimeCreated => projected.create_time = object.create_time,
                Self::TimeDeleted => projected.delete_time = object.delete_time,
                Self::Updated => projected.update_time = object.update_time,
            }
        }
        projected
    }
}

/// The generation and metageneration conditions of a request.
///
/// Stub implementations use this type to fold a list of options into the
/// `ifGenerationMatch` (and similar) request parameters.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::options::{Conditions, SourceOption};
/// let conditions = Conditions::from_source_options(&[
///     SourceOption::generation_match(7),
///     SourceOption::metageneration_not_match(3),
/// ]);
/// assert_eq!(conditions.if_generation_match, Some(7));
/// assert_eq!(conditions.if_metageneration_not_match, Some(3));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Conditions {
    pub if_generation_match: Option<i64>,
    pub if_generation_not_match: Option<i64>,
    pub if_metageneration_match: Option<i64>,
    pub if_metageneration_not_match: Option<i64>,
}

impl Conditions {
    pub fn from_get_options(options: &[GetOption]) -> Self {
        options
            .iter()
            .fold(Self::default(), |mut conditions, option| {
                match option {
                    GetOption::IfGenerationMatch(v) => conditions.if_generation_match = Some(*v),
                    GetOption::IfGenerationNotMatch(v) => {
                        conditions.if_generation_not_match = Some(*v)
                    }
                    GetOption::IfMetagenerationMatch(v) => {
                        conditions.if_metageneration_match = Some(*v)
                    }
                    GetOption::IfMetagenerationNotMatch(v) => {
                        conditions.if_metageneration_not_match = Some(*v)
                    }
                    GetOption::Fields(_) | GetOption::DecryptionKey(_) => {}
                };
                conditions
            })
    }

    pub fn from_source_options(options: &[SourceOption]) -> Self {
        options
            .iter()
            .fold(Self::default(), |mut conditions, option| {
                match option {
                    SourceOption::IfGenerationMatch(v) => {
                        conditions.if_generation_match = Some(*v)
                    }
                    SourceOption::IfGenerationNotMatch(v) => {
                        conditions.if_generation_not_match = Some(*v)
                    }
                    SourceOption::IfMetagenerationMatch(v) => {
                        conditions.if_metageneration_match = Some(*v)
                    }
                    SourceOption::IfMetagenerationNotMatch(v) => {
                        conditions.if_metageneration_not_match = Some(*v)
                    }
                    SourceOption::DecryptionKey(_) => {}
                };
                conditions
            })
    }

    /// Folds the options of a create or update request.
    ///
    /// The generation and metageneration values are taken from `object`. It
    /// is an error to request a precondition on a field `object` does not
    /// have.
    pub fn from_target_options(object: &Object, options: &[TargetOption]) -> Result<Self> {
        let generation = || {
            object.generation.ok_or_else(|| {
                Error::other(format!(
                    "a generation precondition requires an object with a generation: {}",
                    object.id()
                ))
            })
        };
        let metageneration = || {
            object.metageneration.ok_or_else(|| {
                Error::other(format!(
                    "a metageneration precondition requires an object with a metageneration: {}",
                    object.id()
                ))
            })
        };
        let mut conditions = Self::default();
        for option in options {
            match option {
                TargetOption::DoesNotExist => conditions.if_generation_match = Some(0),
                TargetOption::GenerationMatch => {
                    conditions.if_generation_match = Some(generation()?)
                }
                TargetOption::GenerationNotMatch => {
                    conditions.if_generation_not_match = Some(generation()?)
                }
                TargetOption::MetagenerationMatch => {
                    conditions.if_metageneration_match = Some(metageneration()?)
                }
                TargetOption::MetagenerationNotMatch => {
                    conditions.if_metageneration_not_match = Some(metageneration()?)
                }
                TargetOption::PredefinedAcl(_) | TargetOption::EncryptionKey(_) => {}
            }
        }
        Ok(conditions)
    }

    /// Returns `true` if the conditions hold for `current`, the live version
    /// of an object.
    ///
    /// A `if_generation_match` of `0` means "the object does not exist", so
    /// it never holds for a live object.
    pub fn check(&self, current: &Object) -> bool {
        let holds = |want: Option<i64>, got: Option<i64>, matching: bool| match want {
            None => true,
            Some(w) => (got == Some(w)) == matching,
        };
        holds(self.if_generation_match, current.generation, true)
            && holds(self.if_generation_not_match, current.generation, false)
            && holds(self.if_metageneration_match, current.metageneration, true)
            && holds(self.if_metageneration_not_match, current.metageneration, false)
    }

    /// Returns `true` if the conditions hold when the object does not exist.
    pub fn check_absent(&self) -> bool {
        self.if_generation_match.is_none_or(|g| g == 0)
            && self.if_metageneration_match.is_none()
    }
}

/// KeyAes256 represents an AES-256 encryption key used with the
/// Customer-Supplied Encryption Keys (CSEK) feature.
///
/// This key must be exactly 32 bytes in length and should be provided in its
/// raw (unencoded) byte format.
///
/// # Examples
///
/// Creating a `KeyAes256` instance from a valid byte slice:
/// ```
/// # use google_cloud_storage_blob::{options::KeyAes256, error::KeyAes256Error};
/// let raw_key_bytes: [u8; 32] = [0x42; 32]; // Example 32-byte key
/// let key_aes_256 = KeyAes256::new(&raw_key_bytes)?;
/// # Ok::<(), KeyAes256Error>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct KeyAes256 {
    key: [u8; 32],
}

impl KeyAes256 {
    /// Attempts to create a new [KeyAes256].
    ///
    /// This conversion will succeed only if the input slice is exactly 32 bytes long.
    pub fn new(key: &[u8]) -> std::result::Result<Self, KeyAes256Error> {
        let key: [u8; 32] = key.try_into().map_err(|_| KeyAes256Error::InvalidLength)?;
        Ok(Self { key })
    }

    /// The base64 encoded SHA-256 hash of the key, as sent in the
    /// `x-goog-encryption-key-sha256` header.
    pub fn sha256_base64(&self) -> String {
        BASE64_STANDARD.encode(Sha256::digest(self.key))
    }
}

impl std::fmt::Display for KeyAes256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", BASE64_STANDARD.encode(self.key))
    }
}

// Do not leak the key material in logs.
impl std::fmt::Debug for KeyAes256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyAes256")
            .field("sha256", &self.sha256_base64())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    type Result = anyhow::Result<()>;

    #[test]
    fn key_aes_256() -> Result {
        let v_slice: &[u8] = &[b'c'; 32];
        KeyAes256::new(v_slice)?;

        let v_vec: Vec<u8> = vec![b'a'; 32];
        KeyAes256::new(&v_vec)?;

        let v_bytes = bytes::Bytes::copy_from_slice(&[b'a'; 32]);
        KeyAes256::new(&v_bytes)?;
        Ok(())
    }

    #[test_case(&[b'a'; 0]; "no bytes")]
    #[test_case(&[b'a'; 1]; "not enough bytes")]
    #[test_case(&[b'a'; 33]; "too many bytes")]
    fn key_aes_256_err(input: &[u8]) {
        KeyAes256::new(input).unwrap_err();
    }

    #[test]
    fn key_aes_256_display() -> Result {
        let key = vec![b'a'; 32];
        let key_aes_256 = KeyAes256::new(&key)?;
        assert_eq!(key_aes_256.to_string(), BASE64_STANDARD.encode(&key));
        assert_eq!(
            key_aes_256.sha256_base64(),
            BASE64_STANDARD.encode(Sha256::digest(&key))
        );
        let fmt = format!("{key_aes_256:?}");
        assert!(!fmt.contains(&key_aes_256.to_string()), "{fmt}");
        Ok(())
    }

    #[test]
    fn get_conditions() {
        let got = Conditions::from_get_options(&[
            GetOption::generation_match(1),
            GetOption::generation_not_match(2),
            GetOption::fields([ObjectField::Name]),
            GetOption::metageneration_match(3),
            GetOption::metageneration_not_match(4),
        ]);
        let want = Conditions {
            if_generation_match: Some(1),
            if_generation_not_match: Some(2),
            if_metageneration_match: Some(3),
            if_metageneration_not_match: Some(4),
        };
        assert_eq!(got, want);
    }

    #[test]
    fn source_conditions_last_wins() {
        let got = Conditions::from_source_options(&[
            SourceOption::generation_match(1),
            SourceOption::generation_match(5),
        ]);
        assert_eq!(got.if_generation_match, Some(5));
        assert_eq!(got.if_generation_not_match, None);
    }

    #[test]
    fn target_conditions() -> Result {
        let object = Object::new()
            .set_bucket("b")
            .set_name("o")
            .set_generation(7)
            .set_metageneration(3);
        let got = Conditions::from_target_options(
            &object,
            &[
                TargetOption::generation_match(),
                TargetOption::metageneration_not_match(),
                TargetOption::predefined_acl("publicRead"),
            ],
        )?;
        assert_eq!(got.if_generation_match, Some(7));
        assert_eq!(got.if_metageneration_not_match, Some(3));
        assert_eq!(got.if_generation_not_match, None);

        let got = Conditions::from_target_options(&object, &[TargetOption::does_not_exist()])?;
        assert_eq!(got.if_generation_match, Some(0));
        Ok(())
    }

    #[test]
    fn target_conditions_missing_generation() {
        let object = Object::new().set_bucket("b").set_name("o");
        let err = Conditions::from_target_options(&object, &[TargetOption::generation_match()])
            .unwrap_err();
        assert!(err.to_string().contains("gs://b/o"), "{err}");
        // Options that need no values still work.
        let got = Conditions::from_target_options(&object, &[TargetOption::does_not_exist()]);
        assert!(got.is_ok(), "{got:?}");
    }

    #[test_case(Conditions::default(), true)]
    #[test_case(Conditions { if_generation_match: Some(7), ..Default::default() }, true)]
    #[test_case(Conditions { if_generation_match: Some(8), ..Default::default() }, false)]
    #[test_case(Conditions { if_generation_match: Some(0), ..Default::default() }, false)]
    #[test_case(Conditions { if_generation_not_match: Some(7), ..Default::default() }, false)]
    #[test_case(Conditions { if_generation_not_match: Some(8), ..Default::default() }, true)]
    #[test_case(Conditions { if_metageneration_match: Some(3), ..Default::default() }, true)]
    #[test_case(Conditions { if_metageneration_match: Some(4), ..Default::default() }, false)]
    #[test_case(Conditions { if_metageneration_not_match: Some(3), ..Default::default() }, false)]
    #[test_case(Conditions { if_metageneration_not_match: Some(4), ..Default::default() }, true)]
    fn check(conditions: Conditions, want: bool) {
        let object = Object::new().set_generation(7).set_metageneration(3);
        assert_eq!(conditions.check(&object), want, "{conditions:?}");
    }

    #[test_case(Conditions::default(), true)]
    #[test_case(Conditions { if_generation_match: Some(0), ..Default::default() }, true)]
    #[test_case(Conditions { if_generation_match: Some(7), ..Default::default() }, false)]
    #[test_case(Conditions { if_metageneration_match: Some(1), ..Default::default() }, false)]
    fn check_absent(conditions: Conditions, want: bool) {
        assert_eq!(conditions.check_absent(), want, "{conditions:?}");
    }

    #[test]
    fn selector() {
        assert_eq!(ObjectField::selector(&[]), "bucket,name");
        assert_eq!(
            ObjectField::selector(&[
                ObjectField::Name,
                ObjectField::Generation,
                ObjectField::Metageneration,
                ObjectField::Generation,
            ]),
            "bucket,name,generation,metageneration"
        );
    }

    #[test]
    fn project() {
        let object = Object::new()
            .set_bucket("b")
            .set_name("o")
            .set_generation(7)
            .set_metageneration(3)
            .set_content_type("text/plain")
            .set_metadata([("k", "v")]);
        let got = ObjectField::project(&object, &[ObjectField::Generation]);
        let want = Object::new()
            .set_bucket("b")
            .set_name("o")
            .set_generation(7);
        assert_eq!(got, want);
    }

    #[test]
    fn write_option_from_target() {
        let got = WriteOption::from(TargetOption::does_not_exist());
        assert_eq!(got, WriteOption::Target(TargetOption::DoesNotExist));
    }
}
