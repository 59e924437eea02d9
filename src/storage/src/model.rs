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

//! The messages exchanged with the storage [stub][crate::stub::Storage].
//!
//! [Object] mirrors the [JSON API object resource]: field names are camelCase,
//! 64-bit integers are encoded as decimal strings, the CRC32C checksum is a
//! base64 encoded big-endian `u32` and the MD5 hash is base64 encoded.
//!
//! [JSON API object resource]: https://cloud.google.com/storage/docs/json_api/v1/objects#resource

use crate::options::{SourceOption, TargetOption};
use base64::Engine as _;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Identifies an object: its bucket, its name, and optionally a generation.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::model::ObjectId;
/// let id = ObjectId::new("my-bucket", "my-object").with_generation(1234);
/// assert_eq!(id.to_string(), "gs://my-bucket/my-object#1234");
/// ```
#[serde_with::serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ObjectId {
    /// The bucket containing the object.
    pub bucket: String,

    /// The object name.
    pub name: String,

    /// A specific revision of the object. `None` refers to the live version.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    pub generation: Option<i64>,
}

impl ObjectId {
    pub fn new<B, N>(bucket: B, name: N) -> Self
    where
        B: Into<String>,
        N: Into<String>,
    {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            generation: None,
        }
    }

    /// Returns a copy of this id referring to `generation`.
    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.name)?;
        if let Some(g) = self.generation {
            write!(f, "#{g}")?;
        }
        Ok(())
    }
}

/// The metadata of an object.
///
/// The `generation`, `metageneration`, `size`, checksums, timestamps and
/// links are assigned by the service. Stub implementations populate them from
/// their responses. Applications receive `Object` values through
/// [Blob][crate::blob::Blob] and change only the mutable attributes, through
/// [BlobBuilder][crate::blob::BlobBuilder].
#[serde_with::serde_as]
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Object {
    /// The service-generated id, `{bucket}/{name}/{generation}`.
    #[serde(rename = "id", skip_serializing_if = "String::is_empty")]
    pub generated_id: String,

    /// The bucket containing the object.
    pub bucket: String,

    /// The object name.
    pub name: String,

    /// The content generation of this object. Used for object versioning.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    pub generation: Option<i64>,

    /// The version of the metadata for this generation of this object.
    ///
    /// A metageneration number is only meaningful in the context of a
    /// particular generation of a particular object.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    pub metageneration: Option<i64>,

    /// HTTP 1.1 entity tag for the object.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub etag: String,

    /// Content-Type of the object data, matching [RFC 7231 §3.1.1.5].
    ///
    /// [rfc 7231 §3.1.1.5]: https://tools.ietf.org/html/rfc7231#section-3.1.1.5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Content-Encoding of the object data, matching [RFC 7231 §3.1.2.2].
    ///
    /// [rfc 7231 §3.1.2.2]: https://tools.ietf.org/html/rfc7231#section-3.1.2.2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    /// Content-Disposition of the object data, matching [RFC 6266].
    ///
    /// [rfc 6266]: https://tools.ietf.org/html/rfc6266
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,

    /// Content-Language of the object data, matching [RFC 7231 §3.1.3.2].
    ///
    /// [rfc 7231 §3.1.3.2]: https://tools.ietf.org/html/rfc7231#section-3.1.3.2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,

    /// Cache-Control directive for the object data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,

    /// Content-Length of the object data in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    pub size: Option<u64>,

    /// Number of underlying components that make up a composite object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_count: Option<i32>,

    /// The CRC32C checksum of the object data.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<Crc32c>")]
    pub crc32c: Option<u32>,

    /// The MD5 hash of the object data.
    #[serde(rename = "md5Hash", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::base64::Base64>")]
    pub md5_hash: Option<bytes::Bytes>,

    /// User-provided metadata, in key/value pairs.
    ///
    /// In updates `None` leaves the service metadata unchanged, a non-empty
    /// map is merged into the service metadata, and an empty map removes all
    /// the keys. See [ObjectPatch].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,

    /// Access controls on the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<ObjectAccessControl>>,

    /// The owner of the object. This will always be the uploader of the
    /// object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,

    /// The creation time of the object.
    #[serde(rename = "timeCreated", skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,

    /// The modification time of the object metadata.
    #[serde(rename = "updated", skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,

    /// The deletion time of the object, only set for non-live generations.
    #[serde(rename = "timeDeleted", skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<DateTime<Utc>>,

    /// The link to this object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    /// The link to download the object data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,

    /// Set for the prefixes returned by listings with a delimiter.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_directory: bool,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity of this object, including its generation if known.
    pub fn id(&self) -> ObjectId {
        ObjectId {
            bucket: self.bucket.clone(),
            name: self.name.clone(),
            generation: self.generation,
        }
    }

    /// Sets the value of [bucket][Object::bucket].
    pub fn set_bucket<T: Into<String>>(mut self, v: T) -> Self {
        self.bucket = v.into();
        self
    }

    /// Sets the value of [name][Object::name].
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value of [generated_id][Object::generated_id].
    pub fn set_generated_id<T: Into<String>>(mut self, v: T) -> Self {
        self.generated_id = v.into();
        self
    }

    /// Sets the value of [generation][Object::generation].
    pub fn set_generation(mut self, v: i64) -> Self {
        self.generation = Some(v);
        self
    }

    /// Sets the value of [metageneration][Object::metageneration].
    pub fn set_metageneration(mut self, v: i64) -> Self {
        self.metageneration = Some(v);
        self
    }

    /// Sets the value of [etag][Object::etag].
    pub fn set_etag<T: Into<String>>(mut self, v: T) -> Self {
        self.etag = v.into();
        self
    }

    /// Sets the value of [content_type][Object::content_type].
    pub fn set_content_type<T: Into<String>>(mut self, v: T) -> Self {
        self.content_type = Some(v.into());
        self
    }

    /// Sets the value of [content_encoding][Object::content_encoding].
    pub fn set_content_encoding<T: Into<String>>(mut self, v: T) -> Self {
        self.content_encoding = Some(v.into());
        self
    }

    /// Sets the value of [content_disposition][Object::content_disposition].
    pub fn set_content_disposition<T: Into<String>>(mut self, v: T) -> Self {
        self.content_disposition = Some(v.into());
        self
    }

    /// Sets the value of [content_language][Object::content_language].
    pub fn set_content_language<T: Into<String>>(mut self, v: T) -> Self {
        self.content_language = Some(v.into());
        self
    }

    /// Sets the value of [cache_control][Object::cache_control].
    pub fn set_cache_control<T: Into<String>>(mut self, v: T) -> Self {
        self.cache_control = Some(v.into());
        self
    }

    /// Sets the value of [size][Object::size].
    pub fn set_size(mut self, v: u64) -> Self {
        self.size = Some(v);
        self
    }

    /// Sets the value of [component_count][Object::component_count].
    pub fn set_component_count(mut self, v: i32) -> Self {
        self.component_count = Some(v);
        self
    }

    /// Sets the value of [crc32c][Object::crc32c].
    pub fn set_crc32c(mut self, v: u32) -> Self {
        self.crc32c = Some(v);
        self
    }

    /// Sets the value of [md5_hash][Object::md5_hash].
    pub fn set_md5_hash<T: Into<bytes::Bytes>>(mut self, v: T) -> Self {
        self.md5_hash = Some(v.into());
        self
    }

    /// Sets the value of [metadata][Object::metadata].
    pub fn set_metadata<T, K, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata = Some(v.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Sets the value of [acl][Object::acl].
    pub fn set_acl<T, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = V>,
        V: Into<ObjectAccessControl>,
    {
        self.acl = Some(v.into_iter().map(|v| v.into()).collect());
        self
    }

    /// Sets the value of [owner][Object::owner].
    pub fn set_owner<T: Into<Owner>>(mut self, v: T) -> Self {
        self.owner = Some(v.into());
        self
    }

    /// Sets the value of [create_time][Object::create_time].
    pub fn set_create_time(mut self, v: DateTime<Utc>) -> Self {
        self.create_time = Some(v);
        self
    }

    /// Sets the value of [update_time][Object::update_time].
    pub fn set_update_time(mut self, v: DateTime<Utc>) -> Self {
        self.update_time = Some(v);
        self
    }

    /// Sets the value of [delete_time][Object::delete_time].
    pub fn set_delete_time(mut self, v: DateTime<Utc>) -> Self {
        self.delete_time = Some(v);
        self
    }

    /// Sets the value of [self_link][Object::self_link].
    pub fn set_self_link<T: Into<String>>(mut self, v: T) -> Self {
        self.self_link = Some(v.into());
        self
    }

    /// Sets the value of [media_link][Object::media_link].
    pub fn set_media_link<T: Into<String>>(mut self, v: T) -> Self {
        self.media_link = Some(v.into());
        self
    }

    /// Sets the value of [is_directory][Object::is_directory].
    pub fn set_is_directory(mut self, v: bool) -> Self {
        self.is_directory = v;
        self
    }
}

/// An access-control entry on an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ObjectAccessControl {
    /// The entity holding the permission, e.g. `user-liz@example.com`,
    /// `group-example@googlegroups.com` or `allUsers`.
    pub entity: String,

    /// The access permission for the entity, e.g. `READER` or `OWNER`.
    pub role: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub entity_id: String,
}

impl ObjectAccessControl {
    pub fn new<E, R>(entity: E, role: R) -> Self
    where
        E: Into<String>,
        R: Into<String>,
    {
        Self {
            entity: entity.into(),
            role: role.into(),
            ..Default::default()
        }
    }

    /// Sets the value of [email][ObjectAccessControl::email].
    pub fn set_email<T: Into<String>>(mut self, v: T) -> Self {
        self.email = v.into();
        self
    }

    /// Sets the value of [domain][ObjectAccessControl::domain].
    pub fn set_domain<T: Into<String>>(mut self, v: T) -> Self {
        self.domain = v.into();
        self
    }

    /// Sets the value of [entity_id][ObjectAccessControl::entity_id].
    pub fn set_entity_id<T: Into<String>>(mut self, v: T) -> Self {
        self.entity_id = v.into();
        self
    }
}

/// The owner of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Owner {
    /// The entity, in the form `user-`*userId*.
    pub entity: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub entity_id: String,
}

impl Owner {
    pub fn new<T: Into<String>>(entity: T) -> Self {
        Self {
            entity: entity.into(),
            entity_id: String::new(),
        }
    }

    /// Sets the value of [entity_id][Owner::entity_id].
    pub fn set_entity_id<T: Into<String>>(mut self, v: T) -> Self {
        self.entity_id = v.into();
        self
    }
}

/// The mutable attributes of an [Object], as sent in an update.
///
/// `None` fields are not part of the update and keep their current value in
/// the service. Metadata has three states:
///
/// * `None`: the service metadata is unchanged.
/// * a non-empty map: the keys are merged into the service metadata,
///   replacing existing values for the same keys.
/// * an empty map: all the service metadata keys are removed.
///
/// # Example
/// ```
/// # use google_cloud_storage_blob::model::{Object, ObjectPatch};
/// let object = Object::new().set_metadata([("k", "v")]);
/// let patch = ObjectPatch::from(&object);
/// assert_eq!(patch.to_json(), serde_json::json!({"metadata": {"k": "v"}}));
///
/// let cleared = Object::new().set_metadata(Vec::<(String, String)>::new());
/// let patch = ObjectPatch::from(&cleared);
/// assert_eq!(patch.to_json(), serde_json::json!({"metadata": null}));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ObjectPatch {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub acl: Option<Vec<ObjectAccessControl>>,
}

impl From<&Object> for ObjectPatch {
    fn from(value: &Object) -> Self {
        Self {
            content_type: value.content_type.clone(),
            content_encoding: value.content_encoding.clone(),
            content_disposition: value.content_disposition.clone(),
            content_language: value.content_language.clone(),
            cache_control: value.cache_control.clone(),
            metadata: value.metadata.clone(),
            acl: value.acl.clone(),
        }
    }
}

impl ObjectPatch {
    /// Renders the body of a JSON API `PATCH` request.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Map, Value};

        let mut fields = Map::new();
        [
            ("cacheControl", &self.cache_control),
            ("contentDisposition", &self.content_disposition),
            ("contentEncoding", &self.content_encoding),
            ("contentLanguage", &self.content_language),
            ("contentType", &self.content_type),
        ]
        .into_iter()
        .for_each(|(name, value)| {
            if let Some(v) = value {
                fields.insert(name.to_string(), Value::String(v.clone()));
            }
        });
        match &self.metadata {
            None => {}
            Some(m) if m.is_empty() => {
                fields.insert("metadata".to_string(), Value::Null);
            }
            Some(m) => {
                let map: Map<_, _> = m
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                fields.insert("metadata".to_string(), Value::Object(map));
            }
        }
        if let Some(acl) = &self.acl {
            let list = acl
                .iter()
                .map(|v| serde_json::json!({"entity": v.entity, "role": v.role}))
                .collect();
            fields.insert("acl".to_string(), Value::Array(list));
        }
        Value::Object(fields)
    }

    /// Applies the patch to `object`, the way the service does.
    ///
    /// Stub implementations backed by a local store use this to implement
    /// [update][crate::stub::Storage::update].
    pub fn apply(&self, object: &mut Object) {
        let overwrite = |field: &mut Option<String>, value: &Option<String>| {
            if value.is_some() {
                *field = value.clone();
            }
        };
        overwrite(&mut object.content_type, &self.content_type);
        overwrite(&mut object.content_encoding, &self.content_encoding);
        overwrite(&mut object.content_disposition, &self.content_disposition);
        overwrite(&mut object.content_language, &self.content_language);
        overwrite(&mut object.cache_control, &self.cache_control);
        match &self.metadata {
            None => {}
            Some(m) if m.is_empty() => object.metadata = None,
            Some(m) => {
                let current = object.metadata.get_or_insert_with(BTreeMap::new);
                current.extend(m.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        if let Some(acl) = &self.acl {
            object.acl = Some(acl.clone());
        }
    }
}

/// A request to copy an object, possibly across buckets.
///
/// Large objects are copied in multiple round trips, see
/// [CopyWriter][crate::copy_writer::CopyWriter].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct CopyRequest {
    /// The object to copy.
    pub source: ObjectId,

    /// Preconditions and keys for the source object.
    pub source_options: Vec<SourceOption>,

    /// The destination object. Only the bucket and name are required, any
    /// other mutable attributes replace those of the source.
    pub target: Object,

    /// Preconditions and keys for the destination object.
    pub target_options: Vec<TargetOption>,

    /// Limits how much data is copied in a single round trip.
    pub megabytes_copied_per_chunk: Option<i64>,
}

impl CopyRequest {
    pub fn new(source: ObjectId, target: ObjectId) -> Self {
        Self {
            source,
            source_options: Vec::new(),
            target: Object::new().set_bucket(target.bucket).set_name(target.name),
            target_options: Vec::new(),
            megabytes_copied_per_chunk: None,
        }
    }

    /// Sets the value of [source_options][CopyRequest::source_options].
    pub fn set_source_options<T: IntoIterator<Item = SourceOption>>(mut self, v: T) -> Self {
        self.source_options = v.into_iter().collect();
        self
    }

    /// Sets the value of [target][CopyRequest::target].
    pub fn set_target(mut self, v: Object) -> Self {
        self.target = v;
        self
    }

    /// Sets the value of [target_options][CopyRequest::target_options].
    pub fn set_target_options<T: IntoIterator<Item = TargetOption>>(mut self, v: T) -> Self {
        self.target_options = v.into_iter().collect();
        self
    }

    /// Sets the value of [megabytes_copied_per_chunk][CopyRequest::megabytes_copied_per_chunk].
    pub fn set_megabytes_copied_per_chunk(mut self, v: i64) -> Self {
        self.megabytes_copied_per_chunk = Some(v);
        self
    }
}

/// The state of a copy after one round trip.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct RewriteProgress {
    /// The total bytes copied so far.
    pub total_bytes_rewritten: u64,

    /// The size of the source object.
    pub object_size: u64,

    /// `true` once the copy is finished.
    pub done: bool,

    /// Continues the copy in the next round trip. Empty once `done`.
    pub rewrite_token: String,

    /// The destination object, only present once `done`.
    pub resource: Option<Object>,
}

impl RewriteProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [total_bytes_rewritten][RewriteProgress::total_bytes_rewritten].
    pub fn set_total_bytes_rewritten(mut self, v: u64) -> Self {
        self.total_bytes_rewritten = v;
        self
    }

    /// Sets the value of [object_size][RewriteProgress::object_size].
    pub fn set_object_size(mut self, v: u64) -> Self {
        self.object_size = v;
        self
    }

    /// Sets the value of [done][RewriteProgress::done].
    pub fn set_done(mut self, v: bool) -> Self {
        self.done = v;
        self
    }

    /// Sets the value of [rewrite_token][RewriteProgress::rewrite_token].
    pub fn set_rewrite_token<T: Into<String>>(mut self, v: T) -> Self {
        self.rewrite_token = v.into();
        self
    }

    /// Sets the value of [resource][RewriteProgress::resource].
    pub fn set_resource(mut self, v: Object) -> Self {
        self.resource = Some(v);
        self
    }
}

// CRC32c checksum is a unsigned 32-bit int encoded using base64 in big-endian byte order.
struct Crc32c;

impl serde_with::SerializeAs<u32> for Crc32c {
    fn serialize_as<S>(source: &u32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&BASE64_STANDARD.encode(source.to_be_bytes()))
    }
}

impl<'de> serde_with::DeserializeAs<'de, u32> for Crc32c {
    fn deserialize_as<D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct Crc32cVisitor;

        impl serde::de::Visitor<'_> for Crc32cVisitor {
            type Value = u32;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a base64 encoded string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let bytes = BASE64_STANDARD
                    .decode(value)
                    .map_err(serde::de::Error::custom)?;
                let bytes: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    serde::de::Error::invalid_length(bytes.len(), &"a Byte Vector of length 4.")
                })?;
                Ok(u32::from_be_bytes(bytes))
            }
        }

        deserializer.deserialize_str(Crc32cVisitor)
    }
}
