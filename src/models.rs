//! Typed records of the admin module.
//!
//! Fields mirror the API response keys. Unknown keys are dropped and missing
//! keys, and keys sent as `null`, take the field type's default value.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::request::{Endpoint, EndpointRequest};
use crate::tokens::ENDPOINT_NAME_TOKEN;
use serde::{Deserialize, Deserializer, Serialize};
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const IMAGE_MIME_TYPES: &[&str] = &["image/gif", "image/jpeg", "image/png", "image/jpg"];

/// Admin user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiAdminUser {
    /// User ID.
    #[serde(deserialize_with = "or_default")]
    pub id: u64,
    /// First name.
    #[serde(deserialize_with = "or_default")]
    pub firstname: String,
    /// Last name.
    #[serde(deserialize_with = "or_default")]
    pub lastname: String,
    /// Salutation as numeric code.
    pub title: Option<u8>,
    /// Email address.
    #[serde(deserialize_with = "or_default")]
    pub email: String,
    /// Soft deleted.
    #[serde(deserialize_with = "flag")]
    pub is_deleted: bool,
    /// Created for machine access.
    #[serde(deserialize_with = "flag")]
    pub is_api_user: bool,
    /// Unix timestamp of the last API call.
    pub api_last_activity: Option<i64>,
}

impl ApiAdminUser {
    /// First and last name separated by a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

impl Endpoint for ApiAdminUser {
    fn endpoint_name() -> &'static str {
        "admin/api-admin-user"
    }
}

/// A file in the storage system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiStorageFile {
    /// File ID.
    #[serde(deserialize_with = "or_default")]
    pub id: u64,
    /// Hidden from the file manager.
    #[serde(deserialize_with = "flag")]
    pub is_hidden: bool,
    /// Containing folder, 0 for the root.
    #[serde(deserialize_with = "or_default")]
    pub folder_id: u64,
    /// Name as uploaded.
    #[serde(deserialize_with = "or_default")]
    pub name_original: String,
    /// Normalized name.
    #[serde(deserialize_with = "or_default")]
    pub name_new: String,
    /// Name on disk.
    #[serde(deserialize_with = "or_default")]
    pub name_new_compound: String,
    /// MIME type, e.g. `image/png`.
    #[serde(deserialize_with = "or_default")]
    pub mime_type: String,
    /// File extension without dot.
    #[serde(deserialize_with = "or_default")]
    pub extension: String,
    /// Hash of the file content.
    #[serde(deserialize_with = "or_default")]
    pub hash_file: String,
    /// Hash of the file name.
    #[serde(deserialize_with = "or_default")]
    pub hash_name: String,
    /// Unix timestamp of the upload.
    pub upload_timestamp: Option<i64>,
    /// Size in bytes.
    #[serde(deserialize_with = "or_default")]
    pub file_size: u64,
    /// Uploading admin user.
    pub upload_user_id: Option<u64>,
    /// Soft deleted.
    #[serde(deserialize_with = "flag")]
    pub is_deleted: bool,
    /// Served through a proxy link.
    #[serde(deserialize_with = "flag")]
    pub passthrough_file: bool,
    /// Password for the proxy link.
    pub passthrough_file_password: Option<String>,
    /// Downloads through the proxy link.
    pub passthrough_file_stats: Option<u64>,
    /// Served with `Content-Disposition: inline`.
    #[serde(deserialize_with = "flag")]
    pub inline_disposition: bool,
    /// Absolute download URL (expand field).
    pub source: Option<String>,
    /// Caption in the current language.
    pub caption: Option<String>,
    /// Captions by language short code.
    #[serde(deserialize_with = "captions")]
    pub captions: BTreeMap<String, String>,
    /// Human readable size (expand field).
    #[serde(rename = "sizeReadable")]
    pub size_readable: Option<String>,
    /// Image flag computed by the server (expand field).
    #[serde(rename = "isImage")]
    pub is_image: Option<bool>,
    /// Uploading user (expand field).
    pub user: Option<ApiAdminUser>,
    /// Image versions of this file (expand field).
    #[serde(deserialize_with = "or_default")]
    pub images: Vec<ApiStorageImage>,
}

impl ApiStorageFile {
    /// Whether the MIME type is one of the common image types.
    pub fn is_image_file(&self) -> bool {
        IMAGE_MIME_TYPES.contains(&self.mime_type.as_str())
    }

    /// Create an image version of this file with the given filter applied.
    ///
    /// Non-success responses become [`Error::Api`].
    pub async fn create_image(&self, filter_id: u64, client: &Client) -> Result<ApiStorageImage> {
        ApiStorageImage::create(self.id, filter_id).one(client).await
    }
}

impl Endpoint for ApiStorageFile {
    fn endpoint_name() -> &'static str {
        "admin/api-admin-storage"
    }

    fn find() -> Result<EndpointRequest<Self>> {
        Err(Error::UnsupportedOperation(
            "listing storage files is not supported".into(),
        ))
    }

    fn view(id: impl fmt::Display) -> Result<EndpointRequest<Self>> {
        Ok(Self::request()
            .endpoint(format!("{ENDPOINT_NAME_TOKEN}/file"))
            .default_expand(["source"])
            .args([("id", Value::String(id.to_string()))]))
    }
}

/// A filtered version of a storage file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiStorageImage {
    /// Image ID.
    #[serde(deserialize_with = "or_default")]
    pub id: u64,
    /// Source file.
    #[serde(deserialize_with = "or_default")]
    pub file_id: u64,
    /// Applied filter, 0 for the original.
    #[serde(deserialize_with = "or_default")]
    pub filter_id: u64,
    /// Width in pixels.
    pub resolution_width: Option<u32>,
    /// Height in pixels.
    pub resolution_height: Option<u32>,
    /// Absolute URL of the image.
    pub source: Option<String>,
}

impl ApiStorageImage {
    /// Request that applies filter `filter_id` to file `file_id`.
    pub fn create(file_id: u64, filter_id: u64) -> EndpointRequest<Self> {
        Self::request()
            .method(Method::POST)
            .endpoint(format!("{ENDPOINT_NAME_TOKEN}/image-filter"))
            .args([("file_id", Value::from(file_id)), ("filter_id", Value::from(filter_id))])
            .required_args(["file_id", "filter_id"])
    }
}

impl Endpoint for ApiStorageImage {
    fn endpoint_name() -> &'static str {
        "admin/api-admin-storage"
    }

    fn find() -> Result<EndpointRequest<Self>> {
        Err(Error::UnsupportedOperation(
            "listing storage images is not supported".into(),
        ))
    }

    fn view(id: impl fmt::Display) -> Result<EndpointRequest<Self>> {
        Ok(Self::request()
            .endpoint(format!("{ENDPOINT_NAME_TOKEN}/image"))
            .default_expand(["source"])
            .args([("id", Value::String(id.to_string()))]))
    }
}

/// Treat `null` like a missing key.
fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Captions arrive as an object keyed by language, or as an empty list when
/// there are none.
fn captions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error> {
    let text = |value: Value| match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, text(v))).collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), text(v)))
            .collect()),
        other => Err(serde::de::Error::custom(format!("invalid captions {other}"))),
    }
}

/// Accept `true`/`false`, `0`/`1` and `"0"`/`"1"`; null is `false`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => match s.as_str() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(serde::de::Error::custom(format!("invalid flag '{other}'"))),
        },
        other => Err(serde::de::Error::custom(format!("invalid flag {other}"))),
    }
}
