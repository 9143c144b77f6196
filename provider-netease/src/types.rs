//! NetEase cloud drive API response types
//!
//! Data structures for deserializing the private cloud endpoints. Identity
//! fields are required; descriptive text may come back as `null`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code the API uses for success
pub const CODE_OK: i64 = 200;

fn default_code() -> i64 {
    CODE_OK
}

/// Accept an id sent either as a JSON string or as a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> de::Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or an integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(value)| value))
}

/// Cloud drive entry as returned by `api/v1/cloud/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateCloud {
    /// Song id within the owning account
    pub song_id: i64,

    /// File MD5, the content hash
    pub md5: String,

    #[serde(default)]
    pub song: Option<String>,

    #[serde(default)]
    pub artist: Option<String>,

    #[serde(default)]
    pub album: Option<String>,

    pub bitrate: u32,

    pub file_name: String,

    pub file_size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_time: Option<i64>,
}

/// One row of the listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudItem {
    pub private_cloud: PrivateCloud,

    /// Catalog metadata, unused
    #[serde(default)]
    pub simple_song: Option<serde_json::Value>,
}

/// `api/v1/cloud/get` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudListResponse {
    #[serde(default = "default_code")]
    pub code: i64,

    #[serde(default)]
    pub data: Vec<CloudItem>,

    /// Total number of items in the drive
    #[serde(default)]
    pub count: Option<u64>,

    #[serde(default)]
    pub has_more: Option<bool>,

    #[serde(default)]
    pub message: Option<String>,
}

/// `api/cloud/upload/check` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUploadResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub song_id: String,

    pub need_upload: bool,

    pub code: i64,

    #[serde(default)]
    pub resource_id: Option<i64>,
}

/// Upload slot inside the token allocation response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResult {
    pub bucket: String,

    pub token: String,

    #[serde(default)]
    pub outer_url: Option<String>,

    pub doc_id: String,

    pub object_key: String,

    pub resource_id: i64,
}

/// `api/nos/token/alloc` response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub code: i64,

    #[serde(default)]
    pub message: Option<String>,

    pub result: TokenResult,
}

/// Cloud entry echoed back by the metadata submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInfoPrivateCloud {
    pub song_id: i64,

    #[serde(default)]
    pub pc_id: Option<i64>,

    #[serde(default)]
    pub song_name: Option<String>,

    #[serde(default)]
    pub file_name: Option<String>,
}

/// `api/upload/cloud/info/v2` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInfoResponse {
    #[serde(default)]
    pub private_cloud: Option<UploadInfoPrivateCloud>,

    pub code: i64,

    #[serde(default)]
    pub exists: Option<bool>,

    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub song_id: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Cloud entry echoed back by the publish call
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPrivateCloud {
    pub song_id: i64,

    #[serde(default)]
    pub song_name: Option<String>,
}

/// `api/cloud/pub/v2` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    #[serde(default)]
    pub private_cloud: Option<PublishPrivateCloud>,

    pub code: i64,

    #[serde(default)]
    pub message: Option<String>,
}
