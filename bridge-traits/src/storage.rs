//! Cloud Drive Abstractions
//!
//! Typed facade over a remote service's private cloud drive: a paginated
//! listing plus the four-step ingestion sequence (check upload, allocate
//! token, submit metadata, publish) used to materialize an item in an
//! account without transferring its bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Page size used by [`CloudDriveService::fetch_all_items`].
pub const LISTING_PAGE_SIZE: u32 = 100;

/// Application status code the remote service uses for success.
pub const SUCCESS_CODE: i64 = 200;

/// Extension assumed when a file name carries none.
const DEFAULT_EXTENSION: &str = "flac";

/// One row of a cloud drive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Content-addressed identity (MD5 of the file)
    pub content_hash: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub bitrate: u32,
    pub file_size_bytes: u64,
    pub file_name: String,
    /// Numeric id of the item in the account it was listed from
    pub remote_id: i64,
}

impl SongRecord {
    /// Text after the last `.` of the file name, `flac` when there is none.
    pub fn file_extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => DEFAULT_EXTENSION,
        }
    }
}

/// Answer of the upload check step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCheck {
    /// Song id the service associates with the content hash
    pub remote_song_id: String,
    /// `true` when the service does not already hold the bytes
    pub need_upload: bool,
}

/// Upload slot handed out by the token allocation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadToken {
    pub resource_id: i64,
    pub object_key: String,
    pub bucket: String,
}

/// Arguments of the metadata submission step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSubmission {
    pub bitrate: u32,
    pub content_hash: String,
    pub remote_song_id: String,
    pub file_name: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub resource_id: i64,
}

impl MetadataSubmission {
    pub fn for_song(song: &SongRecord, remote_song_id: &str, resource_id: i64) -> Self {
        Self {
            bitrate: song.bitrate,
            content_hash: song.content_hash.clone(),
            remote_song_id: remote_song_id.to_string(),
            file_name: song.file_name.clone(),
            title: song.title.clone(),
            album: song.album.clone(),
            artist: song.artist.clone(),
            resource_id,
        }
    }
}

/// Result of the metadata submission step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReceipt {
    pub status_code: i64,
    /// Final song id from the structured part of the answer
    pub resolved_song_id: Option<i64>,
    /// Loosely typed song id the service sometimes sends instead
    pub fallback_song_id: Option<String>,
    pub message: Option<String>,
}

impl MetadataReceipt {
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_CODE
    }

    /// Final song id to publish: the structured field first, then a parse of
    /// the fallback field. Zero is never a valid id.
    pub fn final_song_id(&self) -> Option<i64> {
        self.resolved_song_id.filter(|id| *id != 0).or_else(|| {
            self.fallback_song_id
                .as_deref()
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .filter(|id| *id != 0)
        })
    }
}

/// Result of the publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub status_code: i64,
    pub message: Option<String>,
}

impl PublishReceipt {
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_CODE
    }
}

/// Cloud drive service trait
///
/// One instance talks to one account. Implementations are expected to pace
/// their calls and retry transport faults themselves; status rejections come
/// back as [`BridgeError::HttpStatus`](crate::error::BridgeError::HttpStatus)
/// and malformed bodies as [`BridgeError::Decode`](crate::error::BridgeError::Decode).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::CloudDriveService;
///
/// async fn count(service: &dyn CloudDriveService) -> Result<usize> {
///     if !service.validate_credential().await? {
///         return Ok(0);
///     }
///     Ok(service.fetch_all_items().await?.len())
/// }
/// ```
#[async_trait]
pub trait CloudDriveService: Send + Sync {
    /// Fetch one page of the listing.
    async fn list_items(&self, offset: u32, limit: u32) -> Result<Vec<SongRecord>>;

    /// Fetch the whole listing, page by page, in listing order.
    ///
    /// A page shorter than the requested size marks the end.
    async fn fetch_all_items(&self) -> Result<Vec<SongRecord>> {
        let mut items = Vec::new();
        let mut offset = 0u32;

        loop {
            let page = self.list_items(offset, LISTING_PAGE_SIZE).await?;
            let fetched = page.len();
            items.extend(page);

            if fetched < LISTING_PAGE_SIZE as usize {
                break;
            }
            offset += LISTING_PAGE_SIZE;
        }

        Ok(items)
    }

    /// Check that the account credential is accepted.
    ///
    /// Returns `Ok(false)` on an authentication-class rejection; every other
    /// failure is propagated.
    async fn validate_credential(&self) -> Result<bool> {
        match self.list_items(0, 1).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_auth_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn check_upload_needed(
        &self,
        content_hash: &str,
        file_size_bytes: u64,
        bitrate: u32,
    ) -> Result<UploadCheck>;

    async fn allocate_upload_token(
        &self,
        content_hash: &str,
        file_name: &str,
        file_size_bytes: u64,
        bitrate: u32,
        extension: &str,
    ) -> Result<UploadToken>;

    async fn submit_metadata(&self, submission: &MetadataSubmission) -> Result<MetadataReceipt>;

    async fn publish(&self, song_id: i64) -> Result<PublishReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::sync::Mutex;

    fn song(index: usize) -> SongRecord {
        SongRecord {
            content_hash: format!("hash-{index}"),
            title: format!("Song {index}"),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            bitrate: 320,
            file_size_bytes: 1024,
            file_name: format!("song-{index}.mp3"),
            remote_id: index as i64,
        }
    }

    /// Serves a fixed listing and records the requested pages.
    struct PagedListing {
        total: usize,
        failure: Option<u16>,
        requests: Mutex<Vec<(u32, u32)>>,
    }

    impl PagedListing {
        fn new(total: usize) -> Self {
            Self {
                total,
                failure: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                failure: Some(status),
                ..Self::new(0)
            }
        }
    }

    #[async_trait]
    impl CloudDriveService for PagedListing {
        async fn list_items(&self, offset: u32, limit: u32) -> Result<Vec<SongRecord>> {
            self.requests.lock().unwrap().push((offset, limit));
            if let Some(status) = self.failure {
                return Err(BridgeError::HttpStatus {
                    status,
                    message: "rejected".to_string(),
                });
            }
            let start = (offset as usize).min(self.total);
            let end = (start + limit as usize).min(self.total);
            Ok((start..end).map(song).collect())
        }

        async fn check_upload_needed(&self, _: &str, _: u64, _: u32) -> Result<UploadCheck> {
            unimplemented!()
        }

        async fn allocate_upload_token(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: u32,
            _: &str,
        ) -> Result<UploadToken> {
            unimplemented!()
        }

        async fn submit_metadata(&self, _: &MetadataSubmission) -> Result<MetadataReceipt> {
            unimplemented!()
        }

        async fn publish(&self, _: i64) -> Result<PublishReceipt> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_fetch_all_items_stops_on_short_page() {
        let listing = PagedListing::new(250);
        let items = listing.fetch_all_items().await.unwrap();

        assert_eq!(items.len(), 250);
        assert_eq!(items[0].content_hash, "hash-0");
        assert_eq!(items[249].content_hash, "hash-249");
        assert_eq!(
            *listing.requests.lock().unwrap(),
            vec![(0, 100), (100, 100), (200, 100)]
        );
    }

    #[tokio::test]
    async fn test_fetch_all_items_exact_multiple_needs_empty_page() {
        let listing = PagedListing::new(200);
        let items = listing.fetch_all_items().await.unwrap();

        assert_eq!(items.len(), 200);
        assert_eq!(listing.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_validate_credential() {
        assert!(PagedListing::new(5).validate_credential().await.unwrap());
        assert!(!PagedListing::failing(401).validate_credential().await.unwrap());
        assert!(!PagedListing::failing(403).validate_credential().await.unwrap());

        let result = PagedListing::failing(500).validate_credential().await;
        assert!(matches!(
            result,
            Err(BridgeError::HttpStatus { status: 500, .. })
        ));
    }

    #[test]
    fn test_file_extension() {
        let mut record = song(1);
        assert_eq!(record.file_extension(), "mp3");

        record.file_name = "archive.tar.FLAC".to_string();
        assert_eq!(record.file_extension(), "FLAC");

        record.file_name = "no_extension".to_string();
        assert_eq!(record.file_extension(), "flac");

        record.file_name = "trailing.".to_string();
        assert_eq!(record.file_extension(), "flac");
    }

    #[test]
    fn test_final_song_id_resolution() {
        let mut receipt = MetadataReceipt {
            status_code: 200,
            resolved_song_id: Some(42),
            fallback_song_id: Some("7".to_string()),
            message: None,
        };
        assert_eq!(receipt.final_song_id(), Some(42));

        receipt.resolved_song_id = None;
        assert_eq!(receipt.final_song_id(), Some(7));

        receipt.resolved_song_id = Some(0);
        receipt.fallback_song_id = Some("not-a-number".to_string());
        assert_eq!(receipt.final_song_id(), None);

        receipt.fallback_song_id = Some("0".to_string());
        assert_eq!(receipt.final_song_id(), None);
    }
}
