//! NetEase cloud drive API connector implementation
//!
//! Implements the `CloudDriveService` trait for the private cloud endpoints.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::storage::{
    CloudDriveService, MetadataReceipt, MetadataSubmission, PublishReceipt, SongRecord,
    UploadCheck, UploadToken,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::NetEaseError;
use crate::rate_limiter::RateLimiter;
use crate::types::{
    CheckUploadResponse, CloudItem, CloudListResponse, PublishResponse, TokenResponse,
    UploadInfoResponse, CODE_OK,
};

const CLOUD_LIST_URL: &str = "https://music.163.com/api/v1/cloud/get";
const UPLOAD_CHECK_URL: &str = "https://interface.music.163.com/api/cloud/upload/check";
const TOKEN_ALLOC_URL: &str = "https://music.163.com/api/nos/token/alloc";
const UPLOAD_INFO_URL: &str = "https://music.163.com/api/upload/cloud/info/v2";
const PUBLISH_URL: &str = "https://interface.music.163.com/api/cloud/pub/v2";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application codes meaning the session is not logged in
const AUTH_CODES: [i64; 3] = [301, 401, 403];

/// Longest slice of an error body kept in messages
const MAX_ERROR_BODY: usize = 256;

/// NetEase cloud drive connector
///
/// One connector per account. Every call goes through the connector's
/// [`RateLimiter`] and then the HTTP client's retrying path.
///
/// # Example
///
/// ```ignore
/// use provider_netease::NetEaseConnector;
/// use bridge_traits::storage::CloudDriveService;
///
/// let connector = NetEaseConnector::new(http_client, cookie);
/// let songs = connector.fetch_all_items().await?;
/// ```
pub struct NetEaseConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Raw `Cookie` header of the account session
    cookie: String,

    rate_limiter: RateLimiter,

    retry_policy: RetryPolicy,

    request_timeout: Duration,
}

impl NetEaseConnector {
    /// Create a connector with the default pacing and retry policy
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `cookie` - full cookie string of a logged-in web session
    pub fn new(http_client: Arc<dyn HttpClient>, cookie: impl Into<String>) -> Self {
        Self {
            http_client,
            cookie: cookie.into(),
            rate_limiter: RateLimiter::default(),
            retry_policy: RetryPolicy::default(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_rate_limit(mut self, calls_per_second: f64) -> Self {
        self.rate_limiter = RateLimiter::new(calls_per_second);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn build_request(&self, url: &str, fields: &[(&str, String)]) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, url)
            .cookie(self.cookie.clone())
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7")
            .form(fields)
            .timeout(self.request_timeout)
    }

    /// Paced, retried form POST decoded into `T`
    async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        fields: &[(&str, String)],
    ) -> std::result::Result<T, NetEaseError> {
        self.rate_limiter.acquire().await;

        let request = self.build_request(url, fields);
        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(url, status = response.status, "API request rejected");
            return Err(NetEaseError::ApiError {
                status_code: response.status,
                message,
            });
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            NetEaseError::ParseError(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    /// Convert a listing row to a SongRecord
    fn convert_item(item: CloudItem) -> SongRecord {
        let entry = item.private_cloud;

        SongRecord {
            content_hash: entry.md5,
            title: entry.song.unwrap_or_default(),
            artist: entry.artist.unwrap_or_default(),
            album: entry.album.unwrap_or_default(),
            bitrate: entry.bitrate,
            file_size_bytes: entry.file_size,
            file_name: entry.file_name,
            remote_id: entry.song_id,
        }
    }

    /// Map a non-success listing code onto the error taxonomy
    ///
    /// Codes outside the HTTP range surface as 502; the raw code stays in the
    /// message.
    fn listing_code_error(code: i64, message: Option<String>) -> NetEaseError {
        let message = match message {
            Some(message) => format!("listing returned code {}: {}", code, message),
            None => format!("listing returned code {}", code),
        };

        if AUTH_CODES.contains(&code) {
            NetEaseError::AuthenticationFailed(message)
        } else {
            NetEaseError::ApiError {
                status_code: u16::try_from(code).unwrap_or(502),
                message,
            }
        }
    }
}

#[async_trait]
impl CloudDriveService for NetEaseConnector {
    #[instrument(skip(self))]
    async fn list_items(&self, offset: u32, limit: u32) -> Result<Vec<SongRecord>> {
        debug!("Listing cloud drive page");

        let fields = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let response: CloudListResponse = self.post_form(CLOUD_LIST_URL, &fields).await?;

        if response.code != CODE_OK {
            return Err(Self::listing_code_error(response.code, response.message).into());
        }

        let songs: Vec<SongRecord> = response
            .data
            .into_iter()
            .map(Self::convert_item)
            .collect();

        info!("Listed {} songs (offset={})", songs.len(), offset);

        Ok(songs)
    }

    #[instrument(skip(self), fields(md5 = %content_hash))]
    async fn check_upload_needed(
        &self,
        content_hash: &str,
        file_size_bytes: u64,
        bitrate: u32,
    ) -> Result<UploadCheck> {
        let fields = [
            ("bitrate", bitrate.to_string()),
            ("ext", String::new()),
            ("songId", "0".to_string()),
            ("version", "1".to_string()),
            ("md5", content_hash.to_string()),
            ("length", file_size_bytes.to_string()),
        ];
        let response: CheckUploadResponse = self.post_form(UPLOAD_CHECK_URL, &fields).await?;

        debug!(
            song_id = %response.song_id,
            need_upload = response.need_upload,
            code = response.code,
            "Upload check answered"
        );

        Ok(UploadCheck {
            remote_song_id: response.song_id,
            need_upload: response.need_upload,
        })
    }

    #[instrument(skip(self, file_size_bytes, bitrate), fields(md5 = %content_hash))]
    async fn allocate_upload_token(
        &self,
        content_hash: &str,
        file_name: &str,
        file_size_bytes: u64,
        bitrate: u32,
        extension: &str,
    ) -> Result<UploadToken> {
        let fields = [
            ("bucket", String::new()),
            ("local", "false".to_string()),
            ("nos_product", "3".to_string()),
            ("type", "audio".to_string()),
            ("ext", extension.to_uppercase()),
            ("md5", content_hash.to_string()),
            ("filename", file_name.to_string()),
        ];
        let response: TokenResponse = self.post_form(TOKEN_ALLOC_URL, &fields).await?;

        debug!(
            resource_id = response.result.resource_id,
            code = response.code,
            "Upload token allocated"
        );

        Ok(UploadToken {
            resource_id: response.result.resource_id,
            object_key: response.result.object_key,
            bucket: response.result.bucket,
        })
    }

    #[instrument(skip(self, submission), fields(md5 = %submission.content_hash))]
    async fn submit_metadata(&self, submission: &MetadataSubmission) -> Result<MetadataReceipt> {
        let fields = [
            ("bitrate", submission.bitrate.to_string()),
            ("md5", submission.content_hash.clone()),
            ("songid", submission.remote_song_id.clone()),
            ("filename", submission.file_name.clone()),
            ("song", submission.title.clone()),
            ("album", submission.album.clone()),
            ("artist", submission.artist.clone()),
            ("resourceId", submission.resource_id.to_string()),
        ];
        let response: UploadInfoResponse = self.post_form(UPLOAD_INFO_URL, &fields).await?;

        debug!(code = response.code, exists = ?response.exists, "Metadata submitted");

        Ok(MetadataReceipt {
            status_code: response.code,
            resolved_song_id: response.private_cloud.map(|pc| pc.song_id),
            fallback_song_id: response.song_id,
            message: response.message,
        })
    }

    #[instrument(skip(self))]
    async fn publish(&self, song_id: i64) -> Result<PublishReceipt> {
        let fields = [("songid", song_id.to_string())];
        let response: PublishResponse = self.post_form(PUBLISH_URL, &fields).await?;

        debug!(code = response.code, "Publish answered");

        Ok(PublishReceipt {
            status_code: response.code,
            message: response.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn body_of(request: &HttpRequest) -> String {
        String::from_utf8(request.body.clone().unwrap_or_default().to_vec()).unwrap()
    }

    fn connector(mock_http: MockHttpClient) -> NetEaseConnector {
        NetEaseConnector::new(Arc::new(mock_http), "MUSIC_U=secret")
            .with_rate_limit(1000.0)
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                use_exponential_backoff: true,
            })
    }

    const LISTING: &str = r#"{
        "code": 200,
        "data": [
            {"privateCloud": {"songId": 11, "md5": "aaa", "song": "First",
                "artist": "Singer", "album": null, "bitrate": 320,
                "fileName": "first.mp3", "fileSize": 4096}},
            {"privateCloud": {"songId": 12, "md5": "bbb", "song": "Second",
                "artist": "Singer", "album": "LP", "bitrate": 999,
                "fileName": "second.flac", "fileSize": 8192}}
        ]
    }"#;

    #[tokio::test]
    async fn test_list_items_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, CLOUD_LIST_URL);
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.headers.get("Cookie"), Some(&"MUSIC_U=secret".to_string()));
            assert_eq!(body_of(&req), "limit=100&offset=200");
            response(200, LISTING)
        });

        let songs = connector(mock_http).list_items(200, 100).await.unwrap();

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].content_hash, "aaa");
        assert_eq!(songs[0].album, "");
        assert_eq!(songs[0].remote_id, 11);
        assert_eq!(songs[1].file_extension(), "flac");
        assert_eq!(songs[1].bitrate, 999);
    }

    #[tokio::test]
    async fn test_validate_credential_rejected_by_status() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| response(403, "Forbidden"));

        let valid = connector(mock_http).validate_credential().await.unwrap();
        assert!(!valid);
    }

    #[tokio::test]
    async fn test_validate_credential_rejected_by_login_code() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| response(200, r#"{"code": 301, "message": "need login"}"#));

        let valid = connector(mock_http).validate_credential().await.unwrap();
        assert!(!valid);
    }

    #[tokio::test]
    async fn test_negative_listing_code_keeps_raw_code() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| response(200, r#"{"code": -460, "message": "cheating"}"#));

        let result = connector(mock_http).list_items(0, 100).await;
        match result {
            Err(BridgeError::HttpStatus { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "listing returned code -460: cheating");
            }
            other => panic!("unexpected listing result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_credential_propagates_server_errors() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| response(500, "boom"));

        let result = connector(mock_http).validate_credential().await;
        assert!(matches!(
            result,
            Err(BridgeError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error_without_retry() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| response(200, "<html>captcha</html>"));

        let result = connector(mock_http).list_items(0, 100).await;
        assert!(matches!(result, Err(BridgeError::Decode(_))));
    }

    #[tokio::test]
    async fn test_transport_faults_are_retried() {
        let mut mock_http = MockHttpClient::new();
        let mut calls = 0;
        mock_http.expect_execute().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(BridgeError::Timeout("read timed out".into()))
            } else {
                response(200, LISTING)
            }
        });

        let songs = connector(mock_http).list_items(0, 100).await.unwrap();
        assert_eq!(songs.len(), 2);
    }

    #[tokio::test]
    async fn test_check_upload_needed() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, UPLOAD_CHECK_URL);
            assert_eq!(
                body_of(&req),
                "bitrate=320&ext=&songId=0&version=1&md5=aaa&length=4096"
            );
            response(200, r#"{"songId": "778899", "needUpload": false, "code": 200}"#)
        });

        let check = connector(mock_http)
            .check_upload_needed("aaa", 4096, 320)
            .await
            .unwrap();

        assert_eq!(check.remote_song_id, "778899");
        assert!(!check.need_upload);
    }

    #[tokio::test]
    async fn test_allocate_upload_token_encodes_filename() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            let body = body_of(&req);
            assert!(body.contains("ext=MP3"));
            assert!(body.contains("filename=My%20Song%20%26%20Co.mp3"));
            assert!(body.contains("nos_product=3"));
            response(
                200,
                r#"{"code": 200, "result": {"bucket": "b", "token": "t",
                    "docId": "-1", "objectKey": "k", "resourceId": 4242}}"#,
            )
        });

        let token = connector(mock_http)
            .allocate_upload_token("aaa", "My Song & Co.mp3", 4096, 320, "mp3")
            .await
            .unwrap();

        assert_eq!(token.resource_id, 4242);
        assert_eq!(token.object_key, "k");
    }

    #[tokio::test]
    async fn test_submit_metadata_reports_ids_and_codes() {
        let mut mock_http = MockHttpClient::new();
        let mut calls = 0;
        mock_http.expect_execute().times(2).returning(move |req| {
            calls += 1;
            assert!(body_of(&req).contains("songid=778899"));
            if calls == 1 {
                response(
                    200,
                    r#"{"code": 200, "privateCloud": {"songId": 31337, "pcId": 1}}"#,
                )
            } else {
                response(200, r#"{"code": 429, "message": "too frequent"}"#)
            }
        });

        let connector = connector(mock_http);
        let song = SongRecord {
            content_hash: "aaa".into(),
            title: "First".into(),
            artist: "Singer".into(),
            album: String::new(),
            bitrate: 320,
            file_size_bytes: 4096,
            file_name: "first.mp3".into(),
            remote_id: 11,
        };
        let submission = MetadataSubmission::for_song(&song, "778899", 4242);

        let accepted = connector.submit_metadata(&submission).await.unwrap();
        assert!(accepted.is_success());
        assert_eq!(accepted.final_song_id(), Some(31337));

        let throttled = connector.submit_metadata(&submission).await.unwrap();
        assert_eq!(throttled.status_code, 429);
        assert_eq!(throttled.message.as_deref(), Some("too frequent"));
        assert_eq!(throttled.final_song_id(), None);
    }

    #[tokio::test]
    async fn test_publish() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, PUBLISH_URL);
            assert_eq!(body_of(&req), "songid=31337");
            response(200, r#"{"code": 200, "privateCloud": {"songId": 31337}}"#)
        });

        let receipt = connector(mock_http).publish(31337).await.unwrap();
        assert!(receipt.is_success());
    }
}
