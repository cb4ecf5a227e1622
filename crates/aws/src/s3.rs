//! S3 client: bucket listing and single-request object upload.
//!
//! Uses path-style addressing (`{endpoint}/{bucket}/{key}`).

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use percent_encoding::utf8_percent_encode;
use reqwest::header::{HeaderName, HeaderValue};
use static_deploy_model::{FileEntry, Header, Inventory};
use static_deploy_transfer::{TransferError, Transport};
use tracing::{debug, warn};

use crate::error::AwsError;
use crate::listing::parse_listing;
use crate::signer::{Credentials, KEY_ENCODE, Signer, URI_ENCODE};

const DEFAULT_REGION: &str = "us-east-1";

/// Async S3 client bound to one bucket.
pub struct S3Client {
    http: reqwest::Client,
    signer: Signer,
    endpoint: String,
    bucket: String,
}

impl S3Client {
    /// Creates a client for `bucket` in `region` (empty means `us-east-1`).
    pub fn new(bucket: impl Into<String>, region: &str, credentials: Credentials) -> Result<Self, AwsError> {
        let region = if region.is_empty() { DEFAULT_REGION } else { region };
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            signer: Signer::new(credentials, region, "s3"),
            endpoint: default_endpoint(region),
            bucket: bucket.into(),
        })
    }

    /// Overrides the endpoint, e.g. for S3-compatible stores.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/{}/",
            self.endpoint,
            utf8_percent_encode(&self.bucket, URI_ENCODE)
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}{}", self.bucket_url(), utf8_percent_encode(key, KEY_ENCODE))
    }

    async fn send(&self, mut request: reqwest::Request) -> Result<String, AwsError> {
        self.signer.sign(&mut request, Utc::now())?;

        let resp = self.http.execute(request).await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(AwsError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Fetches the bucket contents with a single `ListObjectsV2` request.
    pub async fn list_objects(&self) -> Result<Inventory, AwsError> {
        let url = format!("{}?list-type=2", self.bucket_url());
        let request = self.http.get(&url).build()?;

        let body = self.send(request).await?;
        let listing = parse_listing(&body)?;

        if listing.truncated {
            warn!(
                bucket = %self.bucket,
                records = listing.inventory.len(),
                "bucket listing is truncated, objects beyond the first page are treated as new"
            );
        }
        debug!(bucket = %self.bucket, records = listing.inventory.len(), "bucket listed");

        Ok(listing.inventory)
    }

    /// Uploads the file behind `entry` in one PUT and returns the response body.
    pub async fn put_object(&self, entry: &FileEntry) -> Result<String, AwsError> {
        let path = entry.local_path();
        let data = tokio::fs::read(path).await.map_err(|source| AwsError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let size = data.len();

        let mut request = self
            .http
            .put(self.object_url(entry.upload_key()))
            .body(data)
            .build()?;

        let headers = request.headers_mut();
        for header in entry.headers() {
            let (name, value) = parse_header(header)?;
            headers.append(name, value);
        }

        let body = self.send(request).await?;
        debug!(key = %entry.upload_key(), bytes = size, "object uploaded");
        Ok(body)
    }
}

impl Transport for S3Client {
    fn put<'a>(
        &'a self,
        entry: &'a FileEntry,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransferError>> + Send + 'a>> {
        Box::pin(async move {
            self.put_object(entry)
                .await
                .map_err(|e| TransferError::upload(entry.upload_key(), e))
        })
    }
}

fn default_endpoint(region: &str) -> String {
    if region == DEFAULT_REGION {
        "https://s3.amazonaws.com".to_string()
    } else {
        format!("https://s3.{region}.amazonaws.com")
    }
}

fn parse_header(header: &Header) -> Result<(HeaderName, HeaderValue), AwsError> {
    let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| AwsError::InvalidHeader {
        name: header.name.clone(),
        reason: e.to_string(),
    })?;
    let value = HeaderValue::from_str(&header.value).map_err(|e| AwsError::InvalidHeader {
        name: header.name.clone(),
        reason: e.to_string(),
    })?;
    Ok((name, value))
}

/// Checks that a configured header can be sent over HTTP.
pub fn validate_header(header: &Header) -> Result<(), AwsError> {
    parse_header(header).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::mock_server;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn client(url: String) -> S3Client {
        S3Client::new("my-site", "", Credentials::new("AKIDEXAMPLE", "secret"))
            .unwrap()
            .with_endpoint(url)
    }

    #[test]
    fn default_endpoints() {
        assert_eq!(default_endpoint("us-east-1"), "https://s3.amazonaws.com");
        assert_eq!(default_endpoint("eu-west-1"), "https://s3.eu-west-1.amazonaws.com");
    }

    #[test]
    fn object_url_encodes_key() {
        let c = client("http://localhost:9000/".into());
        assert_eq!(
            c.object_url("docs/my file+v1.html"),
            "http://localhost:9000/my-site/docs/my%20file%2Bv1.html"
        );
    }

    #[test]
    fn header_validation() {
        assert!(validate_header(&Header::new("Content-Type", "text/html")).is_ok());
        assert!(validate_header(&Header::new("Bad Header", "x")).is_err());
        assert!(validate_header(&Header::new("X-Ok", "line\nbreak")).is_err());
    }

    #[tokio::test]
    async fn list_objects_parses_inventory() {
        let xml = r#"<ListBucketResult><Contents><Key>index.html</Key><ETag>"abc"</ETag><LastModified>2024-01-01T00:00:00.000Z</LastModified></Contents></ListBucketResult>"#;
        let (url, handle) = mock_server(200, xml).await;

        let inventory = client(url).list_objects().await.unwrap();
        assert_eq!(inventory.get("index.html").unwrap().content_hash, "abc");

        let request = handle.await.unwrap();
        assert!(request.starts_with("GET /my-site/?list-type=2 HTTP/1.1"), "{request}");
        assert!(request.to_lowercase().contains("authorization: aws4-hmac-sha256"));
    }

    #[tokio::test]
    async fn list_objects_api_error() {
        let (url, handle) = mock_server(403, "<Error><Code>AccessDenied</Code></Error>").await;

        let err = client(url).list_objects().await.unwrap_err();
        match err {
            AwsError::Api { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("AccessDenied"));
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.abort();
    }

    #[tokio::test]
    async fn list_objects_malformed_body() {
        let (url, handle) = mock_server(200, "<Nope/>").await;

        let err = client(url).list_objects().await.unwrap_err();
        assert!(matches!(err, AwsError::MalformedListing(_)));
        handle.abort();
    }

    #[tokio::test]
    async fn put_object_sends_body_and_headers_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, b"<h1>hi</h1>").unwrap();

        let entry = FileEntry::new(
            path,
            "index.html".into(),
            vec![
                Header::new("Cache-Control", "no-cache"),
                Header::new("Content-Type", "text/html"),
                Header::new("Cache-Control", "max-age=60"),
            ],
        );

        let (url, handle) = mock_server(200, "").await;
        let body = client(url).put_object(&entry).await.unwrap();
        assert!(body.is_empty());

        let request = handle.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("PUT /my-site/index.html HTTP/1.1"), "{request}");
        assert!(request.ends_with("<h1>hi</h1>"));
        assert!(lower.contains("content-type: text/html"));

        let first = lower.find("cache-control: no-cache").unwrap();
        let second = lower.find("cache-control: max-age=60").unwrap();
        assert!(first < second, "header order not preserved");
    }

    #[tokio::test]
    async fn transport_wraps_failures_with_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"a").unwrap();
        let entry = FileEntry::new(path, "a.txt".into(), Vec::new());

        let (url, handle) = mock_server(500, "<Error>InternalError</Error>").await;
        let transport: Arc<dyn Transport> = Arc::new(client(url));

        let err = transport.put(&entry).await.unwrap_err();
        match err {
            TransferError::Upload { key, source } => {
                assert_eq!(key, "a.txt");
                assert!(source.to_string().contains("500"));
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.abort();
    }

    #[tokio::test]
    async fn put_object_missing_file() {
        let entry = FileEntry::new(
            PathBuf::from("/nonexistent/static-deploy/file.txt"),
            "file.txt".into(),
            Vec::new(),
        );
        let err = client("http://127.0.0.1:9".into())
            .put_object(&entry)
            .await
            .unwrap_err();
        assert!(matches!(err, AwsError::ReadFile { .. }));
    }
}
