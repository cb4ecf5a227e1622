//! CloudFront invalidation client.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use tracing::{debug, info};

use crate::error::AwsError;
use crate::signer::{Credentials, Signer};

const API_VERSION: &str = "2020-05-31";
const ENDPOINT: &str = "https://cloudfront.amazonaws.com";
// CloudFront is a global service signed against us-east-1.
const REGION: &str = "us-east-1";

/// Creates invalidations for a single distribution.
pub struct CloudFrontClient {
    http: reqwest::Client,
    signer: Signer,
    endpoint: String,
    distribution_id: String,
}

impl CloudFrontClient {
    pub fn new(distribution_id: impl Into<String>, credentials: Credentials) -> Result<Self, AwsError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            signer: Signer::new(credentials, REGION, "cloudfront"),
            endpoint: ENDPOINT.to_string(),
            distribution_id: distribution_id.into(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Submits one invalidation covering `paths` and returns the response body.
    ///
    /// An empty path list sends nothing and returns an empty string.
    pub async fn create_invalidation(&self, paths: &[String]) -> Result<String, AwsError> {
        if paths.is_empty() {
            debug!("no paths to invalidate, skipping request");
            return Ok(String::new());
        }

        let now = Utc::now();
        let body = build_invalidation_batch(paths, &caller_reference(&self.distribution_id, now));
        let url = format!(
            "{}/{API_VERSION}/distribution/{}/invalidation",
            self.endpoint, self.distribution_id
        );

        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .build()?;
        self.signer.sign(&mut request, now)?;

        let resp = self.http.execute(request).await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(AwsError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        info!(
            distribution = %self.distribution_id,
            paths = paths.len(),
            "invalidation created"
        );
        Ok(text)
    }
}

/// Unique per submission: distribution id plus a nanosecond timestamp.
fn caller_reference(distribution_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "{distribution_id} - {}",
        now.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    )
}

/// Renders the `InvalidationBatch` request document.
pub fn build_invalidation_batch(paths: &[String], caller_reference: &str) -> String {
    let items: String = paths
        .iter()
        .map(|p| format!("<Path>{}</Path>", escape(p.as_str())))
        .collect();

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<InvalidationBatch xmlns="http://cloudfront.amazonaws.com/doc/{version}/">"#,
            "<CallerReference>{reference}</CallerReference>",
            "<Paths><Quantity>{count}</Quantity><Items>{items}</Items></Paths>",
            "</InvalidationBatch>"
        ),
        version = API_VERSION,
        reference = escape(caller_reference),
        count = paths.len(),
        items = items,
    )
}
