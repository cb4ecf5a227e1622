//! Minimal AWS clients for static site deployment.
//!
//! Only the handful of calls the deployer needs are implemented:
//! listing a bucket, uploading an object and creating a CloudFront
//! invalidation. Every request is signed with [`Signer`] (SigV4).

pub mod cloudfront;
pub mod error;
pub mod listing;
pub mod s3;
pub mod signer;

#[cfg(test)]
mod mock;

pub use cloudfront::CloudFrontClient;
pub use error::AwsError;
pub use listing::{Listing, parse_listing};
pub use s3::{S3Client, validate_header};
pub use signer::{Credentials, Signer};
