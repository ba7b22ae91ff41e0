//! Amazon S3 provider backed by `object_store`'s `AmazonS3Builder`

use super::ObjectStoreProvider;
use crate::error::Result;
use object_store::aws::AmazonS3Builder;
use std::{collections::HashMap, sync::Arc};
use tracing::warn;
use url::Url;

/// Provider for `s3://` and `s3a://` locations.
///
/// Credentials and region come from the standard `AWS_*` environment variables
/// (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`, `AWS_REGION`,
/// `AWS_ENDPOINT`, `AWS_ALLOW_HTTP`). Storage options override them, with or
/// without the `aws_` prefix:
///
/// | Option                             | Description                       |
/// |------------------------------------|-----------------------------------|
/// | `aws_access_key_id`                | AWS access key ID                 |
/// | `aws_secret_access_key`            | AWS secret access key             |
/// | `aws_session_token`                | AWS session token                 |
/// | `aws_region`                       | AWS region                        |
/// | `aws_endpoint`                     | Custom S3 endpoint                |
/// | `aws_allow_http`                   | Allow HTTP connections            |
/// | `aws_virtual_hosted_style_request` | Use virtual hosted-style requests |
pub struct S3Provider;

impl ObjectStoreProvider for S3Provider {
    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "s3" | "s3a")
    }

    fn create_store(
        &self,
        location: &Url,
        options: &HashMap<String, String>,
    ) -> Result<Arc<dyn object_store::ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env();

        if let Some(bucket) = location.host_str() {
            builder = builder.with_bucket_name(bucket);
        }

        for (key, value) in options {
            let flag = || value.parse::<bool>().unwrap_or(false);

            builder = match key.trim_start_matches("aws_") {
                "access_key_id" => builder.with_access_key_id(value),
                "secret_access_key" => builder.with_secret_access_key(value),
                "session_token" => builder.with_token(value),
                "region" => builder.with_region(value),
                "endpoint" => builder.with_endpoint(value),
                "allow_http" => builder.with_allow_http(flag()),
                "virtual_hosted_style_request" => builder.with_virtual_hosted_style_request(flag()),
                unknown => {
                    warn!("Unknown object_store configuration key: {unknown}");
                    builder
                }
            };
        }

        Ok(Arc::new(builder.build()?))
    }
}
