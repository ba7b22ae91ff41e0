//! Engine-wide settings shared by every dataset of a run

use bon::bon;
use qbo_mirror_schemas::{CoerceErrorPolicy, ReplaceStrategy};
use std::{collections::HashMap, time::Duration};
use url::Url;

/// Records requested per page when `page_size` is not configured
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Per-request timeout of the query client
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Production host of the accounting API
pub const DEFAULT_API_BASE: &str = "https://quickbooks.api.intuit.com";

/// Largest object S3 accepts in a single PUT
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 5 * 1024 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("http timeout must be greater than zero")]
    InvalidTimeout,

    #[error("COPY IAM role is required")]
    MissingIamRole,

    #[error("invalid API base url '{url}': {reason}")]
    InvalidApiBase { url: String, reason: String },

    #[error("max object size must be greater than zero")]
    InvalidMaxObjectSize,

    #[error("cannot build http client: {0}")]
    HttpClient(String),
}

/// Settings of an [`crate::IngestionEngine`].
///
/// ```
/// use qbo_mirror_core::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .copy_iam_role("arn:aws:iam::123456789012:role/redshift-copy")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.page_size, 100);
/// assert_eq!(config.api_base_url.as_str(), "https://quickbooks.api.intuit.com/");
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub page_size: usize,
    pub http_timeout: Duration,
    /// Applied to descriptors that do not declare their own policy
    pub on_coerce_error: CoerceErrorPolicy,
    /// Applied to descriptors that do not declare their own strategy
    pub replace_strategy: ReplaceStrategy,
    pub copy_iam_role: String,
    pub api_base_url: Url,
    pub max_object_size: usize,
    /// Overrides passed to the object store provider
    pub storage_options: HashMap<String, String>,
}

#[bon]
impl EngineConfig {
    #[builder]
    pub fn new(
        #[builder(into)] copy_iam_role: String,
        #[builder(default = DEFAULT_PAGE_SIZE)] page_size: usize,
        #[builder(default = DEFAULT_HTTP_TIMEOUT)] http_timeout: Duration,
        #[builder(default)] on_coerce_error: CoerceErrorPolicy,
        #[builder(default)] replace_strategy: ReplaceStrategy,
        #[builder(into, default = DEFAULT_API_BASE.to_string())] api_base_url: String,
        #[builder(default = DEFAULT_MAX_OBJECT_SIZE)] max_object_size: usize,
        #[builder(default)] storage_options: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }

        if http_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        if copy_iam_role.trim().is_empty() {
            return Err(ConfigError::MissingIamRole);
        }

        if max_object_size == 0 {
            return Err(ConfigError::InvalidMaxObjectSize);
        }

        let api_base_url = Url::parse(&api_base_url)
            .map_err(|e| ConfigError::InvalidApiBase {
                url: api_base_url.clone(),
                reason: e.to_string(),
            })
            .and_then(|url| {
                if matches!(url.scheme(), "http" | "https") {
                    Ok(url)
                } else {
                    Err(ConfigError::InvalidApiBase {
                        url: api_base_url.clone(),
                        reason: "expected an http(s) url".to_string(),
                    })
                }
            })?;

        Ok(Self {
            page_size,
            http_timeout,
            on_coerce_error,
            replace_strategy,
            copy_iam_role,
            api_base_url,
            max_object_size,
            storage_options,
        })
    }
}
