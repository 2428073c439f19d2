// Bucket identity and the summary record stored per bucket

use serde::{Deserialize, Serialize};

/// Storage provider. Summaries carry "AWS"/"OCI"; config accepts lowercase too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[default]
    #[serde(rename = "AWS", alias = "aws")]
    Aws,
    #[serde(rename = "OCI", alias = "oci")]
    Oci,
}

impl Provider {
    /// Lowercase name used in slugs and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Oci => "oci",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store key for one bucket: `{provider}.{bucket}.{storage_class}`.
pub fn slug(provider: Provider, bucket: &str, storage_class: &str) -> String {
    format!("{}.{}.{}", provider.as_str(), bucket, storage_class)
}

/// Latest known state of one bucket. Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub name: String,
    pub provider: Provider,
    pub storage_class: String,
    pub size_current: u64,
    pub size_peak: u64,
    pub objects_current: u64,
    pub objects_peak: u64,
}

impl BucketSummary {
    pub fn slug(&self) -> String {
        slug(self.provider, &self.name, &self.storage_class)
    }
}
