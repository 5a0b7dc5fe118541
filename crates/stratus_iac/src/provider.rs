//! Hosting provider definitions.

use std::str::FromStr;

use crate::error::IacError;

/// Supported hosting providers, selected by an entry's `hosted_on` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostingProvider {
    Aws,
    Gcp,
}

impl HostingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostingProvider::Aws => "AWS",
            HostingProvider::Gcp => "GCP",
        }
    }

    pub fn all() -> [Self; 2] {
        [HostingProvider::Aws, HostingProvider::Gcp]
    }

    /// Name of the environment field carrying this provider's identifier.
    pub fn identifier_field(&self) -> &'static str {
        match self {
            HostingProvider::Aws => "aws_profile",
            HostingProvider::Gcp => "gcp_project_id",
        }
    }

    /// Region that needs no explicit location constraint when creating buckets.
    pub fn default_region(&self) -> &'static str {
        match self {
            HostingProvider::Aws => "us-east-1",
            HostingProvider::Gcp => "us-central1",
        }
    }
}

impl FromStr for HostingProvider {
    type Err = IacError;

    /// Parse a `hosted_on` tag, ignoring case.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.to_uppercase().as_str() {
            "AWS" => Ok(HostingProvider::Aws),
            "GCP" => Ok(HostingProvider::Gcp),
            _ => Err(IacError::UnsupportedProvider(tag.to_string())),
        }
    }
}

impl std::fmt::Display for HostingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
