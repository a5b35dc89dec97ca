//! Pack.yaml model for generated packs

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// API version written into every generated Pack.yaml
pub const PACK_API_VERSION: &str = "sherpack/v1";

/// A Sherpack Pack definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    /// API version (sherpack/v1)
    pub api_version: String,

    /// Pack type
    #[serde(default)]
    pub kind: PackKind,

    /// Pack metadata
    pub metadata: PackMetadata,

    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Pack type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PackKind {
    #[default]
    Application,
    Library,
}

/// Pack metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    /// Pack name (required)
    pub name: String,

    /// Pack version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Application version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fail on undefined variables
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_true() -> bool {
    true
}

impl Pack {
    /// Application pack with the given name and versions
    pub fn application(name: &str, version: &str, app_version: &str) -> Result<Self> {
        Ok(Self {
            api_version: PACK_API_VERSION.to_string(),
            kind: PackKind::Application,
            metadata: PackMetadata {
                name: name.to_string(),
                version: Version::parse(version)?,
                description: Some(format!("A Sherpack pack for {name}")),
                app_version: Some(app_version.to_string()),
            },
            engine: EngineConfig::default(),
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Custom serde for semver::Version
mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
