// ABOUTME: Serde models for release.MF and job.MF.
// ABOUTME: Versions may be written as YAML strings or numbers.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: String,

    #[serde(default)]
    pub jobs: Vec<JobRef>,

    #[serde(default)]
    pub packages: Vec<PackageRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub sha1: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageRef {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub templates: BTreeMap<String, String>,

    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionEntry {
    Text(String),
    Integer(u64),
    Float(f64),
}

fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match VersionEntry::deserialize(deserializer)? {
        VersionEntry::Text(s) => s,
        VersionEntry::Integer(n) => n.to_string(),
        VersionEntry::Float(n) => n.to_string(),
    })
}
