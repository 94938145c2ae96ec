//! Package metadata read from the project's `package.json`.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, Result};

/// Metadata interpolated into the artifact banner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    pub author: String,
    pub license: String,
    pub repository: String,
}

/// `author` is either `"Name <mail>"` or `{ "name": ..., "email": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Author {
    Plain(String),
    Person { name: String },
}

/// `repository` is either a URL string or `{ "type": ..., "url": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Repository {
    Plain(String),
    Detailed { url: String },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    author: Option<Author>,
    license: Option<String>,
    repository: Option<Repository>,
}

impl PackageMeta {
    /// Read and validate a `package.json` manifest.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::package(path, "file not found"));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            CoreError::Json(json) => CoreError::package(path, json.to_string()),
            CoreError::Package { message, .. } => CoreError::package(path, message),
            other => other,
        })
    }

    /// Parse manifest JSON. `name` and `version` are required.
    pub fn parse(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json)?;

        let name = manifest
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CoreError::package("package.json", "missing \"name\""))?;
        let version = manifest
            .version
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::package("package.json", "missing \"version\""))?;

        let author = match manifest.author {
            Some(Author::Plain(author)) => author,
            Some(Author::Person { name }) => name,
            None => String::new(),
        };
        let repository = match manifest.repository {
            Some(Repository::Plain(url)) => url,
            Some(Repository::Detailed { url }) => url,
            None => String::new(),
        };

        Ok(Self {
            name,
            version,
            author,
            license: manifest.license.unwrap_or_default(),
            repository,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_fields() {
        let meta = PackageMeta::parse(
            r#"{
                "name": "site",
                "version": "1.2.3",
                "author": "Jane Doe",
                "license": "MIT",
                "repository": "https://example.com/site.git"
            }"#,
        )
        .unwrap();

        assert_eq!(meta.name, "site");
        assert_eq!(meta.version, "1.2.3");
        assert_eq!(meta.author, "Jane Doe");
        assert_eq!(meta.license, "MIT");
        assert_eq!(meta.repository, "https://example.com/site.git");
    }

    #[test]
    fn test_parse_object_fields() {
        let meta = PackageMeta::parse(
            r#"{
                "name": "site",
                "version": "0.1.0",
                "author": { "name": "Jane Doe", "email": "jane@example.com" },
                "repository": { "type": "git", "url": "https://example.com/site" }
            }"#,
        )
        .unwrap();

        assert_eq!(meta.author, "Jane Doe");
        assert_eq!(meta.repository, "https://example.com/site");
        assert!(meta.license.is_empty());
    }

    #[test]
    fn test_parse_requires_name() {
        let err = PackageMeta::parse(r#"{ "version": "1.0.0" }"#).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PackageMeta::load(Path::new("/nonexistent/package.json")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = PackageMeta::load(&path).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
