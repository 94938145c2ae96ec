//! License banner prepended to every script and stylesheet artifact.

use chrono::Datelike;
use kiln_core::PackageMeta;

/// Rendered banner comment, including its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    text: String,
}

impl Banner {
    /// Render the banner for the current year.
    #[must_use]
    pub fn new(package: &PackageMeta) -> Self {
        Self::for_year(package, chrono::Local::now().year())
    }

    /// Render the banner for a given year.
    #[must_use]
    pub fn for_year(package: &PackageMeta, year: i32) -> Self {
        let mut text = format!("/*! {} v{} | (c) {year}", package.name, package.version);
        if !package.author.is_empty() {
            text.push(' ');
            text.push_str(&package.author);
        }
        if !package.license.is_empty() {
            text.push_str(&format!(" | {} License", package.license));
        }
        if !package.repository.is_empty() {
            text.push_str(&format!(" | {}", package.repository));
        }
        text.push_str(" */\n");

        Self { text }
    }

    /// Banner text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Prefix `body` with the banner.
    #[must_use]
    pub fn apply(&self, body: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + body.len());
        out.push_str(&self.text);
        out.push_str(body);
        out
    }
}
