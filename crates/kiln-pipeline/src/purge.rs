//! Unused selector detection.
//!
//! The markup index is a whole-project bag of words: a class or id counts as
//! used when its name appears as a token anywhere in any scanned file. This
//! matches purgecss' default extractor.

use std::{
    collections::{BTreeSet, HashSet},
    sync::LazyLock,
};

use regex::Regex;

static CONTENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("valid token regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").expect("valid comment regex"));
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid attribute regex"));
static SYMBOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.#](-?[_a-zA-Z][_a-zA-Z0-9-]*)").expect("valid symbol regex")
});
static KEYFRAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(?:-[a-z]+-)?keyframes\s+["']?(-?[_a-zA-Z][_a-zA-Z0-9-]*)"#)
        .expect("valid keyframes regex")
});

/// Tokens found in the scanned markup.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    tokens: HashSet<String>,
}

impl ContentIndex {
    /// Index a set of markup documents.
    #[must_use]
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = Self::default();
        for doc in documents {
            index.add(doc);
        }
        index
    }

    /// Add a document's tokens.
    pub fn add(&mut self, document: &str) {
        self.tokens.extend(
            CONTENT_TOKEN
                .find_iter(document)
                .map(|m| m.as_str().to_string()),
        );
    }

    /// Whether `token` appears in any document.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Number of distinct tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no document contributed a token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Class and id names referenced by the selectors of a compiled stylesheet.
#[must_use]
pub fn selector_symbols(css: &str) -> BTreeSet<String> {
    let css = COMMENT.replace_all(css, "");
    let mut symbols = BTreeSet::new();
    let mut start = 0;

    for (brace, _) in css.match_indices('{') {
        let segment = &css[start..brace];
        start = brace + 1;

        let prelude = segment.rsplit(['}', ';']).next().unwrap_or(segment).trim();
        if prelude.is_empty() || prelude.starts_with('@') {
            continue;
        }

        let prelude = ATTRIBUTE.replace_all(prelude, "");
        symbols.extend(
            SYMBOL
                .captures_iter(&prelude)
                .map(|cap| cap[1].to_string()),
        );
    }

    symbols
}

/// Names declared by `@keyframes` rules, vendor-prefixed ones included.
#[must_use]
pub fn keyframe_names(css: &str) -> BTreeSet<String> {
    let css = COMMENT.replace_all(css, "");
    KEYFRAMES
        .captures_iter(&css)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Selector symbols of `css` that never appear in the indexed markup.
///
/// Keyframe names are never reported: the CSS minifier drops `@keyframes`
/// rules named by an unused symbol, and animations are always kept.
#[must_use]
pub fn unused_symbols(css: &str, index: &ContentIndex) -> HashSet<String> {
    let keyframes = keyframe_names(css);
    selector_symbols(css)
        .into_iter()
        .filter(|symbol| !index.contains(symbol) && !keyframes.contains(symbol))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_tokens() {
        let index = ContentIndex::from_documents([
            r#"<div class="card card--active" id="hero"></div>"#,
            r#"<button class="btn-primary">Go</button>"#,
        ]);

        assert!(index.contains("card"));
        assert!(index.contains("card--active"));
        assert!(index.contains("hero"));
        assert!(index.contains("btn-primary"));
        assert!(!index.contains("btn"));
    }

    #[test]
    fn test_selector_symbols() {
        let css = r#"
/* .commented { } */
.nav a:hover, #main > .item::before {
  color: #fff;
  margin: .5em;
}
@media (min-width: 10.5em) {
  .grid {
    display: grid;
  }
}
@keyframes spin {
  12.5% {
    opacity: 0;
  }
}
a[href$=".pdf"] {
  color: red;
}
"#;
        let symbols: Vec<_> = selector_symbols(css).into_iter().collect();
        assert_eq!(symbols, vec!["grid", "item", "main", "nav"]);
    }

    #[test]
    fn test_unused_symbols() {
        let index = ContentIndex::from_documents([r#"<p class="used"></p>"#]);
        let unused = unused_symbols(".used { color: red; }\n.unused { color: blue; }\n", &index);

        assert_eq!(unused.len(), 1);
        assert!(unused.contains("unused"));
    }

    #[test]
    fn test_keyframe_names() {
        let css = "@keyframes spin { to { transform: rotate(1turn); } }\n\
                   @-webkit-keyframes fade { from { opacity: 0; } }\n\
                   /* @keyframes ghost {} */\n";
        let names: Vec<_> = keyframe_names(css).into_iter().collect();
        assert_eq!(names, vec!["fade", "spin"]);
    }

    #[test]
    fn test_keyframe_names_are_never_unused() {
        let index = ContentIndex::from_documents([r#"<div class="loader"></div>"#]);
        let css = ".loader { animation: spin 1s; }\n.spin { color: red; }\n.gone { color: blue; }\n\
                   @keyframes spin { to { opacity: 0; } }\n";

        let unused = unused_symbols(css, &index);
        assert!(unused.contains("gone"));
        assert!(!unused.contains("spin"));
        assert!(!unused.contains("loader"));
    }

    #[test]
    fn test_empty_index_marks_everything_unused() {
        let index = ContentIndex::default();
        assert!(index.is_empty());
        assert_eq!(unused_symbols(".a {}\n#b {}\n", &index).len(), 2);
    }
}
