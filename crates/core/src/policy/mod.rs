//! TTL classification.
//!
//! A classifier is an ordered list of (matcher, class) rules evaluated
//! top-to-bottom against the request path; the first match wins and anything
//! unmatched falls back to [`TtlClass::Default`]. The two shipped presets are
//! tuning policies over the same mechanism, so operators can express custom
//! class schemes as data instead of forking the engine.

mod headers;

pub use headers::{HeaderSet, response_headers};

use crate::settings::PolicyConfig;

/// Extensions treated as static assets by the basic preset.
const STATIC_ASSET_EXTENSIONS: &[&str] =
    &["css", "js", "jpg", "jpeg", "png", "gif", "webp", "avif", "woff", "woff2"];

/// Extended static-asset set used by the storefront preset.
const STOREFRONT_STATIC_ASSET_EXTENSIONS: &[&str] = &[
    "css", "js", "jpg", "jpeg", "png", "gif", "webp", "avif", "woff", "woff2", "ico", "pdf",
    "doc", "docx", "ppt", "pptx",
];

/// Named content category carrying its own cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Homepage,
    Product,
    StaticAsset,
    Default,
}

impl TtlClass {
    /// Stable label used in logs and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            TtlClass::Homepage => "homepage",
            TtlClass::Product => "product",
            TtlClass::StaticAsset => "static-asset",
            TtlClass::Default => "default",
        }
    }
}

/// Path predicate for a classification rule.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Path equals one of the listed values exactly.
    Exact(&'static [&'static str]),
    /// Path starts with the prefix.
    Prefix(&'static str),
    /// File extension of the last path segment is in the set.
    Extension(&'static [&'static str]),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(paths) => paths.contains(&path),
            PathMatcher::Prefix(prefix) => path.starts_with(prefix),
            PathMatcher::Extension(exts) => {
                extension_of(path).is_some_and(|ext| exts.contains(&ext.as_str()))
            }
        }
    }
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone)]
pub struct TtlRule {
    pub matcher: PathMatcher,
    pub class: TtlClass,
}

/// Ordered, first-match-wins path classifier.
#[derive(Debug, Clone)]
pub struct TtlClassifier {
    rules: Vec<TtlRule>,
}

impl Default for TtlClassifier {
    fn default() -> Self {
        Self::extension_rules()
    }
}

impl TtlClassifier {
    /// Build a classifier from a custom rule list.
    pub fn with_rules(rules: Vec<TtlRule>) -> Self {
        Self { rules }
    }

    /// Basic preset: static assets by extension, everything else default.
    pub fn extension_rules() -> Self {
        Self::with_rules(vec![TtlRule {
            matcher: PathMatcher::Extension(STATIC_ASSET_EXTENSIONS),
            class: TtlClass::StaticAsset,
        }])
    }

    /// Storefront preset: homepage and product pages get their own classes,
    /// then a wider static-asset set. Rule order is the priority order.
    pub fn path_pattern_rules() -> Self {
        Self::with_rules(vec![
            TtlRule { matcher: PathMatcher::Exact(&["/", "/index.php"]), class: TtlClass::Homepage },
            TtlRule { matcher: PathMatcher::Prefix("/product/"), class: TtlClass::Product },
            TtlRule {
                matcher: PathMatcher::Extension(STOREFRONT_STATIC_ASSET_EXTENSIONS),
                class: TtlClass::StaticAsset,
            },
        ])
    }

    /// Classify a request path. Any query string is stripped before matching.
    pub fn classify(&self, path: &str) -> TtlClass {
        let path = path.split('?').next().unwrap_or(path);
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| rule.class)
            .unwrap_or(TtlClass::Default)
    }

    /// Classify a path and resolve its lifetime against the config.
    pub fn resolve(&self, path: &str, config: &PolicyConfig) -> (u64, &'static str) {
        let class = self.classify(path);
        (config.lifetime_for(class), class.label())
    }
}

/// Lowercased extension of the last path segment, if any.
fn extension_of(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() { None } else { Some(ext.to_ascii_lowercase()) }
}
