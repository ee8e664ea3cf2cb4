use serde::{Deserialize, Serialize};
use url::Url;

/// Describes which discovered URLs are relevant to a seeding run
///
/// A URL matches when any of the given criteria match. A relationship with
/// no criteria matches every URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRelationship {
    /// Schema type name, e.g. `Article` or `https://schema.org/Product`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    /// Path fragment, e.g. `/blog/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl SchemaRelationship {
    /// True when no criterion is set
    pub fn is_empty(&self) -> bool {
        self.schema_type().is_none()
            && self.target_path().is_none()
            && self.keywords().next().is_none()
    }

    pub fn matches(&self, url: &Url) -> bool {
        if self.is_empty() {
            return true;
        }

        let path = url.path().to_lowercase();

        if let Some(schema_type) = self.schema_type() {
            if path_tokens(&path).any(|token| token == schema_type) {
                return true;
            }
        }

        if let Some(target) = self.target_path() {
            if path.contains(&target) {
                return true;
            }
        }

        let haystack = match url.query() {
            Some(query) => format!("{}?{}", path, query.to_lowercase()),
            None => path,
        };
        self.keywords().any(|keyword| haystack.contains(&keyword))
    }

    /// Lowercased type name without any vocabulary prefix
    fn schema_type(&self) -> Option<String> {
        let raw = self.schema_type.as_deref()?.trim();
        let name = raw.rsplit(['/', '#', ':']).next().unwrap_or(raw);
        (!name.is_empty()).then(|| name.to_lowercase())
    }

    fn target_path(&self) -> Option<String> {
        let path = self.target_path.as_deref()?.trim();
        (!path.is_empty()).then(|| path.to_lowercase())
    }

    fn keywords(&self) -> impl Iterator<Item = String> + '_ {
        self.keywords
            .iter()
            .flatten()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
    }
}

/// Splits a path into alphanumeric tokens: `/news/article-12` yields
/// `news`, `article`, `12`
fn path_tokens(path: &str) -> impl Iterator<Item = &str> {
    path.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}
