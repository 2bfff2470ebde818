//! Root-relative URL resolution for images and API calls.
//!
//! The same exported site is served either from a root domain or from a fixed
//! subdirectory. The base path is decided once, when the deployment config is
//! loaded, and injected here; nothing in this module reads ambient state.

/// Placeholder shown when a work has no image reference at all.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.svg";

/// Resolves root-relative URLs against a fixed deployment base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base_path: String,
    placeholder: String,
}

impl PathResolver {
    /// Build a resolver for `base_path` (`""` for a root-domain deployment).
    ///
    /// The base path is normalized to either the empty string or a value with a
    /// single leading `/` and no trailing `/`.
    pub fn new(base_path: &str, placeholder: &str) -> Self {
        Self {
            base_path: normalize_base_path(base_path),
            placeholder: placeholder.to_string(),
        }
    }

    /// Return the normalized base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Return the prefix for API calls.
    pub fn resolve_api_base(&self) -> String {
        format!("{}/api", self.base_path)
    }

    /// Return the URL for an API endpoint such as `getGallery`.
    pub fn resolve_api_endpoint(&self, endpoint: &str) -> String {
        join_path(&self.resolve_api_base(), endpoint)
    }

    /// Resolve an image reference to the URL the page should request.
    pub fn resolve_image_path(&self, raw: Option<&str>) -> String {
        let raw = raw.unwrap_or_default();
        if raw.trim().is_empty() {
            return self.placeholder_path();
        }
        if is_external(raw) {
            return raw.to_string();
        }
        join_path(&self.base_path, raw.trim())
    }

    /// Return the base-prefixed placeholder image path.
    pub fn placeholder_path(&self) -> String {
        if is_external(&self.placeholder) {
            return self.placeholder.clone();
        }
        join_path(&self.base_path, &self.placeholder)
    }
}

/// True for references that must never be prefixed (absolute URLs, data URIs).
pub fn is_external(raw: &str) -> bool {
    raw.starts_with("http") || raw.starts_with("data:")
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("/{trimmed}")
}

/// Join `prefix` and `path` with exactly one `/` between them.
fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{prefix}/{path}")
}
