//! Image display with an ordered fallback chain.
//!
//! A loader starts on the primary source and moves a cursor forward through a
//! finite fallback list every time the displayed source fails. The cursor never
//! moves backwards, so a failed URL is never requested twice and a loader
//! settles after at most `fallbacks + 1` attempts.
use crate::resolver::{is_external, PathResolver};
use std::collections::BTreeSet;
use std::path::Path;

/// Inline SVG used as the guaranteed-available last resort.
pub const INLINE_PLACEHOLDER: &str = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20width%3D%22400%22%20height%3D%22300%22%3E%3Crect%20width%3D%22400%22%20height%3D%22300%22%20fill%3D%22%23eeeeee%22%2F%3E%3C%2Fsvg%3E";

/// Placeholder served from the site root regardless of deployment base path.
pub const BARE_PLACEHOLDER: &str = "/placeholder.jpg";

/// Build the site's standard fallback list for a deployment.
///
/// Order: base-prefixed placeholder variants, the bare placeholder, the inline
/// image.
pub fn fallback_chain(resolver: &PathResolver) -> Vec<String> {
    vec![
        resolver.placeholder_path(),
        resolver.resolve_image_path(Some("/images/placeholder.jpg")),
        BARE_PLACEHOLDER.to_string(),
        INLINE_PLACEHOLDER.to_string(),
    ]
}

/// What the loader currently wants on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDisplay<'a> {
    /// Render an image element with this source.
    Source(&'a str),
    /// Every source failed; render the caller-supplied alternative element.
    Alternative,
    /// Every source failed and no alternative was supplied; render nothing.
    Hidden,
}

/// Cursor over a primary source and its fallbacks.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    primary: String,
    fallbacks: Vec<String>,
    // -1 is the primary source.
    attempt_index: isize,
    has_alternative: bool,
}

impl ImageLoader {
    /// Create a loader; fallbacks equal to the primary or to an earlier entry
    /// are dropped so the chain never repeats a URL.
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>) -> Self {
        let primary = primary.into();
        let mut seen = BTreeSet::new();
        seen.insert(primary.clone());
        let fallbacks = fallbacks
            .into_iter()
            .filter(|candidate| seen.insert(candidate.clone()))
            .collect();
        Self {
            primary,
            fallbacks,
            attempt_index: -1,
            has_alternative: false,
        }
    }

    /// Render a caller-supplied element once the chain is exhausted.
    pub fn with_alternative(mut self) -> Self {
        self.has_alternative = true;
        self
    }

    pub fn attempt_index(&self) -> isize {
        self.attempt_index
    }

    /// Number of distinct sources this loader may try.
    pub fn max_attempts(&self) -> usize {
        self.fallbacks.len() + 1
    }

    /// True once every source has failed.
    pub fn is_exhausted(&self) -> bool {
        self.attempt_index >= self.fallbacks.len() as isize
    }

    pub fn current(&self) -> ImageDisplay<'_> {
        if self.attempt_index < 0 {
            return ImageDisplay::Source(&self.primary);
        }
        match self.fallbacks.get(self.attempt_index as usize) {
            Some(source) => ImageDisplay::Source(source),
            None if self.has_alternative => ImageDisplay::Alternative,
            None => ImageDisplay::Hidden,
        }
    }

    /// Record that the displayed source failed to load.
    ///
    /// Returns the new display, or `None` when the chain was already exhausted
    /// and nothing changes.
    pub fn fail(&mut self) -> Option<ImageDisplay<'_>> {
        if self.is_exhausted() {
            return None;
        }
        let failed = self.current_source().unwrap_or_default().to_string();
        self.attempt_index += 1;
        tracing::warn!(source = %failed, attempt = self.attempt_index, "image failed to load");
        Some(self.current())
    }

    fn current_source(&self) -> Option<&str> {
        match self.current() {
            ImageDisplay::Source(source) => Some(source),
            _ => None,
        }
    }
}

/// Outcome of driving a loader against an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledImage {
    /// Every source requested, in order.
    pub attempts: Vec<String>,
    /// The source finally shown, if any.
    pub shown: Option<String>,
    /// True when the alternative element is rendered instead of an image.
    pub alternative: bool,
}

/// Drive `loader` until a source loads or the chain is exhausted.
pub fn probe_until_settled<F>(loader: &mut ImageLoader, mut loads: F) -> SettledImage
where
    F: FnMut(&str) -> bool,
{
    let mut attempts = Vec::new();
    loop {
        let source = match loader.current() {
            ImageDisplay::Source(source) => source.to_string(),
            ImageDisplay::Alternative => {
                return SettledImage {
                    attempts,
                    shown: None,
                    alternative: true,
                }
            }
            ImageDisplay::Hidden => {
                return SettledImage {
                    attempts,
                    shown: None,
                    alternative: false,
                }
            }
        };
        attempts.push(source.clone());
        if loads(&source) {
            return SettledImage {
                attempts,
                shown: Some(source),
                alternative: false,
            };
        }
        loader.fail();
    }
}

/// Availability check for a statically exported site on local disk.
///
/// External URLs and data URIs are assumed reachable; root-relative paths are
/// looked up under `public_dir` after stripping the deployment base path.
pub fn local_file_probe<'a>(
    public_dir: &'a Path,
    resolver: &'a PathResolver,
) -> impl Fn(&str) -> bool + 'a {
    move |source: &str| {
        if is_external(source) {
            return true;
        }
        let relative = source
            .strip_prefix(resolver.base_path())
            .unwrap_or(source)
            .trim_start_matches('/');
        !relative.is_empty() && public_dir.join(relative).is_file()
    }
}
