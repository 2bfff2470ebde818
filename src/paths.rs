//! Typed paths into a site root.
//!
//! Layout:
//!
//! ```text
//! <site>/studio.json                 config
//! <site>/data/gallery.json           {works: [...]}
//! <site>/data/about.json             about page content
//! <site>/data/inquiries.json         inquiries kept when no contact-list key is set
//! <site>/data/forward_failures.jsonl forwarding failures for operators
//! <site>/public/images/              gallery images
//! <site>/public/uploads/             raw uploads
//! ```
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Canonicalize a site root, creating it first when `create` is set.
pub fn ensure_site_root(path: &Path, create: bool) -> Result<PathBuf> {
    if create {
        fs::create_dir_all(path).context("create site root")?;
    }
    path.canonicalize()
        .with_context(|| format!("resolve site root {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct SitePaths {
    root: PathBuf,
}

impl SitePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("studio.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn gallery_path(&self) -> PathBuf {
        self.data_dir().join("gallery.json")
    }

    pub fn about_path(&self) -> PathBuf {
        self.data_dir().join("about.json")
    }

    pub fn inquiries_path(&self) -> PathBuf {
        self.data_dir().join("inquiries.json")
    }

    pub fn forward_failures_path(&self) -> PathBuf {
        self.data_dir().join("forward_failures.jsonl")
    }

    /// Directory served as the site root by the static host.
    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.public_dir().join("images")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.public_dir().join("uploads")
    }
}
