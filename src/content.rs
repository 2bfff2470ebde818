//! Flat-file content store for gallery works, the about page, and uploads.
//!
//! Writes overwrite the whole file; concurrent admin saves are last-write-wins.
use crate::paths::SitePaths;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    #[default]
    Available,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryWork {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub dimensions: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub status: WorkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Keys this version does not know about, kept on round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryFile {
    pub works: Vec<GalleryWork>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exhibition {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AboutContact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_image: Option<String>,
    #[serde(default)]
    pub bio: Vec<String>,
    #[serde(default)]
    pub exhibitions: Vec<Exhibition>,
    #[serde(default)]
    pub contact: AboutContact,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create data dir")?;
    }
    let text = serde_json::to_string_pretty(value).context("serialize content")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn load_gallery(paths: &SitePaths) -> Result<GalleryFile> {
    let path = paths.gallery_path();
    if !path.is_file() {
        return Err(anyhow!("Gallery data not found"));
    }
    let bytes = fs::read(&path).with_context(|| format!("read gallery {}", path.display()))?;
    serde_json::from_slice(&bytes).context("parse gallery JSON")
}

/// Parse an admin-submitted gallery body; it must carry a `works` array.
pub fn parse_gallery_body(raw: &str) -> Result<GalleryFile> {
    let value: Value = serde_json::from_str(raw).context("Invalid gallery data format")?;
    if !value.get("works").is_some_and(Value::is_array) {
        return Err(anyhow!("Invalid gallery data format"));
    }
    serde_json::from_value(value).context("Invalid gallery data format")
}

pub fn save_gallery(paths: &SitePaths, gallery: &GalleryFile) -> Result<()> {
    write_pretty(&paths.gallery_path(), gallery)
}

/// Fields an admin supplies when adding a work.
#[derive(Debug, Clone, Default)]
pub struct WorkDraft {
    pub title: String,
    pub year: String,
    pub medium: String,
    pub dimensions: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub status: WorkStatus,
    pub price: Option<String>,
}

/// Append a work with the next `work-NNN` id and return that id.
pub fn add_work(gallery: &mut GalleryFile, draft: WorkDraft) -> Result<String> {
    if draft.title.trim().is_empty() || draft.category.trim().is_empty() {
        return Err(anyhow!("Title and category are required"));
    }
    let id = next_work_id(gallery);
    // Sold works never advertise a price.
    let price = match draft.status {
        WorkStatus::Sold => None,
        WorkStatus::Available => draft.price.filter(|price| !price.trim().is_empty()),
    };
    gallery.works.push(GalleryWork {
        id: id.clone(),
        title: draft.title.trim().to_string(),
        year: draft.year,
        medium: draft.medium,
        dimensions: draft.dimensions,
        category: draft.category.trim().to_string(),
        description: draft.description,
        image_url: draft.image_url,
        status: draft.status,
        price,
        extra: Map::new(),
    });
    Ok(id)
}

fn next_work_id(gallery: &GalleryFile) -> String {
    let mut number = gallery.works.len() + 1;
    loop {
        let candidate = format!("work-{number:03}");
        if !gallery.works.iter().any(|work| work.id == candidate) {
            return candidate;
        }
        number += 1;
    }
}

/// Remove the work with `id`; returns the removed work.
pub fn remove_work(gallery: &mut GalleryFile, id: &str) -> Result<GalleryWork> {
    let position = gallery
        .works
        .iter()
        .position(|work| work.id == id)
        .ok_or_else(|| anyhow!("no work with id {id:?}"))?;
    Ok(gallery.works.remove(position))
}

pub fn load_about(paths: &SitePaths) -> Result<AboutData> {
    let path = paths.about_path();
    if !path.is_file() {
        return Err(anyhow!("About data file not found"));
    }
    let bytes = fs::read(&path).with_context(|| format!("read about {}", path.display()))?;
    serde_json::from_slice(&bytes).context("Invalid JSON format in about data")
}

/// Parse an admin-submitted about body; it must be a JSON object.
pub fn parse_about_body(raw: &str) -> Result<AboutData> {
    let value: Value = serde_json::from_str(raw).context("Invalid data format")?;
    if !value.is_object() {
        return Err(anyhow!("Invalid data format"));
    }
    serde_json::from_value(value).context("Invalid data format")
}

pub fn save_about(paths: &SitePaths, about: &AboutData) -> Result<()> {
    write_pretty(&paths.about_path(), about)
}

/// Accepted upload extensions and their content types.
pub const ALLOWED_IMAGE_TYPES: [(&str, &str); 4] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Copy an image into `public/images` under a generated name and return the
/// root-relative path stored in gallery records.
pub fn upload_image(paths: &SitePaths, source: &Path) -> Result<String> {
    let extension = source
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_IMAGE_TYPES.iter().any(|(allowed, _)| allowed == ext))
        .ok_or_else(|| anyhow!("Invalid file type. Only JPEG, PNG, and GIF are allowed."))?;
    let metadata = fs::metadata(source)
        .with_context(|| format!("No image file provided: {}", source.display()))?;
    if !metadata.is_file() {
        return Err(anyhow!("No image file provided: {}", source.display()));
    }
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err(anyhow!(
            "Image is {} bytes; the limit is {MAX_UPLOAD_BYTES}",
            metadata.len()
        ));
    }

    let images_dir = paths.images_dir();
    fs::create_dir_all(&images_dir).context("create images dir")?;
    fs::create_dir_all(paths.uploads_dir()).context("create uploads dir")?;

    let mut file_name = format!("work-{}.{extension}", unique_suffix()?);
    while images_dir.join(&file_name).exists() {
        file_name = format!("work-{}.{extension}", unique_suffix()?);
    }
    let destination = images_dir.join(&file_name);
    fs::copy(source, &destination)
        .with_context(|| format!("copy {} to {}", source.display(), destination.display()))?;
    tracing::info!(file = %file_name, bytes = metadata.len(), "image uploaded");
    Ok(format!("/images/{file_name}"))
}

/// Base-36 seconds followed by three base-36 characters from the sub-second
/// clock.
fn unique_suffix() -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("clock before epoch")?;
    let seconds = to_base36(now.as_secs());
    let tail = to_base36(u64::from(now.subsec_nanos()) % (36 * 36 * 36));
    Ok(format!("{seconds}{tail:0>3}"))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadListing {
    pub exists: bool,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// List regular files in `public/uploads`.
pub fn list_uploads(paths: &SitePaths) -> Result<UploadListing> {
    let dir = paths.uploads_dir();
    if !dir.is_dir() {
        return Ok(UploadListing {
            exists: false,
            files: Vec::new(),
            error: Some("Uploads directory does not exist".to_string()),
        });
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.context("read uploads entry")?;
        if entry.path().is_file() {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    files.sort();
    Ok(UploadListing {
        exists: true,
        files,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_site() -> (tempfile::TempDir, SitePaths) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let paths = SitePaths::new(dir.path().to_path_buf());
        (dir, paths)
    }

    fn draft(title: &str, category: &str) -> WorkDraft {
        WorkDraft {
            title: title.to_string(),
            category: category.to_string(),
            ..WorkDraft::default()
        }
    }

    #[test]
    fn missing_gallery_is_reported() {
        let (_dir, paths) = temp_site();
        let err = load_gallery(&paths).expect_err("missing gallery");
        assert_eq!(err.to_string(), "Gallery data not found");
    }

    #[test]
    fn gallery_keeps_unknown_keys() {
        let (_dir, paths) = temp_site();
        let gallery = parse_gallery_body(
            r#"{"works": [{"id": "work-001", "title": "Tide", "imageUrl": "/images/tide.jpg",
                "status": "sold", "featured": true}]}"#,
        )
        .expect("parse gallery");
        save_gallery(&paths, &gallery).expect("save gallery");
        let loaded = load_gallery(&paths).expect("load gallery");
        assert_eq!(loaded, gallery);
        assert_eq!(loaded.works[0].status, WorkStatus::Sold);
        assert_eq!(loaded.works[0].extra.get("featured"), Some(&Value::Bool(true)));
    }

    #[test]
    fn gallery_body_requires_works_array() {
        assert!(parse_gallery_body(r#"{"works": {}}"#).is_err());
        assert!(parse_gallery_body(r#"[]"#).is_err());
        assert!(parse_gallery_body("nope").is_err());
        assert!(parse_gallery_body(r#"{"works": []}"#).is_ok());
    }

    #[test]
    fn add_work_generates_sequential_ids() {
        let mut gallery = GalleryFile::default();
        assert_eq!(add_work(&mut gallery, draft("Tide", "painting")).expect("add"), "work-001");
        assert_eq!(add_work(&mut gallery, draft("Dune", "sculpture")).expect("add"), "work-002");
        remove_work(&mut gallery, "work-001").expect("remove");
        assert_eq!(add_work(&mut gallery, draft("Kelp", "painting")).expect("add"), "work-003");
    }

    #[test]
    fn add_work_requires_title_and_category() {
        let mut gallery = GalleryFile::default();
        let err = add_work(&mut gallery, draft("Tide", " ")).expect_err("missing category");
        assert_eq!(err.to_string(), "Title and category are required");
        assert!(gallery.works.is_empty());
    }

    #[test]
    fn sold_work_drops_price() {
        let mut gallery = GalleryFile::default();
        let mut sold = draft("Tide", "painting");
        sold.status = WorkStatus::Sold;
        sold.price = Some("$12,000".to_string());
        add_work(&mut gallery, sold).expect("add");
        assert_eq!(gallery.works[0].price, None);
    }

    #[test]
    fn remove_unknown_work_fails() {
        let mut gallery = GalleryFile::default();
        assert!(remove_work(&mut gallery, "work-404").is_err());
    }

    #[test]
    fn about_round_trips_with_extra_fields() {
        let (_dir, paths) = temp_site();
        let about = parse_about_body(
            r#"{"artistImage": "/images/artist.jpg", "bio": ["One", "Two"],
                "exhibitions": [{"year": "2021", "details": "Solo show"}],
                "contact": {"email": "studio@example.com", "message": "Write to us"},
                "press": ["Review"]}"#,
        )
        .expect("parse about");
        save_about(&paths, &about).expect("save about");
        let loaded = load_about(&paths).expect("load about");
        assert_eq!(loaded, about);
        assert_eq!(loaded.bio.len(), 2);
        assert!(loaded.extra.contains_key("press"));
        assert!(parse_about_body("[1, 2]").is_err());
    }

    #[test]
    fn upload_copies_allowed_images() {
        let (dir, paths) = temp_site();
        let source = dir.path().join("Photo.JPG");
        fs::write(&source, b"jpeg bytes").expect("write source");
        let stored = upload_image(&paths, &source).expect("upload");
        assert!(stored.starts_with("/images/work-"));
        assert!(stored.ends_with(".jpg"));
        let on_disk = paths.public_dir().join(stored.trim_start_matches('/'));
        assert_eq!(fs::read(on_disk).expect("read stored"), b"jpeg bytes");
    }

    #[test]
    fn upload_rejects_other_types() {
        let (dir, paths) = temp_site();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"text").expect("write source");
        let err = upload_image(&paths, &source).expect_err("wrong type");
        assert!(err.to_string().starts_with("Invalid file type"));
    }

    #[test]
    fn uploads_listing_reports_missing_dir() {
        let (_dir, paths) = temp_site();
        let listing = list_uploads(&paths).expect("list uploads");
        assert!(!listing.exists);

        fs::create_dir_all(paths.uploads_dir()).expect("create uploads");
        fs::write(paths.uploads_dir().join("b.png"), b"b").expect("write b");
        fs::write(paths.uploads_dir().join("a.png"), b"a").expect("write a");
        fs::create_dir_all(paths.uploads_dir().join("nested")).expect("create nested");
        let listing = list_uploads(&paths).expect("list uploads");
        assert!(listing.exists);
        assert_eq!(listing.files, vec!["a.png", "b.png"]);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
