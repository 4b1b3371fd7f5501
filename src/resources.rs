use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::data_url::DataUrl;
use crate::preview::FileKind;

/// Extensions the upload form accepts
pub const ACCEPTED_EXTENSIONS: [&str; 8] = ["doc", "docx", "xls", "xlsx", "pdf", "jpg", "jpeg", "png"];

/// Errors raised by [`ResourcePool`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),

    #[error("File {0} not found")]
    NotFound(u64),
}

/// An uploaded file held in memory for preview
///
/// The content lives inside `url` as a base64 data URL; nothing is written to
/// disk.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl FileResource {
    pub fn kind(&self) -> FileKind {
        FileKind::classify(&self.name, &self.mime)
    }
}

/// Listing entry for the resource pool, without the file content
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub uploaded_at: DateTime<Utc>,
    pub icon: &'static str,
    pub size: usize,
}

impl From<&FileResource> for ResourceSummary {
    fn from(resource: &FileResource) -> Self {
        let size = DataUrl::parse(&resource.url)
            .map(|data| data.bytes.len())
            .unwrap_or(0);
        ResourceSummary {
            id: resource.id,
            name: resource.name.clone(),
            mime: resource.mime.clone(),
            uploaded_at: resource.uploaded_at,
            icon: resource.kind().icon(),
            size,
        }
    }
}

/// The uploaded files of one browser session
#[derive(Debug)]
pub struct ResourcePool {
    files: Vec<FileResource>,
    next_id: u64,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    pub fn new() -> Self {
        ResourcePool {
            files: Vec::new(),
            next_id: 1,
        }
    }

    pub fn list(&self) -> &[FileResource] {
        &self.files
    }

    /// Add an uploaded file to the pool
    ///
    /// A missing or generic MIME type is replaced by the one implied by the
    /// file extension.
    ///
    /// # Arguments
    /// * `name` - Original file name
    /// * `mime` - Declared MIME type, if any
    /// * `bytes` - File content
    ///
    /// # Errors
    /// * `ResourceError::UnsupportedExtension` if the extension is not in
    ///   [`ACCEPTED_EXTENSIONS`]
    pub fn add(
        &mut self,
        name: &str,
        mime: Option<&str>,
        bytes: &[u8],
    ) -> Result<FileResource, ResourceError> {
        let extension = check_extension(name)?;
        let mime = match mime.map(str::trim) {
            Some(declared) if !declared.is_empty() && declared != "application/octet-stream" => {
                declared.to_string()
            }
            _ => mime_for_extension(&extension).to_string(),
        };

        let resource = FileResource {
            id: self.next_id,
            name: name.to_string(),
            url: DataUrl::encode(&mime, bytes),
            mime,
            uploaded_at: Utc::now(),
        };
        self.next_id += 1;
        self.files.push(resource.clone());

        log::debug!("Stored file {} ({} bytes)", resource.name, bytes.len());
        Ok(resource)
    }

    pub fn get(&self, id: u64) -> Result<&FileResource, ResourceError> {
        self.files
            .iter()
            .find(|file| file.id == id)
            .ok_or(ResourceError::NotFound(id))
    }

    pub fn remove(&mut self, id: u64) -> Result<FileResource, ResourceError> {
        let index = self
            .files
            .iter()
            .position(|file| file.id == id)
            .ok_or(ResourceError::NotFound(id))?;
        Ok(self.files.remove(index))
    }
}

/// Lower-cased extension of a file name, without the dot
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn check_extension(name: &str) -> Result<String, ResourceError> {
    match extension_of(name) {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(ResourceError::UnsupportedExtension(name.to_string())),
    }
}

/// MIME type implied by an accepted extension
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_encodes_content_as_data_url() {
        let mut pool = ResourcePool::new();
        let file = pool.add("notes.pdf", Some("application/pdf"), b"%PDF").unwrap();

        assert_eq!(file.id, 1);
        assert_eq!(file.url, "data:application/pdf;base64,JVBERg==");
        assert_eq!(pool.list().len(), 1);
    }

    #[test]
    fn add_infers_mime_when_missing_or_generic() {
        let mut pool = ResourcePool::new();
        let a = pool.add("photo.JPG", None, b"x").unwrap();
        let b = pool
            .add("sheet.xlsx", Some("application/octet-stream"), b"x")
            .unwrap();

        assert_eq!(a.mime, "image/jpeg");
        assert_eq!(
            b.mime,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn add_rejects_unlisted_extensions() {
        let mut pool = ResourcePool::new();
        assert_eq!(
            pool.add("script.sh", None, b"x"),
            Err(ResourceError::UnsupportedExtension("script.sh".to_string()))
        );
        assert!(pool.add("README", None, b"x").is_err());
        assert!(pool.add(".pdf", None, b"x").is_err());
        assert!(pool.list().is_empty());
    }

    #[test]
    fn get_and_remove_by_id() {
        let mut pool = ResourcePool::new();
        let a = pool.add("a.png", Some("image/png"), b"a").unwrap();
        let b = pool.add("b.png", Some("image/png"), b"b").unwrap();

        assert_eq!(pool.get(b.id).unwrap().name, "b.png");
        assert_eq!(pool.remove(a.id).unwrap().name, "a.png");
        assert_eq!(pool.get(a.id), Err(ResourceError::NotFound(a.id)));
        assert_eq!(pool.remove(a.id), Err(ResourceError::NotFound(a.id)));
    }

    #[test]
    fn summary_omits_content_and_reports_size() {
        let mut pool = ResourcePool::new();
        let file = pool.add("report.docx", None, b"12345").unwrap();
        let summary = ResourceSummary::from(&file);

        assert_eq!(summary.size, 5);
        assert_eq!(summary.icon, "📝");
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("url").is_none());
        assert_eq!(value["type"], file.mime);
        assert!(value.get("uploadedAt").is_some());
    }

    #[test]
    fn extension_of_handles_edge_cases() {
        assert_eq!(extension_of("a.tar.XLSX"), Some("xlsx".to_string()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
