//! Preview dispatch for uploaded files
//!
//! A file is classified once into a closed [`FileKind`] and each kind has its
//! own handler. Decoding or conversion failures never escape: they become
//! [`Preview::Failed`], which the panel shows next to a download button.

use thiserror::Error;

use crate::converter::{self, ConvertError};
use crate::data_url::{DataUrl, DataUrlError, is_data_url};
use crate::resources::FileResource;

/// Why a file cannot be previewed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsupportedReason {
    LegacyWord,
    LegacyExcel,
    Unknown,
}

/// Supported preview formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Word,
    Excel,
    Unsupported(UnsupportedReason),
}

impl FileKind {
    /// Classify a file by name and declared MIME type
    ///
    /// Precedence: image MIME, then PDF, then modern Word (`.docx`), then
    /// modern Excel (`.xlsx`). Legacy `.doc`/`.xls` files and anything else
    /// are unsupported.
    ///
    /// # Examples
    /// ```
    /// use todo_web::preview::{FileKind, UnsupportedReason};
    ///
    /// assert_eq!(FileKind::classify("cat.png", "image/png"), FileKind::Image);
    /// assert_eq!(FileKind::classify("plan.docx", ""), FileKind::Word);
    /// assert_eq!(
    ///     FileKind::classify("old.xls", "application/vnd.ms-excel"),
    ///     FileKind::Unsupported(UnsupportedReason::LegacyExcel)
    /// );
    /// ```
    pub fn classify(name: &str, mime: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let mime = mime.to_ascii_lowercase();

        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.contains("pdf") || name.ends_with(".pdf") {
            FileKind::Pdf
        } else if name.ends_with(".docx") || mime.contains("wordprocessingml") {
            FileKind::Word
        } else if name.ends_with(".xlsx") || mime.contains("spreadsheetml") {
            FileKind::Excel
        } else if name.ends_with(".doc") || mime == "application/msword" {
            FileKind::Unsupported(UnsupportedReason::LegacyWord)
        } else if name.ends_with(".xls") || mime.contains("ms-excel") {
            FileKind::Unsupported(UnsupportedReason::LegacyExcel)
        } else {
            FileKind::Unsupported(UnsupportedReason::Unknown)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
            FileKind::Word => "word",
            FileKind::Excel => "excel",
            FileKind::Unsupported(_) => "unsupported",
        }
    }

    /// Icon shown next to the file in the resource pool
    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Word | FileKind::Unsupported(UnsupportedReason::LegacyWord) => "📝",
            FileKind::Excel | FileKind::Unsupported(UnsupportedReason::LegacyExcel) => "📊",
            FileKind::Pdf => "📄",
            FileKind::Image => "🖼️",
            FileKind::Unsupported(UnsupportedReason::Unknown) => "📎",
        }
    }
}

/// Where the PDF viewer loads its document from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PdfSource {
    /// Decoded content, to be served from a blob URL
    Bytes(Vec<u8>),
    /// A URL the viewer can load directly
    Url(String),
}

/// Result of preparing a file for preview
#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    Image { src: String },
    Pdf(PdfSource),
    Document { html: String },
    Sheet { rows: Vec<Vec<String>> },
    Unsupported(UnsupportedReason),
    Failed { message: String },
}

#[derive(Debug, Error)]
enum PreviewError {
    #[error(transparent)]
    DataUrl(#[from] DataUrlError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

const WORD_FAILED: &str = "Unable to preview this Word document, please download it to view";
const EXCEL_FAILED: &str = "Unable to preview this Excel file, please download it to view";
const FILE_FAILED: &str = "File processing failed";

/// Prepare a preview for a file
///
/// This may decode and convert the whole file, so callers on an async runtime
/// should run it on a blocking thread.
///
/// # Arguments
/// * `resource` - The file to preview
///
/// # Returns
/// * `Preview` - What the panel should show
pub fn render(resource: &FileResource) -> Preview {
    let kind = resource.kind();
    let result = match kind {
        FileKind::Image => Ok(preview_image(resource)),
        FileKind::Pdf => preview_pdf(resource),
        FileKind::Word => preview_word(resource),
        FileKind::Excel => preview_excel(resource),
        FileKind::Unsupported(reason) => Ok(Preview::Unsupported(reason)),
    };

    result.unwrap_or_else(|e| {
        log::warn!("Preview of {} failed: {}", resource.name, e);
        let message = match kind {
            FileKind::Word => WORD_FAILED,
            FileKind::Excel => EXCEL_FAILED,
            _ => FILE_FAILED,
        };
        Preview::Failed {
            message: message.to_string(),
        }
    })
}

fn preview_image(resource: &FileResource) -> Preview {
    Preview::Image {
        src: resource.url.clone(),
    }
}

// Inline PDFs are handed out through a blob URL rather than embedding the
// whole data URL in the frame.
fn preview_pdf(resource: &FileResource) -> Result<Preview, PreviewError> {
    if is_data_url(&resource.url) {
        let data = DataUrl::parse(&resource.url)?;
        Ok(Preview::Pdf(PdfSource::Bytes(data.bytes)))
    } else {
        Ok(Preview::Pdf(PdfSource::Url(resource.url.clone())))
    }
}

fn preview_word(resource: &FileResource) -> Result<Preview, PreviewError> {
    let data = DataUrl::parse(&resource.url)?;
    let html = converter::docx_to_html(&data.bytes)?;
    Ok(Preview::Document { html })
}

fn preview_excel(resource: &FileResource) -> Result<Preview, PreviewError> {
    let data = DataUrl::parse(&resource.url)?;
    let rows = converter::xlsx_to_grid(&data.bytes)?;
    Ok(Preview::Sheet { rows })
}
