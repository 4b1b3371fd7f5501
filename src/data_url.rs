use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Errors raised while decoding a `data:` URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,

    #[error("data URL has no payload separator")]
    MissingPayload,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// A decoded `data:<mime>[;base64],<payload>` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Decode a data URL into its MIME type and raw bytes
    ///
    /// Base64 payloads are decoded with the standard alphabet; anything else
    /// is taken as literal text.
    ///
    /// # Examples
    /// ```
    /// use todo_web::data_url::DataUrl;
    ///
    /// let url = DataUrl::parse("data:text/plain;base64,aGVsbG8=").unwrap();
    /// assert_eq!(url.mime, "text/plain");
    /// assert_eq!(url.bytes, b"hello");
    /// ```
    pub fn parse(url: &str) -> Result<Self, DataUrlError> {
        let rest = url.strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;

        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim().to_string();
        let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        let bytes = if is_base64 {
            // Browsers may wrap long payloads
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))?
        } else {
            payload.as_bytes().to_vec()
        };

        Ok(DataUrl { mime, bytes })
    }

    /// Encode bytes as a base64 data URL
    pub fn encode(mime: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
    }
}

/// Whether a URL carries its content inline
pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}
