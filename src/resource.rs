use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Where a page comes from: a live URL to capture, or a capture saved as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Url(Url),
    Snapshot(PathBuf),
}

#[derive(Debug, Error)]
pub enum ResourceParseError {
    #[error("Invalid URL '{value}': {message}. Hint: include http(s):// and ensure the URL is well-formed.")]
    InvalidUrl { value: String, message: String },
    #[error("Astra cannot run on '{url}'. Browser-internal pages and extension stores are restricted; try a regular website.")]
    Restricted { url: String },
    #[error("Local file not found: {path}. Hint: check the path relative to the current working directory or use an absolute path.")]
    FileNotFound { path: String },
    #[error("Unsupported file extension '{extension}'. Supported extensions: {supported}.")]
    UnsupportedExtension {
        extension: String,
        supported: String,
    },
}

const SNAPSHOT_EXTENSIONS: &[&str] = &["json"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "moz-extension://",
    "edge://",
    "about:",
    "data:",
    "file://",
];
const RESTRICTED_HOSTS: &[&str] = &[
    "chrome.google.com",
    "addons.mozilla.org",
    "microsoftedge.microsoft.com",
];

/// True for browser-internal schemes, extension stores, and anything that
/// does not parse as a URL.
pub fn is_restricted_url(value: &str) -> bool {
    if RESTRICTED_PREFIXES.iter().any(|p| value.starts_with(p)) {
        return true;
    }
    match Url::parse(value) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("");
            RESTRICTED_HOSTS.iter().any(|r| host.contains(r))
        }
        Err(_) => true,
    }
}

/// Classifies a page argument: `http(s)://` values are URLs, everything else
/// is a path to a saved capture.
pub fn parse_page_source(value: &str) -> Result<PageSource, ResourceParseError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return parse_url(value).map(PageSource::Url);
    }
    if RESTRICTED_PREFIXES.iter().any(|p| value.starts_with(p)) {
        return Err(ResourceParseError::Restricted {
            url: value.to_string(),
        });
    }
    existing_file(value, SNAPSHOT_EXTENSIONS).map(PageSource::Snapshot)
}

pub fn parse_url(value: &str) -> Result<Url, ResourceParseError> {
    let url = Url::parse(value).map_err(|e| ResourceParseError::InvalidUrl {
        value: value.to_string(),
        message: e.to_string(),
    })?;
    if is_restricted_url(url.as_str()) {
        return Err(ResourceParseError::Restricted {
            url: value.to_string(),
        });
    }
    Ok(url)
}

/// Validates a design image path for design analysis.
pub fn parse_design_image(value: &str) -> Result<PathBuf, ResourceParseError> {
    existing_file(value, IMAGE_EXTENSIONS)
}

fn existing_file(value: &str, allowed: &[&str]) -> Result<PathBuf, ResourceParseError> {
    let path = Path::new(value);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !allowed.contains(&extension.as_str()) {
        return Err(ResourceParseError::UnsupportedExtension {
            extension: if extension.is_empty() {
                "no extension".to_string()
            } else {
                extension
            },
            supported: allowed.join(", "),
        });
    }

    let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Err(ResourceParseError::FileNotFound {
            path: path.to_string_lossy().into_owned(),
        });
    }

    Ok(path.to_path_buf())
}
