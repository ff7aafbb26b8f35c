//! File type classification
//!
//! Purely syntactic classification of files into image, video or text by
//! case-insensitive extension match. Drives the serving strategy for the
//! file-content endpoint: image and video files are passed through as raw
//! bytes, everything else is served as decoded text. No content sniffing.

use serde::Serialize;

/// Extensions served as raw image bytes
const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico"];

/// Extensions served as raw video bytes
const VIDEO_EXTENSIONS: [&str; 10] = [
    "mp4", "webm", "ogg", "avi", "mov", "mkv", "flv", "wmv", "m4v", "3gp",
];

/// Serving category of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Raster or vector image, served as raw bytes
    Image,
    /// Video container, served as raw bytes
    Video,
    /// Anything else, served as decoded text
    Text,
}

impl FileKind {
    /// Whether this kind is served as raw bytes rather than a JSON body
    pub fn serves_raw_bytes(self) -> bool {
        match self {
            FileKind::Image | FileKind::Video => true,
            FileKind::Text => false,
        }
    }

    /// Lowercase token used in JSON responses
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Text => "text",
        }
    }
}

/// Classify a path by its extension, case-insensitively
///
/// Total: every path maps to exactly one kind; unmatched suffixes are text.
pub fn classify(path: &str) -> FileKind {
    let extension = match path.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return FileKind::Text,
    };

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Image
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Video
    } else {
        FileKind::Text
    }
}

/// Content-Type header value used when serving the file as raw bytes
pub fn content_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        _ => "text/plain; charset=utf-8",
    }
}
