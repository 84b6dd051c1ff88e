use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::utils::filename::get_valid_filename;

/// Route prefix under which content files are served.
pub const DOWNLOAD_URL_PREFIX: &str = "/downloadcontent";

/// Everything but unreserved characters is escaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ===== Content records =====

/// A unit of educational content. Only the display title is needed here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContentNode {
    pub title: String,
}

impl ContentNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

/// One stored artifact of a ContentNode, addressed by checksum + extension.
///
/// The content node is shared, not owned: several files (e.g. a video and its
/// thumbnail) point at the same node and only ever read its title.
#[derive(Clone, Debug)]
pub struct File {
    pub checksum: String,
    pub extension: String,
    pub available: bool,
    pub preset: String,
    pub content_node: Arc<ContentNode>,
}

impl File {
    pub fn new(
        checksum: impl Into<String>,
        extension: impl Into<String>,
        available: bool,
        content_node: Arc<ContentNode>,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            checksum: checksum.into(),
            extension: extension.into(),
            available,
            preset: preset.into(),
            content_node,
        }
    }

    pub fn get_extension(&self) -> &str {
        &self.extension
    }

    /// Name of the artifact in content storage: `{checksum}.{extension}`.
    pub fn get_filename(&self) -> String {
        format!("{}.{}", self.checksum, self.extension)
    }

    /// Human label for the preset, falling back to the raw code when unmapped.
    pub fn get_preset_display(&self) -> &str {
        FormatPreset::label_for(&self.preset).unwrap_or(self.preset.as_str())
    }

    /// Filename offered to the browser when downloading.
    ///
    /// Built as `{title}_{preset label}` and then reduced to characters that are
    /// safe in a filename. The separator always survives, so the result is never empty.
    pub fn get_download_filename(&self) -> String {
        get_valid_filename(&format!(
            "{}_{}",
            self.content_node.title,
            self.get_preset_display()
        ))
    }

    /// `/downloadcontent/{checksum}.{extension}/{download filename}`, with the
    /// download filename percent-encoded as a path segment.
    pub fn get_download_url(&self) -> String {
        format!(
            "{}/{}/{}",
            DOWNLOAD_URL_PREFIX,
            self.get_filename(),
            utf8_percent_encode(&self.get_download_filename(), PATH_SEGMENT)
        )
    }
}

// ===== Format presets =====

/// Preset code to display label. Add a row here to support a new preset.
const FORMAT_PRESETS: &[(&str, &str)] = &[
    ("high_res_video", "High Resolution"),
    ("low_res_video", "Low Resolution"),
    ("vector_video", "Vectorized"),
    ("video_thumbnail", "Thumbnail"),
    ("video_subtitle", "Subtitle"),
    ("audio", "Audio"),
    ("audio_thumbnail", "Thumbnail"),
    ("document", "Document"),
    ("doc", "Document"),
    ("document_thumbnail", "Thumbnail"),
    ("exercise", "Exercise"),
    ("exercise_thumbnail", "Thumbnail"),
    ("exercise_image", "Exercise Image"),
    ("exercise_graphie", "Exercise Graphie"),
    ("channel_thumbnail", "Channel Thumbnail"),
    ("html5_zip", "HTML5 Zip"),
    ("html5_thumbnail", "HTML5 Thumbnail"),
];

pub struct FormatPreset;

impl FormatPreset {
    pub fn label_for(code: &str) -> Option<&'static str> {
        FORMAT_PRESETS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    pub fn codes() -> impl Iterator<Item = &'static str> {
        FORMAT_PRESETS.iter().map(|(c, _)| *c)
    }
}

// ===== Catalog persistence & API payloads =====

/// On-disk / wire form of a catalog record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContentFileRecord {
    pub checksum: String,
    pub extension: String,
    pub title: String,
    pub preset: String,
    #[serde(default)]
    pub available: bool,
}

impl From<&File> for ContentFileRecord {
    fn from(file: &File) -> Self {
        Self {
            checksum: file.checksum.clone(),
            extension: file.extension.clone(),
            title: file.content_node.title.clone(),
            preset: file.preset.clone(),
            available: file.available,
        }
    }
}

impl From<ContentFileRecord> for File {
    fn from(record: ContentFileRecord) -> Self {
        File::new(
            record.checksum,
            record.extension,
            record.available,
            Arc::new(ContentNode::new(record.title)),
            record.preset,
        )
    }
}

/// Catalog entry as returned by the listing endpoints.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContentFileEntry {
    pub checksum: String,
    pub extension: String,
    pub title: String,
    pub preset: String,
    pub available: bool,
    pub filename: String,
    pub download_filename: String,
    pub download_url: String,
}

impl From<&File> for ContentFileEntry {
    fn from(file: &File) -> Self {
        Self {
            checksum: file.checksum.clone(),
            extension: file.get_extension().to_string(),
            title: file.content_node.title.clone(),
            preset: file.preset.clone(),
            available: file.available,
            filename: file.get_filename(),
            download_filename: file.get_download_filename(),
            download_url: file.get_download_url(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ContentFilesResponse {
    pub storage_directory: String,
    pub total: usize,
    pub available: usize,
    pub files: Vec<ContentFileEntry>,
}

/// Request payload for importing a local file into content storage.
#[derive(Serialize, Deserialize)]
pub struct ImportContentFileRequest {
    /// Path of the file on the server's filesystem, inside the import root.
    pub source_path: String,
    pub title: String,
    /// Preset code, e.g. "document". Defaults to the extension when omitted.
    pub preset: Option<String>,
}

// ===== Configuration =====

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub content_storage_dir: String,
    pub catalog_file: String,
    /// Directory imports may read from. Imports are refused when unset.
    pub import_root: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            content_storage_dir: "content/storage".to_string(),
            catalog_file: "content/catalog.json".to_string(),
            import_root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> File {
        let node = Arc::new(ContentNode::new("abc123!@#$%^&*();'[],./?><"));
        File::new("f5f1e9d6bfb1c5bf4b8a4c0a8d4d52e4", "pdf", true, node, "doc")
    }

    #[test]
    fn filename_is_checksum_and_extension() {
        let f = fixture();
        assert_eq!(f.get_filename(), "f5f1e9d6bfb1c5bf4b8a4c0a8d4d52e4.pdf");
    }

    #[test]
    fn download_filename_strips_punctuation_and_appends_label() {
        assert_eq!(fixture().get_download_filename(), "abc123._Document");
    }

    #[test]
    fn download_url_joins_storage_and_display_names() {
        let f = fixture();
        assert_eq!(
            f.get_download_url(),
            format!("/downloadcontent/{}/{}", f.get_filename(), f.get_download_filename())
        );
        assert_eq!(f.get_download_url(), f.get_download_url());
    }

    #[test]
    fn label_with_spaces_becomes_underscored() {
        let node = Arc::new(ContentNode::new("Intro to Fractions"));
        let f = File::new("00", "mp4", true, node, "high_res_video");
        assert_eq!(f.get_download_filename(), "Intro_to_Fractions_High_Resolution");
    }

    #[test]
    fn unmapped_preset_uses_raw_code() {
        let node = Arc::new(ContentNode::new("Notes"));
        let f = File::new("00", "txt", true, node, "mystery");
        assert_eq!(f.get_preset_display(), "mystery");
        assert_eq!(f.get_download_filename(), "Notes_mystery");
    }

    #[test]
    fn unicode_download_url_is_percent_encoded() {
        let node = Arc::new(ContentNode::new("Números básicos"));
        let f = File::new("9dd4e461268c8034f5c8564e155c67a6", "pdf", true, node, "document");
        assert_eq!(f.get_download_filename(), "Números_básicos_Document");
        assert_eq!(
            f.get_download_url(),
            "/downloadcontent/9dd4e461268c8034f5c8564e155c67a6.pdf/N%C3%BAmeros_b%C3%A1sicos_Document"
        );
        assert!(f.get_download_url().is_ascii());
    }

    #[test]
    fn punctuation_only_title_keeps_separator() {
        let node = Arc::new(ContentNode::new("!!!"));
        let f = File::new("deadbeef", "txt", true, node, "");
        assert_eq!(f.get_download_filename(), "_");
    }

    #[test]
    fn unicode_titles_survive() {
        let node = Arc::new(ContentNode::new("  Números  básicos "));
        let f = File::new("deadbeef", "pdf", true, node, "document");
        assert_eq!(f.get_download_filename(), "Números__básicos__Document");
    }

    #[test]
    fn shared_content_node_is_not_cloned() {
        let node = Arc::new(ContentNode::new("Shared"));
        let a = File::new("aa", "mp4", true, node.clone(), "high_res_video");
        let b = File::new("bb", "png", true, node.clone(), "video_thumbnail");
        assert!(Arc::ptr_eq(&a.content_node, &b.content_node));
        assert_eq!(Arc::strong_count(&node), 3);
    }

    #[test]
    fn record_round_trip_keeps_title() {
        let f = fixture();
        let record = ContentFileRecord::from(&f);
        let back = File::from(record.clone());
        assert_eq!(back.content_node.title, f.content_node.title);
        assert_eq!(ContentFileRecord::from(&back), record);
    }

    #[test]
    fn every_preset_has_a_label() {
        for code in FormatPreset::codes() {
            assert!(FormatPreset::label_for(code).is_some());
        }
        assert_eq!(FormatPreset::label_for("doc"), Some("Document"));
    }
}
