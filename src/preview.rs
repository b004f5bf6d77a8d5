//! Local preview of the selected video.
//!
//! Built synchronously from file metadata the moment a file is picked, so the
//! preview never waits on (or depends on) the upload.

use std::path::{Path, PathBuf};

/// What the UI shows about the selected file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPreview {
    pub path: PathBuf,
    pub file_name: String,
    /// `None` when the metadata could not be read; the upload will report
    /// the actual error.
    pub size_bytes: Option<u64>,
    /// Lower-cased extension without the dot.
    pub extension: Option<String>,
}

impl VideoPreview {
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size_bytes = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => None,
            Err(e) => {
                log::warn!("preview: cannot read metadata for {}: {e}", path.display());
                None
            }
        };

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());

        Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes,
            extension,
        }
    }

    /// `"Selected: <name>"`, as shown above the preview.
    pub fn selected_label(&self) -> String {
        format!("Selected: {}", self.file_name)
    }

    /// Human-readable size, or `"unknown size"`.
    pub fn size_label(&self) -> String {
        match self.size_bytes {
            Some(bytes) => human_size(bytes),
            None => "unknown size".into(),
        }
    }

    /// MIME type sent with the multipart upload, guessed from the extension.
    pub fn content_type(&self) -> &'static str {
        content_type_for(self.extension.as_deref())
    }
}

pub(crate) fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("ogv") => "video/ogg",
        _ => "application/octet-stream",
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1} GB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn preview_reads_local_metadata() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("Derby.MP4");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(&[0u8; 2048]).expect("write");
        drop(file);

        let preview = VideoPreview::from_path(&path);
        assert_eq!(preview.file_name, "Derby.MP4");
        assert_eq!(preview.size_bytes, Some(2048));
        assert_eq!(preview.extension.as_deref(), Some("mp4"));
        assert_eq!(preview.content_type(), "video/mp4");
        assert_eq!(preview.selected_label(), "Selected: Derby.MP4");
        assert_eq!(preview.size_label(), "2.0 KB");
    }

    #[test]
    fn missing_file_still_previews_name() {
        let preview = VideoPreview::from_path(Path::new("/definitely/not/here/match.webm"));
        assert_eq!(preview.file_name, "match.webm");
        assert_eq!(preview.size_bytes, None);
        assert_eq!(preview.size_label(), "unknown size");
        assert_eq!(preview.content_type(), "video/webm");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(content_type_for(Some("xyz")), "application/octet-stream");
        assert_eq!(content_type_for(None), "application/octet-stream");
    }

    #[test]
    fn sizes_scale() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
