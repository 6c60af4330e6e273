use serde::{Deserialize, Serialize};

/// File type categories for filtering and color mapping.
/// Display data (colors, icons, labels) lives in the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    Directory,
    /// Images: jpg, png, gif, heic, svg, ...
    Image,
    /// Video: mp4, mov, mkv, webm, ...
    Video,
    /// Audio: mp3, wav, flac, aac, ...
    Audio,
    /// Documents: pdf, docx, txt, xlsx, ...
    Document,
    /// Source code and markup: rs, swift, py, html, ...
    Code,
    /// Archives: zip, tar, dmg, 7z, ...
    Archive,
    /// Executables and bundles: exe, app, bin, ...
    Executable,
    /// System and config files: plist, dylib, log, ...
    System,
    /// Unknown / no extension
    Other,
}

impl FileCategory {
    /// Every category, in display order.
    pub fn all() -> [FileCategory; 10] {
        [
            FileCategory::Directory,
            FileCategory::Image,
            FileCategory::Video,
            FileCategory::Audio,
            FileCategory::Document,
            FileCategory::Code,
            FileCategory::Archive,
            FileCategory::Executable,
            FileCategory::System,
            FileCategory::Other,
        ]
    }
}

/// Classify a file extension into a category.
pub fn categorize_extension(ext: &str) -> FileCategory {
    match ext.to_ascii_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "tif"
        | "raw" | "cr2" | "nef" | "heic" | "heif" | "avif" | "psd" => FileCategory::Image,

        // Video
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg"
        | "3gp" => FileCategory::Video,

        // Audio
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "aiff" | "opus" | "mid"
        | "midi" => FileCategory::Audio,

        // Documents
        "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "pages" | "xls" | "xlsx" | "numbers"
        | "ppt" | "pptx" | "key" | "csv" | "md" | "epub" => FileCategory::Document,

        // Code
        "rs" | "swift" | "py" | "js" | "jsx" | "ts" | "tsx" | "c" | "cpp" | "h" | "hpp"
        | "m" | "mm" | "java" | "go" | "rb" | "php" | "html" | "htm" | "css" | "scss"
        | "kt" | "cs" | "lua" | "sh" | "sql" | "json" | "xml" | "yaml" | "yml" | "toml" => {
            FileCategory::Code
        }

        // Archives
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "zst" | "dmg" | "iso" => {
            FileCategory::Archive
        }

        // Executables
        "exe" | "app" | "msi" | "bat" | "cmd" | "com" | "bin" | "command" | "pkg" => {
            FileCategory::Executable
        }

        // System / config
        "plist" | "dylib" | "so" | "dll" | "sys" | "kext" | "framework" | "ini" | "cfg"
        | "conf" | "log" | "tmp" | "cache" | "lock" => FileCategory::System,

        _ => FileCategory::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_common_extensions() {
        assert_eq!(categorize_extension("png"), FileCategory::Image);
        assert_eq!(categorize_extension("PNG"), FileCategory::Image);
        assert_eq!(categorize_extension("mov"), FileCategory::Video);
        assert_eq!(categorize_extension("swift"), FileCategory::Code);
        assert_eq!(categorize_extension("dmg"), FileCategory::Archive);
        assert_eq!(categorize_extension("plist"), FileCategory::System);
        assert_eq!(categorize_extension("xyz"), FileCategory::Other);
    }

    #[test]
    fn test_all_lists_every_category_once() {
        let all = FileCategory::all();
        assert_eq!(all.len(), 10);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
