//! Shared helpers: image-name filtering, text decoding, directory scans.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::naming::compare_alphanumeric;

/// Image extensions that count as pages inside an archive.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Whether a path or entry name has a recognized image extension.
pub fn is_image_path(path: &str) -> bool {
    is_image_extension(file_extension(path))
}

/// Whether an extension (dot included) is on the image allow-list.
pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|image_ext| extension.eq_ignore_ascii_case(image_ext))
}

/// The extension of a path or entry name, dot included. Empty if none.
pub fn file_extension(path: &str) -> &str {
    let name_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(dot) => &name[dot..],
        None => "",
    }
}

/// List the image files directly inside `dir`, sorted alphanumerically.
/// A missing directory yields an empty list.
pub fn images_in_directory(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut results: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_path(&path.to_string_lossy()))
        .collect();
    results.sort_by(|a, b| compare_alphanumeric(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(results)
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Decode bytes to a string, handling the encodings seen in legacy tag files.
///
/// Tries UTF-8 first (BOM handled by encoding_rs), then falls back to
/// Windows-1252, which is what pre-Unicode scans actually used.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image_path("page01.jpg"));
        assert!(is_image_path("art/Page02.PNG"));
        assert!(is_image_path("scan.JPEG"));
        assert!(!is_image_path("ComicInfo.xml"));
        assert!(!is_image_path("notes.txt"));
        assert!(!is_image_path("noextension"));
    }

    #[test]
    fn extension_includes_the_dot() {
        assert_eq!(file_extension("pages/page01.jpg"), ".jpg");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("no_ext"), "");
        assert_eq!(file_extension("dir.v2/no_ext"), "");
    }

    #[test]
    fn decode_text_handles_utf8_and_cp1252() {
        assert_eq!(decode_text("caf\u{e9}".as_bytes()), "caf\u{e9}");
        // 0xE9 is 'é' in Windows-1252 but malformed UTF-8
        assert_eq!(decode_text(&[b'c', b'a', b'f', 0xE9]), "caf\u{e9}");
    }
}
