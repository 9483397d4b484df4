use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::util;

enum Source {
    /// Entry carried over from the archive as it exists on disk.
    Original(usize),
    /// Entry created or rewritten since the last flush.
    Buffered(Vec<u8>),
}

struct Entry {
    name: String,
    source: Source,
}

/// Read-write access to a ZIP comic archive.
///
/// The ZIP format cannot be edited in place, so mutations accumulate in an
/// in-memory overlay over the on-disk central directory and [`flush`]
/// rewrites the whole container: untouched entries are raw-copied without
/// recompression, buffered ones are deflated fresh. Dropping the editor
/// flushes on a best-effort basis; call [`flush`] to observe failures.
///
/// [`flush`]: ZipEditor::flush
pub struct ZipEditor {
    path: PathBuf,
    original: Option<ZipArchive<File>>,
    entries: Vec<Entry>,
    dirty: bool,
}

impl ZipEditor {
    /// Start a brand-new archive, discarding any existing file at `path`.
    pub fn create(path: &Path) -> Result<ZipEditor> {
        util::ensure_parent_dir(path)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        debug!("creating archive {}", path.display());
        Ok(ZipEditor {
            path: path.to_path_buf(),
            original: None,
            entries: Vec::new(),
            dirty: true,
        })
    }

    /// Open an existing archive for editing, or start a new one if the file
    /// does not exist yet.
    pub fn open_or_create(path: &Path) -> Result<ZipEditor> {
        util::ensure_parent_dir(path)?;
        if !path.exists() {
            return ZipEditor::create(path);
        }
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let entries = list_entries(&mut archive)?;
        Ok(ZipEditor {
            path: path.to_path_buf(),
            original: Some(archive),
            entries,
            dirty: false,
        })
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Read an entry into an owned buffer. Matching is case-insensitive,
    /// first match wins.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let position = self
            .position(name)
            .ok_or_else(|| Error::MissingEntry(name.to_string()))?;
        match &self.entries[position].source {
            Source::Buffered(data) => Ok(data.clone()),
            Source::Original(index) => {
                let index = *index;
                match &mut self.original {
                    Some(archive) => {
                        let mut file = archive.by_index(index)?;
                        let mut data = Vec::with_capacity(file.size() as usize);
                        file.read_to_end(&mut data)?;
                        Ok(data)
                    }
                    None => Err(Error::MissingEntry(name.to_string())),
                }
            }
        }
    }

    /// Create a new entry holding `data`. An existing entry with the same
    /// name is left in place; lookups resolve to whichever comes first.
    pub fn create_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        self.entries.push(Entry {
            name: name.to_string(),
            source: Source::Buffered(data),
        });
        self.dirty = true;
        Ok(())
    }

    /// Delete an entry. Deleting a missing entry is a no-op.
    pub fn delete_entry(&mut self, name: &str) -> Result<()> {
        if let Some(position) = self.position(name) {
            self.entries.remove(position);
            self.dirty = true;
        }
        Ok(())
    }

    /// Rename an entry by copying its bytes under the new name and deleting
    /// the old one; ZIP offers no rename primitive.
    pub fn rename_entry(&mut self, from: &str, to: &str) -> Result<()> {
        let data = self.read_entry(from)?;
        self.create_entry(to, data)?;
        self.delete_entry(from)
    }

    /// Rewrite the container with all pending changes applied.
    ///
    /// The new archive is written beside the original and renamed over it
    /// once complete, so a failed flush leaves the on-disk file as it was.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        debug!(
            "flushing {} entries to {}",
            self.entries.len(),
            self.path.display()
        );

        let tmp_path = tmp_sibling(&self.path);
        let mut writer = ZipWriter::new(File::create(&tmp_path)?);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for entry in &self.entries {
            match &entry.source {
                Source::Original(index) => match &mut self.original {
                    Some(archive) => {
                        let file = archive.by_index_raw(*index)?;
                        writer.raw_copy_file(file)?;
                    }
                    None => return Err(Error::MissingEntry(entry.name.clone())),
                },
                Source::Buffered(data) => {
                    writer.start_file(entry.name.as_str(), options)?;
                    writer.write_all(data)?;
                }
            }
        }
        writer.finish()?;

        // Close the old handle before replacing the file underneath it.
        self.original = None;
        fs::rename(&tmp_path, &self.path)?;

        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        self.entries = list_entries(&mut archive)?;
        self.original = Some(archive);
        self.dirty = false;
        Ok(())
    }
}

impl Drop for ZipEditor {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!("failed to flush {}: {err}", self.path.display());
        }
    }
}

fn list_entries(archive: &mut ZipArchive<File>) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        if !file.is_dir() {
            entries.push(Entry {
                name: file.name().to_string(),
                source: Source::Original(i),
            });
        }
    }
    Ok(entries)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
