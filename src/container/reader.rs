use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// A single archive entry: relative name plus uncompressed size.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
}

enum Backing {
    Zip(ZipArchive<File>),
    Rar(PathBuf),
}

/// Read-only access to an existing comic archive.
///
/// The format is sniffed from the file's leading bytes, never from its
/// extension: plenty of `.cbz` files in the wild are really RAR archives
/// (and vice versa), and they should open all the same.
pub struct ArchiveReader {
    backing: Backing,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveReader {
    /// Open an archive for reading, detecting ZIP or RAR from its content.
    pub fn open(path: &Path) -> Result<ArchiveReader> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 8];
        let got = file.read(&mut magic)?;

        if magic[..got].starts_with(b"PK\x03\x04") || magic[..got].starts_with(b"PK\x05\x06") {
            file.rewind()?;
            let mut archive = ZipArchive::new(file)?;
            let mut entries = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                let entry = archive.by_index_raw(i)?;
                if !entry.is_dir() {
                    entries.push(ArchiveEntry {
                        name: entry.name().to_string(),
                        size: entry.size(),
                    });
                }
            }
            return Ok(ArchiveReader {
                backing: Backing::Zip(archive),
                entries,
            });
        }

        if magic[..got].starts_with(b"Rar!\x1A\x07") {
            let mut entries = Vec::new();
            let listing = unrar::Archive::new(path).open_for_listing()?;
            for header in listing {
                let header = header?;
                if header.is_file() {
                    entries.push(ArchiveEntry {
                        name: entry_name(&header.filename),
                        size: header.unpacked_size as u64,
                    });
                }
            }
            return Ok(ArchiveReader {
                backing: Backing::Rar(path.to_path_buf()),
                entries,
            });
        }

        Err(Error::NotSupported(format!(
            "{} is not a recognized comic archive",
            path.display()
        )))
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Read an entry into an owned buffer, so the bytes outlive any later
    /// use of the reader. Matching is case-insensitive, first match wins.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find(name)
            .cloned()
            .ok_or_else(|| Error::MissingEntry(name.to_string()))?;
        match &mut self.backing {
            Backing::Zip(archive) => {
                let mut file = archive.by_name(&entry.name)?;
                let mut data = Vec::with_capacity(entry.size as usize);
                file.read_to_end(&mut data)?;
                Ok(data)
            }
            Backing::Rar(path) => read_rar_entry(path, &entry.name),
        }
    }
}

/// RAR has no random access worth the name; each read walks the archive
/// from the start in an independent pass.
fn read_rar_entry(path: &Path, name: &str) -> Result<Vec<u8>> {
    let mut archive = unrar::Archive::new(path).open_for_processing()?;
    while let Some(header) = archive.read_header()? {
        if entry_name(&header.entry().filename).eq_ignore_ascii_case(name) {
            let (data, _rest) = header.read()?;
            return Ok(data);
        }
        archive = header.skip()?;
    }
    Err(Error::MissingEntry(name.to_string()))
}

/// RAR stores DOS-style separators for archives built on Windows.
fn entry_name(filename: &Path) -> String {
    filename.to_string_lossy().replace('\\', "/")
}
