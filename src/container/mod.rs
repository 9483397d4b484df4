//! Storage backends for comic containers.
//!
//! Two capabilities exist: [`ArchiveReader`] opens anything we can read
//! (ZIP or RAR, sniffed from content) but cannot write, and [`ZipEditor`]
//! reads and writes ZIP only. [`Container`] is the closed sum of the two;
//! write calls against the read-only variant fail with
//! [`Error::NotSupported`] instead of being representable.

mod reader;
mod writer;

pub use reader::{ArchiveEntry, ArchiveReader};
pub use writer::ZipEditor;

use crate::error::{Error, Result};

pub enum Container {
    ReadOnly(ArchiveReader),
    ReadWrite(ZipEditor),
}

impl Container {
    /// Names of every entry, in the backend's storage order.
    pub fn entry_names(&self) -> Vec<String> {
        match self {
            Container::ReadOnly(reader) => {
                reader.entries().iter().map(|e| e.name.clone()).collect()
            }
            Container::ReadWrite(editor) => editor.entry_names().map(str::to_string).collect(),
        }
    }

    /// Case-insensitive entry existence check.
    pub fn has_entry(&self, name: &str) -> bool {
        match self {
            Container::ReadOnly(reader) => reader.has_entry(name),
            Container::ReadWrite(editor) => editor.has_entry(name),
        }
    }

    /// Read an entry into an owned buffer. Matching is case-insensitive,
    /// first match wins.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        match self {
            Container::ReadOnly(reader) => reader.read_entry(name),
            Container::ReadWrite(editor) => editor.read_entry(name),
        }
    }

    /// Create a new entry holding `data`.
    pub fn create_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        match self {
            Container::ReadOnly(_) => Err(read_only_error()),
            Container::ReadWrite(editor) => editor.create_entry(name, data),
        }
    }

    /// Delete an entry. Deleting a missing entry is a no-op.
    pub fn delete_entry(&mut self, name: &str) -> Result<()> {
        match self {
            Container::ReadOnly(_) => Err(read_only_error()),
            Container::ReadWrite(editor) => editor.delete_entry(name),
        }
    }

    /// Rename an entry via copy-then-delete.
    pub fn rename_entry(&mut self, from: &str, to: &str) -> Result<()> {
        match self {
            Container::ReadOnly(_) => Err(read_only_error()),
            Container::ReadWrite(editor) => editor.rename_entry(from, to),
        }
    }

    /// Persist pending changes to disk. A no-op for read-only backends.
    pub fn flush(&mut self) -> Result<()> {
        match self {
            Container::ReadOnly(_) => Ok(()),
            Container::ReadWrite(editor) => editor.flush(),
        }
    }
}

fn read_only_error() -> Error {
    Error::NotSupported("this archive is read-only".to_string())
}
