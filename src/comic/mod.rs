//! The comic archive itself: pages, metadata, and the operations that keep
//! them consistent.
//!
//! A [`ComicArchive`] owns one storage backend, one lazily built page index
//! (entry names sorted alphanumerically, position = page number − 1) and one
//! lazily loaded metadata slot. Mutating operations update the backend and
//! the index together; there is no rollback, so a failed mutation leaves the
//! archive in an indeterminate state and callers should stop mutating it.
//!
//! A `ComicArchive` is single-writer: serialize access externally. Two
//! independent archives are safe to use side by side, which is what
//! cross-archive page copies do.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::container::{ArchiveReader, Container, ZipEditor};
use crate::error::{Error, Result};
use crate::metadata::ComicMetadata;
use crate::naming;
use crate::pages::PageList;
use crate::util;

/// Entry name of structured metadata; probed first, and the only format
/// ever written.
const METADATA_XML_ENTRY: &str = "ComicInfo.xml";
/// Entry name of legacy metadata; probed second, import only.
const METADATA_TAG_ENTRY: &str = "tag.txt";

/// Container technologies a comic archive can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP container. The only format that can be written.
    Cbz,
    /// RAR container. Read-only.
    Cbr,
}

/// How an archive is opened. Fixed for the archive's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    /// Queries only; every mutating call fails with [`Error::NotWritable`].
    Read,
    /// Start from an empty container. Insertion is append-only and metadata
    /// can be stored at most once.
    Create,
    /// Full read/write access to an existing (or new) container.
    Modify,
}

/// An ordered collection of image pages plus optional issue metadata,
/// stored in a container file.
pub struct ComicArchive {
    path: PathBuf,
    mode: ArchiveMode,
    container: Container,
    /// Lazily built; `None` means "not yet listed", not "no pages".
    page_index: Option<Vec<String>>,
    metadata: Option<ComicMetadata>,
    /// Distinguishes "not yet probed" from "probed, none found".
    metadata_loaded: bool,
    metadata_stored: bool,
}

impl fmt::Debug for ComicArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComicArchive")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("page_index", &self.page_index)
            .field("metadata", &self.metadata)
            .field("metadata_loaded", &self.metadata_loaded)
            .field("metadata_stored", &self.metadata_stored)
            .finish_non_exhaustive()
    }
}

impl ComicArchive {
    /// Open an archive, guessing the format from the file extension.
    pub fn open<P: AsRef<Path>>(path: P, mode: ArchiveMode) -> Result<ComicArchive> {
        let path = path.as_ref();
        let format = guess_format(path)?;
        ComicArchive::open_with_format(path, mode, format)
    }

    /// Open an archive of a known format, ignoring the file extension.
    ///
    /// Read mode always goes through the sniffing reader, so a `.cbz` that
    /// is really a RAR archive still opens. Cbr only supports Read mode.
    pub fn open_with_format<P: AsRef<Path>>(
        path: P,
        mode: ArchiveMode,
        format: ArchiveFormat,
    ) -> Result<ComicArchive> {
        let path = path.as_ref();
        debug!("opening {} in {mode:?} mode", path.display());
        let container = match (format, mode) {
            (_, ArchiveMode::Read) => Container::ReadOnly(ArchiveReader::open(path)?),
            (ArchiveFormat::Cbz, ArchiveMode::Create) => {
                Container::ReadWrite(ZipEditor::create(path)?)
            }
            (ArchiveFormat::Cbz, ArchiveMode::Modify) => {
                Container::ReadWrite(ZipEditor::open_or_create(path)?)
            }
            (ArchiveFormat::Cbr, _) => {
                return Err(Error::NotSupported(
                    "writing to CBR archives is not supported".to_string(),
                ));
            }
        };
        let create = mode == ArchiveMode::Create;
        Ok(ComicArchive {
            path: path.to_path_buf(),
            mode,
            container,
            page_index: create.then(Vec::new),
            metadata: None,
            metadata_loaded: create,
            metadata_stored: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ArchiveMode {
        self.mode
    }

    /// Number of pages in the archive.
    pub fn page_count(&mut self) -> usize {
        self.page_index().len()
    }

    /// Backend entry name of a page.
    pub fn page_name(&mut self, page_number: usize) -> Result<&str> {
        let index = self.page_index();
        if page_number < 1 || page_number > index.len() {
            return Err(Error::PageOutOfRange(page_number));
        }
        Ok(&index[page_number - 1])
    }

    /// File extension of a page, dot included.
    pub fn page_extension(&mut self, page_number: usize) -> Result<String> {
        Ok(util::file_extension(self.page_name(page_number)?).to_string())
    }

    /// Read one page into an owned buffer.
    ///
    /// The buffer is independent of the archive, so it stays valid across
    /// later mutations.
    pub fn extract_page(&mut self, page_number: usize) -> Result<Vec<u8>> {
        let name = self.page_name(page_number)?.to_string();
        self.container.read_entry(&name)
    }

    /// Read every selected page, in selector order. Sub-ranges past the end
    /// of the archive are clamped.
    pub fn extract_pages(&mut self, pages: &PageList) -> Result<Vec<Vec<u8>>> {
        let names = self.page_entry_names(pages);
        names
            .iter()
            .map(|name| self.container.read_entry(name))
            .collect()
    }

    /// Write one page out to a file.
    pub fn extract_page_to_file(&mut self, page_number: usize, path: &Path) -> Result<()> {
        let data = self.extract_page(page_number)?;
        util::ensure_parent_dir(path)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Extract the selected pages into a directory, continuing the numbering
    /// of any images already there. Returns the paths written.
    pub fn extract_pages_to_dir(&mut self, dir: &Path, pages: &PageList) -> Result<Vec<PathBuf>> {
        let entries = self.page_entry_names(pages);
        let existing = util::images_in_directory(dir)?;
        let anchor = existing.last().map(|path| path.to_string_lossy().into_owned());
        let dir = dir.to_string_lossy();
        let names = naming::continue_sequence(anchor.as_deref(), entries.len(), Some(dir.as_ref()));

        let mut written = Vec::with_capacity(entries.len());
        for (entry, name) in entries.iter().zip(names) {
            let output = PathBuf::from(format!("{name}{}", util::file_extension(entry)));
            let data = self.container.read_entry(entry)?;
            util::ensure_parent_dir(&output)?;
            fs::write(&output, data)?;
            written.push(output);
        }
        Ok(written)
    }

    /// Insert an in-memory image as page `page_number`, shifting later pages
    /// along. `extension` picks the entry name's extension (`".png"` style,
    /// leading dot optional) and must be on the image allow-list.
    pub fn add_page(&mut self, page_number: usize, data: Vec<u8>, extension: &str) -> Result<()> {
        self.check_writable()?;
        let extension = normalize_extension(extension)?;
        self.check_insert_position(page_number)?;

        let names = self.prepare_insert(page_number, 1)?;
        let entry = format!("{}{extension}", names[0]);
        self.container.create_entry(&entry, data)?;
        self.page_index_mut().insert(page_number - 1, entry);
        Ok(())
    }

    /// Append an in-memory image as the last page.
    pub fn append_page(&mut self, data: Vec<u8>, extension: &str) -> Result<()> {
        let position = self.page_count() + 1;
        self.add_page(position, data, extension)
    }

    /// Insert an image file as page `page_number`.
    pub fn add_page_from_file(&mut self, page_number: usize, path: &Path) -> Result<()> {
        self.check_writable()?;
        if !util::is_image_path(&path.to_string_lossy()) {
            return Err(Error::NotSupported(format!(
                "{} is not a valid image path",
                path.display()
            )));
        }
        self.check_insert_position(page_number)?;

        let data = fs::read(path)?;
        let names = self.prepare_insert(page_number, 1)?;
        let entry = format!(
            "{}{}",
            names[0],
            util::file_extension(&path.to_string_lossy())
        );
        self.container.create_entry(&entry, data)?;
        self.page_index_mut().insert(page_number - 1, entry);
        Ok(())
    }

    /// Append an image file as the last page.
    pub fn append_page_from_file(&mut self, path: &Path) -> Result<()> {
        let position = self.page_count() + 1;
        self.add_page_from_file(position, path)
    }

    /// Insert the selected images of a directory at `page_number`, in
    /// alphanumeric order. Selecting nothing is a no-op.
    pub fn add_pages_from_dir(
        &mut self,
        page_number: usize,
        dir: &Path,
        pages: &PageList,
    ) -> Result<()> {
        self.check_writable()?;
        self.check_insert_position(page_number)?;

        let files = util::images_in_directory(dir)?;
        let selected = select_clamped(&files, pages);
        if selected.is_empty() {
            return Ok(());
        }
        let names = self.prepare_insert(page_number, selected.len())?;
        for (i, path) in selected.iter().enumerate() {
            let data = fs::read(path)?;
            let entry = format!(
                "{}{}",
                names[i],
                util::file_extension(&path.to_string_lossy())
            );
            self.container.create_entry(&entry, data)?;
            self.page_index_mut().insert(page_number + i - 1, entry);
        }
        Ok(())
    }

    /// Insert the selected pages of another archive at `page_number`.
    ///
    /// Each copied page is read through its own pass over the source, so
    /// source and destination stay independent.
    pub fn add_pages_from_archive(
        &mut self,
        page_number: usize,
        other: &mut ComicArchive,
        pages: &PageList,
    ) -> Result<()> {
        self.check_writable()?;
        self.check_insert_position(page_number)?;

        let sources = other.page_entry_names(pages);
        if sources.is_empty() {
            return Ok(());
        }
        debug!("copying {} pages from {other} into {self}", sources.len());
        let names = self.prepare_insert(page_number, sources.len())?;
        for (i, source) in sources.iter().enumerate() {
            let data = other.container.read_entry(source)?;
            let entry = format!("{}{}", names[i], util::file_extension(source));
            self.container.create_entry(&entry, data)?;
            self.page_index_mut().insert(page_number + i - 1, entry);
        }
        Ok(())
    }

    /// Append the selected pages of another archive.
    pub fn append_pages_from_archive(
        &mut self,
        other: &mut ComicArchive,
        pages: &PageList,
    ) -> Result<()> {
        let position = self.page_count() + 1;
        self.add_pages_from_archive(position, other, pages)
    }

    /// Delete one page. Later pages keep their entry names and slide down a
    /// position; numbering is positional, not derived from names.
    pub fn delete_page(&mut self, page_number: usize) -> Result<()> {
        self.check_deletable()?;
        if page_number < 1 || page_number > self.page_count() {
            return Err(Error::PageOutOfRange(page_number));
        }
        self.delete_at_positions(vec![page_number])
    }

    /// Delete every selected page. Sub-ranges past the end are clamped.
    pub fn delete_pages(&mut self, pages: &PageList) -> Result<()> {
        self.check_deletable()?;
        let positions = self.resolve_positions(pages);
        self.delete_at_positions(positions)
    }

    /// The archive's metadata, probing the container on first access:
    /// ComicInfo.xml first, then legacy tag.txt. `None` when the archive
    /// carries neither.
    pub fn metadata(&mut self) -> Result<Option<&ComicMetadata>> {
        self.load_metadata()?;
        Ok(self.metadata.as_ref())
    }

    /// Mutable access to the buffered metadata.
    pub fn metadata_mut(&mut self) -> Result<Option<&mut ComicMetadata>> {
        self.load_metadata()?;
        Ok(self.metadata.as_mut())
    }

    /// Replace the buffered metadata. Nothing is persisted until
    /// [`store_metadata_changes`] runs.
    ///
    /// [`store_metadata_changes`]: ComicArchive::store_metadata_changes
    pub fn set_metadata(&mut self, metadata: Option<ComicMetadata>) {
        self.metadata = metadata;
        self.metadata_loaded = true;
    }

    /// Write the buffered metadata into the container as ComicInfo.xml,
    /// replacing whichever metadata entries were there. Buffered `None`
    /// deletes them. Always writes the structured format, regardless of
    /// which format was originally read.
    pub fn store_metadata_changes(&mut self) -> Result<()> {
        self.check_writable()?;
        if self.mode == ArchiveMode::Create && self.metadata_stored {
            return Err(Error::NotSupported(
                "metadata can only be stored once into a new archive".to_string(),
            ));
        }
        self.load_metadata()?;
        self.container.delete_entry(METADATA_XML_ENTRY)?;
        self.container.delete_entry(METADATA_TAG_ENTRY)?;
        if let Some(metadata) = &self.metadata {
            let xml = metadata.to_comic_info_xml();
            self.container
                .create_entry(METADATA_XML_ENTRY, xml.into_bytes())?;
            debug!("stored metadata into {}", self.path.display());
        }
        self.metadata_stored = true;
        Ok(())
    }

    /// Drop buffered metadata changes; the next access probes the container
    /// again.
    pub fn revert_metadata_changes(&mut self) {
        self.metadata = None;
        self.metadata_loaded = false;
    }

    /// Persist pending container changes to disk.
    ///
    /// Dropping the archive flushes too, but only here can a failure be
    /// observed.
    pub fn flush(&mut self) -> Result<()> {
        self.container.flush()
    }

    fn page_index(&mut self) -> &Vec<String> {
        self.page_index_mut()
    }

    fn page_index_mut(&mut self) -> &mut Vec<String> {
        let container = &self.container;
        self.page_index.get_or_insert_with(|| {
            let mut index: Vec<String> = container
                .entry_names()
                .into_iter()
                .filter(|name| util::is_image_path(name))
                .collect();
            index.sort_by(|a, b| naming::compare_alphanumeric(a, b));
            index
        })
    }

    /// Entry names of the selected pages, in selector order, with
    /// sub-ranges clamped to the page count.
    fn page_entry_names(&mut self, pages: &PageList) -> Vec<String> {
        let index = self.page_index();
        let mut names = Vec::new();
        for range in pages.ranges() {
            let last = range.last().min(index.len());
            for page_number in range.first()..=last {
                names.push(index[page_number - 1].clone());
            }
        }
        names
    }

    fn resolve_positions(&mut self, pages: &PageList) -> Vec<usize> {
        let count = self.page_count();
        let mut positions = Vec::new();
        for range in pages.ranges() {
            let last = range.last().min(count);
            for page_number in range.first()..=last {
                positions.push(page_number);
            }
        }
        positions
    }

    /// Generate entry names for `count` new pages at `page_number` and, if
    /// the insertion point is not the end, move the pages in the way first.
    fn prepare_insert(&mut self, page_number: usize, count: usize) -> Result<Vec<String>> {
        let index = self.page_index();
        let anchor = (page_number > 1).then(|| index[page_number - 2].clone());
        let names = naming::continue_sequence(anchor.as_deref(), count, None);
        if page_number <= self.page_count()
            && let Some(last_new) = names.last().cloned()
        {
            self.rename_pages_for_insert(page_number, &last_new)?;
        }
        Ok(names)
    }

    /// Rename every page from `first_page_to_rename` to the end so their
    /// names continue the sequence after `previous_name`.
    ///
    /// The walk runs from the last page backward: the old and new numeric
    /// ranges overlap, and a fresh name must never collide with a page that
    /// has not moved yet.
    fn rename_pages_for_insert(
        &mut self,
        first_page_to_rename: usize,
        previous_name: &str,
    ) -> Result<()> {
        let count = self.page_count();
        let pages_to_move = count - first_page_to_rename + 1;
        let new_names = naming::continue_sequence(Some(previous_name), pages_to_move, None);
        debug!("shifting {pages_to_move} pages at position {first_page_to_rename}");
        for page_number in (first_page_to_rename..=count).rev() {
            let old_name = self.page_index()[page_number - 1].clone();
            let new_name = format!(
                "{}{}",
                new_names[page_number - first_page_to_rename],
                util::file_extension(&old_name)
            );
            self.container.rename_entry(&old_name, &new_name)?;
            self.page_index_mut()[page_number - 1] = new_name;
        }
        Ok(())
    }

    fn delete_at_positions(&mut self, mut positions: Vec<usize>) -> Result<()> {
        positions.sort_unstable();
        positions.dedup();
        // Back to front, so removals cannot shift positions still pending
        for position in positions.into_iter().rev() {
            let name = self.page_index()[position - 1].clone();
            debug!("deleting page {position} ({name})");
            self.container.delete_entry(&name)?;
            self.page_index_mut().remove(position - 1);
        }
        Ok(())
    }

    fn load_metadata(&mut self) -> Result<()> {
        if self.metadata_loaded {
            return Ok(());
        }
        if self.container.has_entry(METADATA_XML_ENTRY) {
            let bytes = self.container.read_entry(METADATA_XML_ENTRY)?;
            self.metadata = Some(ComicMetadata::from_comic_info(&bytes)?);
        } else if self.container.has_entry(METADATA_TAG_ENTRY) {
            let bytes = self.container.read_entry(METADATA_TAG_ENTRY)?;
            self.metadata = Some(ComicMetadata::from_tag_file(&bytes));
        }
        self.metadata_loaded = true;
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        match self.mode {
            ArchiveMode::Read => Err(Error::NotWritable),
            ArchiveMode::Create | ArchiveMode::Modify => Ok(()),
        }
    }

    fn check_deletable(&self) -> Result<()> {
        match self.mode {
            ArchiveMode::Read => Err(Error::NotWritable),
            ArchiveMode::Create => Err(Error::NotSupported(
                "archives opened in create mode are append-only".to_string(),
            )),
            ArchiveMode::Modify => Ok(()),
        }
    }

    fn check_insert_position(&mut self, page_number: usize) -> Result<()> {
        let count = self.page_count();
        if page_number < 1 || page_number > count + 1 {
            return Err(Error::PageOutOfRange(page_number));
        }
        if self.mode == ArchiveMode::Create && page_number <= count {
            return Err(Error::NotSupported(
                "archives opened in create mode are append-only".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ComicArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path.file_name() {
            Some(name) => write!(f, "{}", name.to_string_lossy()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

fn guess_format(path: &Path) -> Result<ArchiveFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("cbz") => Ok(ArchiveFormat::Cbz),
        Some("cbr") => Ok(ArchiveFormat::Cbr),
        _ => Err(Error::NotSupported(format!(
            "unknown archive format: {}",
            path.display()
        ))),
    }
}

fn normalize_extension(extension: &str) -> Result<String> {
    let extension = if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    };
    if !util::is_image_extension(&extension) {
        return Err(Error::NotSupported(format!(
            "{extension} is not a recognized image extension"
        )));
    }
    Ok(extension)
}

/// Select 1-based positions out of `items`, clamping each sub-range to the
/// collection's length.
fn select_clamped(items: &[PathBuf], pages: &PageList) -> Vec<PathBuf> {
    let mut selected = Vec::new();
    for range in pages.ranges() {
        let last = range.last().min(items.len());
        for n in range.first()..=last {
            selected.push(items[n - 1].clone());
        }
    }
    selected
}
