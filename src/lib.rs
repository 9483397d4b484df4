//! # cbz
//!
//! A fast, lightweight library for reading and editing CBZ/CBR comic book
//! archives.
//!
//! ## Features
//!
//! - Read, create, and edit CBZ (ZIP) archives
//! - Read CBR (RAR) archives, sniffing the real format so mislabelled files
//!   open anyway
//! - Insert, delete, extract, and copy pages without renumbering the rest of
//!   the archive
//! - Read and write ComicInfo.xml metadata; import legacy tag.txt files
//!
//! ## Quick Start
//!
//! ```no_run
//! use cbz::{ArchiveMode, ComicArchive, PageList};
//!
//! let mut comic = ComicArchive::open("issue-001.cbz", ArchiveMode::Modify)?;
//! println!("{} pages", comic.page_count());
//!
//! // Copy the first five pages of another issue onto the end
//! let mut other = ComicArchive::open("issue-002.cbz", ArchiveMode::Read)?;
//! let pages: PageList = "1-5".parse()?;
//! comic.append_pages_from_archive(&mut other, &pages)?;
//! comic.flush()?;
//! # Ok::<(), cbz::Error>(())
//! ```
//!
//! ## Metadata
//!
//! Metadata loads lazily and is buffered in memory until explicitly stored:
//!
//! ```no_run
//! use cbz::{ArchiveMode, ComicArchive, ComicMetadata};
//!
//! let mut comic = ComicArchive::open("issue-001.cbz", ArchiveMode::Modify)?;
//! let mut metadata = comic.metadata()?.cloned().unwrap_or_default();
//! metadata.series_title = Some("2000 AD".into());
//! comic.set_metadata(Some(metadata));
//! comic.store_metadata_changes()?;
//! comic.flush()?;
//! # Ok::<(), cbz::Error>(())
//! ```

pub mod comic;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod pages;

pub(crate) mod container;
pub(crate) mod util;

pub use comic::{ArchiveFormat, ArchiveMode, ComicArchive};
pub use error::{Error, Result};
pub use metadata::{ComicAuthor, ComicContent, ComicMetadata, ComicRole, ContentKind};
pub use pages::{PageList, PageRange};
