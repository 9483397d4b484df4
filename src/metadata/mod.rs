//! Comic metadata: issue header, credits, and per-section contents.
//!
//! Page ranges on [`ComicContent`] are always relative to the *current*
//! numbering of the archive that owns the metadata. The transforms in this
//! module ([`trim`], [`append`], [`move_pages_by`]) exist to keep that true
//! when pages are filtered, copied between archives, or shifted.
//!
//! [`trim`]: ComicMetadata::trim
//! [`append`]: ComicMetadata::append
//! [`move_pages_by`]: ComicMetadata::move_pages_by

mod comic_info;
mod tag_file;

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::pages::{PageList, PageRange};

/// The closed set of credit roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComicRole {
    Writer,
    Artist,
    Penciller,
    Inker,
    Colorist,
    Letterer,
    Editor,
    Designer,
    Producer,
}

impl ComicRole {
    pub const ALL: [ComicRole; 9] = [
        ComicRole::Writer,
        ComicRole::Artist,
        ComicRole::Penciller,
        ComicRole::Inker,
        ComicRole::Colorist,
        ComicRole::Letterer,
        ComicRole::Editor,
        ComicRole::Designer,
        ComicRole::Producer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComicRole::Writer => "Writer",
            ComicRole::Artist => "Artist",
            ComicRole::Penciller => "Penciller",
            ComicRole::Inker => "Inker",
            ComicRole::Colorist => "Colorist",
            ComicRole::Letterer => "Letterer",
            ComicRole::Editor => "Editor",
            ComicRole::Designer => "Designer",
            ComicRole::Producer => "Producer",
        }
    }

    /// Resolve a ComicInfo element name to a role.
    pub fn from_name(name: &str) -> Option<ComicRole> {
        ComicRole::ALL.into_iter().find(|role| role.as_str() == name)
    }
}

impl fmt::Display for ComicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of section a content entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Cover,
    Story,
    Article,
    ContentsPage,
    LettersPage,
    Advertisement,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Cover,
        ContentKind::Story,
        ContentKind::Article,
        ContentKind::ContentsPage,
        ContentKind::LettersPage,
        ContentKind::Advertisement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Cover => "Cover",
            ContentKind::Story => "Story",
            ContentKind::Article => "Article",
            ContentKind::ContentsPage => "ContentsPage",
            ContentKind::LettersPage => "LettersPage",
            ContentKind::Advertisement => "Advertisement",
        }
    }

    pub fn from_name(name: &str) -> Option<ContentKind> {
        ContentKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// A single credit: who did what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicAuthor {
    pub role: ComicRole,
    pub name: String,
}

impl ComicAuthor {
    pub fn new(role: ComicRole, name: impl Into<String>) -> ComicAuthor {
        ComicAuthor {
            role,
            name: name.into(),
        }
    }
}

impl fmt::Display for ComicAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.name)
    }
}

/// A titled, credited section of an issue, optionally scoped to a page range.
///
/// `pages: None` means the entry applies to the whole issue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComicContent {
    pub kind: Option<ContentKind>,
    pub pages: Option<PageRange>,
    pub title: Option<String>,
    pub story_title: Option<String>,
    pub part_number: Option<u32>,
    pub authors: Vec<ComicAuthor>,
}

impl fmt::Display for ComicContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(story_title) = &self.story_title {
            write!(f, "{story_title}")?;
            if let Some(part) = self.part_number {
                write!(f, " (Part {part})")?;
            }
            Ok(())
        } else if let Some(title) = &self.title {
            write!(f, "{title}")
        } else {
            f.write_str("Untitled")
        }
    }
}

/// Structured metadata for one comic issue.
///
/// Every scalar is an explicit `Option`; absence is never encoded as an
/// empty string or magic number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComicMetadata {
    pub issue_title: Option<String>,
    pub series_title: Option<String>,
    pub issue_number: Option<u32>,
    pub volume_number: Option<u32>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub release_year: Option<i32>,
    pub release_month: Option<u8>,
    pub release_day: Option<u8>,
    pub publisher: Option<String>,
    pub imprint: Option<String>,
    pub genre: Option<String>,
    pub website: Option<String>,
    pub language: Option<String>,
    pub scan_information: Option<String>,
    pub contents: Vec<ComicContent>,
    pub authors: Vec<ComicAuthor>,
}

impl ComicMetadata {
    pub fn new() -> ComicMetadata {
        ComicMetadata::default()
    }

    /// Copy of this metadata keeping only the contents selected by `pages`,
    /// renumbered as if the unselected pages never existed.
    ///
    /// Whole-issue entries (no page range) are kept unchanged. A
    /// range-bearing entry survives only when its range lies entirely inside
    /// a single sub-range of the selector; entries straddling a sub-range
    /// boundary are dropped whole, never split. `total_pages` bounds
    /// open-ended selector sub-ranges.
    pub fn trim(&self, pages: &PageList, total_pages: usize) -> ComicMetadata {
        // Selected pages preceding each sub-range, under the new numbering.
        let mut offsets = Vec::with_capacity(pages.ranges().len());
        let mut pages_so_far = 0usize;
        for range in pages.ranges() {
            offsets.push(pages_so_far);
            pages_so_far += range.len_clamped(total_pages);
        }

        let mut trimmed = self.clone();
        trimmed.contents = self
            .contents
            .iter()
            .filter_map(|content| {
                let Some(content_range) = content.pages else {
                    return Some(content.clone());
                };
                pages
                    .ranges()
                    .iter()
                    .zip(&offsets)
                    .find_map(|(range, &offset)| {
                        range.contains(&content_range).then(|| {
                            let first = offset + (content_range.first() - range.first() + 1);
                            let last = if content_range.is_open_ended() {
                                usize::MAX
                            } else {
                                offset + (content_range.last() - range.first() + 1)
                            };
                            let mut kept = content.clone();
                            kept.pages = Some(PageRange::new(first, last));
                            kept
                        })
                    })
            })
            .collect();
        debug!(
            "trimmed contents {} -> {} entries",
            self.contents.len(),
            trimmed.contents.len()
        );
        trimmed
    }

    /// Concatenate `other`'s content list onto this one, shifting every
    /// range-bearing incoming entry forward by `offset_pages`.
    ///
    /// Header fields and issue-level author lists are never merged.
    pub fn append(&mut self, other: &ComicMetadata, offset_pages: usize) {
        self.contents.reserve(other.contents.len());
        for content in &other.contents {
            let mut copy = content.clone();
            if let Some(range) = copy.pages {
                copy.pages = Some(range.shifted_up(offset_pages));
            }
            self.contents.push(copy);
        }
    }

    /// Shift every range-bearing content entry in place by a signed offset.
    pub fn move_pages_by(&mut self, offset: i64) -> Result<()> {
        if offset == 0 {
            return Ok(());
        }
        for content in &mut self.contents {
            if let Some(range) = content.pages {
                content.pages = Some(range.offset_by(offset)?);
            }
        }
        Ok(())
    }
}

impl fmt::Display for ComicMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(series_title) = &self.series_title {
            write!(f, "{series_title}")?;
            if let Some(volume) = self.volume_number {
                if volume >= 1900 {
                    // Almost certainly a year, not a volume number
                    write!(f, " ({volume})")?;
                } else {
                    write!(f, " (Volume {volume})")?;
                }
            }
            if let Some(issue) = self.issue_number {
                write!(f, " {issue}")?;
            }
            if let Some(issue_title) = &self.issue_title {
                write!(f, ": {issue_title}")?;
            }
            Ok(())
        } else if let Some(issue_title) = &self.issue_title {
            write!(f, "{issue_title}")
        } else {
            f.write_str("Untitled Comic")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(pages: Option<PageRange>, title: &str) -> ComicContent {
        ComicContent {
            pages,
            title: Some(title.to_string()),
            ..ComicContent::default()
        }
    }

    fn sample() -> ComicMetadata {
        let mut metadata = ComicMetadata::new();
        metadata.series_title = Some("Test Series".to_string());
        metadata.contents.push(content(None, "whole issue"));
        metadata
            .contents
            .push(content(Some(PageRange::new(1, 10)), "long story"));
        metadata
            .contents
            .push(content(Some(PageRange::new(4, 6)), "short story"));
        metadata
    }

    #[test]
    fn trim_with_all_is_identity_on_contents() {
        let metadata = sample();
        let trimmed = metadata.trim(&PageList::all(), 10);
        assert_eq!(trimmed.contents, metadata.contents);
    }

    #[test]
    fn trim_drops_straddling_entries_whole() {
        // Selector 2-3,7 over a 10-page issue: the whole-issue entry stays
        // untouched, (1,10) and (4,6) both straddle and are dropped.
        let metadata = sample();
        let selector: PageList = "2-3,7".parse().unwrap();
        let trimmed = metadata.trim(&selector, 10);
        assert_eq!(trimmed.contents.len(), 1);
        assert_eq!(trimmed.contents[0].pages, None);
        assert_eq!(trimmed.contents[0].title.as_deref(), Some("whole issue"));
    }

    #[test]
    fn trim_renumbers_against_selected_pages_only() {
        let mut metadata = ComicMetadata::new();
        metadata
            .contents
            .push(content(Some(PageRange::new(5, 6)), "kept"));
        // Selecting 1-2 and 4-8: pages 1-2 contribute 2 selected pages
        // before the containing sub-range, so (5,6) becomes (4,5).
        let selector: PageList = "1-2,4-8".parse().unwrap();
        let trimmed = metadata.trim(&selector, 10);
        assert_eq!(trimmed.contents[0].pages, Some(PageRange::new(4, 5)));
    }

    #[test]
    fn trim_clamps_open_ended_selectors() {
        let mut metadata = ComicMetadata::new();
        metadata
            .contents
            .push(content(Some(PageRange::new(9, 10)), "end"));
        let selector: PageList = "1-4,8-*".parse().unwrap();
        let trimmed = metadata.trim(&selector, 10);
        // 4 pages precede the open sub-range; (9,10) sits 2 pages into it.
        assert_eq!(trimmed.contents[0].pages, Some(PageRange::new(6, 7)));
    }

    #[test]
    fn append_shifts_incoming_ranges() {
        let mut first = sample();
        let second = sample();
        first.append(&second, 20);
        assert_eq!(first.contents.len(), 6);
        assert_eq!(first.contents[4].pages, Some(PageRange::new(21, 30)));
        assert_eq!(first.contents[3].pages, None);
        // Header fields and issue credits are untouched
        assert_eq!(first.series_title.as_deref(), Some("Test Series"));
        assert!(first.authors.is_empty());
    }

    #[test]
    fn trim_then_append_reconstructs_contents() {
        let metadata = sample();
        let mut rebuilt = ComicMetadata::new();
        rebuilt.append(&metadata.trim(&PageList::all(), 10), 0);
        assert_eq!(rebuilt.contents, metadata.contents);
    }

    #[test]
    fn move_pages_by_shifts_in_place() {
        let mut metadata = sample();
        metadata.move_pages_by(3).unwrap();
        assert_eq!(metadata.contents[1].pages, Some(PageRange::new(4, 13)));
        assert_eq!(metadata.contents[0].pages, None);
        metadata.move_pages_by(-3).unwrap();
        assert_eq!(metadata.contents[1].pages, Some(PageRange::new(1, 10)));
    }

    #[test]
    fn move_pages_below_one_fails() {
        let mut metadata = sample();
        assert!(metadata.move_pages_by(-1).is_err());
    }

    #[test]
    fn display_composes_issue_titles() {
        let mut metadata = ComicMetadata::new();
        assert_eq!(metadata.to_string(), "Untitled Comic");
        metadata.series_title = Some("2000 AD".to_string());
        metadata.issue_number = Some(520);
        assert_eq!(metadata.to_string(), "2000 AD 520");
        metadata.volume_number = Some(1977);
        assert_eq!(metadata.to_string(), "2000 AD (1977) 520");
        metadata.volume_number = Some(2);
        metadata.issue_title = Some("The Final Countdown".to_string());
        assert_eq!(
            metadata.to_string(),
            "2000 AD (Volume 2) 520: The Final Countdown"
        );
    }

    #[test]
    fn display_composes_content_titles() {
        let mut entry = ComicContent::default();
        assert_eq!(entry.to_string(), "Untitled");
        entry.title = Some("Judge Dredd".to_string());
        assert_eq!(entry.to_string(), "Judge Dredd");
        entry.story_title = Some("The Apocalypse War".to_string());
        entry.part_number = Some(3);
        assert_eq!(entry.to_string(), "The Apocalypse War (Part 3)");
    }
}
