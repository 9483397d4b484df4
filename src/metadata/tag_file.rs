//! Legacy `tag.txt` metadata import.
//!
//! An ad hoc line-oriented format found in older scans: case-insensitive
//! `key: value` headers, free-floating website lines, and content sections
//! introduced by a `Page N[-M]` line followed by a title line. Import only;
//! stored metadata is always written back as ComicInfo.xml.

use time::Date;
use time::macros::format_description;
use tracing::debug;

use crate::metadata::{ComicAuthor, ComicContent, ComicMetadata, ComicRole};
use crate::pages::PageRange;
use crate::util;

/// Keys that mean a credit role, as they appear in the wild.
const CREDIT_SYNONYMS: &[(ComicRole, &[&str])] = &[
    (
        ComicRole::Writer,
        &[
            "Script",
            "Game Guru",
            "Reviewer",
            "Interviewer",
            "News Hound",
            "News",
            "Newshound",
            "Reporter",
            "Problem Solver",
            "Script & Art",
        ],
    ),
    (
        ComicRole::Artist,
        &["Art", "Artist", "Script & Art", "Photographer"],
    ),
    (ComicRole::Colorist, &["Colour", "Color", "Colouring"]),
    (ComicRole::Letterer, &["Lettering"]),
    (
        ComicRole::Editor,
        &[
            "Editor",
            "Asst Editor",
            "Managing Editor",
            "Assistant Editor",
            "Asst. Editor",
            "Co-Editor",
            "Editorial Assistant",
            "Editorial Assistance",
            "Features Editor",
            "Review Zone Editor",
        ],
    ),
    (
        ComicRole::Designer,
        &["Design", "Designer", "Cover Designer", "Cover Design"],
    ),
    (ComicRole::Producer, &["Production"]),
];

impl ComicMetadata {
    /// Parse a legacy tag file. The format is too loose to fail: unrecognized
    /// lines are simply skipped.
    pub fn from_tag_file(bytes: &[u8]) -> ComicMetadata {
        let text = util::decode_text(bytes);
        let mut metadata = ComicMetadata::new();
        let mut contents_started = false;

        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            let line = line.trim();

            if let Some(colon) = line.find(':') {
                let key = line[..colon].trim().to_lowercase();
                let value = line[colon + 1..].trim();
                if key.is_empty() {
                    continue;
                }
                match key.as_str() {
                    "title" => {
                        if !contents_started && !value.is_empty() {
                            parse_title(&mut metadata, value);
                        }
                    }
                    "date" => {
                        if !contents_started
                            && !value.is_empty()
                            && let Some(date) = parse_release_date(value)
                        {
                            metadata.release_year = Some(date.year());
                            metadata.release_month = Some(u8::from(date.month()));
                            metadata.release_day = Some(date.day());
                        }
                    }
                    "publisher" | "published by" => {
                        if !contents_started && metadata.publisher.is_none() && !value.is_empty() {
                            metadata.publisher = Some(value.to_string());
                        }
                    }
                    "scanned by" => {
                        if !contents_started && !value.is_empty() {
                            metadata.scan_information = Some(format!("Scanned by {value}"));
                        }
                    }
                    "contents" => contents_started = true,
                    _ => {
                        if !value.is_empty() {
                            if contents_started {
                                if let Some(content) = metadata.contents.last_mut() {
                                    parse_credits(&key, value, &mut content.authors);
                                }
                            } else {
                                parse_credits(&key, value, &mut metadata.authors);
                            }
                        }
                    }
                }
            } else if line.starts_with("http://") {
                if !contents_started {
                    metadata.website = Some(line.to_string());
                }
            } else if line.get(..5).is_some_and(|head| head.eq_ignore_ascii_case("page ")) {
                if let Ok(pages) = line[5..].parse::<PageRange>()
                    && let Some(title_line) = lines.next()
                {
                    contents_started = true;
                    metadata.contents.push(parse_section(pages, title_line));
                }
            }
        }

        debug!(
            "imported tag file: {} contents, {} credits",
            metadata.contents.len(),
            metadata.authors.len()
        );
        metadata
    }
}

/// `Series #N` titles name an issue in a series; anything else is a one-shot.
fn parse_title(metadata: &mut ComicMetadata, value: &str) {
    if let Some(hash) = value.find('#')
        && let Ok(issue) = value[hash + 1..].trim().parse::<u32>()
    {
        metadata.series_title = Some(value[..hash].trim().to_string());
        metadata.issue_number = Some(issue);
    } else {
        metadata.issue_title = Some(value.to_string());
    }
}

/// Parse dates like "1st March 1993" or "21 Mar 1993".
fn parse_release_date(value: &str) -> Option<Date> {
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let space = value.find(' ')?;

    // Strip the ordinal suffix off the day
    let mut day = value[..space].to_string();
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(i) = day.find(suffix) {
            day.replace_range(i..i + 2, "");
        }
    }
    let normalized = format!("{day}{}", &value[space..]);

    let short =
        format_description!("[day padding:none] [month repr:short case_sensitive:false] [year]");
    let long =
        format_description!("[day padding:none] [month repr:long case_sensitive:false] [year]");
    Date::parse(&normalized, &short)
        .or_else(|_| Date::parse(&normalized, &long))
        .ok()
}

/// Build a content section from a `Page N[-M]` line's following title line,
/// pulling out `(part N)` markers and ` - ` story-title splits.
fn parse_section(pages: PageRange, title_line: &str) -> ComicContent {
    let mut title_line = title_line.trim().to_string();
    let mut content = ComicContent {
        pages: Some(pages),
        ..ComicContent::default()
    };

    let dash = title_line.find(" - ");
    let search_from = dash.map(|i| i + 3).unwrap_or(0);
    let lower = title_line.to_ascii_lowercase();
    if let Some(found) = lower[search_from..].find("(part") {
        let part_start = search_from + found;
        if let Some(close) = title_line[part_start..].find(')') {
            let digits = title_line[part_start + 5..part_start + close].trim();
            if let Ok(part) = digits.parse::<u32>() {
                content.part_number = Some(part);
                title_line.truncate(part_start);
            }
        }
    }

    match dash {
        Some(dash) => {
            let title = title_line[..dash].trim().to_string();
            let story_title = title_line[dash + 3..].trim();
            content.story_title = Some(if story_title.is_empty() {
                title.clone()
            } else {
                story_title.to_string()
            });
            content.title = Some(title);
        }
        None => content.title = Some(title_line.trim().to_string()),
    }
    content
}

fn parse_credits(key: &str, value: &str, credits: &mut Vec<ComicAuthor>) {
    for (role, synonyms) in CREDIT_SYNONYMS {
        for synonym in *synonyms {
            if key.eq_ignore_ascii_case(synonym) {
                for name in value.split(['/', '&', ',']) {
                    let name = name.trim();
                    if !name.is_empty() {
                        credits.push(ComicAuthor::new(*role, name));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Title: Sonic the Comic #1
Date: 29th May 1993
Publisher: Fleetway
Scanned by: SomeScanner
Editor: Richard Burton
http://www.example.com

Contents:

Page 1
Cover
Art: Kev Hopgood

Page 3-8
Sonic the Hedgehog - Enter: Sonic (Part 1)
Script: Mark Millar
Art: Woodcock / Corker
Lettering: Steve Potter
";

    #[test]
    fn parses_series_and_issue_from_title() {
        let metadata = ComicMetadata::from_tag_file(SAMPLE.as_bytes());
        assert_eq!(metadata.series_title.as_deref(), Some("Sonic the Comic"));
        assert_eq!(metadata.issue_number, Some(1));
        assert_eq!(metadata.issue_title, None);
    }

    #[test]
    fn parses_ordinal_dates() {
        let metadata = ComicMetadata::from_tag_file(SAMPLE.as_bytes());
        assert_eq!(metadata.release_year, Some(1993));
        assert_eq!(metadata.release_month, Some(5));
        assert_eq!(metadata.release_day, Some(29));
    }

    #[test]
    fn parses_header_fields_and_credits() {
        let metadata = ComicMetadata::from_tag_file(SAMPLE.as_bytes());
        assert_eq!(metadata.publisher.as_deref(), Some("Fleetway"));
        assert_eq!(
            metadata.scan_information.as_deref(),
            Some("Scanned by SomeScanner")
        );
        assert_eq!(metadata.website.as_deref(), Some("http://www.example.com"));
        assert_eq!(
            metadata.authors,
            vec![ComicAuthor::new(ComicRole::Editor, "Richard Burton")]
        );
    }

    #[test]
    fn parses_content_sections() {
        let metadata = ComicMetadata::from_tag_file(SAMPLE.as_bytes());
        assert_eq!(metadata.contents.len(), 2);

        let cover = &metadata.contents[0];
        assert_eq!(cover.pages, Some(PageRange::single(1)));
        assert_eq!(cover.title.as_deref(), Some("Cover"));
        assert_eq!(
            cover.authors,
            vec![ComicAuthor::new(ComicRole::Artist, "Kev Hopgood")]
        );

        let story = &metadata.contents[1];
        assert_eq!(story.pages, Some(PageRange::new(3, 8)));
        assert_eq!(story.title.as_deref(), Some("Sonic the Hedgehog"));
        assert_eq!(story.story_title.as_deref(), Some("Enter: Sonic"));
        assert_eq!(story.part_number, Some(1));
    }

    #[test]
    fn splits_multiple_names_in_one_credit() {
        let metadata = ComicMetadata::from_tag_file(SAMPLE.as_bytes());
        let story = &metadata.contents[1];
        let artists: Vec<&str> = story
            .authors
            .iter()
            .filter(|a| a.role == ComicRole::Artist)
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(artists, ["Woodcock", "Corker"]);
    }

    #[test]
    fn role_synonyms_map_to_canonical_roles() {
        let text = "Colour: John Burns\nDesign: Someone Else\n";
        let metadata = ComicMetadata::from_tag_file(text.as_bytes());
        assert_eq!(
            metadata.authors,
            vec![
                ComicAuthor::new(ComicRole::Colorist, "John Burns"),
                ComicAuthor::new(ComicRole::Designer, "Someone Else"),
            ]
        );
    }

    #[test]
    fn credits_after_contents_attach_to_the_open_section() {
        let metadata = ComicMetadata::from_tag_file(SAMPLE.as_bytes());
        // "Script: Mark Millar" lands on the page-3 section, not the issue
        assert!(
            metadata.contents[1]
                .authors
                .iter()
                .any(|a| a.role == ComicRole::Writer && a.name == "Mark Millar")
        );
        assert!(!metadata.authors.iter().any(|a| a.name == "Mark Millar"));
    }

    #[test]
    fn one_shot_title_without_hash() {
        let metadata = ComicMetadata::from_tag_file(b"Title: Watchmen\n");
        assert_eq!(metadata.issue_title.as_deref(), Some("Watchmen"));
        assert_eq!(metadata.series_title, None);
    }

    #[test]
    fn long_month_names_parse_too() {
        let metadata = ComicMetadata::from_tag_file(b"Date: 1 March 1993\n");
        assert_eq!(metadata.release_year, Some(1993));
        assert_eq!(metadata.release_month, Some(3));
        assert_eq!(metadata.release_day, Some(1));
    }
}
