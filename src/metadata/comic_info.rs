//! ComicInfo.xml serialization.
//!
//! This is the structured metadata format and the only one the crate ever
//! writes: one element per header field, repeated role-named elements per
//! credit, and a `Contents` container with one `Content` element per
//! section.

use std::fmt::Write;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::metadata::{ComicAuthor, ComicContent, ComicMetadata, ComicRole, ContentKind};
use crate::util;

impl ComicMetadata {
    /// Parse a ComicInfo.xml document.
    pub fn from_comic_info(bytes: &[u8]) -> Result<ComicMetadata> {
        let text = util::decode_text(bytes);
        let mut reader = Reader::from_str(&text);
        reader.config_mut().trim_text(true);

        let mut metadata = ComicMetadata::new();
        let mut in_contents = false;
        let mut current_content: Option<ComicContent> = None;
        let mut current_element: Option<String> = None;
        let mut buf_text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"ComicInfo" => {}
                    b"Contents" => in_contents = true,
                    b"Content" if in_contents => {
                        current_content = Some(ComicContent::default());
                    }
                    name => {
                        current_element = Some(String::from_utf8(name.to_vec())?);
                        buf_text.clear();
                    }
                },
                Ok(Event::Text(e)) => {
                    if current_element.is_some() {
                        buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    // Handle entity references like &apos; &lt; etc
                    if current_element.is_some() {
                        let entity = String::from_utf8_lossy(e.as_ref());
                        let resolved = match entity.as_ref() {
                            "apos" => "'",
                            "quot" => "\"",
                            "lt" => "<",
                            "gt" => ">",
                            "amp" => "&",
                            _ => "",
                        };
                        buf_text.push_str(resolved);
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"Contents" => in_contents = false,
                    b"Content" => {
                        if let Some(content) = current_content.take() {
                            metadata.contents.push(content);
                        }
                    }
                    _ => {
                        if let Some(element) = current_element.take() {
                            match &mut current_content {
                                Some(content) => apply_content_field(content, &element, &buf_text),
                                None => apply_header_field(&mut metadata, &element, &buf_text),
                            }
                            buf_text.clear();
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
        }

        Ok(metadata)
    }

    /// Serialize to a ComicInfo.xml document.
    pub fn to_comic_info_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ComicInfo>\n");

        push_opt(&mut xml, 1, "Title", self.issue_title.as_deref());
        push_opt(&mut xml, 1, "Series", self.series_title.as_deref());
        push_num(&mut xml, 1, "Number", self.issue_number);
        push_num(&mut xml, 1, "Volume", self.volume_number);
        push_opt(&mut xml, 1, "Summary", self.summary.as_deref());
        push_opt(&mut xml, 1, "Notes", self.notes.as_deref());
        push_num(&mut xml, 1, "Year", self.release_year);
        push_num(&mut xml, 1, "Month", self.release_month);
        push_num(&mut xml, 1, "Day", self.release_day);
        push_opt(&mut xml, 1, "Publisher", self.publisher.as_deref());
        push_opt(&mut xml, 1, "Imprint", self.imprint.as_deref());
        push_opt(&mut xml, 1, "Genre", self.genre.as_deref());
        push_opt(&mut xml, 1, "Web", self.website.as_deref());
        push_opt(&mut xml, 1, "LanguageISO", self.language.as_deref());
        push_opt(&mut xml, 1, "ScanInformation", self.scan_information.as_deref());

        for author in &self.authors {
            push_element(&mut xml, 1, author.role.as_str(), &author.name);
        }

        xml.push_str("  <Contents>\n");
        for content in &self.contents {
            xml.push_str("    <Content>\n");
            push_opt(&mut xml, 3, "ContentType", content.kind.map(ContentKind::as_str));
            if let Some(pages) = content.pages {
                push_element(&mut xml, 3, "Pages", &pages.to_string());
            }
            push_opt(&mut xml, 3, "Title", content.title.as_deref());
            push_opt(&mut xml, 3, "Story", content.story_title.as_deref());
            push_num(&mut xml, 3, "Part", content.part_number);
            for author in &content.authors {
                push_element(&mut xml, 3, author.role.as_str(), &author.name);
            }
            xml.push_str("    </Content>\n");
        }
        xml.push_str("  </Contents>\n</ComicInfo>\n");
        xml
    }
}

fn apply_header_field(metadata: &mut ComicMetadata, element: &str, value: &str) {
    match element {
        "Title" => metadata.issue_title = Some(value.to_string()),
        "Series" => metadata.series_title = Some(value.to_string()),
        "Number" => metadata.issue_number = value.parse().ok(),
        "Volume" => metadata.volume_number = value.parse().ok(),
        "Summary" => metadata.summary = Some(value.to_string()),
        "Notes" => metadata.notes = Some(value.to_string()),
        "Year" => metadata.release_year = value.parse().ok(),
        "Month" => metadata.release_month = value.parse().ok(),
        "Day" => metadata.release_day = value.parse().ok(),
        "Publisher" => metadata.publisher = Some(value.to_string()),
        "Imprint" => metadata.imprint = Some(value.to_string()),
        "Genre" => metadata.genre = Some(value.to_string()),
        "Web" => metadata.website = Some(value.to_string()),
        "LanguageISO" => metadata.language = Some(value.to_string()),
        "ScanInformation" => metadata.scan_information = Some(value.to_string()),
        _ => {
            if let Some(role) = ComicRole::from_name(element) {
                metadata.authors.push(ComicAuthor::new(role, value));
            }
        }
    }
}

fn apply_content_field(content: &mut ComicContent, element: &str, value: &str) {
    match element {
        "ContentType" => content.kind = ContentKind::from_name(value),
        "Pages" => content.pages = value.parse().ok(),
        "Title" => content.title = Some(value.to_string()),
        "Story" => content.story_title = Some(value.to_string()),
        "Part" => content.part_number = value.parse().ok(),
        _ => {
            if let Some(role) = ComicRole::from_name(element) {
                content.authors.push(ComicAuthor::new(role, value));
            }
        }
    }
}

fn push_element(xml: &mut String, indent: usize, name: &str, value: &str) {
    let _ = writeln!(
        xml,
        "{}<{name}>{}</{name}>",
        "  ".repeat(indent),
        escape_xml(value)
    );
}

fn push_opt(xml: &mut String, indent: usize, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        push_element(xml, indent, name, value);
    }
}

fn push_num<T: ToString>(xml: &mut String, indent: usize, name: &str, value: Option<T>) {
    if let Some(value) = value {
        push_element(xml, indent, name, &value.to_string());
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
