use std::fs::File;
use std::io::Write;
use std::path::Path;

use cbz::{
    ArchiveMode, ComicArchive, ComicAuthor, ComicContent, ComicMetadata, ComicRole, ContentKind,
    Error, PageList, PageRange,
};
use tempfile::TempDir;

fn write_cbz(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create fixture");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(data).expect("write entry");
    }
    writer.finish().expect("finish fixture");
}

fn zip_entry_names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn sample_metadata() -> ComicMetadata {
    let mut metadata = ComicMetadata::new();
    metadata.series_title = Some("Sonic the Comic".to_string());
    metadata.issue_number = Some(1);
    metadata.release_year = Some(1993);
    metadata.release_month = Some(5);
    metadata.release_day = Some(29);
    metadata.publisher = Some("Fleetway".to_string());
    metadata.language = Some("en".to_string());
    metadata
        .authors
        .push(ComicAuthor::new(ComicRole::Editor, "Richard Burton"));
    metadata.contents.push(ComicContent {
        kind: Some(ContentKind::Cover),
        pages: Some(PageRange::single(1)),
        title: Some("Cover".to_string()),
        ..ComicContent::default()
    });
    metadata.contents.push(ComicContent {
        kind: Some(ContentKind::Story),
        pages: Some(PageRange::new(3, 8)),
        title: Some("Sonic the Hedgehog".to_string()),
        story_title: Some("Enter: Sonic".to_string()),
        part_number: Some(1),
        authors: vec![ComicAuthor::new(ComicRole::Writer, "Mark Millar")],
    });
    metadata
}

#[test]
fn store_and_reload_through_an_archive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("issue.cbz");

    let mut comic = ComicArchive::open(&path, ArchiveMode::Create).unwrap();
    comic.append_page(b"cover".to_vec(), ".png").unwrap();
    comic.set_metadata(Some(sample_metadata()));
    comic.store_metadata_changes().unwrap();
    comic.flush().unwrap();
    drop(comic);

    let mut reopened = ComicArchive::open(&path, ArchiveMode::Read).unwrap();
    let metadata = reopened.metadata().unwrap().expect("metadata should load");
    assert_eq!(*metadata, sample_metadata());
}

#[test]
fn metadata_is_buffered_until_stored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("issue.cbz");
    write_cbz(&path, &[("01.jpg", b"p1" as &[u8])]);

    let mut comic = ComicArchive::open(&path, ArchiveMode::Modify).unwrap();
    assert!(comic.metadata().unwrap().is_none());
    comic.set_metadata(Some(sample_metadata()));
    comic.flush().unwrap();
    drop(comic);

    // Never stored, so nothing was persisted
    let mut reopened = ComicArchive::open(&path, ArchiveMode::Read).unwrap();
    assert!(reopened.metadata().unwrap().is_none());
}

#[test]
fn legacy_tag_file_imports_and_upgrades_to_comic_info() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("issue.cbz");
    let tag = b"Title: Sonic the Comic #1\nDate: 29th May 1993\nPublisher: Fleetway\n";
    write_cbz(
        &path,
        &[("01.jpg", b"p1" as &[u8]), ("tag.txt", tag as &[u8])],
    );

    let mut comic = ComicArchive::open(&path, ArchiveMode::Modify).unwrap();
    {
        let metadata = comic.metadata().unwrap().expect("tag.txt should import");
        assert_eq!(metadata.series_title.as_deref(), Some("Sonic the Comic"));
        assert_eq!(metadata.issue_number, Some(1));
        assert_eq!(metadata.release_day, Some(29));
    }
    comic.store_metadata_changes().unwrap();
    comic.flush().unwrap();
    drop(comic);

    // Storing rewrites as ComicInfo.xml and removes the legacy entry
    let names = zip_entry_names(&path);
    assert!(names.iter().any(|n| n == "ComicInfo.xml"));
    assert!(!names.iter().any(|n| n == "tag.txt"));

    let mut reopened = ComicArchive::open(&path, ArchiveMode::Read).unwrap();
    let metadata = reopened.metadata().unwrap().expect("upgraded metadata");
    assert_eq!(metadata.publisher.as_deref(), Some("Fleetway"));
}

#[test]
fn comic_info_wins_over_tag_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("issue.cbz");
    write_cbz(
        &path,
        &[
            ("tag.txt", b"Title: From the tag file\n" as &[u8]),
            (
                "ComicInfo.xml",
                b"<ComicInfo><Title>From the XML</Title></ComicInfo>",
            ),
        ],
    );

    let mut comic = ComicArchive::open(&path, ArchiveMode::Read).unwrap();
    let metadata = comic.metadata().unwrap().expect("metadata should load");
    assert_eq!(metadata.issue_title.as_deref(), Some("From the XML"));
}

#[test]
fn storing_none_deletes_metadata_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("issue.cbz");
    write_cbz(
        &path,
        &[
            ("01.jpg", b"p1" as &[u8]),
            (
                "ComicInfo.xml",
                b"<ComicInfo><Title>Old</Title></ComicInfo>",
            ),
        ],
    );

    let mut comic = ComicArchive::open(&path, ArchiveMode::Modify).unwrap();
    comic.set_metadata(None);
    comic.store_metadata_changes().unwrap();
    comic.flush().unwrap();
    drop(comic);

    assert_eq!(zip_entry_names(&path), ["01.jpg"]);
    let mut reopened = ComicArchive::open(&path, ArchiveMode::Read).unwrap();
    assert!(reopened.metadata().unwrap().is_none());
}

#[test]
fn revert_discards_buffered_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("issue.cbz");
    write_cbz(
        &path,
        &[(
            "ComicInfo.xml",
            b"<ComicInfo><Title>Original</Title></ComicInfo>" as &[u8],
        )],
    );

    let mut comic = ComicArchive::open(&path, ArchiveMode::Modify).unwrap();
    comic.set_metadata(Some(sample_metadata()));
    comic.revert_metadata_changes();
    let metadata = comic.metadata().unwrap().expect("reload from container");
    assert_eq!(metadata.issue_title.as_deref(), Some("Original"));
}

#[test]
fn create_mode_stores_metadata_at_most_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.cbz");

    let mut comic = ComicArchive::open(&path, ArchiveMode::Create).unwrap();
    comic.set_metadata(Some(sample_metadata()));
    comic.store_metadata_changes().unwrap();
    let err = comic.store_metadata_changes().unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)), "got {err:?}");
}

#[test]
fn trimmed_metadata_follows_copied_pages() {
    let dir = TempDir::new().unwrap();
    let source_path = dir.path().join("source.cbz");
    write_cbz(
        &source_path,
        &[
            ("01.jpg", b"p1" as &[u8]),
            ("02.jpg", b"p2"),
            ("03.jpg", b"p3"),
            ("04.jpg", b"p4"),
            ("05.jpg", b"p5"),
            ("06.jpg", b"p6"),
            ("07.jpg", b"p7"),
            ("08.jpg", b"p8"),
        ],
    );
    let mut metadata = ComicMetadata::new();
    metadata.contents.push(ComicContent {
        pages: Some(PageRange::new(3, 5)),
        title: Some("Kept".to_string()),
        ..ComicContent::default()
    });
    metadata.contents.push(ComicContent {
        pages: Some(PageRange::new(5, 8)),
        title: Some("Straddles".to_string()),
        ..ComicContent::default()
    });

    let mut source = ComicArchive::open(&source_path, ArchiveMode::Modify).unwrap();
    source.set_metadata(Some(metadata));
    source.store_metadata_changes().unwrap();
    source.flush().unwrap();
    drop(source);

    // Copy pages 3-5 into a fresh archive and carry the trimmed metadata
    let mut source = ComicArchive::open(&source_path, ArchiveMode::Read).unwrap();
    let selector: PageList = "3-5".parse().unwrap();
    let total = source.page_count();
    let trimmed = source
        .metadata()
        .unwrap()
        .expect("source metadata")
        .trim(&selector, total);

    let dest_path = dir.path().join("excerpt.cbz");
    let mut dest = ComicArchive::open(&dest_path, ArchiveMode::Create).unwrap();
    dest.append_pages_from_archive(&mut source, &selector)
        .unwrap();
    dest.set_metadata(Some(trimmed));
    dest.store_metadata_changes().unwrap();
    dest.flush().unwrap();
    drop(dest);

    let mut reopened = ComicArchive::open(&dest_path, ArchiveMode::Read).unwrap();
    assert_eq!(reopened.page_count(), 3);
    let metadata = reopened.metadata().unwrap().expect("trimmed metadata");
    // (3,5) maps onto the excerpt's pages 1-3; the straddling entry is gone
    assert_eq!(metadata.contents.len(), 1);
    assert_eq!(metadata.contents[0].title.as_deref(), Some("Kept"));
    assert_eq!(metadata.contents[0].pages, Some(PageRange::new(1, 3)));
}
