use std::fs;

use docsearch_core::error::Error;
use docsearch_core::ingest::{load_document, DocumentIngestor};
use tempfile::TempDir;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn empty_folder_yields_no_chunks() {
    let tmp = TempDir::new().unwrap();
    let ingestor = DocumentIngestor::new(1000, 100).unwrap();
    let out = ingestor.collect(tmp.path(), &patterns(&["*.txt"])).unwrap();
    assert_eq!(out.files_matched, 0);
    assert_eq!(out.num_documents, 0);
    assert!(out.chunks.is_empty());
}

#[test]
fn missing_folder_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let ingestor = DocumentIngestor::new(1000, 100).unwrap();
    let err = ingestor.collect(&tmp.path().join("nope"), &patterns(&["*.txt"])).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn invalid_utf8_file_is_skipped_and_counted() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("good.txt"), "valid text").unwrap();
    fs::write(tmp.path().join("bad.txt"), [0x66, 0x6f, 0xff, 0xfe, 0x6f]).unwrap();

    let ingestor = DocumentIngestor::new(1000, 100).unwrap();
    let out = ingestor.collect(tmp.path(), &patterns(&["*.txt"])).unwrap();

    assert_eq!(out.files_matched, 2);
    assert_eq!(out.num_documents, 1);
    assert_eq!(out.skipped_files.len(), 1);
    assert!(out.skipped_files[0].path.ends_with("bad.txt"));
    assert_eq!(out.chunks.len(), 1);
    assert_eq!(out.chunks[0].content, "valid text");
}

#[test]
fn single_star_stays_in_one_directory_double_star_descends() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("sub/deeper")).unwrap();
    fs::write(tmp.path().join("top.md"), "top").unwrap();
    fs::write(tmp.path().join("sub/inner.md"), "inner").unwrap();
    fs::write(tmp.path().join("sub/deeper/deep.md"), "deep").unwrap();
    fs::write(tmp.path().join("ignored.rs"), "fn main() {}").unwrap();

    let ingestor = DocumentIngestor::new(100, 10).unwrap();
    let shallow = ingestor.discover(tmp.path(), &patterns(&["*.md"])).unwrap().files;
    assert_eq!(shallow, vec![tmp.path().join("top.md")]);

    let deep = ingestor.discover(tmp.path(), &patterns(&["**/*.md"])).unwrap().files;
    assert_eq!(deep.len(), 3);
    assert!(deep.windows(2).all(|w| w[0] <= w[1]), "sorted");
}

#[test]
fn overlapping_patterns_do_not_duplicate_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "x").unwrap();
    let ingestor = DocumentIngestor::new(100, 10).unwrap();
    let found = ingestor.discover(tmp.path(), &patterns(&["*.txt", "notes.*"])).unwrap();
    assert_eq!(found.files.len(), 1);
    assert!(found.skipped.is_empty());
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_is_reported_as_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let locked = tmp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden.txt"), "secret pricing").unwrap();
    fs::write(tmp.path().join("open.txt"), "visible text").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores directory permissions; nothing to observe there.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let ingestor = DocumentIngestor::new(1000, 100).unwrap();
    let out = ingestor.collect(tmp.path(), &patterns(&["**/*.txt"]));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let out = out.unwrap();

    assert_eq!(out.num_documents, 1);
    assert_eq!(out.skipped_files.len(), 1);
    assert!(out.skipped_files[0].path.ends_with("locked"));
    assert!(!out.skipped_files[0].reason.is_empty());
}

#[test]
fn loaded_documents_carry_source_title_and_type() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pricing.md");
    fs::write(&path, "# Pricing").unwrap();
    let doc = load_document(&path).unwrap();
    assert_eq!(doc.metadata["source"].as_str(), path.to_str());
    assert_eq!(doc.metadata["title"], "pricing");
    assert_eq!(doc.metadata["type"], "md");
}

#[test]
fn chunks_are_sanitized_before_splitting() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("b.txt"),
        "Welcome <script>steal()</script> to the docs. The annual price is $500.",
    )
    .unwrap();
    let ingestor = DocumentIngestor::new(30, 5).unwrap();
    let out = ingestor.collect(tmp.path(), &patterns(&["*.txt"])).unwrap();
    assert!(out.chunks.len() > 1);
    for chunk in &out.chunks {
        assert!(!chunk.content.contains("script"));
        assert!(chunk.content.chars().count() <= 30);
        assert!(chunk.source().ends_with("b.txt"));
    }
}
