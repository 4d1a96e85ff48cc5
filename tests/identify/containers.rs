//! Container dispatch over synthetic ZIP and OLE2 files.

use crate::common::catalogues::{self, *};
use crate::common::{build_ole2, build_zip, file_utils};
use formatid::identify::{ContainerArchive, ContainerKind, Ole2Container};
use formatid::{Engine, IdentificationMethod, IdentificationRequest, IdentificationResultCollection, Specificity};

fn engine() -> Engine {
    Engine::new(&catalogues::binary(), &catalogues::containers()).unwrap()
}

fn identify(engine: &Engine, name: &str, data: Vec<u8>) -> IdentificationResultCollection {
    let request = IdentificationRequest::from_bytes(name, data);
    engine.submit_request(&request).unwrap()
}

fn docx() -> Vec<u8> {
    build_zip(&[
        ("[Content_Types].xml", b"<Types/>"),
        ("_rels/.rels", b"<Relationships/>"),
        ("word/document.xml", b"<w:document/>"),
    ])
}

fn word97() -> Vec<u8> {
    let mut compobj = vec![0x01, 0x00, 0xFE, 0xFF, 0x03, 0x0A, 0x00, 0x00];
    compobj.extend_from_slice(b"\x20\x00\x00\x00Microsoft Word 97-2003 Document\x00");
    let body = vec![0xA5u8; 5000];
    build_ole2(&[("WordDocument", &body), ("CompObj", &compobj)])
}

#[test]
fn container_hit_replaces_generic_wrapper() {
    let results = identify(&engine(), "report.docx", docx());
    assert_eq!(results.puids(), vec![DOCX]);
    let hit = &results.results()[0];
    assert_eq!(hit.method, IdentificationMethod::Container);
    assert_eq!(hit.specificity, Specificity::Specific);
    assert!(!hit.extension_mismatch);
    assert_eq!(results.file_length(), Some(docx().len() as u64));
    assert!(results.request_metadata().is_some());
}

#[test]
fn container_results_are_mismatch_checked() {
    let results = identify(&engine(), "report.zip", docx());
    assert_eq!(results.puids(), vec![DOCX]);
    assert!(results.results()[0].extension_mismatch);
}

#[test]
fn entry_content_selects_the_format() {
    let odt = build_zip(&[
        ("mimetype", b"application/vnd.oasis.opendocument.text"),
        ("content.xml", b"<office:document-content/>"),
    ]);
    assert_eq!(identify(&engine(), "letter.odt", odt).puids(), vec![ODT]);
}

#[test]
fn empty_container_pass_keeps_binary_result() {
    let epub = build_zip(&[
        ("mimetype", b"application/epub+zip"),
        ("META-INF/container.xml", b"<container/>"),
    ]);
    let results = identify(&engine(), "book.odt", epub);
    assert_eq!(results.puids(), vec![ZIP]);
    assert_eq!(results.results()[0].method, IdentificationMethod::Binary);
    // The wrapper hit is returned as matched, so no mismatch flag for `.odt`.
    assert!(!results.results()[0].extension_mismatch);

    let plain = build_zip(&[("readme.txt", b"hello")]);
    let results = identify(&engine(), "bundle.zip", plain);
    assert_eq!(results.puids(), vec![ZIP]);
    assert!(!results.results()[0].extension_mismatch);
}

#[test]
fn corrupt_archive_falls_back_to_wrapper() {
    let mut data = b"PK\x03\x04".to_vec();
    data.extend_from_slice(&[0xEE; 64]);
    let results = identify(&engine(), "broken.zip", data);
    assert_eq!(results.puids(), vec![ZIP]);
}

#[test]
fn ole2_word_document() {
    let results = identify(&engine(), "letter.doc", word97());
    assert_eq!(results.puids(), vec![WORD97]);
    assert_eq!(results.results()[0].method, IdentificationMethod::Container);
}

#[test]
fn ole2_entry_names_ignore_case() {
    let data = build_ole2(&[("WORKBOOK", &[0x09, 0x08, 0x10, 0x00, 0x00, 0x06])]);
    assert_eq!(identify(&engine(), "sheet.xls", data).puids(), vec![XLS]);
}

#[test]
fn unrecognised_ole2_keeps_wrapper() {
    let data = build_ole2(&[("Contents", b"opaque")]);
    let results = identify(&engine(), "thing.doc", data);
    assert_eq!(results.puids(), vec![OLE2]);
    assert!(!results.results()[0].extension_mismatch);
}

#[test]
fn ole2_reader_serves_mini_and_regular_streams() {
    let big: Vec<u8> = (0..6000u32).map(|i| (i % 251) as u8).collect();
    let data = build_ole2(&[("Small", b"tiny stream"), ("Large", &big), ("Empty", b"")]);
    let mut doc = Ole2Container::open(&data).unwrap();

    let mut names: Vec<&str> = doc.names().collect();
    names.sort();
    assert_eq!(names, vec!["empty", "large", "small"]);

    assert_eq!(doc.read_entry("small", u64::MAX).unwrap().unwrap().as_ref(), b"tiny stream");
    assert_eq!(doc.read_entry("LARGE", u64::MAX).unwrap().unwrap().as_ref(), big.as_slice());
    assert_eq!(doc.read_entry("Large", 700).unwrap().unwrap().as_ref(), &big[..700]);
    assert!(doc.read_entry("Empty", 10).unwrap().unwrap().is_empty());
    assert!(doc.read_entry("Missing", 10).unwrap().is_none());
    assert!(doc.contains("sMaLl"));
}

#[test]
fn container_identifiers_are_built_per_kind() {
    let engine = engine();
    assert_eq!(engine.container(ContainerKind::Zip).unwrap().len(), 2);
    assert_eq!(engine.container(ContainerKind::Ole2).unwrap().len(), 2);
}

#[test]
fn containers_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let docx_path = file_utils::write_file(dir.path(), "report.docx", &docx());
    let doc_path = file_utils::write_file(dir.path(), "letter.doc", &word97());
    let engine = engine();
    assert_eq!(engine.submit(&docx_path).unwrap().puids(), vec![DOCX]);
    assert_eq!(engine.submit(&doc_path).unwrap().puids(), vec![WORD97]);
}
