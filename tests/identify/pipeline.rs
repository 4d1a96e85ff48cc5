//! Result resolution: priorities, mismatches and the extension fallback.

use crate::common::catalogues::{self, *};
use crate::common::{file_utils, samples};
use formatid::identify::{
    BinarySignatureDefinitions, ContainerSignatureDefinitions, EngineConfig, ExtensionFallback,
};
use formatid::{
    Engine, FormatIdError, IdentificationMethod, IdentificationRequest,
    IdentificationResultCollection, SignatureLoadError, Specificity,
};

fn engine() -> Engine {
    Engine::new(&catalogues::binary(), &catalogues::containers()).unwrap()
}

fn identify(engine: &Engine, name: &str, data: &[u8]) -> IdentificationResultCollection {
    let request = IdentificationRequest::from_bytes(name, data.to_vec());
    engine.submit_request(&request).unwrap()
}

#[test]
fn priority_removes_outranked_hits() {
    let results = identify(&engine(), "paper.pdf", &samples::pdf('4'));
    assert_eq!(results.puids(), vec![PDF_17]);
    let hit = &results.results()[0];
    assert_eq!(hit.method, IdentificationMethod::Binary);
    assert_eq!(hit.version.as_deref(), Some("1.7"));
    assert_eq!(hit.mime_type.as_deref(), Some("application/pdf"));
    assert!(!hit.extension_mismatch);
}

#[test]
fn extension_mismatch_is_flagged_not_filtered() {
    let engine = engine();
    let results = identify(&engine, "photo.jpg", &samples::png());
    assert_eq!(results.puids(), vec![PNG]);
    assert!(results.results()[0].extension_mismatch);

    let results = identify(&engine, "photo.PNG", &samples::png());
    assert!(!results.results()[0].extension_mismatch);
}

#[test]
fn binary_evidence_excludes_extension_hits() {
    let results = identify(&engine(), "page.txt", &samples::html());
    assert_eq!(results.puids(), vec![HTML]);
    assert_eq!(results.results()[0].method, IdentificationMethod::Binary);
    assert!(results.results()[0].extension_mismatch);
}

#[test]
fn extension_fallback_when_nothing_matches() {
    let engine = engine();
    let results = identify(&engine, "notes.txt", b"just some words\n");
    assert_eq!(results.puids(), vec![TEXT]);
    assert_eq!(results.results()[0].method, IdentificationMethod::Extension);
    assert_eq!(results.results()[0].specificity, Specificity::Generic);

    // Both formats claim .csv; the fallback set is priority filtered too.
    let results = identify(&engine, "table.csv", b"a,b\n1,2\n");
    assert_eq!(results.puids(), vec![CSV]);

    let results = identify(&engine, "old.pdf", &samples::pdf('2'));
    assert_eq!(results.puids(), vec![PDF_17]);
    assert_eq!(results.results()[0].method, IdentificationMethod::Extension);

    assert!(identify(&engine, "mystery", b"\x00\x01\x02").is_empty());
    assert!(identify(&engine, "mystery.xyz", b"\x00\x01\x02").is_empty());
}

#[test]
fn tentative_only_fallback() {
    let config = EngineConfig {
        extension_fallback: ExtensionFallback::TentativeOnly,
        ..EngineConfig::default()
    };
    let engine =
        Engine::with_config(&catalogues::binary(), &catalogues::containers(), config).unwrap();
    assert!(identify(&engine, "fake.png", b"not an image").is_empty());
    assert_eq!(
        identify(&engine, "notes.txt", b"words").puids(),
        vec![TEXT]
    );
}

#[test]
fn scan_limit_applies_to_variable_sequences() {
    let config = EngineConfig {
        max_bytes_to_scan: Some(16),
        ..EngineConfig::default()
    };
    let limited =
        Engine::with_config(&catalogues::binary(), &catalogues::containers(), config).unwrap();
    let results = identify(&limited, "page.html", &samples::html());
    assert_eq!(results.puids(), vec![HTML]);
    assert_eq!(results.results()[0].method, IdentificationMethod::Extension);

    let results = identify(&engine(), "page.html", &samples::html());
    assert_eq!(results.results()[0].method, IdentificationMethod::Binary);
}

#[test]
fn submit_by_path_carries_request_facts() {
    let dir = tempfile::tempdir().unwrap();
    let path = file_utils::write_file(dir.path(), "paper.pdf", &samples::pdf('7'));
    let results = engine().submit(&path).unwrap();

    assert_eq!(results.puids(), vec![PDF_17]);
    assert_eq!(results.file_length(), Some(samples::pdf('7').len() as u64));
    let metadata = results.request_metadata().unwrap();
    assert!(metadata.name.ends_with("paper.pdf"));
    assert!(metadata.last_modified.is_some());
    let identifier = results.request_identifier().unwrap();
    assert!(identifier.uri.starts_with("file://"));
    let parent_id = identifier.parent_id.expect("top-level requests get a parent id");
    assert_ne!(parent_id, identifier.node_id);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = engine().submit(dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, FormatIdError::Io(_)));
    assert_eq!(err.exit_code(), 19);
}

#[test]
fn oversized_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = file_utils::write_file(dir.path(), "big.png", &samples::png());
    let mut config = EngineConfig::default();
    config.io.max_file_size = 8;
    let engine =
        Engine::with_config(&catalogues::binary(), &catalogues::containers(), config).unwrap();
    assert!(matches!(engine.submit(&path), Err(FormatIdError::Io(_))));
}

#[test]
fn empty_file_uses_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = file_utils::write_file(dir.path(), "empty.txt", b"");
    let results = engine().submit(&path).unwrap();
    assert_eq!(results.puids(), vec![TEXT]);
    assert_eq!(results.file_length(), Some(0));
}

#[test]
fn engine_from_json_catalogues() {
    let dir = tempfile::tempdir().unwrap();
    let binary = file_utils::write_json(dir.path(), "binary.json", &catalogues::binary());
    let containers = file_utils::write_json(dir.path(), "container.json", &catalogues::containers());
    let engine = Engine::from_json_files(&binary, &containers, EngineConfig::default()).unwrap();
    assert_eq!(engine.binary().version(), "test-1");
    assert_eq!(identify(&engine, "a.gif", b"GIF89a....").puids(), vec![GIF]);

    let garbage = file_utils::write_file(dir.path(), "garbage.json", b"{ not json");
    assert!(matches!(
        Engine::from_json_files(&garbage, &containers, EngineConfig::default()),
        Err(SignatureLoadError::Malformed(_))
    ));
    assert!(matches!(
        Engine::from_json_files(dir.path().join("none.json"), &containers, EngineConfig::default()),
        Err(SignatureLoadError::Read { .. })
    ));
}

#[test]
fn strict_mode_rejects_bad_expressions() {
    let mut binary = catalogues::binary();
    binary.signatures.push(catalogues::signature(99, &[TEXT], &[("BOFoffset", "'unterminated")]));

    let lenient = Engine::new(&binary, &catalogues::containers()).unwrap();
    assert_eq!(
        lenient.binary().signatures().len(),
        catalogues::binary().signatures.len()
    );

    let strict = EngineConfig {
        strict_signatures: true,
        ..EngineConfig::default()
    };
    let err = Engine::with_config(&binary, &catalogues::containers(), strict).unwrap_err();
    assert!(matches!(err, SignatureLoadError::InvalidSequence { signature: 99, .. }));
    assert_eq!(FormatIdError::from(err).exit_code(), 10);
}

#[test]
fn catalogue_integrity_is_checked_at_construction() {
    let mut binary = catalogues::binary();
    binary.formats[0].has_priority_over.push(PDF_17.into());
    binary.formats[7].has_priority_over.push(ZIP.into());
    assert!(matches!(
        Engine::new(&binary, &catalogues::containers()),
        Err(SignatureLoadError::PriorityCycle(_))
    ));

    let mut containers = catalogues::containers();
    containers.format_mappings[0].puid = "fmt/9999".into();
    assert!(matches!(
        Engine::new(&catalogues::binary(), &containers),
        Err(SignatureLoadError::UnknownFormat { .. })
    ));

    let mut containers = catalogues::containers();
    containers.format_mappings[0].signature_id = 7;
    assert!(matches!(
        Engine::new(&catalogues::binary(), &containers),
        Err(SignatureLoadError::UnknownContainerSignature(7))
    ));

    assert!(Engine::new(
        &BinarySignatureDefinitions::default(),
        &ContainerSignatureDefinitions::default()
    )
    .is_ok());
}
