//! Matching behaviour against realistic signatures and files.

use crate::common::samples;
use formatid::io::{FileSource, IOLimits, MemorySource};
use formatid::signature::{
    compile, compile_anchored, matches, Anchor, InternalSignature, InternalSignatureCollection,
    SequenceMatcher,
};
use proptest::prelude::*;

fn hit(expr: &str, anchor: Anchor, data: &[u8]) -> bool {
    matches(&compile(expr, anchor).unwrap(), data, None)
}

#[test]
fn pdf_header_and_trailer() {
    let pdf = samples::pdf('7');
    assert!(hit("'%PDF-1.' [30:37]", Anchor::Bof, &pdf));
    assert!(hit("'%%EOF' {0-2}", Anchor::Eof, &pdf));
    assert!(!hit("'%%EOF'", Anchor::Eof, &pdf));
    assert!(hit("'%%EOF' 0A", Anchor::Eof, &pdf));
    assert!(!hit("'%PDF-2.'", Anchor::Bof, &pdf));
}

#[test]
fn bof_window_and_multiple_fragments() {
    let png = samples::png();
    assert!(hit("89 'PNG' 0D0A1A0A {4} 'IHDR'", Anchor::Bof, &png));
    assert!(hit("{0-2} 'PNG'", Anchor::Bof, &png));
    assert!(!hit("{2-8} 'PNG'", Anchor::Bof, &png));
    assert!(hit("89 * 'IHDR'", Anchor::Bof, &png));
    assert!(!hit("89 {0-5} 'IHDR'", Anchor::Bof, &png));
}

#[test]
fn variable_sequences_search_anywhere() {
    let html = samples::html();
    assert!(hit("'<' ['Hh'] ['Tt'] ['Mm'] ['Ll']", Anchor::Variable, &html));
    assert!(hit("'<body>' * '</body>'", Anchor::Variable, &html));
    assert!(!hit("'</body>' * '<body>'", Anchor::Variable, &html));
    assert!(hit("{16-*} '<HTML>'", Anchor::Variable, &html));
    assert!(!hit("{17-*} '<HTML>'", Anchor::Variable, &html));
}

#[test]
fn eof_sequences_with_inner_gaps() {
    let data = b"header....PK\x05\x06\x00\x00\x00\x00 comment";
    assert!(hit("504B0506 {2} 0000 {8}", Anchor::Eof, data));
    assert!(hit("504B0506 * {8-*}", Anchor::Eof, data));
    assert!(!hit("504B0506 {2} 0000", Anchor::Eof, data));
}

#[test]
fn alternatives_of_different_lengths() {
    let seq = compile("66747970 ('isom'|'mp4'|'qt  ')", Anchor::Variable).unwrap();
    assert!(matches(&seq, b"\x00\x00\x00\x18ftypisom", None));
    assert!(matches(&seq, b"\x00\x00\x00\x18ftypmp42", None));
    assert!(matches(&seq, b"....ftypqt  ", None));
    assert!(!matches(&seq, b"....ftypm4a ", None));
}

#[test]
fn limit_bounds_the_scan() {
    let mut data = vec![0u8; 4096];
    data.extend_from_slice(b"MAGIC");
    let seq = compile("'MAGIC'", Anchor::Variable).unwrap();
    assert!(matches(&seq, &data, None));
    assert!(matches(&seq, &data, Some(4101)));
    assert!(!matches(&seq, &data, Some(4100)));

    let eof = compile("00 'MAGIC'", Anchor::Eof).unwrap();
    assert!(matches(&eof, &data, Some(6)));
    assert!(!matches(&eof, &data, Some(5)));
}

#[test]
fn registry_keywords() {
    let seq = compile_anchored("'GIF89a'", "BOFoffset").unwrap();
    assert_eq!(seq.anchor(), Anchor::Bof);
    assert!(compile_anchored("'GIF89a'", "middle").is_err());
}

#[test]
fn matcher_over_a_mapped_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = crate::common::file_utils::write_file(dir.path(), "image.png", &samples::png());
    let source = FileSource::open(&path, &IOLimits::default()).unwrap();
    let matcher = SequenceMatcher::new(&compile("89 'PNG'", Anchor::Bof).unwrap());
    use formatid::io::ByteSource;
    assert!(matcher.matches(source.bytes(), None));

    let empty = crate::common::file_utils::write_file(dir.path(), "empty", b"");
    let source = FileSource::open(&empty, &IOLimits::default()).unwrap();
    assert!(!matcher.matches(source.bytes(), None));
}

#[test]
fn signatures_require_every_sequence() {
    let signature = InternalSignature::new(
        3,
        vec![
            compile("'%PDF-1.4'", Anchor::Bof).unwrap(),
            compile("'%%EOF' {0-2}", Anchor::Eof).unwrap(),
        ],
        vec!["fmt/18".into()],
    )
    .unwrap();
    let good = MemorySource::new(samples::pdf('4'));
    let mut truncated = samples::pdf('4');
    truncated.truncate(truncated.len() - 8);
    let truncated = MemorySource::new(truncated);

    assert!(signature.matches(&good, None));
    assert!(!signature.matches(&truncated, None));

    let collection: InternalSignatureCollection = vec![signature].into_iter().collect();
    assert_eq!(collection.get_matching_signatures(&good, None).len(), 1);
    assert!(collection.get_matching_signatures(&truncated, None).is_empty());
}

proptest! {
    #[test]
    fn literal_bof_is_prefix_test(
        needle in prop::collection::vec(any::<u8>(), 1..6),
        data in prop::collection::vec(0u8..4, 0..64),
    ) {
        let expr = hex::encode(&needle);
        prop_assert_eq!(hit(&expr, Anchor::Bof, &data), data.starts_with(&needle));
    }

    #[test]
    fn literal_eof_is_suffix_test(
        needle in prop::collection::vec(0u8..4, 1..4),
        data in prop::collection::vec(0u8..4, 0..64),
    ) {
        let expr = hex::encode(&needle);
        prop_assert_eq!(hit(&expr, Anchor::Eof, &data), data.ends_with(&needle));
    }

    #[test]
    fn literal_variable_is_substring_test(
        needle in prop::collection::vec(0u8..3, 1..4),
        data in prop::collection::vec(0u8..3, 0..64),
    ) {
        let expr = hex::encode(&needle);
        let expected = data.windows(needle.len()).any(|w| w == needle.as_slice());
        prop_assert_eq!(hit(&expr, Anchor::Variable, &data), expected);
    }

    #[test]
    fn gapped_variable_matches_brute_force(
        a in 0u8..3,
        b in 0u8..3,
        min in 0usize..4,
        extra in 0usize..4,
        data in prop::collection::vec(0u8..3, 0..48),
    ) {
        let max = min + extra;
        let expr = format!("{a:02X} {{{min}-{max}}} {b:02X}");
        let expected = (0..data.len()).any(|i| {
            data[i] == a && (min..=max).any(|g| data.get(i + 1 + g) == Some(&b))
        });
        prop_assert_eq!(hit(&expr, Anchor::Variable, &data), expected);
    }
}
