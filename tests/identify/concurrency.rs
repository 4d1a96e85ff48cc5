//! One engine shared across worker threads.

use crate::common::catalogues::{self, *};
use crate::common::{build_zip, samples};
use formatid::{Engine, IdentificationRequest};
use rayon::prelude::*;
use std::collections::HashSet;

fn workload() -> Vec<(String, Vec<u8>, &'static str)> {
    let docx = build_zip(&[
        ("[Content_Types].xml", b"<Types/>"),
        ("word/document.xml", b"<w:document/>"),
    ]);
    (0..64)
        .map(|i| match i % 4 {
            0 => (format!("doc{i}.pdf"), samples::pdf('7'), PDF_17),
            1 => (format!("img{i}.png"), samples::png(), PNG),
            2 => (format!("page{i}.html"), samples::html(), HTML),
            _ => (format!("report{i}.docx"), docx.clone(), DOCX),
        })
        .collect()
}

#[test]
fn parallel_submissions_agree_with_serial_ones() {
    let engine = Engine::new(&catalogues::binary(), &catalogues::containers()).unwrap();
    let outcomes: Vec<(Vec<String>, &'static str, u64)> = workload()
        .into_par_iter()
        .map(|(name, data, expected)| {
            let request = IdentificationRequest::from_bytes(&name, data);
            let node_id = request.identifier().node_id;
            let results = engine.submit_request(&request).unwrap();
            let puids = results.puids().into_iter().map(String::from).collect();
            (puids, expected, node_id)
        })
        .collect();

    for (puids, expected, _) in &outcomes {
        assert_eq!(puids, &vec![expected.to_string()]);
    }
    let ids: HashSet<u64> = outcomes.iter().map(|(_, _, id)| *id).collect();
    assert_eq!(ids.len(), outcomes.len());
}

#[test]
fn cloned_engines_share_catalogues() {
    let engine = Engine::new(&catalogues::binary(), &catalogues::containers()).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                scope.spawn(move || {
                    let request = IdentificationRequest::from_bytes("photo.png", samples::png());
                    engine.submit_request(&request).unwrap().puids().len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    });
    assert_eq!(engine.binary().signatures().len(), catalogues::binary().signatures.len());
}
