//! Serialization properties over grammar-generated expressions.

use formatid::signature::{compile, from_xml, serialize, to_xml, to_xml_pretty, Anchor, Syntax};
use proptest::prelude::*;

fn hex_byte() -> impl Strategy<Value = String> {
    any::<u8>().prop_map(|b| format!("{b:02X}"))
}

fn string_literal() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 %.<>/&-]{1,6}".prop_map(|s| format!("'{s}'"))
}

fn class() -> impl Strategy<Value = String> {
    prop_oneof![
        (any::<u8>(), any::<u8>(), any::<bool>()).prop_map(|(a, b, negated)| {
            let (lo, hi) = (a.min(b), a.max(b));
            let negated = negated && !(lo == 0 && hi == 0xFF);
            format!("[{}{lo:02X}:{hi:02X}]", if negated { "!" } else { "" })
        }),
        (any::<u8>(), 0x20u8..0x7E, any::<u8>()).prop_map(|(a, c, b)| {
            let c = if c == b'\'' { b'x' } else { c };
            format!("[{a:02X} '{}' {:02X}:{:02X}]", c as char, b.min(0x7F), b.max(0x7F))
        }),
    ]
}

fn simple() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => hex_byte(),
        1 => Just("??".to_string()),
        2 => class(),
        2 => string_literal(),
    ]
}

fn token() -> impl Strategy<Value = String> {
    let option = prop::collection::vec(simple(), 1..3).prop_map(|parts| parts.join(" "));
    let alternatives =
        prop::collection::vec(option, 2..4).prop_map(|options| format!("({})", options.join("|")));
    prop_oneof![5 => simple(), 1 => alternatives]
}

fn fragment() -> impl Strategy<Value = String> {
    prop::collection::vec(token(), 1..4).prop_map(|parts| parts.join(" "))
}

fn inner_gap() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u64..20).prop_map(|n| format!("{{{n}}}")),
        (0u64..10, 0u64..10).prop_map(|(n, extra)| format!("{{{}-{}}}", n, n + extra)),
        (0u64..5).prop_map(|n| format!("{{{n}-*}}")),
        Just("*".to_string()),
    ]
}

fn bounded_gap() -> impl Strategy<Value = String> {
    (0u64..16, 0u64..16).prop_map(|(n, extra)| format!("{{{}-{}}}", n, n + extra))
}

/// An expression valid for `anchor`, with an optional edge window on the anchored side.
fn expression(anchor: Anchor) -> BoxedStrategy<String> {
    let body = (
        fragment(),
        prop::collection::vec((inner_gap(), fragment()), 0..3),
    )
        .prop_map(|(first, rest)| {
            let mut parts = vec![first];
            for (gap, frag) in rest {
                parts.push(gap);
                parts.push(frag);
            }
            parts.join(" ")
        });
    let edge = proptest::option::of(bounded_gap());
    match anchor {
        Anchor::Bof => (edge, body)
            .prop_map(|(edge, body)| edge.map_or(body.clone(), |e| format!("{e} {body}")))
            .boxed(),
        Anchor::Eof => (edge, body)
            .prop_map(|(edge, body)| edge.map_or(body.clone(), |e| format!("{body} {e}")))
            .boxed(),
        Anchor::Variable => (proptest::option::of(0u64..8), body)
            .prop_map(|(min, body)| min.map_or(body.clone(), |n| format!("{{{n}-*}} {body}")))
            .boxed(),
    }
}

fn anchored_expression() -> impl Strategy<Value = (Anchor, String)> {
    prop_oneof![Just(Anchor::Bof), Just(Anchor::Eof), Just(Anchor::Variable)]
        .prop_flat_map(|anchor| expression(anchor).prop_map(move |e| (anchor, e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn serialized_text_recompiles_to_the_same_model((anchor, expr) in anchored_expression()) {
        let model = compile(&expr, anchor).expect("generated expressions are valid");
        for syntax in [Syntax::Container, Syntax::Binary] {
            for spaces in [false, true] {
                match serialize(&model, syntax, spaces) {
                    Ok(text) => {
                        let again = compile(&text, anchor)
                            .unwrap_or_else(|e| panic!("{text:?} does not recompile: {e}"));
                        prop_assert_eq!(&again, &model, "text {:?}", text);
                        prop_assert_eq!(serialize(&again, syntax, spaces).unwrap(), text);
                    }
                    Err(_) => prop_assert_eq!(syntax, Syntax::Binary),
                }
            }
        }
    }

    #[test]
    fn xml_form_round_trips((anchor, expr) in anchored_expression()) {
        let model = compile(&expr, anchor).expect("generated expressions are valid");
        prop_assert_eq!(from_xml(&to_xml(&model)).unwrap(), model.clone());
        prop_assert_eq!(from_xml(&to_xml_pretty(&model)).unwrap(), model);
    }

    #[test]
    fn container_syntax_never_fails((anchor, expr) in anchored_expression()) {
        let model = compile(&expr, anchor).expect("generated expressions are valid");
        prop_assert!(serialize(&model, Syntax::Container, false).is_ok());
    }
}

#[test]
fn registry_examples_are_stable() {
    let cases = [
        (Anchor::Bof, "'%PDF-1.' [30:37]", "'%PDF-1.'[30:37]"),
        (Anchor::Bof, "{4} 66747970 ('isom'|'mp41')", "{4}'ftyp'('isom'|'mp41')"),
        (Anchor::Eof, "'%%EOF' {0-2}", "'%%EOF'{0-2}"),
        (Anchor::Variable, "'<html' * '</html>'", "'<html'*'</html>'"),
        (Anchor::Bof, "D0CF11E0 {0} A1B11AE1", "D0CF11E0A1B11AE1"),
    ];
    for (anchor, input, expected) in cases {
        let model = compile(input, anchor).unwrap();
        assert_eq!(serialize(&model, Syntax::Container, false).unwrap(), expected);
    }
}

#[test]
fn binary_syntax_spells_out_strings() {
    let model = compile("'GIF8' [37 39] 'a'", Anchor::Bof).unwrap();
    assert_eq!(
        serialize(&model, Syntax::Binary, false).unwrap(),
        "47494638(37|39)61"
    );
    assert_eq!(
        serialize(&model, Syntax::Binary, true).unwrap(),
        "47 49 46 38 (37|39) 61"
    );
}
