//! Property-based tests: canonicalization idempotence over generated XML
//! trees and numeric formatting invariants.
//!
//! Run with: `cargo test --features all --test proptest_tests`

#![cfg(feature = "ubl")]

use facturacol::core::codes::{format_amount, format_quantity};
use facturacol::ubl::Canonicalizer;
use proptest::prelude::*;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Element {
        name: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<Node>,
    },
}

const NAMES: &[&str] = &["item", "note", "p:item", "p:total", "line"];
const ATTR_NAMES: &[&str] = &["code", "unit", "p:kind"];

fn arb_text() -> impl Strategy<Value = String> {
    // Raw text; the renderer escapes it. Includes characters the escaper
    // must handle.
    proptest::string::string_regex("[a-z0-9 &<>\"]{0,12}").unwrap()
}

fn arb_attrs() -> impl Strategy<Value = Vec<(&'static str, String)>> {
    proptest::sample::subsequence(ATTR_NAMES.to_vec(), 0..=ATTR_NAMES.len()).prop_flat_map(
        |names| {
            let values = proptest::collection::vec(arb_text(), names.len());
            values.prop_map(move |values| {
                names.iter().copied().zip(values).collect::<Vec<_>>()
            })
        },
    )
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        arb_text().prop_map(Node::Text),
        (proptest::sample::select(NAMES), arb_attrs()).prop_map(|(name, attrs)| {
            Node::Element {
                name,
                attrs,
                children: Vec::new(),
            }
        }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            proptest::sample::select(NAMES),
            arb_attrs(),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(name, attrs, children)| Node::Element {
                name,
                attrs,
                children,
            })
    })
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

fn render(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element {
            name,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for (k, v) in attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&escape_attr(v));
                out.push('"');
            }
            if children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in children {
                    render(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

/// Wrap a generated tree under a root that declares the `p` prefix used by
/// the name pool.
fn render_doc(node: &Node) -> String {
    let mut out = String::from("<doc xmlns:p=\"urn:p\">");
    render(node, &mut out);
    out.push_str("</doc>");
    out
}

proptest! {
    #[test]
    fn canonicalization_is_idempotent(node in arb_node()) {
        let xml = render_doc(&node);
        let c14n = Canonicalizer::new();
        let once = c14n.canonicalize(&xml).unwrap();
        let twice = c14n.canonicalize(std::str::from_utf8(&once).unwrap()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn canonicalization_is_deterministic(node in arb_node()) {
        let xml = render_doc(&node);
        let a = Canonicalizer::new().canonicalize(&xml).unwrap();
        let b = Canonicalizer::new().canonicalize(&xml).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn amounts_always_have_two_decimals(cents in -1_000_000_000i64..1_000_000_000i64) {
        let amount = Decimal::new(cents, 2);
        let formatted = format_amount(amount);
        let (_, decimals) = formatted.split_once('.').expect("decimal point");
        prop_assert_eq!(decimals.len(), 2);
        prop_assert!(!formatted.contains('e') && !formatted.contains('E'));
        prop_assert_eq!(formatted.parse::<Decimal>().unwrap(), amount);
    }

    #[test]
    fn quantities_have_two_to_four_decimals(units in -100_000_000i64..100_000_000i64) {
        let quantity = Decimal::new(units, 4);
        let formatted = format_quantity(quantity);
        let (_, decimals) = formatted.split_once('.').expect("decimal point");
        prop_assert!((2..=4).contains(&decimals.len()));
        prop_assert_eq!(formatted.parse::<Decimal>().unwrap(), quantity);
    }
}
