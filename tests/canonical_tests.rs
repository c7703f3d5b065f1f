#![cfg(feature = "ubl")]

use facturacol::ubl::Canonicalizer;

fn c14n(xml: &str) -> String {
    String::from_utf8(Canonicalizer::new().canonicalize(xml).unwrap()).unwrap()
}

/// Byte-exact golden: mixed prefixes, unused declarations, attribute order,
/// a comment, and an entity. The canonical form reorders attributes,
/// drops the unused declaration, and renders inherited prefixes where
/// they are first utilized.
#[test]
fn canonical_form_golden() {
    let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <ext:UBLExtensions xmlns:ext=\"urn:ext\" xmlns:cbc=\"urn:cbc\" xmlns:unused=\"urn:unused\">\n\
        \u{20}\u{20}<!-- authorization block -->\n\
        \u{20}\u{20}<ext:UBLExtension>\n\
        \u{20}\u{20}\u{20}\u{20}<cbc:ID schemeName=\"31\" schemeAgencyID=\"195\">900373115</cbc:ID>\n\
        \u{20}\u{20}\u{20}\u{20}<cbc:Amount currencyID=\"COP\">119000.00</cbc:Amount>\n\
        \u{20}\u{20}\u{20}\u{20}<cbc:Note>Tarifa &amp; recargo</cbc:Note>\n\
        \u{20}\u{20}</ext:UBLExtension>\n\
        </ext:UBLExtensions>";

    let expected = "<ext:UBLExtensions xmlns:ext=\"urn:ext\">\n\
        \u{20}\u{20}\n\
        \u{20}\u{20}<ext:UBLExtension>\n\
        \u{20}\u{20}\u{20}\u{20}<cbc:ID xmlns:cbc=\"urn:cbc\" schemeAgencyID=\"195\" schemeName=\"31\">900373115</cbc:ID>\n\
        \u{20}\u{20}\u{20}\u{20}<cbc:Amount xmlns:cbc=\"urn:cbc\" currencyID=\"COP\">119000.00</cbc:Amount>\n\
        \u{20}\u{20}\u{20}\u{20}<cbc:Note xmlns:cbc=\"urn:cbc\">Tarifa &amp; recargo</cbc:Note>\n\
        \u{20}\u{20}</ext:UBLExtension>\n\
        </ext:UBLExtensions>";

    assert_eq!(c14n(input), expected);
}

#[test]
fn canonicalization_is_idempotent_on_the_golden() {
    let input = "<a xmlns:x=\"urn:x\" b=\"2\" a=\"1\"><x:b>uno &amp; dos</x:b><c/></a>";
    let once = c14n(input);
    assert_eq!(c14n(&once), once);
}

#[test]
fn malformed_xml_is_a_canonicalization_error() {
    let err = Canonicalizer::new().canonicalize("<a><b></a>").unwrap_err();
    assert!(matches!(
        err,
        facturacol::core::FacturaError::Canonicalization(_)
    ));
}

#[test]
fn subtree_extraction_by_wsu_id() {
    let doc = "<s:Envelope xmlns:s=\"urn:soap\" xmlns:wsu=\"urn:wsu\"><s:Header>\
        <wsu:Timestamp wsu:Id=\"TS-1\"><wsu:Created>t0</wsu:Created></wsu:Timestamp>\
        </s:Header></s:Envelope>";
    let subtree = Canonicalizer::new()
        .canonicalize_element(doc, "TS-1")
        .unwrap();
    assert_eq!(
        String::from_utf8(subtree).unwrap(),
        "<wsu:Timestamp xmlns:wsu=\"urn:wsu\" wsu:Id=\"TS-1\"><wsu:Created>t0</wsu:Created></wsu:Timestamp>"
    );
}

#[test]
fn unknown_id_is_an_error() {
    let err = Canonicalizer::new()
        .canonicalize_element("<a Id=\"x\"/>", "missing")
        .unwrap_err();
    assert!(matches!(
        err,
        facturacol::core::FacturaError::Canonicalization(_)
    ));
}
