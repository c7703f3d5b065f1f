//! Exclusive XML canonicalization (exc-c14n).
//!
//! Implements the subset of <https://www.w3.org/TR/xml-exc-c14n/> needed to
//! produce reference digests: element and attribute serialization with
//! deterministic ordering, namespace-scope resolution over an explicit
//! stack, text and attribute escaping, and suppression of comments and
//! processing instructions. Output is UTF-8 with no XML declaration.
//!
//! Canonicalization is a pure function of its input and is idempotent:
//! canonicalizing a canonical form yields the same bytes.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::core::FacturaError;

/// One namespace declaration as written in the source: prefix ("" for the
/// default namespace) and URI ("" for an undeclaration).
type NsDecl = (String, String);

/// Exclusive canonicalizer, optionally carrying an InclusiveNamespaces
/// prefix list.
#[derive(Debug, Default)]
pub struct Canonicalizer {
    inclusive_prefixes: Vec<String>,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes in this list are rendered wherever they are declared and
    /// newly visible, even when not visibly utilized.
    pub fn with_inclusive_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inclusive_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Canonicalize the document's root element subtree.
    pub fn canonicalize(&self, xml: &str) -> Result<Vec<u8>, FacturaError> {
        self.run(xml, None)
    }

    /// Canonicalize the subtree of the element whose `Id` attribute (any
    /// prefix, e.g. `Id` or `wsu:Id`) equals `id`, resolving namespaces
    /// inherited from its ancestors.
    pub fn canonicalize_element(&self, xml: &str, id: &str) -> Result<Vec<u8>, FacturaError> {
        self.run(xml, Some(id))
    }

    fn run(&self, xml: &str, target_id: Option<&str>) -> Result<Vec<u8>, FacturaError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().expand_empty_elements = true;
        reader.config_mut().check_end_names = true;

        let mut out: Vec<u8> = Vec::new();
        // Declarations in scope, one frame per open element.
        let mut scopes: Vec<Vec<NsDecl>> = Vec::new();
        // Declarations already rendered into the output, one frame per
        // emitted element.
        let mut rendered: Vec<HashMap<String, String>> = Vec::new();
        // Depth of the emitted subtree root, once found.
        let mut emit_from: Option<usize> = None;
        let mut found = false;

        loop {
            match reader.read_event() {
                Err(e) => return Err(FacturaError::Canonicalization(e.to_string())),
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    let qname = str_of(start.name().as_ref())?.to_string();
                    let mut decls: Vec<NsDecl> = Vec::new();
                    let mut attrs: Vec<(String, String)> = Vec::new();
                    let mut id_attr: Option<String> = None;

                    for attr in start.attributes() {
                        let attr =
                            attr.map_err(|e| FacturaError::Canonicalization(e.to_string()))?;
                        let key = str_of(attr.key.as_ref())?.to_string();
                        let value = attr
                            .unescape_value()
                            .map_err(|e| FacturaError::Canonicalization(e.to_string()))?
                            .into_owned();
                        if key == "xmlns" {
                            decls.push((String::new(), value));
                        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                            decls.push((prefix.to_string(), value));
                        } else {
                            if local_name(&key) == "Id" {
                                id_attr = Some(value.clone());
                            }
                            attrs.push((key, value));
                        }
                    }
                    scopes.push(decls);

                    if emit_from.is_none() {
                        let matches = match target_id {
                            None => true,
                            Some(id) => id_attr.as_deref() == Some(id),
                        };
                        if matches {
                            emit_from = Some(scopes.len() - 1);
                            found = true;
                        }
                    }

                    if emit_from.is_some() {
                        self.write_start_tag(&mut out, &qname, &attrs, &scopes, &mut rendered)?;
                    }
                }
                Ok(Event::End(end)) => {
                    if let Some(root_depth) = emit_from {
                        let end_name = end.name();
                        let qname = str_of(end_name.as_ref())?;
                        out.extend_from_slice(b"</");
                        out.extend_from_slice(qname.as_bytes());
                        out.push(b'>');
                        rendered.pop();
                        if scopes.len() - 1 == root_depth {
                            emit_from = None;
                            if target_id.is_some() {
                                scopes.pop();
                                break;
                            }
                        }
                    }
                    scopes.pop();
                }
                Ok(Event::Text(text)) => {
                    if emit_from.is_some() {
                        let unescaped = text
                            .unescape()
                            .map_err(|e| FacturaError::Canonicalization(e.to_string()))?;
                        escape_text(&mut out, &unescaped);
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if emit_from.is_some() {
                        let raw = str_of(&cdata)?;
                        escape_text(&mut out, raw);
                    }
                }
                // Comments, processing instructions, declarations, and
                // doctypes are dropped in canonical form.
                Ok(_) => {}
            }
        }

        if target_id.is_some() && !found {
            return Err(FacturaError::Canonicalization(format!(
                "no element with Id \"{}\"",
                target_id.unwrap_or_default()
            )));
        }
        Ok(out)
    }

    fn write_start_tag(
        &self,
        out: &mut Vec<u8>,
        qname: &str,
        attrs: &[(String, String)],
        scopes: &[Vec<NsDecl>],
        rendered: &mut Vec<HashMap<String, String>>,
    ) -> Result<(), FacturaError> {
        // Visibly utilized prefixes: the element's own prefix (or the
        // default namespace) and the prefixes of its attributes, plus the
        // InclusiveNamespaces list.
        let mut utilized: Vec<&str> = vec![prefix_of(qname)];
        for (key, _) in attrs {
            let p = prefix_of(key);
            if !p.is_empty() {
                utilized.push(p);
            }
        }
        for p in &self.inclusive_prefixes {
            utilized.push(p.as_str());
        }
        utilized.sort_unstable();
        utilized.dedup();

        let mut to_render: Vec<NsDecl> = Vec::new();
        let mut frame: HashMap<String, String> = HashMap::new();
        for prefix in utilized {
            let in_scope = lookup(scopes, prefix);
            match in_scope {
                Some(uri) if !uri.is_empty() => {
                    if rendered_lookup(rendered, prefix) != Some(uri) {
                        to_render.push((prefix.to_string(), uri.to_string()));
                        frame.insert(prefix.to_string(), uri.to_string());
                    }
                }
                _ => {
                    // Unbound: an error for a real prefix; for the default
                    // namespace, emit xmlns="" only to undeclare.
                    if prefix.is_empty() {
                        if rendered_lookup(rendered, "").is_some_and(|uri| !uri.is_empty()) {
                            to_render.push((String::new(), String::new()));
                            frame.insert(String::new(), String::new());
                        }
                    } else {
                        return Err(FacturaError::Canonicalization(format!(
                            "unbound namespace prefix \"{prefix}\""
                        )));
                    }
                }
            }
        }
        to_render.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        // Attributes sorted by (namespace URI, local name); unqualified
        // attributes carry the empty URI and sort first.
        let mut sorted_attrs: Vec<(&str, &str, &str)> = Vec::with_capacity(attrs.len());
        for (key, value) in attrs {
            let p = prefix_of(key);
            let uri = if p.is_empty() {
                ""
            } else {
                lookup(scopes, p).ok_or_else(|| {
                    FacturaError::Canonicalization(format!(
                        "unbound namespace prefix \"{p}\" on attribute {key}"
                    ))
                })?
            };
            sorted_attrs.push((uri, key, value));
        }
        sorted_attrs.sort_unstable_by(|a, b| (a.0, local_name(a.1)).cmp(&(b.0, local_name(b.1))));

        out.push(b'<');
        out.extend_from_slice(qname.as_bytes());
        for (prefix, uri) in &to_render {
            if prefix.is_empty() {
                out.extend_from_slice(b" xmlns=\"");
            } else {
                out.extend_from_slice(b" xmlns:");
                out.extend_from_slice(prefix.as_bytes());
                out.extend_from_slice(b"=\"");
            }
            escape_attr(out, uri);
            out.push(b'"');
        }
        for (_, key, value) in &sorted_attrs {
            out.push(b' ');
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b"=\"");
            escape_attr(out, value);
            out.push(b'"');
        }
        out.push(b'>');
        rendered.push(frame);
        Ok(())
    }
}

fn str_of(bytes: &[u8]) -> Result<&str, FacturaError> {
    std::str::from_utf8(bytes).map_err(|e| FacturaError::Canonicalization(e.to_string()))
}

fn prefix_of(qname: &str) -> &str {
    match qname.split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

fn local_name(qname: &str) -> &str {
    match qname.split_once(':') {
        Some((_, local)) => local,
        None => qname,
    }
}

/// Look up a prefix in the innermost scope that declares it.
fn lookup<'a>(scopes: &'a [Vec<NsDecl>], prefix: &str) -> Option<&'a str> {
    for frame in scopes.iter().rev() {
        // Later declarations on the same element win, so scan backwards.
        for (p, uri) in frame.iter().rev() {
            if p == prefix {
                if uri.is_empty() {
                    return None;
                }
                return Some(uri);
            }
        }
    }
    None
}

fn rendered_lookup<'a>(rendered: &'a [HashMap<String, String>], prefix: &str) -> Option<&'a str> {
    for frame in rendered.iter().rev() {
        if let Some(uri) = frame.get(prefix) {
            return Some(uri);
        }
    }
    None
}

fn escape_text(out: &mut Vec<u8>, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

fn escape_attr(out: &mut Vec<u8>, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '"' => out.extend_from_slice(b"&quot;"),
            '\t' => out.extend_from_slice(b"&#x9;"),
            '\n' => out.extend_from_slice(b"&#xA;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}
