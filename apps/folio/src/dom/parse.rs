//! Markup → node parsing for page shells and section fragments.
//!
//! Fragments are treated as lenient XHTML: void elements need no closing
//! tag, mismatched end tags close up to the nearest matching open element,
//! and stray end tags are ignored. Comments, doctypes and processing
//! instructions are dropped.
//!
//! Hand-written pages are not always well-formed XML, so the input goes
//! through a recovery pass first: a `&` that does not start a reference is
//! kept as a literal ampersand, and `script`/`style` bodies are lifted out
//! verbatim before tokenizing and reattached as raw text.

use std::collections::VecDeque;

use quick_xml::{escape::resolve_predefined_entity, events::Event, Reader};
use thiserror::Error;

use super::serialize::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
use super::{Document, NodeId};

#[derive(Debug, Error)]
#[error("markup parse error at byte {position}: {message}")]
pub struct ParseError {
    pub position: u64,
    pub message: String,
}

/// Parses `html` and appends the produced nodes under `parent`.
/// Returns the top-level nodes in order.
pub(crate) fn parse_into(
    doc: &mut Document,
    parent: NodeId,
    html: &str,
) -> Result<Vec<NodeId>, ParseError> {
    let (markup, mut raw_bodies) = prepare(html);
    let mut reader = Reader::from_str(&markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);
    reader.config_mut().allow_unmatched_ends = true;

    let mut top = Vec::new();
    // (node, tag) of currently open elements; the bottom entry is `parent`.
    let mut open: Vec<(NodeId, String)> = vec![(parent, String::new())];

    loop {
        let event = reader.read_event().map_err(|e| ParseError {
            position: reader.error_position(),
            message: e.to_string(),
        })?;
        match event {
            Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
                let id = doc.create_element(&tag);
                for attr in start.html_attributes().flatten() {
                    let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
                    let value = decode_entities(&String::from_utf8_lossy(&attr.value));
                    doc.set_attr(id, &name, &value);
                }
                attach(doc, &open, &mut top, id);

                if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                    // The end tag that follows finds nothing open and is skipped.
                    let raw = raw_bodies.pop_front().unwrap_or_default();
                    if !raw.is_empty() {
                        let text = doc.create_text(&raw);
                        doc.append_child(id, text);
                    }
                } else if !VOID_ELEMENTS.contains(&tag.as_str()) {
                    open.push((id, tag));
                }
            }
            Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
                let id = doc.create_element(&tag);
                for attr in start.html_attributes().flatten() {
                    let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
                    let value = decode_entities(&String::from_utf8_lossy(&attr.value));
                    doc.set_attr(id, &name, &value);
                }
                attach(doc, &open, &mut top, id);
            }
            Event::End(end) => {
                let tag = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                if let Some(pos) = open.iter().skip(1).rposition(|(_, t)| *t == tag) {
                    open.truncate(pos + 1);
                }
            }
            Event::Text(text) => {
                let text = String::from_utf8_lossy(&text).into_owned();
                push_text(doc, &open, &mut top, &text);
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                push_text(doc, &open, &mut top, &text);
            }
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference).into_owned();
                let text = resolve_reference(&name).unwrap_or_else(|| format!("&{name};"));
                push_text(doc, &open, &mut top, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(top)
}

/// Rewrites `html` so the XML reader accepts it: bare ampersands become
/// `&amp;` and raw-text element bodies are cut out, returned in document
/// order.
fn prepare(html: &str) -> (String, VecDeque<String>) {
    let mut markup = String::with_capacity(html.len());
    let mut raw_bodies = VecDeque::new();
    let mut rest = html;

    while let Some(i) = rest.find(['<', '&']) {
        markup.push_str(&rest[..i]);
        rest = &rest[i..];

        if let Some(after) = rest.strip_prefix('&') {
            if is_reference(after) {
                markup.push('&');
            } else {
                markup.push_str("&amp;");
            }
            rest = after;
            continue;
        }

        if rest.starts_with("<!--") {
            let end = rest.find("-->").map_or(rest.len(), |e| e + 3);
            markup.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        let Some(tag) = RAW_TEXT_ELEMENTS.iter().find(|t| opens_tag(rest, t)) else {
            markup.push('<');
            rest = &rest[1..];
            continue;
        };
        let tag_end = start_tag_end(rest);
        let start_tag = &rest[..tag_end];
        escape_bare_amps(start_tag, &mut markup);
        rest = &rest[tag_end..];
        if start_tag.ends_with("/>") {
            continue;
        }
        let close = find_ignore_case(rest, &format!("</{tag}")).unwrap_or(rest.len());
        raw_bodies.push_back(rest[..close].to_string());
        rest = &rest[close..];
    }
    markup.push_str(rest);

    (markup, raw_bodies)
}

/// Whether the text after a `&` is a complete character reference.
fn is_reference(after: &str) -> bool {
    let Some(semi) = after.find(';') else {
        return false;
    };
    let name = &after[..semi];
    if name.is_empty() || name.len() > 32 {
        return false;
    }
    match name.strip_prefix('#') {
        Some(num) => match num.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()),
        },
        None => {
            name.starts_with(|c: char| c.is_ascii_alphabetic())
                && name.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

fn escape_bare_amps(s: &str, out: &mut String) {
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        let after = &rest[i + 1..];
        out.push_str(if is_reference(after) { "&" } else { "&amp;" });
        rest = after;
    }
    out.push_str(rest);
}

/// `<tag` followed by whitespace, `>` or `/`, case-insensitively.
fn opens_tag(s: &str, tag: &str) -> bool {
    let Some(name) = s.get(1..1 + tag.len()) else {
        return false;
    };
    name.eq_ignore_ascii_case(tag)
        && matches!(
            s[1 + tag.len()..].chars().next(),
            Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/'
        )
}

/// Byte offset just past the `>` closing a start tag, skipping quoted
/// attribute values.
fn start_tag_end(s: &str) -> usize {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return i + 1,
            _ => {}
        }
    }
    s.len()
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn attach(doc: &mut Document, open: &[(NodeId, String)], top: &mut Vec<NodeId>, id: NodeId) {
    let (parent, _) = open[open.len() - 1];
    doc.append_child(parent, id);
    if open.len() == 1 {
        top.push(id);
    }
}

/// Appends text, merging with a preceding text sibling so entity
/// references do not split words into separate nodes.
fn push_text(doc: &mut Document, open: &[(NodeId, String)], top: &mut Vec<NodeId>, text: &str) {
    if text.is_empty() {
        return;
    }
    let (parent, _) = open[open.len() - 1];
    if let Some(&last) = doc.children(parent).last() {
        if let Some(super::NodeKind::Text(existing)) = doc.kind(last) {
            let merged = format!("{existing}{text}");
            let replacement = doc.create_text(&merged);
            doc.remove(last);
            doc.append_child(parent, replacement);
            if open.len() == 1 {
                if let Some(slot) = top.iter_mut().find(|t| **t == last) {
                    *slot = replacement;
                }
            }
            return;
        }
    }
    let id = doc.create_text(text);
    attach(doc, open, top, id);
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    if let Some(offset) = LATIN1_ENTITIES.iter().position(|n| *n == name) {
        return char::from_u32(0xa0 + offset as u32).map(String::from);
    }
    if let Some((_, c)) = PUNCTUATION_ENTITIES.iter().find(|(n, _)| *n == name) {
        return Some(c.to_string());
    }
    resolve_predefined_entity(name).map(str::to_string)
}

/// Named references for U+00A0..=U+00FF, in code point order.
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave",
    "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve",
    "Oacute", "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml",
    "Yacute", "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig",
    "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth",
    "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave",
    "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

const PUNCTUATION_ENTITIES: &[(&str, char)] = &[
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("bull", '\u{2022}'),
    ("hellip", '\u{2026}'),
    ("euro", '\u{20ac}'),
    ("trade", '\u{2122}'),
];

/// Resolves `&name;` references inside attribute values.
pub(crate) fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';') {
            Some(semi) if semi > 0 && semi <= 32 => match resolve_reference(&after[..semi]) {
                Some(resolved) => {
                    out.push_str(&resolved);
                    rest = &after[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = after;
                }
            },
            _ => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let top = doc.append_html(body, html).unwrap();
        (doc, top)
    }

    #[test]
    fn test_void_elements_do_not_swallow_siblings() {
        let (doc, top) =
            parse(r#"<section class="content-section"><img src="a.png"><p>after</p></section>"#);
        assert_eq!(top.len(), 1);
        let children = doc.element_children(top[0]);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag(children[0]), Some("img"));
        assert_eq!(doc.text_content(children[1]), "after");
    }

    #[test]
    fn test_entities_are_decoded_and_merged() {
        let (doc, top) = parse("<p>Tom &amp; Jerry &#169; &nbsp;</p>");
        assert_eq!(doc.text_content(top[0]), "Tom & Jerry © \u{a0}");
        assert_eq!(doc.children(top[0]).len(), 1);
    }

    #[test]
    fn test_attribute_entities_are_decoded() {
        let (doc, top) = parse(r#"<a href="?a=1&amp;b=2" title="x &quot;y&quot;">go</a>"#);
        assert_eq!(doc.attr(top[0], "href"), Some("?a=1&b=2"));
        assert_eq!(doc.attr(top[0], "title"), Some(r#"x "y""#));
    }

    #[test]
    fn test_valueless_attributes_are_kept() {
        let (doc, top) = parse(r#"<input name="email" required>"#);
        assert_eq!(doc.attr(top[0], "required"), Some(""));
    }

    #[test]
    fn test_mismatched_end_tags_close_open_elements() {
        let (doc, top) = parse("<div><p>one<span>two</p><p>three</p></div>");
        assert_eq!(top.len(), 1);
        let children = doc.element_children(top[0]);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.text_content(children[1]), "three");
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let (doc, top) = parse("<script>if (a < b) { go(); }</script><p>x</p>");
        assert_eq!(top.len(), 2);
        assert_eq!(doc.text_content(top[0]), "if (a < b) { go(); }");
        assert_eq!(doc.outer_html(top[0]), "<script>if (a < b) { go(); }</script>");
    }

    #[test]
    fn test_bare_ampersands_are_literal_text() {
        let (doc, top) = parse("<p>Tom & Jerry</p><p>R&D team</p>");
        assert_eq!(top.len(), 2);
        assert_eq!(doc.text_content(top[0]), "Tom & Jerry");
        assert_eq!(doc.text_content(top[1]), "R&D team");
        assert_eq!(doc.outer_html(top[1]), "<p>R&amp;D team</p>");
    }

    #[test]
    fn test_bare_ampersand_in_attribute_is_kept() {
        let (doc, top) = parse(r#"<a href="/search?q=a&b=c">go</a>"#);
        assert_eq!(doc.attr(top[0], "href"), Some("/search?q=a&b=c"));
    }

    #[test]
    fn test_script_body_is_not_tokenized() {
        let (doc, top) = parse(
            "<script>if (a && b < c) { x = '<p>'; }</script>\
             <style>a > b { content: \"&\"; }</style><p>after &amp; done</p>",
        );
        assert_eq!(top.len(), 3);
        assert_eq!(doc.text_content(top[0]), "if (a && b < c) { x = '<p>'; }");
        assert_eq!(doc.element_children(top[0]).len(), 0);
        assert_eq!(doc.text_content(top[1]), "a > b { content: \"&\"; }");
        assert_eq!(doc.text_content(top[2]), "after & done");
    }

    #[test]
    fn test_uppercase_script_and_empty_script() {
        let (doc, top) =
            parse(r#"<SCRIPT src="a.js?v=1&x=2"></SCRIPT><script src="b.js"/><p>x</p>"#);
        assert_eq!(top.len(), 3);
        assert_eq!(doc.attr(top[0], "src"), Some("a.js?v=1&x=2"));
        assert_eq!(doc.children(top[0]).len(), 0);
        assert_eq!(doc.text_content(top[2]), "x");
    }

    #[test]
    fn test_commented_script_tag_is_left_alone() {
        let (doc, top) = parse("<!-- <script> --><script>a < b</script><p>x</p>");
        assert_eq!(top.len(), 2);
        assert_eq!(doc.text_content(top[0]), "a < b");
    }

    #[test]
    fn test_latin1_named_entities() {
        let (doc, top) = parse(
            "<p>Dise&ntilde;o &amp; UX</p><p>&iquest;Qu&eacute;? &laquo;s&iacute;&raquo;</p>",
        );
        assert_eq!(doc.text_content(top[0]), "Diseño & UX");
        assert_eq!(doc.outer_html(top[0]), "<p>Diseño &amp; UX</p>");
        assert_eq!(doc.text_content(top[1]), "¿Qué? «sí»");
        assert_eq!(decode_entities("&Aacute;&yuml;&hellip;&euro;"), "Áÿ…€");
    }

    #[test]
    fn test_decode_entities_leaves_unknown_references() {
        assert_eq!(decode_entities("a &bogus; b & c"), "a &bogus; b & c");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
    }
}
