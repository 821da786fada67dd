// src/engine/markup.rs

//! Lenient HTML fragment parser.
//!
//! Section content is trusted, server-authored HTML with a handful of custom
//! elements mixed in. We only need a faithful element tree with attributes,
//! so this parser skips the HTML5 insertion-mode machinery: unknown tags are
//! ordinary elements, stray end tags are dropped, and anything left open is
//! closed at end of input.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_:\-]*").expect("valid tag name regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]+);").expect("valid entity regex")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    /// Lower-cased tag name.
    pub tag: String,
    /// Attributes in source order. Names are lower-cased, values decoded.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(tag: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag,
            attrs,
            children: Vec::new(),
        }
    }

    /// First attribute with this name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Descendant elements with the given tag, in document order.
    pub fn descendants_named<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        collect_named(&self.children, tag, &mut out);
        out
    }
}

fn collect_named<'a>(nodes: &'a [Node], tag: &str, out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.tag == tag {
                out.push(el);
            }
            collect_named(&el.children, tag, out);
        }
    }
}

/// Parses an HTML fragment into a node tree. Never fails.
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let mut builder = TreeBuilder::default();
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];
        let Some(lt) = rest.find('<') else {
            builder.text(rest);
            break;
        };
        if lt > 0 {
            builder.text(&rest[..lt]);
        }
        pos += lt;
        let rest = &html[pos..];

        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body.find("-->").unwrap_or(body.len());
            builder.comment(&body[..end]);
            pos += 4 + (end + 3).min(body.len());
        } else if let Some(body) = rest.strip_prefix("</") {
            let end = body.find('>').unwrap_or(body.len());
            let name = body[..end].trim().to_ascii_lowercase();
            builder.end_tag(&name);
            pos += 2 + (end + 1).min(body.len());
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            // doctype / processing instruction
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            pos += end;
        } else if let Some(m) = TAG_NAME.find(&rest[1..]) {
            let name = m.as_str().to_ascii_lowercase();
            let (attrs, self_closing, consumed) = scan_attributes(&rest[1 + m.end()..]);
            pos += 1 + m.end() + consumed;

            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
                let closing = format!("</{}", name);
                let body = &html[pos..];
                let end = body.to_ascii_lowercase().find(&closing).unwrap_or(body.len());
                let mut el = Element::new(name, attrs);
                if end > 0 {
                    el.children.push(Node::Text(body[..end].to_string()));
                }
                builder.append(Node::Element(el));
                pos += end;
                if let Some(gt) = html[pos..].find('>') {
                    pos += gt + 1;
                }
                continue;
            }

            builder.start_tag(name, attrs, self_closing);
        } else {
            builder.text("<");
            pos += 1;
        }
    }

    builder.finish()
}

/// Scans attributes up to and including the closing `>`.
/// Returns the attributes, whether the tag was self-closing, and the number of
/// bytes consumed.
fn scan_attributes(input: &str) -> (Vec<(String, String)>, bool, usize) {
    let bytes = input.as_bytes();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return (attrs, false, i);
        }
        match bytes[i] {
            b'>' => return (attrs, false, i + 1),
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return (attrs, true, i + 2);
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = input[name_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let mut value = String::new();
        if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let start = j + 1;
                    let end = input[start..]
                        .find(q as char)
                        .map(|e| start + e)
                        .unwrap_or(input.len());
                    value = decode_entities(&input[start..end]);
                    i = (end + 1).min(input.len());
                }
                _ => {
                    let start = j;
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    value = decode_entities(&input[start..j]);
                    i = j;
                }
            }
        }

        if !name.is_empty() && !attrs.iter().any(|(k, _)| *k == name) {
            attrs.push((name, value));
        }
    }
}

/// Decodes the named entities we expect in authored content plus numeric
/// references. Unknown names are left as written.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    ENTITY
        .replace_all(input, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn append(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn text(&mut self, raw: &str) {
        let text = decode_entities(raw);
        // merge with a preceding text node (e.g. after a literal '<')
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        if let Some(Node::Text(prev)) = siblings.last_mut() {
            prev.push_str(&text);
        } else {
            siblings.push(Node::Text(text));
        }
    }

    fn comment(&mut self, body: &str) {
        self.append(Node::Comment(body.to_string()));
    }

    fn start_tag(&mut self, tag: String, attrs: Vec<(String, String)>, self_closing: bool) {
        let void = VOID_ELEMENTS.contains(&tag.as_str());
        let el = Element::new(tag, attrs);
        if void || self_closing {
            self.append(Node::Element(el));
        } else {
            self.open.push(el);
        }
    }

    fn end_tag(&mut self, tag: &str) {
        let Some(depth) = self.open.iter().rposition(|el| el.tag == tag) else {
            return;
        };
        while self.open.len() > depth {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if let Some(el) = self.open.pop() {
            self.append(Node::Element(el));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.open.is_empty() {
            self.close_top();
        }
        self.root
    }
}
