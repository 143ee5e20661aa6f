//! TEI markup parsing: recover title, body paragraphs and references.
//!
//! GROBID answers with TEI XML. Only three things matter downstream:
//!
//! ```text
//! TEI
//!  ├─ teiHeader/…/titleStmt/title      → Document::title
//!  └─ text
//!      ├─ …//p                          → Document::paragraphs
//!      └─ …//listBibl/biblStruct        → Document::references
//! ```
//!
//! The walker streams events from `quick-xml` and keeps a stack of open
//! element names; each thing we collect is a [`Capture`] that starts at an
//! element and accumulates every text node until that element closes, so
//! nested inline markup (`<ref>`, `<hi>`, …) is flattened into the
//! surrounding text. Elements are matched by local name; the `tei:` prefix
//! and namespace declarations are ignored.

use crate::error::ParseError;
use crate::output::{Document, NO_TITLE};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;

/// Display string for a reference with no recoverable parts.
pub const REFERENCE_FALLBACK: &str = "Extraction Failed";

/// Parse TEI markup into a [`Document`].
///
/// Returns `Err` for malformed markup. A document with zero paragraphs is
/// a successful parse; callers decide whether an empty body is acceptable.
pub fn parse_tei(markup: &str) -> Result<Document, ParseError> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);

    let mut walker = TeiWalker::default();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_root = true;
                walker.open(&e, reader.buffer_position() as usize)?;
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                walker.open(&e, reader.buffer_position() as usize)?;
                walker.close();
            }
            Ok(Event::End(_)) => {
                if !walker.close() {
                    return Err(ParseError::Malformed {
                        position: reader.buffer_position() as usize,
                        detail: "closing tag without a matching opening tag".into(),
                    });
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| ParseError::Malformed {
                    position: reader.buffer_position() as usize,
                    detail: e.to_string(),
                })?;
                walker.text(&text);
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                walker.text(&String::from_utf8_lossy(&raw));
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctypes.
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Malformed {
                    position: reader.buffer_position() as usize,
                    detail: e.to_string(),
                })
            }
        }
    }

    if !saw_root || !walker.stack.is_empty() {
        return Err(ParseError::NoRootElement);
    }

    let doc = walker.finish();
    debug!(
        "Parsed TEI: title={:?}, {} paragraphs, {} references",
        doc.title,
        doc.paragraphs.len(),
        doc.references.len()
    );
    Ok(doc)
}

// ── Walker state ─────────────────────────────────────────────────────────

/// Text accumulated from an element opened at `depth` until it closes.
#[derive(Debug)]
struct Capture {
    depth: usize,
    text: String,
}

impl Capture {
    fn at(depth: usize) -> Self {
        Self {
            depth,
            text: String::new(),
        }
    }
}

/// Parts of one `biblStruct` collected so far.
#[derive(Debug)]
struct BiblEntry {
    depth: usize,
    title: Option<String>,
    title_capture: Option<Capture>,
    title_seen: bool,
    year: Option<String>,
    publisher: Option<String>,
    publisher_capture: Option<Capture>,
    publisher_seen: bool,
}

impl BiblEntry {
    fn at(depth: usize) -> Self {
        Self {
            depth,
            title: None,
            title_capture: None,
            title_seen: false,
            year: None,
            publisher: None,
            publisher_capture: None,
            publisher_seen: false,
        }
    }

    /// `"Title" (year) Publisher`, or the fallback when nothing was found.
    fn display(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(ref t) = self.title {
            parts.push(format!("\"{t}\""));
        }
        if let Some(ref y) = self.year {
            parts.push(format!("({y})"));
        }
        if let Some(ref p) = self.publisher {
            parts.push(p.clone());
        }
        if parts.is_empty() {
            REFERENCE_FALLBACK.to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Default)]
struct TeiWalker {
    stack: Vec<Vec<u8>>,
    title: Option<String>,
    title_seen: bool,
    title_capture: Option<Capture>,
    paragraph: Option<Capture>,
    paragraphs: Vec<String>,
    bibl: Option<BiblEntry>,
    references: Vec<String>,
}

impl TeiWalker {
    fn inside(&self, name: &[u8]) -> bool {
        self.stack.iter().any(|n| n.as_slice() == name)
    }

    fn open(&mut self, e: &BytesStart<'_>, position: usize) -> Result<(), ParseError> {
        let name = e.local_name().as_ref().to_vec();
        let parent_is_list = self
            .stack
            .last()
            .is_some_and(|p| p.as_slice() == b"listBibl");
        let in_title_stmt = self.inside(b"teiHeader") && self.inside(b"titleStmt");
        let in_text = self.inside(b"text");

        self.stack.push(name);
        let depth = self.stack.len();

        match e.local_name().as_ref() {
            b"title" => {
                if in_title_stmt && !self.title_seen {
                    self.title_seen = true;
                    self.title_capture = Some(Capture::at(depth));
                }
                if let Some(ref mut b) = self.bibl {
                    if !b.title_seen {
                        b.title_seen = true;
                        b.title_capture = Some(Capture::at(depth));
                    }
                }
            }
            b"p" if in_text && self.paragraph.is_none() => {
                self.paragraph = Some(Capture::at(depth));
            }
            b"biblStruct" if parent_is_list && self.bibl.is_none() => {
                self.bibl = Some(BiblEntry::at(depth));
            }
            b"date" => {
                if let Some(ref mut b) = self.bibl {
                    if b.year.is_none() {
                        let when = e
                            .try_get_attribute("when")
                            .map_err(|err| ParseError::Malformed {
                                position,
                                detail: err.to_string(),
                            })?;
                        if let Some(attr) = when {
                            let value = attr.unescape_value().map_err(|err| {
                                ParseError::Malformed {
                                    position,
                                    detail: err.to_string(),
                                }
                            })?;
                            let value = value.trim();
                            if !value.is_empty() {
                                b.year = Some(value.to_string());
                            }
                        }
                    }
                }
            }
            b"publisher" => {
                if let Some(ref mut b) = self.bibl {
                    if !b.publisher_seen {
                        b.publisher_seen = true;
                        b.publisher_capture = Some(Capture::at(depth));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, s: &str) {
        for cap in [
            self.title_capture.as_mut(),
            self.paragraph.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            cap.text.push_str(s);
        }
        if let Some(ref mut b) = self.bibl {
            for cap in [b.title_capture.as_mut(), b.publisher_capture.as_mut()]
                .into_iter()
                .flatten()
            {
                cap.text.push_str(s);
            }
        }
    }

    /// Close the innermost element. Returns `false` if nothing was open.
    fn close(&mut self) -> bool {
        let depth = self.stack.len();
        if depth == 0 {
            return false;
        }

        if self.title_capture.as_ref().is_some_and(|c| c.depth == depth) {
            if let Some(cap) = self.title_capture.take() {
                let t = cap.text.trim();
                if !t.is_empty() {
                    self.title = Some(t.to_string());
                }
            }
        }

        if self.paragraph.as_ref().is_some_and(|c| c.depth == depth) {
            if let Some(cap) = self.paragraph.take() {
                let p = normalise_paragraph(&cap.text);
                if !p.is_empty() {
                    self.paragraphs.push(p);
                }
            }
        }

        if let Some(ref mut b) = self.bibl {
            if b.title_capture.as_ref().is_some_and(|c| c.depth == depth) {
                b.title = b.title_capture.take().and_then(|c| collapse_whitespace(&c.text));
            }
            if b.publisher_capture.as_ref().is_some_and(|c| c.depth == depth) {
                b.publisher = b
                    .publisher_capture
                    .take()
                    .and_then(|c| collapse_whitespace(&c.text));
            }
        }

        if self.bibl.as_ref().is_some_and(|b| b.depth == depth) {
            if let Some(entry) = self.bibl.take() {
                let index = self.references.len() + 1;
                self.references.push(format!("[{index}] {}", entry.display()));
            }
        }

        self.stack.pop();
        true
    }

    fn finish(self) -> Document {
        Document {
            title: self.title.unwrap_or_else(|| NO_TITLE.to_string()),
            paragraphs: self.paragraphs,
            references: self.references,
        }
    }
}

// ── Text helpers ─────────────────────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n\s*").unwrap());

/// Trim, and fold internal blank lines so a paragraph never contains the
/// paragraph separator.
fn normalise_paragraph(raw: &str) -> String {
    RE_BLANK_RUN.replace_all(raw.trim(), "\n").into_owned()
}

fn collapse_whitespace(raw: &str) -> Option<String> {
    let s = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
