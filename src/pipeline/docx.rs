//! Minimal Office Open XML writer.
//!
//! A `.docx` file is a ZIP archive. Word opens a package that contains just
//! three parts:
//!
//! ```text
//! [Content_Types].xml    part → content-type map
//! _rels/.rels            package → main document relationship
//! word/document.xml      the body
//! ```
//!
//! Formatting is applied directly on runs and paragraphs (bold, italics,
//! sizes, spacing) so no `styles.xml` part is needed.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_CLOSE: &str = "<w:sectPr/></w:body></w:document>";

/// Accumulates `word/document.xml` body content.
#[derive(Debug, Default)]
pub struct DocxBuilder {
    body: String,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Large bold heading. `level` 0 is the document title, 1 a section.
    pub fn heading(&mut self, text: &str, level: u8) -> &mut Self {
        // Sizes are in half-points: 20 pt title, 16 pt section heading.
        let size = if level == 0 { 40 } else { 32 };
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:keepNext/><w:spacing w:before=\"240\" w:after=\"120\"/>\
             <w:outlineLvl w:val=\"{level}\"/></w:pPr>\
             <w:r><w:rPr><w:b/><w:sz w:val=\"{size}\"/></w:rPr>{}</w:r></w:p>",
            text_runs(text)
        ));
        self
    }

    /// Italic line directly under the title.
    pub fn subtitle(&mut self, text: &str) -> &mut Self {
        self.body.push_str(&format!(
            "<w:p><w:r><w:rPr><w:i/></w:rPr>{}</w:r></w:p>",
            text_runs(text)
        ));
        self
    }

    /// Body paragraph followed by `space_after_pt` points of spacing.
    pub fn paragraph(&mut self, text: &str, space_after_pt: u32) -> &mut Self {
        // Spacing is in twentieths of a point.
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:spacing w:after=\"{}\"/></w:pPr><w:r>{}</w:r></w:p>",
            space_after_pt * 20,
            text_runs(text)
        ));
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.body
            .push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>");
        self
    }

    /// The `word/document.xml` part.
    pub fn document_xml(&self) -> String {
        format!("{DOCUMENT_OPEN}{}{DOCUMENT_CLOSE}", self.body)
    }

    /// Package everything into `.docx` bytes.
    pub fn finish(&self) -> zip::result::ZipResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(self.document_xml().as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }
}

/// `<w:t>` elements for `text`, with line breaks preserved as `<w:br/>`.
fn text_runs(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("<w:t xml:space=\"preserve\">{}</w:t>", escape(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>")
}
