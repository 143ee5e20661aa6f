//! Output assembly: render title, translated body and references.
//!
//! Both formats carry the same structure:
//!
//! 1. translated title as the top-level heading
//! 2. original title as a subtitle
//! 3. a body section, one block per translated paragraph, in order
//! 4. only when there are references: a break, then the numbered list in
//!    the original language (references are never translated)

use crate::config::OutputFormat;
use crate::error::ItemError;
use crate::pipeline::artifacts::write_atomic;
use crate::pipeline::docx::DocxBuilder;
use crate::pipeline::paragraphs::split_paragraphs;
use std::path::Path;
use tracing::info;

/// Section heading above the translated body.
pub const BODY_HEADING: &str = "Body (Translated)";

/// Section heading above the reference list.
pub const REFERENCES_HEADING: &str = "References";

/// Everything the assembler needs for one document.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub original_title: &'a str,
    pub translated_title: &'a str,
    /// Translated body, paragraphs separated by a blank line.
    pub translated_body: &'a str,
    pub references: &'a [String],
}

/// Render as plain text with Markdown-style headings.
pub fn render_text(input: &AssemblyInput<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", input.translated_title));
    out.push_str(&format!("_{}_\n\n", input.original_title));
    out.push_str(&format!("## {BODY_HEADING}\n\n"));

    let blocks = split_paragraphs(input.translated_body);
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');

    if !input.references.is_empty() {
        out.push_str(&format!("\n---\n\n## {REFERENCES_HEADING}\n\n"));
        for r in input.references {
            out.push_str(r);
            out.push('\n');
        }
    }
    out
}

/// Render as `.docx` bytes.
pub fn render_docx(input: &AssemblyInput<'_>) -> Result<Vec<u8>, ItemError> {
    let mut doc = DocxBuilder::new();
    doc.heading(input.translated_title, 0)
        .subtitle(input.original_title)
        .heading(BODY_HEADING, 1);

    for block in split_paragraphs(input.translated_body) {
        doc.paragraph(block, 12);
    }

    if !input.references.is_empty() {
        doc.page_break().heading(REFERENCES_HEADING, 1);
        for r in input.references {
            doc.paragraph(r, 0);
        }
    }

    doc.finish()
        .map_err(|e| ItemError::RenderFailed(e.to_string()))
}

/// Render `input` in `format` and write it atomically to `path`.
pub async fn assemble(
    input: &AssemblyInput<'_>,
    format: OutputFormat,
    path: &Path,
) -> Result<(), ItemError> {
    let bytes = match format {
        OutputFormat::Text => render_text(input).into_bytes(),
        OutputFormat::Docx => render_docx(input)?,
    };
    write_atomic(path, &bytes).await?;
    info!("Saved {}", path.display());
    Ok(())
}
