//! Pipeline stages for translating one paper.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the two remote services can be swapped for in-memory doubles.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ tei ──▶ translate/paragraphs ──▶ assemble
//! (*.pdf)   (GROBID)    (parse)  (DeepL, paced)            (docx/txt)
//!                  ╲        ╲            ╲                     ╲
//!                   └────────┴─── artifacts (resume points) ────┘
//! ```
//!
//! 1. [`input`]      — list the input directory, validate PDF magic bytes
//! 2. [`extract`]    — upload to the extraction service; the only stage
//!    whose failure can abort the whole batch
//! 3. [`tei`]        — recover title, paragraphs and references from TEI
//! 4. [`translate`]  — one request per text unit, tagged outcome
//! 5. [`paragraphs`] — split the body, translate sequentially with pacing
//! 6. [`assemble`]   — render text or `.docx` (via [`docx`])
//! 7. [`artifacts`]  — stage file paths and the resume decision

pub mod artifacts;
pub mod assemble;
pub mod docx;
pub mod extract;
pub mod input;
pub mod paragraphs;
pub mod tei;
pub mod translate;
