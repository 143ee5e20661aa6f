//! Structure extraction: upload a PDF, receive TEI markup.
//!
//! The extraction service (GROBID) is an opaque remote call. This module only
//! knows how to send a file and how to classify what comes back:
//!
//! - a non-success status is a problem with *this* document, so the caller
//!   skips it;
//! - a refused connection means the service is down, and every other
//!   document would fail the same way, so the error is marked fatal to the
//!   batch (see [`crate::error::ItemError::is_fatal`]).

use crate::config::BatchConfig;
use crate::error::ExtractError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info};

/// Turns a PDF payload into structured markup.
#[async_trait]
pub trait StructureExtractor: Send + Sync {
    /// Extract structured markup from `pdf`.
    ///
    /// `file_name` is only used as the upload's file name.
    async fn extract(&self, file_name: &str, pdf: Vec<u8>) -> Result<String, ExtractError>;
}

/// [`StructureExtractor`] backed by GROBID's `processFulltextDocument`.
#[derive(Debug, Clone)]
pub struct GrobidClient {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
    consolidate_header: bool,
    consolidate_citations: bool,
}

impl GrobidClient {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            timeout_secs,
            consolidate_header: true,
            consolidate_citations: true,
        })
    }

    /// Build a client from the run configuration.
    pub fn from_config(config: &BatchConfig) -> Result<Self, reqwest::Error> {
        let mut client = Self::new(config.extract_url.clone(), config.extract_timeout_secs)?;
        client.consolidate_header = config.consolidate_header;
        client.consolidate_citations = config.consolidate_citations;
        Ok(client)
    }

    fn form(&self, file_name: &str, pdf: Vec<u8>) -> Result<Form, ExtractError> {
        let part = Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let mut form = Form::new().part("input", part);
        if self.consolidate_header {
            form = form.text("consolidateHeader", "1");
        }
        if self.consolidate_citations {
            form = form.text("consolidateCitations", "1");
        }
        Ok(form)
    }

    fn classify(&self, e: reqwest::Error) -> ExtractError {
        if e.is_connect() {
            ExtractError::Unreachable {
                url: self.url.clone(),
                detail: e.to_string(),
            }
        } else if e.is_timeout() {
            ExtractError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ExtractError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl StructureExtractor for GrobidClient {
    async fn extract(&self, file_name: &str, pdf: Vec<u8>) -> Result<String, ExtractError> {
        let size = pdf.len();
        let form = self.form(file_name, pdf)?;
        debug!("Uploading {} ({} bytes) to {}", file_name, size, self.url);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let markup = response.text().await.map_err(|e| self.classify(e))?;
        info!("Extracted {} ({} bytes of markup)", file_name, markup.len());
        Ok(markup)
    }
}
