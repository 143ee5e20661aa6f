//! Text translation: one text unit in, one tagged [`Translation`] out.
//!
//! The translation service reports failures through HTTP status codes.
//! Instead of smuggling those failures through the returned string, every
//! call yields a [`Translation`] carrying a [`TranslationOutcome`]; callers
//! branch on the outcome and only turn failures into visible sentinel text
//! when rendering output.
//!
//! ## Failure policy
//!
//! A failed call never falls back to the original text. Every failure kind
//! renders as a distinct `[Translation Error: …]` sentinel so a reader of the
//! output can tell untranslated slots apart from translated ones.
//!
//! ## Status mapping (DeepL)
//!
//! | Status | Outcome |
//! |---|---|
//! | 200 | `Ok` (text from `translations[0].text`) |
//! | 456, 429 | `QuotaExceeded` |
//! | 401, 403 | `AuthError` |
//! | other | `GenericError(status)` |
//! | no response | `ConnectionError` |

use crate::config::BatchConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a single translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationOutcome {
    Ok,
    /// Character quota exhausted or request rate exceeded.
    QuotaExceeded,
    /// The credential was rejected.
    AuthError,
    /// Any other non-success status.
    GenericError(u16),
    /// The request never produced a response.
    ConnectionError,
}

/// A translated string tagged with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub outcome: TranslationOutcome,
    /// Translated text; empty for every non-`Ok` outcome.
    pub text: String,
}

impl Translation {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            outcome: TranslationOutcome::Ok,
            text: text.into(),
        }
    }

    pub fn failed(outcome: TranslationOutcome) -> Self {
        Self {
            outcome,
            text: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == TranslationOutcome::Ok
    }

    /// The text to place in output: the translation, or a sentinel.
    pub fn rendered(&self) -> String {
        match self.outcome {
            TranslationOutcome::Ok => self.text.clone(),
            TranslationOutcome::QuotaExceeded => "[Translation Error: Quota Exceeded]".into(),
            TranslationOutcome::AuthError => "[Translation Error: Invalid API Key]".into(),
            TranslationOutcome::GenericError(code) => format!("[Translation Error: HTTP {code}]"),
            TranslationOutcome::ConnectionError => "[Translation Error: Connection Failed]".into(),
        }
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Map an HTTP status to its outcome. Only `200` counts as success; any
/// other status, including the rest of the 2xx range, is a failure that
/// carries its code.
pub fn classify_status(status: u16) -> TranslationOutcome {
    match status {
        200 => TranslationOutcome::Ok,
        456 | 429 => TranslationOutcome::QuotaExceeded,
        401 | 403 => TranslationOutcome::AuthError,
        other => TranslationOutcome::GenericError(other),
    }
}

/// Translates one text unit into the configured target language.
///
/// Implementations must make at most one request per call and must return
/// an `Ok` empty translation for blank input without any request.
#[async_trait]
pub trait TextTranslator: Send + Sync {
    async fn translate(&self, text: &str) -> Translation;
}

// ── DeepL client ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

/// [`TextTranslator`] backed by the DeepL REST API.
pub struct DeeplTranslator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    target_lang: String,
}

impl fmt::Debug for DeeplTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeeplTranslator")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("target_lang", &self.target_lang)
            .finish()
    }
}

impl DeeplTranslator {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        target_lang: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            target_lang: target_lang.into(),
        })
    }

    /// Build a translator from the run configuration.
    pub fn from_config(config: &BatchConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.translate_url.clone(),
            config.api_key.clone(),
            config.target_lang.clone(),
            Duration::from_secs(config.translate_timeout_secs),
        )
    }
}

#[async_trait]
impl TextTranslator for DeeplTranslator {
    async fn translate(&self, text: &str) -> Translation {
        if text.trim().is_empty() {
            return Translation::ok("");
        }

        let params = [
            ("auth_key", self.api_key.as_str()),
            ("text", text),
            ("target_lang", self.target_lang.as_str()),
        ];

        let response = match self.client.post(&self.url).form(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Translation request failed: {}", e);
                return Translation::failed(TranslationOutcome::ConnectionError);
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let outcome = classify_status(status.as_u16());
            warn!("Translation service returned {} ({:?})", status, outcome);
            return Translation::failed(outcome);
        }

        match response.json::<DeeplResponse>().await {
            Ok(body) => match body.translations.into_iter().next() {
                Some(t) => {
                    debug!("Translated {} chars → {} chars", text.len(), t.text.len());
                    Translation::ok(t.text)
                }
                None => {
                    warn!("Translation response contained no translations");
                    Translation::failed(TranslationOutcome::GenericError(status.as_u16()))
                }
            },
            Err(e) => {
                warn!("Unreadable translation response: {}", e);
                Translation::failed(TranslationOutcome::GenericError(status.as_u16()))
            }
        }
    }
}
