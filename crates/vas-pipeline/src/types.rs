//! Core types for the pipeline
//!
//! - Operation identifiers
//! - Validated primary input (company URL and/or document)
//! - Normalized phase output
//! - Pipeline configuration

use crate::error::{CollaboratorError, ValidationError};
use crate::phase::PhaseKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use ulid::Ulid;
use url::Url;

/// Identifier of one in-flight phase operation (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Ulid);

impl OperationId {
    /// Generate new operation ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uploaded pitch deck or other company document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Original file name
    pub name: String,
    /// MIME type, when known
    #[serde(default)]
    pub media_type: Option<String>,
    /// Size in bytes, when known
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl DocumentRef {
    /// Create a document reference
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            size_bytes: None,
        }
    }

    /// With MIME type
    #[inline]
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// With size
    #[inline]
    #[must_use]
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }
}

/// What the user submitted for assessment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryInput {
    /// Company website
    #[serde(default)]
    pub url: Option<Url>,
    /// Uploaded document
    #[serde(default)]
    pub document: Option<DocumentRef>,
    /// Reviewer running the assessment
    #[serde(default)]
    pub advisor_name: Option<String>,
}

impl PrimaryInput {
    /// Empty input; fails validation until a URL or document is added
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Input from a raw URL string
    ///
    /// # Errors
    /// - `ValidationError::MissingInput` for blank input
    /// - `ValidationError::MalformedUrl` if it does not parse as http(s)
    pub fn from_url(raw: &str) -> Result<Self, ValidationError> {
        Self::new().with_url(raw)
    }

    /// With company URL
    ///
    /// A bare host such as `example.com` is read as `https://example.com`.
    pub fn with_url(mut self, raw: &str) -> Result<Self, ValidationError> {
        self.url = Some(parse_company_url(raw)?);
        Ok(self)
    }

    /// With uploaded document
    #[inline]
    #[must_use]
    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }

    /// With advisor name
    #[inline]
    #[must_use]
    pub fn with_advisor(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.advisor_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    /// Check the input identifies a company
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(document) = &self.document {
            if document.name.trim().is_empty() {
                return Err(ValidationError::EmptyDocumentName);
            }
        }
        match &self.url {
            Some(url) => check_url(url, url.as_str()),
            None if self.document.is_some() => Ok(()),
            None => Err(ValidationError::MissingInput),
        }
    }

    /// Short label for logs and listings
    #[must_use]
    pub fn identifier(&self) -> String {
        match (&self.url, &self.document) {
            (Some(url), _) => url.host_str().unwrap_or(url.as_str()).to_string(),
            (None, Some(document)) => document.name.clone(),
            (None, None) => String::from("(no input)"),
        }
    }
}

fn parse_company_url(raw: &str) -> Result<Url, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingInput);
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|e| ValidationError::MalformedUrl {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;
    check_url(&url, raw)?;
    Ok(url)
}

fn check_url(url: &Url, raw: &str) -> Result<(), ValidationError> {
    let malformed = |reason: &str| ValidationError::MalformedUrl {
        input: raw.to_string(),
        reason: reason.to_string(),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Err(malformed("scheme must be http or https"));
    }
    match url.host_str() {
        Some(host) if host == "localhost" || host.contains('.') => Ok(()),
        Some(_) => Err(malformed("host is not a domain name")),
        None => Err(malformed("missing host")),
    }
}

/// Normalized result of one phase
///
/// Collaborators return loosely shaped JSON; [`PhaseOutput::from_raw`] is the
/// only way in, so nothing past the collaborator boundary has to guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseOutput(Value);

impl PhaseOutput {
    /// Wrap an already-normalized value
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Normalize a raw collaborator response
    ///
    /// # Errors
    /// `CollaboratorError::MalformedResponse` for empty or falsy responses
    /// (null, `false`, zero, empty text, empty object or array).
    pub fn from_raw(raw: Value) -> Result<Self, CollaboratorError> {
        match raw {
            Value::Null => Err(CollaboratorError::malformed("empty response")),
            Value::Bool(false) => Err(CollaboratorError::malformed("response was false")),
            Value::Number(n) if n.as_f64().is_some_and(|value| value.abs() < f64::EPSILON) => {
                Err(CollaboratorError::malformed("response was zero"))
            }
            Value::Object(map) if map.is_empty() => {
                Err(CollaboratorError::malformed("response object is empty"))
            }
            Value::Array(items) if items.is_empty() => {
                Err(CollaboratorError::malformed("response array is empty"))
            }
            Value::String(text) => {
                let body = strip_code_fence(text.trim());
                if body.is_empty() {
                    return Err(CollaboratorError::malformed("response text is empty"));
                }
                match serde_json::from_str::<Value>(body) {
                    Ok(parsed @ (Value::Object(_) | Value::Array(_))) => Self::from_raw(parsed),
                    _ => Ok(Self(Value::String(text))),
                }
            }
            other => Ok(Self(other)),
        }
    }

    /// Borrow the JSON payload
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.0
    }

    /// Take the JSON payload
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout for one collaborator call, in seconds
    pub phase_timeout_secs: u64,
    /// Per-phase duration estimates overriding the descriptor set, in seconds
    pub estimate_overrides_secs: BTreeMap<PhaseKey, u64>,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With collaborator timeout
    #[inline]
    #[must_use]
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// With a duration estimate for one phase
    #[inline]
    #[must_use]
    pub fn with_estimate(mut self, key: PhaseKey, estimate: Duration) -> Self {
        self.estimate_overrides_secs.insert(key, estimate.as_secs());
        self
    }

    /// Collaborator timeout
    #[inline]
    #[must_use]
    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs)
    }

    /// Duration estimate for a phase
    #[must_use]
    pub fn estimate(&self, key: PhaseKey) -> Duration {
        self.estimate_overrides_secs
            .get(&key)
            .map_or(key.descriptor().estimated_duration, |secs| {
                Duration::from_secs(*secs)
            })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            phase_timeout_secs: 600,
            estimate_overrides_secs: BTreeMap::new(),
        }
    }
}
