//! LLM-backed batch classification with local fallbacks.
//!
//! The adapter picks one of four modes:
//!
//! - `mock`: the mock flag is set, no network call is made
//! - `no-key`: no API key is configured, no network call is made
//! - `openai`: one chat-completions request for the whole batch
//! - `mock-fallback`: the request failed with a quota or billing signal
//!
//! Output is categories by *name*; turning names into ids is the apply
//! engine's job.

mod local;
mod openai;

pub(crate) use openai::{HttpTransport, Transport};
#[cfg(test)]
pub(crate) use openai::{ChatRequest, TransportReply};

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;

use crate::config::AiConfig;
use crate::error::FinsortError;
use crate::models::Transaction;

use local::LocalClassifier;

/// Upper bound on transactions sent in one request.
pub(crate) const MAX_BATCH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum ClassifyMode {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "mock")]
    Mock,
    #[serde(rename = "no-key")]
    NoKey,
    #[serde(rename = "mock-fallback")]
    MockFallback,
}

impl ClassifyMode {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mock => "mock",
            Self::NoKey => "no-key",
            Self::MockFallback => "mock-fallback",
        }
    }
}

impl std::fmt::Display for ClassifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One proposed category for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Assignment {
    pub(crate) transaction_id: i64,
    pub(crate) category: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Classification {
    pub(crate) mode: ClassifyMode,
    /// Transactions actually sent to (or evaluated in place of) the classifier.
    pub(crate) considered: usize,
    pub(crate) assignments: Vec<Assignment>,
}

/// The mode a call would run in, before any network traffic.
pub(crate) fn configured_mode(config: &AiConfig) -> ClassifyMode {
    if config.mock {
        ClassifyMode::Mock
    } else if config.api_key.is_some() {
        ClassifyMode::OpenAi
    } else {
        ClassifyMode::NoKey
    }
}

pub(crate) struct Classifier<T: Transport = HttpTransport> {
    config: AiConfig,
    transport: T,
    local: LocalClassifier,
}

impl Classifier<HttpTransport> {
    pub(crate) fn from_config(config: AiConfig) -> Self {
        Self::new(config, HttpTransport::new())
    }
}

impl<T: Transport> Classifier<T> {
    pub(crate) fn new(config: AiConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            local: LocalClassifier::new(),
        }
    }

    pub(crate) fn mode(&self) -> ClassifyMode {
        configured_mode(&self.config)
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Classify up to [`MAX_BATCH`] uncategorized transactions into the
    /// `allowed` category names.
    ///
    /// Quota and billing failures degrade to the local heuristic; any other
    /// non-success answer or a transport failure is returned as an error.
    pub(crate) fn classify_batch(
        &self,
        txns: &[Transaction],
        allowed: &[String],
    ) -> Result<Classification> {
        let batch: Vec<&Transaction> = txns
            .iter()
            .filter(|t| t.id.is_some() && !t.is_categorized())
            .take(MAX_BATCH)
            .collect();
        let mode = self.mode();

        if batch.is_empty() {
            return Ok(Classification {
                mode,
                considered: 0,
                assignments: Vec::new(),
            });
        }

        let api_key = match (&self.config.api_key, mode) {
            (Some(key), ClassifyMode::OpenAi) => key,
            _ => return Ok(self.locally(mode, &batch, allowed)),
        };

        let request = openai::build_request(&self.config.model, &batch, allowed)?;
        let url = openai::completions_url(&self.config.base_url);
        tracing::debug!(
            model = %self.config.model,
            batch = batch.len(),
            allowed = allowed.len(),
            "sending classification request"
        );

        let reply = self.transport.send(&url, api_key, &request)?;

        if !reply.is_success() {
            if openai::is_quota_failure(&reply) {
                tracing::warn!(
                    status = reply.status,
                    "classifier quota or billing limit hit; using local heuristic"
                );
                return Ok(self.locally(ClassifyMode::MockFallback, &batch, allowed));
            }
            return Err(FinsortError::upstream(reply.status, &reply.body).into());
        }

        let batch_ids: HashSet<i64> = batch.iter().filter_map(|t| t.id).collect();
        let mut seen = HashSet::new();
        let assignments: Vec<Assignment> = openai::parse_assignments(&reply.body)
            .into_iter()
            .filter(|a| batch_ids.contains(&a.transaction_id) && seen.insert(a.transaction_id))
            .collect();

        tracing::debug!(
            returned = assignments.len(),
            batch = batch.len(),
            "classification response parsed"
        );

        Ok(Classification {
            mode: ClassifyMode::OpenAi,
            considered: batch.len(),
            assignments,
        })
    }

    fn locally(
        &self,
        mode: ClassifyMode,
        batch: &[&Transaction],
        allowed: &[String],
    ) -> Classification {
        Classification {
            mode,
            considered: batch.len(),
            assignments: self.local.classify(batch, allowed),
        }
    }
}
