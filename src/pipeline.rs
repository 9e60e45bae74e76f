use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::SummaryCache;
use crate::error::Error;
use crate::extract::extract;
use crate::fetch::ContentFetcher;
use crate::summarize::Summarizer;

/// Content reported for a URL answered straight from the cache.
pub const CACHED_CONTENT: &str = "Cached content";

/// Outcome of one URL's run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineResult {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    fn succeeded(url: &str, content: String, ai_summary: String) -> Self {
        Self {
            url: url.to_string(),
            success: true,
            message: Some("Changelog successfully fetched".into()),
            content: Some(content),
            ai_summary: Some(ai_summary),
            error: None,
        }
    }

    fn failed(url: &str, message: String) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            message: Some(message.clone()),
            content: None,
            ai_summary: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BatchReport {
    pub processed_count: usize,
    pub results: Vec<PipelineResult>,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = &PipelineResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PipelineResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Fetch → extract → summarize → cache, for one URL at a time.
pub struct ChangelogPipeline {
    fetcher: ContentFetcher,
    summarizer: Arc<Summarizer>,
    cache: Arc<SummaryCache>,
}

impl ChangelogPipeline {
    pub fn new(
        fetcher: ContentFetcher,
        summarizer: Arc<Summarizer>,
        cache: Arc<SummaryCache>,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            cache,
        }
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub async fn run(&self, url: &str, api_key: &str) -> PipelineResult {
        match self.cache.get(url).await {
            Ok(Some(entry)) => {
                debug!(url, "serving cached summary");
                return PipelineResult::succeeded(url, CACHED_CONTENT.into(), entry.summary);
            }
            Ok(None) => {}
            // A broken cache only costs a re-fetch.
            Err(e) => warn!(url, error = %e, "summary cache read failed"),
        }

        let raw = match self.fetcher.fetch(url).await {
            Ok(raw) => raw,
            Err(e) => return PipelineResult::failed(url, format!("Failed to fetch changelog: {}", e)),
        };
        if !raw.is_success() {
            return PipelineResult::failed(
                url,
                format!("Failed to fetch changelog: HTTP {}", raw.status),
            );
        }
        if raw.body.trim().is_empty() {
            let err = Error::Content("Empty changelog content".into());
            return PipelineResult::failed(url, err.to_string());
        }

        let content = extract(&raw.body);

        let summary = match self.summarizer.summarize(&content, api_key).await {
            Ok(summary) => summary,
            Err(e) => return PipelineResult::failed(url, e.to_string()),
        };

        if let Err(e) = self.cache.put(url, &summary).await {
            warn!(url, error = %e, "failed to cache summary");
        }
        info!(url, summary_len = summary.len(), "changelog summarized");

        PipelineResult::succeeded(url, content, summary)
    }

    /// Run every non-blank URL in order. One URL failing never stops the rest.
    pub async fn run_all<S: AsRef<str>>(&self, urls: &[S], api_key: &str) -> BatchReport {
        let mut report = BatchReport::default();
        for url in urls.iter().map(|u| u.as_ref().trim()).filter(|u| !u.is_empty()) {
            let result = self.run(url, api_key).await;
            if !result.success {
                debug!(url, error = ?result.error, "changelog run failed");
            }
            report.results.push(result);
            report.processed_count += 1;
        }
        report
    }
}
