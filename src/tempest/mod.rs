//! Root cause analysis of Tempest HTML reports

pub mod fetcher;
pub mod report;

pub use fetcher::ReportFetcher;
pub use report::{ReportParser, TempestFailure};

use crate::config::TempestConfig;
use crate::error::Result;
use crate::middleware::InputValidator;
use crate::observability::MetricsCollector;
use crate::rag::{Profile, PromptRequest, RcaEntry, RcaPipeline, ResponseAssembler};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runs the prompt pipeline once per distinct failing test of a report
pub struct TempestAnalyzer {
    pipeline: Arc<RcaPipeline>,
    fetcher: ReportFetcher,
    parser: ReportParser,
    config: TempestConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

impl TempestAnalyzer {
    pub fn new(pipeline: Arc<RcaPipeline>, config: TempestConfig) -> Result<Self> {
        Ok(Self {
            pipeline,
            fetcher: ReportFetcher::new(&config)?,
            parser: ReportParser::new()?,
            config,
            metrics: None,
        })
    }

    /// Set metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch the report at `report_url` and analyse each failing test.
    ///
    /// An invalid URL or a failed download aborts the whole report. Failures
    /// while analysing a single test become an `error` entry.
    pub async fn analyze_report(&self, report_url: &str) -> Result<Vec<RcaEntry>> {
        let start = Instant::now();
        let span = info_span!("tempest_report", report_id = %Uuid::new_v4());

        let result = self.analyze(report_url).instrument(span).await;
        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(entries) => metrics.record_tempest_report(start.elapsed(), entries.len()),
                Err(e) => metrics.record_tempest_error(e.category()),
            }
        }
        result
    }

    async fn analyze(&self, report_url: &str) -> Result<Vec<RcaEntry>> {
        let url = InputValidator::validate_report_url(report_url)?;
        let html = self.fetcher.fetch(&url).await?;

        let failures = self.parser.parse(&html);
        info!("Report {} has {} distinct failing tests", url, failures.len());
        if failures.is_empty() {
            return Ok(Vec::new());
        }

        let availability = match self.pipeline.discover().await {
            Ok(availability) => availability,
            Err(e) => {
                warn!("Backend discovery failed, reporting it for every test: {}", e);
                let outcome = ResponseAssembler::failure(&e);
                return Ok(failures
                    .into_iter()
                    .map(|f| RcaEntry {
                        test_name: f.test_name,
                        outcome: outcome.clone(),
                    })
                    .collect());
            }
        };
        let availability = &availability;

        let entries = stream::iter(failures)
            .map(|failure| async move {
                let request = self.prompt_for(&failure);
                let outcome = self.pipeline.handle_prompt_with(request, availability).await;
                RcaEntry {
                    test_name: failure.test_name,
                    outcome,
                }
            })
            .buffered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        Ok(entries)
    }

    /// Prompt for one failure: the test name and the end of its traceback
    fn prompt_for(&self, failure: &TempestFailure) -> PromptRequest {
        let traceback = report::tail_chars(&failure.traceback, self.config.max_traceback_chars);
        let content = if traceback.is_empty() {
            format!("Tempest test {} failed.", failure.test_name)
        } else {
            format!("Tempest test {} failed with:\n{}", failure.test_name, traceback)
        };

        PromptRequest {
            content: Some(content),
            profile_name: Some(Profile::RcaFull.as_str().to_string()),
            ..Default::default()
        }
    }
}
