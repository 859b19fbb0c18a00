use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use crate::field::field_model::{DomNode, PageSnapshot};
use crate::field::fingerprint::FieldFingerprint;
use crate::field::identity::{ElementKey, element_keys};
use crate::field::locator::locate;
use crate::field::visibility::is_eligible;
use crate::guidance::client::GuidanceClient;
use crate::guidance::guidance_model::{GuidanceRecord, GuidanceRequest};
use crate::guidance::session::{GuidanceOutcome, GuidanceSession};
use crate::scan::tooltip::Tooltip;
use crate::trace::{logger::TraceLogger, trace::ScanEvent};

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// User-facing settings, as stored by the extension's options page.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub user_language: String,
    pub enabled: bool,
    /// Attach the generic fallback record when a fetch fails.
    pub fallback_on_failure: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            user_language: DEFAULT_LANGUAGE.to_string(),
            enabled: true,
            fallback_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub pass: u64,
    pub candidates: usize,
    pub tooltips: Vec<Tooltip>,
    pub cache_hits: usize,
    pub fetched: usize,
    pub degraded: usize,
    pub joined: usize,
    pub skipped_in_flight: usize,
    pub failed: usize,
}

impl ScanReport {
    fn tally(&mut self, outcome: &GuidanceOutcome) {
        match outcome {
            GuidanceOutcome::Cached(_) => self.cache_hits += 1,
            GuidanceOutcome::Fetched(_) => self.fetched += 1,
            GuidanceOutcome::Degraded(_) => self.degraded += 1,
            GuidanceOutcome::Joined(_) => self.joined += 1,
            GuidanceOutcome::InFlight => self.skipped_in_flight += 1,
            GuidanceOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn attached(&self) -> usize {
        self.tooltips.len()
    }
}

/// Form controls the scanner asks guidance for.
pub fn is_field_candidate(el: &DomNode) -> bool {
    match el.tag_name().as_str() {
        "select" | "textarea" => true,
        "input" => !matches!(
            el.input_type().as_deref(),
            Some("submit") | Some("button") | Some("reset") | Some("image") | Some("hidden")
        ),
        _ => false,
    }
}

struct FieldJob {
    node: usize,
    key: ElementKey,
    fingerprint: FieldFingerprint,
    request: GuidanceRequest,
}

/// Finds eligible fields on a page and attaches guidance to them.
///
/// Each call to `scan` is one pass; repeated passes over an updated
/// snapshot stand in for mutation-observer rescans. Elements that already
/// carry a tooltip are never requested again; they are tracked by
/// `ElementKey`, which survives nodes being inserted ahead of them.
pub struct PageScanner {
    session: GuidanceSession,
    client: Arc<dyn GuidanceClient>,
    settings: ScanSettings,
    attached: HashSet<ElementKey>,
    pass: u64,
    tracer: TraceLogger,
}

impl PageScanner {
    pub fn new(
        session: GuidanceSession,
        client: Arc<dyn GuidanceClient>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            session,
            client,
            settings,
            attached: HashSet::new(),
            pass: 0,
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn session(&self) -> &GuidanceSession {
        &self.session
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Whether node `node` of `page` already carries a tooltip.
    pub fn is_attached(&self, page: &PageSnapshot, node: usize) -> bool {
        element_keys(page, is_field_candidate)
            .get(&node)
            .is_some_and(|key| self.attached.contains(key))
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Leave the current page: dispose its session, start a fresh one and
    /// forget every attachment marker.
    pub fn navigate(&mut self) {
        let config = self.session.config().clone();
        self.session.dispose();
        self.session = GuidanceSession::new(config);
        self.attached.clear();
        self.pass = 0;
    }

    pub async fn scan(&mut self, page: &PageSnapshot) -> ScanReport {
        self.pass += 1;
        let mut report = ScanReport {
            pass: self.pass,
            ..Default::default()
        };

        if !self.settings.enabled {
            debug!("guidance disabled, skipping scan");
            return report;
        }

        let jobs = self.collect_jobs(page);
        report.candidates = jobs.len();

        let session = &self.session;
        let client = &self.client;
        let outcomes = join_all(jobs.iter().map(|job| {
            session.request_guidance(&job.fingerprint, move || client.fetch(&job.request))
        }))
        .await;

        for (job, outcome) in jobs.iter().zip(outcomes) {
            report.tally(&outcome);

            let record = match &outcome {
                GuidanceOutcome::Failed(_) if self.settings.fallback_on_failure => {
                    Some(GuidanceRecord::fallback())
                }
                other => other.record().filter(|r| r.is_usable()).cloned(),
            };

            let mut event = ScanEvent::now(self.pass, job.node, &job.fingerprint)
                .with_element(&job.key)
                .with_outcome(&outcome)
                .with_attached(record.is_some());
            if record.is_none() && outcome.record().is_some() {
                event = event.with_detail("empty explanation");
            }
            self.tracer.log(&event);

            if let Some(record) = record {
                self.attached.insert(job.key.clone());
                report
                    .tooltips
                    .push(Tooltip::new(job.node, &job.request.field_context.label_text, record));
            }
        }

        info!(
            pass = report.pass,
            candidates = report.candidates,
            attached = report.attached(),
            cache_hits = report.cache_hits,
            skipped = report.skipped_in_flight,
            failed = report.failed,
            "scan complete"
        );
        report
    }

    fn collect_jobs(&self, page: &PageSnapshot) -> Vec<FieldJob> {
        let domain = page.domain();
        let language = &self.settings.user_language;
        let mut candidates: Vec<(usize, ElementKey)> = element_keys(page, is_field_candidate)
            .into_iter()
            .filter(|(_, key)| !self.attached.contains(key))
            .collect();
        candidates.sort_by_key(|(i, _)| *i);

        candidates
            .into_iter()
            .filter(|(i, _)| is_eligible(page, *i))
            .filter_map(|(i, key)| {
                let fingerprint = FieldFingerprint::for_node(page, i, language)?;
                Some(FieldJob {
                    node: i,
                    key,
                    fingerprint,
                    request: GuidanceRequest {
                        page_domain: domain.clone(),
                        user_language: language.clone(),
                        field_context: locate(page, i),
                    },
                })
            })
            .collect()
    }
}
