//! Crawl orchestration: the per-run state machine.
//!
//! `Discover → Filter → Fetch → Triage → Extract → Dedup → Emit`, with one
//! explicit short-circuit: when filtering leaves more candidates than the
//! hard cap and the caller has not confirmed, the run exits early with a
//! structured overflow warning instead of records.
//!
//! Failures inside a single fetch or a single page's extraction never
//! abort the run; they are collected into the report.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::oracle::repair::repair_and_parse;
use crate::pipeline::consensus::extract_with_consensus;
use crate::pipeline::discover::discover_candidates;
use crate::pipeline::prompts::{format_ranking_prompt, format_triage_prompt};
use crate::pipeline::validate::validate;
use crate::traits::fetcher::Fetcher;
use crate::traits::oracle::{Embedder, Oracle, OracleRequest};
use crate::traits::sink::RecordSink;
use crate::types::config::{CrawlMode, CrawlOptions};
use crate::types::page::CandidatePage;
use crate::types::record::{is_unknown, AgencyKnowledge, ValidatedRecord};
use crate::types::registry::Registry;

/// Named pipeline stages, used for logging and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStage {
    Discover,
    Filter,
    Fetch,
    Triage,
    Extract,
    Dedup,
    Emit,
}

/// Outcome of a crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrawlOutcome {
    /// The run completed; partial failures are inside the report
    Completed(CrawlReport),

    /// Filtering left more candidates than the cap; nothing was fetched.
    /// The caller can confirm and re-run to proceed with the cap applied.
    TooManyLinks {
        /// Candidates found after filtering
        found_links: usize,

        /// The configured cap
        limit: usize,

        /// A small sample of the candidates, for the confirmation prompt
        sample_urls: Vec<String>,
    },
}

/// Summary of one crawl run: partial successes plus failure counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    /// Accepted, deduplicated records
    pub records: Vec<ValidatedRecord>,

    /// Pages fetched with enough text to proceed
    pub pages_fetched: usize,

    /// URLs that failed to fetch or extract
    pub failed_urls: Vec<String>,

    /// Records rejected by the quality gate
    pub rejected_records: usize,

    /// Duplicates dropped after extraction
    pub duplicate_records: usize,

    /// Records accepted by the sink
    pub sink_submitted: usize,

    /// Records the sink rejected
    pub sink_failed: usize,
}

impl CrawlReport {
    /// Fold another report into this one (multi-seed crawls).
    pub fn merge(&mut self, other: CrawlReport) {
        self.records.extend(other.records);
        self.pages_fetched += other.pages_fetched;
        self.failed_urls.extend(other.failed_urls);
        self.rejected_records += other.rejected_records;
        self.duplicate_records += other.duplicate_records;
        self.sink_submitted += other.sink_submitted;
        self.sink_failed += other.sink_failed;
    }
}

/// File extensions that are never pages worth extracting.
const SKIP_EXTENSIONS: [&str; 16] = [
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".pdf", ".zip",
    ".mp3", ".mp4", ".xml", ".rss", ".woff",
];

/// Path fragments for boilerplate pages with no contact information.
const SKIP_PATHS: [&str; 8] = [
    "privacy",
    "terms",
    "cookie",
    "legal",
    "gdpr",
    "accessibility",
    "login",
    "cart",
];

/// Drop non-page resources and boilerplate paths, then deduplicate
/// preserving order.
pub fn filter_candidates(urls: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();

    for url in urls {
        let lowered = url.to_lowercase();
        let path = Url::parse(&url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| lowered.clone());

        if SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            continue;
        }
        if SKIP_PATHS.iter().any(|frag| path.contains(frag)) {
            continue;
        }
        if seen.iter().any(|s| s.eq_ignore_ascii_case(&url)) {
            continue;
        }
        seen.push(url);
    }

    seen
}

/// Rank candidates by relevance with one oracle call.
///
/// A failed or unparseable ranking keeps the natural order; indices
/// outside range are dropped, unranked URLs keep their relative order at
/// the end.
async fn rank_candidates<O: Oracle>(oracle: &O, urls: Vec<String>) -> Vec<String> {
    let prompt = format_ranking_prompt(&urls);
    let raw = match oracle.generate(&OracleRequest::triage(prompt)).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "ranking call failed, keeping natural order");
            return urls;
        }
    };

    let Ok(value) = repair_and_parse(&raw, &[]) else {
        debug!("ranking output unusable, keeping natural order");
        return urls;
    };

    let ranked_indices: Vec<usize> = value
        .get("ranked")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_u64())
                .map(|i| i as usize)
                .filter(|i| *i < urls.len())
                .collect()
        })
        .unwrap_or_default();

    if ranked_indices.is_empty() {
        return urls;
    }

    let mut ordered = Vec::with_capacity(urls.len());
    for &idx in &ranked_indices {
        if !ordered.contains(&urls[idx]) {
            ordered.push(urls[idx].clone());
        }
    }
    for url in urls {
        if !ordered.contains(&url) {
            ordered.push(url);
        }
    }
    ordered
}

/// Fetch URLs under the concurrency bound using a pull-based work queue.
///
/// Results come back in the input order regardless of completion order,
/// keeping downstream knowledge establishment and deduplication
/// deterministic.
async fn fetch_all<F: Fetcher + 'static>(
    fetcher: &Arc<F>,
    urls: Vec<String>,
    concurrency: usize,
    min_text_len: usize,
) -> (Vec<CandidatePage>, Vec<String>) {
    let queue: Arc<Mutex<VecDeque<(usize, String)>>> =
        Arc::new(Mutex::new(urls.into_iter().enumerate().collect()));
    let fetched: Arc<Mutex<Vec<(usize, CandidatePage)>>> = Arc::new(Mutex::new(Vec::new()));
    let failed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let worker_count = concurrency.max(1).min(queue.lock().unwrap().len().max(1));
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
        let queue = queue.clone();
        let fetched = fetched.clone();
        let failed = failed.clone();
        let fetcher = fetcher.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let next = queue.lock().unwrap().pop_front();
                let Some((idx, url)) = next else { break };

                match fetcher.fetch(&url).await {
                    Ok(page) => fetched.lock().unwrap().push((idx, page)),
                    Err(e) => {
                        warn!(url = %url, error = %e, "fetch failed, continuing");
                        failed.lock().unwrap().push(url);
                    }
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let mut fetched = std::mem::take(&mut *fetched.lock().unwrap());
    fetched.sort_by_key(|(idx, _)| *idx);

    let pages: Vec<CandidatePage> = fetched
        .into_iter()
        .map(|(_, page)| page)
        .filter(|page| {
            let long_enough = page.text.len() >= min_text_len;
            if !long_enough {
                debug!(url = %page.url, len = page.text.len(), "page too short, skipped");
            }
            long_enough
        })
        .collect();

    let failed = std::mem::take(&mut *failed.lock().unwrap());

    (pages, failed)
}

/// Batched relevance triage. Returns the indices of pages to extract, in
/// ascending order. A failed or unparseable triage conservatively keeps
/// every page.
async fn triage_pages<O: Oracle>(oracle: &O, pages: &[CandidatePage]) -> Vec<usize> {
    let previews: Vec<String> = pages.iter().map(|p| p.preview(300)).collect();
    let prompt = format_triage_prompt(&previews);

    let raw = match oracle.generate(&OracleRequest::triage(prompt)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "triage call failed, keeping all pages");
            return (0..pages.len()).collect();
        }
    };

    let Ok(value) = repair_and_parse(&raw, &[]) else {
        warn!("triage output unusable, keeping all pages");
        return (0..pages.len()).collect();
    };

    let mut kept: Vec<usize> = value
        .get("relevant")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_u64())
                .map(|i| i as usize)
                .filter(|i| *i < pages.len())
                .collect()
        })
        .unwrap_or_else(|| (0..pages.len()).collect());

    kept.sort_unstable();
    kept.dedup();

    if kept.is_empty() {
        // An empty verdict is indistinguishable from a bad parse; keep all
        warn!("triage kept nothing, keeping all pages");
        return (0..pages.len()).collect();
    }

    kept
}

/// Two records describe the same person when normalized names match,
/// emails match, or one name contains the other within the same
/// organization.
fn same_person(a: &ValidatedRecord, b: &ValidatedRecord) -> bool {
    let a_name = a.record.name.to_lowercase();
    let b_name = b.record.name.to_lowercase();
    let a_email = a.record.email.to_lowercase();
    let b_email = b.record.email.to_lowercase();
    let a_org = a.record.organization.to_lowercase();
    let b_org = b.record.organization.to_lowercase();

    if !a_name.is_empty() && a_name == b_name {
        return true;
    }
    if !a_email.is_empty() && a_email == b_email {
        return true;
    }
    if !a_name.is_empty()
        && !b_name.is_empty()
        && (a_name.contains(&b_name) || b_name.contains(&a_name))
        && !a_org.is_empty()
        && a_org == b_org
    {
        return true;
    }
    false
}

/// Drop duplicate records, first-seen wins. Returns survivors and the
/// number dropped. Idempotent.
pub fn dedup_records(records: Vec<ValidatedRecord>) -> (Vec<ValidatedRecord>, usize) {
    let mut unique: Vec<ValidatedRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        if let Some(existing) = unique.iter().find(|u| same_person(u, &record)) {
            info!(
                name = %record.record.name,
                kept = %existing.record.name,
                "duplicate record dropped"
            );
            dropped += 1;
        } else {
            unique.push(record);
        }
    }

    (unique, dropped)
}

/// Run the crawl state machine for one seed URL.
///
/// `confirm_overflow` controls the Filter short-circuit: `false` returns
/// the overflow warning, `true` proceeds with the cap applied (the caller
/// has already confirmed).
#[allow(clippy::too_many_arguments)]
pub async fn run_crawl<F, O, E>(
    fetcher: &Arc<F>,
    oracle: &O,
    embedder: &E,
    registry: &Registry,
    sink: Option<&dyn RecordSink>,
    seed_url: &str,
    mode: CrawlMode,
    confirm_overflow: bool,
    options: &CrawlOptions,
) -> Result<CrawlOutcome>
where
    F: Fetcher + 'static,
    O: Oracle,
    E: Embedder,
{
    let mut report = CrawlReport::default();

    // Discover + Filter (+ optional ranking), skipped in single-page mode
    let fetch_urls: Vec<String> = match mode {
        CrawlMode::Single => vec![seed_url.to_string()],
        CrawlMode::Dynamic => {
            info!(stage = ?CrawlStage::Discover, url = %seed_url, "crawl starting");
            let candidates = discover_candidates(fetcher.as_ref(), seed_url).await;

            info!(stage = ?CrawlStage::Filter, candidates = candidates.len(), "filtering");
            let mut filtered = filter_candidates(candidates);
            filtered.retain(|u| !u.eq_ignore_ascii_case(seed_url));

            if filtered.len() > options.max_pages {
                if !confirm_overflow {
                    info!(
                        found = filtered.len(),
                        limit = options.max_pages,
                        "candidate overflow, awaiting confirmation"
                    );
                    return Ok(CrawlOutcome::TooManyLinks {
                        found_links: filtered.len(),
                        limit: options.max_pages,
                        sample_urls: filtered
                            .iter()
                            .take(options.overflow_sample_size)
                            .cloned()
                            .collect(),
                    });
                }
                warn!(
                    found = filtered.len(),
                    limit = options.max_pages,
                    "candidate overflow confirmed, truncating"
                );
            }

            if filtered.len() > options.ranking_threshold {
                filtered = rank_candidates(oracle, filtered).await;
            }
            filtered.truncate(options.max_pages);

            let mut urls = vec![seed_url.to_string()];
            urls.extend(filtered);
            urls
        }
    };

    // Fetch under the concurrency bound
    info!(stage = ?CrawlStage::Fetch, urls = fetch_urls.len(), "fetching");
    let min_len = match mode {
        // The caller picked the exact page; length gating does not apply
        CrawlMode::Single => 0,
        CrawlMode::Dynamic => options.min_text_len,
    };
    let (pages, failed) = fetch_all(fetcher, fetch_urls, options.concurrency, min_len).await;
    report.pages_fetched = pages.len();
    report.failed_urls = failed;

    if pages.is_empty() {
        info!(url = %seed_url, "nothing fetched, run ends empty");
        return Ok(CrawlOutcome::Completed(report));
    }

    // Triage, skipped for tiny runs and single-page mode
    let kept_indices: Vec<usize> =
        if mode == CrawlMode::Single || pages.len() <= options.triage_skip_at {
            (0..pages.len()).collect()
        } else {
            info!(stage = ?CrawlStage::Triage, pages = pages.len(), "triaging");
            triage_pages(oracle, &pages).await
        };

    // Extract each kept page, in the pipeline's own iteration order
    info!(stage = ?CrawlStage::Extract, pages = kept_indices.len(), "extracting");
    let mut knowledge: Option<AgencyKnowledge> = None;
    let mut accepted: Vec<ValidatedRecord> = Vec::new();

    for idx in kept_indices {
        let page = &pages[idx];
        let mut consensus = match extract_with_consensus(
            oracle,
            embedder,
            registry,
            page,
            knowledge.as_ref(),
            &options.matching,
            &options.extract,
            &options.consensus,
        )
        .await
        {
            Ok(consensus) => consensus,
            Err(e) => {
                warn!(url = %page.url, error = %e, "page extraction failed, continuing");
                report.failed_urls.push(page.url.clone());
                continue;
            }
        };

        let organization_agreement = consensus.agreement("organization");

        if is_unknown(&consensus.record.country) {
            if let Some(hint) = &options.country_hint {
                consensus.record.country = hint.clone();
            }
        }

        let Some(validated) = validate(consensus, &options.validate) else {
            report.rejected_records += 1;
            continue;
        };

        // One-time monotonic freeze: the first confident organization
        // identity becomes run-wide knowledge
        if knowledge.is_none()
            && !validated.record.organization.is_empty()
            && organization_agreement >= options.consensus.critical_floor
        {
            info!(
                organization = %validated.record.organization,
                url = %validated.record.source_url,
                "agency knowledge established"
            );
            knowledge = Some(AgencyKnowledge::from_sample(&validated.record));
        }

        accepted.push(validated);
    }

    // Deduplicate, first accepted record wins
    info!(stage = ?CrawlStage::Dedup, records = accepted.len(), "deduplicating");
    let (unique, dropped) = dedup_records(accepted);
    report.duplicate_records = dropped;

    // Emit to the sink when one is attached; per-record failures are
    // aggregated, never propagated
    if let Some(sink) = sink {
        info!(stage = ?CrawlStage::Emit, records = unique.len(), sink = sink.name(), "emitting");
        for record in &unique {
            match sink.submit(record, Utc::now()).await {
                Ok(()) => report.sink_submitted += 1,
                Err(e) => {
                    warn!(name = %record.record.name, error = %e, "sink submission failed");
                    report.sink_failed += 1;
                }
            }
        }
    }

    report.records = unique;
    info!(
        url = %seed_url,
        records = report.records.len(),
        rejected = report.rejected_records,
        duplicates = report.duplicate_records,
        failed = report.failed_urls.len(),
        "crawl complete"
    );

    Ok(CrawlOutcome::Completed(report))
}
