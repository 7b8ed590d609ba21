//! Self-consistency engine: repeated extraction with per-field voting.
//!
//! The extractor runs once per temperature in the configured ascending
//! schedule. Each field's values are normalized (comparison only, never
//! storage), counted, and the majority value wins; equal counts resolve to
//! the value seen first in sample order, so the lowest-temperature sample
//! wins ties. Original casing is recovered from the first sample whose
//! normalized value matches the consensus.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Result, ScoutError};
use crate::pipeline::extract::extract_sample;
use crate::traits::oracle::{Embedder, Oracle};
use crate::types::config::{ConsensusOptions, ExtractOptions, MatchConfig};
use crate::types::page::CandidatePage;
use crate::types::record::{
    AgencyKnowledge, ConsensusRecord, ExtractionSample, FieldAgreement, FieldValue,
};
use crate::types::registry::Registry;

/// Merge samples into a consensus record.
///
/// `samples` must be non-empty; a single sample merges to itself with full
/// agreement everywhere and no review flag.
pub fn merge_samples(samples: &[ExtractionSample], options: &ConsensusOptions) -> ConsensusRecord {
    assert!(!samples.is_empty(), "merge_samples requires samples");

    let total = samples.len();
    let mut merged = samples[0].clone();
    let mut field_agreement: HashMap<String, FieldAgreement> = HashMap::new();

    // Profile fingerprint is metadata for voting purposes; keep the first
    // one any sample produced
    merged.profile_embedding = samples
        .iter()
        .find_map(|s| s.profile_embedding.clone());

    let field_names: Vec<&'static str> = samples[0]
        .voting_fields()
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    for (field_idx, field) in field_names.iter().enumerate() {
        let values: Vec<FieldValue> = samples
            .iter()
            .map(|s| s.voting_fields()[field_idx].1.clone())
            .collect();

        // Count normalized occurrences, preserving first-seen order so the
        // tie-break is stable and deterministic
        let mut counts: Vec<(String, usize)> = Vec::new();
        for value in &values {
            let normalized = value.normalized();
            match counts.iter_mut().find(|(n, _)| *n == normalized) {
                Some((_, count)) => *count += 1,
                None => counts.push((normalized, 1)),
            }
        }

        // Strictly-greater comparison keeps the first-seen value on ties
        let mut winner = counts[0].clone();
        for candidate in counts.iter().skip(1) {
            if candidate.1 > winner.1 {
                winner = candidate.clone();
            }
        }
        let (winner, winning_count) = winner;

        // Recover as-produced casing from the first matching sample
        let consensus_value = values
            .iter()
            .find(|v| v.normalized() == winner)
            .expect("winner came from values")
            .clone();
        merged.set_field(field, consensus_value);

        field_agreement.insert(
            field.to_string(),
            FieldAgreement {
                score: winning_count as f64 / total as f64,
                agreement_count: winning_count,
                sample_count: total,
            },
        );
    }

    let overall_score = if field_agreement.is_empty() {
        1.0
    } else {
        field_agreement.values().map(|a| a.score).sum::<f64>() / field_agreement.len() as f64
    };

    let critical_disagreement = options.critical_fields.iter().any(|field| {
        field_agreement
            .get(field)
            .map(|a| a.score < options.critical_floor)
            .unwrap_or(false)
    });
    let needs_review = critical_disagreement || overall_score < options.review_floor;

    if needs_review {
        debug!(
            url = %merged.source_url,
            overall = overall_score,
            critical_disagreement,
            "consensus flagged record for review"
        );
    }

    ConsensusRecord {
        record: merged,
        field_agreement,
        overall_score,
        needs_review,
    }
}

/// Nudge a confidence score by consensus strength, clamped to [0, 100].
pub fn adjust_confidence(base: u8, overall_score: f64) -> u8 {
    let adjustment: i16 = if overall_score >= 0.8 {
        10
    } else if overall_score >= 0.6 {
        5
    } else {
        -15
    };
    (base as i16 + adjustment).clamp(0, 100) as u8
}

/// Run the extractor once per scheduled temperature and merge the
/// successful samples.
///
/// Individual sample failures are tolerated; the merge proceeds with
/// however many samples succeeded and errors only when none did.
#[allow(clippy::too_many_arguments)]
pub async fn extract_with_consensus<O: Oracle, E: Embedder>(
    oracle: &O,
    embedder: &E,
    registry: &Registry,
    page: &CandidatePage,
    known: Option<&AgencyKnowledge>,
    matching: &MatchConfig,
    extract_options: &ExtractOptions,
    options: &ConsensusOptions,
) -> Result<ConsensusRecord> {
    let mut samples = Vec::with_capacity(options.temperatures.len());

    for &temperature in &options.temperatures {
        let sample = extract_sample(
            oracle,
            embedder,
            registry,
            page,
            known,
            temperature,
            matching,
            extract_options,
        )
        .await;

        if sample.extraction_failed {
            warn!(url = %page.url, temperature, "sample failed, continuing with the rest");
        } else {
            samples.push(sample);
        }
    }

    if samples.is_empty() {
        return Err(ScoutError::NoSamples {
            url: page.url.clone(),
        });
    }

    Ok(merge_samples(&samples, options))
}
