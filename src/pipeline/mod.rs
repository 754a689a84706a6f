//! Generation request orchestrator.
//!
//! One request is a single-shot, stateless unit of work: rate limits, quota
//! pre-check, model call, output validation, corpus dedup, domain probing,
//! then the usage commit. Client errors never consume quota; the commit
//! happens only after the response list is fully assembled, so a crash
//! mid-assembly fails safe toward the user.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::account::SubscriptionStore;
use crate::corpus::{find_alternative, normalize_name, rewrite_candidates, NameCorpus};
use crate::error::{NamecraftError, Result};
use crate::limiter::RateLimitStore;
use crate::llm::{build_model_request, parse_suggestions, NameModel};
use crate::probe::{to_domain_label, DomainProber};
use crate::types::{
    DomainReport, EnrichedSuggestion, GenerationInput, GenerationOutcome, Identity,
    PipelineConfig, Suggestion,
};
use crate::usage::{effective_limit, UsageLedger};

/// The name-generation request pipeline.
pub struct NamePipeline {
    config: PipelineConfig,
    limiter: Arc<dyn RateLimitStore>,
    ledger: Arc<dyn UsageLedger>,
    subscriptions: Arc<dyn SubscriptionStore>,
    corpus: Arc<dyn NameCorpus>,
    model: Arc<dyn NameModel>,
    prober: Arc<dyn DomainProber>,
}

impl NamePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        limiter: Arc<dyn RateLimitStore>,
        ledger: Arc<dyn UsageLedger>,
        subscriptions: Arc<dyn SubscriptionStore>,
        corpus: Arc<dyn NameCorpus>,
        model: Arc<dyn NameModel>,
        prober: Arc<dyn DomainProber>,
    ) -> Self {
        Self {
            config,
            limiter,
            ledger,
            subscriptions,
            corpus,
            model,
            prober,
        }
    }

    /// Run one generation request.
    ///
    /// `now` is passed explicitly so window and period math stay
    /// deterministic under test.
    pub async fn generate(
        &self,
        identity: Option<&Identity>,
        client_ip: &str,
        input: &GenerationInput,
        now: DateTime<Utc>,
    ) -> Result<GenerationOutcome> {
        let identity = identity.ok_or(NamecraftError::Unauthorized)?;

        if !self.model.is_ready() {
            return Err(NamecraftError::not_configured(
                "Generative model is not configured",
            ));
        }

        self.check_rate_limit(&format!("generate:ip:{client_ip}"), self.config.ip_limit, now)?;
        self.check_rate_limit(
            &format!("generate:identity:{}", identity.id),
            self.config.identity_limit,
            now,
        )?;

        input.validate()?;
        let count = input.requested_count();
        let cost = count.credit_cost();

        // Quota pre-check before any paid external call. The matching commit
        // runs after enrichment, so two concurrent requests for one identity
        // can overshoot by at most one request's cost; accepted soft-limit
        // design, favoring availability over hard billing precision.
        let subscription = self.subscriptions.find(&identity.id).await?;
        let limit = effective_limit(subscription.as_ref(), &self.config);
        let period = self.ledger.open_period(&identity.id, now).await?;
        if period.used_credits + cost > limit {
            tracing::info!(
                identity = %identity.id,
                used = %period.used_credits,
                limit = %limit,
                "Usage limit reached"
            );
            return Err(NamecraftError::UsageLimitReached);
        }

        let request = build_model_request(
            &input.description,
            &input.industry,
            &input.tone,
            input.keywords.as_deref(),
            count,
            self.config.temperature,
        );

        let raw = self.model.complete(&request).await.map_err(|e| {
            tracing::warn!(model = %self.model.model(), error = %e, "Model call failed");
            NamecraftError::bad_gateway(format!("Model call failed: {e}"))
        })?;

        let suggestions = parse_suggestions(&raw)?;
        let usable = normalize_and_dedup(suggestions, count.as_u32() as usize);

        if usable.is_empty() {
            // An empty result is a valid outcome of a creative generation
            // step, not an error. Nothing was enriched, nothing is charged.
            tracing::info!(identity = %identity.id, "Model produced no usable names");
            return Ok(GenerationOutcome {
                suggestions: Vec::new(),
                model: self.model.model().to_string(),
            });
        }

        // One batched lookup covering the generated names and every rewrite
        // candidate, so a substituted replacement is known to be
        // collision-free at selection time.
        let mut lookup: Vec<String> = usable.iter().map(|s| s.name.clone()).collect();
        for suggestion in &usable {
            lookup.extend(rewrite_candidates(
                &suggestion.name,
                &input.industry,
                input.keywords.as_deref(),
            ));
        }
        let existing = self.corpus.existing_lowercase(&lookup).await?;

        let enriched = join_all(
            usable
                .iter()
                .take(self.config.max_enriched)
                .map(|suggestion| self.enrich(suggestion, &existing, input)),
        )
        .await;

        self.ledger.commit(&period.id, cost).await?;

        tracing::info!(
            identity = %identity.id,
            requested = count.as_u32(),
            returned = enriched.len(),
            model = %self.model.model(),
            "Generation completed"
        );

        Ok(GenerationOutcome {
            suggestions: enriched,
            model: self.model.model().to_string(),
        })
    }

    fn check_rate_limit(&self, key: &str, limit: u32, now: DateTime<Utc>) -> Result<()> {
        let decision = self.limiter.check(key, limit, self.config.window, now);
        if decision.allowed {
            return Ok(());
        }
        tracing::debug!(key = %key, reset_at = %decision.reset_at, "Rate limited");
        Err(NamecraftError::rate_limited(
            "Too many requests",
            decision.limit,
            decision.remaining,
            decision.reset_at,
        ))
    }

    async fn enrich(
        &self,
        suggestion: &Suggestion,
        existing: &HashSet<String>,
        input: &GenerationInput,
    ) -> EnrichedSuggestion {
        let is_taken = existing.contains(&suggestion.name.to_lowercase());
        let alternative = if is_taken {
            find_alternative(
                &suggestion.name,
                existing,
                &input.industry,
                input.keywords.as_deref(),
            )
        } else {
            None
        };

        let final_name = alternative
            .clone()
            .unwrap_or_else(|| suggestion.name.clone());
        let base_label = to_domain_label(&final_name);
        let report = if base_label.is_empty() {
            DomainReport::default()
        } else {
            self.prober.probe(&base_label).await
        };

        EnrichedSuggestion {
            name: final_name,
            original_name: is_taken.then(|| suggestion.name.clone()),
            replaced_because_taken: is_taken && alternative.is_some(),
            is_existing_business_name: is_taken,
            tagline: suggestion.tagline.clone(),
            domains: report.domains,
            available_domains: report.available_domains,
        }
    }
}

/// Normalize names, drop the unusable, and de-duplicate case-insensitively
/// while preserving order. The first occurrence keeps its tagline.
fn normalize_and_dedup(suggestions: Vec<Suggestion>, requested: usize) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    let mut usable = Vec::new();

    for mut suggestion in suggestions.into_iter().take(requested) {
        suggestion.name = normalize_name(&suggestion.name);
        if suggestion.name.is_empty() {
            continue;
        }
        if seen.insert(suggestion.name.to_lowercase()) {
            usable.push(suggestion);
        }
    }

    usable
}
