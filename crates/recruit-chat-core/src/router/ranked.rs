//! Score-ranked listings, conversational follow-ups, and semantic search.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use super::lookup::{status_filter, StatusCatalog, CLIENT_KEYWORDS, JOB_KEYWORDS};
use super::{Attempt, Query, RetrievalData, RetrievalStrategy, RouteContext};
use crate::extract::{extract_name_from_history, extract_name_from_query};
use crate::similarity::{fuzzy_contains, normalize_text, FIELD_MATCH_THRESHOLD};
use crate::store::NameMatch;

static TOP_N_FOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\btop\s+(\d+)\s+(?:[a-z]+\s+)?(?:for|of|with|skilled in|knowing|who know)\s+(.+)$",
    )
    .expect("top-n regex is valid")
});

const PEOPLE_NOUNS: &[&str] = &[
    "candidate", "candidates", "applicant", "applicants", "profile", "profiles", "people",
    "resumes",
];

const RANKING_CUES: &[&str] = &["top", "best", "highest", "strongest"];

const LISTING_FILLER: &[&str] = &[
    "show", "list", "get", "give", "display", "fetch", "me", "all", "the", "every", "of",
    "please", "our", "us", "see", "view", "entire",
];

const FOLLOW_UP_CUES: &[&str] = &[
    "applied", "status", "his", "her", "he", "she", "him", "hers", "their", "them", "they",
    "this", "that", "same", "email", "phone", "contact", "score", "salary", "experience",
    "skills", "interview", "result", "location", "details", "more",
];

const PRONOUNS: &[&str] = &["his", "her", "he", "she", "him", "hers", "their", "them", "they"];

const FOLLOW_UP_MAX_WORDS: usize = 8;

const SEMANTIC_CUES: &[&str] = &[
    "similar to", "similar", "expert in", "experts in", "expertise in", "looking for",
    "experienced in", "experience in", "someone who", "someone with", "people who",
    "profiles like", "good at", "strong in", "background in", "knowledge of",
    "specialist in", "proficient in",
];

/// "Top N for/of/with X": the best N candidates whose text mentions X.
///
/// "in" is not a connector: "top 5 candidates in pune" is a location query.
pub struct TopNFor;

#[async_trait]
impl RetrievalStrategy for TopNFor {
    fn name(&self) -> &'static str {
        "top_n_for"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some((count, criterion)) = TOP_N_FOR_RE
            .captures(q.text)
            .map(|caps| (caps[1].parse::<usize>().ok(), normalize_text(&caps[2])))
        else {
            return Ok(Attempt::Pass);
        };
        let n = count
            .filter(|n| (1..=100).contains(n))
            .unwrap_or(ctx.settings.default_limit);
        if criterion.is_empty() {
            return Ok(Attempt::Pass);
        }

        let mut hits: Vec<_> = ctx
            .store
            .top_candidates(ctx.settings.sample_size)
            .await?
            .into_iter()
            .filter(|c| fuzzy_contains(&c.search_text(), &criterion, FIELD_MATCH_THRESHOLD))
            .collect();
        hits.truncate(n);
        Ok(Attempt::Found(RetrievalData::Candidates(hits)))
    }
}

/// "Top N candidates" with nothing else to filter on.
pub struct TopCandidates;

#[async_trait]
impl RetrievalStrategy for TopCandidates {
    fn name(&self) -> &'static str {
        "top_candidates"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let ranked = q.has_any_word(RANKING_CUES);
        let about_people = q.has_any_word(PEOPLE_NOUNS) || q.requested_count.is_some();
        let other_criteria = q.has_identifier()
            || q.has_numeric_filter()
            || q.skill.is_some()
            || q.title.is_some()
            || q.city.is_some()
            || status_filter(q).is_some()
            || about_jobs_or_clients(q);
        if !(ranked && about_people) || other_criteria {
            return Ok(Attempt::Pass);
        }
        let rows = ctx.store.top_candidates(q.limit).await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

fn about_jobs_or_clients(q: &Query<'_>) -> bool {
    q.has_any_word(JOB_KEYWORDS) || q.has_any_word(CLIENT_KEYWORDS)
}

/// A bare "all candidates" / "list candidates" request.
pub struct AllCandidates;

#[async_trait]
impl RetrievalStrategy for AllCandidates {
    fn name(&self) -> &'static str {
        "all_candidates"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let rest: Vec<&str> = q
            .words
            .iter()
            .map(String::as_str)
            .filter(|w| !LISTING_FILLER.contains(w))
            .collect();
        let bare = rest.len() == 1 && PEOPLE_NOUNS.contains(&rest[0]);
        if !bare {
            return Ok(Attempt::Pass);
        }
        let rows = ctx.store.top_candidates(q.limit).await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// Short follow-up ("what about her status") resolved against the candidate
/// named in recent assistant turns.
///
/// Anything another strategy can answer on its own is not a follow-up:
/// numeric thresholds, titles, the status catalog, people nouns, and job or
/// client keywords. A status keyword only counts as a follow-up next to a
/// pronoun ("was she selected").
pub struct FollowUp;

impl FollowUp {
    fn applies(q: &Query<'_>) -> bool {
        !q.history.is_empty()
            && q.words.len() <= FOLLOW_UP_MAX_WORDS
            && q.has_any_word(FOLLOW_UP_CUES)
            && !q.has_identifier()
            && q.skill.is_none()
            && q.city.is_none()
            && extract_name_from_query(q.text).is_none()
            && !q.has_numeric_filter()
            && q.title.is_none()
            && !StatusCatalog::applies(q)
            && !q.has_any_word(PEOPLE_NOUNS)
            && !about_jobs_or_clients(q)
            && (status_filter(q).is_none() || q.has_any_word(PRONOUNS))
    }
}

#[async_trait]
impl RetrievalStrategy for FollowUp {
    fn name(&self) -> &'static str {
        "follow_up"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        if !Self::applies(q) {
            return Ok(Attempt::Pass);
        }
        let Some(name) = extract_name_from_history(q.history) else {
            return Ok(Attempt::Pass);
        };
        tracing::debug!(name = %name, "resolved follow-up reference");
        let rows = ctx
            .store
            .candidates_by_name(&NameMatch::Phrase(name), q.limit)
            .await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// Vector search for similarity-intent phrasing ("expert in", "looking for").
///
/// Passes when no embedder is configured; embedding or store failures fall
/// through to the next strategy.
pub struct Semantic;

#[async_trait]
impl RetrievalStrategy for Semantic {
    fn name(&self) -> &'static str {
        "semantic"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(embedder) = ctx.embedder else {
            return Ok(Attempt::Pass);
        };
        if !SEMANTIC_CUES.iter().any(|cue| q.has_phrase(cue)) {
            return Ok(Attempt::Pass);
        }
        let embedding = embedder.embed(q.text).await?;
        let matches = ctx
            .store
            .match_candidates(
                &embedding.vector,
                ctx.settings.semantic_threshold,
                ctx.settings.semantic_k,
            )
            .await?;
        Ok(Attempt::Found(RetrievalData::Matches(matches)))
    }
}
