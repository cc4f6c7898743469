//! Catch-all strategies tried after every keyword route has passed.

use anyhow::Result;
use async_trait::async_trait;

use super::{Attempt, Query, RetrievalData, RetrievalStrategy, RouteContext};
use crate::models::Candidate;
use crate::similarity::{word_match_ratio, WORD_MATCH_THRESHOLD};
use crate::store::{by_score_desc, NameMatch};

/// Fraction of residual query terms a record must contain.
const BROAD_MIN_RATIO: f64 = 0.7;

const BROAD_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "in", "on", "at", "to", "for", "with", "by", "from",
    "is", "are", "was", "were", "be", "been", "who", "what", "which", "whom", "whose", "where",
    "when", "how", "any", "some", "all", "me", "my", "our", "us", "we", "i", "you", "show",
    "find", "list", "get", "give", "tell", "search", "fetch", "display", "need", "want",
    "looking", "have", "has", "having", "know", "knows", "can", "could", "would", "should",
    "please", "people", "person", "someone", "anyone", "candidate", "candidates", "applicant",
    "applicants", "profile", "profiles", "about", "there", "their", "that", "this", "these",
    "those", "them", "they", "also", "only", "just", "more", "than", "like", "good",
];

/// Name search additionally ignores words that describe records rather than
/// name them.
const NAME_STOP_WORDS: &[&str] = &[
    "details", "detail", "info", "information", "status", "email", "phone", "number",
    "contact", "score", "salary", "experience", "skills", "skill", "resume", "cv", "job",
    "jobs", "applied", "application", "interview", "result", "results", "location", "named",
    "called", "name", "check", "view", "see", "open", "up", "pull", "his", "her", "hers",
    "him", "he", "she", "is", "s",
];

fn residual_terms(q: &Query<'_>) -> Vec<String> {
    q.words
        .iter()
        .filter(|w| !BROAD_STOP_WORDS.contains(&w.as_str()) && w.chars().count() > 3)
        .cloned()
        .collect()
}

fn name_guess(q: &Query<'_>) -> Vec<String> {
    q.words
        .iter()
        .filter(|w| {
            w.chars().count() >= 2
                && !BROAD_STOP_WORDS.contains(&w.as_str())
                && !NAME_STOP_WORDS.contains(&w.as_str())
        })
        .cloned()
        .collect()
}

/// Word-level typo-tolerant match over candidate free text, then jobs, then
/// clients. The three reads are issued concurrently.
pub struct BroadSearch;

#[async_trait]
impl RetrievalStrategy for BroadSearch {
    fn name(&self) -> &'static str {
        "broad"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let terms = residual_terms(q);
        if terms.is_empty() {
            return Ok(Attempt::Pass);
        }

        let (candidates, jobs, clients) = futures::join!(
            ctx.store.top_candidates(ctx.settings.sample_size),
            ctx.store.list_jobs(false, None),
            ctx.store.clients_with_contacts(false, None),
        );

        let matches =
            |text: &str| word_match_ratio(text, &terms, WORD_MATCH_THRESHOLD) >= BROAD_MIN_RATIO;

        let mut hits: Vec<Candidate> = candidates?
            .into_iter()
            .filter(|c| matches(&c.search_text()))
            .collect();
        if !hits.is_empty() {
            hits.sort_by(by_score_desc);
            hits.truncate(q.limit);
            return Ok(Attempt::Found(RetrievalData::Candidates(hits)));
        }

        let jobs: Vec<_> = jobs?
            .into_iter()
            .filter(|j| {
                let text = format!("{} {}", j.search_text(), j.location.as_deref().unwrap_or(""));
                matches(&text)
            })
            .take(q.limit)
            .collect();
        if !jobs.is_empty() {
            return Ok(Attempt::Found(RetrievalData::Jobs(jobs)));
        }

        let clients: Vec<_> = clients?
            .into_iter()
            .filter(|c| {
                let text = format!(
                    "{} {} {}",
                    c.client.name,
                    c.client.industry.as_deref().unwrap_or(""),
                    c.client.location.as_deref().unwrap_or("")
                );
                matches(&text)
            })
            .take(q.limit)
            .collect();
        Ok(Attempt::Found(RetrievalData::Clients(clients)))
    }
}

/// Treat what is left of the query as a name: full phrase, then every word,
/// then any word, then free text across skills, experience, and resume.
pub struct NameSearch;

#[async_trait]
impl RetrievalStrategy for NameSearch {
    fn name(&self) -> &'static str {
        "name"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let words = name_guess(q);
        if words.is_empty() {
            return Ok(Attempt::Pass);
        }
        let phrase = words.join(" ");

        let mut tiers = vec![NameMatch::Phrase(phrase.clone())];
        if words.len() > 1 {
            tiers.push(NameMatch::AllOf(words.clone()));
            tiers.push(NameMatch::AnyOf(words));
        }
        for tier in &tiers {
            let rows = ctx.store.candidates_by_name(tier, q.limit).await?;
            if !rows.is_empty() {
                tracing::debug!(?tier, rows = rows.len(), "name match");
                return Ok(Attempt::Found(RetrievalData::Candidates(rows)));
            }
        }

        let rows = ctx.store.candidates_by_text(&phrase, q.limit).await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{RouteRequest, RouterSettings};

    fn query(text: &str) -> Query<'_> {
        Query::new(
            &RouteRequest {
                query: text,
                history: &[],
                requested_count: None,
            },
            &RouterSettings::default(),
        )
    }

    #[test]
    fn test_residual_terms_drop_stop_words_and_short_words() {
        assert_eq!(
            residual_terms(&query("show me people with kafka and etl pipelines")),
            vec!["kafka".to_string(), "pipelines".to_string()]
        );
        assert!(residual_terms(&query("who are they")).is_empty());
    }

    #[test]
    fn test_name_guess() {
        assert_eq!(
            name_guess(&query("details of Priya Sharma")),
            vec!["priya".to_string(), "sharma".to_string()]
        );
        assert_eq!(name_guess(&query("what is Rahul's status")), vec!["rahul".to_string()]);
    }
}
