//! Intent classification.
//!
//! A state-free heuristic over keyword sets, tested in a fixed priority
//! order: greeting → help → recruitment → off-topic/unclear. The confidence
//! value is informational only; nothing downstream gates on it.

use serde::Serialize;

use crate::extract::{
    extract_city, extract_email, extract_job_id, extract_job_title, extract_name_from_query,
    extract_phone, extract_skill,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Greeting,
    Help,
    Recruitment,
    Unclear,
    OffTopic,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Greeting => "greeting",
            QueryType::Help => "help",
            QueryType::Recruitment => "recruitment",
            QueryType::Unclear => "unclear",
            QueryType::OffTopic => "off_topic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub confidence: f32,
}

const GREETINGS: &[&str] = &[
    "hi", "hii", "hello", "hey", "hola", "namaste", "greetings", "howdy", "yo", "good morning",
    "good afternoon", "good evening", "hi there", "hello there", "hey there", "how are you",
    "what's up", "whats up", "sup",
];

const HELP_PHRASES: &[&str] = &[
    "help", "what can you do", "what can i ask", "how do i use", "how to use",
    "how does this work", "what do you do", "capabilities", "features", "commands",
    "guide me", "instructions",
];

const RECRUITMENT_KEYWORDS: &[&str] = &[
    "candidate", "candidates", "applicant", "applicants", "job", "jobs", "position",
    "positions", "opening", "openings", "vacancy", "vacancies", "role", "roles", "client",
    "clients", "company", "companies", "contact", "contacts", "resume", "resumes", "cv",
    "skill", "skills", "experience", "salary", "ctc", "lpa", "lakh", "score", "scores",
    "status", "statuses", "interview", "screening", "selected", "rejected", "offered",
    "hired", "shortlisted", "applied", "hire", "hiring", "recruit", "recruitment", "profile",
    "profiles", "talent", "developer", "developers", "engineer", "engineers", "email",
    "phone", "top", "best", "similar", "match", "matching",
];

const OFF_TOPIC_KEYWORDS: &[&str] = &[
    "weather", "joke", "jokes", "movie", "movies", "song", "songs", "music", "recipe",
    "cricket", "football", "sports", "news", "politics", "stock", "stocks", "bitcoin",
    "crypto", "game", "games", "poem", "story", "temperature", "horoscope", "capital",
];

fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .trim()
        .trim_end_matches(['!', '?', '.', ','].as_slice())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn words(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect()
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.contains(' ') {
        format!(" {} ", normalized).contains(&format!(" {} ", phrase))
    } else {
        words(normalized).contains(&phrase)
    }
}

/// Whether the query carries any recruitment signal: keyword, vocabulary
/// term, or identifier.
pub fn has_recruitment_signal(query: &str) -> bool {
    let normalized = normalize(query);
    RECRUITMENT_KEYWORDS
        .iter()
        .any(|k| contains_phrase(&normalized, k))
        || extract_skill(query).is_some()
        || extract_job_title(query).is_some()
        || extract_city(query).is_some()
        || has_identifier(query)
}

fn has_identifier(query: &str) -> bool {
    extract_email(query).is_some() || extract_phone(query).is_some() || extract_job_id(query).is_some()
}

fn is_greeting(normalized: &str, query: &str) -> bool {
    GREETINGS.iter().any(|g| {
        normalized == *g
            || (normalized.starts_with(&format!("{} ", g))
                && !has_recruitment_signal(query))
    })
}

/// Classify a user message into a coarse intent.
pub fn classify_query(query: &str) -> Classification {
    let normalized = normalize(query);
    let word_count = words(&normalized).len();

    if normalized.is_empty() {
        return Classification {
            query_type: QueryType::Unclear,
            confidence: 0.5,
        };
    }

    if is_greeting(&normalized, query) {
        return Classification {
            query_type: QueryType::Greeting,
            confidence: 1.0,
        };
    }

    let recruitment_keyword = RECRUITMENT_KEYWORDS
        .iter()
        .any(|k| contains_phrase(&normalized, k))
        || extract_skill(query).is_some()
        || extract_job_title(query).is_some()
        || extract_city(query).is_some();

    if HELP_PHRASES.iter().any(|h| contains_phrase(&normalized, h)) && !recruitment_keyword {
        return Classification {
            query_type: QueryType::Help,
            confidence: 0.9,
        };
    }

    if recruitment_keyword || has_identifier(query) {
        return Classification {
            query_type: QueryType::Recruitment,
            confidence: 0.9,
        };
    }

    if word_count <= 5 && extract_name_from_query(query).is_some() {
        return Classification {
            query_type: QueryType::Recruitment,
            confidence: 0.7,
        };
    }

    if OFF_TOPIC_KEYWORDS.iter().any(|k| contains_phrase(&normalized, k)) {
        return Classification {
            query_type: QueryType::OffTopic,
            confidence: 0.8,
        };
    }

    if word_count <= 3 {
        return Classification {
            query_type: QueryType::Unclear,
            confidence: 0.5,
        };
    }

    Classification {
        query_type: QueryType::OffTopic,
        confidence: 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(q: &str) -> QueryType {
        classify_query(q).query_type
    }

    #[test]
    fn test_greetings() {
        assert_eq!(kind("hello"), QueryType::Greeting);
        assert_eq!(kind("Hi!"), QueryType::Greeting);
        assert_eq!(kind("good morning team"), QueryType::Greeting);
        assert_eq!(classify_query("hey").confidence, 1.0);
    }

    #[test]
    fn test_greeting_prefix_with_request_is_recruitment() {
        assert_eq!(kind("hi, show me python candidates"), QueryType::Recruitment);
    }

    #[test]
    fn test_help() {
        assert_eq!(kind("help"), QueryType::Help);
        assert_eq!(kind("what can you do?"), QueryType::Help);
        assert_eq!(classify_query("help").confidence, 0.9);
    }

    #[test]
    fn test_recruitment_by_keyword() {
        let c = classify_query("show me candidates with Python skills");
        assert_eq!(c.query_type, QueryType::Recruitment);
        assert_eq!(c.confidence, 0.9);
        assert_eq!(kind("any openings in pune"), QueryType::Recruitment);
        assert_eq!(kind("who's in screening"), QueryType::Recruitment);
    }

    #[test]
    fn test_recruitment_by_identifier() {
        assert_eq!(kind("priya@example.com"), QueryType::Recruitment);
        assert_eq!(kind("9876543210"), QueryType::Recruitment);
        assert_eq!(kind("DEV101"), QueryType::Recruitment);
    }

    #[test]
    fn test_recruitment_by_name_pattern() {
        let c = classify_query("Priya Sharma");
        assert_eq!(c.query_type, QueryType::Recruitment);
        assert_eq!(c.confidence, 0.7);
    }

    #[test]
    fn test_off_topic() {
        assert_eq!(kind("what's the weather"), QueryType::OffTopic);
        assert_eq!(kind("tell me something funny about life please"), QueryType::OffTopic);
        assert_eq!(classify_query("what's the weather").confidence, 0.8);
    }

    #[test]
    fn test_unclear() {
        assert_eq!(kind("ok"), QueryType::Unclear);
        assert_eq!(kind("hmm maybe"), QueryType::Unclear);
        assert_eq!(kind("   "), QueryType::Unclear);
        assert_eq!(classify_query("ok").confidence, 0.5);
    }

    #[test]
    fn test_deterministic() {
        for q in ["hello", "ok", "what's the weather", "top 5 candidates"] {
            assert_eq!(classify_query(q), classify_query(q));
        }
    }
}
