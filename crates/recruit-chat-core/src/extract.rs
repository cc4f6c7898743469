//! Pattern extractors.
//!
//! Each extractor takes the raw query and returns an optional structured
//! value. They are pure, never fail, and may all fire on the same input;
//! precedence between them is decided by the [`router`](crate::router).

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Comparator, ConversationTurn, EntityKind, NumericFilter, Role};

/// Skills recognised by [`extract_skill`] and the skill search strategy.
pub const SKILL_VOCABULARY: &[&str] = &[
    "python", "java", "javascript", "typescript", "react", "react native", "angular", "vue",
    "node", "node.js", "nodejs", "express", "django", "flask", "fastapi", "spring",
    "spring boot", "hibernate", "aws", "azure", "gcp", "google cloud", "docker", "kubernetes",
    "sql", "mysql", "postgresql", "postgres", "mongodb", "redis", "oracle", "machine learning",
    "deep learning", "data science", "data analysis", "data", "nlp", "computer vision",
    "tensorflow", "pytorch", "pandas", "numpy", "excel", "power bi", "tableau", "c++", "c#",
    ".net", "asp.net", "php", "laravel", "ruby", "rails", "golang", "rust", "scala", "kotlin",
    "swift", "android", "ios", "flutter", "html", "css", "tailwind", "devops", "jenkins",
    "terraform", "ansible", "linux", "git", "selenium", "manual testing", "automation testing",
    "sap", "salesforce", "figma", "ui/ux", "graphql", "microservices", "hadoop", "spark",
    "kafka", "airflow", "snowflake", "recruitment", "payroll", "accounting", "seo",
    "digital marketing", "sales",
];

/// Job titles recognised by [`extract_job_title`] and the title search strategy.
pub const JOB_TITLE_VOCABULARY: &[&str] = &[
    "software engineer", "software developer", "senior software engineer", "developer",
    "engineer", "data scientist", "data analyst", "data engineer", "frontend developer",
    "front end developer", "backend developer", "back end developer", "full stack developer",
    "fullstack developer", "web developer", "mobile developer", "android developer",
    "ios developer", "devops engineer", "cloud engineer", "qa engineer", "test engineer",
    "automation engineer", "machine learning engineer", "ml engineer", "ai engineer",
    "product manager", "project manager", "program manager", "business analyst",
    "ui designer", "ux designer", "graphic designer", "designer", "hr manager",
    "hr executive", "recruiter", "sales executive", "sales manager", "marketing manager",
    "accountant", "consultant", "solution architect", "architect", "team lead", "tech lead",
    "security analyst", "support engineer", "system administrator", "database administrator",
    "scrum master", "intern",
];

/// Cities recognised by the location search strategy.
pub const CITY_VOCABULARY: &[&str] = &[
    "mumbai", "delhi", "new delhi", "bangalore", "bengaluru", "hyderabad", "chennai", "pune",
    "kolkata", "ahmedabad", "jaipur", "noida", "gurgaon", "gurugram", "chandigarh", "kochi",
    "indore", "lucknow", "coimbatore", "nagpur", "remote",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex is valid")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(?:\+?91[\s-]?)?([6-9]\d{9})(?:$|\D)").expect("phone regex is valid")
});

static JOB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z]{2,4}\d+)\b").expect("job id regex is valid"));

static EXPERIENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(above|more than|over|greater than|less than|below|under|fewer than)\s+(\d+(?:\.\d+)?)\s*\+?\s*(?:years?|yrs?)\b",
    )
    .expect("experience regex is valid")
});

static EXPERIENCE_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:experience|exp)\s+(?:of\s+)?(above|more than|over|greater than|less than|below|under|fewer than)\s+(\d+(?:\.\d+)?)\b",
    )
    .expect("experience field regex is valid")
});

static SALARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:lpa|lakhs?|lacs?|l)\b").expect("salary regex is valid")
});

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bscores?\s*(?:is\s+|of\s+)?(above|below|over|under|greater than|less than|more than|>|<)\s*(\d+(?:\.\d+)?)",
    )
    .expect("score regex is valid")
});

static COUNT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\btop\s+(\d+)\b",
        r"(?i)\b(\d+)\s+(?:candidates?|profiles?|people|results?|applicants?|jobs?|resumes?|clients?)\b",
        r"(?i)\b(?:show|list|give|get|find|fetch)\s+(?:me\s+)?(\d+)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("count regex is valid"))
    .collect()
});

static NAME_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:similar to|same as|named|called|profile of|details of|details for|about)\s+([A-Z][a-zA-Z'.-]*(?:\s+[A-Z][a-zA-Z'.-]*){0,2})",
    )
    .expect("name cue regex is valid")
});

static PROPER_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z'.-]+)\s+([A-Z][a-z'.-]+)(?:\s+([A-Z][a-z'.-]+))?\b")
        .expect("proper noun regex is valid")
});

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").expect("bold regex is valid"));

/// Capitalized words that start sentences or label fields rather than name people.
const NOT_NAME_WORDS: &[&str] = &[
    "show", "find", "list", "get", "give", "tell", "what", "who", "whose", "which", "where",
    "when", "how", "is", "are", "the", "me", "all", "top", "best", "candidate", "candidates",
    "job", "jobs", "client", "clients", "please", "can", "could", "would", "search", "display",
    "status", "email", "phone", "score", "skills", "experience", "location", "salary",
    "interview", "result", "results", "summary", "note", "hello", "hi", "hey", "thanks",
    "details", "profile", "open", "active", "senior", "junior", "lead", "team", "total",
    "overall", "expected", "applied", "position", "contact", "contacts", "similar", "match",
    "matches", "no", "yes", "here", "there", "i", "we", "you", "they",
];

/// Normalize for vocabulary lookup: lowercase, keep `+ # . /` inside tokens
/// (for `c++`, `node.js`, `ui/ux`), drop other punctuation, collapse whitespace.
pub fn normalize_for_vocabulary(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || ",;:!?()[]{}\"'`".contains(c))
        .map(|tok| {
            let edge = |c: char| c == '.' || c == '/';
            if tok.starts_with('.') && tok.len() > 1 {
                tok.trim_end_matches(edge)
            } else {
                tok.trim_matches(edge)
            }
        })
        .filter(|tok| !tok.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Longest vocabulary entry occurring in `query` on word boundaries.
pub fn longest_vocabulary_match(query: &str, vocabulary: &[&'static str]) -> Option<&'static str> {
    let padded = format!(" {} ", normalize_for_vocabulary(query));
    vocabulary
        .iter()
        .filter(|term| padded.contains(&format!(" {} ", term)))
        .max_by_key(|term| term.chars().count())
        .copied()
}

/// First email-shaped substring.
pub fn extract_email(query: &str) -> Option<String> {
    EMAIL_RE.find(query).map(|m| m.as_str().to_string())
}

/// A 10-digit Indian mobile number, optionally prefixed with `+91`; returns the bare 10 digits.
pub fn extract_phone(query: &str) -> Option<String> {
    PHONE_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// A job code of 2–4 letters followed by digits, uppercased.
pub fn extract_job_id(query: &str) -> Option<String> {
    JOB_ID_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

fn comparator_for(phrase: &str) -> Comparator {
    match phrase.to_lowercase().as_str() {
        "less than" | "below" | "under" | "fewer than" | "<" => Comparator::Lt,
        _ => Comparator::Gt,
    }
}

/// Experience threshold: `"more than 5 years"`, `"experience below 3"`.
pub fn extract_experience(query: &str) -> Option<NumericFilter> {
    let caps = EXPERIENCE_RE
        .captures(query)
        .or_else(|| EXPERIENCE_FIELD_RE.captures(query))?;
    let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some(NumericFilter {
        value,
        op: comparator_for(caps.get(1)?.as_str()),
    })
}

/// Salary threshold in rupees: a number followed by `l`/`lakh`/`lpa`, times 100,000.
///
/// The operator is `gt` unless the query says "below", "under", or "less than".
pub fn extract_salary(query: &str) -> Option<NumericFilter> {
    let caps = SALARY_RE.captures(query)?;
    let lakhs = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let lower = query.to_lowercase();
    let op = if lower.contains("below") || lower.contains("under") || lower.contains("less than")
    {
        Comparator::Lt
    } else {
        Comparator::Gt
    };
    Some(NumericFilter {
        value: lakhs * 100_000.0,
        op,
    })
}

/// Score threshold: `"score above 80"`, `"score < 50"`.
pub fn extract_score(query: &str) -> Option<NumericFilter> {
    let caps = SCORE_RE.captures(query)?;
    let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some(NumericFilter {
        value,
        op: comparator_for(caps.get(1)?.as_str()),
    })
}

/// Longest skill from [`SKILL_VOCABULARY`] mentioned in the query.
pub fn extract_skill(query: &str) -> Option<&'static str> {
    longest_vocabulary_match(query, SKILL_VOCABULARY)
}

/// Longest job title from [`JOB_TITLE_VOCABULARY`] mentioned in the query.
pub fn extract_job_title(query: &str) -> Option<&'static str> {
    longest_vocabulary_match(query, JOB_TITLE_VOCABULARY)
}

/// City from [`CITY_VOCABULARY`] mentioned in the query.
pub fn extract_city(query: &str) -> Option<&'static str> {
    longest_vocabulary_match(query, CITY_VOCABULARY)
}

/// Requested result count ("top 10", "15 candidates"), only within `[1, 100]`.
pub fn extract_requested_count(query: &str) -> Option<usize> {
    let raw = COUNT_RES
        .iter()
        .find_map(|re| re.captures(query).and_then(|c| c.get(1)))?
        .as_str()
        .parse::<u64>()
        .ok()?;
    (1..=100).contains(&raw).then_some(raw as usize)
}

fn clean_name_word(word: &str) -> &str {
    let word = word.trim_end_matches(|c: char| c == '.' || c == '-');
    word.strip_suffix("'s").unwrap_or(word)
}

fn is_name_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    !NOT_NAME_WORDS.contains(&lower.as_str())
        && !SKILL_VOCABULARY.contains(&lower.as_str())
        && !CITY_VOCABULARY.contains(&lower.as_str())
}

/// A person name in the current message.
///
/// Prefers a capitalized phrase after a cue ("similar to Priya Sharma"),
/// then falls back to the first run of two or three capitalized words that
/// are not sentence starters, skills, or cities.
pub fn extract_name_from_query(query: &str) -> Option<String> {
    if let Some(caps) = NAME_CUE_RE.captures(query) {
        let words: Vec<&str> = caps[1]
            .split_whitespace()
            .map(clean_name_word)
            .filter(|w| is_name_word(w))
            .collect();
        if !words.is_empty() {
            return Some(words.join(" "));
        }
    }

    PROPER_PAIR_RE.captures_iter(query).find_map(|caps| {
        let words: Vec<&str> = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| clean_name_word(m.as_str()))
            .skip_while(|w| !is_name_word(w))
            .take_while(|w| is_name_word(w))
            .collect();
        (words.len() >= 2).then(|| words.join(" "))
    })
}

fn looks_like_name(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    !words.is_empty()
        && words.len() <= 4
        && !text.ends_with(':')
        && words.iter().all(|w| {
            w.chars().next().is_some_and(char::is_uppercase)
                && w.chars().all(|c| c.is_alphabetic() || "'.-".contains(c))
        })
        && words.iter().any(|w| is_name_word(w))
}

/// The candidate a follow-up refers to, from the last three assistant turns.
///
/// A structured candidate reference on a turn wins; otherwise the first
/// bold (`**Name**`) span that looks like a person name is used.
pub fn extract_name_from_history(history: &[ConversationTurn]) -> Option<String> {
    history
        .iter()
        .rev()
        .filter(|t| t.role == Role::Assistant)
        .take(3)
        .find_map(|turn| {
            if let Some(entity) = &turn.referenced {
                if entity.kind == EntityKind::Candidate {
                    return Some(entity.name.clone());
                }
            }
            BOLD_RE
                .captures_iter(&turn.text)
                .map(|c| c[1].trim().to_string())
                .find(|s| looks_like_name(s))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferencedEntity;

    #[test]
    fn test_extract_email() {
        assert_eq!(
            extract_email("details for priya.sharma@example.com please"),
            Some("priya.sharma@example.com".to_string())
        );
        assert_eq!(
            extract_email("mail a_b+tag@mail.co.in."),
            Some("a_b+tag@mail.co.in".to_string())
        );
        assert_eq!(extract_email("no email here @ all"), None);
    }

    #[test]
    fn test_extract_phone() {
        assert_eq!(extract_phone("call 9876543210"), Some("9876543210".to_string()));
        assert_eq!(extract_phone("+919876543210"), Some("9876543210".to_string()));
        assert_eq!(extract_phone("+91 9876543210 ok"), Some("9876543210".to_string()));
        assert_eq!(extract_phone("1234567890"), None);
        assert_eq!(extract_phone("98765432101234"), None);
    }

    #[test]
    fn test_extract_job_id_uppercases() {
        assert_eq!(extract_job_id("status of job dev101"), Some("DEV101".to_string()));
        assert_eq!(extract_job_id("JAVA2024 opening"), Some("JAVA2024".to_string()));
        assert_eq!(extract_job_id("show me python developers"), None);
    }

    #[test]
    fn test_extract_experience() {
        let f = extract_experience("candidates with more than 5 years").unwrap();
        assert_eq!(f.op, Comparator::Gt);
        assert_eq!(f.value, 5.0);

        let f = extract_experience("people under 2 yrs of experience").unwrap();
        assert_eq!(f.op, Comparator::Lt);

        let f = extract_experience("experience above 7").unwrap();
        assert_eq!((f.value, f.op), (7.0, Comparator::Gt));

        assert!(extract_experience("5 years of python").is_none());
    }

    #[test]
    fn test_extract_salary() {
        let f = extract_salary("expected salary above 12 lpa").unwrap();
        assert_eq!(f.value, 1_200_000.0);
        assert_eq!(f.op, Comparator::Gt);

        let f = extract_salary("salary below 8.5 lakh").unwrap();
        assert_eq!(f.value, 850_000.0);
        assert_eq!(f.op, Comparator::Lt);

        assert!(extract_salary("top 10 listings").is_none());
    }

    #[test]
    fn test_extract_score() {
        let f = extract_score("candidates with score above 80").unwrap();
        assert_eq!((f.value, f.op), (80.0, Comparator::Gt));
        let f = extract_score("score < 40").unwrap();
        assert_eq!((f.value, f.op), (40.0, Comparator::Lt));
        assert!(extract_score("best score").is_none());
    }

    #[test]
    fn test_extract_skill_prefers_longest() {
        assert_eq!(extract_skill("people who know data science"), Some("data science"));
        assert_eq!(extract_skill("any data folks?"), Some("data"));
        assert_eq!(extract_skill("Node.js developers"), Some("node.js"));
        assert_eq!(extract_skill("C++ and Python."), Some("python"));
        assert_eq!(extract_skill("who is selected"), None);
    }

    #[test]
    fn test_extract_job_title() {
        assert_eq!(
            extract_job_title("any full stack developer applicants"),
            Some("full stack developer")
        );
        assert_eq!(extract_job_title("list recruiters"), None);
        assert_eq!(extract_job_title("a recruiter in pune"), Some("recruiter"));
    }

    #[test]
    fn test_extract_requested_count_bounds() {
        assert_eq!(extract_requested_count("top 10 candidates"), Some(10));
        assert_eq!(extract_requested_count("show 15 candidates"), Some(15));
        assert_eq!(extract_requested_count("give me 3"), Some(3));
        assert_eq!(extract_requested_count("top 500"), None);
        assert_eq!(extract_requested_count("top 0 candidates"), None);
        assert_eq!(extract_requested_count("python developers"), None);
    }

    #[test]
    fn test_extract_name_from_query() {
        assert_eq!(
            extract_name_from_query("find candidates similar to Priya Sharma"),
            Some("Priya Sharma".to_string())
        );
        assert_eq!(
            extract_name_from_query("What is Rahul Verma's status"),
            Some("Rahul Verma".to_string())
        );
        assert_eq!(
            extract_name_from_query("Show Priya Sharma"),
            Some("Priya Sharma".to_string())
        );
        assert_eq!(extract_name_from_query("Show Python Candidates"), None);
        assert_eq!(extract_name_from_query("show me candidates"), None);
    }

    #[test]
    fn test_extract_name_from_history_bold() {
        let history = vec![
            ConversationTurn::user("who is the top candidate"),
            ConversationTurn::assistant(
                "**Summary:** the best match is **Anita Desai** with a score of 91.",
            ),
            ConversationTurn::user("what about her status"),
        ];
        assert_eq!(extract_name_from_history(&history), Some("Anita Desai".to_string()));
    }

    #[test]
    fn test_extract_name_from_history_prefers_structured_reference() {
        let history = vec![ConversationTurn::assistant("Found **Someone Else**.").with_reference(
            ReferencedEntity {
                kind: EntityKind::Candidate,
                id: 7,
                name: "Karan Mehta".to_string(),
            },
        )];
        assert_eq!(extract_name_from_history(&history), Some("Karan Mehta".to_string()));
    }

    #[test]
    fn test_extract_name_from_history_only_last_three_assistant_turns() {
        let mut history = vec![ConversationTurn::assistant("**Old Name** was mentioned")];
        for _ in 0..3 {
            history.push(ConversationTurn::assistant("nothing bold here"));
        }
        assert_eq!(extract_name_from_history(&history), None);
    }
}
