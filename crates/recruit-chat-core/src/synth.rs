//! Answer synthesis.
//!
//! Builds the role-tagged prompt (persona, live statistics, recent history,
//! retrieved rows, intent-specific rules) and delegates to a [`ChatModel`].
//! Similar-candidate and job-description match lists are rendered locally
//! with fixed templates instead.

use anyhow::{Context, Result};

use crate::classify::QueryType;
use crate::llm::{ChatMessage, ChatModel, Completion, GenerationParams};
use crate::models::{CandidateMatch, ConversationTurn, RecruitmentStats, Role};
use crate::router::{Retrieval, RetrievalData};

/// Rows serialized into one prompt.
const MAX_PROMPT_ROWS: usize = 25;

/// Skills shown per candidate in the local templates.
const SKILL_PREVIEW: usize = 5;

const PERSONA: &str = "You are RecruitAssist, the in-house assistant of a recruitment agency. \
You answer questions about candidates, job openings, and clients using only the data you are given. \
You are concise, factual, and never invent records.";

const RECRUITMENT_RULES: &str = "Answer the user's question using only the retrieved records below.\n\
- Always write candidate names in bold, like **Priya Sharma**.\n\
- Use a numbered list when there is more than one record.\n\
- Mention score, status, experience, and key skills when they are present.\n\
- If the user asked for a specific number of results, list at most that many.\n\
- Do not mention databases, JSON, or retrieval strategies.";

const NO_RESULTS_NOTE: &str = "No matching records were found for this question. \
Say so plainly in one or two sentences and suggest a more specific search \
(a skill, a status, a location, an email, or a job code). Do not invent candidates.";

/// Everything one synthesized reply depends on.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub query: &'a str,
    pub intent: QueryType,
    pub stats: &'a RecruitmentStats,
    pub history: &'a [ConversationTurn],
    pub retrieval: Option<&'a Retrieval>,
}

pub struct Synthesizer {
    history_window: usize,
}

impl Synthesizer {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Sampling parameters per intent.
    pub fn params_for(intent: QueryType) -> GenerationParams {
        match intent {
            QueryType::Recruitment => GenerationParams {
                temperature: 0.3,
                max_tokens: 1200,
            },
            QueryType::Greeting | QueryType::Help => GenerationParams {
                temperature: 0.7,
                max_tokens: 300,
            },
            QueryType::Unclear | QueryType::OffTopic => GenerationParams {
                temperature: 0.5,
                max_tokens: 200,
            },
        }
    }

    pub fn build_messages(&self, input: &SynthesisInput<'_>) -> Result<Vec<ChatMessage>> {
        let system = format!(
            "{}\n\n{}\n\n{}",
            PERSONA,
            stats_block(input.stats),
            intent_rules(input.intent)
        );

        let mut messages = vec![ChatMessage::system(system)];
        let skip = input.history.len().saturating_sub(self.history_window);
        messages.extend(input.history.iter().skip(skip).map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.text.clone()),
            Role::Assistant => ChatMessage::assistant(turn.text.clone()),
        }));

        let user = match (input.intent, input.retrieval) {
            (QueryType::Recruitment, Some(retrieval)) if !retrieval.is_no_results() => format!(
                "{}\n\nRetrieved {} ({} shown):\n```json\n{}\n```",
                input.query,
                retrieval.data.kind(),
                retrieval.data.len().min(MAX_PROMPT_ROWS),
                serialize_rows(&retrieval.data)?
            ),
            (QueryType::Recruitment, _) => format!("{}\n\n{}", input.query, NO_RESULTS_NOTE),
            _ => input.query.to_string(),
        };
        messages.push(ChatMessage::user(user));
        Ok(messages)
    }

    pub async fn synthesize(
        &self,
        model: &dyn ChatModel,
        input: &SynthesisInput<'_>,
    ) -> Result<Completion> {
        let messages = self.build_messages(input)?;
        let completion = model
            .complete(&messages, Self::params_for(input.intent))
            .await?;
        tracing::debug!(
            model = model.model_name(),
            intent = input.intent.as_str(),
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "synthesized reply"
        );
        Ok(completion)
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(6)
    }
}

fn intent_rules(intent: QueryType) -> &'static str {
    match intent {
        QueryType::Recruitment => RECRUITMENT_RULES,
        QueryType::Greeting => {
            "The user is greeting you. Reply warmly in one or two sentences and offer \
             help with candidates, jobs, or clients."
        }
        QueryType::Help => {
            "The user wants to know what you can do. In a short bulleted list explain that \
             you can search candidates by skill, experience, score, salary, status, or \
             location; look people up by email, phone, or job code; list jobs and clients; \
             find similar candidates; and rank candidates against a job description. \
             End with three example questions."
        }
        QueryType::Unclear => {
            "The message is too short or ambiguous to act on. Ask one brief clarifying \
             question about what the user is looking for."
        }
        QueryType::OffTopic => {
            "The message is unrelated to recruitment. Politely say in one sentence that \
             you only help with recruitment data, then suggest one thing you can do."
        }
    }
}

fn stats_block(stats: &RecruitmentStats) -> String {
    let mut out = format!(
        "Current database overview:\n- Candidates: {}\n- Jobs: {} ({} active)\n- Clients: {}",
        stats.total_candidates, stats.total_jobs, stats.active_jobs, stats.total_clients
    );
    if !stats.top_jobs.is_empty() {
        let jobs: Vec<String> = stats
            .top_jobs
            .iter()
            .map(|j| format!("{} {} ({})", j.job_id, j.title, j.applications))
            .collect();
        out.push_str(&format!("\n- Most applied jobs: {}", jobs.join(", ")));
    }
    if !stats.status_distribution.is_empty() {
        let statuses: Vec<String> = stats
            .status_distribution
            .iter()
            .map(|s| format!("{} {}", s.status, s.count))
            .collect();
        out.push_str(&format!("\n- Candidates by status: {}", statuses.join(", ")));
    }
    out
}

fn head<T>(rows: &[T]) -> &[T] {
    &rows[..rows.len().min(MAX_PROMPT_ROWS)]
}

fn serialize_rows(data: &RetrievalData) -> Result<String> {
    let json = match data {
        RetrievalData::Candidates(v) => serde_json::to_string_pretty(head(v)),
        RetrievalData::Matches(v) => serde_json::to_string_pretty(head(v)),
        RetrievalData::Jobs(v) => serde_json::to_string_pretty(head(v)),
        RetrievalData::Clients(v) => serde_json::to_string_pretty(head(v)),
        RetrievalData::Statuses(v) => serde_json::to_string_pretty(v),
        RetrievalData::NoResults => Ok("[]".to_string()),
    };
    json.context("failed to serialize retrieved rows")
}

/// Follow-up prompts offered alongside a reply.
pub fn suggestions(intent: QueryType, retrieval: Option<&Retrieval>) -> Vec<String> {
    let generic = || {
        vec![
            "Show top 5 candidates".to_string(),
            "Candidates with Python skills".to_string(),
            "List active jobs".to_string(),
        ]
    };
    if intent != QueryType::Recruitment {
        return generic();
    }
    match retrieval.map(|r| &r.data) {
        Some(RetrievalData::Candidates(v)) if !v.is_empty() => vec![
            "What is their interview status?".to_string(),
            format!("Find candidates similar to {}", v[0].name),
            "Show top 5 candidates".to_string(),
        ],
        Some(RetrievalData::Matches(v)) if !v.is_empty() => vec![
            format!("Find candidates similar to {}", v[0].candidate.name),
            "Show top 5 candidates".to_string(),
        ],
        Some(RetrievalData::Jobs(v)) if !v.is_empty() => vec![
            format!("Who applied to {}?", v[0].job_id),
            "Show active jobs".to_string(),
            "List all clients".to_string(),
        ],
        Some(RetrievalData::Clients(_)) => vec![
            "Show active clients".to_string(),
            "List all jobs".to_string(),
        ],
        Some(RetrievalData::Statuses(_)) => vec![
            "Who's in screening?".to_string(),
            "Selected candidates".to_string(),
        ],
        _ => vec![
            "Show top 10 candidates".to_string(),
            "List all jobs".to_string(),
            "What statuses are available?".to_string(),
        ],
    }
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{:.1}", v),
        None => "N/A".to_string(),
    }
}

fn skills_preview(skills: &[String]) -> String {
    if skills.is_empty() {
        return "N/A".to_string();
    }
    let shown = skills
        .iter()
        .take(SKILL_PREVIEW)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if skills.len() > SKILL_PREVIEW {
        format!("{} +{} more", shown, skills.len() - SKILL_PREVIEW)
    } else {
        shown
    }
}

/// Similarity-ranked list of candidates resembling `target`.
pub fn format_similar_candidates(target: &str, matches: &[CandidateMatch]) -> String {
    if matches.is_empty() {
        return format!(
            "I couldn't find any candidates similar to **{}** above the similarity threshold.",
            target
        );
    }
    let mut out = format!("Candidates similar to **{}**:\n", target);
    for (i, m) in matches.iter().enumerate() {
        let c = &m.candidate;
        out.push_str(&format!(
            "\n{}. **{}** ({:.0}% similar)\n   - Score: {} | Experience: {}\n   - Skills: {}\n   - Email: {} | Location: {}\n",
            i + 1,
            c.name,
            m.similarity * 100.0,
            number(c.overall_score),
            c.experience.as_deref().unwrap_or("N/A"),
            skills_preview(&c.skills),
            c.email.as_deref().unwrap_or("N/A"),
            c.location.as_deref().unwrap_or("N/A"),
        ));
    }
    out
}

/// Candidates ranked against a job description.
pub fn format_job_description_matches(matches: &[CandidateMatch]) -> String {
    if matches.is_empty() {
        return "No candidates matched this job description above the similarity threshold."
            .to_string();
    }
    let mut out = String::from("Top matches for this job description:\n");
    for (i, m) in matches.iter().enumerate() {
        let c = &m.candidate;
        out.push_str(&format!(
            "\n{}. **{}** | {} | {:.1}% match | Score: {}",
            i + 1,
            c.name,
            c.email.as_deref().unwrap_or("N/A"),
            m.similarity * 100.0,
            number(c.overall_score),
        ));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::models::{Candidate, JobApplicationCount};

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: 1,
            name: name.to_string(),
            email: Some("priya@example.com".to_string()),
            skills: ["Python", "AWS", "Docker", "SQL", "Kafka", "Airflow"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            experience: Some("6 years".to_string()),
            location: Some("Pune".to_string()),
            overall_score: Some(85.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_recruitment_prompt_carries_rows_and_stats() {
        let stats = RecruitmentStats {
            total_candidates: 12,
            top_jobs: vec![JobApplicationCount {
                job_id: "DEV101".to_string(),
                title: "Backend Developer".to_string(),
                applications: 4,
            }],
            ..Default::default()
        };
        let retrieval = Retrieval {
            strategy: "skill",
            data: RetrievalData::Candidates(vec![candidate("Priya Sharma")]),
        };
        let messages = Synthesizer::default()
            .build_messages(&SynthesisInput {
                query: "candidates with python",
                intent: QueryType::Recruitment,
                stats: &stats,
                history: &[],
                retrieval: Some(&retrieval),
            })
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("Candidates: 12"));
        assert!(messages[0].content.contains("DEV101 Backend Developer (4)"));
        assert!(messages[0].content.contains("**Priya Sharma**"));
        assert!(messages[1].content.contains("\"name\": \"Priya Sharma\""));
    }

    #[test]
    fn test_no_results_prompt() {
        let stats = RecruitmentStats::default();
        let retrieval = Retrieval::no_results();
        let messages = Synthesizer::default()
            .build_messages(&SynthesisInput {
                query: "nobody@example.com",
                intent: QueryType::Recruitment,
                stats: &stats,
                history: &[],
                retrieval: Some(&retrieval),
            })
            .unwrap();
        assert!(messages[1].content.contains("No matching records"));
    }

    #[test]
    fn test_history_window_keeps_last_turns() {
        let stats = RecruitmentStats::default();
        let history: Vec<ConversationTurn> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("q{i}"))
                } else {
                    ConversationTurn::assistant(format!("a{i}"))
                }
            })
            .collect();
        let messages = Synthesizer::new(6)
            .build_messages(&SynthesisInput {
                query: "hello",
                intent: QueryType::Greeting,
                stats: &stats,
                history: &history,
                retrieval: None,
            })
            .unwrap();
        // system + 6 history + current
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[1].content, "q4");
        assert_eq!(messages[7].content, "hello");
    }

    #[test]
    fn test_similar_template() {
        let text = format_similar_candidates(
            "Anita Desai",
            &[CandidateMatch {
                candidate: candidate("Priya Sharma"),
                similarity: 0.874,
            }],
        );
        assert!(text.starts_with("Candidates similar to **Anita Desai**:"));
        assert!(text.contains("1. **Priya Sharma** (87% similar)"));
        assert!(text.contains("Score: 85 | Experience: 6 years"));
        assert!(text.contains("Skills: Python, AWS, Docker, SQL, Kafka +1 more"));
        assert!(text.contains("Email: priya@example.com | Location: Pune"));
        assert!(format_similar_candidates("X", &[]).contains("couldn't find"));
    }

    #[test]
    fn test_job_description_template() {
        let text = format_job_description_matches(&[CandidateMatch {
            candidate: candidate("Priya Sharma"),
            similarity: 0.8234,
        }]);
        assert!(text.contains("1. **Priya Sharma** | priya@example.com | 82.3% match | Score: 85"));
    }

    #[test]
    fn test_suggestions_follow_results() {
        let retrieval = Retrieval {
            strategy: "skill",
            data: RetrievalData::Candidates(vec![candidate("Priya Sharma")]),
        };
        let s = suggestions(QueryType::Recruitment, Some(&retrieval));
        assert!(s.contains(&"Find candidates similar to Priya Sharma".to_string()));
        assert_eq!(suggestions(QueryType::Greeting, None).len(), 3);
    }
}
