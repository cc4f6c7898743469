//! SQLite-backed [`RecruitStore`].
//!
//! Candidate lists are ordered `overall_score DESC` with NULL scores last.
//! Skills are stored as JSON arrays; vectors as little-endian `f32` BLOBs.
//! Vector matching is brute-force cosine similarity over `resume_embeddings`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use recruit_chat_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use recruit_chat_core::models::{
    Candidate, CandidateMatch, Client, ClientContact, ClientWithContacts, Comparator,
    EmbeddingLogEntry, EmbeddingOwner, EmbeddingRecord, Job, JobApplicationCount, NumericColumn,
    NumericFilter, RecruitmentStats, StatusColumn, StatusCount, StatusEntry,
};
use recruit_chat_core::store::{CandidateField, NameMatch, RecruitStore};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::config::Config;
use crate::db;

const CANDIDATE_COLUMNS: &str = "c.id, c.name, c.email, c.phone, c.status, c.interview_result, \
     c.location, c.skills_json, c.experience, c.resume_text, c.overall_score, \
     c.expected_salary, c.applied_job_id";

const JOB_COLUMNS: &str =
    "j.id, j.job_id, j.title, j.status, j.skills_json, j.location, j.client_name, j.description";

const BY_SCORE: &str = "ORDER BY c.overall_score IS NULL, c.overall_score DESC, c.id";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using `[db] path`. The schema must already exist (`rchat init`).
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn candidates_where(
        &self,
        clause: &str,
        binds: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates c WHERE {} {} LIMIT ?",
            CANDIDATE_COLUMNS, clause, BY_SCORE
        );
        let mut query = sqlx::query(&sql);
        for b in binds {
            query = query.bind(b.as_str());
        }
        let rows = query.bind(sql_limit(limit)).fetch_all(&self.pool).await?;
        rows.iter().map(candidate_from_row).collect()
    }

    async fn jobs_where(
        &self,
        clause: &str,
        binds: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs j WHERE {} ORDER BY j.job_id LIMIT ?",
            JOB_COLUMNS, clause
        );
        let mut query = sqlx::query(&sql);
        for b in binds {
            query = query.bind(b.as_str());
        }
        let rows = query.bind(sql_limit(limit)).fetch_all(&self.pool).await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        Ok(sqlx::query_scalar(sql).fetch_one(&self.pool).await?)
    }

    async fn top_jobs(&self) -> Result<Vec<JobApplicationCount>> {
        let rows = sqlx::query(
            r#"
            SELECT j.job_id, j.title, COUNT(c.id) AS applications
            FROM jobs j
            JOIN candidates c ON c.applied_job_id = j.job_id
            GROUP BY j.id
            ORDER BY applications DESC, j.job_id
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| JobApplicationCount {
                job_id: row.get("job_id"),
                title: row.get("title"),
                applications: row.get("applications"),
            })
            .collect())
    }

    async fn status_distribution(&self) -> Result<Vec<StatusCount>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(status, 'Unknown') AS status, COUNT(*) AS count
            FROM candidates
            GROUP BY COALESCE(status, 'Unknown')
            ORDER BY count DESC, status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StatusCount {
                status: row.get("status"),
                count: row.get("count"),
            })
            .collect())
    }
}

/// SQLite treats a negative LIMIT as unbounded.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| n as i64)
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term)
}

fn skills_from_json(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("invalid skills_json: {}", raw))
}

fn candidate_from_row(row: &SqliteRow) -> Result<Candidate> {
    let skills_json: String = row.get("skills_json");
    Ok(Candidate {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        status: row.get("status"),
        interview_result: row.get("interview_result"),
        location: row.get("location"),
        skills: skills_from_json(&skills_json)?,
        experience: row.get("experience"),
        resume_text: row.get("resume_text"),
        overall_score: row.get("overall_score"),
        expected_salary: row.get("expected_salary"),
        applied_job_id: row.get("applied_job_id"),
    })
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let skills_json: String = row.get("skills_json");
    Ok(Job {
        id: row.get("id"),
        job_id: row.get("job_id"),
        title: row.get("title"),
        status: row.get("status"),
        skills: skills_from_json(&skills_json)?,
        location: row.get("location"),
        client_name: row.get("client_name"),
        description: row.get("description"),
    })
}

fn embedding_table(owner: EmbeddingOwner) -> (&'static str, &'static str, i64) {
    match owner {
        EmbeddingOwner::Candidate(id) => ("resume_embeddings", "candidate_id", id),
        EmbeddingOwner::Job(id) => ("job_embeddings", "job_id", id),
    }
}

fn parse_status_column(raw: &str) -> Result<StatusColumn> {
    match raw {
        "status" => Ok(StatusColumn::Status),
        "interview_result" => Ok(StatusColumn::InterviewResult),
        other => bail!("unknown status column in candidate_statuses: {}", other),
    }
}

#[async_trait]
impl RecruitStore for SqliteStore {
    async fn upsert_candidate(&self, c: &Candidate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candidates (id, name, email, phone, status, interview_result, location,
                                    skills_json, experience, resume_text, overall_score,
                                    expected_salary, applied_job_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                status = excluded.status,
                interview_result = excluded.interview_result,
                location = excluded.location,
                skills_json = excluded.skills_json,
                experience = excluded.experience,
                resume_text = excluded.resume_text,
                overall_score = excluded.overall_score,
                expected_salary = excluded.expected_salary,
                applied_job_id = excluded.applied_job_id
            "#,
        )
        .bind(c.id)
        .bind(&c.name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.status)
        .bind(&c.interview_result)
        .bind(&c.location)
        .bind(serde_json::to_string(&c.skills)?)
        .bind(&c.experience)
        .bind(&c.resume_text)
        .bind(c.overall_score)
        .bind(c.expected_salary)
        .bind(&c.applied_job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_job(&self, j: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, job_id, title, status, skills_json, location, client_name,
                              description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                job_id = excluded.job_id,
                title = excluded.title,
                status = excluded.status,
                skills_json = excluded.skills_json,
                location = excluded.location,
                client_name = excluded.client_name,
                description = excluded.description
            "#,
        )
        .bind(j.id)
        .bind(&j.job_id)
        .bind(&j.title)
        .bind(&j.status)
        .bind(serde_json::to_string(&j.skills)?)
        .bind(&j.location)
        .bind(&j.client_name)
        .bind(&j.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, industry, location, status)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                industry = excluded.industry,
                location = excluded.location,
                status = excluded.status
            "#,
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.industry)
        .bind(&client.location)
        .bind(&client.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_contact(&self, contact: &ClientContact) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO client_contacts (id, client_id, name, email, phone, designation)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                designation = excluded.designation
            "#,
        )
        .bind(contact.id)
        .bind(contact.client_id)
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.designation)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "Failed to upsert contact {} (client {})",
                contact.id, contact.client_id
            )
        })?;
        Ok(())
    }

    async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<()> {
        let (table, key, id) = embedding_table(record.owner);
        let sql = format!(
            r#"
            INSERT INTO {table} ({key}, model, dims, embedding, chunk_text, content_hash,
                                 metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT({key}) DO UPDATE SET
                model = excluded.model,
                dims = excluded.dims,
                embedding = excluded.embedding,
                chunk_text = excluded.chunk_text,
                content_hash = excluded.content_hash,
                metadata_json = excluded.metadata_json,
                created_at = excluded.created_at
            "#,
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(&record.model)
            .bind(record.vector.len() as i64)
            .bind(vec_to_blob(&record.vector))
            .bind(&record.chunk_text)
            .bind(&record.content_hash)
            .bind(record.metadata.to_string())
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn top_candidates(&self, limit: usize) -> Result<Vec<Candidate>> {
        self.candidates_where("1 = 1", &[], Some(limit)).await
    }

    async fn candidates_by_email(&self, email: &str) -> Result<Vec<Candidate>> {
        self.candidates_where("c.email = ? COLLATE NOCASE", &[email.to_string()], None)
            .await
    }

    async fn candidates_by_phone(&self, digits: &str) -> Result<Vec<Candidate>> {
        self.candidates_where(
            "REPLACE(REPLACE(c.phone, ' ', ''), '-', '') LIKE ?",
            &[like_pattern(digits)],
            None,
        )
        .await
    }

    async fn candidates_by_applied_job(&self, code: &str) -> Result<Vec<Candidate>> {
        self.candidates_where("c.applied_job_id = ?", &[code.to_string()], None)
            .await
    }

    async fn job_by_code(&self, code: &str) -> Result<Option<Job>> {
        Ok(self
            .jobs_where("j.job_id = ?", &[code.to_string()], Some(1))
            .await?
            .into_iter()
            .next())
    }

    async fn candidates_by_field(
        &self,
        field: CandidateField,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let (clause, bind) = match field {
            CandidateField::Status => ("c.status = ?", value.to_string()),
            CandidateField::InterviewResult => ("c.interview_result = ?", value.to_string()),
            CandidateField::Location => ("c.location LIKE ?", like_pattern(value)),
        };
        self.candidates_where(clause, &[bind], Some(limit)).await
    }

    async fn candidates_by_threshold(
        &self,
        column: NumericColumn,
        filter: NumericFilter,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let column = match column {
            NumericColumn::OverallScore => "c.overall_score",
            NumericColumn::ExpectedSalary => "c.expected_salary",
        };
        let op = match filter.op {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
        };
        let sql = format!(
            "SELECT {} FROM candidates c WHERE {col} IS NOT NULL AND {col} {op} ? {} LIMIT ?",
            CANDIDATE_COLUMNS,
            BY_SCORE,
            col = column,
            op = op,
        );
        let rows = sqlx::query(&sql)
            .bind(filter.value)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(candidate_from_row).collect()
    }

    async fn candidates_by_name(&self, name: &NameMatch, limit: usize) -> Result<Vec<Candidate>> {
        let (words, joiner) = match name {
            NameMatch::Phrase(p) => (vec![p.clone()], " AND "),
            NameMatch::AllOf(words) => (words.clone(), " AND "),
            NameMatch::AnyOf(words) => (words.clone(), " OR "),
        };
        if words.is_empty() {
            return Ok(Vec::new());
        }
        let clause = vec!["c.name LIKE ?"; words.len()].join(joiner);
        let binds: Vec<String> = words.iter().map(|w| like_pattern(w)).collect();
        self.candidates_where(&format!("({})", clause), &binds, Some(limit))
            .await
    }

    async fn candidates_by_text(&self, term: &str, limit: usize) -> Result<Vec<Candidate>> {
        let pattern = like_pattern(term);
        self.candidates_where(
            "(c.skills_json LIKE ? OR c.experience LIKE ? OR c.resume_text LIKE ?)",
            &[pattern.clone(), pattern.clone(), pattern],
            Some(limit),
        )
        .await
    }

    async fn list_jobs(&self, active_only: bool, limit: Option<usize>) -> Result<Vec<Job>> {
        let clause = if active_only {
            "LOWER(j.status) IN ('active', 'open')"
        } else {
            "1 = 1"
        };
        self.jobs_where(clause, &[], limit).await
    }

    async fn jobs_by_location(&self, city: &str, limit: usize) -> Result<Vec<Job>> {
        self.jobs_where("j.location LIKE ?", &[like_pattern(city)], Some(limit))
            .await
    }

    async fn clients_with_contacts(
        &self,
        active_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<ClientWithContacts>> {
        let sql = format!(
            "SELECT id, name, industry, location, status FROM clients {} ORDER BY name LIMIT ?",
            if active_only {
                "WHERE LOWER(status) = 'active'"
            } else {
                ""
            }
        );
        let client_rows = sqlx::query(&sql)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        let contact_rows = sqlx::query(
            "SELECT id, client_id, name, email, phone, designation FROM client_contacts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut contacts: HashMap<i64, Vec<ClientContact>> = HashMap::new();
        for row in &contact_rows {
            let contact = ClientContact {
                id: row.get("id"),
                client_id: row.get("client_id"),
                name: row.get("name"),
                email: row.get("email"),
                phone: row.get("phone"),
                designation: row.get("designation"),
            };
            contacts.entry(contact.client_id).or_default().push(contact);
        }

        Ok(client_rows
            .iter()
            .map(|row| {
                let client = Client {
                    id: row.get("id"),
                    name: row.get("name"),
                    industry: row.get("industry"),
                    location: row.get("location"),
                    status: row.get("status"),
                };
                ClientWithContacts {
                    contacts: contacts.remove(&client.id).unwrap_or_default(),
                    client,
                }
            })
            .collect())
    }

    async fn status_catalog(&self) -> Result<Vec<StatusEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT name, column_name, description
            FROM candidate_statuses
            ORDER BY CASE column_name WHEN 'status' THEN 0 ELSE 1 END, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let column: String = row.get("column_name");
                Ok(StatusEntry {
                    name: row.get("name"),
                    column: parse_status_column(&column)?,
                    description: row.get("description"),
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<RecruitmentStats> {
        let (
            total_candidates,
            total_jobs,
            active_jobs,
            total_clients,
            top_jobs,
            status_distribution,
        ) = tokio::try_join!(
            self.count("SELECT COUNT(*) FROM candidates"),
            self.count("SELECT COUNT(*) FROM jobs"),
            self.count("SELECT COUNT(*) FROM jobs WHERE LOWER(status) IN ('active', 'open')"),
            self.count("SELECT COUNT(*) FROM clients"),
            self.top_jobs(),
            self.status_distribution(),
        )?;

        Ok(RecruitmentStats {
            total_candidates,
            total_jobs,
            active_jobs,
            total_clients,
            top_jobs,
            status_distribution,
        })
    }

    async fn match_candidates(
        &self,
        query: &[f32],
        threshold: f64,
        k: usize,
    ) -> Result<Vec<CandidateMatch>> {
        let sql = format!(
            "SELECT {}, e.embedding FROM resume_embeddings e \
             JOIN candidates c ON c.id = e.candidate_id",
            CANDIDATE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut matches = Vec::new();
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let similarity = cosine_similarity(query, &blob_to_vec(&blob)) as f64;
            if similarity > threshold {
                matches.push(CandidateMatch {
                    candidate: candidate_from_row(row)?,
                    similarity,
                });
            }
        }
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        matches.truncate(k);
        Ok(matches)
    }

    async fn candidate_embedding(&self, candidate_id: i64) -> Result<Option<Vec<f32>>> {
        let blob: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT embedding FROM resume_embeddings WHERE candidate_id = ?")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(blob.map(|b| blob_to_vec(&b)))
    }

    async fn embedding_hash(&self, owner: EmbeddingOwner) -> Result<Option<String>> {
        let (table, key, id) = embedding_table(owner);
        let sql = format!("SELECT content_hash FROM {} WHERE {} = ?", table, key);
        Ok(sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn candidates_without_embeddings(&self) -> Result<Vec<Candidate>> {
        self.candidates_where(
            "NOT EXISTS (SELECT 1 FROM resume_embeddings e WHERE e.candidate_id = c.id)",
            &[],
            None,
        )
        .await
    }

    async fn jobs_without_embeddings(&self) -> Result<Vec<Job>> {
        self.jobs_where(
            "NOT EXISTS (SELECT 1 FROM job_embeddings e WHERE e.job_id = j.id)",
            &[],
            None,
        )
        .await
    }

    async fn append_embedding_log(&self, entry: &EmbeddingLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO embedding_logs (run_id, target, model, total, embedded, skipped, failed,
                                        tokens, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.run_id)
        .bind(&entry.target)
        .bind(&entry.model)
        .bind(entry.total)
        .bind(entry.embedded)
        .bind(entry.skipped)
        .bind(entry.failed)
        .bind(entry.tokens)
        .bind(entry.started_at.timestamp())
        .bind(entry.finished_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
