//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over database operations,
//! with the default PostgreSQL implementations alongside.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::announcements::{Announcement, AnnouncementResult, NewAnnouncement};
use crate::candidates::{
    Candidate, CandidateError, CandidateResult, NewCandidate, NewRepartition, Repartition,
};
use crate::auth::{AuthError, AuthResult, Claim, CodePurpose, NewUser, User, UserId, UserRecord};

/// Trait for credential store operations
///
/// Emails are stored normalized; callers pass them through
/// [`crate::validation::normalize_email`] first.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user with an unconfirmed email
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailTaken` - Email already registered
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    /// Replace the stored password hash
    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AuthResult<()>;

    /// Mark the user's email as confirmed
    async fn mark_email_confirmed(&self, user_id: UserId) -> AuthResult<()>;

    /// Attach a claim; adding a claim the user already holds is a no-op
    async fn add_claim(&self, user_id: UserId, claim: &Claim) -> AuthResult<()>;

    /// All claims held by the user
    async fn claims(&self, user_id: UserId) -> AuthResult<Vec<Claim>>;

    /// Check the store is reachable
    async fn health_check(&self) -> AuthResult<()>;
}

/// Trait for single-use confirmation/reset code storage
///
/// Only digests of codes are ever handed to a repository.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Store a fresh code, invalidating unconsumed codes of the same purpose
    /// for the same user
    async fn store_code(
        &self,
        user_id: UserId,
        purpose: CodePurpose,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Atomically consume a code
    ///
    /// Returns `true` only for the first caller presenting a live, matching
    /// code; every later or concurrent caller gets `false`.
    async fn consume_code(
        &self,
        user_id: UserId,
        purpose: CodePurpose,
        code_hash: &str,
    ) -> AuthResult<bool>;
}

/// Trait for announcement storage
#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    /// All announcements, newest publish date first
    async fn list(&self) -> AnnouncementResult<Vec<Announcement>>;

    async fn get(&self, id: Uuid) -> AnnouncementResult<Option<Announcement>>;

    async fn insert(&self, announcement: NewAnnouncement) -> AnnouncementResult<Announcement>;

    /// Replace an existing announcement; `false` if it does not exist
    async fn update(&self, announcement: &Announcement) -> AnnouncementResult<bool>;

    /// Delete an announcement; `false` if it does not exist
    async fn delete(&self, id: Uuid) -> AnnouncementResult<bool>;
}

/// Trait for exam candidate storage
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// All candidates ordered by last name, then first name
    async fn list(&self) -> CandidateResult<Vec<Candidate>>;

    async fn get(&self, id: Uuid) -> CandidateResult<Option<Candidate>>;

    async fn insert(&self, candidate: NewCandidate) -> CandidateResult<Candidate>;

    /// Replace an existing candidate; `false` if it does not exist
    async fn update(&self, candidate: &Candidate) -> CandidateResult<bool>;

    /// Delete a candidate; `false` if it does not exist
    async fn delete(&self, id: Uuid) -> CandidateResult<bool>;
}

/// Trait for classroom repartition storage
///
/// At most one repartition exists per candidate; writes that would create a
/// second one fail with `CandidateError::AlreadyAssigned`.
#[async_trait]
pub trait RepartitionRepository: Send + Sync {
    /// All repartitions ordered by exam date, then classroom
    async fn list(&self) -> CandidateResult<Vec<Repartition>>;

    async fn get(&self, id: Uuid) -> CandidateResult<Option<Repartition>>;

    async fn for_candidate(&self, candidate_id: Uuid) -> CandidateResult<Option<Repartition>>;

    async fn insert(&self, repartition: NewRepartition) -> CandidateResult<Repartition>;

    /// Replace an existing repartition; `false` if it does not exist
    async fn update(&self, repartition: &Repartition) -> CandidateResult<bool>;

    /// Delete a repartition; `false` if it does not exist
    async fn delete(&self, id: Uuid) -> CandidateResult<bool>;

    /// Delete whatever repartition the candidate holds
    async fn delete_for_candidate(&self, candidate_id: Uuid) -> CandidateResult<()>;
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, email_confirmed, created_at";

fn user_record_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        user: User {
            id: row.get("id"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email_confirmed: row.get("email_confirmed"),
            created_at: row.get("created_at"),
        },
        password_hash: row.get("password_hash"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User> {
        let result = sqlx::query(&format!(
            "INSERT INTO users (id, email, password_hash, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(user_record_from_row(&row).user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_record_from_row))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_record_from_row))
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AuthResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn mark_email_confirmed(&self, user_id: UserId) -> AuthResult<()> {
        let result = sqlx::query("UPDATE users SET email_confirmed = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn add_claim(&self, user_id: UserId, claim: &Claim) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO user_claims (user_id, claim_type, claim_value)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(&claim.claim_type)
        .bind(&claim.value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claims(&self, user_id: UserId) -> AuthResult<Vec<Claim>> {
        let rows = sqlx::query(
            "SELECT claim_type, claim_value FROM user_claims
             WHERE user_id = $1
             ORDER BY claim_type, claim_value",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Claim::new(r.get::<String, _>("claim_type"), r.get::<String, _>("claim_value")))
            .collect())
    }

    async fn health_check(&self) -> AuthResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Default PostgreSQL implementation of `CodeRepository`
pub struct PgCodeRepository {
    pool: PgPool,
}

impl PgCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeRepository for PgCodeRepository {
    async fn store_code(
        &self,
        user_id: UserId,
        purpose: CodePurpose,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE user_codes SET consumed_at = NOW()
             WHERE user_id = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_codes (user_id, purpose, code_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(code_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn consume_code(
        &self,
        user_id: UserId,
        purpose: CodePurpose,
        code_hash: &str,
    ) -> AuthResult<bool> {
        // Single conditional update: concurrent consumers race on the row lock
        // and only one sees consumed_at IS NULL.
        let row = sqlx::query(
            "UPDATE user_codes SET consumed_at = NOW()
             WHERE user_id = $1 AND purpose = $2 AND code_hash = $3
               AND consumed_at IS NULL AND expires_at > NOW()
             RETURNING id",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}

/// Default PostgreSQL implementation of `AnnouncementRepository`
pub struct PgAnnouncementRepository {
    pool: PgPool,
}

impl PgAnnouncementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn announcement_from_row(row: &PgRow) -> Announcement {
    Announcement {
        id: row.get("id"),
        admin_id: row.get("admin_id"),
        publish_date: row.get("publish_date"),
        title: row.get("title"),
        body: row.get("body"),
    }
}

#[async_trait]
impl AnnouncementRepository for PgAnnouncementRepository {
    async fn list(&self) -> AnnouncementResult<Vec<Announcement>> {
        let rows = sqlx::query(
            "SELECT id, admin_id, publish_date, title, body FROM announcements
             ORDER BY publish_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(announcement_from_row).collect())
    }

    async fn get(&self, id: Uuid) -> AnnouncementResult<Option<Announcement>> {
        let row = sqlx::query(
            "SELECT id, admin_id, publish_date, title, body FROM announcements WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(announcement_from_row))
    }

    async fn insert(&self, announcement: NewAnnouncement) -> AnnouncementResult<Announcement> {
        let row = sqlx::query(
            "INSERT INTO announcements (id, admin_id, publish_date, title, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, admin_id, publish_date, title, body",
        )
        .bind(Uuid::new_v4())
        .bind(&announcement.admin_id)
        .bind(announcement.publish_date)
        .bind(&announcement.title)
        .bind(&announcement.body)
        .fetch_one(&self.pool)
        .await?;

        Ok(announcement_from_row(&row))
    }

    async fn update(&self, announcement: &Announcement) -> AnnouncementResult<bool> {
        let result = sqlx::query(
            "UPDATE announcements
             SET admin_id = $1, publish_date = $2, title = $3, body = $4
             WHERE id = $5",
        )
        .bind(&announcement.admin_id)
        .bind(announcement.publish_date)
        .bind(&announcement.title)
        .bind(&announcement.body)
        .bind(announcement.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> AnnouncementResult<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Default PostgreSQL implementation of `CandidateRepository`
pub struct PgCandidateRepository {
    pool: PgPool,
}

impl PgCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CANDIDATE_COLUMNS: &str =
    "id, first_name, last_name, email, high_school, exam_subject, created_at";

fn candidate_from_row(row: &PgRow) -> Candidate {
    Candidate {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        high_school: row.get("high_school"),
        exam_subject: row.get("exam_subject"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn list(&self) -> CandidateResult<Vec<Candidate>> {
        let rows = sqlx::query(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY last_name, first_name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(candidate_from_row).collect())
    }

    async fn get(&self, id: Uuid) -> CandidateResult<Option<Candidate>> {
        let row = sqlx::query(&format!("SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(candidate_from_row))
    }

    async fn insert(&self, candidate: NewCandidate) -> CandidateResult<Candidate> {
        let row = sqlx::query(&format!(
            "INSERT INTO candidates (id, first_name, last_name, email, high_school, exam_subject)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {CANDIDATE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(&candidate.high_school)
        .bind(&candidate.exam_subject)
        .fetch_one(&self.pool)
        .await?;

        Ok(candidate_from_row(&row))
    }

    async fn update(&self, candidate: &Candidate) -> CandidateResult<bool> {
        let result = sqlx::query(
            "UPDATE candidates
             SET first_name = $1, last_name = $2, email = $3, high_school = $4, exam_subject = $5
             WHERE id = $6",
        )
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(&candidate.high_school)
        .bind(&candidate.exam_subject)
        .bind(candidate.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> CandidateResult<bool> {
        let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Default PostgreSQL implementation of `RepartitionRepository`
pub struct PgRepartitionRepository {
    pool: PgPool,
}

impl PgRepartitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn repartition_from_row(row: &PgRow) -> Repartition {
    Repartition {
        id: row.get("id"),
        candidate_id: row.get("candidate_id"),
        classroom: row.get("classroom"),
        exam_date: row.get("exam_date"),
    }
}

/// Map constraint violations on `repartitions` to domain errors
fn repartition_write_error(err: sqlx::Error, candidate_id: Uuid) -> CandidateError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            CandidateError::AlreadyAssigned(candidate_id)
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            CandidateError::CandidateNotFound(candidate_id)
        }
        other => other.into(),
    }
}

#[async_trait]
impl RepartitionRepository for PgRepartitionRepository {
    async fn list(&self) -> CandidateResult<Vec<Repartition>> {
        let rows = sqlx::query(
            "SELECT id, candidate_id, classroom, exam_date FROM repartitions
             ORDER BY exam_date, classroom, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(repartition_from_row).collect())
    }

    async fn get(&self, id: Uuid) -> CandidateResult<Option<Repartition>> {
        let row = sqlx::query(
            "SELECT id, candidate_id, classroom, exam_date FROM repartitions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(repartition_from_row))
    }

    async fn for_candidate(&self, candidate_id: Uuid) -> CandidateResult<Option<Repartition>> {
        let row = sqlx::query(
            "SELECT id, candidate_id, classroom, exam_date FROM repartitions
             WHERE candidate_id = $1",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(repartition_from_row))
    }

    async fn insert(&self, repartition: NewRepartition) -> CandidateResult<Repartition> {
        let row = sqlx::query(
            "INSERT INTO repartitions (id, candidate_id, classroom, exam_date)
             VALUES ($1, $2, $3, $4)
             RETURNING id, candidate_id, classroom, exam_date",
        )
        .bind(Uuid::new_v4())
        .bind(repartition.candidate_id)
        .bind(&repartition.classroom)
        .bind(repartition.exam_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| repartition_write_error(e, repartition.candidate_id))?;

        Ok(repartition_from_row(&row))
    }

    async fn update(&self, repartition: &Repartition) -> CandidateResult<bool> {
        let result = sqlx::query(
            "UPDATE repartitions SET candidate_id = $1, classroom = $2, exam_date = $3
             WHERE id = $4",
        )
        .bind(repartition.candidate_id)
        .bind(&repartition.classroom)
        .bind(repartition.exam_date)
        .bind(repartition.id)
        .execute(&self.pool)
        .await
        .map_err(|e| repartition_write_error(e, repartition.candidate_id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> CandidateResult<bool> {
        let result = sqlx::query("DELETE FROM repartitions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_candidate(&self, candidate_id: Uuid) -> CandidateResult<()> {
        sqlx::query("DELETE FROM repartitions WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
