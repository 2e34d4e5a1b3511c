//! In-memory repository implementations.
//!
//! Used by the test suites and by the server's `--in-memory` dev mode. Each
//! repository serializes writers behind a single lock, which is what makes
//! code consumption atomic here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::repository::{
    AnnouncementRepository, CandidateRepository, CodeRepository, RepartitionRepository,
    UserRepository,
};
use crate::announcements::{Announcement, AnnouncementResult, NewAnnouncement};
use crate::auth::{AuthError, AuthResult, Claim, CodePurpose, NewUser, User, UserId, UserRecord};
use crate::candidates::{
    Candidate, CandidateError, CandidateResult, NewCandidate, NewRepartition, Repartition,
};

#[derive(Default)]
struct UserTables {
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<String, UserId>,
    claims: HashMap<UserId, BTreeSet<Claim>>,
}

/// In-memory credential store
#[derive(Default)]
pub struct MemoryUserRepository {
    tables: RwLock<UserTables>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User> {
        let mut tables = self.tables.write().await;
        if tables.by_email.contains_key(&new_user.email) {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email_confirmed: false,
            created_at: Utc::now(),
        };

        tables.by_email.insert(user.email.clone(), user.id);
        tables.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );
        Ok(user)
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        let record = tables.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        record.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn mark_email_confirmed(&self, user_id: UserId) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        let record = tables.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        record.user.email_confirmed = true;
        Ok(())
    }

    async fn add_claim(&self, user_id: UserId, claim: &Claim) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AuthError::UserNotFound);
        }
        tables
            .claims
            .entry(user_id)
            .or_default()
            .insert(claim.clone());
        Ok(())
    }

    async fn claims(&self, user_id: UserId) -> AuthResult<Vec<Claim>> {
        Ok(self
            .tables
            .read()
            .await
            .claims
            .get(&user_id)
            .map(|claims| claims.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> AuthResult<()> {
        Ok(())
    }
}

struct StoredCode {
    user_id: UserId,
    purpose: CodePurpose,
    code_hash: String,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

/// In-memory single-use code store
#[derive(Default)]
pub struct MemoryCodeRepository {
    codes: Mutex<Vec<StoredCode>>,
}

impl MemoryCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeRepository for MemoryCodeRepository {
    async fn store_code(
        &self,
        user_id: UserId,
        purpose: CodePurpose,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut codes = self.codes.lock().await;
        let now = Utc::now();

        // Drop dead entries, supersede live ones for the same user and purpose
        codes.retain(|code| !code.consumed && code.expires_at > now);
        for code in codes.iter_mut() {
            if code.user_id == user_id && code.purpose == purpose {
                code.consumed = true;
            }
        }

        codes.push(StoredCode {
            user_id,
            purpose,
            code_hash: code_hash.to_string(),
            expires_at,
            consumed: false,
        });
        Ok(())
    }

    async fn consume_code(
        &self,
        user_id: UserId,
        purpose: CodePurpose,
        code_hash: &str,
    ) -> AuthResult<bool> {
        let mut codes = self.codes.lock().await;
        let now = Utc::now();

        let live = codes.iter_mut().find(|code| {
            code.user_id == user_id
                && code.purpose == purpose
                && !code.consumed
                && code.expires_at > now
                && code.code_hash == code_hash
        });

        match live {
            Some(code) => {
                code.consumed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory announcement store
#[derive(Default)]
pub struct MemoryAnnouncementRepository {
    announcements: RwLock<HashMap<Uuid, Announcement>>,
}

impl MemoryAnnouncementRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnnouncementRepository for MemoryAnnouncementRepository {
    async fn list(&self) -> AnnouncementResult<Vec<Announcement>> {
        let mut all: Vec<Announcement> =
            self.announcements.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> AnnouncementResult<Option<Announcement>> {
        Ok(self.announcements.read().await.get(&id).cloned())
    }

    async fn insert(&self, announcement: NewAnnouncement) -> AnnouncementResult<Announcement> {
        let announcement = announcement.into_announcement(Uuid::new_v4());
        self.announcements
            .write()
            .await
            .insert(announcement.id, announcement.clone());
        Ok(announcement)
    }

    async fn update(&self, announcement: &Announcement) -> AnnouncementResult<bool> {
        let mut announcements = self.announcements.write().await;
        match announcements.get_mut(&announcement.id) {
            Some(existing) => {
                *existing = announcement.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AnnouncementResult<bool> {
        Ok(self.announcements.write().await.remove(&id).is_some())
    }
}

/// In-memory candidate store
#[derive(Default)]
pub struct MemoryCandidateRepository {
    candidates: RwLock<HashMap<Uuid, Candidate>>,
}

impl MemoryCandidateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateRepository for MemoryCandidateRepository {
    async fn list(&self) -> CandidateResult<Vec<Candidate>> {
        let mut all: Vec<Candidate> = self.candidates.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> CandidateResult<Option<Candidate>> {
        Ok(self.candidates.read().await.get(&id).cloned())
    }

    async fn insert(&self, candidate: NewCandidate) -> CandidateResult<Candidate> {
        let candidate = candidate.into_candidate(Uuid::new_v4(), Utc::now());
        self.candidates
            .write()
            .await
            .insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn update(&self, candidate: &Candidate) -> CandidateResult<bool> {
        let mut candidates = self.candidates.write().await;
        match candidates.get_mut(&candidate.id) {
            Some(existing) => {
                // Registration time is not editable
                *existing = Candidate {
                    created_at: existing.created_at,
                    ..candidate.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> CandidateResult<bool> {
        Ok(self.candidates.write().await.remove(&id).is_some())
    }
}

/// In-memory repartition store
#[derive(Default)]
pub struct MemoryRepartitionRepository {
    repartitions: RwLock<HashMap<Uuid, Repartition>>,
}

impl MemoryRepartitionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepartitionRepository for MemoryRepartitionRepository {
    async fn list(&self) -> CandidateResult<Vec<Repartition>> {
        let mut all: Vec<Repartition> =
            self.repartitions.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.exam_date, &a.classroom, a.id).cmp(&(b.exam_date, &b.classroom, b.id))
        });
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> CandidateResult<Option<Repartition>> {
        Ok(self.repartitions.read().await.get(&id).cloned())
    }

    async fn for_candidate(&self, candidate_id: Uuid) -> CandidateResult<Option<Repartition>> {
        Ok(self
            .repartitions
            .read()
            .await
            .values()
            .find(|r| r.candidate_id == candidate_id)
            .cloned())
    }

    async fn insert(&self, repartition: NewRepartition) -> CandidateResult<Repartition> {
        let mut repartitions = self.repartitions.write().await;
        if repartitions
            .values()
            .any(|r| r.candidate_id == repartition.candidate_id)
        {
            return Err(CandidateError::AlreadyAssigned(repartition.candidate_id));
        }

        let repartition = repartition.into_repartition(Uuid::new_v4());
        repartitions.insert(repartition.id, repartition.clone());
        Ok(repartition)
    }

    async fn update(&self, repartition: &Repartition) -> CandidateResult<bool> {
        let mut repartitions = self.repartitions.write().await;
        if repartitions
            .values()
            .any(|r| r.candidate_id == repartition.candidate_id && r.id != repartition.id)
        {
            return Err(CandidateError::AlreadyAssigned(repartition.candidate_id));
        }

        match repartitions.get_mut(&repartition.id) {
            Some(existing) => {
                *existing = repartition.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> CandidateResult<bool> {
        Ok(self.repartitions.write().await.remove(&id).is_some())
    }

    async fn delete_for_candidate(&self, candidate_id: Uuid) -> CandidateResult<()> {
        self.repartitions
            .write()
            .await
            .retain(|_, r| r.candidate_id != candidate_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Pop".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = MemoryUserRepository::new();
        repo.create_user(new_user("alice@example.com")).await.unwrap();

        let err = repo.create_user(new_user("alice@example.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_add_claim_is_idempotent() {
        let repo = MemoryUserRepository::new();
        let user = repo.create_user(new_user("alice@example.com")).await.unwrap();

        repo.add_claim(user.id, &Claim::user()).await.unwrap();
        repo.add_claim(user.id, &Claim::user()).await.unwrap();
        assert_eq!(repo.claims(user.id).await.unwrap(), vec![Claim::user()]);
    }

    #[tokio::test]
    async fn test_add_claim_unknown_user() {
        let repo = MemoryUserRepository::new();
        let err = repo.add_claim(Uuid::new_v4(), &Claim::admin()).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn test_code_consumed_once() {
        let repo = MemoryCodeRepository::new();
        let user_id = Uuid::new_v4();
        let expires = Utc::now() + Duration::hours(1);
        repo.store_code(user_id, CodePurpose::PasswordReset, "abc", expires)
            .await
            .unwrap();

        assert!(!repo.consume_code(user_id, CodePurpose::EmailConfirmation, "abc").await.unwrap());
        assert!(repo.consume_code(user_id, CodePurpose::PasswordReset, "abc").await.unwrap());
        assert!(!repo.consume_code(user_id, CodePurpose::PasswordReset, "abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_digest_leaves_code_live() {
        let repo = MemoryCodeRepository::new();
        let user_id = Uuid::new_v4();
        let expires = Utc::now() + Duration::hours(1);
        let digest = crate::auth::codes::hash_code("mailed");
        repo.store_code(user_id, CodePurpose::EmailConfirmation, &digest, expires)
            .await
            .unwrap();

        let wrong = crate::auth::codes::hash_code("guessed");
        assert!(!repo.consume_code(user_id, CodePurpose::EmailConfirmation, &wrong).await.unwrap());
        assert!(repo.consume_code(user_id, CodePurpose::EmailConfirmation, &digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let repo = MemoryCodeRepository::new();
        let user_id = Uuid::new_v4();
        repo.store_code(
            user_id,
            CodePurpose::EmailConfirmation,
            "abc",
            Utc::now() - Duration::seconds(1),
        )
        .await
        .unwrap();

        assert!(!repo.consume_code(user_id, CodePurpose::EmailConfirmation, "abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_new_code_supersedes_old() {
        let repo = MemoryCodeRepository::new();
        let user_id = Uuid::new_v4();
        let expires = Utc::now() + Duration::hours(1);
        repo.store_code(user_id, CodePurpose::PasswordReset, "old", expires).await.unwrap();
        repo.store_code(user_id, CodePurpose::PasswordReset, "new", expires).await.unwrap();

        assert!(!repo.consume_code(user_id, CodePurpose::PasswordReset, "old").await.unwrap());
        assert!(repo.consume_code(user_id, CodePurpose::PasswordReset, "new").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_consumers_single_winner() {
        let repo = Arc::new(MemoryCodeRepository::new());
        let user_id = Uuid::new_v4();
        repo.store_code(
            user_id,
            CodePurpose::EmailConfirmation,
            "abc",
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.consume_code(user_id, CodePurpose::EmailConfirmation, "abc")
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_announcements_listed_newest_first() {
        let repo = MemoryAnnouncementRepository::new();
        let now = Utc::now();
        for (title, offset) in [("old", 2), ("new", 0), ("mid", 1)] {
            repo.insert(NewAnnouncement {
                admin_id: "admin".to_string(),
                publish_date: now - Duration::days(offset),
                title: title.to_string(),
                body: "body".to_string(),
            })
            .await
            .unwrap();
        }

        let titles: Vec<String> = repo.list().await.unwrap().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_concurrent_assignments_single_winner() {
        let repo = Arc::new(MemoryRepartitionRepository::new());
        let candidate_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for room in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.insert(NewRepartition {
                    candidate_id,
                    classroom: format!("C{room}"),
                    exam_date: Utc::now(),
                })
                .await
                .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(repo.for_candidate(candidate_id).await.unwrap().is_some());
    }
}
