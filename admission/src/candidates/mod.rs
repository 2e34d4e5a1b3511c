//! Exam candidates and their classroom repartition.
//!
//! A candidate holds at most one repartition. Deleting a candidate removes
//! the repartition with it. Authorization is enforced by the HTTP layer.

pub mod errors;
pub mod models;

pub use errors::{CandidateError, CandidateResult};
pub use models::{Candidate, NewCandidate, NewRepartition, Repartition};

use crate::db::{CandidateRepository, RepartitionRepository};
use std::sync::Arc;
use uuid::Uuid;

/// Candidate manager
#[derive(Clone)]
pub struct CandidateManager {
    candidates: Arc<dyn CandidateRepository>,
    repartitions: Arc<dyn RepartitionRepository>,
}

impl CandidateManager {
    pub fn new(
        candidates: Arc<dyn CandidateRepository>,
        repartitions: Arc<dyn RepartitionRepository>,
    ) -> Self {
        Self {
            candidates,
            repartitions,
        }
    }

    /// All candidates ordered by name
    pub async fn list_candidates(&self) -> CandidateResult<Vec<Candidate>> {
        self.candidates.list().await
    }

    pub async fn get_candidate(&self, id: Uuid) -> CandidateResult<Candidate> {
        self.candidates
            .get(id)
            .await?
            .ok_or(CandidateError::CandidateNotFound(id))
    }

    pub async fn create_candidate(
        &self,
        mut candidate: NewCandidate,
    ) -> CandidateResult<Candidate> {
        candidate.validate()?;
        let created = self.candidates.insert(candidate).await?;
        log::info!("Registered candidate {}", created.id);
        Ok(created)
    }

    /// Replace an existing candidate's profile
    pub async fn update_candidate(&self, mut candidate: Candidate) -> CandidateResult<Candidate> {
        candidate.validate()?;
        if !self.candidates.update(&candidate).await? {
            return Err(CandidateError::CandidateNotFound(candidate.id));
        }
        Ok(candidate)
    }

    /// Delete a candidate together with their repartition
    pub async fn delete_candidate(&self, id: Uuid) -> CandidateResult<()> {
        self.repartitions.delete_for_candidate(id).await?;
        if !self.candidates.delete(id).await? {
            return Err(CandidateError::CandidateNotFound(id));
        }
        log::info!("Deleted candidate {}", id);
        Ok(())
    }

    /// Repartitions ordered by exam date, optionally for one candidate only
    pub async fn list_repartitions(
        &self,
        candidate_id: Option<Uuid>,
    ) -> CandidateResult<Vec<Repartition>> {
        match candidate_id {
            Some(candidate_id) => Ok(self
                .repartitions
                .for_candidate(candidate_id)
                .await?
                .into_iter()
                .collect()),
            None => self.repartitions.list().await,
        }
    }

    pub async fn get_repartition(&self, id: Uuid) -> CandidateResult<Repartition> {
        self.repartitions
            .get(id)
            .await?
            .ok_or(CandidateError::RepartitionNotFound(id))
    }

    /// Assign a candidate to a classroom
    ///
    /// # Errors
    ///
    /// * `CandidateError::CandidateNotFound` - Unknown candidate
    /// * `CandidateError::AlreadyAssigned` - The candidate already has a repartition
    pub async fn assign(&self, mut repartition: NewRepartition) -> CandidateResult<Repartition> {
        repartition.validate()?;
        self.get_candidate(repartition.candidate_id).await?;

        let created = self.repartitions.insert(repartition).await?;
        log::info!(
            "Assigned candidate {} to {} at {}",
            created.candidate_id,
            created.classroom,
            created.exam_date
        );
        Ok(created)
    }

    /// Move an existing repartition to another classroom, time or candidate
    pub async fn update_repartition(
        &self,
        mut repartition: Repartition,
    ) -> CandidateResult<Repartition> {
        repartition.validate()?;
        self.get_candidate(repartition.candidate_id).await?;

        if !self.repartitions.update(&repartition).await? {
            return Err(CandidateError::RepartitionNotFound(repartition.id));
        }
        Ok(repartition)
    }

    pub async fn delete_repartition(&self, id: Uuid) -> CandidateResult<()> {
        if !self.repartitions.delete(id).await? {
            return Err(CandidateError::RepartitionNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryCandidateRepository, MemoryRepartitionRepository};
    use chrono::{Duration, Utc};

    fn manager() -> CandidateManager {
        CandidateManager::new(
            Arc::new(MemoryCandidateRepository::new()),
            Arc::new(MemoryRepartitionRepository::new()),
        )
    }

    fn draft(first_name: &str, last_name: &str) -> NewCandidate {
        NewCandidate {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!("{}@example.com", first_name.to_lowercase()),
            high_school: "Colegiul National Iasi".to_string(),
            exam_subject: "Mathematics".to_string(),
        }
    }

    fn seat(candidate_id: Uuid, classroom: &str) -> NewRepartition {
        NewRepartition {
            candidate_id,
            classroom: classroom.to_string(),
            exam_date: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_candidate_crud() {
        let manager = manager();
        let created = manager.create_candidate(draft("Ana", "Pop")).await.unwrap();
        assert_eq!(manager.get_candidate(created.id).await.unwrap(), created);

        let updated = manager
            .update_candidate(Candidate {
                exam_subject: "Computer Science".to_string(),
                ..created.clone()
            })
            .await
            .unwrap();
        assert_eq!(
            manager.get_candidate(created.id).await.unwrap().exam_subject,
            updated.exam_subject
        );

        manager.delete_candidate(created.id).await.unwrap();
        assert!(matches!(
            manager.get_candidate(created.id).await,
            Err(CandidateError::CandidateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_candidates_listed_by_name() {
        let manager = manager();
        for (first, last) in [("Ion", "Vasile"), ("Ana", "Pop"), ("Dan", "Pop")] {
            manager.create_candidate(draft(first, last)).await.unwrap();
        }

        let names: Vec<String> = manager
            .list_candidates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| format!("{} {}", c.last_name, c.first_name))
            .collect();
        assert_eq!(names, vec!["Pop Ana", "Pop Dan", "Vasile Ion"]);
    }

    #[tokio::test]
    async fn test_one_repartition_per_candidate() {
        let manager = manager();
        let ana = manager.create_candidate(draft("Ana", "Pop")).await.unwrap();

        let seat_a = manager.assign(seat(ana.id, "C112")).await.unwrap();
        assert!(matches!(
            manager.assign(seat(ana.id, "C2")).await,
            Err(CandidateError::AlreadyAssigned(id)) if id == ana.id
        ));

        let listed = manager.list_repartitions(Some(ana.id)).await.unwrap();
        assert_eq!(listed, vec![seat_a]);
    }

    #[tokio::test]
    async fn test_assign_unknown_candidate() {
        let result = manager().assign(seat(Uuid::new_v4(), "C112")).await;
        assert!(matches!(result, Err(CandidateError::CandidateNotFound(_))));
    }

    #[tokio::test]
    async fn test_moving_onto_assigned_candidate_rejected() {
        let manager = manager();
        let ana = manager.create_candidate(draft("Ana", "Pop")).await.unwrap();
        let dan = manager.create_candidate(draft("Dan", "Pop")).await.unwrap();
        manager.assign(seat(ana.id, "C112")).await.unwrap();
        let dans = manager.assign(seat(dan.id, "C2")).await.unwrap();

        let result = manager
            .update_repartition(Repartition {
                candidate_id: ana.id,
                ..dans.clone()
            })
            .await;
        assert!(matches!(result, Err(CandidateError::AlreadyAssigned(_))));

        let moved = manager
            .update_repartition(Repartition {
                classroom: "C309".to_string(),
                ..dans
            })
            .await
            .unwrap();
        assert_eq!(manager.get_repartition(moved.id).await.unwrap().classroom, "C309");
    }

    #[tokio::test]
    async fn test_deleting_candidate_drops_repartition() {
        let manager = manager();
        let ana = manager.create_candidate(draft("Ana", "Pop")).await.unwrap();
        let assigned = manager.assign(seat(ana.id, "C112")).await.unwrap();

        manager.delete_candidate(ana.id).await.unwrap();
        assert!(matches!(
            manager.get_repartition(assigned.id).await,
            Err(CandidateError::RepartitionNotFound(_))
        ));
        assert!(manager.list_repartitions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_repartition() {
        let manager = manager();
        let id = Uuid::new_v4();
        assert!(matches!(
            manager.delete_repartition(id).await,
            Err(CandidateError::RepartitionNotFound(_))
        ));
    }
}
