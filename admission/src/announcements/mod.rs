//! Announcement management.
//!
//! Thin validation layer over an [`AnnouncementRepository`]; authorization is
//! enforced by the HTTP layer before any of these calls.

pub mod errors;
pub mod models;

pub use errors::{AnnouncementError, AnnouncementResult};
pub use models::{Announcement, NewAnnouncement};

use crate::db::AnnouncementRepository;
use std::sync::Arc;
use uuid::Uuid;

/// Announcement manager
#[derive(Clone)]
pub struct AnnouncementManager {
    repository: Arc<dyn AnnouncementRepository>,
}

impl AnnouncementManager {
    pub fn new(repository: Arc<dyn AnnouncementRepository>) -> Self {
        Self { repository }
    }

    /// All announcements, newest first
    pub async fn list(&self) -> AnnouncementResult<Vec<Announcement>> {
        self.repository.list().await
    }

    /// # Errors
    ///
    /// * `AnnouncementError::NotFound` - No announcement with this id
    pub async fn get(&self, id: Uuid) -> AnnouncementResult<Announcement> {
        self.repository
            .get(id)
            .await?
            .ok_or(AnnouncementError::NotFound(id))
    }

    /// Validate and store a new announcement
    pub async fn create(&self, announcement: NewAnnouncement) -> AnnouncementResult<Announcement> {
        announcement.validate()?;
        let created = self.repository.insert(announcement).await?;
        log::info!("Created announcement {} by {}", created.id, created.admin_id);
        Ok(created)
    }

    /// Validate and replace an existing announcement
    pub async fn update(&self, announcement: Announcement) -> AnnouncementResult<Announcement> {
        announcement.validate()?;
        if !self.repository.update(&announcement).await? {
            return Err(AnnouncementError::NotFound(announcement.id));
        }
        Ok(announcement)
    }

    pub async fn delete(&self, id: Uuid) -> AnnouncementResult<()> {
        if !self.repository.delete(id).await? {
            return Err(AnnouncementError::NotFound(id));
        }
        log::info!("Deleted announcement {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryAnnouncementRepository;
    use chrono::Utc;

    fn manager() -> AnnouncementManager {
        AnnouncementManager::new(Arc::new(MemoryAnnouncementRepository::new()))
    }

    fn draft(title: &str) -> NewAnnouncement {
        NewAnnouncement {
            admin_id: "admin".to_string(),
            publish_date: Utc::now(),
            title: title.to_string(),
            body: "Exam rooms are posted".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let manager = manager();
        let created = manager.create(draft("Rooms")).await.unwrap();
        assert_eq!(manager.get(created.id).await.unwrap(), created);

        let updated = manager
            .update(Announcement {
                title: "Rooms (updated)".to_string(),
                ..created.clone()
            })
            .await
            .unwrap();
        assert_eq!(manager.get(created.id).await.unwrap().title, updated.title);

        manager.delete(created.id).await.unwrap();
        assert!(matches!(
            manager.get(created.id).await,
            Err(AnnouncementError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let result = manager().create(draft("  ")).await;
        assert!(matches!(result, Err(AnnouncementError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_announcement() {
        let manager = manager();
        let id = Uuid::new_v4();
        assert!(matches!(manager.delete(id).await, Err(AnnouncementError::NotFound(_))));

        let ghost = draft("Ghost").into_announcement(id);
        assert!(matches!(manager.update(ghost).await, Err(AnnouncementError::NotFound(_))));
    }
}
