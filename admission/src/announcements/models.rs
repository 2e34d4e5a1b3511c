//! Announcement data models.

use crate::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted announcement title
pub const MAX_TITLE_LENGTH: usize = 200;

/// A published announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub admin_id: String,
    pub publish_date: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Announcement creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnouncement {
    pub admin_id: String,
    pub publish_date: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

impl NewAnnouncement {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_fields(&mut errors, &self.admin_id, &self.title, &self.body);
        errors.into_result()
    }

    pub fn into_announcement(self, id: Uuid) -> Announcement {
        Announcement {
            id,
            admin_id: self.admin_id,
            publish_date: self.publish_date,
            title: self.title,
            body: self.body,
        }
    }
}

impl Announcement {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_fields(&mut errors, &self.admin_id, &self.title, &self.body);
        errors.into_result()
    }
}

fn check_fields(errors: &mut ValidationErrors, admin_id: &str, title: &str, body: &str) {
    errors.require("admin_id", admin_id);
    errors.require("title", title);
    errors.require("body", body);
    if title.chars().count() > MAX_TITLE_LENGTH {
        errors.add(
            "title",
            format!("Title must be at most {MAX_TITLE_LENGTH} characters"),
        );
    }
}
