//! Candidate and repartition data models.

use crate::ValidationErrors;
use crate::validation::{check_email, normalize_email};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted classroom label
pub const MAX_CLASSROOM_LENGTH: usize = 64;

/// A person sitting the admission exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub high_school: String,
    /// Subject chosen for the written exam
    pub exam_subject: String,
    pub created_at: DateTime<Utc>,
}

/// Candidate registration by an administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub high_school: String,
    pub exam_subject: String,
}

impl NewCandidate {
    /// Trim names and normalize the email, then check every field
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        normalize_fields(
            &mut errors,
            CandidateFields {
                first_name: &mut self.first_name,
                last_name: &mut self.last_name,
                email: &mut self.email,
                high_school: &mut self.high_school,
                exam_subject: &mut self.exam_subject,
            },
        );
        errors.into_result()
    }

    pub fn into_candidate(self, id: Uuid, created_at: DateTime<Utc>) -> Candidate {
        Candidate {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            high_school: self.high_school,
            exam_subject: self.exam_subject,
            created_at,
        }
    }
}

impl Candidate {
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        normalize_fields(
            &mut errors,
            CandidateFields {
                first_name: &mut self.first_name,
                last_name: &mut self.last_name,
                email: &mut self.email,
                high_school: &mut self.high_school,
                exam_subject: &mut self.exam_subject,
            },
        );
        errors.into_result()
    }
}

struct CandidateFields<'a> {
    first_name: &'a mut String,
    last_name: &'a mut String,
    email: &'a mut String,
    high_school: &'a mut String,
    exam_subject: &'a mut String,
}

fn normalize_fields(errors: &mut ValidationErrors, fields: CandidateFields<'_>) {
    for (name, value) in [
        ("first_name", fields.first_name),
        ("last_name", fields.last_name),
        ("high_school", fields.high_school),
        ("exam_subject", fields.exam_subject),
    ] {
        *value = value.trim().to_string();
        errors.require(name, value);
    }

    *fields.email = normalize_email(fields.email);
    check_email(errors, "email", fields.email);
}

/// Assignment of a candidate to an exam classroom and time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repartition {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub classroom: String,
    pub exam_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepartition {
    pub candidate_id: Uuid,
    pub classroom: String,
    pub exam_date: DateTime<Utc>,
}

impl NewRepartition {
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        check_classroom(&mut self.classroom)
    }

    pub fn into_repartition(self, id: Uuid) -> Repartition {
        Repartition {
            id,
            candidate_id: self.candidate_id,
            classroom: self.classroom,
            exam_date: self.exam_date,
        }
    }
}

impl Repartition {
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        check_classroom(&mut self.classroom)
    }
}

fn check_classroom(classroom: &mut String) -> Result<(), ValidationErrors> {
    *classroom = classroom.trim().to_string();

    let mut errors = ValidationErrors::new();
    errors.require("classroom", classroom);
    if classroom.chars().count() > MAX_CLASSROOM_LENGTH {
        errors.add(
            "classroom",
            format!("Classroom must be at most {MAX_CLASSROOM_LENGTH} characters"),
        );
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewCandidate {
        NewCandidate {
            first_name: "  Ana ".to_string(),
            last_name: "Pop".to_string(),
            email: " Ana.Pop@Example.com".to_string(),
            high_school: "Colegiul National Iasi".to_string(),
            exam_subject: "Mathematics".to_string(),
        }
    }

    #[test]
    fn test_candidate_fields_normalized() {
        let mut candidate = draft();
        candidate.validate().unwrap();
        assert_eq!(candidate.first_name, "Ana");
        assert_eq!(candidate.email, "ana.pop@example.com");
    }

    #[test]
    fn test_candidate_reports_every_invalid_field() {
        let mut candidate = NewCandidate {
            first_name: String::new(),
            email: "not-an-email".to_string(),
            ..draft()
        };
        let errors = candidate.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "first_name"]);
    }

    #[test]
    fn test_classroom_required_and_bounded() {
        let mut repartition = NewRepartition {
            candidate_id: Uuid::new_v4(),
            classroom: "   ".to_string(),
            exam_date: Utc::now(),
        };
        assert!(repartition.validate().is_err());

        repartition.classroom = "C".repeat(MAX_CLASSROOM_LENGTH + 1);
        assert!(repartition.validate().is_err());

        repartition.classroom = " C112 ".to_string();
        repartition.validate().unwrap();
        assert_eq!(repartition.classroom, "C112");
    }
}
