// src/models/test_content.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::engine::session::{SectionKind, SectionSource};

/// A registered test: its sections and time budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestContent {
    pub id: Uuid,
    pub title: String,

    /// Time budget for one attempt, in seconds.
    pub duration_seconds: u64,

    pub sections: Vec<SectionSource>,

    /// `sub` claim of the teacher or admin who registered it.
    pub created_by: String,

    pub created_at: DateTime<Utc>,
}

/// Short listing entry for a test.
#[derive(Debug, Serialize)]
pub struct TestSummary {
    pub id: Uuid,
    pub title: String,
    pub duration_seconds: u64,
    pub section_count: usize,
}

impl From<&TestContent> for TestSummary {
    fn from(t: &TestContent) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            duration_seconds: t.duration_seconds,
            section_count: t.sections.len(),
        }
    }
}

/// DTO for registering a test.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Falls back to the configured default when absent.
    #[validate(range(min = 60, max = 14400))]
    pub duration_seconds: Option<u64>,

    #[validate(length(min = 1, max = 10), nested)]
    pub sections: Vec<CreateSectionRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSectionRequest {
    pub kind: SectionKind,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200000))]
    pub html: String,
}
