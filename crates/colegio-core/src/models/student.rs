//! Student domain model.
//!
//! Students are owned by enrollment; this crate only needs their
//! identity and owning institution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::{InstitutionOwned, InstitutionStamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub institution_id: Uuid,
    /// National identification, normalised with [`normalize_identification`].
    pub identification: String,
    pub given_names: String,
    pub first_surname: String,
    pub second_surname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        [
            self.first_surname.as_str(),
            self.second_surname.as_str(),
            self.given_names.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl InstitutionOwned for Student {
    fn institution_id(&self) -> Uuid {
        self.institution_id
    }
}

/// Fields required to create a student. `institution_id` may be left
/// empty and stamped by the scoped gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudent {
    pub institution_id: Option<Uuid>,
    pub identification: String,
    pub given_names: String,
    pub first_surname: String,
    pub second_surname: String,
}

impl InstitutionStamp for CreateStudent {
    fn institution_id(&self) -> Option<Uuid> {
        self.institution_id
    }

    fn stamp(&mut self, institution_id: Uuid) {
        self.institution_id = Some(institution_id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateStudent {
    pub identification: Option<String>,
    pub given_names: Option<String>,
    pub first_surname: Option<String>,
    pub second_surname: Option<String>,
}

/// Identifications are compared trimmed and upper-cased.
pub fn normalize_identification(raw: &str) -> String {
    raw.trim().to_uppercase()
}
