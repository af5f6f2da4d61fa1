use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::class::Subject;
use crate::store::{SqlValue, ToRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub wydawnictwo: Option<String>,
    pub tytul: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    pub tytul: String,
    pub wydawnictwo: Option<String>,
    pub url: Option<String>,
}

impl CreateBookRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.tytul.trim().is_empty() {
            return Err("Tytuł jest wymagany".into());
        }
        Ok(())
    }
}

impl ToRow for CreateBookRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("tytul", self.tytul.clone().into()),
            ("wydawnictwo", self.wydawnictwo.clone().into()),
            ("url", self.url.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookRequest {
    pub tytul: Option<String>,
    pub wydawnictwo: Option<String>,
    pub url: Option<String>,
}

impl ToRow for UpdateBookRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = &self.tytul {
            row.push(("tytul", v.clone().into()));
        }
        if let Some(v) = &self.wydawnictwo {
            row.push(("wydawnictwo", v.clone().into()));
        }
        if let Some(v) = &self.url {
            row.push(("url", v.clone().into()));
        }
        row
    }
}

/// Book assigned to a student (uczen_ksiazka junction with its own id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StudentBook {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub student_id: Uuid,
    pub ksiazka_id: Uuid,
    pub subject: Option<String>,
    pub unikalne: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentBookRequest {
    pub student_id: Uuid,
    pub ksiazka_id: Uuid,
    pub subject: Option<Subject>,
    #[serde(default)]
    pub unikalne: bool,
}

impl ToRow for CreateStudentBookRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("student_id", self.student_id.into()),
            ("ksiazka_id", self.ksiazka_id.into()),
            ("subject", self.subject.map(|s| s.to_string()).into()),
            ("unikalne", self.unikalne.into()),
        ]
    }
}
