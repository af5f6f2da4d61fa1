use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::class::Subject;
use crate::store::{SqlValue, ToRow};

/// Diagnostic assessment (diagnozy) — entry test results for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Diagnostic {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub data_testu: NaiveDate,
    pub narzedzie: Option<String>,
    pub wynik: Option<f64>,
    pub rubric: Option<serde_json::Value>,
    pub wnioski: Option<String>,
    pub cele: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiagnosticRequest {
    pub student_id: Uuid,
    pub subject: Subject,
    pub data_testu: NaiveDate,
    pub narzedzie: Option<String>,
    pub wynik: Option<f64>,
    pub rubric: Option<serde_json::Value>,
    pub wnioski: Option<String>,
    pub cele: Option<String>,
}

impl ToRow for CreateDiagnosticRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("student_id", self.student_id.into()),
            ("subject", self.subject.to_string().into()),
            ("data_testu", self.data_testu.into()),
            ("narzedzie", self.narzedzie.clone().into()),
            ("wynik", self.wynik.into()),
            ("rubric", self.rubric.clone().into()),
            ("wnioski", self.wnioski.clone().into()),
            ("cele", self.cele.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDiagnosticRequest {
    pub subject: Option<Subject>,
    pub data_testu: Option<NaiveDate>,
    pub narzedzie: Option<String>,
    pub wynik: Option<f64>,
    pub rubric: Option<serde_json::Value>,
    pub wnioski: Option<String>,
    pub cele: Option<String>,
}

impl ToRow for UpdateDiagnosticRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = self.subject {
            row.push(("subject", v.to_string().into()));
        }
        if let Some(v) = self.data_testu {
            row.push(("data_testu", v.into()));
        }
        if let Some(v) = &self.narzedzie {
            row.push(("narzedzie", v.clone().into()));
        }
        if let Some(v) = self.wynik {
            row.push(("wynik", v.into()));
        }
        if let Some(v) = &self.rubric {
            row.push(("rubric", v.clone().into()));
        }
        if let Some(v) = &self.wnioski {
            row.push(("wnioski", v.clone().into()));
        }
        if let Some(v) = &self.cele {
            row.push(("cele", v.clone().into()));
        }
        row
    }
}
