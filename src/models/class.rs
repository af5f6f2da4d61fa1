use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{SqlValue, ToRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Matematyka,
    Fizyka,
    Informatyka,
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Subject::Matematyka => "matematyka",
            Subject::Fizyka => "fizyka",
            Subject::Informatyka => "informatyka",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Subject {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "matematyka" => Ok(Subject::Matematyka),
            "fizyka" => Ok(Subject::Fizyka),
            "informatyka" => Ok(Subject::Informatyka),
            _ => Err(anyhow::anyhow!("Unknown subject: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HomeworkStatus {
    Brak,
    Zadane,
    Oddane,
    Poprawa,
}

impl std::fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HomeworkStatus::Brak => "brak",
            HomeworkStatus::Zadane => "zadane",
            HomeworkStatus::Oddane => "oddane",
            HomeworkStatus::Poprawa => "poprawa",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Class {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub temat: Option<String>,
    pub zrozumienie: Option<i32>,
    pub trudnosci: Option<String>,
    pub praca_domowa: Option<String>,
    pub status_pd: String,
}

/// Create payload; `is_recurring` switches the handler into the weekly
/// fan-out path (one insert per week, no rollback on partial failure).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassRequest {
    pub student_id: Uuid,
    pub subject: Subject,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub temat: Option<String>,
    pub zrozumienie: Option<i32>,
    pub trudnosci: Option<String>,
    pub praca_domowa: Option<String>,
    pub status_pd: HomeworkStatus,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_weeks: Option<u32>,
}

impl CreateClassRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(z) = self.zrozumienie {
            if !(1..=5).contains(&z) {
                return Err("Zrozumienie musi być w zakresie 1-5".into());
            }
        }
        if self.is_recurring {
            match self.recurring_weeks {
                Some(w) if (1..=52).contains(&w) => {}
                Some(_) => return Err("Liczba tygodni nie może być większa niż 52".into()),
                None => return Err("Liczba tygodni musi być większa niż 0".into()),
            }
        }
        Ok(())
    }
}

impl ToRow for CreateClassRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("student_id", self.student_id.into()),
            ("subject", self.subject.to_string().into()),
            ("start_at", self.start_at.into()),
            ("end_at", self.end_at.into()),
            ("temat", self.temat.clone().into()),
            ("zrozumienie", self.zrozumienie.into()),
            ("trudnosci", self.trudnosci.clone().into()),
            ("praca_domowa", self.praca_domowa.clone().into()),
            ("status_pd", self.status_pd.to_string().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClassRequest {
    pub subject: Option<Subject>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub temat: Option<String>,
    pub zrozumienie: Option<i32>,
    pub trudnosci: Option<String>,
    pub praca_domowa: Option<String>,
    pub status_pd: Option<HomeworkStatus>,
}

impl UpdateClassRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(z) = self.zrozumienie {
            if !(1..=5).contains(&z) {
                return Err("Zrozumienie musi być w zakresie 1-5".into());
            }
        }
        Ok(())
    }
}

impl ToRow for UpdateClassRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = self.subject {
            row.push(("subject", v.to_string().into()));
        }
        if let Some(v) = self.start_at {
            row.push(("start_at", v.into()));
        }
        if let Some(v) = self.end_at {
            row.push(("end_at", v.into()));
        }
        if let Some(v) = &self.temat {
            row.push(("temat", v.clone().into()));
        }
        if let Some(v) = self.zrozumienie {
            row.push(("zrozumienie", v.into()));
        }
        if let Some(v) = &self.trudnosci {
            row.push(("trudnosci", v.clone().into()));
        }
        if let Some(v) = &self.praca_domowa {
            row.push(("praca_domowa", v.clone().into()));
        }
        if let Some(v) = self.status_pd {
            row.push(("status_pd", v.to_string().into()));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn valid_request() -> CreateClassRequest {
        CreateClassRequest {
            student_id: Uuid::new_v4(),
            subject: Subject::Matematyka,
            start_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            end_at: None,
            temat: None,
            zrozumienie: None,
            trudnosci: None,
            praca_domowa: None,
            status_pd: HomeworkStatus::Brak,
            is_recurring: false,
            recurring_weeks: None,
        }
    }

    #[test]
    fn understanding_rating_must_stay_in_range() {
        let mut req = valid_request();
        req.zrozumienie = Some(3);
        assert!(req.validate().is_ok());
        req.zrozumienie = Some(0);
        assert!(req.validate().is_err());
        req.zrozumienie = Some(6);
        assert!(req.validate().is_err());
    }

    #[test]
    fn recurring_requires_week_count() {
        let mut req = valid_request();
        req.is_recurring = true;
        assert!(req.validate().is_err());
        req.recurring_weeks = Some(4);
        assert!(req.validate().is_ok());
        req.recurring_weeks = Some(53);
        assert!(req.validate().is_err());
    }

    #[test]
    fn subject_and_status_use_wire_strings() {
        assert_eq!(Subject::Informatyka.to_string(), "informatyka");
        assert_eq!(HomeworkStatus::Poprawa.to_string(), "poprawa");
        let s: Subject = serde_json::from_str("\"fizyka\"").unwrap();
        assert_eq!(s, Subject::Fizyka);
    }
}
