use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{SqlValue, ToRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub imie: String,
    pub nazwisko: String,
    pub email: Option<String>,
    pub telefon: Option<String>,
    pub whatsapp: Option<String>,
    pub messenger: Option<String>,
    pub szkola: Option<String>,
    pub klasa: Option<String>,
    pub notatki: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentRequest {
    pub imie: String,
    pub nazwisko: String,
    pub email: Option<String>,
    pub telefon: Option<String>,
    pub whatsapp: Option<String>,
    pub messenger: Option<String>,
    pub szkola: Option<String>,
    pub klasa: Option<String>,
    pub notatki: Option<String>,
}

impl CreateStudentRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.imie.trim().chars().count() < 2 {
            return Err("Imię musi mieć co najmniej 2 znaki".into());
        }
        if self.nazwisko.trim().chars().count() < 2 {
            return Err("Nazwisko musi mieć co najmniej 2 znaki".into());
        }
        if let Some(email) = self.email.as_deref() {
            if !email.is_empty() && !looks_like_email(email) {
                return Err("Nieprawidłowy format adresu email".into());
            }
        }
        Ok(())
    }
}

fn looks_like_email(s: &str) -> bool {
    let mut parts = s.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None)
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    )
}

impl ToRow for CreateStudentRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("imie", self.imie.clone().into()),
            ("nazwisko", self.nazwisko.clone().into()),
            ("email", self.email.clone().into()),
            ("telefon", self.telefon.clone().into()),
            ("whatsapp", self.whatsapp.clone().into()),
            ("messenger", self.messenger.clone().into()),
            ("szkola", self.szkola.clone().into()),
            ("klasa", self.klasa.clone().into()),
            ("notatki", self.notatki.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudentRequest {
    pub imie: Option<String>,
    pub nazwisko: Option<String>,
    pub email: Option<String>,
    pub telefon: Option<String>,
    pub whatsapp: Option<String>,
    pub messenger: Option<String>,
    pub szkola: Option<String>,
    pub klasa: Option<String>,
    pub notatki: Option<String>,
}

impl UpdateStudentRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(imie) = self.imie.as_deref() {
            if imie.trim().chars().count() < 2 {
                return Err("Imię musi mieć co najmniej 2 znaki".into());
            }
        }
        if let Some(nazwisko) = self.nazwisko.as_deref() {
            if nazwisko.trim().chars().count() < 2 {
                return Err("Nazwisko musi mieć co najmniej 2 znaki".into());
            }
        }
        Ok(())
    }
}

impl ToRow for UpdateStudentRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = &self.imie {
            row.push(("imie", v.clone().into()));
        }
        if let Some(v) = &self.nazwisko {
            row.push(("nazwisko", v.clone().into()));
        }
        if let Some(v) = &self.email {
            row.push(("email", v.clone().into()));
        }
        if let Some(v) = &self.telefon {
            row.push(("telefon", v.clone().into()));
        }
        if let Some(v) = &self.whatsapp {
            row.push(("whatsapp", v.clone().into()));
        }
        if let Some(v) = &self.messenger {
            row.push(("messenger", v.clone().into()));
        }
        if let Some(v) = &self.szkola {
            row.push(("szkola", v.clone().into()));
        }
        if let Some(v) = &self.klasa {
            row.push(("klasa", v.clone().into()));
        }
        if let Some(v) = &self.notatki {
            row.push(("notatki", v.clone().into()));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateStudentRequest {
        CreateStudentRequest {
            imie: "Jan".into(),
            nazwisko: "Kowalski".into(),
            email: None,
            telefon: None,
            whatsapp: None,
            messenger: None,
            szkola: None,
            klasa: None,
            notatki: None,
        }
    }

    #[test]
    fn accepts_minimal_student() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn rejects_single_character_names() {
        let mut req = valid_request();
        req.imie = "J".into();
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.nazwisko = " K ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_malformed_email() {
        let mut req = valid_request();
        req.email = Some("not-an-email".into());
        assert!(req.validate().is_err());

        req.email = Some("jan@kowalski.pl".into());
        assert!(req.validate().is_ok());

        // Empty string is treated as "not provided", like the original form.
        req.email = Some(String::new());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn update_row_contains_only_provided_fields() {
        let patch = UpdateStudentRequest {
            szkola: Some("LO III".into()),
            ..Default::default()
        };
        let row = patch.to_row();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].0, "szkola");
    }
}
