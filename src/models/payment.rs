use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{SqlValue, ToRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    #[serde(rename = "oczekuje")]
    Oczekuje,
    #[serde(rename = "zapłacone")]
    Zaplacone,
    #[serde(rename = "zaległe")]
    Zalegle,
    #[serde(rename = "anulowane")]
    Anulowane,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Oczekuje => "oczekuje",
            PaymentStatus::Zaplacone => "zapłacone",
            PaymentStatus::Zalegle => "zaległe",
            PaymentStatus::Anulowane => "anulowane",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub student_id: Uuid,
    pub zajecia_id: Option<Uuid>,
    pub data_platnosci: NaiveDate,
    pub kwota: f64,
    pub waluta: String,
    pub metoda: Option<String>,
    pub status: String,
    pub notatki: Option<String>,
    pub invoice_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub student_id: Uuid,
    pub zajecia_id: Option<Uuid>,
    pub data_platnosci: NaiveDate,
    pub kwota: f64,
    pub waluta: Option<String>,
    pub metoda: Option<String>,
    pub status: PaymentStatus,
    pub notatki: Option<String>,
    pub invoice_url: Option<String>,
}

impl CreatePaymentRequest {
    /// The amount is validated here, before any store call; persistence
    /// does not re-check it.
    pub fn validate(&self) -> Result<(), String> {
        if !self.kwota.is_finite() || self.kwota <= 0.0 {
            return Err("Kwota musi być większa od zera".into());
        }
        Ok(())
    }
}

impl ToRow for CreatePaymentRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("student_id", self.student_id.into()),
            ("zajecia_id", self.zajecia_id.into()),
            ("data_platnosci", self.data_platnosci.into()),
            ("kwota", self.kwota.into()),
            (
                "waluta",
                self.waluta.clone().unwrap_or_else(|| "PLN".into()).into(),
            ),
            ("metoda", self.metoda.clone().into()),
            ("status", self.status.to_string().into()),
            ("notatki", self.notatki.clone().into()),
            ("invoice_url", self.invoice_url.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePaymentRequest {
    pub zajecia_id: Option<Uuid>,
    pub data_platnosci: Option<NaiveDate>,
    pub kwota: Option<f64>,
    pub waluta: Option<String>,
    pub metoda: Option<String>,
    pub status: Option<PaymentStatus>,
    pub notatki: Option<String>,
    pub invoice_url: Option<String>,
}

impl UpdatePaymentRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(kwota) = self.kwota {
            if !kwota.is_finite() || kwota <= 0.0 {
                return Err("Kwota musi być większa od zera".into());
            }
        }
        Ok(())
    }
}

impl ToRow for UpdatePaymentRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = self.zajecia_id {
            row.push(("zajecia_id", v.into()));
        }
        if let Some(v) = self.data_platnosci {
            row.push(("data_platnosci", v.into()));
        }
        if let Some(v) = self.kwota {
            row.push(("kwota", v.into()));
        }
        if let Some(v) = &self.waluta {
            row.push(("waluta", v.clone().into()));
        }
        if let Some(v) = &self.metoda {
            row.push(("metoda", v.clone().into()));
        }
        if let Some(v) = self.status {
            row.push(("status", v.to_string().into()));
        }
        if let Some(v) = &self.notatki {
            row.push(("notatki", v.clone().into()));
        }
        if let Some(v) = &self.invoice_url {
            row.push(("invoice_url", v.clone().into()));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            student_id: Uuid::new_v4(),
            zajecia_id: None,
            data_platnosci: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            kwota: 150.0,
            waluta: None,
            metoda: None,
            status: PaymentStatus::Oczekuje,
            notatki: None,
            invoice_url: None,
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let mut req = valid_request();
        req.kwota = -5.0;
        assert!(req.validate().is_err());
        req.kwota = 0.0;
        assert!(req.validate().is_err());
        req.kwota = f64::NAN;
        assert!(req.validate().is_err());
        req.kwota = 0.01;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn currency_defaults_to_pln() {
        let row = valid_request().to_row();
        let waluta = row.iter().find(|(c, _)| *c == "waluta").unwrap();
        assert_eq!(waluta.1, SqlValue::Text(Some("PLN".into())));
    }

    #[test]
    fn status_serde_uses_polish_wire_strings() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Zaplacone).unwrap(),
            "\"zapłacone\""
        );
        let parsed: PaymentStatus = serde_json::from_str("\"zaległe\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Zalegle);
    }

    #[test]
    fn update_amount_is_validated_when_present() {
        let patch = UpdatePaymentRequest {
            kwota: Some(-1.0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        let patch = UpdatePaymentRequest::default();
        assert!(patch.validate().is_ok());
    }
}
