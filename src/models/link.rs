use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{SqlValue, ToRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Student,
    Class,
    Book,
    Diagnostic,
}

impl std::fmt::Display for OwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OwnerType::Student => "student",
            OwnerType::Class => "class",
            OwnerType::Book => "book",
            OwnerType::Diagnostic => "diagnostic",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Resource,
    Homework,
    Reference,
    External,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkKind::Resource => "resource",
            LinkKind::Homework => "homework",
            LinkKind::Reference => "reference",
            LinkKind::External => "external",
        };
        write!(f, "{s}")
    }
}

/// Generic link attached to a student, class, book or diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub owner_type: String,
    pub owner_id: Option<Uuid>,
    pub kind: String,
    pub url: String,
    pub label: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub owner_type: OwnerType,
    pub owner_id: Option<Uuid>,
    pub kind: LinkKind,
    pub url: String,
    pub label: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CreateLinkRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("Adres URL jest wymagany".into());
        }
        Ok(())
    }
}

impl ToRow for CreateLinkRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("owner_type", self.owner_type.to_string().into()),
            ("owner_id", self.owner_id.into()),
            ("kind", self.kind.to_string().into()),
            ("url", self.url.clone().into()),
            ("label", self.label.clone().into()),
            ("metadata", self.metadata.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLinkRequest {
    pub kind: Option<LinkKind>,
    pub url: Option<String>,
    pub label: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl ToRow for UpdateLinkRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = self.kind {
            row.push(("kind", v.to_string().into()));
        }
        if let Some(v) = &self.url {
            row.push(("url", v.clone().into()));
        }
        if let Some(v) = &self.label {
            row.push(("label", v.clone().into()));
        }
        if let Some(v) = &self.metadata {
            row.push(("metadata", v.clone().into()));
        }
        row
    }
}
