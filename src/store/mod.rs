//! Data access layer: one generic repository (`Resource`) configured per
//! table, plus the change-notification hub that live lists and the
//! WebSocket feed hang off.

pub mod live;
pub mod resource;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    book::{Book, StudentBook},
    class::Class,
    diagnostic::Diagnostic,
    link::Link,
    payment::Payment,
    settings::AuthSettings,
    student::Student,
};
use live::ChangeHub;
use resource::{Resource, ResourceConfig};

/// A single bindable SQL parameter. Every variant carries an `Option` so a
/// typed NULL can be sent for any column type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bool(Option<bool>),
    Int(Option<i32>),
    Float(Option<f64>),
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    Json(Option<serde_json::Value>),
    TextArray(Option<Vec<String>>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Bool(v) => v.is_none(),
            SqlValue::Int(v) => v.is_none(),
            SqlValue::Float(v) => v.is_none(),
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Uuid(v) => v.is_none(),
            SqlValue::Date(v) => v.is_none(),
            SqlValue::Timestamp(v) => v.is_none(),
            SqlValue::Json(v) => v.is_none(),
            SqlValue::TextArray(v) => v.is_none(),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(Some(v))
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(v: Option<bool>) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<Option<i32>> for SqlValue {
    fn from(v: Option<i32>) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(Some(v))
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(Some(v))
    }
}

impl From<Option<Uuid>> for SqlValue {
    fn from(v: Option<Uuid>) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(Some(v))
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(Some(v))
    }
}

impl From<Option<serde_json::Value>> for SqlValue {
    fn from(v: Option<serde_json::Value>) -> Self {
        SqlValue::Json(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        SqlValue::TextArray(Some(v))
    }
}

impl From<Option<Vec<String>>> for SqlValue {
    fn from(v: Option<Vec<String>>) -> Self {
        SqlValue::TextArray(v)
    }
}

/// Conversion of a create/update payload into bindable columns. Partial
/// updates emit only the provided fields.
pub trait ToRow: Sync {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)>;
}

/// Equality filters for a list query. A NULL value filters `IS NULL`;
/// a column not present in the map is omitted from the query entirely.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    entries: BTreeMap<&'static str, SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.entries.insert(column, value.into());
        self
    }

    pub fn is_null(mut self, column: &'static str) -> Self {
        self.entries.insert(column, SqlValue::Uuid(None));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderBy {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: &'static str) -> Self {
        Self { column, ascending: true }
    }

    pub fn desc(column: &'static str) -> Self {
        Self { column, ascending: false }
    }
}

/// Localized fallback messages, surfaced when the database gives us
/// nothing better.
#[derive(Debug, Clone, Copy)]
pub struct CrudMessages {
    pub fetch: &'static str,
    pub insert: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

impl Default for CrudMessages {
    fn default() -> Self {
        Self {
            fetch: "Błąd pobierania danych",
            insert: "Błąd dodawania rekordu",
            update: "Błąd aktualizacji rekordu",
            delete: "Błąd usuwania rekordu",
        }
    }
}

/// Tables exposed over the change feed. Maps a client-supplied name onto
/// the static key used by the hub.
pub fn known_table(name: &str) -> Option<&'static str> {
    const TABLES: &[&str] = &[
        "uczniowie",
        "zajecia",
        "platnosci",
        "diagnozy",
        "ksiazki",
        "uczen_ksiazka",
        "linki",
        "auth_settings",
    ];
    TABLES.iter().find(|t| **t == name).copied()
}

/// Every repository the application uses, each one a plain configuration
/// of the generic `Resource` — wiring supplied as data, not code.
pub struct Store {
    pub students: Resource<Student>,
    pub classes: Resource<Class>,
    pub payments: Resource<Payment>,
    pub diagnostics: Resource<Diagnostic>,
    pub books: Resource<Book>,
    pub student_books: Resource<StudentBook>,
    pub links: Resource<Link>,
    pub auth_settings: Resource<AuthSettings>,
}

impl Store {
    pub fn new(pool: PgPool, hub: Arc<ChangeHub>) -> Self {
        Self {
            students: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "uczniowie",
                    order_by: Some(OrderBy::asc("nazwisko")),
                    filter_columns: &["created_by"],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania uczniów",
                        insert: "Błąd dodawania ucznia",
                        update: "Błąd aktualizacji ucznia",
                        delete: "Błąd usuwania ucznia",
                    },
                },
            ),
            classes: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "zajecia",
                    order_by: Some(OrderBy::desc("start_at")),
                    filter_columns: &["student_id"],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania zajęć",
                        insert: "Błąd dodawania zajęć",
                        update: "Błąd aktualizacji zajęć",
                        delete: "Błąd usuwania zajęć",
                    },
                },
            ),
            payments: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "platnosci",
                    order_by: Some(OrderBy::desc("data_platnosci")),
                    filter_columns: &["student_id"],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania płatności",
                        insert: "Błąd dodawania płatności",
                        update: "Błąd aktualizacji płatności",
                        delete: "Błąd usuwania płatności",
                    },
                },
            ),
            diagnostics: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "diagnozy",
                    order_by: Some(OrderBy::desc("data_testu")),
                    filter_columns: &["student_id"],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania diagnoz",
                        insert: "Błąd dodawania diagnozy",
                        update: "Błąd aktualizacji diagnozy",
                        delete: "Błąd usuwania diagnozy",
                    },
                },
            ),
            books: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "ksiazki",
                    order_by: Some(OrderBy::asc("tytul")),
                    filter_columns: &[],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania książek",
                        insert: "Błąd dodawania książki",
                        update: "Błąd aktualizacji książki",
                        delete: "Błąd usuwania książki",
                    },
                },
            ),
            student_books: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "uczen_ksiazka",
                    order_by: Some(OrderBy::desc("created_at")),
                    filter_columns: &["student_id", "ksiazka_id"],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania przypisań książek",
                        insert: "Błąd przypisywania książki",
                        update: "Błąd aktualizacji przypisania",
                        delete: "Błąd usuwania przypisania",
                    },
                },
            ),
            links: Resource::new(
                pool.clone(),
                hub.clone(),
                ResourceConfig {
                    table: "linki",
                    order_by: Some(OrderBy::desc("created_at")),
                    filter_columns: &["owner_type", "owner_id"],
                    auto_created_by: true,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania linków",
                        insert: "Błąd dodawania linku",
                        update: "Błąd aktualizacji linku",
                        delete: "Błąd usuwania linku",
                    },
                },
            ),
            auth_settings: Resource::new(
                pool,
                hub,
                ResourceConfig {
                    table: "auth_settings",
                    order_by: None,
                    filter_columns: &["user_id"],
                    auto_created_by: false,
                    messages: CrudMessages {
                        fetch: "Błąd pobierania ustawień",
                        insert: "Błąd zapisywania ustawień",
                        update: "Błąd aktualizacji ustawień",
                        delete: "Błąd usuwania ustawień",
                    },
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_table_accepts_only_exposed_tables() {
        assert_eq!(known_table("zajecia"), Some("zajecia"));
        assert_eq!(known_table("uczniowie"), Some("uczniowie"));
        assert_eq!(known_table("users"), None);
        assert_eq!(known_table("zajecia; DROP TABLE zajecia"), None);
    }

    #[test]
    fn null_filter_value_is_detected() {
        assert!(SqlValue::Text(None).is_null());
        assert!(SqlValue::from(None::<Uuid>).is_null());
        assert!(!SqlValue::from("x").is_null());
    }
}
