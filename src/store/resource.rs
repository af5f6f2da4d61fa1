//! Generic table repository: filtered/ordered list, get-by-id, insert with
//! creator stamping, partial update, delete. Errors never leave this module
//! as raw driver errors; they are downgraded to localized messages.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::live::{ChangeEvent, ChangeHub, ChangeOp, LiveList, LiveListOptions};
use super::{CrudMessages, Filters, OrderBy, SqlValue, ToRow};
use crate::models::auth::AuthenticatedUser;
use crate::services::metrics;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// Rejected before any query was issued.
    #[error("{0}")]
    Validation(String),
    /// No row matched where one was required.
    #[error("{0}")]
    NotFound(String),
    /// Database failure: a database-reported message is surfaced as-is,
    /// anything else becomes the configured fallback.
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceConfig {
    pub table: &'static str,
    pub order_by: Option<OrderBy>,
    /// Columns a caller may filter on; entries naming any other column
    /// are ignored.
    pub filter_columns: &'static [&'static str],
    /// Stamp `created_by` with the acting user's id on insert. The actor
    /// always wins over a creator present in the payload.
    pub auto_created_by: bool,
    pub messages: CrudMessages,
}

pub struct Resource<T> {
    pool: PgPool,
    hub: Arc<ChangeHub>,
    config: ResourceConfig,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            hub: self.hub.clone(),
            config: self.config,
            _row: PhantomData,
        }
    }
}

macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        match $value {
            SqlValue::Bool(v) => $query.bind(v),
            SqlValue::Int(v) => $query.bind(v),
            SqlValue::Float(v) => $query.bind(v),
            SqlValue::Text(v) => $query.bind(v),
            SqlValue::Uuid(v) => $query.bind(v),
            SqlValue::Date(v) => $query.bind(v),
            SqlValue::Timestamp(v) => $query.bind(v),
            SqlValue::Json(v) => $query.bind(v),
            SqlValue::TextArray(v) => $query.bind(v),
        }
    };
}

impl<T> Resource<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
{
    pub fn new(pool: PgPool, hub: Arc<ChangeHub>, config: ResourceConfig) -> Self {
        Self {
            pool,
            hub,
            config,
            _row: PhantomData,
        }
    }

    /// Fetch the full filtered/ordered list.
    pub async fn list(&self, filters: &Filters) -> Result<Vec<T>, ResourceError> {
        let (sql, params) = build_list_query(&self.config, filters);
        let mut query = sqlx::query_as::<_, T>(&sql);
        for value in params {
            query = bind_value!(query, value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| downgrade(e, self.config.messages.fetch))?;
        metrics::RESOURCE_OPS
            .with_label_values(&[self.config.table, "list"])
            .inc();
        Ok(rows)
    }

    /// Fetch by primary key. A missing row is `None`, not an error.
    pub async fn get(&self, id: Uuid) -> Result<Option<T>, ResourceError> {
        let sql = build_get_query(self.config.table);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| downgrade(e, self.config.messages.fetch))?;
        metrics::RESOURCE_OPS
            .with_label_values(&[self.config.table, "get"])
            .inc();
        Ok(row)
    }

    pub async fn insert(
        &self,
        actor: &AuthenticatedUser,
        row: &dyn ToRow,
    ) -> Result<T, ResourceError> {
        let mut columns = row.to_row();
        if self.config.auto_created_by {
            columns = stamp_creator(columns, actor.user_id);
        }
        if columns.is_empty() {
            return Err(ResourceError::Validation("Brak danych do zapisania".into()));
        }
        let sql = build_insert_query(self.config.table, &columns);
        let mut query = sqlx::query_as::<_, T>(&sql);
        for (_, value) in columns {
            query = bind_value!(query, value);
        }
        let created = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| downgrade(e, self.config.messages.insert))?;
        metrics::RESOURCE_OPS
            .with_label_values(&[self.config.table, "insert"])
            .inc();
        self.publish(ChangeOp::Insert);
        Ok(created)
    }

    /// Partial update by primary key; only the columns present in the
    /// patch are written.
    pub async fn update(&self, id: Uuid, patch: &dyn ToRow) -> Result<T, ResourceError> {
        let columns = patch.to_row();
        if columns.is_empty() {
            return Err(ResourceError::Validation("Brak pól do aktualizacji".into()));
        }
        let sql = build_update_query(self.config.table, &columns);
        let mut query = sqlx::query_as::<_, T>(&sql);
        for (_, value) in columns {
            query = bind_value!(query, value);
        }
        let updated = query
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| downgrade(e, self.config.messages.update))?
            .ok_or_else(|| ResourceError::NotFound("Nie znaleziono rekordu".into()))?;
        metrics::RESOURCE_OPS
            .with_label_values(&[self.config.table, "update"])
            .inc();
        self.publish(ChangeOp::Update);
        Ok(updated)
    }

    /// Delete by primary key. A delete matching zero rows is a success;
    /// only a real deletion notifies watchers.
    pub async fn delete(&self, id: Uuid) -> Result<(), ResourceError> {
        let sql = build_delete_query(self.config.table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| downgrade(e, self.config.messages.delete))?;
        metrics::RESOURCE_OPS
            .with_label_values(&[self.config.table, "delete"])
            .inc();
        if result.rows_affected() > 0 {
            self.publish(ChangeOp::Delete);
        }
        Ok(())
    }

    /// A list that stays current: refetches on every change event for
    /// this table and on manual refresh.
    pub fn watch(&self, filters: Filters, options: LiveListOptions) -> LiveList<T>
    where
        T: Clone + Sync,
    {
        let resource = self.clone();
        LiveList::spawn(&self.hub, self.config.table, options, move || {
            let resource = resource.clone();
            let filters = filters.clone();
            async move { resource.list(&filters).await }
        })
    }

    fn publish(&self, op: ChangeOp) {
        self.hub.publish(ChangeEvent {
            table: self.config.table,
            op,
        });
    }
}

/// The acting user always wins over any `created_by` in the payload.
fn stamp_creator(
    mut columns: Vec<(&'static str, SqlValue)>,
    actor_id: Uuid,
) -> Vec<(&'static str, SqlValue)> {
    columns.retain(|(name, _)| *name != "created_by");
    columns.push(("created_by", SqlValue::from(actor_id)));
    columns
}

fn build_list_query(config: &ResourceConfig, filters: &Filters) -> (String, Vec<SqlValue>) {
    let mut sql = format!("SELECT * FROM {}", config.table);
    let mut params: Vec<SqlValue> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();

    for (column, value) in filters.iter() {
        if !config.filter_columns.contains(&column) {
            continue;
        }
        if value.is_null() {
            clauses.push(format!("{column} IS NULL"));
        } else {
            params.push(value.clone());
            clauses.push(format!("{column} = ${}", params.len()));
        }
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if let Some(order) = &config.order_by {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            order.column,
            if order.ascending { "ASC" } else { "DESC" }
        ));
    }
    (sql, params)
}

fn build_get_query(table: &str) -> String {
    format!("SELECT * FROM {table} WHERE id = $1")
}

fn build_insert_query(table: &str, columns: &[(&'static str, SqlValue)]) -> String {
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING *",
        names.join(", "),
        placeholders.join(", ")
    )
}

fn build_update_query(table: &str, columns: &[(&'static str, SqlValue)]) -> String {
    let sets: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{name} = ${}", i + 1))
        .collect();
    format!(
        "UPDATE {table} SET {} WHERE id = ${} RETURNING *",
        sets.join(", "),
        columns.len() + 1
    )
}

fn build_delete_query(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = $1")
}

fn downgrade(err: sqlx::Error, fallback: &'static str) -> ResourceError {
    match err {
        sqlx::Error::Database(db) => ResourceError::Backend(db.message().to_string()),
        other => {
            tracing::warn!("unexpected store error: {other}");
            ResourceError::Backend(fallback.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResourceConfig {
        ResourceConfig {
            table: "platnosci",
            order_by: Some(OrderBy::desc("data_platnosci")),
            filter_columns: &["student_id", "zajecia_id"],
            auto_created_by: true,
            messages: CrudMessages::default(),
        }
    }

    #[test]
    fn omitted_filter_column_is_absent_from_query() {
        let (sql, params) = build_list_query(&config(), &Filters::new());
        assert_eq!(sql, "SELECT * FROM platnosci ORDER BY data_platnosci DESC");
        assert!(params.is_empty());
    }

    #[test]
    fn null_filter_emits_is_null_not_is_not_null() {
        let filters = Filters::new().is_null("zajecia_id");
        let (sql, params) = build_list_query(&config(), &filters);
        assert_eq!(
            sql,
            "SELECT * FROM platnosci WHERE zajecia_id IS NULL ORDER BY data_platnosci DESC"
        );
        assert!(params.is_empty());
        assert!(!sql.contains("IS NOT NULL"));
    }

    #[test]
    fn concrete_filter_emits_equality_with_placeholder() {
        let id = Uuid::new_v4();
        let filters = Filters::new().eq("student_id", id);
        let (sql, params) = build_list_query(&config(), &filters);
        assert_eq!(
            sql,
            "SELECT * FROM platnosci WHERE student_id = $1 ORDER BY data_platnosci DESC"
        );
        assert_eq!(params, vec![SqlValue::from(id)]);
    }

    #[test]
    fn all_three_filter_shapes_are_distinguishable() {
        let id = Uuid::new_v4();
        // student_id concrete, zajecia_id null, everything else omitted
        let filters = Filters::new().eq("student_id", id).is_null("zajecia_id");
        let (sql, params) = build_list_query(&config(), &filters);
        assert_eq!(
            sql,
            "SELECT * FROM platnosci WHERE student_id = $1 AND zajecia_id IS NULL \
             ORDER BY data_platnosci DESC"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn unconfigured_filter_column_is_ignored() {
        let filters = Filters::new().eq("status", "oczekuje");
        let (sql, params) = build_list_query(&config(), &filters);
        assert!(!sql.contains("status"));
        assert!(params.is_empty());
    }

    #[test]
    fn ascending_order_is_applied() {
        let cfg = ResourceConfig {
            table: "uczniowie",
            order_by: Some(OrderBy::asc("nazwisko")),
            filter_columns: &[],
            auto_created_by: true,
            messages: CrudMessages::default(),
        };
        let (sql, _) = build_list_query(&cfg, &Filters::new());
        assert_eq!(sql, "SELECT * FROM uczniowie ORDER BY nazwisko ASC");
    }

    #[test]
    fn acting_user_wins_over_payload_creator() {
        let intruder = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let columns = vec![
            ("imie", SqlValue::from("Jan")),
            ("created_by", SqlValue::from(intruder)),
        ];
        let stamped = stamp_creator(columns, actor);
        let creators: Vec<_> = stamped
            .iter()
            .filter(|(name, _)| *name == "created_by")
            .collect();
        assert_eq!(creators.len(), 1);
        assert_eq!(creators[0].1, SqlValue::from(actor));
    }

    #[test]
    fn insert_query_lists_columns_and_returns_row() {
        let columns = vec![
            ("imie", SqlValue::from("Jan")),
            ("nazwisko", SqlValue::from("Kowalski")),
            ("created_by", SqlValue::from(Uuid::new_v4())),
        ];
        let sql = build_insert_query("uczniowie", &columns);
        assert_eq!(
            sql,
            "INSERT INTO uczniowie (imie, nazwisko, created_by) VALUES ($1, $2, $3) RETURNING *"
        );
    }

    #[test]
    fn update_query_numbers_the_id_last() {
        let columns = vec![
            ("temat", SqlValue::from("Pochodne")),
            ("zrozumienie", SqlValue::from(4)),
        ];
        let sql = build_update_query("zajecia", &columns);
        assert_eq!(
            sql,
            "UPDATE zajecia SET temat = $1, zrozumienie = $2 WHERE id = $3 RETURNING *"
        );
    }

    #[test]
    fn delete_query_targets_primary_key() {
        assert_eq!(build_delete_query("linki"), "DELETE FROM linki WHERE id = $1");
    }
}
