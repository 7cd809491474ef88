//! Bounded search over sessions, accounts, posts and media.
//!
//! A search combines an optional free-text term with an optional structured
//! filter tree (and/or over column comparisons). Every column reference is
//! validated against a per-table whitelist before it is interpolated into
//! SQL; values are always bound, never interpolated. A reference outside
//! the whitelist is treated as an injection attempt: rejected and logged.

use diesel::sql_types::{BigInt, Double, Nullable, Text};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{DieselError, SqlitePool};

#[derive(Debug, Error)]
pub enum SearchError {
    /// Filter referenced a column outside the whitelist.
    #[error("column {0:?} is not searchable")]
    Injection(String),
    #[error("unsupported filter value")]
    BadValue,
    #[error(transparent)]
    Db(#[from] DieselError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[serde(alias = "archive_sessions")]
    Sessions,
    Accounts,
    Posts,
    Media,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl FilterOp {
    fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Contains => "LIKE",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// Structured filter tree: `{"and": [...]}`, `{"or": [...]}` or a single
/// `{"column": ..., "op": ..., "value": ...}` comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    And {
        and: Vec<FilterNode>,
    },
    Or {
        or: Vec<FilterNode>,
    },
    Cmp {
        column: String,
        op: FilterOp,
        value: serde_json::Value,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search_term: Option<String>,
    pub search_mode: SearchMode,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub filters: Option<FilterNode>,
}

fn default_page_number() -> i64 {
    1
}

fn default_page_size() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub page: String,
    pub id: i64,
    pub title: String,
    pub details: Option<String>,
}

struct TableSpec {
    page: &'static str,
    table: &'static str,
    columns: &'static [&'static str],
    term_clause: &'static str,
    term_binds: usize,
    title: &'static str,
    details: &'static str,
}

const SESSIONS: TableSpec = TableSpec {
    page: "archiving_session",
    table: "archive_sessions",
    columns: &[
        "id",
        "external_id",
        "archive_location",
        "archived_url",
        "archiving_timestamp",
        "archiving_timezone",
        "parsed_version",
        "extracted_version",
        "extraction_error",
        "source_type",
        "metadata",
        "create_date",
        "update_date",
    ],
    term_clause: "(archived_url LIKE ? OR metadata LIKE ?)",
    term_binds: 2,
    title: "external_id",
    details: "archived_url",
};

const ACCOUNTS: TableSpec = TableSpec {
    page: "account",
    table: "accounts",
    columns: &[
        "id",
        "url",
        "platform_id",
        "display_name",
        "bio",
        "notes",
        "create_date",
        "update_date",
    ],
    term_clause: "(url LIKE ? OR display_name LIKE ? OR bio LIKE ?)",
    term_binds: 3,
    title: "url",
    details: "display_name",
};

const POSTS: TableSpec = TableSpec {
    page: "post",
    table: "posts",
    columns: &[
        "id",
        "url",
        "platform_id",
        "account_id",
        "account_url",
        "publication_date",
        "caption",
        "notes",
        "create_date",
        "update_date",
    ],
    term_clause: "(url LIKE ? OR caption LIKE ?)",
    term_binds: 2,
    title: "url",
    details: "caption",
};

const MEDIA: TableSpec = TableSpec {
    page: "media",
    table: "media",
    columns: &[
        "id",
        "url",
        "platform_id",
        "post_id",
        "post_url",
        "local_path",
        "media_type",
        "thumbnail_path",
        "notes",
        "create_date",
        "update_date",
    ],
    term_clause: "(url LIKE ? OR media_type LIKE ?)",
    term_binds: 2,
    title: "url",
    details: "local_path",
};

fn spec_for(mode: SearchMode) -> &'static TableSpec {
    match mode {
        SearchMode::Sessions => &SESSIONS,
        SearchMode::Accounts => &ACCOUNTS,
        SearchMode::Posts => &POSTS,
        SearchMode::Media => &MEDIA,
    }
}

#[derive(Debug, Clone)]
enum BindValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Validate one column reference against the whitelist. Non-alphanumeric
/// characters are rejected outright regardless of the whitelist.
fn validate_column<'a>(spec: &TableSpec, column: &'a str) -> Result<&'a str, SearchError> {
    let shape_ok = !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !shape_ok || !spec.columns.contains(&column) {
        return Err(SearchError::Injection(column.to_string()));
    }
    Ok(column)
}

fn render_filter(
    spec: &TableSpec,
    node: &FilterNode,
    binds: &mut Vec<BindValue>,
) -> Result<String, SearchError> {
    match node {
        FilterNode::And { and } => render_group(spec, and, " AND ", binds),
        FilterNode::Or { or } => render_group(spec, or, " OR ", binds),
        FilterNode::Cmp { column, op, value } => {
            let column = validate_column(spec, column)?;
            let bind = match value {
                serde_json::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        BindValue::Int(i)
                    } else if let Some(f) = n.as_f64() {
                        BindValue::Float(f)
                    } else {
                        return Err(SearchError::BadValue);
                    }
                }
                serde_json::Value::String(s) => match op {
                    FilterOp::Contains => BindValue::Text(format!("%{}%", s)),
                    _ => BindValue::Text(s.clone()),
                },
                serde_json::Value::Bool(b) => BindValue::Int(*b as i64),
                _ => return Err(SearchError::BadValue),
            };
            binds.push(bind);
            Ok(format!("{} {} ?", column, op.sql()))
        }
    }
}

fn render_group(
    spec: &TableSpec,
    nodes: &[FilterNode],
    joiner: &str,
    binds: &mut Vec<BindValue>,
) -> Result<String, SearchError> {
    if nodes.is_empty() {
        return Ok("1=1".to_string());
    }
    let parts: Result<Vec<String>, SearchError> = nodes
        .iter()
        .map(|n| render_filter(spec, n, binds))
        .collect();
    Ok(format!("({})", parts?.join(joiner)))
}

#[derive(diesel::QueryableByName)]
struct SearchRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Nullable<Text>)]
    details: Option<String>,
}

/// Run one search and return the page of results.
pub async fn run_search(
    pool: &SqlitePool,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>, SearchError> {
    let spec = spec_for(query.search_mode);
    let mut binds: Vec<BindValue> = Vec::new();

    let term_clause = match query.search_term.as_deref().filter(|t| !t.is_empty()) {
        Some(term) => {
            let pattern = format!("%{}%", term);
            for _ in 0..spec.term_binds {
                binds.push(BindValue::Text(pattern.clone()));
            }
            spec.term_clause
        }
        None => "1=1",
    };

    let filter_clause = match &query.filters {
        Some(node) => render_filter(spec, node, &mut binds)?,
        None => "1=1".to_string(),
    };

    let page_size = query.page_size.clamp(1, 200);
    let page_number = query.page_number.max(1);
    let sql = format!(
        "SELECT id, {title} AS title, {details} AS details \
         FROM {table} WHERE {term} AND {filter} \
         ORDER BY create_date DESC, id DESC LIMIT ? OFFSET ?",
        title = spec.title,
        details = spec.details,
        table = spec.table,
        term = term_clause,
        filter = filter_clause,
    );

    let mut statement = diesel::sql_query(sql).into_boxed::<diesel::sqlite::Sqlite>();
    for bind in binds {
        statement = match bind {
            BindValue::Int(v) => statement.bind::<BigInt, _>(v),
            BindValue::Float(v) => statement.bind::<Double, _>(v),
            BindValue::Text(v) => statement.bind::<Text, _>(v),
        };
    }
    statement = statement
        .bind::<BigInt, _>(page_size)
        .bind::<BigInt, _>((page_number - 1) * page_size);

    let mut conn = pool.get().await?;
    let rows: Vec<SearchRow> = statement.load(&mut conn).await?;
    Ok(rows
        .into_iter()
        .map(|row| SearchResult {
            page: spec.page.to_string(),
            id: row.id,
            title: row.title,
            details: row.details,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelisted_filter_renders() {
        let mut binds = Vec::new();
        let node: FilterNode = serde_json::from_str(
            r#"{"and": [
                {"column": "caption", "op": "contains", "value": "cat"},
                {"or": [
                    {"column": "account_id", "op": "eq", "value": 3},
                    {"column": "publication_date", "op": "gte", "value": "2025-01-01"}
                ]}
            ]}"#,
        )
        .unwrap();
        let clause = render_filter(&POSTS, &node, &mut binds).unwrap();
        assert_eq!(
            clause,
            "(caption LIKE ? AND (account_id = ? OR publication_date >= ?))"
        );
        assert_eq!(binds.len(), 3);
        assert!(matches!(&binds[0], BindValue::Text(t) if t == "%cat%"));
        assert!(matches!(binds[1], BindValue::Int(3)));
    }

    #[test]
    fn test_unknown_column_is_injection() {
        let mut binds = Vec::new();
        let node = FilterNode::Cmp {
            column: "password_hash".to_string(),
            op: FilterOp::Eq,
            value: serde_json::json!("x"),
        };
        let err = render_filter(&ACCOUNTS, &node, &mut binds).unwrap_err();
        assert!(matches!(err, SearchError::Injection(c) if c == "password_hash"));
    }

    #[test]
    fn test_sneaky_column_is_injection() {
        let mut binds = Vec::new();
        let node = FilterNode::Cmp {
            column: "url; DROP TABLE accounts".to_string(),
            op: FilterOp::Eq,
            value: serde_json::json!("x"),
        };
        assert!(matches!(
            render_filter(&ACCOUNTS, &node, &mut binds),
            Err(SearchError::Injection(_))
        ));
    }

    #[test]
    fn test_filter_tree_deserializes_all_shapes() {
        let cmp: FilterNode =
            serde_json::from_str(r#"{"column": "url", "op": "eq", "value": "x"}"#).unwrap();
        assert!(matches!(cmp, FilterNode::Cmp { .. }));
        let and: FilterNode = serde_json::from_str(r#"{"and": []}"#).unwrap();
        assert!(matches!(and, FilterNode::And { .. }));
        let or: FilterNode = serde_json::from_str(r#"{"or": []}"#).unwrap();
        assert!(matches!(or, FilterNode::Or { .. }));
    }

    #[test]
    fn test_every_whitelist_column_validates() {
        for spec in [&SESSIONS, &ACCOUNTS, &POSTS, &MEDIA] {
            for column in spec.columns {
                assert!(validate_column(spec, column).is_ok());
            }
        }
    }
}
