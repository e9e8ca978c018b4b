//! SQL query constants and builders
//!
//! Contains all SQL queries used by the census.

/// List every base table outside the system catalogs
pub const LIST_BASE_TABLES: &str = r#"
    SELECT table_schema, table_name
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE'
        AND table_schema NOT IN ('pg_catalog', 'information_schema')
    ORDER BY table_schema, table_name
"#;

/// Connectivity check run right after connecting
pub const PING: &str = "SELECT 1";

/// SQL builder for safe identifier quoting
pub struct SqlBuilder;

impl SqlBuilder {
    /// Quote an identifier (schema/table name) safely
    pub fn quote_ident(ident: &str) -> String {
        // PostgreSQL identifier quoting
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Build the row-count query for one table
    pub fn count_rows(schema: &str, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {}.{}",
            Self::quote_ident(schema),
            Self::quote_ident(table)
        )
    }
}
