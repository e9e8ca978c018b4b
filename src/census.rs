//! Table Census
//!
//! Enumerates the user tables of a database and counts the rows in each.
//! Tables are counted one after another; counts are not taken inside one
//! transaction, so under concurrent writes they need not agree with each
//! other.

use crate::error::AppResult;
use crate::snapshot::TableStats;
use tracing::{debug, info};

/// A base table as enumerated from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `"<schema>.<table>"`, the snapshot key
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// The two catalog operations the census needs
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    /// Base tables outside the system schemas, in enumeration order
    async fn list_base_tables(&self) -> AppResult<Vec<TableRef>>;

    async fn count_rows(&self, table: &TableRef) -> AppResult<u64>;
}

/// Opens and releases a `CatalogSource`
#[allow(async_fn_in_trait)]
pub trait CatalogConnector {
    type Source: CatalogSource;

    async fn connect(&self) -> AppResult<Self::Source>;

    /// Release a source returned by `connect`
    fn close(&self, source: Self::Source);
}

/// Row-count collector
pub struct TableCensus;

impl TableCensus {
    /// Count every base table. The first failing query aborts the census and
    /// nothing collected so far is returned.
    pub async fn collect<S: CatalogSource>(source: &S) -> AppResult<TableStats> {
        let tables = source.list_base_tables().await?;
        debug!("Census found {} base tables", tables.len());

        let mut stats = TableStats::new();
        info!("Row count for each table:");
        for table in &tables {
            let row_count = source.count_rows(table).await?;
            info!(
                "Schema: {}, Table: {}, Row Count: {}",
                table.schema, table.name, row_count
            );
            stats.insert(table.qualified_name(), row_count);
        }

        Ok(stats)
    }
}
