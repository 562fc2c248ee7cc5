use super::validation::{not_blank, not_negative, percentage, Result};
use super::{BloatAware, DbObject, PgContext, TableNameAware, TableSizeAware};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A table identified by its (possibly schema-qualified) name.
///
/// Two tables are equal when their names are equal; the size is informational.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    table_name: String,
    table_size_in_bytes: i64,
}

impl Table {
    pub fn of(table_name: &str, table_size_in_bytes: i64) -> Result<Self> {
        Ok(Self {
            table_name: not_blank(table_name, "table_name")?,
            table_size_in_bytes: not_negative(table_size_in_bytes, "table_size_in_bytes")?,
        })
    }

    pub fn with_context(ctx: &PgContext, table_name: &str, table_size_in_bytes: i64) -> Result<Self> {
        Self::of(&ctx.enrich_with_schema(table_name), table_size_in_bytes)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.table_name == other.table_name
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table_name.hash(state);
    }
}

impl TableNameAware for Table {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl TableSizeAware for Table {
    fn table_size_in_bytes(&self) -> i64 {
        self.table_size_in_bytes
    }
}

impl DbObject for Table {
    fn name(&self) -> &str {
        &self.table_name
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.table_name, self.table_size_in_bytes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableWithBloat {
    #[serde(flatten)]
    table: Table,
    bloat_size_in_bytes: i64,
    bloat_percentage: f64,
}

impl TableWithBloat {
    pub fn of(
        table: Table,
        bloat_size_in_bytes: i64,
        bloat_percentage: f64,
    ) -> Result<Self> {
        Ok(Self {
            table,
            bloat_size_in_bytes: not_negative(bloat_size_in_bytes, "bloat_size_in_bytes")?,
            bloat_percentage: percentage(bloat_percentage, "bloat_percentage")?,
        })
    }
}

impl PartialEq for TableWithBloat {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl TableNameAware for TableWithBloat {
    fn table_name(&self) -> &str {
        self.table.table_name()
    }
}

impl TableSizeAware for TableWithBloat {
    fn table_size_in_bytes(&self) -> i64 {
        self.table.table_size_in_bytes()
    }
}

impl BloatAware for TableWithBloat {
    fn bloat_size_in_bytes(&self) -> i64 {
        self.bloat_size_in_bytes
    }

    fn bloat_percentage(&self) -> f64 {
        self.bloat_percentage
    }
}

impl DbObject for TableWithBloat {
    fn name(&self) -> &str {
        self.table.name()
    }
}

impl fmt::Display for TableWithBloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, bloat {} bytes ({:.1}%)",
            self.table, self.bloat_size_in_bytes, self.bloat_percentage
        )
    }
}

/// A table read mostly through sequential scans.
#[derive(Debug, Clone, Serialize)]
pub struct TableWithMissingIndex {
    #[serde(flatten)]
    table: Table,
    seq_scans: i64,
    index_scans: i64,
}

impl TableWithMissingIndex {
    pub fn of(table: Table, seq_scans: i64, index_scans: i64) -> Result<Self> {
        Ok(Self {
            table,
            seq_scans: not_negative(seq_scans, "seq_scans")?,
            index_scans: not_negative(index_scans, "index_scans")?,
        })
    }

    pub fn seq_scans(&self) -> i64 {
        self.seq_scans
    }

    pub fn index_scans(&self) -> i64 {
        self.index_scans
    }
}

impl PartialEq for TableWithMissingIndex {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl Eq for TableWithMissingIndex {}

impl TableNameAware for TableWithMissingIndex {
    fn table_name(&self) -> &str {
        self.table.table_name()
    }
}

impl TableSizeAware for TableWithMissingIndex {
    fn table_size_in_bytes(&self) -> i64 {
        self.table.table_size_in_bytes()
    }
}

impl DbObject for TableWithMissingIndex {
    fn name(&self) -> &str {
        self.table.name()
    }
}

impl fmt::Display for TableWithMissingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} seq scans vs {} index scans",
            self.table, self.seq_scans, self.index_scans
        )
    }
}
