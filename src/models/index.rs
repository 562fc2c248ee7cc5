use super::validation::{not_blank, not_negative, percentage, Result};
use super::{BloatAware, DbObject, IndexSizeAware, IndexesAware, PgContext, TableNameAware};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An index identified by its table and its own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Index {
    table_name: String,
    index_name: String,
}

impl Index {
    pub fn of(table_name: &str, index_name: &str) -> Result<Self> {
        Ok(Self {
            table_name: not_blank(table_name, "table_name")?,
            index_name: not_blank(index_name, "index_name")?,
        })
    }

    pub fn with_context(ctx: &PgContext, table_name: &str, index_name: &str) -> Result<Self> {
        Self::of(
            &ctx.enrich_with_schema(table_name),
            &ctx.enrich_with_schema(index_name),
        )
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

impl TableNameAware for Index {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl IndexesAware for Index {
    fn index_names(&self) -> Vec<&str> {
        vec![&self.index_name]
    }
}

impl DbObject for Index {
    fn name(&self) -> &str {
        &self.index_name
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.index_name, self.table_name)
    }
}

/// An index together with its size on disk.
///
/// Equality and hashing only consider the index identity.
#[derive(Debug, Clone, Serialize)]
pub struct IndexWithSize {
    #[serde(flatten)]
    index: Index,
    index_size_in_bytes: i64,
}

impl IndexWithSize {
    pub fn of(table_name: &str, index_name: &str, index_size_in_bytes: i64) -> Result<Self> {
        Ok(Self {
            index: Index::of(table_name, index_name)?,
            index_size_in_bytes: not_negative(index_size_in_bytes, "index_size_in_bytes")?,
        })
    }

    pub fn with_context(
        ctx: &PgContext,
        table_name: &str,
        index_name: &str,
        index_size_in_bytes: i64,
    ) -> Result<Self> {
        Self::of(
            &ctx.enrich_with_schema(table_name),
            &ctx.enrich_with_schema(index_name),
            index_size_in_bytes,
        )
    }

    pub fn index_name(&self) -> &str {
        self.index.index_name()
    }

    /// Canonical ordering used for groups of indexes: table, name, then size.
    pub(crate) fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then(self.index_size_in_bytes.cmp(&other.index_size_in_bytes))
    }
}

impl PartialEq for IndexWithSize {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for IndexWithSize {}

impl Hash for IndexWithSize {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl TableNameAware for IndexWithSize {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexesAware for IndexWithSize {
    fn index_names(&self) -> Vec<&str> {
        self.index.index_names()
    }
}

impl IndexSizeAware for IndexWithSize {
    fn index_size_in_bytes(&self) -> i64 {
        self.index_size_in_bytes
    }
}

impl DbObject for IndexWithSize {
    fn name(&self) -> &str {
        self.index.name()
    }
}

impl fmt::Display for IndexWithSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.index, self.index_size_in_bytes)
    }
}

/// A non-unique index over a nullable column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexWithNulls {
    #[serde(flatten)]
    index: IndexWithSize,
    nullable_column: String,
}

impl IndexWithNulls {
    pub fn of(index: IndexWithSize, nullable_column: &str) -> Result<Self> {
        Ok(Self {
            index,
            nullable_column: not_blank(nullable_column, "nullable_column")?,
        })
    }

    pub fn nullable_column(&self) -> &str {
        &self.nullable_column
    }
}

impl TableNameAware for IndexWithNulls {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexesAware for IndexWithNulls {
    fn index_names(&self) -> Vec<&str> {
        self.index.index_names()
    }
}

impl IndexSizeAware for IndexWithNulls {
    fn index_size_in_bytes(&self) -> i64 {
        self.index.index_size_in_bytes()
    }
}

impl DbObject for IndexWithNulls {
    fn name(&self) -> &str {
        self.index.name()
    }
}

impl fmt::Display for IndexWithNulls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, nullable column {}", self.index, self.nullable_column)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexWithBloat {
    #[serde(flatten)]
    index: IndexWithSize,
    bloat_size_in_bytes: i64,
    bloat_percentage: f64,
}

impl IndexWithBloat {
    pub fn of(index: IndexWithSize, bloat_size_in_bytes: i64, bloat_percentage: f64) -> Result<Self> {
        Ok(Self {
            index,
            bloat_size_in_bytes: not_negative(bloat_size_in_bytes, "bloat_size_in_bytes")?,
            bloat_percentage: percentage(bloat_percentage, "bloat_percentage")?,
        })
    }
}

impl PartialEq for IndexWithBloat {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl TableNameAware for IndexWithBloat {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexesAware for IndexWithBloat {
    fn index_names(&self) -> Vec<&str> {
        self.index.index_names()
    }
}

impl IndexSizeAware for IndexWithBloat {
    fn index_size_in_bytes(&self) -> i64 {
        self.index.index_size_in_bytes()
    }
}

impl BloatAware for IndexWithBloat {
    fn bloat_size_in_bytes(&self) -> i64 {
        self.bloat_size_in_bytes
    }

    fn bloat_percentage(&self) -> f64 {
        self.bloat_percentage
    }
}

impl DbObject for IndexWithBloat {
    fn name(&self) -> &str {
        self.index.name()
    }
}

impl fmt::Display for IndexWithBloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, bloat {} bytes ({:.1}%)",
            self.index, self.bloat_size_in_bytes, self.bloat_percentage
        )
    }
}

/// An index that is rarely or never scanned.
#[derive(Debug, Clone, Serialize)]
pub struct UnusedIndex {
    #[serde(flatten)]
    index: IndexWithSize,
    index_scans: i64,
}

impl UnusedIndex {
    pub fn of(index: IndexWithSize, index_scans: i64) -> Result<Self> {
        Ok(Self {
            index,
            index_scans: not_negative(index_scans, "index_scans")?,
        })
    }

    pub fn index_scans(&self) -> i64 {
        self.index_scans
    }
}

impl PartialEq for UnusedIndex {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for UnusedIndex {}

impl TableNameAware for UnusedIndex {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexesAware for UnusedIndex {
    fn index_names(&self) -> Vec<&str> {
        self.index.index_names()
    }
}

impl IndexSizeAware for UnusedIndex {
    fn index_size_in_bytes(&self) -> i64 {
        self.index.index_size_in_bytes()
    }
}

impl DbObject for UnusedIndex {
    fn name(&self) -> &str {
        self.index.name()
    }
}

impl fmt::Display for UnusedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} scans", self.index, self.index_scans)
    }
}
