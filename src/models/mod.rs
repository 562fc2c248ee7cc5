//! Immutable records produced by diagnostics.
//!
//! Every record validates its fields on construction. Shared capabilities are exposed
//! as small traits so that exclusion predicates and generators can work across records.

mod column;
mod constraint;
mod context;
mod duplicated;
mod index;
mod table;
pub(crate) mod validation;

pub use column::Column;
pub use constraint::{Constraint, ConstraintType, ForeignKey};
pub use context::{PgContext, DEFAULT_BLOAT_PERCENTAGE_THRESHOLD, DEFAULT_SCHEMA_NAME};
pub use duplicated::{parse_index_name_and_size, DuplicatedIndexes};
pub use index::{Index, IndexWithBloat, IndexWithNulls, IndexWithSize, UnusedIndex};
pub use table::{Table, TableWithBloat, TableWithMissingIndex};
pub use validation::ValidationError;

/// Anything that belongs to a table.
pub trait TableNameAware {
    fn table_name(&self) -> &str;
}

/// Records carrying the physical size of their table.
pub trait TableSizeAware: TableNameAware {
    fn table_size_in_bytes(&self) -> i64;
}

/// Records referring to one or more indexes of a table.
pub trait IndexesAware: TableNameAware {
    fn index_names(&self) -> Vec<&str>;
}

/// Records carrying an index size. Groups of indexes report their total size.
pub trait IndexSizeAware {
    fn index_size_in_bytes(&self) -> i64;
}

pub trait BloatAware {
    fn bloat_size_in_bytes(&self) -> i64;
    fn bloat_percentage(&self) -> f64;
}

/// Records built from an ordered set of table columns.
pub trait ColumnsAware: TableNameAware {
    fn columns(&self) -> &[Column];
}

/// Identity of a record within one database, used to merge results from several hosts.
pub trait DbObject {
    fn name(&self) -> &str;
}
