//! Execution of diagnostics against one host or a whole cluster.

pub mod cluster;
pub mod host;
pub(crate) mod queries;

use crate::connection::PgHost;
use crate::diagnostic::Diagnostic;
use crate::models::ValidationError;
use snafu::Snafu;

pub use cluster::CheckOnCluster;
pub use host::{CheckOnHost, DatabaseCheckOnHost};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CheckError {
    #[snafu(display("Diagnostic {diagnostic} failed on {host}: {source}"))]
    QueryFailed {
        diagnostic: Diagnostic,
        host: PgHost,
        source: sqlx::Error,
    },

    #[snafu(display("Diagnostic {diagnostic} returned an invalid row on {host}: {source}"))]
    InvalidRow {
        diagnostic: Diagnostic,
        host: PgHost,
        source: RowError,
    },

    #[snafu(display("Diagnostic {diagnostic} timed out on {host}"))]
    Timeout {
        diagnostic: Diagnostic,
        host: PgHost,
        source: tokio::time::error::Elapsed,
    },
}

/// Failure to turn one result row into a record.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RowError {
    #[snafu(display("cannot read column '{column}': {source}"))]
    Column {
        column: &'static str,
        source: sqlx::Error,
    },

    #[snafu(display("malformed foreign key column '{value}'"))]
    MalformedColumn { value: String },

    #[snafu(context(false), display("{source}"))]
    Validation { source: ValidationError },
}

pub type Result<T, E = CheckError> = std::result::Result<T, E>;
