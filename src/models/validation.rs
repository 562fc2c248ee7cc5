use snafu::{ensure, Snafu};

/// Raised when a record or an option is constructed from values that break its invariants.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ValidationError {
    #[snafu(display("{field} cannot be blank"))]
    Blank { field: &'static str },

    #[snafu(display("{field} cannot be less than zero (got {value})"))]
    Negative { field: &'static str, value: i64 },

    #[snafu(display("{field} should be in the range [0.0, 100.0] (got {value})"))]
    PercentageOutOfRange { field: &'static str, value: f64 },

    #[snafu(display("{field} should contain at least two rows (got {count})"))]
    NotEnoughRows { field: &'static str, count: usize },

    #[snafu(display("{field} cannot be empty"))]
    Empty { field: &'static str },

    #[snafu(display(
        "table name is not the same within given rows: expected '{expected}', found '{actual}'"
    ))]
    TableMismatch { expected: String, actual: String },

    #[snafu(display("indentation should be in the range [0, 8] (got {indentation})"))]
    IndentationOutOfRange { indentation: u8 },

    #[snafu(display("cannot parse duplicated indexes from '{input}': {reason}"))]
    MalformedDuplicatedIndexes { input: String, reason: String },

    #[snafu(display("unknown constraint type: '{code}'"))]
    UnknownConstraintType { code: String },
}

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;

pub(crate) fn not_blank(value: impl Into<String>, field: &'static str) -> Result<String> {
    let value = value.into();
    ensure!(!value.trim().is_empty(), BlankSnafu { field });
    Ok(value)
}

pub(crate) fn not_negative(value: i64, field: &'static str) -> Result<i64> {
    ensure!(value >= 0, NegativeSnafu { field, value });
    Ok(value)
}

pub(crate) fn percentage(value: f64, field: &'static str) -> Result<f64> {
    ensure!(
        (0.0..=100.0).contains(&value),
        PercentageOutOfRangeSnafu { field, value }
    );
    Ok(value)
}

/// Fails unless every table name equals the first one.
pub(crate) fn same_table<'a>(mut table_names: impl Iterator<Item = &'a str>) -> Result<()> {
    let Some(expected) = table_names.next() else {
        return Ok(());
    };
    for actual in table_names {
        ensure!(
            actual == expected,
            TableMismatchSnafu {
                expected,
                actual
            }
        );
    }
    Ok(())
}
