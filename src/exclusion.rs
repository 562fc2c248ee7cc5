//! Exclusion predicates applied to diagnostic results.
//!
//! A record survives a check when no predicate excludes it.

use crate::models::validation::{not_negative, percentage, Result};
use crate::models::{
    BloatAware, IndexSizeAware, IndexesAware, PgContext, TableNameAware, TableSizeAware,
};
use std::collections::HashSet;

pub trait ExclusionPredicate<T>: Send + Sync {
    /// Returns `true` when `item` must be removed from the result.
    fn excludes(&self, item: &T) -> bool;
}

/// Keeps the items that no predicate excludes, preserving their order.
pub fn retain_included<T>(items: Vec<T>, predicates: &[&dyn ExclusionPredicate<T>]) -> Vec<T> {
    if predicates.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| !predicates.iter().any(|p| p.excludes(item)))
        .collect()
}

fn enriched_names<'a>(ctx: &PgContext, names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    names
        .into_iter()
        .map(|name| ctx.enrich_with_schema(name).to_lowercase())
        .collect()
}

/// Skips records belonging to any of the given tables.
#[derive(Debug, Clone)]
pub struct SkipTablesByNamePredicate {
    table_names: HashSet<String>,
}

impl SkipTablesByNamePredicate {
    pub fn of<'a>(ctx: &PgContext, table_names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            table_names: enriched_names(ctx, table_names),
        }
    }

    pub fn of_name(ctx: &PgContext, table_name: &str) -> Self {
        Self::of(ctx, [table_name])
    }
}

impl<T: TableNameAware> ExclusionPredicate<T> for SkipTablesByNamePredicate {
    fn excludes(&self, item: &T) -> bool {
        self.table_names
            .contains(&item.table_name().to_lowercase())
    }
}

/// Skips records referring to any of the given indexes. A group of indexes is skipped
/// when at least one of its members matches.
#[derive(Debug, Clone)]
pub struct SkipIndexesByNamePredicate {
    index_names: HashSet<String>,
}

impl SkipIndexesByNamePredicate {
    pub fn of<'a>(ctx: &PgContext, index_names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            index_names: enriched_names(ctx, index_names),
        }
    }

    pub fn of_name(ctx: &PgContext, index_name: &str) -> Self {
        Self::of(ctx, [index_name])
    }
}

impl<T: IndexesAware> ExclusionPredicate<T> for SkipIndexesByNamePredicate {
    fn excludes(&self, item: &T) -> bool {
        item.index_names()
            .iter()
            .any(|name| self.index_names.contains(&name.to_lowercase()))
    }
}

/// Skips indexes smaller than the threshold.
#[derive(Debug, Clone, Copy)]
pub struct SkipSmallIndexesPredicate {
    threshold_in_bytes: i64,
}

impl SkipSmallIndexesPredicate {
    pub fn of(threshold_in_bytes: i64) -> Result<Self> {
        Ok(Self {
            threshold_in_bytes: not_negative(threshold_in_bytes, "threshold_in_bytes")?,
        })
    }
}

impl<T: IndexSizeAware> ExclusionPredicate<T> for SkipSmallIndexesPredicate {
    fn excludes(&self, item: &T) -> bool {
        item.index_size_in_bytes() < self.threshold_in_bytes
    }
}

/// Skips tables smaller than the threshold.
#[derive(Debug, Clone, Copy)]
pub struct SkipSmallTablesPredicate {
    threshold_in_bytes: i64,
}

impl SkipSmallTablesPredicate {
    pub fn of(threshold_in_bytes: i64) -> Result<Self> {
        Ok(Self {
            threshold_in_bytes: not_negative(threshold_in_bytes, "threshold_in_bytes")?,
        })
    }
}

impl<T: TableSizeAware> ExclusionPredicate<T> for SkipSmallTablesPredicate {
    fn excludes(&self, item: &T) -> bool {
        item.table_size_in_bytes() < self.threshold_in_bytes
    }
}

/// Skips objects whose bloat is under either the size or the percentage threshold.
#[derive(Debug, Clone, Copy)]
pub struct SkipBloatUnderThresholdPredicate {
    size_threshold_in_bytes: i64,
    percentage_threshold: f64,
}

impl SkipBloatUnderThresholdPredicate {
    pub fn of(size_threshold_in_bytes: i64, percentage_threshold: f64) -> Result<Self> {
        Ok(Self {
            size_threshold_in_bytes: not_negative(
                size_threshold_in_bytes,
                "size_threshold_in_bytes",
            )?,
            percentage_threshold: percentage(percentage_threshold, "percentage_threshold")?,
        })
    }
}

impl<T: BloatAware> ExclusionPredicate<T> for SkipBloatUnderThresholdPredicate {
    fn excludes(&self, item: &T) -> bool {
        item.bloat_size_in_bytes() < self.size_threshold_in_bytes
            || item.bloat_percentage() < self.percentage_threshold
    }
}
