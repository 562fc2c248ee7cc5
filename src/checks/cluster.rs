use super::host::{CheckOnHost, DatabaseCheckOnHost};
use super::Result;
use crate::connection::{HighAvailabilityPgConnection, PgConnection};
use crate::diagnostic::{Diagnostic, ExecutionType};
use crate::exclusion::ExclusionPredicate;
use crate::models::{
    Constraint, DbObject, DuplicatedIndexes, ForeignKey, Index, IndexWithBloat, IndexWithNulls,
    PgContext, Table, TableWithBloat, TableWithMissingIndex, UnusedIndex,
};
use futures::future::try_join_all;
use std::collections::HashSet;
use tracing::{debug, info};

/// A diagnostic bound to every host of a cluster.
///
/// Static diagnostics only look at the primary. Runtime diagnostics query all hosts
/// and report each object once, keeping the first occurrence in host order.
pub struct CheckOnCluster<T> {
    diagnostic: Diagnostic,
    checks: Vec<Box<dyn DatabaseCheckOnHost<T>>>,
}

impl<T> CheckOnCluster<T>
where
    T: DbObject + Send + 'static,
{
    /// Builds one host check per connection, primary first.
    pub fn new<F>(cluster: &HighAvailabilityPgConnection, factory: F) -> Self
    where
        F: Fn(&PgConnection) -> Box<dyn DatabaseCheckOnHost<T>>,
    {
        let checks = cluster
            .connections_to_all_hosts()
            .iter()
            .map(factory)
            .collect();
        Self::from_host_checks(checks)
    }

    /// `checks` must be non-empty and start with the check on the primary.
    pub(crate) fn from_host_checks(checks: Vec<Box<dyn DatabaseCheckOnHost<T>>>) -> Self {
        debug_assert!(!checks.is_empty());
        let diagnostic = checks[0].diagnostic();
        Self { diagnostic, checks }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        self.diagnostic
    }

    pub async fn check(
        &self,
        ctx: &PgContext,
        exclusions: &[&dyn ExclusionPredicate<T>],
    ) -> Result<Vec<T>> {
        let Some(primary) = self.checks.first() else {
            return Ok(Vec::new());
        };

        match self.diagnostic.execution_type() {
            ExecutionType::Static => {
                info!(
                    "Running {} on primary {}",
                    self.diagnostic,
                    primary.host()
                );
                primary.check(ctx, exclusions).await
            }
            ExecutionType::Runtime => {
                info!(
                    "Running {} on {} hosts",
                    self.diagnostic,
                    self.checks.len()
                );
                let per_host =
                    try_join_all(self.checks.iter().map(|check| check.check(ctx, exclusions)))
                        .await?;
                let merged = merge_by_identity(per_host);
                debug!("{} found {} objects across cluster", self.diagnostic, merged.len());
                Ok(merged)
            }
        }
    }
}

/// Union of per-host results in host order, one record per object name.
fn merge_by_identity<T: DbObject>(per_host: Vec<Vec<T>>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for record in per_host.into_iter().flatten() {
        if seen.insert(record.name().to_string()) {
            merged.push(record);
        }
    }
    merged
}

fn boxed<T: Send + 'static>(check: CheckOnHost<T>) -> Box<dyn DatabaseCheckOnHost<T>> {
    Box::new(check)
}

impl CheckOnCluster<Index> {
    pub fn invalid_indexes(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::invalid_indexes(c.clone())))
    }
}

impl CheckOnCluster<DuplicatedIndexes> {
    pub fn duplicated_indexes(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::duplicated_indexes(c.clone())))
    }

    pub fn intersected_indexes(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::intersected_indexes(c.clone())))
    }
}

impl CheckOnCluster<UnusedIndex> {
    pub fn unused_indexes(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::unused_indexes(c.clone())))
    }
}

impl CheckOnCluster<ForeignKey> {
    pub fn foreign_keys_without_index(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| {
            boxed(CheckOnHost::foreign_keys_without_index(c.clone()))
        })
    }
}

impl CheckOnCluster<TableWithMissingIndex> {
    pub fn tables_with_missing_indexes(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| {
            boxed(CheckOnHost::tables_with_missing_indexes(c.clone()))
        })
    }
}

impl CheckOnCluster<Table> {
    pub fn tables_without_primary_key(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| {
            boxed(CheckOnHost::tables_without_primary_key(c.clone()))
        })
    }
}

impl CheckOnCluster<IndexWithNulls> {
    pub fn indexes_with_null_values(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| {
            boxed(CheckOnHost::indexes_with_null_values(c.clone()))
        })
    }
}

impl CheckOnCluster<IndexWithBloat> {
    pub fn bloated_indexes(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::bloated_indexes(c.clone())))
    }
}

impl CheckOnCluster<TableWithBloat> {
    pub fn bloated_tables(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::bloated_tables(c.clone())))
    }
}

impl CheckOnCluster<Constraint> {
    pub fn not_valid_constraints(cluster: &HighAvailabilityPgConnection) -> Self {
        Self::new(cluster, |c| boxed(CheckOnHost::not_valid_constraints(c.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckError;
    use crate::connection::tests::lazy_connection;
    use crate::connection::PgHost;
    use crate::exclusion::{retain_included, SkipTablesByNamePredicate};
    use crate::models::{TableNameAware, TableSizeAware};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Host check returning canned tables and counting its invocations.
    struct FakeCheck {
        host: PgHost,
        diagnostic: Diagnostic,
        tables: Vec<&'static str>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FakeCheck {
        fn boxed(
            host: &str,
            diagnostic: Diagnostic,
            tables: Vec<&'static str>,
            calls: &Arc<AtomicUsize>,
        ) -> Box<dyn DatabaseCheckOnHost<Table>> {
            Box::new(Self {
                host: PgHost::new(host, 5432),
                diagnostic,
                tables,
                fail: false,
                calls: Arc::clone(calls),
            })
        }

        fn failing(host: &str, diagnostic: Diagnostic) -> Box<dyn DatabaseCheckOnHost<Table>> {
            Box::new(Self {
                host: PgHost::new(host, 5432),
                diagnostic,
                tables: vec![],
                fail: true,
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl DatabaseCheckOnHost<Table> for FakeCheck {
        fn diagnostic(&self) -> Diagnostic {
            self.diagnostic
        }

        fn host(&self) -> &PgHost {
            &self.host
        }

        async fn check(
            &self,
            _ctx: &PgContext,
            exclusions: &[&dyn ExclusionPredicate<Table>],
        ) -> Result<Vec<Table>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CheckError::QueryFailed {
                    diagnostic: self.diagnostic,
                    host: self.host.clone(),
                    source: sqlx::Error::PoolTimedOut,
                });
            }
            let tables = self
                .tables
                .iter()
                .map(|name| Table::of(name, self.host.name.len() as i64).unwrap())
                .collect();
            Ok(retain_included(tables, exclusions))
        }
    }

    fn names(tables: &[Table]) -> Vec<&str> {
        tables.iter().map(|t| t.table_name()).collect()
    }

    #[tokio::test]
    async fn runtime_diagnostic_merges_hosts_primary_first() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cluster = CheckOnCluster::from_host_checks(vec![
            FakeCheck::boxed("primary", Diagnostic::TablesWithMissingIndexes, vec!["t1", "t2"], &calls),
            FakeCheck::boxed("replica", Diagnostic::TablesWithMissingIndexes, vec!["t2", "t3"], &calls),
        ]);

        let tables = cluster.check(&PgContext::default(), &[]).await.unwrap();

        assert_eq!(names(&tables), vec!["t1", "t2", "t3"]);
        // t2 is reported as seen on the primary
        assert_eq!(tables[1].table_size_in_bytes(), "primary".len() as i64);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn static_diagnostic_only_queries_primary() {
        let calls = Arc::new(AtomicUsize::new(0));
        let replica_calls = Arc::new(AtomicUsize::new(0));
        let cluster = CheckOnCluster::from_host_checks(vec![
            FakeCheck::boxed("primary", Diagnostic::TablesWithoutPrimaryKey, vec!["t1"], &calls),
            FakeCheck::boxed("replica", Diagnostic::TablesWithoutPrimaryKey, vec!["t9"], &replica_calls),
        ]);

        let tables = cluster.check(&PgContext::default(), &[]).await.unwrap();

        assert_eq!(names(&tables), vec!["t1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(replica_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exclusions_apply_on_every_host() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cluster = CheckOnCluster::from_host_checks(vec![
            FakeCheck::boxed("primary", Diagnostic::BloatedTables, vec!["t1", "t2"], &calls),
            FakeCheck::boxed("replica", Diagnostic::BloatedTables, vec!["t2", "t3"], &calls),
        ]);
        let skip_t2 = SkipTablesByNamePredicate::of_name(&PgContext::default(), "t2");
        let exclusions: [&dyn ExclusionPredicate<Table>; 1] = [&skip_t2];

        let tables = cluster
            .check(&PgContext::default(), &exclusions)
            .await
            .unwrap();

        assert_eq!(names(&tables), vec!["t1", "t3"]);
    }

    #[tokio::test]
    async fn failing_host_fails_the_whole_check() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cluster = CheckOnCluster::from_host_checks(vec![
            FakeCheck::boxed("primary", Diagnostic::UnusedIndexes, vec!["t1"], &calls),
            FakeCheck::failing("replica", Diagnostic::UnusedIndexes),
        ]);

        let err = cluster.check(&PgContext::default(), &[]).await.unwrap_err();

        assert!(matches!(
            err,
            CheckError::QueryFailed { ref host, .. } if host.name == "replica"
        ));
    }

    #[test]
    fn merge_keeps_first_occurrence() {
        let per_host = vec![
            vec![Table::of("a", 1).unwrap(), Table::of("b", 1).unwrap()],
            vec![Table::of("c", 2).unwrap(), Table::of("a", 2).unwrap()],
            vec![],
        ];
        let merged = merge_by_identity(per_host);
        assert_eq!(names(&merged), vec!["a", "b", "c"]);
        assert_eq!(merged[0].table_size_in_bytes(), 1);
    }

    #[tokio::test]
    async fn typed_constructors_cover_every_host() {
        let primary = lazy_connection("primary");
        let replica = lazy_connection("replica");
        let cluster = HighAvailabilityPgConnection::of(
            primary.clone(),
            vec![primary, replica],
        )
        .unwrap();

        let check = CheckOnCluster::bloated_indexes(&cluster);
        assert_eq!(check.diagnostic(), Diagnostic::BloatedIndexes);
        let hosts: Vec<&str> = check.checks.iter().map(|c| c.host().name.as_str()).collect();
        assert_eq!(hosts, vec!["primary", "replica"]);

        assert_eq!(
            CheckOnCluster::foreign_keys_without_index(&cluster).diagnostic(),
            Diagnostic::ForeignKeysWithoutIndex
        );
    }
}
