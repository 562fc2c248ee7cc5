use crate::checks::{CheckError, CheckOnCluster};
use crate::config::{ClusterConfig, ConfigError, DbConfig, Exclusions};
use crate::connection::{ConnectionError, HighAvailabilityPgConnection, PgConnection, PgHost};
use crate::diagnostic::{Diagnostic, ExecutionType};
use crate::exclusion::ExclusionPredicate;
use crate::generator::{DbMigrationGenerator, GeneratingOptions, PgIndexOnForeignKeyGenerator};
use crate::models::{
    Constraint, DbObject, DuplicatedIndexes, ForeignKey, Index, IndexWithBloat, IndexWithNulls,
    PgContext, Table, TableWithBloat, TableWithMissingIndex, UnusedIndex,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::{ResultExt, Snafu};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Snafu)]
pub enum CheckerError {
    #[snafu(display("Failed to connect to cluster {}: {}", cluster, source))]
    Connect {
        cluster: String,
        source: ConnectionError,
    },

    #[snafu(display("Invalid configuration: {}", source))]
    InvalidConfig { source: ConfigError },

    #[snafu(display("Health check failed: {}", source))]
    CheckFailed { source: CheckError },

    #[snafu(display("Failed to read statistics of cluster {}: {}", cluster, source))]
    Statistics {
        cluster: String,
        source: ConnectionError,
    },

    #[snafu(display("Failed to serialize finding: {}", source))]
    Serialize { source: serde_json::Error },
}

type Result<T, E = CheckerError> = std::result::Result<T, E>;

/// One reported object: its display summary plus the full record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub name: String,
    pub summary: String,
    pub object: serde_json::Value,
}

impl Finding {
    pub fn of<T: DbObject + Display + Serialize>(record: &T) -> Result<Self> {
        Ok(Self {
            name: record.name().to_string(),
            summary: record.to_string(),
            object: serde_json::to_value(record).context(SerializeSnafu)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    pub diagnostic: Diagnostic,
    pub execution_type: ExecutionType,
    pub findings: Vec<Finding>,
}

impl DiagnosticResult {
    pub fn new(diagnostic: Diagnostic, findings: Vec<Finding>) -> Self {
        Self {
            diagnostic,
            execution_type: diagnostic.execution_type(),
            findings,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.findings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub cluster: String,
    pub schema: String,
    pub hosts: Vec<PgHost>,
    /// Last statistics reset on the primary; runtime findings cover the time since.
    pub stats_reset: Option<DateTime<Utc>>,
    pub results: Vec<DiagnosticResult>,
}

impl HealthReport {
    pub fn total_findings(&self) -> usize {
        self.results.iter().map(|r| r.findings.len()).sum()
    }

    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(DiagnosticResult::is_healthy)
    }
}

/// Runs diagnostics against one configured cluster.
pub struct HealthChecker {
    name: String,
    cluster: HighAvailabilityPgConnection,
    ctx: PgContext,
    exclusions: Exclusions,
}

impl HealthChecker {
    pub async fn new(config: ClusterConfig) -> Result<Self> {
        let ctx = config.context().context(InvalidConfigSnafu)?;
        let exclusions = config.exclusions(&ctx).context(InvalidConfigSnafu)?;
        let timeout = config.statement_timeout();

        let primary = connect(&config, &config.primary, timeout).await?;
        let mut connections = vec![primary.clone()];
        for replica in &config.replicas {
            connections.push(connect(&config, replica, timeout).await?);
        }
        let cluster = HighAvailabilityPgConnection::of(primary, connections).context(
            ConnectSnafu {
                cluster: config.name.clone(),
            },
        )?;

        Ok(Self::with_cluster(config.name, cluster, ctx, exclusions))
    }

    pub fn with_cluster(
        name: String,
        cluster: HighAvailabilityPgConnection,
        ctx: PgContext,
        exclusions: Exclusions,
    ) -> Self {
        Self {
            name,
            cluster,
            ctx,
            exclusions,
        }
    }

    pub async fn check(&self, diagnostics: &[Diagnostic]) -> Result<HealthReport> {
        let stats_reset = self
            .cluster
            .connection_to_primary()
            .last_stats_reset()
            .await
            .context(StatisticsSnafu {
                cluster: self.name.clone(),
            })?;

        let mut results = Vec::with_capacity(diagnostics.len());
        for diagnostic in diagnostics {
            info!("Running diagnostic {} on cluster {}", diagnostic, self.name);
            let findings = self.run(*diagnostic).await?;
            debug!("{} reported {} findings", diagnostic, findings.len());
            results.push(DiagnosticResult::new(*diagnostic, findings));
        }

        Ok(HealthReport {
            cluster: self.name.clone(),
            schema: self.ctx.schema_name().to_string(),
            hosts: self
                .cluster
                .connections_to_all_hosts()
                .iter()
                .map(|c| c.host().clone())
                .collect(),
            stats_reset,
            results,
        })
    }

    /// `create index` statements for every foreign key not covered by an index.
    pub async fn foreign_key_migrations(&self, options: GeneratingOptions) -> Result<Vec<String>> {
        let foreign_keys = self.foreign_keys_without_index().await?;
        info!(
            "Generating migrations for {} foreign keys on cluster {}",
            foreign_keys.len(),
            self.name
        );
        Ok(PgIndexOnForeignKeyGenerator::new(options).generate_all(&foreign_keys))
    }

    async fn foreign_keys_without_index(&self) -> Result<Vec<ForeignKey>> {
        let e = &self.exclusions;
        let exclusions: [&dyn ExclusionPredicate<ForeignKey>; 1] = [&e.tables];
        CheckOnCluster::foreign_keys_without_index(&self.cluster)
            .check(&self.ctx, &exclusions)
            .await
            .context(CheckFailedSnafu)
    }

    async fn run(&self, diagnostic: Diagnostic) -> Result<Vec<Finding>> {
        let e = &self.exclusions;
        let cluster = &self.cluster;
        match diagnostic {
            Diagnostic::InvalidIndexes => {
                let exclusions: [&dyn ExclusionPredicate<Index>; 2] = [&e.tables, &e.indexes];
                self.collect(CheckOnCluster::invalid_indexes(cluster), &exclusions)
                    .await
            }
            Diagnostic::DuplicatedIndexes => {
                let exclusions: [&dyn ExclusionPredicate<DuplicatedIndexes>; 3] =
                    [&e.tables, &e.indexes, &e.small_indexes];
                self.collect(CheckOnCluster::duplicated_indexes(cluster), &exclusions)
                    .await
            }
            Diagnostic::IntersectedIndexes => {
                let exclusions: [&dyn ExclusionPredicate<DuplicatedIndexes>; 3] =
                    [&e.tables, &e.indexes, &e.small_indexes];
                self.collect(CheckOnCluster::intersected_indexes(cluster), &exclusions)
                    .await
            }
            Diagnostic::UnusedIndexes => {
                let exclusions: [&dyn ExclusionPredicate<UnusedIndex>; 3] =
                    [&e.tables, &e.indexes, &e.small_indexes];
                self.collect(CheckOnCluster::unused_indexes(cluster), &exclusions)
                    .await
            }
            Diagnostic::ForeignKeysWithoutIndex => {
                let foreign_keys = self.foreign_keys_without_index().await?;
                foreign_keys.iter().map(Finding::of).collect()
            }
            Diagnostic::TablesWithMissingIndexes => {
                let exclusions: [&dyn ExclusionPredicate<TableWithMissingIndex>; 2] =
                    [&e.tables, &e.small_tables];
                self.collect(CheckOnCluster::tables_with_missing_indexes(cluster), &exclusions)
                    .await
            }
            Diagnostic::TablesWithoutPrimaryKey => {
                let exclusions: [&dyn ExclusionPredicate<Table>; 2] = [&e.tables, &e.small_tables];
                self.collect(CheckOnCluster::tables_without_primary_key(cluster), &exclusions)
                    .await
            }
            Diagnostic::IndexesWithNullValues => {
                let exclusions: [&dyn ExclusionPredicate<IndexWithNulls>; 3] =
                    [&e.tables, &e.indexes, &e.small_indexes];
                self.collect(CheckOnCluster::indexes_with_null_values(cluster), &exclusions)
                    .await
            }
            Diagnostic::BloatedIndexes => {
                let exclusions: [&dyn ExclusionPredicate<IndexWithBloat>; 4] =
                    [&e.tables, &e.indexes, &e.small_indexes, &e.bloat];
                self.collect(CheckOnCluster::bloated_indexes(cluster), &exclusions)
                    .await
            }
            Diagnostic::BloatedTables => {
                let exclusions: [&dyn ExclusionPredicate<TableWithBloat>; 3] =
                    [&e.tables, &e.small_tables, &e.bloat];
                self.collect(CheckOnCluster::bloated_tables(cluster), &exclusions)
                    .await
            }
            Diagnostic::NotValidConstraints => {
                let exclusions: [&dyn ExclusionPredicate<Constraint>; 1] = [&e.tables];
                self.collect(CheckOnCluster::not_valid_constraints(cluster), &exclusions)
                    .await
            }
        }
    }

    async fn collect<T>(
        &self,
        check: CheckOnCluster<T>,
        exclusions: &[&dyn ExclusionPredicate<T>],
    ) -> Result<Vec<Finding>>
    where
        T: DbObject + Display + Serialize + Send + 'static,
    {
        let records = check
            .check(&self.ctx, exclusions)
            .await
            .context(CheckFailedSnafu)?;
        records.iter().map(Finding::of).collect()
    }
}

async fn connect(
    cluster: &ClusterConfig,
    db: &DbConfig,
    timeout: Option<Duration>,
) -> Result<PgConnection> {
    let connection = PgConnection::connect(db.pg_host(), &db.connection_string())
        .await
        .context(ConnectSnafu {
            cluster: cluster.name.clone(),
        })?;
    Ok(match timeout {
        Some(timeout) => connection.with_statement_timeout(timeout),
        None => connection,
    })
}
