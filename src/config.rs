use crate::connection::PgHost;
use crate::exclusion::{
    SkipBloatUnderThresholdPredicate, SkipIndexesByNamePredicate, SkipSmallIndexesPredicate,
    SkipSmallTablesPredicate, SkipTablesByNamePredicate,
};
use crate::models::{PgContext, ValidationError, DEFAULT_BLOAT_PERCENTAGE_THRESHOLD, DEFAULT_SCHEMA_NAME};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::fs;
use std::time::Duration;

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read config file: {}", source))]
    FileRead { source: std::io::Error },

    #[snafu(display("Failed to parse YAML config: {}", source))]
    YamlParse { source: serde_yaml::Error },

    #[snafu(display("Invalid settings for cluster {}: {}", cluster, source))]
    InvalidSettings {
        cluster: String,
        source: ValidationError,
    },
}

type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Connection parameters of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    DEFAULT_SCHEMA_NAME.to_string()
}

fn default_bloat_percentage_threshold() -> f64 {
    DEFAULT_BLOAT_PERCENTAGE_THRESHOLD
}

impl DbConfig {
    pub fn from_connection_params(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
        }
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    pub fn pg_host(&self) -> PgHost {
        PgHost::new(&self.host, self.port)
    }
}

/// Objects and thresholds excluded from every diagnostic of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    pub tables: Vec<String>,
    pub indexes: Vec<String>,
    pub min_index_size_bytes: i64,
    pub min_table_size_bytes: i64,
    pub min_bloat_size_bytes: i64,
    pub min_bloat_percentage: f64,
}

/// Predicates derived from an [`ExclusionConfig`] for one schema.
#[derive(Debug, Clone)]
pub struct Exclusions {
    pub tables: SkipTablesByNamePredicate,
    pub indexes: SkipIndexesByNamePredicate,
    pub small_indexes: SkipSmallIndexesPredicate,
    pub small_tables: SkipSmallTablesPredicate,
    pub bloat: SkipBloatUnderThresholdPredicate,
}

impl ExclusionConfig {
    pub fn to_exclusions(&self, ctx: &PgContext) -> Result<Exclusions, ValidationError> {
        Ok(Exclusions {
            tables: SkipTablesByNamePredicate::of(ctx, self.tables.iter().map(String::as_str)),
            indexes: SkipIndexesByNamePredicate::of(ctx, self.indexes.iter().map(String::as_str)),
            small_indexes: SkipSmallIndexesPredicate::of(self.min_index_size_bytes)?,
            small_tables: SkipSmallTablesPredicate::of(self.min_table_size_bytes)?,
            bloat: SkipBloatUnderThresholdPredicate::of(
                self.min_bloat_size_bytes,
                self.min_bloat_percentage,
            )?,
        })
    }
}

/// A primary with its replicas plus the settings the diagnostics run with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    pub primary: DbConfig,
    #[serde(default)]
    pub replicas: Vec<DbConfig>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_bloat_percentage_threshold")]
    pub bloat_percentage_threshold: f64,
    #[serde(default)]
    pub statement_timeout_secs: Option<u64>,
    #[serde(default)]
    pub exclusions: ExclusionConfig,
}

impl ClusterConfig {
    pub fn single_host(primary: DbConfig) -> Self {
        Self {
            name: primary.database.clone(),
            primary,
            replicas: Vec::new(),
            schema: default_schema(),
            bloat_percentage_threshold: DEFAULT_BLOAT_PERCENTAGE_THRESHOLD,
            statement_timeout_secs: None,
            exclusions: ExclusionConfig::default(),
        }
    }

    pub fn from_config_file(path: &str) -> Result<Vec<Self>> {
        let content = fs::read_to_string(path).context(FileReadSnafu)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Vec<Self>> {
        let configs: Vec<ClusterConfig> = serde_yaml::from_str(content).context(YamlParseSnafu)?;
        for config in &configs {
            config.context()?;
        }
        Ok(configs)
    }

    pub fn context(&self) -> Result<PgContext> {
        PgContext::with_bloat_threshold(&self.schema, self.bloat_percentage_threshold).context(
            InvalidSettingsSnafu {
                cluster: self.name.clone(),
            },
        )
    }

    pub fn exclusions(&self, ctx: &PgContext) -> Result<Exclusions> {
        self.exclusions
            .to_exclusions(ctx)
            .context(InvalidSettingsSnafu {
                cluster: self.name.clone(),
            })
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_secs.map(Duration::from_secs)
    }

    /// Primary first, then replicas in declaration order.
    pub fn hosts(&self) -> impl Iterator<Item = &DbConfig> {
        std::iter::once(&self.primary).chain(self.replicas.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::ExclusionPredicate;
    use crate::models::Table;

    const CLUSTERS: &str = r#"
- name: orders
  primary:
    host: pg-primary
    database: orders
    username: app
    password: secret
  replicas:
    - host: pg-replica-1
      port: 6432
      database: orders
      username: app
      password: secret
  schema: Sales
  bloat_percentage_threshold: 25.0
  statement_timeout_secs: 30
  exclusions:
    tables: [audit_log]
    min_index_size_bytes: 8192
- name: billing
  primary:
    host: localhost
    database: billing
    username: app
    password: secret
"#;

    #[test]
    fn parses_clusters_with_defaults() {
        let configs = ClusterConfig::from_yaml(CLUSTERS).unwrap();
        assert_eq!(configs.len(), 2);

        let orders = &configs[0];
        let hosts: Vec<String> = orders.hosts().map(|h| h.pg_host().to_string()).collect();
        assert_eq!(hosts, vec!["pg-primary:5432", "pg-replica-1:6432"]);
        assert_eq!(orders.statement_timeout(), Some(Duration::from_secs(30)));

        let ctx = orders.context().unwrap();
        assert_eq!(ctx.schema_name(), "sales");
        assert_eq!(ctx.bloat_percentage_threshold(), 25.0);

        let billing = &configs[1];
        assert_eq!(billing.schema, "public");
        assert_eq!(billing.bloat_percentage_threshold, 10.0);
        assert!(billing.replicas.is_empty());
        assert_eq!(billing.exclusions, ExclusionConfig::default());
        assert_eq!(billing.statement_timeout(), None);
    }

    #[test]
    fn exclusions_are_schema_aware() {
        let orders = ClusterConfig::from_yaml(CLUSTERS).unwrap().remove(0);
        let ctx = orders.context().unwrap();
        let exclusions = orders.exclusions(&ctx).unwrap();

        assert!(exclusions.tables.excludes(&Table::of("sales.audit_log", 0).unwrap()));
        assert!(!exclusions.tables.excludes(&Table::of("sales.orders", 0).unwrap()));
    }

    #[test]
    fn invalid_threshold_is_reported_with_cluster_name() {
        let yaml = r#"
- name: broken
  primary: { host: h, database: d, username: u, password: p }
  bloat_percentage_threshold: 150
"#;
        let err = ClusterConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings { ref cluster, .. } if cluster == "broken"));
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(matches!(
            ClusterConfig::from_yaml("- name: [").unwrap_err(),
            ConfigError::YamlParse { .. }
        ));
    }

    #[test]
    fn connection_string_from_params() {
        let config = DbConfig::from_connection_params(
            "localhost".into(),
            5433,
            "shop".into(),
            "app".into(),
            "pw".into(),
        );
        assert_eq!(config.connection_string(), "postgres://app:pw@localhost:5433/shop");
        assert_eq!(ClusterConfig::single_host(config).name, "shop");
    }
}
