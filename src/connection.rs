use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::{ensure, ResultExt, Snafu};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConnectionError {
    #[snafu(display("Failed to connect to {host}: {source}"))]
    Connect { host: PgHost, source: sqlx::Error },

    #[snafu(display("Failed to detect server version of {host}: {source}"))]
    ServerVersionQuery { host: PgHost, source: sqlx::Error },

    #[snafu(display("Unsupported server version number: {value}"))]
    InvalidServerVersion { value: i32 },

    #[snafu(display("Failed to read statistics reset time on {host}: {source}"))]
    StatsResetQuery { host: PgHost, source: sqlx::Error },

    #[snafu(display("connectionsToAllHostsInCluster have to contain a connection to the primary"))]
    PrimaryNotFound,
}

type Result<T, E = ConnectionError> = std::result::Result<T, E>;

/// Network identity of a database host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PgHost {
    pub name: String,
    pub port: u16,
}

impl PgHost {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

impl fmt::Display for PgHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.port)
    }
}

/// Server version as reported by `server_version_num`, e.g. `150004`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ServerVersion(u32);

impl ServerVersion {
    pub fn from_num(version_num: i32) -> Result<Self> {
        ensure!(
            version_num >= 90_000,
            InvalidServerVersionSnafu { value: version_num }
        );
        Ok(Self(version_num as u32))
    }

    pub fn major(&self) -> u32 {
        self.0 / 10_000
    }

    pub fn is_at_least(&self, major: u32) -> bool {
        self.major() >= major
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.0 % 10_000)
    }
}

/// A pool to one host plus what the checks need to know about that host.
///
/// Connections are identified by their host.
#[derive(Debug, Clone)]
pub struct PgConnection {
    host: PgHost,
    pool: Pool<Postgres>,
    server_version: ServerVersion,
    statement_timeout: Option<Duration>,
}

impl PgConnection {
    pub fn new(host: PgHost, pool: Pool<Postgres>, server_version: ServerVersion) -> Self {
        Self {
            host,
            pool,
            server_version,
            statement_timeout: None,
        }
    }

    /// Opens a pool to the host and detects its server version.
    pub async fn connect(host: PgHost, connection_string: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL at {}", host);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await
            .context(ConnectSnafu { host: host.clone() })?;

        let version_num: i32 =
            sqlx::query_scalar("select current_setting('server_version_num')::int")
                .fetch_one(&pool)
                .await
                .context(ServerVersionQuerySnafu { host: host.clone() })?;
        let server_version = ServerVersion::from_num(version_num)?;

        info!("Connected to {} running PostgreSQL {}", host, server_version);
        Ok(Self::new(host, pool, server_version))
    }

    /// Caps every query issued through this connection.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &PgHost {
        &self.host
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn server_version(&self) -> ServerVersion {
        self.server_version
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout
    }

    /// When cumulative statistics of the current database were last reset.
    ///
    /// `None` if they never were. Runtime diagnostics only cover the period since then.
    pub async fn last_stats_reset(&self) -> Result<Option<DateTime<Utc>>> {
        let stats_reset = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "select stats_reset from pg_catalog.pg_stat_database where datname = current_database()",
        )
        .fetch_optional(&self.pool)
        .await
        .context(StatsResetQuerySnafu {
            host: self.host.clone(),
        })?
        .flatten();
        debug!("Statistics on {} last reset at {:?}", self.host, stats_reset);
        Ok(stats_reset)
    }
}

impl PartialEq for PgConnection {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
    }
}

impl Eq for PgConnection {}

/// Connections to every host of a cluster, primary first.
#[derive(Debug, Clone)]
pub struct HighAvailabilityPgConnection {
    connections: Vec<PgConnection>,
}

impl HighAvailabilityPgConnection {
    pub fn of_primary(primary: PgConnection) -> Self {
        Self {
            connections: vec![primary],
        }
    }

    /// Builds the cluster view. `connections_to_all_hosts` must contain the primary;
    /// the remaining hosts keep their registration order behind it.
    pub fn of(primary: PgConnection, connections_to_all_hosts: Vec<PgConnection>) -> Result<Self> {
        ensure!(
            connections_to_all_hosts.contains(&primary),
            PrimaryNotFoundSnafu
        );

        let mut connections = Vec::with_capacity(connections_to_all_hosts.len());
        connections.push(primary);
        for connection in connections_to_all_hosts {
            if !connections.contains(&connection) {
                connections.push(connection);
            }
        }
        Ok(Self { connections })
    }

    pub fn connection_to_primary(&self) -> &PgConnection {
        &self.connections[0]
    }

    pub fn connections_to_all_hosts(&self) -> &[PgConnection] {
        &self.connections
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;

    pub(crate) fn lazy_connection(name: &str) -> PgConnection {
        let pool = PgPoolOptions::new()
            .connect_lazy(&format!("postgres://user:pass@{}:5432/db", name))
            .unwrap();
        PgConnection::new(
            PgHost::new(name, 5432),
            pool,
            ServerVersion::from_num(160_002).unwrap(),
        )
    }

    #[rstest]
    #[case(90_624, 9, false)]
    #[case(140_010, 14, false)]
    #[case(150_004, 15, true)]
    #[case(170_000, 17, true)]
    fn server_version_exposes_major(
        #[case] num: i32,
        #[case] major: u32,
        #[case] at_least_15: bool,
    ) {
        let version = ServerVersion::from_num(num).unwrap();
        assert_eq!(version.major(), major);
        assert_eq!(version.is_at_least(15), at_least_15);
    }

    #[test]
    fn server_version_rejects_garbage() {
        assert!(ServerVersion::from_num(-1).is_err());
        assert_eq!(ServerVersion::from_num(150_004).unwrap().to_string(), "15.4");
    }

    #[tokio::test]
    async fn of_primary_contains_single_connection() {
        let primary = lazy_connection("primary");
        let cluster = HighAvailabilityPgConnection::of_primary(primary.clone());

        assert_eq!(cluster.connections_to_all_hosts(), &[primary.clone()]);
        assert_eq!(
            &cluster.connections_to_all_hosts()[0],
            cluster.connection_to_primary()
        );
    }

    #[tokio::test]
    async fn with_replicas_puts_primary_first() {
        let primary = lazy_connection("primary");
        let replica1 = lazy_connection("replica1");
        let replica2 = lazy_connection("replica2");
        let cluster = HighAvailabilityPgConnection::of(
            primary.clone(),
            vec![replica1.clone(), primary.clone(), replica2.clone()],
        )
        .unwrap();

        let hosts: Vec<&str> = cluster
            .connections_to_all_hosts()
            .iter()
            .map(|c| c.host().name.as_str())
            .collect();
        assert_eq!(hosts, vec!["primary", "replica1", "replica2"]);
        assert_eq!(cluster.connection_to_primary(), &primary);
    }

    #[tokio::test]
    async fn should_contain_connection_to_primary() {
        let primary = lazy_connection("primary");
        let replica = lazy_connection("replica");
        let err = HighAvailabilityPgConnection::of(primary, vec![replica]).unwrap_err();

        assert!(matches!(err, ConnectionError::PrimaryNotFound));
        assert_eq!(
            err.to_string(),
            "connectionsToAllHostsInCluster have to contain a connection to the primary"
        );
    }

    #[tokio::test]
    async fn statement_timeout_is_opt_in() {
        let connection = lazy_connection("primary");
        assert_eq!(connection.statement_timeout(), None);
        let connection = connection.with_statement_timeout(Duration::from_secs(5));
        assert_eq!(connection.statement_timeout(), Some(Duration::from_secs(5)));
    }
}
