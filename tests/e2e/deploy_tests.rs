//! End-to-end tests for creating a database from a snapshot directory
//!
//! Environment variables (with defaults):
//! - SQL_SERVER_HOST (default: localhost)
//! - SQL_SERVER_PORT (default: 1433)
//! - SQL_SERVER_USER (default: sa)
//! - SQL_SERVER_PASSWORD (default: Password1)

use std::sync::LazyLock;

use tiberius::{AuthMethod, Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use rust_sqlsnap::apply::{ConnectionSettings, DeployReport};
use rust_sqlsnap::snapshot::write_snapshot_dir;
use rust_sqlsnap::{create_database, CreateOptions, SnapshotError};

use crate::common::{sample_db, TestContext};

/// Load environment variables from .env file (if present)
fn load_env() {
    let _ = dotenvy::dotenv();
}

/// SQL Server connection configuration loaded from environment
static SQL_CONFIG: LazyLock<SqlServerConfig> = LazyLock::new(|| {
    load_env();
    SqlServerConfig {
        host: std::env::var("SQL_SERVER_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("SQL_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1433),
        user: std::env::var("SQL_SERVER_USER").unwrap_or_else(|_| "sa".to_string()),
        password: std::env::var("SQL_SERVER_PASSWORD").unwrap_or_else(|_| "Password1".to_string()),
    }
});

struct SqlServerConfig {
    host: String,
    port: u16,
    user: String,
    password: String,
}

const TEST_DATABASE: &str = "E2ESnapshot_Test";

type SqlClient = Client<Compat<TcpStream>>;

fn settings() -> ConnectionSettings {
    ConnectionSettings {
        host: SQL_CONFIG.host.clone(),
        port: SQL_CONFIG.port,
        user: SQL_CONFIG.user.clone(),
        password: SQL_CONFIG.password.clone(),
        trust_cert: true,
    }
}

fn create_config(database: Option<&str>) -> Config {
    let mut config = Config::new();
    config.host(&SQL_CONFIG.host);
    config.port(SQL_CONFIG.port);
    config.authentication(AuthMethod::sql_server(&SQL_CONFIG.user, &SQL_CONFIG.password));
    config.trust_cert();

    if let Some(db) = database {
        config.database(db);
    }

    config
}

async fn connect(database: Option<&str>) -> Result<SqlClient, Box<dyn std::error::Error>> {
    let config = create_config(database);
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    let client = Client::connect(config, tcp.compat_write()).await?;
    Ok(client)
}

fn get_count(row: Option<Row>) -> i32 {
    row.and_then(|r| r.get::<i32, _>(0)).unwrap_or(0)
}

async fn drop_database_if_exists() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(None).await?;
    let query = format!(
        "IF EXISTS (SELECT 1 FROM sys.databases WHERE name = '{}') \
         BEGIN \
             ALTER DATABASE [{}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE; \
             DROP DATABASE [{}]; \
         END",
        TEST_DATABASE, TEST_DATABASE, TEST_DATABASE
    );
    client.execute(&query, &[]).await?;
    Ok(())
}

/// Write the sample model to a snapshot directory inside `ctx`.
///
/// The user is left out: it needs a matching server login.
fn write_sample_snapshot(ctx: &TestContext) {
    let dir = ctx.snapshot_dir();
    write_snapshot_dir(&sample_db(), &dir, false).expect("Failed to write snapshot");
    std::fs::remove_dir_all(dir.join("users")).expect("Failed to remove users");
}

/// Run the blocking library entry point off the async runtime
async fn create_from(ctx: &TestContext, overwrite: bool) -> anyhow::Result<DeployReport> {
    let options = CreateOptions {
        dir: ctx.snapshot_dir(),
        database: TEST_DATABASE.to_string(),
        connection: settings(),
        overwrite,
    };
    tokio::task::spawn_blocking(move || create_database(&options))
        .await
        .expect("Blocking task panicked")
}

async fn count_of(client: &mut SqlClient, query: &str, params: &[&str]) -> i32 {
    let params: Vec<&dyn tiberius::ToSql> = params.iter().map(|p| p as &dyn tiberius::ToSql).collect();
    let row = client
        .query(query, &params)
        .await
        .expect("Query failed")
        .into_row()
        .await
        .expect("Failed to read row");
    get_count(row)
}

async fn table_exists(client: &mut SqlClient, schema: &str, table: &str) -> bool {
    count_of(
        client,
        "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 AND TABLE_TYPE = 'BASE TABLE'",
        &[schema, table],
    )
    .await
        > 0
}

async fn view_exists(client: &mut SqlClient, schema: &str, view: &str) -> bool {
    count_of(
        client,
        "SELECT COUNT(*) FROM INFORMATION_SCHEMA.VIEWS WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2",
        &[schema, view],
    )
    .await
        > 0
}

async fn routine_exists(client: &mut SqlClient, schema: &str, routine: &str, kind: &str) -> bool {
    count_of(
        client,
        "SELECT COUNT(*) FROM INFORMATION_SCHEMA.ROUTINES \
         WHERE ROUTINE_SCHEMA = @P1 AND ROUTINE_NAME = @P2 AND ROUTINE_TYPE = @P3",
        &[schema, routine, kind],
    )
    .await
        > 0
}

async fn foreign_key_exists(client: &mut SqlClient, name: &str) -> bool {
    count_of(
        client,
        "SELECT COUNT(*) FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS WHERE CONSTRAINT_NAME = @P1",
        &[name],
    )
    .await
        > 0
}

// ============================================================================
// Connectivity
// ============================================================================

#[tokio::test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
async fn test_sql_server_connectivity() {
    let mut client = connect(None).await.expect("Failed to connect to SQL Server");
    let row = client
        .query("SELECT 1", &[])
        .await
        .expect("Query failed")
        .into_row()
        .await
        .expect("Failed to read row");
    assert_eq!(get_count(row), 1);
}

// ============================================================================
// Database Creation
// ============================================================================

#[tokio::test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
async fn test_create_database_from_snapshot() {
    drop_database_if_exists().await.expect("Failed to drop test database");
    let ctx = TestContext::new();
    write_sample_snapshot(&ctx);

    let report = create_from(&ctx, false).await.expect("Database creation failed");
    assert!(report.applied > 0);

    let mut client = connect(Some(TEST_DATABASE)).await.expect("Failed to connect");
    assert!(table_exists(&mut client, "dbo", "Customers").await);
    assert!(table_exists(&mut client, "sales", "Orders").await);
    assert!(view_exists(&mut client, "dbo", "CustomerOrders").await);
    assert!(routine_exists(&mut client, "dbo", "GetCustomer", "PROCEDURE").await);
    assert!(routine_exists(&mut client, "dbo", "OrderCount", "FUNCTION").await);
    assert!(foreign_key_exists(&mut client, "FK_Orders_Customers").await);

    let types = count_of(
        &mut client,
        "SELECT COUNT(*) FROM sys.table_types WHERE name = @P1",
        &["IdList"],
    )
    .await;
    assert_eq!(types, 1);

    drop(client);
    drop_database_if_exists().await.expect("Failed to clean up");
}

#[tokio::test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
async fn test_existing_database_requires_overwrite() {
    drop_database_if_exists().await.expect("Failed to drop test database");
    let ctx = TestContext::new();
    write_sample_snapshot(&ctx);

    create_from(&ctx, false).await.expect("First creation failed");

    let err = create_from(&ctx, false)
        .await
        .expect_err("Second creation should be refused");
    assert!(
        matches!(
            err.downcast_ref::<SnapshotError>(),
            Some(SnapshotError::DatabaseExists { .. })
        ),
        "Unexpected error: {err:#}"
    );

    create_from(&ctx, true).await.expect("Overwrite failed");

    drop_database_if_exists().await.expect("Failed to clean up");
}

#[tokio::test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
async fn test_missing_snapshot_dir_touches_nothing() {
    drop_database_if_exists().await.expect("Failed to drop test database");
    let ctx = TestContext::new();

    let err = create_from(&ctx, false)
        .await
        .expect_err("Missing directory should fail");
    assert!(matches!(
        err.downcast_ref::<SnapshotError>(),
        Some(SnapshotError::SnapshotDirNotFound { .. })
    ));

    let mut client = connect(None).await.expect("Failed to connect");
    let count = count_of(
        &mut client,
        "SELECT COUNT(*) FROM sys.databases WHERE name = @P1",
        &[TEST_DATABASE],
    )
    .await;
    assert_eq!(count, 0, "No database should have been created");
}
