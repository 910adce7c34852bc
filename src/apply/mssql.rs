//! SQL Server connection over tiberius
//!
//! The apply engine is synchronous, so every call blocks on a private
//! current-thread runtime.

use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::error::{BatchError, Result, SnapshotError};
use crate::util::quote_ident;

use super::Connection;

/// Server address and SQL authentication credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Accept the server certificate without validation
    pub trust_cert: bool,
}

impl ConnectionSettings {
    fn config(&self, database: &str) -> Config {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if self.trust_cert {
            config.trust_cert();
        }
        config.database(database);
        config
    }

    fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A blocking connection to one database
pub struct MssqlConnection {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
    server: String,
}

impl MssqlConnection {
    pub fn connect(settings: &ConnectionSettings, database: &str) -> Result<Self> {
        let server = settings.server();
        let connection_error = |message: String| SnapshotError::ConnectionError {
            server: server.clone(),
            message,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| connection_error(e.to_string()))?;

        let config = settings.config(database);
        let client = runtime
            .block_on(async {
                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                let client = Client::connect(config, tcp.compat_write()).await?;
                Ok::<_, anyhow::Error>(client)
            })
            .map_err(|e| connection_error(e.to_string()))?;

        debug!("Connected to {} database {}", server, database);
        Ok(Self {
            runtime,
            client,
            server,
        })
    }

    /// Connect to `master` for server-level operations.
    pub fn connect_master(settings: &ConnectionSettings) -> Result<Self> {
        Self::connect(settings, "master")
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn database_exists(&mut self, database: &str) -> Result<bool> {
        let client = &mut self.client;
        let row = self
            .runtime
            .block_on(async move {
                client
                    .query("SELECT 1 FROM sys.databases WHERE name = @P1", &[&database])
                    .await?
                    .into_row()
                    .await
            })
            .map_err(|e| SnapshotError::ConnectionError {
                server: self.server.clone(),
                message: e.to_string(),
            })?;
        Ok(row.is_some())
    }

    /// Drop a database, disconnecting any other sessions first.
    pub fn drop_database(&mut self, database: &str) -> std::result::Result<(), BatchError> {
        let name = quote_ident(database);
        self.execute(&format!(
            "ALTER DATABASE {name} SET SINGLE_USER WITH ROLLBACK IMMEDIATE\nDROP DATABASE {name}"
        ))
    }

    pub fn create_database(&mut self, database: &str) -> std::result::Result<(), BatchError> {
        self.execute(&format!("CREATE DATABASE {}", quote_ident(database)))
    }
}

impl Connection for MssqlConnection {
    fn execute(&mut self, batch: &str) -> std::result::Result<(), BatchError> {
        let client = &mut self.client;
        let result = self.runtime.block_on(async move {
            client.simple_query(batch).await?.into_results().await
        });
        match result {
            Ok(_) => Ok(()),
            Err(tiberius::error::Error::Server(err)) => {
                Err(BatchError::at_line(err.message(), err.line() as usize))
            }
            Err(err) => Err(BatchError::new(err.to_string())),
        }
    }
}
