use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

/// Settings for the disposable MySQL server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
    #[builder(default = "portal".to_string(), setter(into))]
    database: String,
    #[builder(default = "portal".to_string(), setter(into))]
    username: String,
    #[builder(default = "portal".to_string(), setter(into))]
    password: String,
    /// Server collation. Short codes are case-sensitive, so the binary
    /// collation is the default.
    #[builder(default = "utf8mb4_bin".to_string(), setter(into))]
    collation: String,
}

/// A MySQL container for the mapping store integration tests.
///
/// The container is stopped when the server is dropped.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_RANDOM_ROOT_PASSWORD", "yes")
            .with_cmd([
                "--character-set-server=utf8mb4".to_string(),
                format!("--collation-server={}", config.collation),
            ])
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// Starts a server with the default settings.
    pub async fn start() -> Result<Self> {
        Self::new(MysqlConfig::builder().build()).await
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(MYSQL_PORT).await?)
    }

    /// `mysql://` URL for the test database, suitable for `sqlx`.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.port().await?;
        let MysqlConfig {
            database,
            username,
            password,
            ..
        } = &self.config;
        Ok(format!("mysql://{username}:{password}@{host}:{port}/{database}"))
    }
}
