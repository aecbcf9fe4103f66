#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Database")]
#[group(id = "database")]
pub struct Database {
    #[arg(id = "db-user", long, env = "DB_USER", default_value = "apollo")]
    pub username: String,
    #[arg(id = "db-password", long, env = "DB_PASSWORD", default_value = "apollo")]
    pub password: String,
    #[arg(id = "db-host", long, env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(id = "db-port", long, env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    #[arg(id = "db-name", long, env = "DB_NAME", default_value = "apollo")]
    pub name: String,
    /// Takes precedence over the individual connection fields.
    #[arg(id = "db-url", long, env = "DB_URL")]
    pub url: Option<String>,
}

impl Database {
    pub fn to_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.name
            ),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Build system")]
#[group(id = "build-system")]
pub struct BuildSystem {
    /// Downstream build checks are disabled when unset.
    #[arg(id = "koji-endpoint", long, env = "KOJI_ENDPOINT")]
    pub endpoint: Option<String>,
    #[arg(
        id = "koji-compose",
        long,
        env = "KOJI_COMPOSE",
        default_value = "dist-rocky8-compose"
    )]
    pub compose_tag: String,
    #[arg(
        id = "koji-module-compose",
        long,
        env = "KOJI_MODULE_COMPOSE",
        default_value = "dist-rocky8-module-compose"
    )]
    pub module_compose_tag: String,
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Intervals")]
#[group(id = "intervals")]
pub struct Intervals {
    #[arg(
        id = "poll-interval",
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = 7200
    )]
    pub poll_secs: u64,
    #[arg(
        id = "scan-interval",
        long,
        env = "SCAN_INTERVAL_SECS",
        default_value_t = 7200
    )]
    pub scan_secs: u64,
    #[arg(
        id = "refresh-interval",
        long,
        env = "REFRESH_INTERVAL_SECS",
        default_value_t = 3600
    )]
    pub refresh_secs: u64,
    #[arg(
        id = "match-interval",
        long,
        env = "MATCH_INTERVAL_SECS",
        default_value_t = 600
    )]
    pub match_secs: u64,
}
