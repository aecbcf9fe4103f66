use apollo_common::{config, db};
use apollo_mirror::{server, Mirror};
use apollo_store::{PgStore, Store};
use apollo_upstream::{
    errata::{self, ErrataScraper},
    koji::{self, BuildSystem},
    security::{self, SecurityApi},
};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "apollod",
    long_about = None
)]
pub struct Apollod {
    /// Apply pending database migrations on startup
    #[arg(long, env = "DB_MIGRATE", default_value_t = true)]
    pub migrate: bool,

    #[command(flatten)]
    pub database: config::Database,

    #[command(flatten)]
    pub build_system: config::BuildSystem,

    #[command(flatten)]
    pub intervals: config::Intervals,
}

impl Apollod {
    async fn run(self) -> ExitCode {
        match self.run_server().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                log::error!("Error: {err}");
                for (n, err) in err.chain().skip(1).enumerate() {
                    if n == 0 {
                        log::error!("Caused by:");
                    }
                    log::error!("\t{err}");
                }

                ExitCode::FAILURE
            }
        }
    }

    async fn run_server(self) -> anyhow::Result<()> {
        let db = db::Database::new(&self.database).await?;
        if self.migrate {
            db.migrate().await?;
        }

        let store = Arc::new(PgStore::new(&db)) as Arc<dyn Store>;
        let security = Arc::new(security::Client::new()) as Arc<dyn SecurityApi>;
        let errata = Arc::new(errata::Client::new()) as Arc<dyn ErrataScraper>;

        let build_system = match &self.build_system.endpoint {
            Some(endpoint) => Some(Arc::new(koji::Client::new(endpoint)) as Arc<dyn BuildSystem>),
            None => None,
        };

        let mirror = Mirror::new(
            store,
            security,
            errata,
            build_system,
            self.build_system.compose_tag.clone(),
        );

        server::run(mirror, self.intervals).await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    Apollod::parse().run().await
}
