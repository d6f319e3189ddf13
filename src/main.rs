use anyhow::Context;
use investments::config::{Config, StoreBackend};
use investments::db::{init_store, BatchWriter, MemorySession, ScyllaSession, Session};
use investments::domain::Catalog;
use investments::generator::Generator;
use investments::query::QueryRouter;
use investments::Console;
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE: &str = "investments.log";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Held until exit so buffered log lines are flushed
    let _guard = init_tracing(&config);

    let result = match config.store {
        StoreBackend::Cluster => match connect(&config).await {
            Ok(session) => run(&session, &config).await,
            Err(e) => Err(e),
        },
        StoreBackend::Memory => run(&MemorySession::new(), &config).await,
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    guard
}

async fn connect(config: &Config) -> anyhow::Result<ScyllaSession> {
    let nodes = config.cluster_nodes();
    ScyllaSession::connect(&nodes)
        .await
        .with_context(|| format!("Failed to connect to {}", nodes.join(",")))
}

async fn run<S: Session>(session: &S, config: &Config) -> anyhow::Result<()> {
    init_store(session, &config.keyspace, config.replication_factor)
        .await
        .context("Failed to initialize keyspace")?;

    let catalog = Catalog::demo();
    let generator = Generator::new(catalog.clone(), config.generator_config());
    let router = QueryRouter::new(session, &catalog).with_history_limit(config.history_limit);
    let writer = BatchWriter::with_batch_size(session, config.batch_size);

    let stdin = std::io::stdin();
    let mut console = Console::new(router, writer, generator, stdin.lock(), std::io::stdout());
    console.run().await?;
    Ok(())
}
