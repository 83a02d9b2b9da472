mod catalog;
mod config;
mod course;
mod importer;
mod index;
mod llm;
mod server;
mod translator;

pub const USER_AGENT: &str = concat!("course-search/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;

use clap::Parser;
use config::{Cli, Command, EsArgs, ImportArgs, ServeArgs};
use importer::Importer;
use tracing::{info, warn};
use translator::Translator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("course_search=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Import(args) => import(&cli.es, args).await,
        Command::Serve(args) => serve(&cli.es, args).await,
    }
}

async fn import(es: &EsArgs, args: &ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let index = es.index()?;
    let catalog = args.catalog()?;
    let filter = args.filter();
    info!(index = index.index_name(), %filter, concurrency = args.concurrency, "starting import");

    let report = Importer::new(catalog, index)
        .with_concurrency(args.concurrency)
        .run(&filter)
        .await
        .inspect_err(|e| tracing::error!("import aborted: {e}"))?;

    for failure in &report.failed {
        warn!(id = %failure.id, reason = %failure.reason, "not indexed");
    }
    info!(%report, "import finished");
    Ok(())
}

async fn serve(es: &EsArgs, args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let index = es.index()?;
    let llm = args.llm()?;
    info!(
        index = index.index_name(),
        provider = ?args.llm_provider,
        model = args.model_name(),
        "starting query server"
    );

    let translator = Arc::new(Translator::new(llm, index));
    let router = server::build_router(translator, args.request_timeout());
    server::serve(args.bind, router).await?;
    info!("server stopped");
    Ok(())
}
