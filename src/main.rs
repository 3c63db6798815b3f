mod config;
mod scheduler;
mod sequence;
mod server;
mod storage;

use std::path::PathBuf;

use color_eyre::eyre::WrapErr;
use env_logger::Env;
use log::{error, info};

use crate::config::{resolve_work_dir, Settings};
use crate::server::{SeqServer, SeqServerOptions};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "dayseq")]
pub struct Opt {
    #[structopt(long, default_value = "0.0.0.0")]
    pub host: String,
    #[structopt(short, long, default_value = "7002")]
    pub port: u16,
    #[structopt(short, long, parse(from_os_str))]
    pub work_dir: Option<PathBuf>,
    #[structopt(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,
    #[structopt(short, long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let options = Opt::from_args();

    init_logger(&options.log_level);

    run(options).await
}

async fn run(options: Opt) -> color_eyre::Result<()> {
    let work_dir = resolve_work_dir(options.work_dir)?;
    info!("work directory: {}", work_dir.display());

    let settings = Settings::discover(&work_dir, options.config.as_deref())
        .wrap_err("failed to load settings")?;

    let server_options = SeqServerOptions {
        host: options.host,
        port: options.port,
        state_path: settings.state_path(&work_dir),
        ticket_format: settings.ticket_format,
        persist_queue: settings.persist_queue,
    };

    SeqServer::new(server_options)
        .run(shutdown_signal())
        .await
        .wrap_err("sequence server failed to start")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

fn init_logger(level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}
