#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Displacement dashboard server.
//!
//! ```text
//! displacement_server [--data PATH] [--dictionary PATH] [--geo PATH]
//!                     [--survey-year YEAR] [--bind-addr ADDR] [--port PORT] [--debug]
//! ```
//!
//! `BIND_ADDR` and `PORT` are read from the environment when the flags are
//! not given.

use std::path::PathBuf;

use clap::Parser;
use displacement_server::dataset::{
    DEFAULT_DICTIONARY_PATH, DEFAULT_GEO_PATH, DEFAULT_RESPONDENTS_PATH,
};
use displacement_server::{DataPaths, ServerConfig, load_dataset, run_server};
use displacement_survey::preprocess::DEFAULT_SURVEY_YEAR;

#[derive(Parser)]
#[command(
    name = "displacement_server",
    about = "Serve the household displacement dashboard"
)]
struct Cli {
    /// Respondent extract CSV
    #[arg(long, default_value = DEFAULT_RESPONDENTS_PATH)]
    data: PathBuf,

    /// Data dictionary CSV
    #[arg(long, default_value = DEFAULT_DICTIONARY_PATH)]
    dictionary: PathBuf,

    /// Per-state summary CSV
    #[arg(long, default_value = DEFAULT_GEO_PATH)]
    geo: PathBuf,

    /// Year the survey was fielded, used to turn birth years into ages
    #[arg(long, default_value_t = DEFAULT_SURVEY_YEAR)]
    survey_year: i64,

    /// Address to bind (falls back to `BIND_ADDR`)
    #[arg(long)]
    bind_addr: Option<String>,

    /// Port to listen on (falls back to `PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Log at debug level unless `RUST_LOG` says otherwise
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let bind_addr = self
            .bind_addr
            .clone()
            .or_else(|| std::env::var("BIND_ADDR").ok())
            .unwrap_or(defaults.bind_addr);
        let port = self
            .port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(defaults.port);
        ServerConfig { bind_addr, port }
    }
}

fn init_logger(debug: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.debug);

    let paths = DataPaths {
        respondents: cli.data.clone(),
        dictionary: cli.dictionary.clone(),
        geo: cli.geo.clone(),
    };

    log::info!("Loading dataset...");
    let dataset = load_dataset(&paths, cli.survey_year)?;

    run_server(cli.server_config(), dataset).await?;
    Ok(())
}
