//! Winding Tree read API CLI
//!
//! Serves list, detail, meta and schema reads over an entity index fixture.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use wt_read_api::{
    lookup, Gateway, GatewayConfig, GatewayError, ListQuery, MemoryIndex, Segment, AIRLINES,
    HOTELS,
};

#[derive(Parser)]
#[command(name = "wt-read-api")]
#[command(about = "Field-selectable reads over on-chain indexes and off-chain documents")]
#[command(version)]
struct Cli {
    /// Entity index fixture (JSON)
    #[arg(long, global = true, env = "WT_INDEX", default_value = "index.json")]
    index: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "WT_CONFIG")]
    config: Option<PathBuf>,

    /// Schema document, file path or URL (overrides the configuration)
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Prefix of generated next links (overrides the configuration)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log filter (e.g. warn, debug, wt_read_api=trace)
    #[arg(long, global = true, env = "WT_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Collection {
    Hotels,
    Airlines,
}

impl Collection {
    fn segment(self) -> &'static Segment {
        match self {
            Collection::Hotels => &HOTELS,
            Collection::Airlines => &AIRLINES,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List a page of entities
    List {
        #[arg(value_enum)]
        collection: Collection,

        /// Fields to return, comma-separated or repeated
        #[arg(long, short)]
        fields: Vec<String>,

        /// Page size
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<String>,

        /// Address of the first entity of the page
        #[arg(long)]
        start_with: Option<String>,
    },

    /// Resolve one entity
    Get {
        #[arg(value_enum)]
        collection: Collection,

        address: String,

        /// Fields to return, comma-separated or repeated
        #[arg(long, short)]
        fields: Vec<String>,
    },

    /// Show the storage references of one entity
    Meta {
        #[arg(value_enum)]
        collection: Collection,

        address: String,
    },

    /// Print the schema pruned for a field selection
    Schema {
        #[arg(value_enum)]
        collection: Collection,

        /// Fields to prune for, comma-separated or repeated
        #[arg(long, short)]
        fields: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), u8> {
    let config = load_config(cli.config.as_deref(), cli.schema, cli.base_url)?;
    let gateway = Gateway::new(config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match cli.command {
        Commands::List {
            collection,
            fields,
            limit,
            start_with,
        } => {
            let index = load_index(&cli.index)?;
            let segment = collection.segment();
            let query = ListQuery {
                fields: &fields,
                limit: limit.as_deref(),
                start_with: start_with.as_deref(),
            };
            let page = gateway
                .list(segment, index.collection(segment.collection), query)
                .await
                .map_err(report)?;
            print_json(&page, cli.pretty)
        }

        Commands::Get {
            collection,
            address,
            fields,
        } => {
            let index = load_index(&cli.index)?;
            let segment = collection.segment();
            let entity =
                lookup(segment, index.collection(segment.collection), &address).map_err(report)?;
            let detail = gateway
                .find(segment, entity, &fields)
                .await
                .map_err(report)?;
            for warning in &detail.warnings {
                eprintln!("Warning: {}", warning);
            }
            print_json(&detail.item, cli.pretty)
        }

        Commands::Meta {
            collection,
            address,
        } => {
            let index = load_index(&cli.index)?;
            let segment = collection.segment();
            let entity =
                lookup(segment, index.collection(segment.collection), &address).map_err(report)?;
            let meta = gateway.meta(segment, entity).await.map_err(report)?;
            print_json(&meta, cli.pretty)
        }

        Commands::Schema { collection, fields } => {
            let segment = collection.segment();
            match gateway.schema(segment, &fields).await.map_err(report)? {
                Some(schema) => print_json(&schema, cli.pretty),
                None => {
                    eprintln!("Error: {} data is not validated", segment.noun);
                    Err(2)
                }
            }
        }
    }
}

fn load_config(
    path: Option<&Path>,
    schema: Option<String>,
    base_url: Option<String>,
) -> Result<GatewayConfig, u8> {
    let mut config = match path {
        Some(path) => GatewayConfig::from_file(path).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => GatewayConfig::default(),
    };
    if let Some(schema) = schema {
        config.schema_path = schema;
    }
    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }
    Ok(config)
}

fn load_index(path: &Path) -> Result<MemoryIndex, u8> {
    MemoryIndex::load(path).map_err(|e| {
        eprintln!("Error loading index: {}", e);
        e.exit_code() as u8
    })
}

/// Print a request failure with its code and map it to an exit code.
fn report(e: GatewayError) -> u8 {
    eprintln!("Error [{}]: {}", e.code(), e);
    if let GatewayError::Validation { data, .. } = &e {
        eprintln!("  data: {}", data);
    }
    e.exit_code() as u8
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}
