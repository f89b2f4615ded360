use std::collections::HashMap;
use std::io::Write;

use clap::{Parser, Subcommand};
use cypher_relay::{config, server, Engine, SqliteStorage};

/// cypher-relay - a Cypher query engine over a SQLite-backed property graph
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file (created if missing)
    #[arg(long, global = true, default_value = "cypher_relay.sqlite")]
    db: String,

    /// Hop count used for an edge pattern like `-[*]-` with no explicit bound
    #[arg(long, global = true, default_value_t = 10)]
    default_max_hops: u32,

    /// Hard ceiling on recursive CTE depth
    #[arg(long, global = true, default_value_t = 100)]
    max_cte_depth: u32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one Cypher statement and print its result as JSON.
    Run {
        /// The Cypher statement to execute.
        query: String,
    },
    /// Start an interactive read-eval-print loop against the database.
    Shell,
    /// Serve the HTTP query endpoint.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        http_host: String,
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
    },
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            database_path: cli.db.clone(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            default_max_hops: cli.default_max_hops,
            max_cte_depth: cli.max_cte_depth,
            disable_query_cache: false,
            query_cache_capacity: 256,
            daemon: false,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cli_config: config::CliConfig = (&cli).into();

    match cli.command.unwrap_or(Command::Shell) {
        Command::Run { query } => {
            let config = match config::EngineConfig::from_cli(cli_config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            };
            let engine = build_engine(config);
            run_one(&engine, &query);
        }
        Command::Shell => {
            let config = match config::EngineConfig::from_cli(cli_config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            };
            let engine = build_engine(config);
            run_shell(&engine);
        }
        Command::Serve { http_host, http_port } => {
            cli_config.http_host = http_host;
            cli_config.http_port = http_port;
            let config = match config::EngineConfig::from_cli(cli_config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            };
            let addr = format!("{}:{}", config.http_host, config.http_port);
            let engine = build_engine(config);
            let router = server::build_router(engine);
            log::info!("cypher-relay listening on {}", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind HTTP listener");
            axum::serve(listener, router).await.expect("HTTP server failed");
        }
    }
}

fn build_engine(config: config::EngineConfig) -> Engine<SqliteStorage> {
    let storage = SqliteStorage::open(&config.database_path).unwrap_or_else(|e| {
        eprintln!("Failed to open database `{}`: {}", config.database_path, e);
        std::process::exit(1);
    });
    Engine::new(storage, config)
}

fn run_one(engine: &Engine<SqliteStorage>, query: &str) {
    let response = engine.execute(query, HashMap::new());
    println!("{}", serde_json::to_string_pretty(&response).unwrap());
}

fn run_shell(engine: &Engine<SqliteStorage>) {
    println!("cypher-relay v{} — type a Cypher statement, or `:quit` to exit\n", env!("CARGO_PKG_VERSION"));
    let stdin = std::io::stdin();
    loop {
        print!("cypher> ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":exit" {
            break;
        }
        let response = engine.execute(line, HashMap::new());
        match serde_json::to_string_pretty(&response) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("failed to serialize response: {}", e),
        }
    }
}
