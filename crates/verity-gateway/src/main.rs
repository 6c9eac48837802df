//! Verity Gateway CLI
//!
//! Starts the Gateway HTTP server for OIDC login and the backend proxy.

use std::env;
use std::process;
use verity_gateway::{config::GatewayConfig, start_server, GatewayError};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), GatewayError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        // Load from specified config file
        GatewayConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        // Fall back to environment variables, then to the test defaults
        match GatewayConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: environment configuration incomplete ({})", e);
                eprintln!("Using default test configuration");
                eprintln!("Usage: verity-gateway --config <path-to-config.toml>");
                eprintln!();
                GatewayConfig::default_test_config()
            }
        }
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Verity Gateway - OIDC Login and Backend Proxy");
    println!();
    println!("USAGE:");
    println!("    verity-gateway --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    Without --config, configuration is read from:");
    println!("    - WLD_CLIENT_ID / WLD_CLIENT_SECRET: OIDC client credentials");
    println!("    - AUTH_CALLBACK_URL: registered redirect URI");
    println!("    - FRONTEND_URL: post-login redirect target");
    println!("    - AUTH_SECRET: session cookie signing secret");
    println!("    - VERITY_API_BASE_URL: fact-check backend base URL");
    println!("    - FACT_CHECK_API_KEY: server-held key for the proxy route");
    println!();
}
