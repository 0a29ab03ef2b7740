//! Writes the weather station's OpenAPI document.
//!
//! Usage:
//!   cargo run --bin generate_openapi > openapi.json
//!   cargo run --bin generate_openapi -- --output openapi.json

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
    process,
};

use utoipa::OpenApi;
use weather_station::api::handlers::ApiDoc;

fn main() {
    let json = match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to serialise OpenAPI document: {e}");
            process::exit(1);
        }
    };

    // `--output <path>` writes to a file instead of stdout.
    let args: Vec<String> = env::args().collect();
    let output_path: Option<PathBuf> = args
        .windows(2)
        .find(|w| w[0] == "--output")
        .map(|w| PathBuf::from(&w[1]));

    let result = match &output_path {
        Some(path) => fs::write(path, &json),
        None => io::stdout().write_all(json.as_bytes()),
    };
    if let Err(e) = result {
        match output_path {
            Some(path) => eprintln!("Error writing to {}: {e}", path.display()),
            None => eprintln!("Error writing to stdout: {e}"),
        }
        process::exit(1);
    }
    if let Some(path) = output_path {
        eprintln!("OpenAPI document written to {}", path.display());
    }
}
