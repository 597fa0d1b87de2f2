use std::{env, path::PathBuf, process::ExitCode};

use log::{error, info};
use tablesync::{
    db,
    models::{
        connections::{ConnectionConfig, SyncOptions},
        definition::load_definitions,
    },
    sync::validator::validate_definition,
    SchemaSync,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let config = ConnectionConfig::from_env()?;
    let mut options = SyncOptions::from_env();
    if env::args().skip(1).any(|arg| arg == "--plan") {
        options.plan = true;
    }
    let schema_dir = PathBuf::from(env::var("SCHEMA_DIR").unwrap_or_else(|_| "schema".to_string()));

    let definitions = load_definitions(&schema_dir)?;
    let mut valid = Vec::new();
    let mut invalid = 0;
    for def in definitions {
        let errors = validate_definition(&def, config.db_type);
        if errors.is_empty() {
            valid.push(def);
        } else {
            invalid += 1;
            for e in errors {
                error!("{}", e);
            }
        }
    }
    info!(
        "{} table definitions loaded from {} ({} invalid, {} mode)",
        valid.len() + invalid,
        schema_dir.display(),
        invalid,
        if options.plan { "plan" } else { "apply" }
    );

    let client = db::connect(&config).await?;
    let summary = SchemaSync::new(client, options).sync_all(&valid).await;
    info!("{}", summary);

    Ok(summary.is_success() && invalid == 0)
}
