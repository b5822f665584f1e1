use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{debug, info};

use oai_pmh::cli::{Cli, Command, VerbosityLevel};
use oai_pmh::config::{Config, ConfigManager};
use oai_pmh::files;
use oai_pmh::output::Output;
use oai_pmh::request::{RequestParams, validate_request};
use oai_pmh::schema::SchemaRegistry;
use oai_pmh::verbs::{ErrorResponse, OaiResponse};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    env_logger::Builder::new()
        .filter_level(cli.verbosity().level_filter())
        .parse_default_env()
        .init();

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Runs one subcommand. `Ok(false)` means the input was rejected.
async fn run(cli: &Cli) -> Result<bool> {
    let config = ConfigManager::load_config(cli)
        .await
        .context("Failed to load configuration")?;
    debug!("Effective configuration: {:?}", config);

    let verbosity = cli.verbosity();
    let output = Output::new(verbosity, config.output.format);

    match &cli.command {
        Command::Identify {
            validate,
            output: destination,
        } => identify(&config, *validate, destination.as_deref(), verbosity).await,
        Command::CheckRequest { params } => check_request(&config, &output, params),
        Command::Validate { path, schema } => {
            let schema = schema.as_deref().or(config.schema.path.as_deref());
            validate(&config, &output, path, schema).await
        }
        Command::Decode { path } => {
            let response = files::load_any(path)
                .await
                .with_context(|| format!("Failed to decode {}", path.display()))?;
            println!("{}", output.format_decoded(&response)?);
            Ok(true)
        }
    }
}

async fn identify(
    config: &Config,
    validate: bool,
    destination: Option<&Path>,
    verbosity: VerbosityLevel,
) -> Result<bool> {
    let identify = config
        .repository
        .identify()
        .context("Invalid repository configuration")?;

    let xml = if validate || config.schema.validate_responses {
        let registry = SchemaRegistry::new(config.schema.cache_capacity);
        let schema = registry.resolve(config.schema.path.as_deref()).await?;
        identify
            .encode_validated(&schema)
            .context("Identify response failed schema validation")?
    } else {
        identify.encode()?
    };

    match destination {
        Some(path) => {
            files::write_document(path, &xml)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Identify response written to {}", path.display());
            if verbosity > VerbosityLevel::Quiet {
                println!("Wrote {}", path.display());
            }
        }
        None => println!("{}", xml),
    }
    Ok(true)
}

fn check_request(config: &Config, output: &Output, pairs: &[(String, String)]) -> Result<bool> {
    let base_url = config.repository.base_url.as_str();

    let outcome = RequestParams::from_pairs(pairs.iter().cloned())
        .and_then(|params| validate_request(&params).map(|verb| (verb, params)));

    match outcome {
        Ok((verb, params)) => {
            println!("{}", output.format_accepted(verb, &params));
            Ok(true)
        }
        Err(err) => {
            let params = RequestParams::from_iter(pairs.iter().cloned());
            let document = ErrorResponse::from_request_error(base_url, &params, &err).encode()?;
            println!("{}", output.format_rejected(&err, &document));
            Ok(false)
        }
    }
}

async fn validate(
    config: &Config,
    output: &Output,
    path: &Path,
    schema: Option<&Path>,
) -> Result<bool> {
    let registry = SchemaRegistry::new(config.schema.cache_capacity);
    let validator = registry.resolve(schema).await?;

    let xml = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path.display().to_string();
    let result = validator
        .check(&xml, Some(&name))
        .with_context(|| format!("Failed to validate {}", name))?;

    println!("{}", output.format_validation(path, &result));
    Ok(result.is_valid())
}
