//! Command-line interface for the response cache
//!
//! Handles argument parsing with clap and runs each subcommand against a
//! filesystem-backed cache store. JSON goes to stdout, logs to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::api::{
    ApiError, CommLinkClient, VehicleClient, DEFAULT_LOCALE, DEFAULT_NEWS_LIMIT, VEHICLE_API_URL,
};
use crate::cache::{CacheStore, Lookup};
use crate::config::{CacheConfig, NEWS_TTL};
use crate::error::ConfigError;

/// Error types for CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    /// The payload given to `set` is not JSON
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Expiring response cache for news and vehicle lookups
#[derive(Parser, Debug)]
#[command(name = "respcache")]
#[command(about = "Expiring on-disk cache for news feed and vehicle lookups")]
#[command(version)]
pub struct Cli {
    /// Application data directory; the cache lives in its `cache/` subdirectory
    #[arg(long, global = true, value_name = "DIR", env = "RESPCACHE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Root URL of the vehicle API
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "RESPCACHE_VEHICLE_API_URL",
        default_value = VEHICLE_API_URL
    )]
    pub vehicle_api_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a cached payload if it is not older than --max-age-ms
    Get {
        key: String,
        /// Maximum age in milliseconds
        #[arg(long, default_value_t = NEWS_TTL.as_millis() as u64)]
        max_age_ms: u64,
    },
    /// Store a JSON payload under a key
    Set { key: String, json: String },
    /// Show a cached record's timestamp and age, even if stale
    Inspect { key: String },
    /// Show the latest comm-link news
    News {
        #[arg(long, default_value_t = DEFAULT_NEWS_LIMIT)]
        limit: usize,
    },
    /// Search and show vehicles
    Vehicles {
        #[command(subcommand)]
        command: VehicleCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum VehicleCommand {
    /// Search vehicles by name (at least 3 characters)
    Search { term: String },
    /// Show details for one or more vehicles
    Show {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long, default_value = DEFAULT_LOCALE)]
        locale: String,
    },
}

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Nothing usable was cached for the requested key
    Miss,
}

/// Parses a `set` payload argument
pub fn parse_payload(s: &str) -> Result<Value, CliError> {
    Ok(serde_json::from_str(s)?)
}

/// Runs `cli`, writing results to `out`
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<Outcome, CliError> {
    let config = CacheConfig::resolve(cli.data_dir)?;
    let store = config.open_store();

    match cli.command {
        Command::Get { key, max_age_ms } => {
            match store.get::<Value>(&key, Duration::from_millis(max_age_ms)).await {
                Lookup::Found(data) => {
                    print_json(out, &data)?;
                    Ok(Outcome::Done)
                }
                Lookup::Absent => Ok(Outcome::Miss),
            }
        }
        Command::Set { key, json } => {
            let payload = parse_payload(&json)?;
            store.set(&key, &payload).await;
            Ok(Outcome::Done)
        }
        Command::Inspect { key } => inspect(&store, &key, out).await,
        Command::News { limit } => {
            let items = CommLinkClient::new(store).fetch_comm_links(limit).await?;
            print_json(out, &items)?;
            Ok(Outcome::Done)
        }
        Command::Vehicles { command } => {
            let client = VehicleClient::with_base_url(store, cli.vehicle_api_url);
            run_vehicles(client, command, out).await
        }
    }
}

async fn inspect<W: Write>(store: &CacheStore, key: &str, out: &mut W) -> Result<Outcome, CliError> {
    let Some(record) = store.inspect(key).await else {
        return Ok(Outcome::Miss);
    };

    let now = Utc::now().timestamp_millis();
    let written = Utc
        .timestamp_millis_opt(record.timestamp)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| record.timestamp.to_string());

    writeln!(out, "file: {}", store.path_for(key).display())?;
    writeln!(out, "written: {} ({})", written, record.age_display(now))?;
    print_json(out, &record.data)?;
    Ok(Outcome::Done)
}

async fn run_vehicles<W: Write>(
    client: VehicleClient,
    command: VehicleCommand,
    out: &mut W,
) -> Result<Outcome, CliError> {
    match command {
        VehicleCommand::Search { term } => {
            let results = client.search(&term).await?;
            print_json(out, &results)?;
        }
        VehicleCommand::Show { names, locale } => {
            let lookups = names.iter().map(|name| client.details(name, &locale));
            let mut first_error = None;

            for (name, result) in names.iter().zip(join_all(lookups).await) {
                match result {
                    Ok(details) => print_json(out, &details)?,
                    Err(e) => {
                        warn!(name = %name, error = %e, "Failed to load vehicle details");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }

            if let Some(e) = first_error {
                return Err(e.into());
            }
        }
    }
    Ok(Outcome::Done)
}

fn print_json<W: Write, T: serde::Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(|e| CliError::Output(e.into()))?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_in(dir: &TempDir, args: &[&str]) -> Cli {
        let mut argv = vec!["respcache", "--data-dir"];
        argv.push(dir.path().to_str().unwrap());
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_parse_get_defaults_to_one_hour() {
        let cli = Cli::parse_from(["respcache", "get", "commlinks_10"]);
        assert_eq!(
            cli.command,
            Command::Get {
                key: "commlinks_10".to_string(),
                max_age_ms: 3_600_000,
            }
        );
    }

    #[test]
    fn test_parse_data_dir_after_subcommand() {
        let cli = Cli::parse_from(["respcache", "inspect", "x", "--data-dir", "/tmp/blh"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/blh")));
    }

    #[test]
    fn test_parse_vehicle_show_defaults_locale() {
        let cli = Cli::parse_from(["respcache", "vehicles", "show", "Cutlass Black", "Aurora MR"]);
        assert_eq!(
            cli.command,
            Command::Vehicles {
                command: VehicleCommand::Show {
                    names: vec!["Cutlass Black".to_string(), "Aurora MR".to_string()],
                    locale: DEFAULT_LOCALE.to_string(),
                },
            }
        );
    }

    #[test]
    fn test_parse_vehicle_show_requires_name() {
        assert!(Cli::try_parse_from(["respcache", "vehicles", "show"]).is_err());
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload("42").unwrap(), Value::from(42));
        let err = parse_payload("{items:").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON payload"));
    }

    #[tokio::test]
    async fn test_set_then_get_prints_payload() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let mut out = Vec::new();

        let outcome = run(cli_in(&dir, &["set", "commlinks_10", r#"{"items":[1,2,3]}"#]), &mut out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Done);

        let outcome = run(cli_in(&dir, &["get", "commlinks_10"]), &mut out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Done);

        let printed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed, serde_json::json!({"items": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn test_get_missing_key_is_a_miss() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let mut out = Vec::new();

        let outcome = run(cli_in(&dir, &["get", "nothing"]), &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::Miss);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_inspect_shows_age() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let mut out = Vec::new();
        run(cli_in(&dir, &["set", "x", "42"]), &mut out).await.unwrap();

        let outcome = run(cli_in(&dir, &["inspect", "x"]), &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::Done);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("x.json"));
        assert!(text.contains("just now"));
        assert!(text.trim_end().ends_with("42"));
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_json() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let mut out = Vec::new();

        let result = run(cli_in(&dir, &["set", "x", "not json"]), &mut out).await;

        assert!(matches!(result, Err(CliError::InvalidJson(_))));
        assert!(!dir.path().join("cache").join("x.json").exists());
    }

    #[tokio::test]
    async fn test_short_vehicle_search_fails_before_network() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let mut out = Vec::new();

        let result = run(cli_in(&dir, &["vehicles", "search", "Cu"]), &mut out).await;

        assert!(matches!(result, Err(CliError::Api(ApiError::QueryTooShort(_)))));
    }

    #[test]
    fn test_parse_vehicle_api_url_defaults_to_wiki() {
        let cli = Cli::parse_from(["respcache", "news"]);
        assert_eq!(cli.vehicle_api_url, VEHICLE_API_URL);
    }

    #[tokio::test]
    async fn test_vehicle_show_prints_cached_and_reports_failure() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let details = serde_json::json!({"data": {"name": "Cutlass Black", "mass": 53000}});
        CacheConfig::resolve(Some(dir.path().to_path_buf()))
            .unwrap()
            .open_store()
            .set(&VehicleClient::details_key("Cutlass Black", DEFAULT_LOCALE), &details)
            .await;
        let mut out = Vec::new();

        // Nothing listens on the discard port, so the uncached name fails fast
        let result = run(
            cli_in(
                &dir,
                &[
                    "--vehicle-api-url",
                    "http://127.0.0.1:9/api/",
                    "vehicles",
                    "show",
                    "Unknown Ship",
                    "Cutlass Black",
                ],
            ),
            &mut out,
        )
        .await;

        assert!(matches!(result, Err(CliError::Api(ApiError::NetworkError(_)))));
        let printed: Value = serde_json::from_slice(&out).expect("cached details should be printed");
        assert_eq!(printed, details);
        assert!(!dir
            .path()
            .join("cache")
            .join("vehicle_details_Unknown_Ship_en_EN.json")
            .exists());
    }
}
