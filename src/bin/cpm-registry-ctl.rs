use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-use the wire types from the lib
use cpm_registry::models::{
    DownloadResult, NewPackageVersion, PackageSummary, PackageVersion, PublishResult,
    SearchResult, VersionsResult,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BIN_NAME: &str = env!("CARGO_BIN_NAME");
const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:8080";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = BIN_NAME)]
#[command(about = "Search, download and publish packages in a CPM registry", long_about = None)]
#[command(version = VERSION)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Registry base URL (defaults to $CPM_REGISTRY_URL, then http://127.0.0.1:8080)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Color output mode (also respects NO_COLOR and FORCE_COLOR env vars)
    #[arg(
        long,
        visible_alias = "colour",
        value_enum,
        default_value = "auto",
        global = true
    )]
    color: ColorMode,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search packages by name or description (lists everything without a query)
    Search {
        /// Substring to look for (case-sensitive)
        query: Option<String>,
        /// Output as JSON instead of table
        #[arg(short = 'j', long)]
        json: bool,
    },
    /// List the published versions of a package
    Versions {
        /// Package name
        name: String,
        /// Output as JSON instead of table
        #[arg(short = 'j', long)]
        json: bool,
    },
    /// Show the full metadata of a package version
    Info {
        /// Package name
        name: String,
        /// Package version
        version: String,
        /// Output as JSON
        #[arg(short = 'j', long)]
        json: bool,
    },
    /// Request a package download (counts towards the download total)
    Download {
        /// Package name
        name: String,
        /// Package version
        version: String,
        /// Also fetch the archive and write it to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Publish package metadata
    Publish {
        /// Package name
        name: String,
        /// Package version
        version: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        author: String,
        #[arg(long, default_value = "")]
        homepage: String,
        #[arg(long, default_value = "")]
        repository: String,
        #[arg(short, long, default_value = "")]
        license: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cpm_registry_ctl=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("{BIN_NAME} version {VERSION}");

    let args = Args::parse();

    configure_colors(args.color);

    let base_url = args.url.unwrap_or_else(|| {
        std::env::var("CPM_REGISTRY_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string())
    });

    let client = reqwest::Client::new();

    let result = match args.command {
        Commands::Search { query, json } => {
            run_search(&client, &base_url, query.unwrap_or_default(), json).await
        }
        Commands::Versions { name, json } => run_versions(&client, &base_url, &name, json).await,
        Commands::Info {
            name,
            version,
            json,
        } => run_info(&client, &base_url, &name, &version, json).await,
        Commands::Download {
            name,
            version,
            output,
        } => run_download(&client, &base_url, &name, &version, output).await,
        Commands::Publish {
            name,
            version,
            description,
            author,
            homepage,
            repository,
            license,
        } => {
            let record = NewPackageVersion {
                name,
                version,
                description,
                author,
                homepage,
                repository,
                license,
            };
            run_publish(&client, &base_url, record).await
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        process::exit(1);
    }
}

fn configure_colors(mode: ColorMode) {
    // Check environment variables first (they take precedence)
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
        return;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
        return;
    }

    match mode {
        ColorMode::Auto => {}
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
    }
}

/// Build a registry URL from path segments, percent-encoding each one
fn endpoint(base_url: &str, segments: &[&str]) -> CliResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| format!("Invalid registry URL: {base_url}"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Where a version's archive bytes are served, under the registry base URL
fn archive_endpoint(base_url: &str, name: &str, version: &str) -> CliResult<reqwest::Url> {
    endpoint(base_url, &["packages", name, version, "archive"])
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> CliResult<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("{action} failed - HTTP {status}: {body}").into());
    }

    Ok(response.json::<T>().await?)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_search(
    client: &reqwest::Client,
    base_url: &str,
    query: String,
    json_output: bool,
) -> CliResult<()> {
    let mut url = endpoint(base_url, &["packages", "search"])?;
    if !query.is_empty() {
        url.query_pairs_mut().append_pair("q", &query);
    }

    let response = client.get(url).send().await?;
    let result: SearchResult = parse_response(response, "Search").await?;

    if json_output {
        return print_json(&result);
    }

    if result.packages.is_empty() {
        println!("No packages found matching '{}'", result.query);
        return Ok(());
    }

    print_search_table(&result.packages);
    println!();
    println!("{} package(s)", result.total.to_string().bold());
    Ok(())
}

fn print_search_table(packages: &[PackageSummary]) {
    println!(
        "{}",
        format!(
            "{:<20} {:<10} {:<40} {:>10}  {}",
            "NAME", "VERSION", "DESCRIPTION", "DOWNLOADS", "AUTHOR"
        )
        .bold()
    );

    for pkg in packages {
        println!(
            "{} {:<10} {:<40} {:>10}  {}",
            format!("{:<20}", pkg.name).cyan(),
            pkg.latest_version,
            truncate(&pkg.description, 40),
            pkg.downloads,
            pkg.author
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(width.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

async fn run_versions(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    json_output: bool,
) -> CliResult<()> {
    let url = endpoint(base_url, &["packages", name, "versions"])?;
    let response = client.get(url).send().await?;
    let result: VersionsResult = parse_response(response, "Listing versions").await?;

    if json_output {
        return print_json(&result);
    }

    if result.versions.is_empty() {
        println!("No versions published for '{}'", result.package);
        return Ok(());
    }

    println!("{}", format!("{:<20} {}", "VERSION", "PUBLISHED").bold());
    for entry in &result.versions {
        println!(
            "{} {}",
            format!("{:<20}", entry.version).green(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

async fn run_info(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    version: &str,
    json_output: bool,
) -> CliResult<()> {
    let url = endpoint(base_url, &["packages", name, version, "metadata"])?;
    let response = client.get(url).send().await?;
    let record: PackageVersion = parse_response(response, "Fetching metadata").await?;

    if json_output {
        return print_json(&record);
    }

    println!("{} {}", record.name.bold(), record.version.green());
    let fields = [
        ("Description", record.description.as_str()),
        ("Author", record.author.as_str()),
        ("Homepage", record.homepage.as_str()),
        ("Repository", record.repository.as_str()),
        ("License", record.license.as_str()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            println!("  {:<12} {}", format!("{label}:"), value);
        }
    }
    println!("  {:<12} {}", "Published:", record.created_at.to_rfc3339());
    println!("  {:<12} {}", "Downloads:", record.downloads);
    Ok(())
}

async fn run_download(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    version: &str,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let url = endpoint(base_url, &["packages", name, version])?;
    let response = client.get(url).send().await?;
    let result: DownloadResult = parse_response(response, "Download").await?;

    println!(
        "{} {} {}: {}",
        result.name.bold(),
        result.version,
        result.status.green(),
        result.download_url
    );

    let Some(output) = output else {
        return Ok(());
    };

    let archive_url = archive_endpoint(base_url, &result.name, &result.version)?;
    tracing::info!(url = %archive_url, "Fetching archive");
    let response = client.get(archive_url).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        return Err(format!("Fetching archive failed - HTTP {status}").into());
    }
    let data = response.bytes().await?;
    tokio::fs::write(&output, &data).await?;

    println!(
        "{} Saved {} bytes to {}",
        "✓".green().bold(),
        data.len(),
        output.display()
    );
    Ok(())
}

async fn run_publish(
    client: &reqwest::Client,
    base_url: &str,
    record: NewPackageVersion,
) -> CliResult<()> {
    let url = endpoint(base_url, &["packages", "upload"])?;
    tracing::info!(package = %record.name, version = %record.version, "Publishing to {url}");

    let response = client.post(url).json(&record).send().await?;
    let result: PublishResult = parse_response(response, "Publish").await?;

    println!(
        "{} {} {} - {}",
        "✓".green().bold(),
        record.name.bold(),
        record.version,
        result.message
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = endpoint("http://localhost:8080", &["packages", "my pkg", "1.0.0"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/packages/my%20pkg/1.0.0");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = endpoint("http://localhost:8080/registry/", &["packages", "search"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/registry/packages/search");
    }

    #[test]
    fn test_archive_endpoint_keeps_base_path() {
        let url = archive_endpoint("http://localhost:8080/registry", "libmath", "1.1.0").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/registry/packages/libmath/1.1.0/archive"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
