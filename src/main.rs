use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::WriteStyle;
use log::{error, info, warn};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use subscout::cli::Args;
use subscout::config::{default_config_path, ProviderConfig};
use subscout::engine::Finder;
use subscout::output::OutputWriter;
use subscout::sources::registry;
use subscout::types::{EnumerationStats, OutputFormat, SessionConfig, SourceResult};
use subscout::utils::is_valid_domain;

const BANNER: &str = r#"
           _                               _
 ___ _   _| |__  ___  ___ ___  _   _| |_
/ __| | | | '_ \/ __|/ __/ _ \| | | | __|
\__ \ |_| | |_) \__ \ (_| (_) | |_| | |_
|___/\__,_|_.__/|___/\___\___/ \__,_|\__|

      Fast Passive Subdomain Enumeration
"#;

fn print_banner() {
    eprintln!("{}", BANNER);
    eprintln!(
        "      v{} ({} built {})\n",
        subscout::VERSION,
        option_env!("GIT_HASH").unwrap_or("unknown"),
        option_env!("BUILD_TIME").unwrap_or("unknown"),
    );
}

fn init_logging(args: &Args) {
    let style = if args.no_color { WriteStyle::Never } else { WriteStyle::Auto };

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .write_style(style)
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    print_banner();

    let config = load_provider_config(&args)?;

    if args.list_sources {
        list_sources(&config);
        return Ok(());
    }

    let domains = valid_domains(&args.domain);
    if domains.is_empty() {
        error!("No valid domain provided. Use -d <domain>");
        std::process::exit(1);
    }

    let session = SessionConfig {
        timeout: std::time::Duration::from_secs(args.timeout.max(1)),
        proxy: args.proxy.clone(),
        ..SessionConfig::default()
    };
    let options = config.finder_options(&args.use_sources, &args.exclude_sources, session);
    let finder = Arc::new(Finder::new(options).context("Failed to build the finder")?);

    let sources = finder.source_names();
    if sources.is_empty() {
        bail!("No sources selected");
    }
    info!("Enumerating with {} sources: {}", sources.len(), sources.join(", "));

    let format = OutputFormat::infer(args.output.as_deref(), args.json);
    let mut writer = match &args.output {
        Some(path) => OutputWriter::file(path, format)?,
        None => OutputWriter::stdout(format),
    };

    {
        let finder = finder.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping sources");
                finder.cancel();
            }
        });
    }

    let mut total = 0;
    for domain in &domains {
        let stats = enumerate(&finder, domain, &mut writer).await?;
        total += stats.unique_subdomains;
        info!(
            "{}: {} unique subdomains, {} source errors, {:.2}s",
            domain,
            stats.unique_subdomains,
            stats.errors,
            stats.duration.as_secs_f64()
        );
    }

    writer.flush()?;
    if let Some(path) = &args.output {
        info!("{} results written to {}", total, path.display());
    }

    Ok(())
}

async fn enumerate(
    finder: &Finder,
    domain: &str,
    writer: &mut OutputWriter,
) -> Result<EnumerationStats> {
    let started = Instant::now();
    let mut stats = EnumerationStats {
        unique_subdomains: 0,
        errors: 0,
        duration: Default::default(),
    };

    let mut results = finder.find(domain);
    while let Some(event) = results.recv().await {
        match event {
            SourceResult::Subdomain { value, source } => {
                writer.write_host(domain, &value, &source)?;
                stats.unique_subdomains += 1;
            }
            SourceResult::Error { source, error } => {
                warn!("[{}] {}", source, error);
                stats.errors += 1;
            }
        }
    }

    stats.duration = started.elapsed();
    Ok(stats)
}

/// `-c` must exist; the default location gets a template on first run.
fn load_provider_config(args: &Args) -> Result<ProviderConfig> {
    if let Some(path) = &args.config_path {
        if !path.exists() {
            bail!("Configuration file {} does not exist", path.display());
        }
        return ProviderConfig::load(path).with_context(|| format!("Failed to load {}", path.display()));
    }

    let path = default_config_path();
    if !path.exists() {
        match ProviderConfig::default().save(&path) {
            Ok(()) => info!("Provider config template written to {}", path.display()),
            Err(e) => warn!("Could not write provider config template: {}", e),
        }
    }
    ProviderConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

fn valid_domains(raw: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    for domain in raw {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if !is_valid_domain(&domain) {
            warn!("Skipping invalid domain: {:?}", domain);
            continue;
        }
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    domains
}

fn list_sources(config: &ProviderConfig) {
    let configured = config.credentials();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let _ = writeln!(out, "Available sources ({}):\n", registry().len());
    for descriptor in registry() {
        let marker = if descriptor.needs_key { " *" } else { "" };
        let keys = match configured.get(descriptor.name) {
            Some(pool) => format!(" ({} key(s))", pool.len()),
            None => String::new(),
        };
        let _ = writeln!(out, "  {}{}{}", descriptor.name, marker, keys);
    }
    let _ = writeln!(out, "\n* = Requires API key");
    let _ = writeln!(out, "To configure API keys, edit: {}", default_config_path().display());
}
