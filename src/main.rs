mod cli;

use recast::config;
use recast::jobs::JobStatus;
use recast::registry::{FormatEntry, FormatRegistry};
use recast::service::ConvertService;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::collections::BTreeMap;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "recast=trace,recast_engines=debug".to_string()
        } else {
            "recast=info,recast_engines=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            to,
            from,
            output,
        } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(
                &input,
                &to,
                from.as_deref(),
                output.as_deref(),
                cli.config.as_deref(),
            ))
        }
        Commands::Formats { input } => list_formats(input.as_deref(), cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("recast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert_file(
    input: &std::path::Path,
    to: &str,
    from: Option<&str>,
    output: Option<&std::path::Path>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let config = config::load_config_or_default(config_path)?;

    // Verify input file exists
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    // Infer the source format from the extension unless given explicitly
    let from = match from {
        Some(f) => f.to_string(),
        None => input
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow::anyhow!("Cannot infer input format from {:?}, pass --from", input)
            })?,
    };

    let payload = tokio::fs::read(input).await?;

    let service = ConvertService::start(&config).await?;

    tracing::info!("Converting {:?} from {} to {}", input, from, to);
    let token = service.submit(payload.into(), &from, to).await?;
    println!("Job accepted: {}", token);

    // Poll until the job reaches a terminal state
    let mut last_progress = u8::MAX;
    let state = loop {
        let state = service.poll(&token).await?;
        if state.progress != last_progress {
            println!("  {} {}%", state.status, state.progress);
            last_progress = state.progress;
        }
        if state.status.is_terminal() {
            break state;
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    };

    if state.status == JobStatus::Failed {
        anyhow::bail!(
            "Conversion failed: {}",
            state.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    let artifact = service.fetch(&token).await?;
    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension(service.registry().resolve(to)?),
    };
    let bytes = artifact.read_to_end().await?;
    tokio::fs::write(&out_path, &bytes).await?;

    println!("\nConversion complete!");
    println!("Output: {:?} ({} bytes)", out_path, bytes.len());

    service.shutdown();
    Ok(())
}

fn list_formats(input: Option<&str>, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = match &config.formats.path {
        Some(path) => FormatRegistry::from_path(path)?,
        None => FormatRegistry::builtin()?,
    };

    match input {
        Some(name) => {
            let canonical = registry.resolve(name)?;
            let outputs = registry.list_outputs(canonical)?;
            println!("{} can be converted to:", canonical);
            for output in outputs {
                println!("  {}", output);
            }
        }
        None => {
            let mut by_family: BTreeMap<String, Vec<&FormatEntry>> = BTreeMap::new();
            for entry in registry.formats() {
                by_family
                    .entry(entry.family.to_string())
                    .or_default()
                    .push(entry);
            }

            for (family, mut entries) in by_family {
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                println!("{}:", family);
                for entry in entries {
                    print!("  {}", entry.name);
                    if !entry.aliases.is_empty() {
                        print!(" (aliases: {})", entry.aliases.join(", "));
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking conversion engines...\n");

    let tools = recast_engines::check_tools(&config.engines);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All conversion engines are available!");
    } else {
        println!("Some engines are missing. Image conversion works without them; document, audio and video conversions do not.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Output dir: {}", config.storage.output_dir.display());
            println!("  Retention: {}s", config.storage.retention_secs);
            println!("  Sweep interval: {}s", config.storage.sweep_interval_secs);
            println!("  Workers: {}", config.queue.worker_count());
            println!("  Queue capacity: {}", config.queue.capacity);
            println!("  Retry attempts: {}", config.retry.max_attempts);
            println!("  Engine timeout: {}s", config.engines.timeout_secs);
            match &config.formats.path {
                Some(path) => println!("  Format table: {}", path.display()),
                None => println!("  Format table: built-in"),
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Output dir: {}", config.storage.output_dir.display());
            println!("  Retention: {}s", config.storage.retention_secs);
        }
    }

    Ok(())
}
