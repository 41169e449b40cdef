//! bindsetup - main entry point
//!
//! Parses the command line, sets up logging and child-process cleanup, then
//! dispatches to the library.

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, error, info, warn};

use bindsetup::cli::{Cli, Commands, ConfigSource};
use bindsetup::command_runner::SystemExecutor;
use bindsetup::files::{read_existing_serial, ArtifactWriter, TargetRoot};
use bindsetup::provisioner::Provisioner;
use bindsetup::zone::{RenderedFiles, Serial};
use bindsetup::{enable_dry_run, process_guard, render_next_steps, sanity, ProvisionConfig};

/// Initialize the tracing subscriber; RUST_LOG overrides the default level
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.dry_run {
        enable_dry_run();
        info!("Dry-run mode enabled");
    }

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let _guard = process_guard::ProcessGuard::new();
    debug!("Signal handlers initialized");

    let root = TargetRoot::new(&cli.root);

    match cli.command {
        Commands::Setup { source } => setup(&source, root, cli.dry_run, cli.skip_root_check),
        Commands::Render { source, out } => render(&source, root, out),
        Commands::Check { source } => check(&source, root),
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            let loaded = ProvisionConfig::load_from_file(&config)?;
            loaded
                .validate()
                .with_context(|| format!("{} is not valid", config.display()))?;
            println!("✓ Configuration file is valid: {}", config.display());
            Ok(())
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            ProvisionConfig::default()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Default configuration written to {}", path.display());
            Ok(())
        }
        Commands::NextSteps { source } => {
            let config = load_config(&source)?;
            print!("{}", render_next_steps(&config));
            Ok(())
        }
    }
}

fn load_config(source: &ConfigSource) -> Result<ProvisionConfig> {
    let config = ProvisionConfig::resolve(source.config.as_deref(), &source.overrides())?;
    config.validate()?;
    Ok(config)
}

fn setup(source: &ConfigSource, root: TargetRoot, dry_run: bool, skip_root: bool) -> Result<()> {
    let config = load_config(source)?;
    println!("🚀 Starting DNS setup for {}", config.domain);

    // Writing into a staging tree changes nothing on the host
    if !root.is_system_root() {
        info!(
            "Staged root {}: files only, host commands are not run",
            root.path().display()
        );
    } else if !dry_run {
        sanity::run_preflight_checks(skip_root)?;
    }

    let writer = ArtifactWriter::new(root, &config, dry_run);
    let mut provisioner = Provisioner::new(config.clone(), SystemExecutor, writer)
        .with_progress(|line| println!("{}", line));

    let report = provisioner.run()?;
    info!(
        "Run finished: serial {}, {} command(s), firewall opened: {}",
        report.serial,
        report.commands.len(),
        report.firewall_opened
    );

    print!("{}", render_next_steps(&config));
    Ok(())
}

fn render(source: &ConfigSource, root: TargetRoot, out: Option<std::path::PathBuf>) -> Result<()> {
    let config = load_config(source)?;
    // The serial continues from whatever zone the output would replace
    let target = out.map(TargetRoot::new);
    let serial = Serial::next(
        Local::now().date_naive(),
        read_existing_serial(target.as_ref().unwrap_or(&root), &config),
    );
    let rendered = RenderedFiles::render(&config, serial);

    match target {
        Some(target) => {
            let writer = ArtifactWriter::new(target, &config, false);
            for (path, contents) in rendered.iter() {
                writer.write(path, contents)?;
                println!("✅ {}", writer.root().resolve(path).display());
            }
        }
        None => {
            for (path, contents) in rendered.iter() {
                println!("// ==> {} <==", path.display());
                println!("{}", contents);
            }
        }
    }
    Ok(())
}

fn check(source: &ConfigSource, root: TargetRoot) -> Result<()> {
    let config = load_config(source)?;
    let writer = ArtifactWriter::new(root, &config, true);
    let mut provisioner = Provisioner::new(config, SystemExecutor, writer)
        .with_progress(|line| println!("{}", line));
    provisioner.check_only()?;
    println!("✓ BIND configuration and zone are valid");
    Ok(())
}
