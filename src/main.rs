use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pixvend::application::{MaintainStoreUseCase, SweepRequest, VendRequest, VendVariantUseCase};
use pixvend::domain::entities::Variant;
use pixvend::infrastructure::config::{SweepArgs, VendArgs};
use pixvend::infrastructure::{
    AppConfig, CliArgs, Command, ConfigFile, FileImageOwner, RasterTransformer, VariantStore,
    VendCache,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = ConfigFile::locate(args.config.as_deref())?.load()?;
    config.merge_with_args(args);
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<Arc<VariantStore>> {
    let store = VariantStore::new(
        config.storage.namespace.clone(),
        config.storage.retention,
        &config.store_roots(),
    )
    .wrap_err("failed to open variant store")?;
    Ok(Arc::new(store))
}

fn vend(config: &AppConfig, args: &VendArgs) -> Result<()> {
    let transformer = Arc::new(RasterTransformer::new(config.transform.blur_radius));
    let cache = if args.persist {
        VendCache::with_store(transformer, open_store(config)?)
    } else {
        VendCache::new(transformer)
    };

    let owner = FileImageOwner::new(args.owner, &args.input);
    let request = VendRequest::new(args.owner, &args.output)
        .with_size(args.size.variant_size())
        .with_variant(args.variant());

    let response = VendVariantUseCase::new(Arc::new(cache))
        .execute(&owner, &request)
        .wrap_err_with(|| format!("failed to vend {}", args.input.display()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn sweep_request(args: SweepArgs) -> Result<SweepRequest> {
    match (args.created_before_hours, args.accessed_before_hours) {
        (Some(hours), None) => Ok(SweepRequest::created_hours_ago(hours)),
        (None, Some(hours)) => Ok(SweepRequest::accessed_hours_ago(hours)),
        _ => Err(eyre!("exactly one sweep threshold is required")),
    }
}

fn maintenance(config: &AppConfig) -> Result<MaintainStoreUseCase> {
    Ok(MaintainStoreUseCase::new(open_store(config)?))
}

fn run(config: &AppConfig, command: &Command) -> Result<()> {
    match command {
        Command::Vend(args) => vend(config, args)?,
        Command::Path {
            key,
            modifier,
            size,
        } => {
            let path = maintenance(config)?.path(
                key,
                Variant::from_bits(*modifier),
                size.variant_size(),
            );
            println!("{}", path.display());
        }
        Command::Sweep(args) => {
            let removed = maintenance(config)?.sweep(sweep_request(*args)?);
            println!("removed {removed} records");
        }
        Command::Remove { key } => {
            let removed = maintenance(config)?.remove(key);
            println!("removed {removed} records");
        }
        Command::Clear => {
            let removed = maintenance(config)?.clear();
            println!("removed {removed} records");
        }
        Command::Stats => {
            println!(
                "{}",
                serde_json::to_string_pretty(&maintenance(config)?.summary())?
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = pixvend::VERSION, command = ?args.command, "Starting pixvend");

    run(&config, &args.command)
}
