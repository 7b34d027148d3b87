use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::debug;
use media_renamer_core::{
    app_paths, apply_plan, compute_source_id, extract_device_identifier, find_mtp_mount,
    generate_plan, layout_for, load_config, parse_default_time, rename, save_config, undo_last,
    AndroidFolder, AppConfig, ApplyOptions, CollisionPolicy, LayoutKind, PlanOptions,
    RenameOptions, RenamePlan, RenameResult, SkipReason, TransferMode,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-renamer-cli")]
#[command(about = "Renames phone camera and WhatsApp media files to timestamp names")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the standardized name for each file name without touching files
    Name(NameArgs),
    Rename(RenameArgs),
    /// Show the mounted MTP device and its media folders
    Device,
    Undo,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the default config file
    Init,
}

#[derive(Debug, Args)]
struct NamingArgs {
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,
    /// Device identifier hashed into archive names
    #[arg(long)]
    source_id: Option<String>,
    /// Time used for names without one, as HHMMSS
    #[arg(long)]
    default_time: Option<String>,
}

#[derive(Debug, Args)]
struct NameArgs {
    #[arg(required = true)]
    names: Vec<String>,
    #[command(flatten)]
    naming: NamingArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[arg(long, conflicts_with = "from_device")]
    input: Option<String>,
    /// Read from this folder of the first mounted MTP device
    #[arg(long, value_enum)]
    from_device: Option<FolderArg>,
    #[arg(long)]
    output_dir: Option<String>,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[command(flatten)]
    naming: NamingArgs,
    #[arg(long = "ext")]
    extensions: Vec<String>,
    #[arg(long, value_enum)]
    on_collision: Option<CollisionArg>,
    #[arg(long, default_value_t = false)]
    copy: bool,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Flat,
    Archive,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CollisionArg {
    Skip,
    Suffix,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FolderArg {
    Dcim,
    Camera,
    WhatsappImages,
    WhatsappVideos,
}

impl From<LayoutArg> for LayoutKind {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Flat => LayoutKind::Flat,
            LayoutArg::Archive => LayoutKind::Archive,
        }
    }
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(value: CollisionArg) -> Self {
        match value {
            CollisionArg::Skip => CollisionPolicy::Skip,
            CollisionArg::Suffix => CollisionPolicy::Suffix,
        }
    }
}

impl From<FolderArg> for AndroidFolder {
    fn from(value: FolderArg) -> Self {
        match value {
            FolderArg::Dcim => AndroidFolder::Dcim,
            FolderArg::Camera => AndroidFolder::Camera,
            FolderArg::WhatsappImages => AndroidFolder::WhatsAppImages,
            FolderArg::WhatsappVideos => AndroidFolder::WhatsAppVideos,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Name(args) => cmd_name(args),
        Commands::Rename(args) => cmd_rename(args),
        Commands::Device => cmd_device(),
        Commands::Undo => cmd_undo(),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn rename_options(
    config: &AppConfig,
    naming: &NamingArgs,
    device_identifier: Option<&str>,
) -> Result<RenameOptions> {
    let default_time = parse_default_time(
        naming
            .default_time
            .as_deref()
            .unwrap_or(&config.default_time),
    )?;
    let layout = naming.layout.map(LayoutKind::from).unwrap_or(config.layout);
    let identifier = naming
        .source_id
        .as_deref()
        .or(device_identifier)
        .unwrap_or(&config.source_identifier);

    Ok(RenameOptions {
        default_time,
        layout: layout_for(layout, identifier),
    })
}

fn cmd_name(args: NameArgs) -> Result<()> {
    let config = load_config()?;
    let options = rename_options(&config, &args.naming, None)?;
    let results: Vec<RenameResult> = args
        .names
        .iter()
        .map(|name| rename(name, &options))
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Table => {
            for (name, result) in args.names.iter().zip(&results) {
                match result {
                    RenameResult::Renamed { to, .. } => println!("{name} -> {to}"),
                    RenameResult::Unchanged { .. } => println!("{name} (unchanged)"),
                    RenameResult::NoMatch { reason } => println!("{name} skipped: {reason}"),
                }
            }
        }
    }
    Ok(())
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;

    let (input, device_identifier) = match (args.from_device, args.input.as_deref()) {
        (Some(folder), _) => {
            let mount = find_mtp_mount(&config.gvfs_root)?;
            let identifier = extract_device_identifier(&mount);
            let folder = AndroidFolder::from(folder);
            let input = mount.join(folder.relative_path(&config.device_storage_name));
            debug!("reading from device folder {}", input.display());
            (input, identifier)
        }
        (None, Some(input)) => (PathBuf::from(input), None),
        (None, None) => bail!("either --input or --from-device is required"),
    };

    let options = PlanOptions {
        input,
        output_root: args.output_dir.map(Into::into),
        recursive: args.recursive || config.recursive_default,
        include_hidden: args.include_hidden || config.include_hidden_default,
        extensions: if args.extensions.is_empty() {
            config.extensions.clone()
        } else {
            args.extensions
        },
        rename: rename_options(&config, &args.naming, device_identifier.as_deref())?,
        on_collision: args
            .on_collision
            .map(CollisionPolicy::from)
            .unwrap_or(config.on_collision),
    };

    let plan = generate_plan(&options)?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Table => {
            print_table(&plan);
        }
    }

    if args.apply {
        let mode = if args.copy {
            TransferMode::Copy
        } else {
            TransferMode::Move
        };
        let result = apply_plan(&plan, &ApplyOptions { mode })?;
        eprintln!(
            "applied: {} ({:?}), unchanged: {}",
            result.applied, result.mode, result.unchanged
        );
    } else {
        eprintln!("dry run: no files were changed. Pass --apply to apply the plan.");
    }

    Ok(())
}

fn cmd_device() -> Result<()> {
    let config = load_config()?;
    let mount = find_mtp_mount(&config.gvfs_root)?;
    println!("mount: {}", mount.display());

    match extract_device_identifier(&mount) {
        Some(identifier) => {
            println!("identifier: {identifier}");
            println!("source id: {}", compute_source_id(&identifier));
        }
        None => println!("identifier: unknown"),
    }

    for folder in AndroidFolder::ALL {
        let path = mount.join(folder.relative_path(&config.device_storage_name));
        let marker = if path.is_dir() { "" } else { " (missing)" };
        println!("{:?}: {}{}", folder, path.display(), marker);
    }
    Ok(())
}

fn cmd_undo() -> Result<()> {
    let result = undo_last()?;
    println!("restored: {}", result.restored);
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        bail!("config file already exists: {}", paths.config_path.display());
    }
    save_config(&AppConfig::default())?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("original -> target (format)");
    for candidate in &plan.candidates {
        println!(
            "{} -> {} ({})",
            candidate.original_path.display(),
            candidate.target_path.display(),
            candidate.kind.label()
        );
    }

    if !plan.skipped.is_empty() {
        println!("\nskipped:");
        for skipped in &plan.skipped {
            let reason = match &skipped.reason {
                SkipReason::Unrecognized => "unrecognized format".to_string(),
                SkipReason::InvalidTimestamp { value } => format!("invalid timestamp {value}"),
                SkipReason::Collision { target } => {
                    format!("collides with {}", target.display())
                }
            };
            println!("{} ({})", skipped.path.display(), reason);
        }
    }

    println!(
        "\nsummary: scanned={} media={} ext_skip={} hidden_skip={} unrecognized={} invalid={} collisions={} planned={} unchanged={}",
        plan.stats.scanned_files,
        plan.stats.media_files,
        plan.stats.skipped_extension,
        plan.stats.skipped_hidden,
        plan.stats.unrecognized,
        plan.stats.invalid_timestamp,
        plan.stats.collisions,
        plan.stats.planned,
        plan.stats.unchanged
    );
}
