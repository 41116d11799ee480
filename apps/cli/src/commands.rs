//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use joybuild_builders::BuilderRegistry;
use joybuild_core::pipeline::{BatchReport, Orchestrator, ProgressReporter};
use joybuild_core::reconcile::reconcile;
use joybuild_discovery::{AssetTree, view};
use joybuild_shared::{
    AppConfig, BuildResult, DataPaths, ReconcileOptions, ScanOptions, init_config, load_config,
    load_config_from,
};
use joybuild_storage::ContentDatabase;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// JoyBuild: build engine assets from a data root.
#[derive(Parser)]
#[command(
    name = "joybuild",
    version,
    about = "Build models, textures, materials and shaders into engine-ready artifacts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data root (overrides `paths.data_root`).
    #[arg(long, global = true, env = "JOYBUILD_DATA")]
    pub data: Option<PathBuf>,

    /// Config file (defaults to ~/.joybuild/joybuild.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build one asset, or every asset under a folder.
    Build {
        /// Asset path, absolute or relative to the data root.
        asset: PathBuf,
    },

    /// Build every asset that has no artifact yet.
    BuildUnbuilt,

    /// Rebuild every asset.
    BuildAll,

    /// Bring the content database in line with the data root.
    Reconcile {
        /// Create an empty database first if none exists.
        #[arg(long)]
        init: bool,
    },

    /// Print the asset tree with built markers.
    Tree,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "joybuild=info",
        1 => "joybuild=debug",
        _ => "joybuild=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        data,
        config,
        ..
    } = cli;

    let open = || Workspace::open(config.as_deref(), data.as_deref());

    match command {
        Command::Build { asset } => cmd_build(&open()?, &asset),
        Command::BuildUnbuilt => cmd_build_unbuilt(&open()?),
        Command::BuildAll => cmd_build_all(&open()?),
        Command::Reconcile { init } => cmd_reconcile(&open()?, init),
        Command::Tree => cmd_tree(&open()?),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Workspace resolution
// ---------------------------------------------------------------------------

/// Resolved config and data locations for one invocation.
struct Workspace {
    config: AppConfig,
    paths: DataPaths,
}

impl Workspace {
    fn open(config_path: Option<&Path>, data_root: Option<&Path>) -> Result<Self> {
        let config = resolve_config(config_path)?;
        let paths = DataPaths::resolve(&config, data_root);

        if !paths.data_root.is_dir() {
            return Err(eyre!(
                "data root '{}' does not exist (set --data or paths.data_root)",
                paths.data_root.display()
            ));
        }
        if !paths.materials_root.is_dir() {
            return Err(eyre!(
                "materials directory '{}' does not exist",
                paths.materials_root.display()
            ));
        }

        info!(data_root = %paths.data_root.display(), "using data root");
        Ok(Self { config, paths })
    }

    fn scan(&self) -> Result<AssetTree> {
        let opts =
            ScanOptions::from(&self.config).with_materials_root(&self.paths.materials_root);
        Ok(AssetTree::scan(&self.paths.data_root, &opts)?)
    }

    fn orchestrator(&self) -> Result<Orchestrator> {
        let registry = BuilderRegistry::native(&self.config.build);
        Ok(Orchestrator::new(self.scan()?, registry))
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn asset_started(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Building [{current}/{total}] {}", path.display()));
    }

    fn asset_finished(&self, result: &BuildResult, _current: usize, _total: usize) {
        self.spinner.println(&result.message);
    }

    fn done(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(workspace: &Workspace, asset: &Path) -> Result<()> {
    let mut orchestrator = workspace.orchestrator()?;
    let id = orchestrator
        .tree()
        .find(asset)
        .ok_or_else(|| eyre!("'{}' is not a tracked asset or folder", asset.display()))?;

    info!(asset = %asset.display(), "building asset");
    let report = orchestrator.build_one(id, &CliProgress::new())?;
    finish_batch(&report, false)
}

fn cmd_build_unbuilt(workspace: &Workspace) -> Result<()> {
    let mut orchestrator = workspace.orchestrator()?;
    let report = orchestrator.build_unbuilt(&CliProgress::new())?;
    if report.results.is_empty() {
        println!("All assets are already built.");
        return Ok(());
    }
    finish_batch(&report, false)
}

fn cmd_build_all(workspace: &Workspace) -> Result<()> {
    let mut orchestrator = workspace.orchestrator()?;
    let report = orchestrator.build_all(&CliProgress::new())?;
    finish_batch(&report, true)
}

/// Print the batch summary; a batch with failures exits non-zero.
fn finish_batch(report: &BatchReport, show_time: bool) -> Result<()> {
    println!();
    println!("  Built:   {}", report.succeeded());
    println!("  Failed:  {}", report.failed());
    if show_time {
        println!("  Time:    {:.2}s", report.elapsed.as_secs_f64());
    }
    println!();

    match report.failed() {
        0 => Ok(()),
        n => Err(eyre!("{n} asset(s) failed to build")),
    }
}

fn cmd_reconcile(workspace: &Workspace, init: bool) -> Result<()> {
    let db_path = &workspace.paths.database;
    if init && ContentDatabase::create_empty(db_path)? {
        println!("Created empty database at: {}", db_path.display());
    }

    let opts = ReconcileOptions::from(&workspace.config);
    let report = reconcile(&workspace.paths.data_root, db_path, &opts)?;

    println!();
    println!("  Content database reconciled!");
    println!("  Kept:     {}", report.kept);
    println!("  Added:    {}", report.added);
    println!("  Removed:  {}", report.removed);
    println!("  Total:    {}", report.total);
    println!("  Time:     {:.2}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_tree(workspace: &Workspace) -> Result<()> {
    let tree = workspace.scan()?;
    print!("{}", view::render_outline(&view::outline(&tree)));
    println!();
    println!(
        "  {} assets, {} unbuilt",
        tree.leaves().len(),
        tree.unbuilt_count()
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
