mod cmd;
mod logging;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    activity::ActivitySubcommand, config::ConfigSubcommand, development::DevSubcommand,
    fields::FieldsSubcommand, followup::FollowUpSubcommand, reservation::ReservationSubcommand,
    room::RoomSubcommand, stage::StageSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bitacora",
    about = "Track developments and change requests through their lifecycle stages",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .bitacora/ or .git/)
    #[arg(long, global = true, env = "BITACORA_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a project in the current directory
    Init,

    /// Inspect the stage catalog and resolve stage references
    Stage {
        #[command(subcommand)]
        subcommand: StageSubcommand,
    },

    /// Manage developments
    Dev {
        #[command(subcommand)]
        subcommand: DevSubcommand,
    },

    /// Log, edit and delete activities on a development
    Activity {
        #[command(subcommand)]
        subcommand: ActivitySubcommand,
    },

    /// Configure the payload fields each stage asks for
    Fields {
        #[command(subcommand)]
        subcommand: FieldsSubcommand,
    },

    /// Compute follow-up dates
    Followup {
        #[command(subcommand)]
        subcommand: FollowUpSubcommand,
    },

    /// Show a development's timeline
    Gantt {
        id: String,
        /// Reference day for stages without activities (default: today)
        #[arg(long)]
        today: Option<chrono::NaiveDate>,
        /// Bar width in columns (default: gantt.bar_width)
        #[arg(long)]
        width: Option<usize>,
    },

    /// Preview a spreadsheet of developments, and optionally store it
    Import {
        file: PathBuf,
        /// Create the previewed developments
        #[arg(long)]
        commit: bool,
    },

    /// Manage meeting rooms
    Room {
        #[command(subcommand)]
        subcommand: RoomSubcommand,
    },

    /// Book meeting rooms
    Reservation {
        #[command(subcommand)]
        subcommand: ReservationSubcommand,
    },

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let root = root::resolve_root(cli.root.as_deref());
    logging::init(&logging::settings(&root, cli.log_level.as_deref()));

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Stage { subcommand } => cmd::stage::run(&root, subcommand, cli.json),
        Commands::Dev { subcommand } => cmd::development::run(&root, subcommand, cli.json),
        Commands::Activity { subcommand } => cmd::activity::run(&root, subcommand, cli.json),
        Commands::Fields { subcommand } => cmd::fields::run(&root, subcommand, cli.json),
        Commands::Followup { subcommand } => cmd::followup::run(&root, subcommand, cli.json),
        Commands::Gantt { id, today, width } => cmd::gantt::run(&root, &id, today, width, cli.json),
        Commands::Import { file, commit } => cmd::import::run(&root, &file, commit, cli.json),
        Commands::Room { subcommand } => cmd::room::run(&root, subcommand, cli.json),
        Commands::Reservation { subcommand } => {
            cmd::reservation::run(&root, subcommand, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
