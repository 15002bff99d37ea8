use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gt", about = concat!("gantry v", env!("CARGO_PKG_VERSION"), " - project timelines in the terminal"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,

    /// Write logs to gantry/logs at this level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Open the timeline on the built-in sample projects, without touching disk
    #[arg(long)]
    pub demo: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create gantry/ with an empty project list and default config
    Init(InitArgs),
    /// List stored projects
    Projects,
    /// Show the display rows of a project
    Rows(ViewArgs),
    /// Show the date axis of a project
    Axis(AxisArgs),
    /// Print the timeline table as text
    Render(RenderArgs),
    /// Run the structural self-check on a rendered timeline
    Check(ViewArgs),
    /// Move an entity's dates by a number of days
    Shift(ShiftArgs),
    /// Set an entity's start and/or end date
    Set(SetArgs),
    /// Read or change a gantry.toml value
    Config(ConfigArgs),
    /// View or clear the recovery log
    Recovery(RecoveryCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Seed projects.json with sample projects
    #[arg(long)]
    pub demo: bool,
    /// Reinitialize even if gantry/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Viewing
// ---------------------------------------------------------------------------

/// Which project to show and how rows are filtered
#[derive(Args, Clone, Default)]
pub struct ViewArgs {
    /// Project name (default: the first stored project; sample rows if none)
    #[arg(short, long)]
    pub project: Option<String>,
    /// Hide rows of a kind: project, milestones, deliverables, tasks
    #[arg(long, value_delimiter = ',')]
    pub hide: Vec<String>,
    /// Scroll the view to this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,
}

#[derive(Args)]
pub struct AxisArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Only list units of this granularity (year, quarter, month, week, day)
    #[arg(long)]
    pub unit: Option<String>,
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Number of day columns to print (default: 28)
    #[arg(long)]
    pub days: Option<usize>,
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShiftArgs {
    /// Entity path: "" for the project, "2" milestone, "2.1" deliverable, "2.1.3" task
    pub path: String,
    /// Days to move by (negative moves earlier)
    #[arg(allow_hyphen_values = true)]
    pub days: i64,
    /// Project name (default: the first stored project)
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    /// Entity path: "" for the project, "2" milestone, "2.1" deliverable, "2.1.3" task
    pub path: String,
    /// New start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// New end date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
    /// Project name (default: the first stored project)
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Dotted key, e.g. timeline.default_column_width
    pub key: Option<String>,
    /// New value (omit to print the current one)
    pub value: Option<String>,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove all entries
    Clear,
    /// Print the absolute path to the recovery log
    Path,
}
