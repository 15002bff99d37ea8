mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::recovery;
use crate::io::store::{JsonStore, ProjectStore, find_project};
use crate::model::{EntityPath, Project};
use crate::timeline::axis::Granularity;
use crate::timeline::interact;
use crate::timeline::rows::{RowFilter, RowKind};
use crate::timeline::{Release, Session};
use crate::util::dates;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Per-invocation settings shared by every handler
struct Context {
    json: bool,
    /// Where project discovery starts
    start: PathBuf,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let ctx = Context {
        json: cli.json,
        start: resolve_start(cli.project_dir.as_deref())?,
    };

    match cli.command {
        None => Err("no command given (try `gt --help`)".into()),
        Some(cmd) => match cmd {
            // Init is handled in main.rs before project discovery
            Commands::Init(args) => cmd_init(args),

            // Read commands
            Commands::Projects => cmd_projects(&ctx),
            Commands::Rows(args) => cmd_rows(&ctx, args),
            Commands::Axis(args) => cmd_axis(&ctx, args),
            Commands::Render(args) => cmd_render(&ctx, args),
            Commands::Check(args) => cmd_check(&ctx, args),

            // Write commands
            Commands::Shift(args) => cmd_shift(&ctx, args),
            Commands::Set(args) => cmd_set(&ctx, args),

            // Maintenance
            Commands::Config(args) => cmd_config(&ctx, args),
            Commands::Recovery(args) => cmd_recovery(&ctx, args),
        },
    }
}

/// The directory discovery starts from: `-C` if given, else the cwd
pub fn resolve_start(project_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match project_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_store(ctx: &Context) -> Result<JsonStore, Box<dyn std::error::Error>> {
    Ok(JsonStore::discover(&ctx.start)?)
}

/// Pick a project by name, or the first stored one. Ok(None) when the store
/// is empty and no name was asked for.
fn select_project<'a>(
    projects: &'a [Project],
    name: Option<&str>,
) -> Result<Option<&'a Project>, String> {
    match name {
        Some(name) => find_project(projects, name)
            .map(Some)
            .ok_or_else(|| format!("no project named \"{}\"", name)),
        None => Ok(projects.first()),
    }
}

fn parse_filter(hide: &[String]) -> Result<RowFilter, String> {
    let mut filter = RowFilter::default();
    for name in hide {
        let kind = RowKind::parse(name).ok_or_else(|| {
            format!(
                "unknown row kind \"{}\" (expected project, milestones, deliverables or tasks)",
                name
            )
        })?;
        if filter.shows(kind) {
            filter.toggle(kind);
        }
    }
    Ok(filter)
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    dates::parse_local(s).ok_or_else(|| format!("invalid date \"{}\" (expected YYYY-MM-DD)", s))
}

fn parse_path(s: &str) -> Result<EntityPath, String> {
    EntityPath::parse(s).ok_or_else(|| format!("invalid entity path \"{}\" (e.g. 2.1.3)", s))
}

/// Mount a session for a read command
fn view_session(ctx: &Context, view: &ViewArgs) -> Result<Session, Box<dyn std::error::Error>> {
    let store = open_store(ctx)?;
    let config = config_io::load_config_or_default(store.dir());
    let projects = store.load()?;
    let project = select_project(&projects, view.project.as_deref())?;

    let mut session = Session::new(config, project);
    let filter = parse_filter(&view.hide)?;
    if filter != RowFilter::default() {
        session.set_filter(filter);
    }
    if let Some(from) = &view.from {
        session.set_view_start(Some(parse_date(from)?));
    }
    Ok(session)
}

/// Mount a session over a stored project for an edit command
fn edit_session(
    ctx: &Context,
    name: Option<&str>,
) -> Result<(JsonStore, Session), Box<dyn std::error::Error>> {
    let store = open_store(ctx)?;
    let config = config_io::load_config_or_default(store.dir());
    let projects = store.load()?;
    let project = select_project(&projects, name)?.ok_or("no projects stored; nothing to edit")?;
    let session = Session::new(config, Some(project));
    Ok((store, session))
}

/// Commit through the session and report the outcome
fn commit_and_report(
    ctx: &Context,
    session: &mut Session,
    store: &mut JsonStore,
    entity: EntityPath,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> CmdResult {
    let project = session
        .project()
        .map(|p| p.name.clone())
        .unwrap_or_default();
    match session.commit(entity, start, end, store)? {
        Release::Committed { start, end, .. } => {
            let path = entity.numbering();
            if ctx.json {
                let out = CommitJson {
                    project,
                    path,
                    start: dates::format(start),
                    end: dates::format(end),
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let title = session
                    .project()
                    .and_then(|p| p.title_at(entity))
                    .unwrap_or_default();
                let label = if path.is_empty() {
                    title.to_string()
                } else {
                    format!("{} {}", path, title)
                };
                println!("{}: {} .. {}", label, dates::format(start), dates::format(end));
            }
            Ok(())
        }
        _ => Err(format!("no entity at path \"{}\"", entity.numbering()).into()),
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_projects(ctx: &Context) -> CmdResult {
    let store = open_store(ctx)?;
    let projects = store.load()?;

    if ctx.json {
        let out: Vec<ProjectSummaryJson> = projects.iter().map(project_summary_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects stored. Add some to {}", store.path().display());
        return Ok(());
    }
    for project in &projects {
        let s = project_summary_json(project);
        println!(
            "{}  {} .. {}  {}%  ({} milestones, {} deliverables, {} tasks)",
            s.name,
            s.start.as_deref().unwrap_or("?"),
            s.end.as_deref().unwrap_or("?"),
            s.progress.unwrap_or(0),
            s.milestones,
            s.deliverables,
            s.tasks
        );
    }
    Ok(())
}

fn cmd_rows(ctx: &Context, args: ViewArgs) -> CmdResult {
    let session = view_session(ctx, &args)?;

    if ctx.json {
        let out = rows_json(session.project(), session.axis(), session.rows());
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if session.project().is_none() {
        println!("(no projects stored; showing sample rows)");
    }
    for row in &session.rows().rows {
        println!("{}", format_row_line(row));
    }
    Ok(())
}

fn cmd_axis(ctx: &Context, args: AxisArgs) -> CmdResult {
    let session = view_session(ctx, &args.view)?;
    let granularities: Vec<Granularity> = match &args.unit {
        Some(name) => vec![
            Granularity::parse(name).ok_or_else(|| format!("unknown granularity \"{}\"", name))?,
        ],
        None => Granularity::ALL.to_vec(),
    };
    let axis = session.axis();
    let units = granularities.iter().flat_map(|&g| axis.units(g));

    if ctx.json {
        let out = AxisJson {
            start: dates::format(axis.start),
            end: dates::format(axis.end),
            day_count: axis.day_count(),
            units: units.map(unit_json).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} .. {} ({} days)",
        dates::format(axis.start),
        dates::format(axis.end),
        axis.day_count()
    );
    for unit in units {
        println!("{}", format_unit_line(unit));
    }
    Ok(())
}

fn cmd_render(ctx: &Context, args: RenderArgs) -> CmdResult {
    let session = view_session(ctx, &args.view)?;
    let grid = session.grid().ok_or("timeline not rendered")?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(grid)?);
        return Ok(());
    }

    let first = grid.col_at_x(session.viewport().scroll_x).unwrap_or(0);
    print!("{}", render_text(grid, first, args.days.unwrap_or(28)));
    for violation in session.violations() {
        eprintln!("{}", violation);
    }
    Ok(())
}

fn cmd_check(ctx: &Context, args: ViewArgs) -> CmdResult {
    let session = view_session(ctx, &args)?;
    let violations = session.violations().to_vec();

    if ctx.json {
        let out = CheckJson {
            ok: violations.is_empty(),
            violations: violations.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if violations.is_empty() {
        println!("ok: timeline structure is valid");
    } else {
        for v in &violations {
            println!("{}", v);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(format!("{} structural problem(s) found", violations.len()).into())
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_shift(ctx: &Context, args: ShiftArgs) -> CmdResult {
    let entity = parse_path(&args.path)?;
    let (mut store, mut session) = edit_session(ctx, args.project.as_deref())?;
    let (start, end) = session
        .entity_dates(entity)
        .ok_or_else(|| format!("no entity at path \"{}\"", args.path))?;
    let (start, end) = interact::moved(start, end, args.days);
    commit_and_report(ctx, &mut session, &mut store, entity, start, end)
}

fn cmd_set(ctx: &Context, args: SetArgs) -> CmdResult {
    if args.start.is_none() && args.end.is_none() {
        return Err("nothing to set (use --start and/or --end)".into());
    }
    let entity = parse_path(&args.path)?;
    let (mut store, mut session) = edit_session(ctx, args.project.as_deref())?;
    let (current_start, current_end) = session
        .entity_dates(entity)
        .ok_or_else(|| format!("no entity at path \"{}\"", args.path))?;

    let start = match &args.start {
        Some(s) => parse_date(s)?,
        None => current_start,
    };
    let end = match &args.end {
        Some(s) => parse_date(s)?,
        None => current_end,
    };
    if start > end {
        return Err(format!(
            "start {} is after end {}",
            dates::format(start),
            dates::format(end)
        )
        .into());
    }
    commit_and_report(ctx, &mut session, &mut store, entity, start, end)
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn cmd_config(ctx: &Context, args: ConfigArgs) -> CmdResult {
    let store = open_store(ctx)?;
    let dir = store.dir();
    let (config, mut doc) = config_io::read_config(dir)?;

    match (args.key, args.value) {
        (None, _) => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        (Some(key), None) => {
            let value = config_io::get_key(&doc, &key)
                .or_else(|| effective_value(&config, &key))
                .ok_or_else(|| format!("unknown config key: {}", key))?;
            println!("{}", value);
        }
        (Some(key), Some(value)) => {
            config_io::set_key(&mut doc, &key, &value)?;
            config_io::write_config(dir, &doc)?;
            println!("{} = {}", key, config_io::get_key(&doc, &key).unwrap_or(value));
        }
    }
    Ok(())
}

/// Value of a dotted key after defaults are applied
fn effective_value(config: &crate::model::GantryConfig, key: &str) -> Option<String> {
    let mut value = toml::Value::try_from(config).ok()?;
    for part in key.split('.') {
        value = value.get(part)?.clone();
    }
    Some(match value {
        toml::Value::String(s) => s,
        other => other.to_string(),
    })
}

fn cmd_recovery(ctx: &Context, cmd: RecoveryCmd) -> CmdResult {
    let store = open_store(ctx)?;
    let dir = store.dir();

    match cmd.action {
        Some(RecoveryAction::Path) => {
            println!("{}", absolute(&recovery::recovery_log_path(dir)).display());
        }
        Some(RecoveryAction::Clear) => {
            let removed = recovery::clear_recovery(dir)?;
            println!("Removed {} recovery entr{}", removed, if removed == 1 { "y" } else { "ies" });
        }
        None => {
            let entries = recovery::read_recovery_entries(dir, Some(cmd.limit.unwrap_or(10)));
            if ctx.json {
                let out: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if entries.is_empty() {
                println!("No recovery entries");
            } else {
                for entry in &entries {
                    println!("{}", entry.to_display());
                }
            }
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Project {
        Project::new(name)
    }

    #[test]
    fn select_defaults_to_first_and_matches_case_insensitively() {
        let projects = vec![named("Alpha"), named("Beta")];
        assert_eq!(select_project(&projects, None).unwrap().unwrap().name, "Alpha");
        assert_eq!(select_project(&projects, Some("beta")).unwrap().unwrap().name, "Beta");
        assert!(select_project(&projects, Some("gamma")).is_err());
        assert!(select_project(&[], None).unwrap().is_none());
    }

    #[test]
    fn hide_list_clears_filter_flags() {
        let filter = parse_filter(&["tasks".into(), "Milestone".into()]).unwrap();
        assert!(filter.project && filter.deliverables);
        assert!(!filter.tasks && !filter.milestones);
        // Repeating a kind keeps it hidden
        assert!(!parse_filter(&["tasks".into(), "tasks".into()]).unwrap().tasks);
        assert!(parse_filter(&["epics".into()]).is_err());
    }

    #[test]
    fn effective_value_falls_back_to_defaults() {
        let config = crate::model::GantryConfig::default();
        assert_eq!(effective_value(&config, "timeline.baseline_years").as_deref(), Some("10"));
        assert_eq!(effective_value(&config, "autoscroll.threshold").as_deref(), Some("48.0"));
        assert_eq!(effective_value(&config, "timeline.nope"), None);
    }

    #[test]
    fn entity_paths_and_dates_are_validated() {
        assert_eq!(parse_path("2.1").unwrap(), EntityPath::Deliverable(1, 0));
        assert!(parse_path("0.1").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }
}
