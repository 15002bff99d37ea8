use clap::Parser;
use gantry::cli::commands::{Cli, Commands};
use gantry::cli::handlers;
use gantry::io::logging;
use gantry::io::store::{GANTRY_DIR, discover_root};

fn main() {
    let cli = Cli::parse();
    start_logging(&cli);

    let result = match cli.command {
        None => {
            // No subcommand → launch TUI
            gantry::tui::run(cli.project_dir.as_deref(), cli.demo)
        }
        Some(Commands::Init(args)) => {
            // Init is handled before project discovery
            handlers::cmd_init(args)
        }
        Some(_) => handlers::dispatch(cli),
    };

    logging::flush();
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to the discovered gantry/ directory; without one there is
/// nowhere to write them and the request is ignored.
fn start_logging(cli: &Cli) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var(logging::LOG_ENV).ok());
    let Some(level) = level else {
        return;
    };
    let Ok(start) = handlers::resolve_start(cli.project_dir.as_deref()) else {
        return;
    };
    let Ok(root) = discover_root(&start) else {
        return;
    };
    if let Err(e) = logging::init_logging(&level, &root.join(GANTRY_DIR)) {
        eprintln!("warning: {}", e);
    }
}
