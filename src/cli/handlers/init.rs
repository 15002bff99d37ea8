use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::config_io::CONFIG_FILE;
use crate::io::store::{self, GANTRY_DIR, JsonStore, PROJECTS_FILE};
use crate::model::Project;

const CONFIG_TEMPLATE: &str = include_str!("../../templates/gantry.toml");

/// Initial projects.json content
fn seed_projects(demo: bool) -> Vec<Project> {
    if demo {
        store::demo_projects()
    } else {
        Vec::new()
    }
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let gantry_dir = cwd.join(GANTRY_DIR);

    if gantry_dir.is_dir() && !args.force {
        return Err("gantry project already exists in ./gantry/ (use --force to reinitialize)".into());
    }

    if let Some(parent) = cwd.parent()
        && let Ok(parent_root) = store::discover_root(parent)
    {
        eprintln!(
            "Note: parent project found at {}/",
            parent_root.join(GANTRY_DIR).display()
        );
        eprintln!("Creating new project in ./gantry/");
    }

    fs::create_dir_all(&gantry_dir)?;

    let projects = seed_projects(args.demo);
    JsonStore::new(&gantry_dir).save_all(&projects)?;

    let config_path = gantry_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, CONFIG_TEMPLATE)?;
    }

    println!("Initialized gantry in {}", gantry_dir.display());
    println!("  {} ({} project(s))", PROJECTS_FILE, projects.len());
    for project in &projects {
        println!("    {}", project.name);
    }
    println!("  {}", CONFIG_FILE);

    Ok(())
}
