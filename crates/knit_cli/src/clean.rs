//! `knit clean` — drop module caches, and optionally the bundles.

use std::io::ErrorKind;
use std::path::Path;

use knit_cache::ModuleCache;

use crate::project::{module_cache_dir, resolve_project_root};
use crate::{CleanArgs, GlobalArgs};

/// Runs the `knit clean` command.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = knit_config::load_config(&project_dir)?;

    for module in &config.modules {
        ModuleCache::new(module_cache_dir(&project_dir, &config, &module.name)).clear()?;
    }
    // Leaves the directory alone if it holds anything besides module caches.
    let cache_root = project_dir.join(&config.build.cache_dir);
    let _ = std::fs::remove_dir(&cache_root);
    if !global.quiet {
        eprintln!("    Removed {}", cache_root.display());
    }

    if args.all {
        let output_dir = project_dir.join(&config.build.output_dir);
        remove_dir_all_if_exists(&output_dir)?;
        if !global.quiet {
            eprintln!("    Removed {}", output_dir.display());
        }
    }
    Ok(0)
}

fn remove_dir_all_if_exists(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
