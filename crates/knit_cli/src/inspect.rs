//! `knit inspect` — show what the cache knows about one module.

use std::collections::BTreeMap;

use knit_cache::{HeaderRecord, ModuleCache, SourceManifest};
use knit_config::ConfigError;
use serde::Serialize;

use crate::project::{module_cache_dir, resolve_project_root};
use crate::{GlobalArgs, InspectArgs, ReportFormat};

#[derive(Debug, Serialize)]
struct SymbolEntry<'a> {
    tag: &'a str,
    local_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ModuleReport<'a> {
    module: &'a str,
    cache_dir: String,
    export_surface: bool,
    output_cached: bool,
    source_map_cached: bool,
    definitions: Vec<SymbolEntry<'a>>,
    imports: Vec<SymbolEntry<'a>>,
    sources: BTreeMap<String, String>,
}

/// Runs the `knit inspect` command.
///
/// Returns exit code 1 if the module has no readable cached header.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = knit_config::load_config(&project_dir)?;
    if config.module(&args.module).is_none() {
        return Err(ConfigError::UnknownModule(args.module.clone()).into());
    }

    let cache = ModuleCache::new(module_cache_dir(&project_dir, &config, &args.module));
    let Some(record) = cache.fetch_header() else {
        eprintln!(
            "error: no cached header for module `{}`; run `knit build` first",
            args.module
        );
        return Ok(1);
    };
    let output = cache.fetch_output();
    let manifest = SourceManifest::load(cache.dir());

    let report = ModuleReport {
        module: &args.module,
        cache_dir: cache.dir().display().to_string(),
        export_surface: record.has_export_surface(),
        output_cached: output.is_some(),
        source_map_cached: output.as_ref().is_some_and(|o| o.source_map.is_some()),
        definitions: symbols(&record, record.definitions().iter()),
        imports: symbols(&record, record.external_names().iter()),
        sources: manifest
            .map(|m| {
                m.files
                    .iter()
                    .map(|(path, hash)| (path.display().to_string(), hash.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
    };

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&report)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}

fn symbols<'a>(
    record: &'a HeaderRecord,
    tags: impl Iterator<Item = &'a knit_common::Tag>,
) -> Vec<SymbolEntry<'a>> {
    tags.map(|tag| SymbolEntry {
        tag: tag.as_str(),
        local_name: record.local_name(tag),
    })
    .collect()
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn render_text(report: &ModuleReport<'_>) -> String {
    let mut out = format!("module `{}` ({})\n", report.module, report.cache_dir);
    out.push_str(&format!("  export surface: {}\n", yes_no(report.export_surface)));
    out.push_str(&format!(
        "  cached output:  {}{}\n",
        yes_no(report.output_cached),
        if report.source_map_cached { " (with source map)" } else { "" }
    ));
    for (title, entries) in [("definitions", &report.definitions), ("imports", &report.imports)] {
        out.push_str(&format!("  {title} ({}):\n", entries.len()));
        for entry in entries {
            match entry.local_name {
                Some(name) => out.push_str(&format!("    {} -> {name}\n", entry.tag)),
                None => out.push_str(&format!("    {}\n", entry.tag)),
            }
        }
    }
    if !report.sources.is_empty() {
        out.push_str(&format!("  sources ({}):\n", report.sources.len()));
        for (path, hash) in &report.sources {
            out.push_str(&format!("    {path} {hash}\n"));
        }
    }
    out
}
