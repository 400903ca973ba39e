//! `knit build` — link the project's modules into bundles.
//!
//! Loads `knit.toml`, opens every module's fragment files, runs the bundle
//! assembler with the reference JavaScript emitter, and writes the bundles to
//! the output directory. Source manifests are only updated after a successful
//! multi-module build, so a failed build is retried in full next time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use knit_config::{BuildMode, ProjectConfig};
use knit_diagnostics::{Diagnostic, DiagnosticRenderer, DiagnosticSink, Tally, TerminalRenderer};
use knit_link::{AssembleOptions, BundleAssembler, BundleOutput, ReloadReason};
use serde::Serialize;

use crate::emit::JsEmitter;
use crate::project::{open_artifacts, resolve_project_root};
use crate::{BuildArgs, CliBuildMode, GlobalArgs, ReportFormat};

/// Machine-readable result of a build.
#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    project: &'a str,
    mode: &'static str,
    success: bool,
    tally: Tally,
    regenerated: &'a [String],
    reused: &'a [String],
    reload_reasons: &'a BTreeMap<String, ReloadReason>,
    outputs: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

/// Runs the `knit build` command.
///
/// Returns exit code 0 on success, 1 if linking failed.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let mut config = knit_config::load_config(&project_dir)?;
    if let Some(mode) = args.mode {
        config.build.mode = match mode {
            CliBuildMode::Multi => BuildMode::Multi,
            CliBuildMode::Single => BuildMode::Single,
        };
    }
    let output_dir = match &args.out {
        Some(out) => project_dir.join(out),
        None => project_dir.join(&config.build.output_dir),
    };

    let text = args.format == ReportFormat::Text;
    if !global.quiet && text {
        eprintln!(
            "    Linking {} v{} ({} modules, {})",
            config.project.name,
            config.project.version,
            config.modules.len(),
            mode_name(config.build.mode)
        );
    }

    let artifacts = open_artifacts(&project_dir, &config);
    let emitter = JsEmitter::new(config.build.module_kind, config.build.source_maps);
    let sink = DiagnosticSink::new();
    let assembler = BundleAssembler::new(AssembleOptions::from_config(&config), &emitter, &sink);

    let bundle = match assembler.build(&artifacts) {
        Ok(bundle) => bundle,
        Err(e) => {
            sink.emit(e.to_diagnostic());
            let empty = BundleOutput::default();
            report(&config, &empty, Vec::new(), &sink, args, global);
            return Ok(1);
        }
    };

    let outputs = write_bundles(&output_dir, &emitter, &config, &bundle)?;
    if config.build.mode == BuildMode::Multi {
        for artifact in &artifacts {
            artifact.save_manifest()?;
        }
    }

    report(&config, &bundle, outputs, &sink, args, global);
    Ok(0)
}

fn mode_name(mode: BuildMode) -> &'static str {
    match mode {
        BuildMode::Multi => "multi",
        BuildMode::Single => "single",
    }
}

/// Writes the main bundle and every dependency bundle, returning their paths.
fn write_bundles(
    output_dir: &Path,
    emitter: &JsEmitter,
    config: &ProjectConfig,
    bundle: &BundleOutput,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir).map_err(|e| io_context(output_dir, e))?;

    let mut written = Vec::with_capacity(bundle.dependencies.len() + 1);
    let main = std::iter::once((config.project.main.as_str(), &bundle.main));
    let dependencies = bundle
        .dependencies
        .iter()
        .map(|(name, output)| (name.as_str(), output));
    for (name, output) in main.chain(dependencies) {
        // Scoped external names such as `@scope/lib` land in a subdirectory.
        let path = output_dir.join(emitter.file_name(name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_context(parent, e))?;
        }
        std::fs::write(&path, &output.code).map_err(|e| io_context(&path, e))?;

        let map_path = PathBuf::from(format!("{}.map", path.display()));
        match &output.source_map {
            Some(map) => std::fs::write(&map_path, map).map_err(|e| io_context(&map_path, e))?,
            None => match std::fs::remove_file(&map_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_context(&map_path, e)),
            },
        }
        written.push(path);
    }
    Ok(written)
}

fn io_context(path: &Path, e: std::io::Error) -> Box<dyn std::error::Error> {
    format!("cannot write {}: {e}", path.display()).into()
}

fn report(
    config: &ProjectConfig,
    bundle: &BundleOutput,
    outputs: Vec<PathBuf>,
    sink: &DiagnosticSink,
    args: &BuildArgs,
    global: &GlobalArgs,
) {
    let tally = sink.tally();
    let diagnostics = sink.take_all();
    let success = tally.errors == 0;

    match args.format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(global.color);
            for diag in &diagnostics {
                eprint!("{}", renderer.render(diag));
            }
            if global.quiet {
                return;
            }
            if success {
                eprintln!(
                    "   Finished {} regenerated, {} reused, {} bundle(s) written",
                    bundle.regenerated.len(),
                    bundle.reused.len(),
                    outputs.len()
                );
            }
            if !tally.is_clean() {
                eprintln!(
                    "   Result: {} error(s), {} warning(s)",
                    tally.errors, tally.warnings
                );
            }
        }
        ReportFormat::Json => {
            let summary = BuildSummary {
                project: &config.project.name,
                mode: mode_name(config.build.mode),
                success,
                tally,
                regenerated: &bundle.regenerated,
                reused: &bundle.reused,
                reload_reasons: &bundle.reload_reasons,
                outputs,
                diagnostics,
            };
            let json = serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[project]
name = "demo"
main = "app"

[build]
source_maps = true

[[modules]]
name = "lib"
sources = ["lib.json"]

[[modules]]
name = "app"
sources = ["app.json"]
"#;

    const LIB: &str = r#"{
  "package": "lib",
  "definitions": ["lib|greet"],
  "name_bindings": {"lib|greet": "greet"},
  "declarations": "function greet(n) { return 'hi ' + n; }"
}"#;

    const APP: &str = r#"{
  "package": "app",
  "definitions": ["app|main"],
  "name_bindings": {"app|main": "main", "lib|greet": "greet"},
  "declarations": "function main() { console.log(greet('knit')); }",
  "main_call": "main();"
}"#;

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("knit.toml"), CONFIG).unwrap();
        fs::write(tmp.path().join("lib.json"), LIB).unwrap();
        fs::write(tmp.path().join("app.json"), APP).unwrap();
        tmp
    }

    fn global(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(dir.to_str().unwrap().to_string()),
        }
    }

    fn args(mode: Option<CliBuildMode>) -> BuildArgs {
        BuildArgs {
            mode,
            out: None,
            format: ReportFormat::Text,
        }
    }

    fn project_config_from(toml: &str) -> ProjectConfig {
        knit_config::load_config_from_str(toml).unwrap()
    }

    fn project_config(dir: &Path) -> ProjectConfig {
        knit_config::load_config(dir).unwrap()
    }

    #[test]
    fn multi_build_writes_one_bundle_per_module() {
        let tmp = project();
        assert_eq!(run(&args(None), &global(tmp.path())).unwrap(), 0);

        let app = fs::read_to_string(tmp.path().join("build/app.js")).unwrap();
        assert!(app.contains("var $module$lib = require('./lib.js');"));
        assert!(app.contains("var greet = $module$lib.greet;"));
        assert!(app.trim_end().ends_with("main();"));

        let lib = fs::read_to_string(tmp.path().join("build/lib.js")).unwrap();
        assert!(lib.contains("module.exports.greet = greet;"));
        assert!(!lib.contains("main();"));
        assert!(tmp.path().join("build/lib.js.map").exists());
        assert!(tmp.path().join(".knit-cache/lib/sources.json").exists());
    }

    #[test]
    fn second_build_reuses_cached_output() {
        let tmp = project();
        run(&args(None), &global(tmp.path())).unwrap();
        let first = fs::read_to_string(tmp.path().join("build/app.js")).unwrap();

        let config = project_config(tmp.path());
        let artifacts = open_artifacts(tmp.path(), &config);
        let emitter = JsEmitter::new(config.build.module_kind, config.build.source_maps);
        let sink = DiagnosticSink::new();
        let bundle = BundleAssembler::new(AssembleOptions::from_config(&config), &emitter, &sink)
            .build(&artifacts)
            .unwrap();
        assert!(bundle.regenerated.is_empty());
        assert_eq!(bundle.reused, vec!["lib", "app"]);
        assert_eq!(bundle.main.code, first);
    }

    #[test]
    fn editing_a_body_regenerates_only_that_module() {
        let tmp = project();
        run(&args(None), &global(tmp.path())).unwrap();
        fs::write(tmp.path().join("lib.json"), LIB.replace("hi ", "hello ")).unwrap();
        assert_eq!(run(&args(None), &global(tmp.path())).unwrap(), 0);

        let lib = fs::read_to_string(tmp.path().join("build/lib.js")).unwrap();
        assert!(lib.contains("'hello '"));
        let config = project_config(tmp.path());
        let artifacts = open_artifacts(tmp.path(), &config);
        assert!(artifacts.iter().all(|a| !knit_link::ModuleArtifact::is_source_changed(a)));
    }

    #[test]
    fn single_build_writes_one_bundle() {
        let tmp = project();
        assert_eq!(run(&args(Some(CliBuildMode::Single)), &global(tmp.path())).unwrap(), 0);

        let app = fs::read_to_string(tmp.path().join("build/app.js")).unwrap();
        assert!(app.contains("function greet"));
        assert!(app.contains("function main"));
        assert!(!app.contains("require("));
        assert!(!tmp.path().join("build/lib.js").exists());
        assert!(!tmp.path().join(".knit-cache").exists());
    }

    #[test]
    fn duplicate_definition_fails_the_build() {
        let tmp = project();
        let clash = APP.replace("\"app|main\"]", "\"app|main\", \"lib|greet\"]");
        fs::write(tmp.path().join("app.json"), clash).unwrap();

        assert_eq!(run(&args(None), &global(tmp.path())).unwrap(), 1);
        assert!(!tmp.path().join("build").exists());
        assert!(!tmp.path().join(".knit-cache/app/sources.json").exists());
    }

    #[test]
    fn custom_output_directory() {
        let tmp = project();
        let args = BuildArgs {
            out: Some("dist".to_string()),
            ..args(None)
        };
        assert_eq!(run(&args, &global(tmp.path())).unwrap(), 0);
        assert!(tmp.path().join("dist/app.js").exists());
    }

    #[test]
    fn missing_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(run(&args(None), &global(tmp.path())).is_err());
    }

    #[test]
    fn scoped_external_name_gets_a_subdirectory() {
        let tmp = project();
        let config = CONFIG.replace(
            "name = \"lib\"\n",
            "name = \"lib\"\nexternal_name = \"@demo/lib\"\n",
        );
        fs::write(tmp.path().join("knit.toml"), config).unwrap();

        assert_eq!(run(&args(None), &global(tmp.path())).unwrap(), 0);
        assert!(tmp.path().join("build/@demo/lib.js").exists());
        assert!(tmp.path().join("build/@demo/lib.js.map").exists());
        let app = fs::read_to_string(tmp.path().join("build/app.js")).unwrap();
        assert!(app.contains("require('./@demo/lib.js')"));
    }

    #[test]
    fn write_errors_name_the_path() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("out");
        fs::write(&blocker, "not a directory").unwrap();
        let config = project_config_from(CONFIG);
        let emitter = JsEmitter::new(config.build.module_kind, false);
        let err = write_bundles(&blocker, &emitter, &config, &BundleOutput::default()).unwrap_err();
        assert!(err.to_string().contains(&blocker.display().to_string()));
    }
}
