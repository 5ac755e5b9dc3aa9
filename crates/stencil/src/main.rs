//! The `stencil` command-line tool.
//!
//! Compiles route manifests, generates OpenAPI documents, previews responses
//! and ships manifests to a native serving engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use stencil::{
    default_engine_path, openapi_document, substitute, ApiInfo, App, CompileOptions, CompiledApp,
    DependencyRegistry, HttpMethod, NativeEngine, RecordingEngine, RouteManifest,
};
use stencil_compiler::{referenced_dependencies, CompileWarning};
use stencil_telemetry::{init_logging, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "stencil", about = "Declarative routes for a native serving engine", version)]
struct Cli {
    /// Local log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, env = "STENCIL_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log output format (pretty or json).
    #[arg(long, global = true, env = "STENCIL_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a route manifest into a JSON artifact.
    Compile {
        /// Route manifest (stencil.yaml).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output artifact path. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the value-dependence probe render.
        #[arg(long)]
        no_probe: bool,
    },

    /// Validate route manifest(s) without producing an artifact.
    Validate {
        /// Route manifest(s).
        #[arg(short, long, required = true, num_args = 1..)]
        manifest: Vec<PathBuf>,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Generate an OpenAPI 3.0 document from a route manifest.
    Openapi {
        /// Route manifest (stencil.yaml).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output path. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Document title.
        #[arg(long, default_value = "Stencil API")]
        title: String,

        /// Document version.
        #[arg(long, default_value = "1.0.0")]
        api_version: String,
    },

    /// Print the response a route would serve for the given values.
    Preview {
        /// Route manifest (stencil.yaml).
        #[arg(short, long)]
        manifest: PathBuf,

        /// HTTP method of the route.
        #[arg(long, default_value = "GET")]
        method: String,

        /// Path template of the route, e.g. /users/{user_id}.
        #[arg(long)]
        path: String,

        /// Placeholder value as name=value. May be repeated.
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Ship a route manifest to the serving engine and start it.
    Serve {
        /// Route manifest (stencil.yaml).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Engine shared library. Defaults to the platform name of
        /// `stencil_engine` in the working directory.
        #[arg(long, env = "STENCIL_ENGINE")]
        engine: Option<PathBuf>,

        /// Record the engine calls and print them instead of serving.
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

fn compile_manifest(path: &Path, options: &CompileOptions) -> anyhow::Result<CompiledApp> {
    let manifest = RouteManifest::load(path)?;
    let compiled = manifest
        .into_route_table()
        .build(&mut DependencyRegistry::new(), options)
        .with_context(|| format!("failed to compile {}", path.display()))?;
    Ok(compiled)
}

fn print_warnings(warnings: &[CompileWarning]) {
    for warn in warnings {
        if let Some(loc) = &warn.location {
            eprintln!("  {} [{}]: {} (warning)", warn.code, loc, warn.message);
        } else {
            eprintln!("  {}: {} (warning)", warn.code, warn.message);
        }
    }
}

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Run the compile command.
fn run_compile(manifest: &Path, output: Option<&Path>, no_probe: bool) -> ExitCode {
    let options = CompileOptions {
        detect_value_dependence: !no_probe,
    };

    let result = compile_manifest(manifest, &options).and_then(|compiled| {
        let json = serde_json::to_string_pretty(&compiled)?;
        write_output(output, &json)?;
        Ok(compiled)
    });

    match result {
        Ok(compiled) => {
            print_warnings(&compiled.warnings);
            eprintln!(
                "compiled {} ({} routes, {} dependencies)",
                manifest.display(),
                compiled.routes.len(),
                compiled.dependencies.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

#[derive(Serialize)]
struct ValidationResult {
    file: String,
    valid: bool,
    routes: usize,
    dependencies: Vec<String>,
    error: Option<String>,
    warnings: Vec<CompileWarning>,
}

/// Run the validate command.
fn run_validate(manifests: &[PathBuf], output_format: &str) -> ExitCode {
    let results: Vec<ValidationResult> = manifests
        .iter()
        .map(|path| {
            let file = path.display().to_string();
            match compile_manifest(path, &CompileOptions::default()) {
                Ok(compiled) => ValidationResult {
                    file,
                    valid: true,
                    routes: compiled.routes.len(),
                    dependencies: referenced_dependencies(&compiled)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    error: None,
                    warnings: compiled.warnings,
                },
                Err(e) => ValidationResult {
                    file,
                    valid: false,
                    routes: 0,
                    dependencies: Vec::new(),
                    error: Some(format!("{:#}", e)),
                    warnings: Vec::new(),
                },
            }
        })
        .collect();

    let valid_count = results.iter().filter(|r| r.valid).count();
    let total = results.len();

    if output_format == "json" {
        let output = serde_json::json!({
            "results": results,
            "summary": {
                "total": total,
                "valid": valid_count,
                "invalid": total - valid_count,
            }
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to encode results: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        for result in &results {
            if result.valid {
                eprintln!("✓ {} ({} routes)", result.file, result.routes);
            } else {
                eprintln!("✗ {}", result.file);
            }
            if let Some(error) = &result.error {
                eprintln!("  {}", error);
            }
            print_warnings(&result.warnings);
        }
        eprintln!();
        eprintln!(
            "validated {} manifest(s): {} valid, {} invalid",
            total,
            valid_count,
            total - valid_count
        );
    }

    if valid_count == total {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Run the openapi command.
fn run_openapi(manifest: &Path, output: Option<&Path>, info: &ApiInfo) -> ExitCode {
    let result = compile_manifest(manifest, &CompileOptions::default()).and_then(|compiled| {
        let document = openapi_document(&compiled, info);
        write_output(output, &serde_json::to_string_pretty(&document)?)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Run the preview command.
fn run_preview(manifest: &Path, method: &str, path: &str, params: &[(String, String)]) -> ExitCode {
    let result = (|| -> anyhow::Result<String> {
        let method: HttpMethod = method.parse()?;
        let compiled = compile_manifest(manifest, &CompileOptions::default())?;
        let route = compiled
            .route(method, path)
            .with_context(|| format!("no route {} {} in {}", method, path, manifest.display()))?;
        let values: BTreeMap<String, String> = params.iter().cloned().collect();
        Ok(substitute(&route.template, &values))
    })();

    match result {
        Ok(body) => {
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Run the serve command.
fn run_serve(manifest: &Path, engine: Option<&Path>, dry_run: bool) -> ExitCode {
    let table = match RouteManifest::load(manifest) {
        Ok(m) => m.into_route_table(),
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    if dry_run {
        let result = (|| -> anyhow::Result<String> {
            let mut app = App::with_engine(RecordingEngine::new())?;
            app.install(table)?;
            app.start()?;
            Ok(serde_json::to_string_pretty(app.into_engine().calls())?)
        })();
        return match result {
            Ok(calls) => {
                println!("{}", calls);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {:#}", e);
                ExitCode::from(1)
            }
        };
    }

    let engine_path = engine
        .map(Path::to_path_buf)
        .unwrap_or_else(default_engine_path);

    let result = (|| -> anyhow::Result<()> {
        let mut app = App::<NativeEngine>::load(&engine_path)?;
        let compiled = app.install(table)?;
        eprintln!(
            "shipped {} routes to {}",
            compiled.routes.len(),
            engine_path.display()
        );
        app.start()?;
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_format = match LogFormat::parse(&cli.log_format) {
        Some(format) => format,
        None => {
            eprintln!("error: unknown log format '{}'", cli.log_format);
            return ExitCode::from(2);
        }
    };
    let telemetry = TelemetryConfig::new()
        .with_log_level(cli.log_level.clone())
        .with_log_format(log_format);
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }

    match cli.command {
        Commands::Compile {
            manifest,
            output,
            no_probe,
        } => run_compile(&manifest, output.as_deref(), no_probe),
        Commands::Validate { manifest, format } => run_validate(&manifest, &format),
        Commands::Openapi {
            manifest,
            output,
            title,
            api_version,
        } => {
            let info = ApiInfo::default()
                .with_title(title)
                .with_version(api_version);
            run_openapi(&manifest, output.as_deref(), &info)
        }
        Commands::Preview {
            manifest,
            method,
            path,
            params,
        } => run_preview(&manifest, &method, &path, &params),
        Commands::Serve {
            manifest,
            engine,
            dry_run,
        } => run_serve(&manifest, engine.as_deref(), dry_run),
    }
}
