//! Pipewright CLI Entry Point
//!
//! Provides a command-line interface for exporting workflow graphs.
//!
//! # Usage
//!
//! ```bash
//! # Print the CWL export of a workflow
//! pipewright qc.yaml
//!
//! # Nextflow, using a custom tool catalog
//! pipewright qc.yaml --format nextflow --catalog tools.yaml
//!
//! # Write all three formats into a directory
//! pipewright qc.yaml --format all --output-dir exported/
//!
//! # Validate only, machine-readable report
//! pipewright qc.yaml --check --report-json
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};
use serde::Serialize;

use pipewright::export::{ExportFormat, Exporter};
use pipewright::workflow::loader::{load_catalog, load_definition, write_export};
use pipewright::workflow::validator::Diagnostic;
use pipewright::{ExportError, ToolCatalog, WorkflowDefinition, APP_NAME, VERSION};

/// Default workflow file used when none is specified.
const DEFAULT_WORKFLOW: &str = "workflow.yaml";

/// Which formats to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatSelection {
    One(ExportFormat),
    All,
}

impl FormatSelection {
    fn parse(value: &str) -> Result<Self, String> {
        if value.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value.parse().map(Self::One).map_err(|e: ExportError| e.to_string())
    }
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    workflow_path: String,
    format: FormatSelection,
    catalog_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    check_only: bool,
    report_json: bool,
    list_tools: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflow_path: DEFAULT_WORKFLOW.to_string(),
            format: FormatSelection::One(ExportFormat::Cwl),
            catalog_path: None,
            output_dir: None,
            check_only: false,
            report_json: false,
            list_tools: false,
            verbose: false,
        }
    }
}

/// Validation outcome printed by `--report-json`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    workflow: &'a str,
    valid: bool,
    diagnostics: Vec<Diagnostic>,
}

/// Configures the logging system with appropriate formatting.
///
/// Logs go to stderr so exported text on stdout stays clean.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    eprintln!();
    eprintln!("{} v{}", APP_NAME.bold(), VERSION);
    eprintln!("Workflow Export Engine");
    eprintln!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: pipewright [OPTIONS] <WORKFLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <WORKFLOW_FILE>       Path to workflow definition (YAML or JSON)");
    println!();
    println!("Options:");
    println!("  --format FORMAT       cwl, nextflow, snakemake or all (default: cwl)");
    println!("  --catalog FILE        Tool catalog replacing the built-in tools");
    println!("  --output-dir DIR      Write exports to DIR instead of stdout");
    println!("  --check               Validate only, do not export");
    println!("  --report-json         Print validation results as JSON");
    println!("  --list-tools          List catalog tools and exit");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  pipewright qc.yaml");
    println!("  pipewright qc.yaml --format nextflow --catalog tools.yaml");
    println!("  pipewright qc.yaml --format all --output-dir exported/");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--check" => {
                config.check_only = true;
            }
            "--report-json" => {
                config.report_json = true;
            }
            "--list-tools" => {
                config.list_tools = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--format" | "-f" => {
                i += 1;
                if i >= args.len() {
                    return Err("--format requires a format argument".to_string());
                }
                config.format = FormatSelection::parse(&args[i])?;
            }
            "--catalog" => {
                i += 1;
                if i >= args.len() {
                    return Err("--catalog requires a path argument".to_string());
                }
                config.catalog_path = Some(PathBuf::from(&args[i]));
            }
            "--output-dir" | "-o" => {
                i += 1;
                if i >= args.len() {
                    return Err("--output-dir requires a path argument".to_string());
                }
                config.output_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.workflow_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    if config.format == FormatSelection::All
        && config.output_dir.is_none()
        && !config.check_only
    {
        return Err("--format all requires --output-dir".to_string());
    }

    Ok(config)
}

fn print_tools(catalog: &ToolCatalog) {
    for tool_id in catalog.tool_ids() {
        let Some(tool) = catalog.get(tool_id) else {
            continue;
        };
        let ports = |ports: &[pipewright::workflow::PortSpec]| {
            ports
                .iter()
                .map(|p| {
                    if p.required {
                        format!("{}:{}", p.key, p.data_type)
                    } else {
                        format!("{}:{}?", p.key, p.data_type)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "{} {:<20} ({}) -> ({})",
            format!("{:<16}", tool.tool_id).bold(),
            tool.name,
            ports(&tool.inputs),
            ports(&tool.outputs)
        );
    }
}

/// Prints every validation problem in a human-readable form.
fn print_diagnostics(diagnostics: &[Diagnostic]) {
    eprintln!(
        "{} {} problem(s) found:",
        "Invalid workflow:".red().bold(),
        diagnostics.len()
    );
    for diagnostic in diagnostics {
        let mut location = Vec::new();
        if !diagnostic.node_ids.is_empty() {
            let ids: Vec<String> = diagnostic.node_ids.iter().map(|id| id.to_string()).collect();
            location.push(format!("nodes {}", ids.join(", ")));
        }
        if !diagnostic.edge_ids.is_empty() {
            location.push(format!("edges {}", diagnostic.edge_ids.join(", ")));
        }
        eprintln!(
            "  {} {}{}",
            "-".red(),
            diagnostic.message,
            if location.is_empty() {
                String::new()
            } else {
                format!(" [{}]", location.join("; ")).dimmed().to_string()
            }
        );
    }
}

fn print_report(
    config: &Config,
    diagnostics: Vec<Diagnostic>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = Report {
        workflow: &config.workflow_path,
        valid: diagnostics.is_empty(),
        diagnostics,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Handles a failed export, returning the error to propagate.
fn report_failure(
    config: &Config,
    err: ExportError,
) -> Result<Box<dyn std::error::Error>, Box<dyn std::error::Error>> {
    if !err.is_user_correctable() {
        return Ok(err.into());
    }

    let diagnostics = err.diagnostics();
    if config.report_json {
        print_report(config, diagnostics)?;
    } else {
        print_diagnostics(&diagnostics);
    }
    Ok(err.into())
}

fn export_workflow(
    config: &Config,
    exporter: &Exporter<'_>,
    definition: &WorkflowDefinition,
) -> Result<(), Box<dyn std::error::Error>> {
    let results = match config.format {
        FormatSelection::One(format) => vec![exporter.export(definition, format)?],
        FormatSelection::All => exporter.export_all(definition)?,
    };

    match &config.output_dir {
        Some(dir) => {
            for result in &results {
                let path = write_export(result, dir)?;
                eprintln!("{} {}", "Wrote".green().bold(), path.display());
            }
        }
        None => {
            for result in &results {
                print!("{}", result.content);
            }
        }
    }

    Ok(())
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);

    let catalog = match &config.catalog_path {
        Some(path) => load_catalog(path).map_err(|e| {
            error!("Failed to load catalog: {}", e);
            e
        })?,
        None => ToolCatalog::builtin(),
    };

    if config.list_tools {
        print_tools(&catalog);
        return Ok(());
    }

    if !config.report_json {
        print_banner();
    }

    let definition = load_definition(&config.workflow_path).map_err(|e| {
        error!("Failed to load workflow: {}", e);
        format!(
            "Could not load workflow from '{}': {}",
            config.workflow_path, e
        )
    })?;

    info!(
        "Workflow loaded: {} nodes, {} edges, {} catalog tools",
        definition.nodes.len(),
        definition.edges.len(),
        catalog.len()
    );

    let exporter = Exporter::new(&catalog);

    if config.check_only {
        return match exporter.prepare(&definition) {
            Ok(script) => {
                if config.report_json {
                    print_report(&config, Vec::new())?;
                } else {
                    eprintln!(
                        "{} {} steps, {} inputs, {} outputs",
                        "Workflow is valid:".green().bold(),
                        script.steps.len(),
                        script.inputs.len(),
                        script.outputs.len()
                    );
                }
                Ok(())
            }
            Err(e) => Err(report_failure(&config, e)?),
        };
    }

    match export_workflow(&config, &exporter, &definition) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast::<ExportError>() {
            Ok(export_error) => Err(report_failure(&config, *export_error)?),
            Err(other) => Err(other),
        },
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pipewright")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&["qc.yaml"])).unwrap();
        assert_eq!(config.workflow_path, "qc.yaml");
        assert_eq!(config.format, FormatSelection::One(ExportFormat::Cwl));
        assert!(config.output_dir.is_none());
        assert!(!config.check_only);
    }

    #[test]
    fn test_parse_format_and_output_dir() {
        let config =
            parse_arguments(&args(&["qc.yaml", "--format", "nf", "-o", "out"])).unwrap();
        assert_eq!(config.format, FormatSelection::One(ExportFormat::Nextflow));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_parse_all_requires_output_dir() {
        assert!(parse_arguments(&args(&["qc.yaml", "--format", "all"])).is_err());
        let config = parse_arguments(&args(&["qc.yaml", "--format", "all", "--check"])).unwrap();
        assert_eq!(config.format, FormatSelection::All);
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let err = parse_arguments(&args(&["qc.yaml", "--format", "wdl"])).unwrap_err();
        assert!(err.contains("wdl"));
    }

    #[test]
    fn test_parse_rejects_unknown_option() {
        assert!(parse_arguments(&args(&["--frobnicate"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "--catalog"])).is_err());
    }
}
