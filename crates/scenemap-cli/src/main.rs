//! Scenemap CLI: one-file context report for a Godot project.

use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use scenemap_core::config::ScanConfig;
use scenemap_core::error::ScanError;
use scenemap_core::output::{write_json, write_report, ScanSummary};
use scenemap_core::paths::ExclusionMatch;
use scenemap_core::pipeline::{self, ScanResult};
use scenemap_core::report::{render_report, ReportOptions};

const DEFAULT_REPORT_NAME: &str = "project_report.md";

#[derive(Parser)]
#[command(
    name = "scenemap",
    version,
    about = "Scenemap - Map scenes, scripts and resource usage of a Godot project"
)]
struct Cli {
    /// Folder containing project.godot
    project_root: PathBuf,

    /// Markdown report path (default: <PROJECT_ROOT>/project_report.md)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the project model as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Leave full script sources out of the report
    #[arg(long)]
    no_script_contents: bool,

    /// Additional directory names to skip
    #[arg(long, value_name = "DIR")]
    exclude: Vec<String>,

    /// Treat editor recent/auto references as path prefixes
    #[arg(long)]
    prefix_exclusions: bool,

    /// Do not derive dependencies from class_name mentions
    #[arg(long)]
    no_class_refs: bool,

    /// Debug logging and per-phase timings
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn into_config(self, root: PathBuf) -> ScanConfig {
        let output = self
            .output
            .unwrap_or_else(|| root.join(DEFAULT_REPORT_NAME));

        let mut config = ScanConfig {
            project_root: root.to_string_lossy().to_string(),
            output_path: Some(output.to_string_lossy().to_string()),
            json_output_path: self.json.map(|p| p.to_string_lossy().to_string()),
            include_script_contents: !self.no_script_contents,
            class_name_references: !self.no_class_refs,
            verbose: self.verbose,
            quiet: self.quiet,
            ..Default::default()
        };
        config.ignore_dirs.extend(self.exclude);
        if self.prefix_exclusions {
            config.exclusion_match = ExclusionMatch::Prefix;
        }
        config
    }
}

/// Canonical project root. A missing root fails here, before any output starts.
fn resolve_root(path: &Path) -> Result<PathBuf, ScanError> {
    if !path.is_dir() {
        return Err(ScanError::InvalidRoot(path.to_path_buf()));
    }
    Ok(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let root = match resolve_root(&cli.project_root) {
        Ok(root) => root,
        Err(e) => fail("Invalid project root", &e),
    };
    init_logging(cli.verbose, cli.quiet);
    let config = cli.into_config(root);
    log::debug!(
        "scanning {} (report: {:?}, json: {:?})",
        config.project_root,
        config.output_path,
        config.json_output_path
    );

    let result = if config.quiet {
        pipeline::run_pipeline(&config, None)
    } else {
        run_with_progress(&config)
    };

    let result = match result {
        Ok(r) => r,
        Err(e) => fail("Scan failed", &e),
    };

    let written = match write_outputs(&config, &result) {
        Ok(paths) => paths,
        Err(e) => fail("Error writing output", &e),
    };

    if !config.quiet {
        print_summary(&config, &result, &written);
    }
}

fn fail(context: &str, error: &dyn std::fmt::Display) -> ! {
    eprintln!("{} {context}: {error}", style("✗").red().bold());
    std::process::exit(1);
}

fn run_with_progress(config: &ScanConfig) -> Result<ScanResult, ScanError> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("Starting...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let result = pipeline::run_pipeline(config, Some(progress));
    pb.finish_and_clear();
    result
}

/// Render and write the report (and JSON when asked). Returns the written paths.
fn write_outputs(
    config: &ScanConfig,
    result: &ScanResult,
) -> Result<Vec<String>, ScanError> {
    let mut written = Vec::new();

    if let Some(report_path) = &config.output_path {
        let options = ReportOptions {
            include_script_contents: config.include_script_contents,
            ..ReportOptions::new(config.project_root.clone())
        };
        write_report(&render_report(&result.model, &options), report_path)?;
        written.push(report_path.clone());
    }

    if let Some(json_path) = &config.json_output_path {
        write_json(&result.model, json_path)?;
        written.push(json_path.clone());
    }

    Ok(written)
}

fn print_summary(config: &ScanConfig, result: &ScanResult, written: &[String]) {
    let summary = ScanSummary::from_result(result);
    let project = Path::new(&config.project_root)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    println!(
        "\n{}  Scenemap: {}",
        style("✓").green().bold(),
        style(project).bold()
    );
    println!("  {:<14} {}", "Files:", summary.files);
    println!("  {:<14} {}", "Scenes:", summary.scenes);
    println!("  {:<14} {}", "Scripts:", summary.scripts);
    println!("  {:<14} {}", "Resources:", summary.resources);
    println!("  {:<14} {}", "Unused:", summary.unused_resources);
    let warnings = if summary.warnings > 0 {
        style(summary.warnings.to_string()).yellow()
    } else {
        style(summary.warnings.to_string())
    };
    println!("  {:<14} {}", "Warnings:", warnings);
    println!("  {:<14} {:.1}ms", "Duration:", summary.total_ms);

    if config.verbose {
        println!("\n  Phase Timings:");
        for (phase, secs) in &result.timings {
            println!("    {:<14} {:.1}ms", phase, secs * 1000.0);
        }
    }

    for path in written {
        println!("\n  {} {}", style("Output written to:").green(), path);
    }
}
