//! `analyze-dir [-c fw] [-p pipeline] [-d outdir] <dir>`
//!
//! Ingresa un árbol ya extraído, corre el pipeline FileAnalysis sobre cada
//! entrada en paralelo y luego el pipeline de reporte.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use forensic_cli::{ingest_directory, init_logging, open_store, AnalysisSummary, CliError};
use forensic_core::{FrameworkContext, PipelineManager, PredefinedProperty, SystemProperties};
use log::{error, info, warn};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "analyze-dir", version, about = "Runs the configured pipelines over a directory tree")]
struct Args {
    /// Framework configuration file.
    #[arg(short = 'c', long = "config")]
    framework_config: Option<PathBuf>,

    /// Pipeline configuration file (defaults to CONFIG_DIR/pipeline_config.xml).
    #[arg(short = 'p', long = "pipeline")]
    pipeline_config: Option<PathBuf>,

    /// Output directory; must not exist. Defaults to `<dir>_out`.
    #[arg(short = 'd', long = "outdir")]
    out_dir: Option<PathBuf>,

    /// Directory to analyze.
    source: PathBuf,
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn run(args: Args) -> Result<AnalysisSummary, CliError> {
    if !args.source.is_dir() {
        return Err(CliError::Usage(format!("not a directory: {}", args.source.display())));
    }
    let out_dir = match args.out_dir {
        Some(d) => d,
        None => PathBuf::from(format!("{}_out", args.source.display())),
    };
    if out_dir.exists() {
        return Err(CliError::Usage(format!("output directory already exists: {}", out_dir.display())));
    }
    let mut props = SystemProperties::load(args.framework_config.as_deref())?;
    props.set_predefined(PredefinedProperty::OutDir, absolute(&out_dir)?.display().to_string());
    if let Some(p) = &args.pipeline_config {
        props.set_predefined(PredefinedProperty::PipelineConfigFile, absolute(p)?.display().to_string());
    }
    props.check_required()?;

    let ctx = Arc::new(FrameworkContext::new(props, open_store()?));
    let manager = PipelineManager::new(Arc::clone(&ctx));
    let pipeline = manager.create_file_analysis_pipeline()?;
    std::fs::create_dir_all(&out_dir)?;

    let files = ingest_directory(ctx.blackboard(), &args.source)?;
    info!("Registered {} entries from {}", files.len(), args.source.display());

    let results: Vec<_> = files.par_iter().map(|f| pipeline.run(f)).collect();
    let mut summary = AnalysisSummary::default();
    for (file, result) in files.iter().zip(&results) {
        if let Err(e) = result {
            error!("Error analyzing {}: {e}", file.path.display());
        }
        summary.record(result);
    }

    match manager.create_report_pipeline() {
        Ok(report) => {
            for run in report.run()? {
                info!("Report module {} finished with {}", run.module, run.status);
            }
        }
        Err(e) => warn!("Report pipeline not run: {e}"),
    }
    Ok(summary)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();
    match run(args) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("analyze-dir: {e}");
            ExitCode::FAILURE
        }
    }
}
