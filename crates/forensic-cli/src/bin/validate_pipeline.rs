//! `validate-pipeline <framework_config> <pipeline_config>`
//!
//! Valida un archivo de configuración de pipelines sin correr módulos ni
//! tocar la base de datos.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use forensic_blackboard::InMemoryObjectStore;
use forensic_core::{FrameworkContext, PipelineValidator, SystemProperties};

#[derive(Parser, Debug)]
#[command(name = "validate-pipeline", version, about = "Validates a pipeline configuration file")]
struct Args {
    /// Framework configuration file (system properties).
    framework_config: PathBuf,
    /// Pipeline configuration file to validate.
    pipeline_config: PathBuf,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            eprintln!("Usage: validate-pipeline <framework_config> <pipeline_config>");
            return ExitCode::FAILURE;
        }
    };
    forensic_cli::init_logging();

    println!("Validating {}", args.pipeline_config.display());
    let props = match SystemProperties::load(Some(&args.framework_config)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let ctx = Arc::new(FrameworkContext::new(props, Arc::new(InMemoryObjectStore::new())));
    let report = PipelineValidator::new(ctx).validate_file(&args.pipeline_config);

    for p in &report.pipelines {
        match &p.error {
            None => println!("  {}: valid", p.pipeline_type),
            Some(err) => println!("  {}: invalid ({err})", p.pipeline_type),
        }
    }
    if report.valid {
        println!("{} is valid.", args.pipeline_config.display());
    } else {
        println!("{} is invalid.", args.pipeline_config.display());
    }
    println!("Log messages created during validation:");
    for msg in &report.messages {
        println!("{msg}");
    }

    if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
