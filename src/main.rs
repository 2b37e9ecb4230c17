use clap::Parser;
use reportflow::{LayoutConfig, Report, ReportError};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Lays out a report template with its data and writes the recorded pages
/// as JSON.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Report template (JSON)
    template: PathBuf,

    /// Report data (JSON object)
    data: Option<PathBuf>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Data rows a table prepares at a time
    #[arg(long, default_value_t = LayoutConfig::default().table_batch_size)]
    batch_size: usize,

    /// Page attempts before generation is aborted
    #[arg(long, default_value_t = LayoutConfig::default().max_page_attempts)]
    max_pages: usize,

    /// Only check the template and data
    #[arg(long, default_value_t = false)]
    verify: bool,
}

fn main() -> Result<(), ReportError> {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "reportflow=info");
        }
    }
    env_logger::init();

    let args = Args::parse();
    let config = LayoutConfig {
        table_batch_size: args.batch_size.max(1),
        max_page_attempts: args.max_pages,
    };

    let template = fs::read_to_string(&args.template)?;
    let data = match &args.data {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };

    let mut report = Report::from_json(&template, &data, config)?;
    if args.verify {
        report.verify()?;
        eprintln!("{}: template and data are valid", args.template.display());
        return Ok(());
    }

    let document = report.render_document()?;
    let json = serde_json::to_string_pretty(&document)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            eprintln!("Wrote {} page(s) to {}", document.pages.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
