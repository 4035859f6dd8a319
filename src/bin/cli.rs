use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dtvcc_extract::config::DtvccConfig;
use dtvcc_extract::constants::{DEFAULT_CC_COUNT, DEFAULT_FPS, EXIT_FAILURE, MAX_SERVICES};
use dtvcc_extract::extractor::{Options, run};
use dtvcc_extract::report::Reporter;
use dtvcc_extract::types::{OutputFormat, ServiceSet};
use dtvcc_extract::DtvccError;

#[derive(Parser)]
#[clap(version, about = "Extract CEA-708 (DTVCC) caption services from raw cc_data tuples")]
struct Opt {
    /// File of 4-byte (cc_valid, cc_type, data0, data1) tuples; stdin if omitted
    input: Option<PathBuf>,

    /// TOML configuration file; command line flags take precedence
    #[clap(long)]
    config: Option<PathBuf>,

    /// Services to decode, e.g. "1,2"
    #[clap(long, value_delimiter = ',')]
    services: Vec<usize>,

    /// Charset applied to every service
    #[clap(long)]
    charset: Option<String>,

    /// Per-service charset as SERVICE=CHARSET, repeatable
    #[clap(long = "service-charset", value_parser = parse_service_charset)]
    service_charsets: Vec<(usize, String)>,

    /// Base output filename; service N writes <stem>_N.<ext>
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Write every service to standard output
    #[clap(long, default_value_t = false)]
    stdout: bool,

    #[clap(long, value_enum)]
    format: Option<OutputFormat>,

    /// Print a JSON summary when done (to stderr with --stdout)
    #[clap(long, default_value_t = false)]
    report: bool,

    /// cc tuples per video frame (1..=31)
    #[clap(long, default_value_t = DEFAULT_CC_COUNT)]
    cc_count: usize,

    /// Frame rate used to time captions
    #[clap(long, default_value_t = DEFAULT_FPS)]
    fps: f64,

    /// Debug logging (RUST_LOG overrides)
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_service_charset(s: &str) -> Result<(usize, String), String> {
    let (service, charset) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SERVICE=CHARSET, got {s:?}"))?;
    let service = service.trim().parse().map_err(|e| format!("bad service number: {e}"))?;
    Ok((service, charset.trim().to_string()))
}

fn main() -> ExitCode {
    let opt = Opt::parse();
    let default_filter = if opt.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match execute(opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<DtvccError>().map_or(EXIT_FAILURE, DtvccError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn execute(opt: Opt) -> anyhow::Result<()> {
    let file_config = match &opt.config {
        Some(path) => DtvccConfig::load(path)?,
        None => DtvccConfig::default(),
    };
    let mut settings = file_config.into_settings()?;

    if !opt.services.is_empty() {
        settings.services_enabled = ServiceSet::from_service_numbers(&opt.services)?;
        settings.active_services_count = settings.services_enabled.count();
    }
    if let Some(charset) = opt.charset {
        settings.all_services_charset = Some(charset);
    }
    for (service, charset) in opt.service_charsets {
        if service == 0 || service > MAX_SERVICES {
            anyhow::bail!("--service-charset: service {service} outside 1..={MAX_SERVICES}");
        }
        settings.set_service_charset(service - 1, charset);
    }
    if let Some(output) = opt.output {
        settings.basefilename = output;
    } else if let Some(input) = &opt.input {
        settings.basefilename = input.clone();
    }
    settings.cc_to_stdout |= opt.stdout;
    if let Some(format) = opt.format {
        settings.output_format = format;
    }
    settings.print_file_reports |= opt.report;

    if settings.active_services_count == 0 {
        log::warn!("no services enabled, input will only be scanned for reports");
    }

    let captions_on_stdout = settings.cc_to_stdout;
    let summary = run(Options {
        input: opt.input,
        settings,
        cc_count: opt.cc_count,
        fps: opt.fps,
    })?;

    if let Some(report) = summary.report {
        let json = Reporter::to_json(&report)?;
        // keep stdout a clean caption stream
        if captions_on_stdout {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }
    Ok(())
}
