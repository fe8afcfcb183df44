use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{error, info};

use reportmerge::config::AppConfig;
use reportmerge::converter::{ConversionOutcome, ConversionService, FAILURE_MESSAGE};
use reportmerge::license::{EVALUATION_MODE_MESSAGE, LicenseState};
use reportmerge::{logging, panic_handler};

const USAGE: &str = "Usage: reportmerge <input.html> <output.docx> [--config <file.json>] [--template <file.docx>]";

struct CliArgs {
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    template: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut template = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(iter.next().context(USAGE)?)),
            "--template" => template = Some(PathBuf::from(iter.next().context(USAGE)?)),
            "-h" | "--help" => bail!(USAGE),
            _ if arg.starts_with("--") => bail!("Unknown option {arg}\n{USAGE}"),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let [input, output] = <[PathBuf; 2]>::try_from(positional).map_err(|_| anyhow::anyhow!(USAGE))?;
    Ok(CliArgs {
        input,
        output,
        config,
        template,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(env::args().skip(1).collect())?;

    let mut config = AppConfig::load(args.config.as_deref())?.apply_env();
    if args.template.is_some() {
        config.template_path = args.template;
    }
    logging::init_logging(&config)?;
    panic_handler::initialize_panic_handler();
    info!("Starting reportmerge {}", env!("CARGO_PKG_VERSION"));

    let license = LicenseState::load(&config.license_path);
    if license.evaluation_mode() {
        println!("{EVALUATION_MODE_MESSAGE}");
    }

    let service = Arc::new(ConversionService::new(config, license));
    let outcome = match service.prepare(&args.input, &args.output) {
        Ok(prepared) => service.clone().convert_in_background(prepared).await,
        Err(e) => {
            error!("Rejected conversion request: {e}");
            eprintln!("{e}");
            ConversionOutcome {
                success: false,
                status_message: FAILURE_MESSAGE.to_string(),
                evaluation_mode: service.evaluation_mode(),
            }
        }
    };

    println!("{}", outcome.status_message);
    info!("Shutting down reportmerge");
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
