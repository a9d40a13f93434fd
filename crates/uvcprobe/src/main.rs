//! Implements the CLI for uvcprobe

use std::io::BufWriter;
use std::io::Read;

use camino::Utf8Path;
use clap::Parser;
use eyre::WrapErr;
use lsusb_tree::Schema;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uvcprobe::cli::Cli;
use uvcprobe::output;

#[cfg(target_env = "musl")]
use mimalloc::MiMalloc;

#[cfg(target_env = "musl")]
#[cfg_attr(target_env = "musl", global_allocator)]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    // Logs go to stderr, stdout is for the device trees
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    let cli = Cli::parse();

    let input = read_input(cli.input_path())?;
    let devices = uvcprobe::parse_devices(&input, &Schema::lsusb())?;
    tracing::info!(count = devices.len(), "Parsed devices");

    let formats = cli.report_formats();
    if formats.is_empty() {
        let stdout = BufWriter::new(std::io::stdout().lock());
        return output::write_trees(stdout, &devices, cli.pretty);
    }

    let reports = uvcprobe::build_reports(&devices)?;
    if reports.is_empty() {
        tracing::warn!("No USB video devices found");
    }
    for path in output::write_reports(&cli.output_dir, &reports, &formats)? {
        tracing::info!("Wrote {path}");
    }
    Ok(())
}

fn read_input(path: Option<&Utf8Path>) -> eyre::Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {path}"))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .wrap_err("Failed to read standard input")?;
            Ok(input)
        }
    }
}
