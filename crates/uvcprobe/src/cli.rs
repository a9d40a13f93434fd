use camino::Utf8Path;
use camino::Utf8PathBuf;
use clap::Parser;

use crate::output::ReportFormat;

/// Parse `lsusb -v` output and report what USB video devices can stream.
///
/// Without any report flags, all devices are printed as a JSON array of
/// descriptor trees.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File with the output of `lsusb -v` (default: standard input)
    pub input: Option<Utf8PathBuf>,
    /// Write a JSON report per video device
    #[arg(long)]
    pub json: bool,
    /// Write a YAML report per video device
    #[arg(long)]
    pub yaml: bool,
    /// Write a plain text summary per video device
    #[arg(long)]
    pub txt: bool,
    /// Directory to write reports to
    #[arg(short, long, default_value = "devicereports")]
    pub output_dir: Utf8PathBuf,
    /// Pretty print the descriptor trees
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Report formats that were asked for (empty means print all trees)
    pub fn report_formats(&self) -> Vec<ReportFormat> {
        [
            (self.json, ReportFormat::Json),
            (self.yaml, ReportFormat::Yaml),
            (self.txt, ReportFormat::Txt),
        ]
        .into_iter()
        .filter_map(|(enabled, format)| enabled.then_some(format))
        .collect()
    }

    /// Path to read from, `None` for standard input
    pub fn input_path(&self) -> Option<&Utf8Path> {
        self.input.as_deref().filter(|path| path.as_str() != "-")
    }
}
