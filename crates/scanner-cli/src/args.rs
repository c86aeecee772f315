use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::split_list;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Digest,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "digest" | "md" | "markdown" => Ok(OutputFormat::Digest),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => bail!("Unknown output format '{other}' (expected digest, json or csv)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub sectors: Option<Vec<String>>,
    pub min_score: Option<f64>,
    pub min_confidence: Option<f64>,
    pub top: Option<usize>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub fixtures: Option<PathBuf>,
    pub notify: bool,
    pub list_sectors: bool,
    pub help: bool,
}

fn value_of<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => match args.get(i + 1).filter(|v| !v.starts_with("--")) {
            Some(v) => Ok(Some(v.as_str())),
            None => bail!("{flag} expects a value"),
        },
        None => Ok(None),
    }
}

fn parsed<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value_of(args, flag)?
        .map(|v| v.parse().with_context(|| format!("Invalid value for {flag}: {v}")))
        .transpose()
}

/// Flags followed by a value. The value may itself start with '-'.
const VALUE_FLAGS: [&str; 7] = [
    "--sectors",
    "--min-score",
    "--min-confidence",
    "--top",
    "--format",
    "--output",
    "--fixtures",
];

const SWITCHES: [&str; 4] = ["--notify", "--list-sectors", "--help", "-h"];

fn finite(flag: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() => bail!("{flag} must be a finite number (got {v})"),
        other => Ok(other),
    }
}

impl CliArgs {
    /// Parse arguments, program name excluded.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            if VALUE_FLAGS.contains(&arg) {
                i += 2;
                continue;
            }
            if arg.starts_with('-') && !SWITCHES.contains(&arg) {
                bail!("Unknown option {arg}");
            }
            i += 1;
        }

        Ok(Self {
            sectors: value_of(args, "--sectors")?.map(split_list),
            min_score: finite("--min-score", parsed(args, "--min-score")?)?,
            min_confidence: finite("--min-confidence", parsed(args, "--min-confidence")?)?,
            top: parsed(args, "--top")?,
            format: value_of(args, "--format")?
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
            output: value_of(args, "--output")?.map(PathBuf::from),
            fixtures: value_of(args, "--fixtures")?.map(PathBuf::from),
            notify: args.iter().any(|a| a == "--notify"),
            list_sectors: args.iter().any(|a| a == "--list-sectors"),
            help: args.iter().any(|a| a == "--help" || a == "-h"),
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  smartvalue [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --sectors A,B          Restrict the scan to these sectors (default: all)");
    eprintln!("  --min-score N          Minimum total score (default: MIN_SCORE or 35)");
    eprintln!("  --min-confidence N     Minimum confidence (default: MIN_CONFIDENCE or 50)");
    eprintln!("  --top N                Records in the digest (default: TOP_N or 5)");
    eprintln!("  --format F             digest | json | csv (default: digest)");
    eprintln!("  --output PATH          Write the output to PATH instead of stdout");
    eprintln!("  --fixtures PATH        Read metrics from a JSON file instead of Yahoo Finance");
    eprintln!("  --notify               Send the digest to configured channels");
    eprintln!("  --list-sectors         Print the built-in sectors and exit");
}
