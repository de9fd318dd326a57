use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use vsig7::codec::{binary, xml};
use vsig7::config::{DetectMode, OutputFormat, SignatureConfig};
use vsig7::consts::COMPARE_TH_XH;
use vsig7::extractor::Extractor;
use vsig7::matching::{self, MatchVerdict, MatchingThresholds};
use vsig7::types::StreamContext;
use vsig7::y4m::Y4MReader;
use vsig7::{Error, Result};

#[derive(Parser)]
#[command(name = "vsig7", about = "MPEG-7 video signature extraction and matching")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Extract a video signature from a Y4M file
  Extract {
    input: PathBuf,
    output: PathBuf,
    #[arg(long, value_enum, default_value = "binary")]
    format: OutputFormat,
    #[arg(long, value_enum, default_value = "full")]
    detect_mode: DetectMode,
  },
  /// Compare two previously extracted signature files
  Compare {
    a: PathBuf,
    b: PathBuf,
    // The buffer-compare entry point historically uses a looser per-frame
    // threshold than live extraction (§6); default to that value here.
    #[arg(long, default_value_t = COMPARE_TH_XH)]
    th_xh: u32,
    #[arg(long, value_enum, default_value = "full")]
    detect_mode: DetectMode,
  },
}

fn load_stream(path: &PathBuf) -> Result<StreamContext> {
  let mut data = Vec::new();
  File::open(path)?.read_to_end(&mut data)?;

  if path.extension().and_then(|e| e.to_str()) == Some("xml") {
    let text = String::from_utf8(data).map_err(|e| Error::InvalidXml(e.to_string()))?;
    xml::decode(&text)
  } else {
    binary::decode(&data)
  }
}

fn run_extract(input: PathBuf, output: PathBuf, format: OutputFormat, detect_mode: DetectMode) -> Result<()> {
  let config = SignatureConfig {
    detect_mode,
    output_format: format,
    output_template: output.to_string_lossy().into_owned(),
    num_inputs: 1,
    thresholds: MatchingThresholds::default(),
  };
  config.validate()?;

  let file = File::open(&input)?;
  let mut reader = Y4MReader::new(BufReader::new(file))?;
  let mut extractor = Extractor::new(reader.width(), reader.height(), (1, 30));

  let mut pts = 0i64;
  while let Some(frame) = reader.read_frame()? {
    extractor.push_frame(&frame, pts);
    pts += 1;
  }

  let stream = extractor.finish();
  log::info!("extracted {} fine signatures, {} coarse segments", stream.fine.len(), stream.coarse.len());

  let mut out = BufWriter::new(File::create(config.output_path(0))?);
  match config.output_format {
    OutputFormat::Binary => out.write_all(&binary::encode(&stream))?,
    OutputFormat::Xml => out.write_all(xml::encode(&stream)?.as_bytes())?,
  }
  Ok(())
}

fn run_compare(a: PathBuf, b: PathBuf, th_xh: u32, detect_mode: DetectMode) -> Result<()> {
  let config = SignatureConfig {
    detect_mode,
    thresholds: MatchingThresholds { th_xh, ..MatchingThresholds::default() },
    ..SignatureConfig::default()
  };
  config.validate()?;

  let stream_a = load_stream(&a)?;
  let stream_b = load_stream(&b)?;

  let result = matching::lookup(&stream_a, &stream_b, &config.thresholds, config.detect_mode);

  match result.verdict(&config.thresholds) {
    MatchVerdict::None => println!("no match"),
    MatchVerdict::Partial => println!(
      "partial match: {} frames, framerate ratio {:.3}, offset {}, mean distance {:.6}",
      result.matched_frames, result.framerate_ratio, result.offset, result.mean_distance
    ),
    MatchVerdict::Whole => println!(
      "whole match: framerate ratio {:.3}, offset {}",
      result.framerate_ratio, result.offset
    ),
  }
  Ok(())
}

fn main() -> ExitCode {
  env_logger::init();
  let cli = Cli::parse();

  let result = match cli.command {
    Command::Extract { input, output, format, detect_mode } => run_extract(input, output, format, detect_mode),
    Command::Compare { a, b, th_xh, detect_mode } => run_compare(a, b, th_xh, detect_mode),
  };

  if let Err(e) = result {
    eprintln!("error: {}", e);
    ExitCode::FAILURE
  } else {
    ExitCode::SUCCESS
  }
}
