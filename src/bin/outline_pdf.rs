//! Add an outline to an exported PDF
//!
//! Reads the extractor's headings (a JSON array of
//! `{"tagName", "text", "anchorId"}` records) and writes a copy of the PDF
//! with bookmarks.
//!
//! Usage:
//!   outline_pdf <input.pdf> <headings.json> <output.pdf> [options]
//!
//! Options:
//!   --tags h1,h2,h3     Outline tags, outermost first (default h1..h6)
//!   --pages pages.json  Page boxes (`[{"media": {..}, "crop": {..}}]`) for trim boxes
//!   --compress          Flate-compress unfiltered streams
//!   --pretty            One dictionary entry per line

use paged_pdf::{postprocess, ExportConfig, HeadingRecord, PageBoxes};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

struct Args {
    input: PathBuf,
    headings: PathBuf,
    output: PathBuf,
    pages: Option<PathBuf>,
    config: ExportConfig,
}

impl Args {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut positional = Vec::new();
        let mut pages = None;
        let mut config = ExportConfig::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--tags" => {
                    i += 1;
                    let list = args.get(i).ok_or("--tags needs a value")?;
                    config = config.with_outline_tag_list(list);
                },
                "--pages" => {
                    i += 1;
                    pages = Some(PathBuf::from(args.get(i).ok_or("--pages needs a value")?));
                },
                "--compress" => config = config.with_compress_streams(true),
                "--pretty" => config = config.with_compact(false),
                flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
                path => positional.push(PathBuf::from(path)),
            }
            i += 1;
        }

        let [input, headings, output]: [PathBuf; 3] = positional
            .try_into()
            .map_err(|_| "expected <input.pdf> <headings.json> <output.pdf>".to_string())?;

        Ok(Self {
            input,
            headings,
            output,
            pages,
            config,
        })
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let input = std::fs::read(&args.input)?;
    let headings: Vec<HeadingRecord> =
        serde_json::from_str(&std::fs::read_to_string(&args.headings)?)?;
    let pages: Vec<PageBoxes> = match &args.pages {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let output = postprocess(&input, &headings, &pages, &args.config)?;
    std::fs::write(&args.output, &output)?;

    println!(
        "Wrote {} ({} headings, {} bytes) in {:.1}ms",
        args.output.display(),
        headings.len(),
        output.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: outline_pdf <input.pdf> <headings.json> <output.pdf> [--tags h1,h2] [--pages pages.json] [--compress] [--pretty]");
            return ExitCode::from(2);
        },
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
