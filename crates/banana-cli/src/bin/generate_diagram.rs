use std::path::PathBuf;

use anyhow::Result;
use banana_cli::common::{init_tracing, read_source_image, ProviderArgs};
use banana_cli::report::{render_header, render_report};
use banana_contracts::events::EventWriter;
use banana_contracts::presets::{DocType, MAX_DIAGRAM_ITERATIONS};
use banana_engine::{ConfigError, GenerationRequest, Generator};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "generate_diagram",
    version,
    about = "Generate diagrams with threshold-gated review iterations"
)]
struct Cli {
    /// Description of the diagram, or edit instructions with --input.
    prompt: String,
    #[arg(long, short = 'o')]
    output: PathBuf,
    /// Document type selecting the quality threshold.
    #[arg(long, value_parser = parse_doc_type)]
    doc_type: Option<DocType>,
    #[arg(long, default_value_t = MAX_DIAGRAM_ITERATIONS)]
    iterations: u32,
    /// Existing diagram to edit; attached to the first iteration only.
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,
    /// Append run events as JSONL to this file.
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    provider: ProviderArgs,
}

fn parse_doc_type(raw: &str) -> Result<DocType, String> {
    raw.parse::<DocType>()
        .map_err(|err| ConfigError::UnknownDocType(err).to_string())
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.provider.verbose);

    let doc_type = cli.doc_type.unwrap_or_default();
    let mut request = GenerationRequest::new(&cli.prompt, doc_type, cli.iterations, &cli.output)?;
    if let Some(source) = read_source_image(cli.input.as_ref())? {
        request = request.with_source_image(source);
    }
    let (config, client) = cli.provider.resolve()?;

    print!(
        "{}",
        render_header(
            &config,
            &cli.prompt,
            doc_type.name(),
            doc_type.threshold(),
            cli.iterations,
            cli.input.as_ref().map(|path| path.display().to_string()).as_deref(),
            &cli.output.display().to_string(),
        )
    );

    let mut generator = Generator::new(
        client,
        config.image_model.clone(),
        config.review_model.clone(),
        request,
    );
    if let Some(path) = &cli.events {
        let events = EventWriter::new(path);
        tracing::debug!(run_id = events.run_id(), path = %path.display(), "writing events");
        generator = generator.with_events(events);
    }
    let report = generator.run()?;

    print!("{}", render_report(&report));
    Ok(0)
}
