use std::path::PathBuf;

use anyhow::Result;
use banana_cli::common::{init_tracing, read_source_image, ProviderArgs};
use banana_engine::{generate_single, next_edit_output, DEFAULT_IMAGE_OUTPUT};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "generate_image",
    version,
    about = "Generate or edit a single image"
)]
struct Cli {
    /// Image description, or edit instructions with --input.
    prompt: String,
    /// Defaults to generated_image.png, or <input>_edited.png when editing.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    /// Image to edit.
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,
    #[command(flatten)]
    provider: ProviderArgs,
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

    let source = read_source_image(cli.input.as_ref())?;
    let output = match (&cli.output, &source) {
        (Some(output), _) => output.clone(),
        (None, Some(source)) => next_edit_output(&source.path),
        (None, None) => PathBuf::from(DEFAULT_IMAGE_OUTPUT),
    };
    let (config, client) = cli.provider.resolve()?;

    match &source {
        Some(source) => println!(
            "Editing {} with {} ({})...",
            source.path.display(),
            config.kind,
            config.image_model
        ),
        None => println!(
            "Generating image with {} ({})...",
            config.kind, config.image_model
        ),
    }
    let shot = generate_single(
        &client,
        &config.image_model,
        &cli.prompt,
        source.as_ref(),
        &output,
    )?;

    if let Some(text) = &shot.text {
        println!("\nModel response: {text}");
    }
    println!("\nImage saved to: {} ({} bytes)", shot.path.display(), shot.bytes);
    Ok(0)
}
