use anyhow::{Context, Result};
use clap::Parser;
use img_budget::cli::{Args, Commands};
use img_budget::{
    analyze_image, batch_compress_images, compress_image, print_image_info, BatchOptions,
    PipelineSettings, PngSettings, SizeBudget,
};
use std::io::{self, BufRead};
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    img_budget::logger::init(args.quiet, args.verbose);

    match args.command.unwrap_or_default() {
        Commands::Batch {
            input,
            output,
            budget,
            recursive,
            zopfli,
            pause,
        } => {
            let input = match input {
                Some(input) => input,
                None => executable_dir()?.to_string_lossy().into_owned(),
            };
            let options = BatchOptions {
                input,
                output,
                recursive,
                settings: settings(budget, zopfli)?,
            };
            let result = batch_compress_images(&options).context("batch compression failed");
            if pause {
                wait_for_enter();
            }
            result?;
        }
        Commands::Compress {
            input,
            output,
            budget,
            zopfli,
        } => {
            let settings = settings(budget, zopfli)?;
            compress_image(&input, output, &settings).map_err(|e| {
                if let Some(guidance) = e.guidance() {
                    eprintln!("{}", guidance);
                }
                anyhow::Error::new(e).context(format!("failed to compress {:?}", input))
            })?;
        }
        Commands::Info { input, budget } => {
            let budget = SizeBudget::new(budget)?;
            let report = analyze_image(&input, budget)
                .with_context(|| format!("failed to analyze {:?}", input))?;
            print_image_info(&report, budget);
        }
    }

    Ok(())
}

fn settings(budget: u64, zopfli: bool) -> Result<PipelineSettings> {
    Ok(PipelineSettings::new(
        SizeBudget::new(budget)?,
        PngSettings { zopfli },
    ))
}

/// Directory holding the running binary, the default input for a bare run.
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("error getting executable path")?;
    exe.parent()
        .map(|dir| dir.to_path_buf())
        .context("executable has no parent directory")
}

fn wait_for_enter() {
    println!("Press Enter to exit...");
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
