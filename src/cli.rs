use crate::constants::DEFAULT_BUDGET_BYTES;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-budget",
    about = "Compress a directory of images so each one fits under a byte budget",
    long_about = "img-budget re-encodes every image in a directory so it fits under a fixed size \
                  budget (990 KB by default). Files already under the budget are copied unchanged. \
                  JPEGs are searched for the highest quality that fits; PNG and GIF keep their \
                  format when a re-encode fits and are converted to JPEG otherwise. As a last \
                  resort images are halved in size. HEIC/HEIF is not supported.",
    version,
    after_help = "EXAMPLES:\n  \
    img-budget\n  \
    img-budget batch ./photos -o ./photos/compressed -r\n  \
    img-budget compress big.png -b 500000\n  \
    img-budget info photo.jpg"
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Print every encode attempt",
        conflicts_with = "quiet"
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(
        about = "Compress every image in a directory (default command)",
        long_about = "Process all images in a directory, one at a time. Without an input the \
                      directory containing this executable is used, and results go to a \
                      'compressed' folder inside it."
    )]
    Batch {
        #[arg(
            help = "Input directory, file or glob (default: executable's directory)",
            long_help = "Input can be a directory path, a single file, or a glob expression. \
                         Examples: './images', 'photo.jpg', './images/*.png'"
        )]
        input: Option<String>,

        #[arg(short, long, help = "Output directory (default: <input>/compressed)")]
        output: Option<PathBuf>,

        #[arg(
            short,
            long,
            default_value_t = DEFAULT_BUDGET_BYTES,
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Maximum output size in bytes"
        )]
        budget: u64,

        #[arg(short, long, help = "Process subdirectories recursively")]
        recursive: bool,

        #[arg(
            long,
            help = "Use Zopfli for PNG output (smaller, much slower)"
        )]
        zopfli: bool,

        #[arg(long, help = "Wait for Enter before exiting")]
        pause: bool,
    },

    #[command(about = "Compress a single image file")]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(short, long, help = "Output directory (default: <input dir>/compressed)")]
        output: Option<PathBuf>,

        #[arg(
            short,
            long,
            default_value_t = DEFAULT_BUDGET_BYTES,
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Maximum output size in bytes"
        )]
        budget: u64,

        #[arg(long, help = "Use Zopfli for PNG output (smaller, much slower)")]
        zopfli: bool,
    },

    #[command(
        about = "Display image information and how it would be compressed",
        long_about = "Show dimensions, detected format, file size, and the strategy that would \
                      be used to fit the image under the budget."
    )]
    Info {
        #[arg(help = "Image file path to analyze")]
        input: PathBuf,

        #[arg(
            short,
            long,
            default_value_t = DEFAULT_BUDGET_BYTES,
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Maximum output size in bytes"
        )]
        budget: u64,
    },
}

/// A bare run, e.g. double-clicking the executable: batch over its own
/// directory and keep the window open until Enter is pressed.
impl Default for Commands {
    fn default() -> Self {
        Commands::Batch {
            input: None,
            output: None,
            budget: DEFAULT_BUDGET_BYTES,
            recursive: false,
            zopfli: false,
            pause: true,
        }
    }
}
