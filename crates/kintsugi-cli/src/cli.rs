use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kintsugi",
    version,
    about = "Download comic series and repair their scrambled page images",
    after_help = "\
Configuration file lookup order:
  1. --config <path>             (command-line flag)
  2. $KINTSUGI_CONFIG            (environment variable)
  3. ./kintsugi.yaml             (project)
  4. Platform user config dir + /kintsugi/config.yaml (e.g. ~/.config or %APPDATA%)
  5. Platform system config path (Unix: /etc/kintsugi/config.yaml, Windows: %PROGRAMDATA%/kintsugi/config.yaml)

Every setting has a built-in default, so running without a config file works."
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides KINTSUGI_CONFIG and default search)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Download a series and repair every scrambled page
    Download {
        /// Series overview URL (prompted for interactively when omitted)
        url: Option<String>,

        /// Output root directory (overrides config output_dir)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,

        /// Parallel page workers per chapter (1-16, overrides config)
        #[arg(short = 'j', long, value_parser = clap::value_parser!(u16).range(1..=16))]
        jobs: Option<u16>,
    },

    /// Show series metadata and the chapter listing, downloading nothing
    Info {
        /// Series overview URL
        url: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Repair a single scrambled image with a key file
    Unscramble {
        /// Scrambled image file
        image: String,

        /// Key JSON file (fields width, height, xSlices, ySlices,
        /// sliceWidth, sliceHeight, slices)
        #[arg(short = 'k', long)]
        key: String,

        /// Output file (defaults to <stem>.unscrambled.png next to the input)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,
    },

    /// Write a starter configuration file
    Config {
        /// Write here instead of prompting for a location
        #[arg(short, long)]
        dest: Option<String>,
    },
}
