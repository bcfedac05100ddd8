use clap::{Parser, Subcommand};
use hexbook::pipeline::{self, BuildOptions};
use hexbook::props::{self, Properties};
use hexbook::{output, plugin::PluginManager};
use std::path::PathBuf;
use std::process::ExitCode;

/// Shared flags for commands that build books.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Only build these languages (repeatable). Defaults to every language found
    #[arg(long = "lang")]
    langs: Vec<String>,

    /// Substitute translation keys for missing translations instead of failing
    #[arg(long)]
    allow_missing: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("HEXBOOK_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("HEXBOOK_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "hexbook")]
#[command(about = "Documentation generator for Patchouli guide books")]
#[command(long_about = "\
Documentation generator for Patchouli guide books

The book is read from the resource roots listed in hexbook.toml, validated
in every language the mod ships, and exported as a static site.

Resource root layout:

  <root>/
  ├── addon.hexdoc.json                       # Metadata published by another mod
  ├── assets/<ns>/lang/en_us.json             # Translations, merged across roots
  ├── assets/<ns>/textures/item/wand.png      # Textures, published in metadata
  └── data/<ns>/patchouli_books/<book>/
      ├── book.json
      └── en_us/
          ├── categories/basics.json
          └── entries/basics/media.json

Output:

  <export_dir>/
  ├── <modid>.hexdoc.json                     # This mod's metadata, for addons
  └── <lang>/{index.html, book.json}

Run 'hexbook gen-config' to generate a documented hexbook.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Properties file
    #[arg(long, default_value = "hexbook.toml", global = true)]
    props: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate, link and export the book in every language
    Build {
        #[command(flatten)]
        args: BuildArgs,

        /// Disable the export cache and rewrite every file
        #[arg(long)]
        no_cache: bool,
    },
    /// Validate and link the book without writing anything
    Check(BuildArgs),
    /// List the metadata loaded for every mod
    Metadata,
    /// Print a stock hexbook.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Build { args, no_cache } => {
            let props = Properties::load(&cli.props)?;
            let options = BuildOptions {
                allow_missing: args.allow_missing,
                langs: args.langs,
                use_cache: !no_cache,
                export: true,
            };
            let export_dir = props.export_dir.clone().unwrap_or_default();
            let common = pipeline::load_common(props, &options)?;
            println!("==> Building {}", common.props.modid);
            let (reports, stats) = pipeline::run(&common, &options)?;
            output::print_reports(&reports);
            if let Some(stats) = stats {
                println!("{}", output::format_cache_stats(&stats));
            }
            if !reports.iter().all(|r| r.is_success()) {
                return Ok(ExitCode::FAILURE);
            }
            println!("==> Build complete: {}", export_dir.display());
        }
        Command::Check(args) => {
            let props = Properties::load(&cli.props)?;
            let options = BuildOptions {
                allow_missing: args.allow_missing,
                langs: args.langs,
                ..BuildOptions::default()
            };
            let common = pipeline::load_common(props, &options)?;
            println!("==> Checking {}", common.props.modid);
            let reports = pipeline::build_all(&common, &options)?;
            output::print_reports(&reports);
            if !reports.iter().all(|r| r.is_success()) {
                return Ok(ExitCode::FAILURE);
            }
            println!("==> Every book is valid");
        }
        Command::Metadata => {
            let props = Properties::load(&cli.props)?;
            let plugins = PluginManager::for_props(&props)?;
            let common = pipeline::Common::new(props, plugins, &BuildOptions::default())?;
            let index = pipeline::load_all_metadata(&common.loader)?;
            output::print_metadata(&index);
        }
        Command::GenConfig => {
            print!("{}", props::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// `-v` flags pick the default level; `RUST_LOG` overrides it.
fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
