use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use omnigraph_rs::config::AppConfig;
use omnigraph_rs::types::Mate;
use omnigraph_rs::{run_first_stage, run_second_stage};

#[derive(Parser)]
#[command(name = "omnigraph-rs", version, about = "Classify reads against a colored de Bruijn graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify paired reads against the global color index
    FirstQuery {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
    /// Route stored reads into per-collective-component FASTA files
    SecondQuery {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template(&format!("{{spinner:.{}}} {{msg}}", color))
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg);
    spinner
}

fn load_config(path: &PathBuf) -> AppConfig {
    match AppConfig::load(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Can't load '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::FirstQuery { config } => {
            let cfg = load_config(&config);
            let spinner = spinner("green", "Classifying read pairs...");
            match run_first_stage(&cfg) {
                Ok(summary) => {
                    spinner.finish_with_message(format!(
                        "Classified {} pairs in {} chunks ({} skipped).",
                        summary.pairs, summary.chunks, summary.skipped_pairs
                    ));
                    eprint!("{}", summary.counters.report());
                    for mate in Mate::BOTH {
                        log::info!(
                            "{}: {} of {} reads mapped",
                            mate,
                            summary.counters.mapped(mate),
                            summary.counters.total(mate)
                        );
                    }
                }
                Err(e) => {
                    spinner.abandon_with_message("Classification failed.");
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            }
        }
        Command::SecondQuery { config } => {
            let cfg = load_config(&config);
            let spinner = spinner("yellow", "Routing reads into component files...");
            match run_second_stage(&cfg) {
                Ok(summary) => {
                    spinner.finish_with_message(format!(
                        "Wrote {} FASTA files for {} collective components under {}.",
                        summary.files_created,
                        summary.shards.len(),
                        summary.out_dir.display()
                    ));
                    eprint!("{}", summary.counters.report());
                }
                Err(e) => {
                    spinner.abandon_with_message("Routing failed.");
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
