use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use miro_outline::{
    Config, OutlineDocument, PagePolicy, UuidGenerator,
    commands::{apply_to_file, extract_to_json, read_outline_file, render_tree},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, name = "miro-outline", about = "Read and rewrite pdf outlines")]
struct Args {
    /// Config file to use instead of ~/.config/miro-outline/outline.conf
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the outline of a pdf as JSON
    Extract {
        #[arg(value_name = "PDF")]
        path: PathBuf,
        /// Write the JSON to a file instead of stdout
        #[arg(short, long, value_name = "JSON")]
        output: Option<PathBuf>,
    },
    /// Replace the outline of a pdf with the entries of a JSON file
    Apply {
        #[arg(value_name = "PDF")]
        path: PathBuf,
        #[arg(value_name = "OUTLINE")]
        outline: PathBuf,
        #[arg(short, long, value_name = "PDF")]
        output: PathBuf,
        /// FirstPage, LastPage or Reject
        #[arg(long, value_name = "POLICY")]
        out_of_range: Option<PagePolicy>,
    },
    /// Print the outline of a pdf as an indented tree
    Show {
        #[arg(value_name = "PDF")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Extract { path, output } => {
            let json = extract_to_json(&path, &config)?;
            match output {
                Some(out) => fs::write(&out, json)
                    .with_context(|| format!("Failed to write {}", out.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Apply {
            path,
            outline,
            output,
            out_of_range,
        } => {
            if let Some(policy) = out_of_range {
                config.out_of_range_pages = policy;
            }
            let items = read_outline_file(&outline)?;
            apply_to_file(&path, &items, &output, &config)?;
        }
        Command::Show { path } => {
            let items = OutlineDocument::open(&path)?.extract(&mut UuidGenerator);
            print!("{}", render_tree(&items));
        }
    }
    Ok(())
}
