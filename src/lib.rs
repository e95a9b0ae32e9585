use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use read_input::prelude::*;

pub mod entry;
pub mod parsing;
pub mod unify;

#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Config {
    /// Input .bib file
    #[clap(short, long, default_value = "main.bib", value_name = "input file")]
    pub input: PathBuf,

    /// Prefix for the two output files
    #[clap(short, long, default_value = "filtered", value_name = "output prefix")]
    pub output: String,

    /// Input .bib file, shorthand for --input
    #[clap(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl Config {
    pub fn input_path(&self) -> &Path {
        self.file.as_deref().unwrap_or(self.input.as_path())
    }
}

pub fn run(config: Config) -> Result<()> {
    let path = config.input_path();
    if !path.is_file() {
        bail!("input file {} does not exist", path.display());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;

    let text = parsing::collapse_whitespace(&raw);
    let raw_entries = parsing::scan_entries(&text, confirm_invalid_entry);
    let table = unify::build_table(raw_entries);
    bunt::println!("{$bold}Done reading {}{/$}", path.display());

    unify::write_output(table, &config.output)
}

// Shows the operator the snippet around a suspicious '@' and asks whether it
// really is an invalid entry. Just pressing enter counts as a yes.
fn confirm_invalid_entry(context: &str) -> bool {
    println!("{}", context);
    let choice: String = input()
        .msg("Is this an invalid entry? [Y/n] ")
        .default(String::from("y"))
        .get();
    !choice.to_lowercase().starts_with('n')
}
