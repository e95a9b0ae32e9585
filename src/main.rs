use clap::Parser;

use bib_fixer;

fn main() -> anyhow::Result<()> {
    let config = bib_fixer::Config::parse();

    bib_fixer::run(config)?;
    Ok(())
}
