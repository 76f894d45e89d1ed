//! Renders the `gazette(1)` man page from the shared CLI definitions.
//!
//! The page lands in `OUT_DIR` so packaging scripts can pick it up next to
//! the binary.

use std::{env, fs, io, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;
use cli_defs::Cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=cli-defs/src");

    // No OUT_DIR under IDE analysis; nothing to render.
    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return Ok(());
    };

    let man = Man::new(Cli::command()).title("GAZETTE").section("1");
    let mut page = fs::File::create(out_dir.join("gazette.1"))?;
    man.render(&mut page)?;

    for sub in Cli::command().get_subcommands() {
        let name = format!("gazette-{}", sub.get_name());
        let man = Man::new(sub.clone()).title(name.to_uppercase()).section("1");
        let mut page = fs::File::create(out_dir.join(format!("{name}.1")))?;
        man.render(&mut page)?;
    }
    Ok(())
}
