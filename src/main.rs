//! dbdshow - parse a DBD/DB file and print its tree.
//!
//! The file name is resolved against the include search path
//! (`EPICS_DB_INCLUDE_PATH` plus any `-I` directories), the same way a
//! database loader resolves include directives. The parsed tree is
//! printed in re-parseable form, which makes the tool a cheap syntax
//! checker as well.

use std::io;
use std::path::Path;

use clap::Parser;
use dbdast::{DbdContext, DbdError, Result};

/// Parse a DBD/DB file and dump its syntax tree
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to parse, resolved against the search path
    #[arg(value_name = "FILE")]
    file: String,

    /// Additional search directories, tried in order
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<String>,

    /// Do not seed the search path from EPICS_DB_INCLUDE_PATH
    #[arg(long)]
    no_default_path: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut ctxt = if args.no_default_path {
        DbdContext::bare()
    } else {
        DbdContext::new()
    };
    for dir in &args.include {
        ctxt.add_paths(dir);
    }

    // an explicit path takes precedence over the search list
    let path = if Path::new(&args.file).exists() {
        Path::new(&args.file).to_path_buf()
    } else {
        ctxt.find_file(&args.file).ok_or_else(|| DbdError::FileRead {
            path: args.file.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found in search path"),
        })?
    };

    let file = dbdast::parse_file(&path)?;
    print!("{}", file);
    Ok(())
}
