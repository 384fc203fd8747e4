//! cathode-dump: feed a captured terminal byte stream through the engine
//! and print the resulting screen.
//!
//! Useful for inspecting what a program's output would leave on screen:
//!
//! ```text
//! script -q -c 'ls --color' capture && cathode-dump capture
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cathode_common::Rect;
use cathode_core::Terminal;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "cathode-dump",
    about = "Interpret a raw terminal byte stream and print the final screen"
)]
struct Args {
    /// Input file of raw terminal output; reads stdin when omitted
    input: Option<PathBuf>,

    #[arg(long, default_value_t = 24)]
    rows: i32,

    #[arg(long, default_value_t = 80)]
    cols: i32,

    /// Decode bytes >= 0x80 through the GR charset instead of as UTF-8
    #[arg(long)]
    no_utf8: bool,

    /// Also print the responses the engine emitted (DA, DSR, ...)
    #[arg(long)]
    responses: bool,
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            0x1b => out.push_str("\\e"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let bytes = match &args.input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let mut term = Terminal::new(args.rows, args.cols);
    term.set_utf8(!args.no_utf8);
    term.install_screen().set_reflow(true);

    term.write(&bytes);

    if let Some(screen) = term.screen() {
        for row in 0..args.rows {
            println!("{}", screen.get_text(Rect::new(row, row + 1, 0, args.cols)));
        }
    }

    let pos = term.cursor_pos();
    eprintln!("cursor: row {} col {}", pos.row + 1, pos.col + 1);

    if args.responses {
        let responses = term.take_output();
        if !responses.is_empty() {
            eprintln!("responses: {}", escape_bytes(&responses));
        }
    }

    Ok(())
}
