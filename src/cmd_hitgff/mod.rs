//! Subcommand implementations of hitgff

pub mod cluster;
pub mod rbb;
pub mod sort;
pub mod totab;

use clap::*;
use hitgff::libs::evalue::EValue;

// Arguments shared by the hit-reading subcommands
pub(crate) fn arg_format() -> Arg {
    Arg::new("format")
        .long("format")
        .num_args(1)
        .default_value("tab")
        .value_parser(["tab", "tabular", "xml", "tree"])
        .help("Layout of the hit file")
}

pub(crate) fn arg_evalue() -> Arg {
    Arg::new("evalue")
        .long("evalue")
        .num_args(1)
        .default_value("1e-5")
        .value_parser(parse_evalue)
        .help("Drop hits with a larger e-value")
}

fn parse_evalue(s: &str) -> std::result::Result<EValue, String> {
    s.parse::<EValue>().map_err(|e| e.to_string())
}

pub(crate) fn arg_outfile() -> Arg {
    Arg::new("outfile")
        .long("outfile")
        .short('o')
        .num_args(1)
        .default_value("stdout")
        .help("Output filename. [stdout] for screen")
}
