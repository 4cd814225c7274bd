use clap::*;
use hitgff::libs::alignment::{Format, HitReader};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("totab")
        .about("Convert hits to 12-column tabular rows")
        .after_help(
            r###"
Reads tabular or XML hits and writes them as `-outfmt 6` rows:

    query  subject  %identity  length  mismatches  gap-openings
    q.start  q.end  s.start  s.end  e-value  bit-score

For XML input, identity, mismatches and gap openings are derived from the
HSP counts and alignment strings.

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Hit file to process, [stdin] for standard input"),
        )
        .arg(super::arg_format())
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infile = args.get_one::<String>("infile").unwrap();
    let format: Format = args.get_one::<String>("format").unwrap().parse()?;

    let mut writer = hitgff::writer(args.get_one::<String>("outfile").unwrap())?;
    for hit in HitReader::open(infile, format)? {
        hit?.write_tabular(&mut writer)?;
    }
    writer.flush()?;

    Ok(())
}
