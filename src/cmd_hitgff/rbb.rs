use clap::*;
use hitgff::libs::alignment::Format;
use hitgff::libs::evalue::EValue;
use hitgff::libs::rbb::{orthologs, read_best_hits, write_orthologs};
use log::info;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("rbb")
        .about("Reciprocal best hits of two proteomes")
        .after_help(
            r###"
<file1> holds the hits of proteome A against B, <file2> those of B against A.
For every query of <file1> the best-scoring subjects are kept (ties
included); a pair is reciprocal when the query is also among the best hits
of the subject in <file2>.

Output columns:
    query  subject  [reciprocal]  [e-value  bit-score]

* --all adds the reciprocal column and keeps non-reciprocal best hits
* --detailed adds e-value and bit score

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(2)
                .index(1)
                .help("The two hit files"),
        )
        .arg(super::arg_format())
        .arg(super::arg_evalue())
        .arg(
            Arg::new("detailed")
                .long("detailed")
                .action(ArgAction::SetTrue)
                .help("Append e-value and bit score"),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Report every best hit with a reciprocal flag"),
        )
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infiles: Vec<&String> = args.get_many::<String>("infiles").unwrap().collect();
    let format: Format = args.get_one::<String>("format").unwrap().parse()?;
    let max_e_value = args.get_one::<EValue>("evalue").copied();
    let is_detailed = args.get_flag("detailed");
    let reciprocal_only = !args.get_flag("all");

    let forward = read_best_hits(infiles[0], format, max_e_value)?;
    let backward = read_best_hits(infiles[1], format, max_e_value)?;
    info!(
        "{} queries in {}, {} in {}",
        forward.len(),
        infiles[0],
        backward.len(),
        infiles[1]
    );

    let pairs = orthologs(&forward, &backward, reciprocal_only);
    info!("{} pairs written", pairs.len());

    let mut writer = hitgff::writer(args.get_one::<String>("outfile").unwrap())?;
    write_orthologs(&mut writer, &pairs, is_detailed, reciprocal_only)?;
    writer.flush()?;

    Ok(())
}
