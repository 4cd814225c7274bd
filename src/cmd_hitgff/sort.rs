use clap::*;
use hitgff::libs::gff::{FeatureTreeBuilder, GffWriter};
use log::info;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("sort")
        .about("Sort the feature trees of a GFF3 file")
        .after_help(
            r###"
Rows are read back into feature trees through their ID, Parent and
Derives_from attributes. Trees are sorted by seqid (numeric suffixes as
numbers), start and type, at every level, and written again. Features
without an ID receive <prefix><n>.

Rows of one tree have to be adjacent; a tree interleaved with another one
is split.

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("GFF3 file to process, [stdin] for standard input"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .num_args(1)
                .default_value("feature")
                .help("Prefix of the assigned IDs"),
        )
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infile = args.get_one::<String>("infile").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();

    let mut features = vec![];
    for feature in FeatureTreeBuilder::open(infile)? {
        let mut feature = feature?;
        feature.sort_all();
        features.push(feature);
    }
    info!("Read {} feature trees", features.len());

    let mut writer = GffWriter::new(hitgff::writer(args.get_one::<String>("outfile").unwrap())?, prefix);
    writer.write_header()?;
    writer.write_features(&mut features)?;
    writer.flush()?;

    Ok(())
}
