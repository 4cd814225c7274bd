use clap::*;
use hitgff::libs::alignment::Format;
use hitgff::libs::annotate::{annotate, AnnotateOpts, MatchOpts};
use hitgff::libs::cluster::ClusterOpts;
use hitgff::libs::evalue::EValue;
use hitgff::libs::gff::GffWriter;
use hitgff::libs::hit::Axis;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("cluster")
        .about("Cluster hits into match features and write GFF3")
        .after_help(
            r###"
Hits of each query/subject pair are split by strand and walked along the
chosen sequence. A hit joins the previous one when the gap is below the
cutoff, or when it continues the previous hit on the other sequence within
--error positions. Each cluster becomes one feature with one row per hit.

* --on subject: features lie on the subjects (transcripts against a genome)
* --on query:   features lie on the queries (proteins against a genome, blastx)

* --cutoff defaults to 10 times the average hit length of each strand

Examples:
1. ESTs against a genome, tabular hits
   hitgff cluster tests/blast/exons.tsv -o exons.gff3

2. blastx XML, features on the query contigs
   hitgff cluster hits.xml --format xml --on query --prefix prot

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
        .arg(
            Arg::new("on")
                .long("on")
                .num_args(1)
                .default_value("subject")
                .value_parser(["subject", "query"])
                .help("Sequence whose coordinates drive the clustering"),
        )
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Largest gap that always joins two hits"),
        )
        .arg(
            Arg::new("error")
                .long("error")
                .num_args(1)
                .default_value("3")
                .value_parser(value_parser!(u64))
                .help("Slack when hits continue each other on the other sequence"),
        )
        .arg(super::arg_evalue())
        .arg(
            Arg::new("source")
                .long("source")
                .num_args(1)
                .default_value("BLAST")
                .help("Column 2 of the output"),
        )
        .arg(
            Arg::new("type")
                .long("type")
                .num_args(1)
                .default_value("match")
                .help("Column 3 of the output"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .num_args(1)
                .default_value("match")
                .help("Prefix of the assigned IDs"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads"),
        )
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let format: Format = args.get_one::<String>("format").unwrap().parse()?;
    let axis: Axis = args.get_one::<String>("on").unwrap().parse()?;

    let opts = AnnotateOpts {
        format,
        cluster: ClusterOpts {
            axis,
            cutoff: args.get_one::<f64>("cutoff").copied(),
            error: *args.get_one::<u64>("error").unwrap(),
        },
        matches: MatchOpts {
            source: args.get_one::<String>("source").unwrap().to_string(),
            feature_type: args.get_one::<String>("type").unwrap().to_string(),
            max_e_value: args.get_one::<EValue>("evalue").copied(),
        },
        threads: *args.get_one::<usize>("parallel").unwrap(),
    };
    let prefix = args.get_one::<String>("prefix").unwrap();

    //----------------------------
    // Ops
    //----------------------------
    let mut features = annotate(infile, &opts)?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = GffWriter::new(hitgff::writer(args.get_one::<String>("outfile").unwrap())?, prefix);
    writer.write_header()?;
    writer.write_features(&mut features)?;
    writer.flush()?;

    Ok(())
}
