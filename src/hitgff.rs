extern crate clap;
use clap::*;

mod cmd_hitgff;

fn main() -> anyhow::Result<()> {
    let mut logger = pretty_env_logger::formatted_builder();
    logger
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let app = Command::new("hitgff")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`hitgff` - Cluster alignment hits into GFF3 match features")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_hitgff::cluster::make_subcommand())
        .subcommand(cmd_hitgff::sort::make_subcommand())
        .subcommand(cmd_hitgff::rbb::make_subcommand())
        .subcommand(cmd_hitgff::totab::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Hits to features:
    * cluster - Group hits into matches, write GFF3
    * totab   - Normalise tabular/XML hits to 12-column rows

* Features:
    * sort    - Re-read GFF3 trees, sort and write them back

* Orthology:
    * rbb     - Reciprocal best hits between two hit files

Logging goes to stderr; set RUST_LOG=info or debug for progress.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("cluster", sub_matches)) => cmd_hitgff::cluster::execute(sub_matches),
        Some(("sort", sub_matches)) => cmd_hitgff::sort::execute(sub_matches),
        Some(("rbb", sub_matches)) => cmd_hitgff::rbb::execute(sub_matches),
        Some(("totab", sub_matches)) => cmd_hitgff::totab::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
