use crate::libs::alignment::{Format, HitReader};
use crate::libs::cluster::{cluster_hits, ClusterOpts};
use crate::libs::error::{Error, Result};
use crate::libs::evalue::EValue;
use crate::libs::gff::{Attributes, Feature, Region, Strand};
use crate::libs::hit::{Axis, Hit};
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;

/// How clusters are turned into GFF3 features.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOpts {
    /// Column 2
    pub source: String,
    /// Column 3
    pub feature_type: String,
    /// Hits with a larger e-value are dropped before clustering
    pub max_e_value: Option<EValue>,
}

impl Default for MatchOpts {
    fn default() -> Self {
        Self {
            source: "BLAST".to_string(),
            feature_type: "match".to_string(),
            max_e_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateOpts {
    pub format: Format,
    pub cluster: ClusterOpts,
    pub matches: MatchOpts,
    pub threads: usize,
}

impl Default for AnnotateOpts {
    fn default() -> Self {
        Self {
            format: Format::Tabular,
            cluster: ClusterOpts::default(),
            matches: MatchOpts::default(),
            threads: 1,
        }
    }
}

pub fn filter_hits(hits: Vec<Hit>, max_e_value: Option<EValue>) -> Vec<Hit> {
    match max_e_value {
        None => hits,
        Some(max) => hits.into_iter().filter(|h| h.e_value() <= max).collect(),
    }
}

/// Builds one `match` feature from a cluster.
///
/// The feature lies on the sequence of the clustering axis and is named after
/// the other sequence. Each hit becomes a region scored with its bit score,
/// carrying `Target` (the aligned stretch of the other sequence) and `EValue`.
///
/// ```
/// # use hitgff::libs::annotate::{cluster_to_feature, MatchOpts};
/// # use hitgff::libs::gff::Strand;
/// # use hitgff::libs::hit::{Axis, Hit};
/// let hit: Hit = "est1\tchr1\t99\t100\t1\t0\t1\t100\t600\t501\t1e-40\t180.5"
///     .parse()
///     .unwrap();
/// let feature = cluster_to_feature(&[hit], Axis::Subject, &MatchOpts::default()).unwrap();
/// assert_eq!(feature.seqid(), "chr1");
/// assert_eq!(feature.name(), Some("est1"));
/// assert_eq!(feature.strand(), Strand::Reverse);
///
/// let region = &feature.regions()[0];
/// assert_eq!((region.start(), region.end()), (501, 600));
/// assert_eq!(region.attributes().get_str("Target"), Some("est1 1 100"));
/// assert_eq!(region.attributes().get_str("EValue"), Some("1.00e-40"));
/// ```
pub fn cluster_to_feature(cluster: &[Hit], axis: Axis, opts: &MatchOpts) -> Result<Feature> {
    let first = cluster
        .first()
        .ok_or_else(|| Error::validation("Empty cluster"))?;
    let alt = axis.alt();

    let strand = if first.is_forward(axis) {
        Strand::Forward
    } else {
        Strand::Reverse
    };
    let mut feature = Feature::new(first.id(axis), &opts.source, &opts.feature_type, strand)?;
    feature.set_attribute("Name", first.id(alt))?;

    for hit in cluster {
        let mut attrs = Attributes::new();
        attrs.insert(
            "Target",
            format!("{} {} {}", hit.id(alt), hit.start(alt), hit.end(alt)),
        );
        attrs.insert("EValue", hit.e_value().to_string());

        let region = Region::new(hit.start(axis), hit.end(axis))
            .with_score(hit.bit_score())
            .with_attributes(attrs)?;
        feature.add_region(region);
    }

    Ok(feature)
}

fn annotate_group(query: &str, hits: Vec<Hit>, opts: &AnnotateOpts) -> Result<Vec<Feature>> {
    let total = hits.len();
    let hits = filter_hits(hits, opts.matches.max_e_value);
    let clusters = cluster_hits(hits, &opts.cluster);
    debug!("{}: {} hits, {} clusters", query, total, clusters.len());

    clusters
        .iter()
        .map(|c| cluster_to_feature(c, opts.cluster.axis, &opts.matches))
        .collect()
}

/// Turns query groups into sorted match features.
///
/// Groups are split into `opts.threads` contiguous slices processed in
/// parallel. The merged features are sorted with [`Feature::compare`], so the
/// result does not depend on the number of threads.
pub fn annotate_groups(groups: Vec<(String, Vec<Hit>)>, opts: &AnnotateOpts) -> Result<Vec<Feature>> {
    let threads = opts.threads.max(1);
    let size = groups.len().div_ceil(threads).max(1);
    let slices: Vec<Vec<(String, Vec<Hit>)>> = groups
        .into_iter()
        .chunks(size)
        .into_iter()
        .map(|chunk| chunk.collect())
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    let merged: Vec<Vec<Feature>> = pool.install(|| {
        slices
            .into_par_iter()
            .map(|slice| -> Result<Vec<Feature>> {
                let mut features = vec![];
                for (query, hits) in slice {
                    features.extend(annotate_group(&query, hits, opts)?);
                }
                Ok(features)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut features: Vec<Feature> = merged.into_iter().flatten().collect();
    features.sort_by(|a, b| a.compare(b));
    Ok(features)
}

/// Reads a hit file and returns its sorted match features.
pub fn annotate(input: &str, opts: &AnnotateOpts) -> Result<Vec<Feature>> {
    let groups = HitReader::open(input, opts.format)?
        .each_query()
        .collect::<Result<Vec<_>>>()?;
    info!("Read {} query groups from {}", groups.len(), input);

    let features = annotate_groups(groups, opts)?;
    info!("Built {} features", features.len());
    Ok(features)
}
