use crate::libs::hit::{Axis, Hit};
use indexmap::IndexMap;

/// Tunables of the hit clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOpts {
    /// Sequence whose coordinates drive the clustering
    pub axis: Axis,
    /// Largest gap along `axis` that always joins two hits. `None` derives it
    /// from the hit lengths, see [`default_cutoff`].
    pub cutoff: Option<f64>,
    /// Slack allowed on the other axis when judging two distant hits contiguous
    pub error: u64,
}

impl Default for ClusterOpts {
    fn default() -> Self {
        Self {
            axis: Axis::Subject,
            cutoff: None,
            error: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Increasing,
    Decreasing,
}

/// Ten times the average length of the hits along `axis`.
///
/// ```
/// # use hitgff::libs::cluster::default_cutoff;
/// # use hitgff::libs::hit::{Axis, Hit};
/// let hits: Vec<Hit> = vec![
///     "q\ts\t100\t100\t0\t0\t1\t100\t1\t100\t1e-20\t100".parse().unwrap(),
///     "q\ts\t100\t300\t0\t0\t1\t300\t201\t500\t1e-20\t300".parse().unwrap(),
/// ];
/// assert_eq!(default_cutoff(&hits, Axis::Subject), 2000.0);
/// assert_eq!(default_cutoff(&[], Axis::Subject), 0.0);
/// ```
pub fn default_cutoff(hits: &[Hit], axis: Axis) -> f64 {
    if hits.is_empty() {
        return 0.0;
    }
    let total: u64 = hits.iter().map(|h| h.length(axis)).sum();
    10.0 * total as f64 / hits.len() as f64
}

/// Groups the hits of one query/subject pair into matches.
///
/// Hits are split by orientation on `opts.axis`; each orientation is walked in
/// increasing start. A hit joins the open cluster when its start lies within
/// the cutoff of the previous hit's end, or when it continues the previous hit
/// exactly (within `opts.error`) on the other sequence. Forward clusters come
/// first.
pub fn cluster(hits: Vec<Hit>, opts: &ClusterOpts) -> Vec<Vec<Hit>> {
    let axis = opts.axis;
    let (forward, reverse): (Vec<Hit>, Vec<Hit>) =
        hits.into_iter().partition(|h| h.is_forward(axis));

    let mut clusters = vec![];
    for mut bucket in [forward, reverse] {
        if bucket.is_empty() {
            continue;
        }
        bucket.sort_by_key(|h| h.start(axis));
        let cutoff = opts
            .cutoff
            .unwrap_or_else(|| default_cutoff(&bucket, axis));
        clusters.extend(cluster_bucket(bucket, cutoff, opts));
    }

    clusters
}

/// Clusters hits of any number of query/subject pairs.
///
/// Pairs are processed in order of first appearance.
pub fn cluster_hits(hits: Vec<Hit>, opts: &ClusterOpts) -> Vec<Vec<Hit>> {
    let mut pairs: IndexMap<(String, String), Vec<Hit>> = IndexMap::new();
    for hit in hits {
        pairs
            .entry((hit.query().to_string(), hit.subject().to_string()))
            .or_default()
            .push(hit);
    }

    pairs
        .into_values()
        .flat_map(|group| cluster(group, opts))
        .collect()
}

fn cluster_bucket(bucket: Vec<Hit>, cutoff: f64, opts: &ClusterOpts) -> Vec<Vec<Hit>> {
    let axis = opts.axis;
    let mut clusters = vec![];
    let mut open: Vec<Hit> = vec![];

    for hit in bucket {
        let joins = match open.last() {
            None => true,
            Some(last) => {
                let gap = hit.start(axis) as f64 - last.end(axis) as f64;
                gap < cutoff || is_contiguous(&open, &hit, opts)
            }
        };

        if !joins {
            clusters.push(std::mem::take(&mut open));
        }
        open.push(hit);
    }

    if !open.is_empty() {
        clusters.push(open);
    }
    clusters
}

fn trend_between(prev: &Hit, next: &Hit, alt: Axis) -> Option<Trend> {
    match next.low(alt).cmp(&prev.low(alt)) {
        std::cmp::Ordering::Greater => Some(Trend::Increasing),
        std::cmp::Ordering::Less => Some(Trend::Decreasing),
        std::cmp::Ordering::Equal => None,
    }
}

// `open` is never empty here
fn is_contiguous(open: &[Hit], hit: &Hit, opts: &ClusterOpts) -> bool {
    let alt = opts.axis.alt();
    let last = &open[open.len() - 1];

    let direction = match trend_between(last, hit, alt) {
        Some(d) => d,
        None => return false,
    };
    if open.len() >= 2 {
        let trend = trend_between(&open[open.len() - 2], last, alt);
        if trend != Some(direction) {
            return false;
        }
    }

    let (expected, actual) = match direction {
        Trend::Increasing => (last.high(alt) as i64 + 1, hit.low(alt) as i64),
        Trend::Decreasing => (last.low(alt) as i64 - 1, hit.high(alt) as i64),
    };

    (actual - expected).unsigned_abs() <= opts.error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(qs: u64, qe: u64, ss: u64, se: u64) -> Hit {
        format!("q1\ts1\t100\t100\t0\t0\t{}\t{}\t{}\t{}\t1e-20\t100", qs, qe, ss, se)
            .parse()
            .unwrap()
    }

    fn opts(cutoff: f64) -> ClusterOpts {
        ClusterOpts {
            cutoff: Some(cutoff),
            ..Default::default()
        }
    }

    fn sizes(clusters: &[Vec<Hit>]) -> Vec<usize> {
        clusters.iter().map(|c| c.len()).collect()
    }

    #[test]
    fn test_close_hits_join() {
        let hits = vec![hit(1, 100, 1, 100), hit(101, 200, 151, 250)];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![2]);
    }

    #[test]
    fn test_distant_but_sequential_hits_join() {
        let hits = vec![hit(1, 100, 1, 100), hit(101, 200, 50_101, 50_200)];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![2]);

        // within the error tolerance
        let hits = vec![hit(1, 100, 1, 100), hit(104, 200, 50_101, 50_200)];
        assert_eq!(sizes(&cluster(hits, &opts(10_000.0))), vec![2]);
    }

    #[test]
    fn test_distant_and_not_sequential_hits_split() {
        let hits = vec![hit(1, 100, 1, 100), hit(201, 300, 50_101, 50_200)];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![1, 1]);
        assert_eq!(clusters[1][0].query_start(), 201);
    }

    #[test]
    fn test_decreasing_alternate_axis() {
        // query runs backwards while the subject runs forwards
        let hits = vec![
            hit(300, 201, 1, 100),
            hit(200, 101, 50_101, 50_200),
            hit(100, 1, 90_101, 90_200),
        ];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![3]);
    }

    #[test]
    fn test_trend_must_hold() {
        // third hit steps back on the query after an increasing pair
        let hits = vec![
            hit(101, 200, 1, 100),
            hit(201, 300, 50_101, 50_200),
            hit(1, 100, 90_101, 90_200),
        ];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![2, 1]);
    }

    #[test]
    fn test_reverse_bucket() {
        let hits = vec![hit(1, 100, 500, 401), hit(101, 200, 380, 281)];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![2]);
        // walked in increasing subject position
        assert_eq!(clusters[0][0].subject_start(), 380);
    }

    #[test]
    fn test_reverse_gap_from_start_to_end() {
        // 500 - 281 is beyond the cutoff although the spans are 21 apart
        let hits = vec![hit(1, 100, 500, 401), hit(301, 400, 380, 281)];
        let clusters = cluster(hits, &opts(100.0));
        assert_eq!(sizes(&clusters), vec![1, 1]);
        assert_eq!(clusters[0][0].subject_start(), 380);

        let hits = vec![hit(1, 50, 300, 251), hit(51, 100, 250, 201)];
        assert_eq!(sizes(&cluster(hits, &opts(100.0))), vec![2]);
    }

    #[test]
    fn test_mixed_orientation() {
        let hits = vec![
            hit(1, 100, 1, 100),
            hit(1, 100, 900, 801),
            hit(101, 200, 101, 200),
        ];
        let clusters = cluster(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![2, 1]);
        assert!(clusters[0].iter().all(|h| h.is_forward(Axis::Subject)));
        assert!(!clusters[1][0].is_forward(Axis::Subject));
    }

    #[test]
    fn test_edge_cases() {
        assert!(cluster(vec![], &ClusterOpts::default()).is_empty());

        let clusters = cluster(vec![hit(1, 100, 1, 100)], &ClusterOpts::default());
        assert_eq!(sizes(&clusters), vec![1]);
    }

    #[test]
    fn test_default_cutoff_applies_per_bucket() {
        // lengths 100, cutoff 1000: the second hit is 1500 away
        let hits = vec![hit(1, 100, 1, 100), hit(501, 600, 1_601, 1_700)];
        assert_eq!(sizes(&cluster(hits, &ClusterOpts::default())), vec![1, 1]);

        let hits = vec![hit(1, 100, 1, 100), hit(501, 600, 601, 700)];
        assert_eq!(sizes(&cluster(hits, &ClusterOpts::default())), vec![2]);
    }

    #[test]
    fn test_partition() {
        let mut hits = vec![];
        for i in 0..40u64 {
            let s = i * 3_000 + (i % 7) * 40 + 1;
            let q = (i % 5) * 150 + 1;
            if i % 3 == 0 {
                hits.push(hit(q, q + 99, s + 99, s));
            } else {
                hits.push(hit(q, q + 99, s, s + 99));
            }
        }

        let clusters = cluster(hits.clone(), &opts(2_500.0));
        assert!(clusters.iter().all(|c| !c.is_empty()));

        let mut flat: Vec<Hit> = clusters.into_iter().flatten().collect();
        assert_eq!(flat.len(), hits.len());

        let key = |h: &Hit| (h.subject_start(), h.subject_end(), h.query_start());
        flat.sort_by_key(key);
        hits.sort_by_key(key);
        assert_eq!(flat, hits);
    }

    #[test]
    fn test_cluster_hits_by_pair() {
        let mut other = hit(1, 100, 1, 100);
        other.subject = "s2".to_string();
        let hits = vec![hit(1, 100, 1, 100), other, hit(101, 200, 101, 200)];

        let clusters = cluster_hits(hits, &opts(10_000.0));
        assert_eq!(sizes(&clusters), vec![2, 1]);
        assert_eq!(clusters[1][0].subject(), "s2");
    }
}
