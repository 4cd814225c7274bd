use crate::libs::alignment::{Format, HitReader};
use crate::libs::error::Result;
use crate::libs::evalue::EValue;
use crate::libs::hit::Hit;
use indexmap::IndexMap;
use std::io;

/// Best hit of a query against the other proteome.
#[derive(Debug, Clone, PartialEq)]
pub struct Ortholog {
    pub query: String,
    pub subject: String,
    /// The subject's best hit points back at the query
    pub reciprocal: bool,
    pub e_value: EValue,
    pub bit_score: f64,
}

/// Highest-scoring hits of each query. Hits tied on bit score are all kept.
///
/// ```
/// # use hitgff::libs::hit::Hit;
/// # use hitgff::libs::rbb::best_hits;
/// let hits: Vec<Hit> = [
///     "a1\tb1\t90\t100\t10\t0\t1\t100\t1\t100\t1e-30\t150",
///     "a1\tb2\t95\t100\t5\t0\t1\t100\t1\t100\t1e-35\t170",
///     "a1\tb3\t95\t100\t5\t0\t1\t100\t1\t100\t1e-35\t170",
/// ]
/// .iter()
/// .map(|row| row.parse().unwrap())
/// .collect();
/// let best = best_hits(hits);
/// let subjects: Vec<&str> = best["a1"].iter().map(|h| h.subject()).collect();
/// assert_eq!(subjects, vec!["b2", "b3"]);
/// ```
pub fn best_hits(hits: impl IntoIterator<Item = Hit>) -> IndexMap<String, Vec<Hit>> {
    let mut best: IndexMap<String, Vec<Hit>> = IndexMap::new();
    for hit in hits {
        let entry = best.entry(hit.query().to_string()).or_default();
        match entry.first().map(|h| h.bit_score()) {
            Some(score) if score > hit.bit_score() => {}
            Some(score) if score == hit.bit_score() => entry.push(hit),
            _ => *entry = vec![hit],
        }
    }
    best
}

/// Reads a hit file, drops hits above `max_e_value` and keeps the best hits.
pub fn read_best_hits(
    input: &str,
    format: Format,
    max_e_value: Option<EValue>,
) -> Result<IndexMap<String, Vec<Hit>>> {
    let mut hits = vec![];
    for hit in HitReader::open(input, format)? {
        let hit = hit?;
        if max_e_value.map_or(true, |max| hit.e_value() <= max) {
            hits.push(hit);
        }
    }
    Ok(best_hits(hits))
}

/// Pairs each query of `forward` with its best subjects and flags the pairs
/// whose subject's best hits in `backward` include the query.
///
/// A subject reported by several tied hits appears once, with the best of
/// them. With `reciprocal_only`, non-reciprocal pairs are dropped. The result
/// is sorted by query, then subject.
pub fn orthologs(
    forward: &IndexMap<String, Vec<Hit>>,
    backward: &IndexMap<String, Vec<Hit>>,
    reciprocal_only: bool,
) -> Vec<Ortholog> {
    let mut result = vec![];

    for (query, hits) in forward {
        let mut unique: IndexMap<&str, &Hit> = IndexMap::new();
        for hit in hits {
            let kept = unique.entry(hit.subject()).or_insert(hit);
            if kept.bit_score() < hit.bit_score() {
                *kept = hit;
            }
        }

        for (subject, hit) in unique {
            let reciprocal = backward
                .get(subject)
                .is_some_and(|back| back.iter().any(|b| b.subject() == query.as_str()));
            if reciprocal_only && !reciprocal {
                continue;
            }

            result.push(Ortholog {
                query: query.clone(),
                subject: subject.to_string(),
                reciprocal,
                e_value: hit.e_value(),
                bit_score: hit.bit_score(),
            });
        }
    }

    result.sort_by(|a, b| (&a.query, &a.subject).cmp(&(&b.query, &b.subject)));
    result
}

/// Tab-separated rows: query, subject, then the reciprocal flag unless only
/// reciprocal pairs are listed, then e-value and bit score when `detailed`.
pub fn write_orthologs<W: io::Write>(
    w: &mut W,
    orthologs: &[Ortholog],
    detailed: bool,
    reciprocal_only: bool,
) -> io::Result<()> {
    for o in orthologs {
        write!(w, "{}\t{}", o.query, o.subject)?;
        if !reciprocal_only {
            write!(w, "\t{}", o.reciprocal)?;
        }
        if detailed {
            write!(w, "\t{}\t{}", o.e_value, o.bit_score)?;
        }
        writeln!(w)?;
    }
    Ok(())
}
