use crate::libs::blast_xml::XmlHits;
use crate::libs::cluster::{cluster_hits, ClusterOpts};
use crate::libs::error::{Error, Result};
use crate::libs::hit::Hit;
use std::collections::VecDeque;
use std::io::BufRead;

/// Layout of a hit file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// 12-column tab-separated rows (`-outfmt 6/7`)
    #[default]
    Tabular,
    /// Nested Iteration/Hit/Hsp XML (`-outfmt 5`)
    Xml,
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tab" | "tabular" => Ok(Format::Tabular),
            "xml" | "tree" => Ok(Format::Xml),
            _ => Err(Error::validation(format!("Unknown hit format: {}", s))),
        }
    }
}

enum Source<R: BufRead> {
    Tabular { reader: R, line: String, line_no: usize },
    Xml(XmlHits<R>),
}

/// Forward-only stream of [`Hit`]s read from a tabular or XML source.
///
/// The first error ends the stream; nothing after a bad record is returned.
pub struct HitReader<R: BufRead> {
    source: Source<R>,
    failed: bool,
}

impl HitReader<Box<dyn BufRead>> {
    /// ```
    /// # use hitgff::libs::alignment::{Format, HitReader};
    /// let hits = HitReader::open("tests/blast/exons.tsv", Format::Tabular).unwrap();
    /// assert_eq!(hits.count(), 6);
    ///
    /// let missing = HitReader::open("tests/blast/not_there.tsv", Format::Tabular);
    /// assert!(matches!(missing, Err(hitgff::libs::error::Error::NotFound { .. })));
    /// ```
    pub fn open(input: &str, format: Format) -> Result<Self> {
        let reader = crate::libs::io::reader(input)?;
        Ok(Self::new(reader, format))
    }
}

impl<R: BufRead> HitReader<R> {
    pub fn new(reader: R, format: Format) -> Self {
        let source = match format {
            Format::Tabular => Source::Tabular {
                reader,
                line: String::new(),
                line_no: 0,
            },
            Format::Xml => Source::Xml(XmlHits::new(reader)),
        };

        Self {
            source,
            failed: false,
        }
    }

    /// Batches consecutive hits sharing a query id.
    ///
    /// Input is expected to be ordered by query. An unordered file yields the
    /// same query in several separate batches; they are not merged.
    pub fn each_query(self) -> QueryGroups<Self> {
        QueryGroups::new(self)
    }

    /// Clusters every query batch and yields `(query, subject, cluster)`.
    pub fn each_cluster(self, opts: ClusterOpts) -> ClusterGroups<QueryGroups<Self>> {
        ClusterGroups::new(self.each_query(), opts)
    }

    fn next_tabular(reader: &mut R, line: &mut String, line_no: &mut usize) -> Option<Result<Hit>> {
        loop {
            line.clear();
            match reader.read_line(line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(Error::Io(e))),
            }
            *line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return Some(
                trimmed
                    .parse::<Hit>()
                    .map_err(|e| e.at_record(*line_no)),
            );
        }
    }
}

impl<R: BufRead> Iterator for HitReader<R> {
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let next = match &mut self.source {
            Source::Tabular {
                reader,
                line,
                line_no,
            } => Self::next_tabular(reader, line, line_no),
            Source::Xml(hits) => hits.next(),
        };

        if let Some(Err(_)) = next {
            self.failed = true;
        }
        next
    }
}

/// Adapter grouping consecutive hits with the same query.
pub struct QueryGroups<I> {
    hits: I,
    pending: Option<Hit>,
    failed: bool,
}

impl<I: Iterator<Item = Result<Hit>>> QueryGroups<I> {
    pub fn new(hits: I) -> Self {
        Self {
            hits,
            pending: None,
            failed: false,
        }
    }

    fn fail(&mut self, e: Error) -> Option<Result<(String, Vec<Hit>)>> {
        self.failed = true;
        self.pending = None;
        Some(Err(e))
    }
}

impl<I: Iterator<Item = Result<Hit>>> Iterator for QueryGroups<I> {
    type Item = Result<(String, Vec<Hit>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let first = match self.pending.take() {
            Some(hit) => hit,
            None => match self.hits.next()? {
                Ok(hit) => hit,
                Err(e) => return self.fail(e),
            },
        };

        let query = first.query().to_string();
        let mut group = vec![first];
        loop {
            match self.hits.next() {
                None => break,
                Some(Ok(hit)) if hit.query() == query => group.push(hit),
                Some(Ok(hit)) => {
                    self.pending = Some(hit);
                    break;
                }
                Some(Err(e)) => return self.fail(e),
            }
        }

        Some(Ok((query, group)))
    }
}

/// Adapter clustering each query group into `(query, subject, cluster)`.
pub struct ClusterGroups<I> {
    groups: I,
    opts: ClusterOpts,
    ready: VecDeque<(String, String, Vec<Hit>)>,
    failed: bool,
}

impl<I: Iterator<Item = Result<(String, Vec<Hit>)>>> ClusterGroups<I> {
    pub fn new(groups: I, opts: ClusterOpts) -> Self {
        Self {
            groups,
            opts,
            ready: VecDeque::new(),
            failed: false,
        }
    }
}

impl<I: Iterator<Item = Result<(String, Vec<Hit>)>>> Iterator for ClusterGroups<I> {
    type Item = Result<(String, String, Vec<Hit>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.ready.is_empty() {
            if self.failed {
                return None;
            }
            match self.groups.next()? {
                Ok((query, hits)) => {
                    for cluster in cluster_hits(hits, &self.opts) {
                        let subject = cluster[0].subject().to_string();
                        self.ready.push_back((query.clone(), subject, cluster));
                    }
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        self.ready.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = "\
# BLASTN 2.2.26+
# Fields: query id, subject id, % identity, alignment length, mismatches, gap opens, q. start, q. end, s. start, s. end, evalue, bit score
q1\ts1\t98.5\t100\t1\t0\t1\t100\t500\t401\t1e-50\t200
q1\ts1\t97.0\t100\t3\t0\t101\t200\t400\t301\t1e-45\t180

q2\ts2\t90.0\t50\t5\t0\t1\t50\t10\t59\t1e-10\t80
q1\ts1\t99.0\t20\t0\t0\t300\t319\t1000\t1019\t1e-5\t40
";

    #[test]
    fn test_tabular_stream() {
        let hits: Vec<Hit> = HitReader::new(ROWS.as_bytes(), Format::Tabular)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].subject_start(), 500);
        assert_eq!(hits[2].query(), "q2");
    }

    #[test]
    fn test_each_query_keeps_unsorted_groups_apart() {
        let groups: Vec<(String, Vec<Hit>)> = HitReader::new(ROWS.as_bytes(), Format::Tabular)
            .each_query()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        let names: Vec<&str> = groups.iter().map(|(q, _)| q.as_str()).collect();
        assert_eq!(names, vec!["q1", "q2", "q1"]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[2].1.len(), 1);
    }

    #[test]
    fn test_each_cluster() {
        let clusters: Vec<_> = HitReader::new(ROWS.as_bytes(), Format::Tabular)
            .each_cluster(ClusterOpts::default())
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(clusters.len(), 3);
        let (query, subject, hits) = &clusters[0];
        assert_eq!((query.as_str(), subject.as_str()), ("q1", "s1"));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_parse_error_aborts() {
        let rows = "q1\ts1\t98.5\t100\t1\t0\t1\t100\t500\t401\t1e-50\t200\n\
                    q1\ts1\t98.5\t100\t1\t0\tX\t100\t500\t401\t1e-50\t200\n\
                    q2\ts1\t98.5\t100\t1\t0\t1\t100\t500\t401\t1e-50\t200\n";

        let mut hits = HitReader::new(rows.as_bytes(), Format::Tabular);
        assert!(hits.next().unwrap().is_ok());
        match hits.next() {
            Some(Err(Error::Parse { record, .. })) => assert_eq!(record, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(hits.next().is_none());

        // grouping returns no partial group
        let groups: Vec<_> = HitReader::new(rows.as_bytes(), Format::Tabular)
            .each_query()
            .collect();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("tab".parse::<Format>().unwrap(), Format::Tabular);
        assert_eq!("tree".parse::<Format>().unwrap(), Format::Xml);
        assert!("csv".parse::<Format>().is_err());
    }
}
