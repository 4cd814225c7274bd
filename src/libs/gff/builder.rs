use crate::libs::error::{Error, Result};
use crate::libs::gff::attributes::{Attributes, FEATURE_KEYS};
use crate::libs::gff::feature::{Feature, Region, Strand};
use log::{debug, warn};
use std::io::BufRead;

//----------------------------
// GffRow
//----------------------------
/// One data line of a GFF3 file.
#[derive(Debug, Clone, PartialEq)]
pub struct GffRow {
    pub seqid: String,
    pub source: String,
    pub feature_type: String,
    pub start: u64,
    pub end: u64,
    pub score: Option<f64>,
    pub strand: Strand,
    pub phase: Option<u8>,
    pub attributes: Attributes,
}

impl std::str::FromStr for GffRow {
    type Err = Error;

    /// ```
    /// # use hitgff::libs::gff::{GffRow, Strand};
    /// let row: GffRow = "ctg123\t.\tCDS\t1201\t1500\t.\t+\t0\tID=cds1;Parent=mRNA1"
    ///     .parse()
    ///     .unwrap();
    /// assert_eq!(row.start, 1201);
    /// assert_eq!(row.score, None);
    /// assert_eq!(row.strand, Strand::Forward);
    /// assert_eq!(row.phase, Some(0));
    /// assert_eq!(row.attributes.get_str("Parent"), Some("mRNA1"));
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();
        if fields.len() < 9 {
            return Err(Error::parse(
                0,
                format!("Expected 9 columns, found {}", fields.len()),
            ));
        }

        let number = |name: &str, v: &str| {
            v.parse::<u64>()
                .map_err(|_| Error::parse(0, format!("Invalid {}: {}", name, v)))
        };
        let score = match fields[5] {
            "." => None,
            v => Some(
                v.parse::<f64>()
                    .map_err(|_| Error::parse(0, format!("Invalid score: {}", v)))?,
            ),
        };
        let phase = match fields[7] {
            "." => None,
            v => {
                let phase = v
                    .parse::<u8>()
                    .map_err(|_| Error::parse(0, format!("Invalid phase: {}", v)))?;
                if phase > 2 {
                    return Err(Error::validation(format!("Invalid phase: {}", phase)));
                }
                Some(phase)
            }
        };

        Ok(GffRow {
            seqid: fields[0].to_string(),
            source: fields[1].to_string(),
            feature_type: fields[2].to_string(),
            start: number("start", fields[3])?,
            end: number("end", fields[4])?,
            score,
            strand: fields[6].parse()?,
            phase,
            attributes: Attributes::decode(fields[8])?,
        })
    }
}

impl GffRow {
    /// The feature-level attributes and the region built from this row
    fn into_parts(self) -> Result<(Feature, Region)> {
        let (feature_attrs, region_attrs) = self.attributes.split(&FEATURE_KEYS);

        let mut region = Region::new(self.start, self.end);
        if let Some(score) = self.score {
            region = region.with_score(score);
        }
        if let Some(phase) = self.phase {
            region = region.with_phase(phase)?;
        }
        let region = region.with_attributes(region_attrs)?;

        let mut feature = Feature::new(&self.seqid, &self.source, &self.feature_type, self.strand)?;
        feature.attributes = feature_attrs;

        Ok((feature, region))
    }
}

/// Data lines of a GFF3 stream. Comments and blank lines are skipped, the
/// stream ends at a `##FASTA` section.
pub struct GffRows<R: BufRead> {
    reader: R,
    line: String,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> GffRows<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for GffRows<R> {
    type Item = Result<GffRow>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.line.trim_end();
                    if line.starts_with("##FASTA") || line.starts_with('>') {
                        self.done = true;
                    } else if line.is_empty() || line.starts_with('#') {
                        continue;
                    } else {
                        let row = line.parse::<GffRow>().map_err(|e| e.at_record(self.line_no));
                        if row.is_err() {
                            self.done = true;
                        }
                        return Some(row);
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::Io(e)));
                }
            }
        }
        None
    }
}

//----------------------------
// FeatureTreeBuilder
//----------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Root,
    Child,
    Derivative,
}

/// Rebuilds feature trees from GFF3 rows, yielding each top-level feature
/// once no later row can belong to it.
///
/// A stack holds the open features, innermost last. Each row is matched
/// against the stack top-down: a row whose `Parent` is an open feature opens
/// a child, a row repeating an open `ID` adds a region to it, a row whose
/// `Derives_from` is an open feature opens a derivative. Features above the
/// match are closed into their owners.
///
/// Rows of one tree must not be interleaved with rows of another top-level
/// tree; such rows are attached to a new root.
pub struct FeatureTreeBuilder<I> {
    rows: I,
    stack: Vec<(Feature, Link)>,
    ready: Option<Feature>,
    count: usize,
    failed: bool,
}

impl FeatureTreeBuilder<GffRows<Box<dyn BufRead>>> {
    /// ```
    /// # use hitgff::libs::gff::FeatureTreeBuilder;
    /// let roots = FeatureTreeBuilder::open("tests/gff/gene.gff3")
    ///     .unwrap()
    ///     .collect::<Result<Vec<_>, _>>()
    ///     .unwrap();
    /// assert_eq!(roots.len(), 2);
    /// assert_eq!(roots[0].features().len(), 1);
    /// ```
    pub fn open(input: &str) -> Result<Self> {
        let reader = crate::libs::io::reader(input)?;
        Ok(Self::new(GffRows::new(reader)))
    }
}

impl<I: Iterator<Item = Result<GffRow>>> FeatureTreeBuilder<I> {
    pub fn new(rows: I) -> Self {
        Self {
            rows,
            stack: vec![],
            ready: None,
            count: 0,
            failed: false,
        }
    }

    /// Pops the innermost open feature into its owner. Returns it when it
    /// was a root.
    fn close_top(&mut self) -> Option<Feature> {
        let (feature, link) = self.stack.pop()?;
        match (link, self.stack.last_mut()) {
            (Link::Child, Some((owner, _))) => owner.add_feature(feature),
            (Link::Derivative, Some((owner, _))) => owner.add_derivative(feature),
            _ => return Some(feature),
        }
        None
    }

    fn push_row(&mut self, row: GffRow) -> Result<()> {
        self.count += 1;
        let (feature, region) = row.into_parts()?;

        let id = feature.id().map(|s| s.to_string());
        let parents: Vec<String> = feature.parents().iter().map(|s| s.to_string()).collect();
        let derives: Vec<String> = feature.derives_from().iter().map(|s| s.to_string()).collect();
        if id.is_none() {
            warn!(
                "Row {} ({} at {}:{}) has no ID",
                self.count,
                feature.feature_type(),
                feature.seqid(),
                region.start()
            );
        }

        while let Some((top, _)) = self.stack.last_mut() {
            let top_id = top.id().map(|s| s.to_string());

            if let Some(top_id) = top_id {
                // another region of an open feature
                if id.as_deref() == Some(top_id.as_str()) {
                    top.add_region(region);
                    return Ok(());
                }

                if parents.contains(&top_id) {
                    let reopened = id.as_deref().and_then(|id| top.take_feature(id));
                    self.open_feature(reopened, feature, region, Link::Child);
                    return Ok(());
                }

                if derives.contains(&top_id) {
                    let reopened = id.as_deref().and_then(|id| top.take_derivative(id));
                    self.open_feature(reopened, feature, region, Link::Derivative);
                    return Ok(());
                }
            }

            if let Some(root) = self.close_top() {
                self.ready = Some(root);
            }
        }

        if !parents.is_empty() || !derives.is_empty() {
            debug!(
                "Row {} refers to features that are not open, starting a new tree",
                self.count
            );
        }
        self.open_feature(None, feature, region, Link::Root);
        Ok(())
    }

    fn open_feature(
        &mut self,
        reopened: Option<Feature>,
        feature: Feature,
        region: Region,
        link: Link,
    ) {
        let mut feature = reopened.unwrap_or(feature);
        feature.add_region(region);
        self.stack.push((feature, link));
    }
}

impl<I: Iterator<Item = Result<GffRow>>> Iterator for FeatureTreeBuilder<I> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(root) = self.ready.take() {
                return Some(Ok(root));
            }
            if self.failed {
                return None;
            }

            match self.rows.next() {
                Some(Ok(row)) => {
                    if let Err(e) = self.push_row(row) {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                None => {
                    while !self.stack.is_empty() {
                        if let Some(root) = self.close_top() {
                            return Some(Ok(root));
                        }
                    }
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str) -> Vec<Feature> {
        FeatureTreeBuilder::new(GffRows::new(text.as_bytes()))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_gene_with_exons_and_derivative() {
        let text = "\
##gff-version 3
chr1\ttest\tgene\t1000\t9000\t.\t+\t.\tID=gene1;Name=EDEN
chr1\ttest\texon\t1000\t1500\t.\t+\t.\tID=exon1;Parent=gene1
chr1\ttest\texon\t3000\t3902\t.\t+\t.\tID=exon2;Parent=gene1
chr1\ttest\tCDS\t1201\t1500\t.\t+\t0\tID=cds1;Derives_from=gene1
";
        let roots = build(text);
        assert_eq!(roots.len(), 1);

        let gene = &roots[0];
        assert_eq!(gene.id(), Some("gene1"));
        assert_eq!(gene.name(), Some("EDEN"));
        assert_eq!(gene.features().len(), 2);
        assert_eq!(gene.derivatives().len(), 1);
        assert_eq!(gene.features()[1].regions()[0].end(), 3902);
        assert_eq!(gene.derivatives()[0].regions()[0].phase(), Some(0));
    }

    #[test]
    fn test_multi_region_features() {
        let text = "\
chr1\ttest\tmRNA\t1000\t9000\t.\t+\t.\tID=mRNA1
chr1\ttest\tCDS\t1201\t1500\t.\t+\t0\tID=cds1;Parent=mRNA1
chr1\ttest\tCDS\t3000\t3902\t.\t+\t0\tID=cds1;Parent=mRNA1
chr1\ttest\texon\t5000\t5500\t.\t+\t.\tParent=mRNA1
chr1\ttest\tCDS\t5000\t5500\t.\t+\t0\tID=cds1;Parent=mRNA1
";
        let roots = build(text);
        assert_eq!(roots.len(), 1);

        let mrna = &roots[0];
        assert_eq!(mrna.features().len(), 2);
        let cds: Vec<&Feature> = mrna
            .features()
            .iter()
            .filter(|f| f.feature_type() == "CDS")
            .collect();
        assert_eq!(cds.len(), 1);
        assert_eq!(cds[0].regions().len(), 3);
    }

    #[test]
    fn test_match_regions_keep_their_attributes() {
        let text = "\
ctg1\tBLAST\tmatch\t100\t200\t150\t+\t.\tID=m1;Name=est1;Target=est1 1 101
ctg1\tBLAST\tmatch\t5000\t5100\t90.5\t+\t.\tID=m1;Name=est1;Target=est1 102 202
ctg1\tBLAST\tmatch\t6000\t6100\t80\t-\t.\tID=m2;Name=est2;Target=est2 1 101
";
        let roots = build(text);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].regions().len(), 2);
        assert_eq!(roots[0].regions()[1].score(), Some(90.5));
        assert_eq!(
            roots[0].regions()[1].attributes().get_str("Target"),
            Some("est1 102 202")
        );
        assert!(!roots[0].attributes().contains_key("Target"));
        assert_eq!(roots[1].strand(), Strand::Reverse);
    }

    #[test]
    fn test_nested_three_levels() {
        let text = "\
chr1\ttest\tgene\t1\t900\t.\t-\t.\tID=g1
chr1\ttest\tmRNA\t1\t900\t.\t-\t.\tID=t1;Parent=g1
chr1\ttest\texon\t1\t100\t.\t-\t.\tParent=t1
chr1\ttest\texon\t800\t900\t.\t-\t.\tParent=t1
chr1\ttest\tmRNA\t1\t900\t.\t-\t.\tID=t2;Parent=g1
chr1\ttest\texon\t1\t900\t.\t-\t.\tParent=t2
chr2\ttest\tgene\t1\t50\t.\t+\t.\tID=g2
";
        let roots = build(text);
        assert_eq!(roots.len(), 2);

        let gene = &roots[0];
        assert_eq!(gene.features().len(), 2);
        assert_eq!(gene.features()[0].features().len(), 2);
        assert_eq!(gene.features()[1].features().len(), 1);
        assert_eq!(roots[1].seqid(), "chr2");
    }

    #[test]
    fn test_rows_without_id() {
        // never merged, and a dangling Parent starts its own tree
        let text = "\
chr1\ttest\tgene\t1\t900\t.\t+\t.\tName=lonely
chr1\ttest\tgene\t1\t900\t.\t+\t.\tName=lonely
chr1\ttest\texon\t10\t20\t.\t+\t.\tParent=nowhere
";
        let roots = build(text);
        assert_eq!(roots.len(), 3);

        assert_eq!(roots[0].id(), None);
        assert_eq!(roots[0].name(), Some("lonely"));
        assert_eq!(roots[0].regions().len(), 1);
        assert_eq!(roots[1].id(), None);

        assert_eq!(roots[2].feature_type(), "exon");
        assert_eq!(roots[2].parents(), vec!["nowhere"]);
        assert!(roots[2].features().is_empty());
    }

    #[test]
    fn test_fasta_section_ends_rows() {
        let text = "\
chr1\ttest\tgene\t1\t900\t.\t+\t.\tID=g1
##FASTA
>chr1
ACGT
";
        let rows: Vec<GffRow> = GffRows::new(text.as_bytes())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_bad_rows() {
        let text = "chr1\ttest\tgene\t1\t900\t.\t+\t.\tID=g1\nchr1\ttest\tgene\tx\t900\t.\t+\t.\tID=g2\n";
        let mut builder = FeatureTreeBuilder::new(GffRows::new(text.as_bytes()));
        match builder.next() {
            Some(Err(Error::Parse { record, .. })) => assert_eq!(record, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(builder.next().is_none());

        let text = "chr1\ttest\tgene\t1\t900\t.\t*\t.\tID=g1\n";
        let res: Result<Vec<_>> = FeatureTreeBuilder::new(GffRows::new(text.as_bytes())).collect();
        assert!(matches!(res, Err(Error::Validation(_))));

        let res: Result<GffRow> = "chr1\ttest\tgene\t1\t900".parse();
        assert!(res.is_err());
    }
}
