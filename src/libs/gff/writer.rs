use crate::libs::error::Result;
use crate::libs::gff::feature::{Feature, Region};
use log::warn;
use std::io::Write;

/// Writes feature trees as GFF3, one row per region.
///
/// Features without an `ID` receive `<prefix><n>`, with `n` counting up from 1
/// for each writer.
pub struct GffWriter<W: Write> {
    writer: W,
    id_prefix: String,
    last_id: usize,
}

impl<W: Write> GffWriter<W> {
    pub fn new(writer: W, id_prefix: &str) -> Self {
        Self {
            writer,
            id_prefix: id_prefix.to_string(),
            last_id: 0,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        writeln!(self.writer, "##gff-version 3")?;
        Ok(())
    }

    fn next_id(&mut self) -> String {
        self.last_id += 1;
        format!("{}{}", self.id_prefix, self.last_id)
    }

    /// Writes the feature, then its children and derivatives, depth first.
    /// Missing IDs are assigned in place and references to them filled in.
    /// A feature without regions is skipped together with everything below it.
    ///
    /// ```
    /// # use hitgff::libs::gff::{Feature, GffWriter, Region, Strand};
    /// let mut gene = Feature::new("chr1", "test", "gene", Strand::Forward).unwrap();
    /// gene.add_region(Region::new(1, 900));
    /// let mut exon = Feature::new("chr1", "test", "exon", Strand::Forward).unwrap();
    /// exon.add_region(Region::new(1, 100));
    /// gene.add_feature(exon);
    ///
    /// let mut out = Vec::new();
    /// let mut writer = GffWriter::new(&mut out, "feat");
    /// writer.write_feature(&mut gene).unwrap();
    /// assert_eq!(
    ///     String::from_utf8(out).unwrap(),
    ///     "chr1\ttest\tgene\t1\t900\t.\t+\t.\tID=feat1\n\
    ///      chr1\ttest\texon\t1\t100\t.\t+\t.\tID=feat2;Parent=feat1\n"
    /// );
    /// ```
    pub fn write_feature(&mut self, feature: &mut Feature) -> Result<()> {
        // its rows would carry the Parent links of the subtree
        if feature.regions().is_empty() {
            warn!(
                "Feature {} ({}) has no regions, its tree is not written",
                feature.id().unwrap_or("without ID"),
                feature.feature_type()
            );
            return Ok(());
        }

        if feature.id().is_none() {
            let id = self.next_id();
            feature.set_id(&id)?;
        }
        let id = feature.id().unwrap_or_default().to_string();

        for child in feature.features.iter_mut() {
            child.add_reference("Parent", &id);
        }
        for derivative in feature.derivatives.iter_mut() {
            derivative.add_reference("Derives_from", &id);
        }

        let mut regions: Vec<&Region> = feature.regions().iter().collect();
        regions.sort_by_key(|r| (r.start(), r.end()));
        for region in regions {
            self.write_row(feature, region)?;
        }

        for child in feature.features.iter_mut() {
            self.write_feature(child)?;
        }
        for derivative in feature.derivatives.iter_mut() {
            self.write_feature(derivative)?;
        }
        Ok(())
    }

    /// Sorts the top-level features, then writes each of them.
    pub fn write_features(&mut self, features: &mut [Feature]) -> Result<()> {
        features.sort_by(|a, b| a.compare(b));
        for feature in features.iter_mut() {
            self.write_feature(feature)?;
        }
        Ok(())
    }

    fn write_row(&mut self, feature: &Feature, region: &Region) -> Result<()> {
        let score = region
            .score()
            .map(|s| s.to_string())
            .unwrap_or_else(|| ".".to_string());
        let phase = region
            .phase()
            .map(|p| p.to_string())
            .unwrap_or_else(|| ".".to_string());

        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            feature.seqid(),
            feature.source(),
            feature.feature_type(),
            region.start(),
            region.end(),
            score,
            feature.strand(),
            phase,
            feature.attributes().merged(region.attributes()).encode(),
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::gff::{Attributes, FeatureTreeBuilder, GffRows, Strand};

    fn sample() -> Feature {
        let mut gene = Feature::new("scaffold_2", "test", "gene", Strand::Reverse).unwrap();
        gene.set_attribute("Name", "abc;1").unwrap();
        gene.add_region(Region::new(1000, 2000));

        let mut mrna = Feature::new("scaffold_2", "test", "mRNA", Strand::Reverse).unwrap();
        mrna.add_region(Region::new(1000, 2000));
        for (start, end) in [(1800, 2000), (1000, 1200)] {
            let mut exon = Feature::new("scaffold_2", "test", "exon", Strand::Reverse).unwrap();
            exon.add_region(Region::new(start, end));
            mrna.add_feature(exon);
        }
        let mut cds = Feature::new("scaffold_2", "test", "CDS", Strand::Reverse).unwrap();
        cds.set_id("cds1").unwrap();
        cds.add_region(Region::new(1900, 1800).with_phase(0).unwrap());
        cds.add_region(Region::new(1100, 1200).with_phase(2).unwrap());
        mrna.add_derivative(cds);

        gene.add_feature(mrna);
        gene
    }

    fn write(features: &mut [Feature]) -> String {
        let mut out = Vec::new();
        let mut writer = GffWriter::new(&mut out, "id");
        writer.write_header().unwrap();
        writer.write_features(features).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_assigned_ids() {
        let text = write(&mut [sample()]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "##gff-version 3");
        assert_eq!(
            lines[1],
            "scaffold_2\ttest\tgene\t1000\t2000\t.\t-\t.\tID=id1;Name=abc%3B1"
        );
        assert!(lines[2].ends_with("ID=id2;Parent=id1"));
        assert!(lines[3].ends_with("ID=id3;Parent=id2"));
        // regions of the derivative come out by position
        assert_eq!(
            lines[5],
            "scaffold_2\ttest\tCDS\t1100\t1200\t.\t-\t2\tID=cds1;Derives_from=id2"
        );
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_counter_per_writer() {
        let first = write(&mut [sample()]);
        let second = write(&mut [sample()]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_region_attributes_and_score() {
        let mut m = Feature::new("ctg1", "BLAST", "match", Strand::Forward).unwrap();
        m.set_attribute("Name", "est1").unwrap();
        let mut attrs = Attributes::new();
        attrs.insert("Target", "est1 1 101");
        m.add_region(Region::new(100, 200).with_score(150.5).with_attributes(attrs).unwrap());

        let text = write(&mut [m]);
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "ctg1\tBLAST\tmatch\t100\t200\t150.5\t+\t.\tID=id1;Name=est1;Target=est1 1 101"
        );
    }

    #[test]
    fn test_skip_feature_without_regions() {
        let m = Feature::new("ctg1", "BLAST", "match", Strand::Forward).unwrap();
        let text = write(&mut [m]);
        assert_eq!(text, "##gff-version 3\n");

        // its children are dropped as well, and no ID is used up
        let mut gene = Feature::new("ctg1", "test", "gene", Strand::Forward).unwrap();
        let mut exon = Feature::new("ctg1", "test", "exon", Strand::Forward).unwrap();
        exon.add_region(Region::new(1, 100));
        gene.add_feature(exon);
        let mut other = Feature::new("ctg2", "test", "gene", Strand::Forward).unwrap();
        other.add_region(Region::new(1, 50));

        let text = write(&mut [gene, other]);
        assert_eq!(
            text,
            "##gff-version 3\nctg2\ttest\tgene\t1\t50\t.\t+\t.\tID=id1\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let mut features = vec![sample()];
        let mut other = Feature::new("scaffold_10", "test", "gene", Strand::Forward).unwrap();
        other.add_region(Region::new(5, 50).with_score(3.0));
        features.push(other);
        let text = write(&mut features);

        let mut roots = FeatureTreeBuilder::new(GffRows::new(text.as_bytes()))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(roots.len(), 2);

        // writing the re-read trees again is stable
        assert_eq!(write(&mut roots), text);

        let gene = &roots[0];
        assert_eq!(gene.seqid(), "scaffold_2");
        assert_eq!(gene.name(), Some("abc;1"));
        let mrna = &gene.features()[0];
        assert_eq!(mrna.features().len(), 2);
        assert_eq!(mrna.derivatives()[0].regions().len(), 2);
        assert_eq!(roots[1].regions()[0].score(), Some(3.0));
    }
}
