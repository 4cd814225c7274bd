use crate::libs::error::{Error, Result};
use crate::libs::gff::attributes::{AttrValue, Attributes, FEATURE_KEYS};
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

lazy_static! {
    static ref RE_NUMBERED: Regex = Regex::new(r"^(.*?)(\d+)$").unwrap();
}

/// Sort precedence of feature types sharing a start position
const TYPE_ORDER: [&str; 9] = [
    "exon",
    "intron",
    "CDS",
    "five_prime_UTR",
    "three_prime_UTR",
    "transcription_start_site",
    "transcription_end_site",
    "start_codon",
    "stop_codon",
];

//----------------------------
// Strand
//----------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    Forward,
    Reverse,
    #[default]
    Unstranded,
    Unknown,
}

impl std::str::FromStr for Strand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." => Ok(Strand::Unstranded),
            "?" => Ok(Strand::Unknown),
            _ => Err(Error::validation(format!("Invalid strand: {}", s))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unstranded => '.',
            Strand::Unknown => '?',
        };
        write!(f, "{}", c)
    }
}

//----------------------------
// Region
//----------------------------
/// One contiguous span of a feature, `start <= end`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    start: u64,
    end: u64,
    score: Option<f64>,
    phase: Option<u8>,
    attributes: Attributes,
}

impl Region {
    /// Endpoints may be given in either order.
    ///
    /// ```
    /// # use hitgff::libs::gff::Region;
    /// let region = Region::new(500, 401);
    /// assert_eq!((region.start(), region.end()), (401, 500));
    /// assert!(Region::new(1, 10).with_phase(3).is_err());
    /// ```
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_phase(mut self, phase: u8) -> Result<Self> {
        if phase > 2 {
            return Err(Error::validation(format!("Invalid phase: {}", phase)));
        }
        self.phase = Some(phase);
        Ok(self)
    }

    /// `ID` and `Name` belong to the feature and are rejected here.
    pub fn with_attributes(mut self, attributes: Attributes) -> Result<Self> {
        if let Some(key) = ["ID", "Name"].iter().find(|k| attributes.contains_key(k)) {
            return Err(Error::validation(format!("{} is not a region attribute", key)));
        }
        self.attributes = attributes;
        Ok(self)
    }

    // Immutable accessors
    pub fn start(&self) -> u64 {
        self.start
    }
    pub fn end(&self) -> u64 {
        self.end
    }
    pub fn score(&self) -> Option<f64> {
        self.score
    }
    pub fn phase(&self) -> Option<u8> {
        self.phase
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

//----------------------------
// Feature
//----------------------------
/// A GFF3 feature with its regions, its parts (`Parent` links) and the
/// features derived from it (`Derives_from` links).
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub(crate) seqid: String,
    pub(crate) source: String,
    pub(crate) feature_type: String,
    pub(crate) strand: Strand,
    pub(crate) attributes: Attributes,
    pub(crate) regions: Vec<Region>,
    pub(crate) features: Vec<Feature>,
    pub(crate) derivatives: Vec<Feature>,
}

impl Feature {
    /// ```
    /// # use hitgff::libs::gff::{Feature, Strand};
    /// let gene = Feature::new("chr1", "test", "gene", Strand::Forward).unwrap();
    /// assert_eq!(gene.seqid(), "chr1");
    /// assert!(gene.id().is_none());
    ///
    /// assert!(Feature::new("", "test", "gene", Strand::Forward).is_err());
    /// ```
    pub fn new(seqid: &str, source: &str, feature_type: &str, strand: Strand) -> Result<Self> {
        for (field, value) in [("seqid", seqid), ("source", source), ("type", feature_type)] {
            if value.is_empty() {
                return Err(Error::validation(format!("Feature without {}", field)));
            }
        }

        Ok(Self {
            seqid: seqid.to_string(),
            source: source.to_string(),
            feature_type: feature_type.to_string(),
            strand,
            attributes: Attributes::new(),
            regions: vec![],
            features: vec![],
            derivatives: vec![],
        })
    }

    // Immutable accessors
    pub fn seqid(&self) -> &str {
        &self.seqid
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }
    pub fn strand(&self) -> Strand {
        self.strand
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
    pub fn features(&self) -> &[Feature] {
        &self.features
    }
    pub fn derivatives(&self) -> &[Feature] {
        &self.derivatives
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get_str("ID")
    }
    pub fn name(&self) -> Option<&str> {
        self.attributes.get_str("Name")
    }
    pub fn parents(&self) -> Vec<&str> {
        self.attributes.values("Parent")
    }
    pub fn derives_from(&self) -> Vec<&str> {
        self.attributes.values("Derives_from")
    }

    /// Sets one of the feature-level attributes. Setting `ID` goes through
    /// [`Feature::set_id`].
    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        if !FEATURE_KEYS.contains(&key) {
            return Err(Error::validation(format!("{} is not a feature attribute", key)));
        }

        let value = value.into();
        if key == "ID" {
            let id = value
                .first()
                .ok_or_else(|| Error::validation("Empty ID"))?
                .to_string();
            return self.set_id(&id);
        }
        self.attributes.insert(key, value);
        Ok(())
    }

    /// Renames the feature. Children's `Parent` and derivatives'
    /// `Derives_from` references to the old id follow the new one.
    ///
    /// ```
    /// # use hitgff::libs::gff::{Feature, Strand};
    /// let mut gene = Feature::new("chr1", "test", "gene", Strand::Forward).unwrap();
    /// gene.set_id("gene1").unwrap();
    ///
    /// let mut exon = Feature::new("chr1", "test", "exon", Strand::Forward).unwrap();
    /// exon.set_attribute("Parent", "gene1").unwrap();
    /// gene.add_feature(exon);
    ///
    /// gene.set_id("g1").unwrap();
    /// assert_eq!(gene.features()[0].parents(), vec!["g1"]);
    /// ```
    pub fn set_id(&mut self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::validation("Empty ID"));
        }

        let old = self.id().map(|s| s.to_string());
        self.attributes.insert("ID", id);

        if let Some(old) = old {
            for child in self.features.iter_mut() {
                child.rename_reference("Parent", &old, id);
            }
            for derivative in self.derivatives.iter_mut() {
                derivative.rename_reference("Derives_from", &old, id);
            }
        }
        Ok(())
    }

    fn rename_reference(&mut self, key: &str, old: &str, new: &str) {
        let renamed = match self.attributes.get(key) {
            Some(AttrValue::Single(v)) if v == old => AttrValue::Single(new.to_string()),
            Some(AttrValue::List(list)) if list.iter().any(|v| v == old) => AttrValue::List(
                list.iter()
                    .map(|v| if v == old { new.to_string() } else { v.clone() })
                    .collect(),
            ),
            _ => return,
        };
        self.attributes.insert(key, renamed);
    }

    /// Adds `value` to a reference attribute unless it is already listed.
    pub(crate) fn add_reference(&mut self, key: &str, value: &str) {
        let mut values: Vec<String> = self
            .attributes
            .values(key)
            .iter()
            .map(|v| v.to_string())
            .collect();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
            self.attributes.insert(key, values);
        }
    }

    pub fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn add_derivative(&mut self, feature: Feature) {
        self.derivatives.push(feature);
    }

    /// Detaches the latest child with the given id
    pub(crate) fn take_feature(&mut self, id: &str) -> Option<Feature> {
        let idx = self.features.iter().rposition(|f| f.id() == Some(id))?;
        Some(self.features.remove(idx))
    }

    pub(crate) fn take_derivative(&mut self, id: &str) -> Option<Feature> {
        let idx = self.derivatives.iter().rposition(|f| f.id() == Some(id))?;
        Some(self.derivatives.remove(idx))
    }

    /// Leftmost position of the regions, or of the children when the feature
    /// has no regions of its own.
    pub fn start(&self) -> Option<u64> {
        match self.regions.iter().map(|r| r.start).min() {
            Some(start) => Some(start),
            None => self.features.iter().filter_map(|f| f.start()).min(),
        }
    }

    pub fn end(&self) -> Option<u64> {
        match self.regions.iter().map(|r| r.end).max() {
            Some(end) => Some(end),
            None => self.features.iter().filter_map(|f| f.end()).max(),
        }
    }

    /// Best region score
    pub fn score(&self) -> Option<f64> {
        self.regions
            .iter()
            .filter_map(|r| r.score)
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Orders by seqid (numeric suffixes compared as numbers), then start,
    /// then type.
    ///
    /// ```
    /// # use hitgff::libs::gff::{Feature, Region, Strand};
    /// let mut a = Feature::new("scaffold_9", "test", "exon", Strand::Forward).unwrap();
    /// a.add_region(Region::new(100, 200));
    /// let mut b = Feature::new("scaffold_10", "test", "exon", Strand::Forward).unwrap();
    /// b.add_region(Region::new(1, 50));
    /// assert!(a.compare(&b).is_lt());
    /// ```
    pub fn compare(&self, other: &Feature) -> Ordering {
        cmp_seqid(&self.seqid, &other.seqid)
            .then_with(|| self.start().cmp(&other.start()))
            .then_with(|| cmp_type(&self.feature_type, &other.feature_type))
    }

    /// Sorts regions by start and children and derivatives with
    /// [`Feature::compare`], at every level.
    pub fn sort_all(&mut self) {
        self.regions.sort_by_key(|r| (r.start, r.end));
        for child in self.features.iter_mut() {
            child.sort_all();
        }
        for derivative in self.derivatives.iter_mut() {
            derivative.sort_all();
        }
        self.features.sort_by(|a, b| a.compare(b));
        self.derivatives.sort_by(|a, b| a.compare(b));
    }
}

/// ```
/// # use hitgff::libs::gff::feature::cmp_seqid;
/// assert!(cmp_seqid("scaffold_9", "scaffold_10").is_lt());
/// assert!(cmp_seqid("scaffoldA", "scaffoldB").is_lt());
/// assert!(cmp_seqid("chr2", "chrX").is_lt());
/// ```
pub fn cmp_seqid(a: &str, b: &str) -> Ordering {
    if let (Some(ca), Some(cb)) = (RE_NUMBERED.captures(a), RE_NUMBERED.captures(b)) {
        if ca[1] == cb[1] {
            let na = ca[2].trim_start_matches('0');
            let nb = cb[2].trim_start_matches('0');
            return na
                .len()
                .cmp(&nb.len())
                .then_with(|| na.cmp(nb))
                .then_with(|| a.cmp(b));
        }
    }
    a.cmp(b)
}

fn cmp_type(a: &str, b: &str) -> Ordering {
    let rank = |t: &str| TYPE_ORDER.iter().position(|&k| k == t);
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
