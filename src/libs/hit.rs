use crate::libs::error::{Error, Result};
use crate::libs::evalue::EValue;
use std::io;

/// Which sequence of a pairwise alignment positions are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    Query,
    #[default]
    Subject,
}

impl Axis {
    /// The other sequence of the pair
    pub fn alt(&self) -> Axis {
        match self {
            Axis::Query => Axis::Subject,
            Axis::Subject => Axis::Query,
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "query" => Ok(Axis::Query),
            "subject" => Ok(Axis::Subject),
            _ => Err(Error::validation(format!("Unknown axis: {}", s))),
        }
    }
}

/// One local alignment between a query and a subject sequence.
///
/// Coordinates are 1-based and inclusive. Either endpoint may be the larger
/// one; a hit is on the reverse strand of a sequence when its end is smaller
/// than its start. Which optional fields are set depends on the source the
/// hit was read from: tabular rows carry identity percentage, mismatches and
/// gap openings, XML HSPs carry identities, positives, gaps, frames and the
/// aligned strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hit {
    pub(crate) query: String,
    pub(crate) subject: String,
    pub(crate) query_start: u64,
    pub(crate) query_end: u64,
    pub(crate) subject_start: u64,
    pub(crate) subject_end: u64,
    pub(crate) e_value: EValue,
    pub(crate) bit_score: f64,
    pub(crate) alignment_length: Option<u64>,
    // tabular
    pub(crate) percentage_identity: Option<f64>,
    pub(crate) mismatches: Option<u64>,
    pub(crate) gap_openings: Option<u64>,
    // xml
    pub(crate) identities: Option<u64>,
    pub(crate) positives: Option<u64>,
    pub(crate) gaps: Option<u64>,
    pub(crate) query_frame: Option<i32>,
    pub(crate) subject_frame: Option<i32>,
    pub(crate) query_seq: Option<String>,
    pub(crate) subject_seq: Option<String>,
    pub(crate) midline: Option<String>,
}

impl Hit {
    // Immutable accessors
    pub fn query(&self) -> &str {
        &self.query
    }
    pub fn subject(&self) -> &str {
        &self.subject
    }
    pub fn query_start(&self) -> u64 {
        self.query_start
    }
    pub fn query_end(&self) -> u64 {
        self.query_end
    }
    pub fn subject_start(&self) -> u64 {
        self.subject_start
    }
    pub fn subject_end(&self) -> u64 {
        self.subject_end
    }
    pub fn e_value(&self) -> EValue {
        self.e_value
    }
    pub fn bit_score(&self) -> f64 {
        self.bit_score
    }
    pub fn alignment_length(&self) -> Option<u64> {
        self.alignment_length
    }
    pub fn mismatches(&self) -> Option<u64> {
        self.mismatches
    }
    pub fn gap_openings(&self) -> Option<u64> {
        self.gap_openings
    }
    pub fn identities(&self) -> Option<u64> {
        self.identities
    }
    pub fn positives(&self) -> Option<u64> {
        self.positives
    }
    pub fn gaps(&self) -> Option<u64> {
        self.gaps
    }
    pub fn query_frame(&self) -> Option<i32> {
        self.query_frame
    }
    pub fn subject_frame(&self) -> Option<i32> {
        self.subject_frame
    }
    pub fn query_seq(&self) -> Option<&str> {
        self.query_seq.as_deref()
    }
    pub fn subject_seq(&self) -> Option<&str> {
        self.subject_seq.as_deref()
    }
    pub fn midline(&self) -> Option<&str> {
        self.midline.as_deref()
    }

    /// Identity percentage, as reported or derived from the identity count.
    pub fn percentage_identity(&self) -> Option<f64> {
        self.percentage_identity.or_else(|| {
            let len = self.alignment_length.filter(|&l| l > 0)?;
            let ident = self.identities?;
            Some((ident as f64 * 10000.0 / len as f64).round() / 100.0)
        })
    }

    pub fn id(&self, axis: Axis) -> &str {
        match axis {
            Axis::Query => &self.query,
            Axis::Subject => &self.subject,
        }
    }

    pub fn start(&self, axis: Axis) -> u64 {
        match axis {
            Axis::Query => self.query_start,
            Axis::Subject => self.subject_start,
        }
    }

    pub fn end(&self, axis: Axis) -> u64 {
        match axis {
            Axis::Query => self.query_end,
            Axis::Subject => self.subject_end,
        }
    }

    /// Leftmost position on the sequence, regardless of orientation
    pub fn low(&self, axis: Axis) -> u64 {
        self.start(axis).min(self.end(axis))
    }

    /// Rightmost position on the sequence, regardless of orientation
    pub fn high(&self, axis: Axis) -> u64 {
        self.start(axis).max(self.end(axis))
    }

    /// ```
    /// # use hitgff::libs::hit::{Axis, Hit};
    /// let hit: Hit = "q1\ts1\t98.5\t100\t1\t0\t1\t100\t500\t401\t1e-50\t200"
    ///     .parse()
    ///     .unwrap();
    /// assert!(hit.is_forward(Axis::Query));
    /// assert!(!hit.is_forward(Axis::Subject));
    /// assert_eq!(hit.length(Axis::Subject), 100);
    /// ```
    pub fn is_forward(&self, axis: Axis) -> bool {
        self.end(axis) > self.start(axis)
    }

    pub fn length(&self, axis: Axis) -> u64 {
        self.high(axis) - self.low(axis) + 1
    }

    /// Swaps the roles of query and subject.
    pub fn transpose(&mut self) {
        std::mem::swap(&mut self.query, &mut self.subject);
        std::mem::swap(&mut self.query_start, &mut self.subject_start);
        std::mem::swap(&mut self.query_end, &mut self.subject_end);
        std::mem::swap(&mut self.query_frame, &mut self.subject_frame);
        std::mem::swap(&mut self.query_seq, &mut self.subject_seq);
    }

    /// Writes the hit as a 12-column tabular row. Columns that the source did
    /// not carry are derived from the XML counts when possible, else `0`.
    pub fn write_tabular<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        let mismatches = self.mismatches.or_else(|| {
            let len = self.alignment_length?;
            Some(len.saturating_sub(self.identities?).saturating_sub(self.gaps.unwrap_or(0)))
        });
        let gap_openings = self.gap_openings.or_else(|| {
            let q = self.query_seq.as_deref()?;
            let s = self.subject_seq.as_deref()?;
            Some(count_gap_runs(q) + count_gap_runs(s))
        });

        writeln!(
            w,
            "{}\t{}\t{:.2}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query,
            self.subject,
            self.percentage_identity().unwrap_or(0.0),
            self.alignment_length.unwrap_or(0),
            mismatches.unwrap_or(0),
            gap_openings.unwrap_or(0),
            self.query_start,
            self.query_end,
            self.subject_start,
            self.subject_end,
            self.e_value,
            self.bit_score,
        )
    }
}

fn count_gap_runs(aligned: &str) -> u64 {
    let mut runs = 0;
    let mut in_gap = false;
    for c in aligned.bytes() {
        if c == b'-' {
            if !in_gap {
                runs += 1;
            }
            in_gap = true;
        } else {
            in_gap = false;
        }
    }
    runs
}

impl std::str::FromStr for Hit {
    type Err = Error;

    /// Parses one row of 12-column tabular output:
    /// query, subject, % identity, alignment length, mismatches, gap openings,
    /// q. start, q. end, s. start, s. end, e-value, bit score.
    fn from_str(s: &str) -> Result<Self> {
        let mut fields: Vec<&str> = s.split('\t').map(|f| f.trim()).collect();
        if fields.len() < 12 {
            fields = s.split_whitespace().collect();
        }
        if fields.len() < 12 {
            return Err(Error::parse(
                0,
                format!("Expected 12 columns, found {}", fields.len()),
            ));
        }

        let parse_u64 = |name: &str, v: &str| {
            v.parse::<u64>()
                .map_err(|_| Error::parse(0, format!("Invalid {}: {}", name, v)))
        };
        let parse_f64 = |name: &str, v: &str| {
            v.parse::<f64>()
                .map_err(|_| Error::parse(0, format!("Invalid {}: {}", name, v)))
        };

        Ok(Hit {
            query: fields[0].to_string(),
            subject: fields[1].to_string(),
            percentage_identity: Some(parse_f64("percentage identity", fields[2])?),
            alignment_length: Some(parse_u64("alignment length", fields[3])?),
            mismatches: Some(parse_u64("mismatches", fields[4])?),
            gap_openings: Some(parse_u64("gap openings", fields[5])?),
            query_start: parse_u64("query start", fields[6])?,
            query_end: parse_u64("query end", fields[7])?,
            subject_start: parse_u64("subject start", fields[8])?,
            subject_end: parse_u64("subject end", fields[9])?,
            e_value: fields[10].parse()?,
            bit_score: parse_f64("bit score", fields[11])?,
            ..Default::default()
        })
    }
}
