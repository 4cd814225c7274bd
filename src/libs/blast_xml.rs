use crate::libs::error::{Error, Result};
use crate::libs::hit::Hit;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::io::BufRead;

// Databases built without parsed deflines report generic hit ids
const GENERIC_HIT_ID: &str = "gnl|BL_ORD_ID|";

enum Tag {
    Open(String),
    Text(String),
    Close(String),
    Eof,
    Other,
}

/// Streams the HSPs of a BLAST XML report (`-outfmt 5`).
///
/// Iteration → Hit → Hsp nesting is flattened: every `<Hsp>` becomes one
/// [`Hit`], since a query/subject pair may align in several segments.
pub struct XmlHits<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    text: String,
    report_query: String,
    query: String,
    hit_id: String,
    hit_def: String,
    hsp: HashMap<String, String>,
    count: usize,
    done: bool,
}

impl<R: BufRead> XmlHits<R> {
    pub fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            text: String::new(),
            report_query: String::new(),
            query: String::new(),
            hit_id: String::new(),
            hit_def: String::new(),
            hsp: HashMap::new(),
            count: 0,
            done: false,
        }
    }

    fn next_tag(&mut self) -> Result<Tag> {
        let tag = match self.reader.read_event_into(&mut self.buf)? {
            Event::Start(e) => Tag::Open(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
            Event::End(e) => Tag::Close(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
            Event::Text(t) => Tag::Text(t.unescape()?.into_owned()),
            Event::CData(t) => Tag::Text(String::from_utf8_lossy(&t).into_owned()),
            Event::Eof => Tag::Eof,
            _ => Tag::Other,
        };
        self.buf.clear();

        Ok(tag)
    }

    fn subject(&self) -> String {
        if self.hit_id.is_empty() || self.hit_id.starts_with(GENERIC_HIT_ID) {
            first_word(&self.hit_def)
        } else {
            self.hit_id.clone()
        }
    }

    fn field(&self, name: &str) -> Result<&str> {
        self.hsp
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| Error::parse(self.count, format!("Hsp without {}", name)))
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let value = self.field(name)?;
        value
            .parse::<T>()
            .map_err(|_| Error::parse(self.count, format!("Invalid {}: {}", name, value)))
    }

    fn optional<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.hsp.contains_key(name) {
            true => self.number(name).map(Some),
            false => Ok(None),
        }
    }

    fn build_hit(&self) -> Result<Hit> {
        Ok(Hit {
            query: self.query.clone(),
            subject: self.subject(),
            query_start: self.number("Hsp_query-from")?,
            query_end: self.number("Hsp_query-to")?,
            subject_start: self.number("Hsp_hit-from")?,
            subject_end: self.number("Hsp_hit-to")?,
            e_value: self
                .field("Hsp_evalue")?
                .parse()
                .map_err(|e: Error| e.at_record(self.count))?,
            bit_score: self.number("Hsp_bit-score")?,
            alignment_length: self.optional("Hsp_align-len")?,
            identities: self.optional("Hsp_identity")?,
            positives: self.optional("Hsp_positive")?,
            gaps: self.optional("Hsp_gaps")?,
            query_frame: self.optional("Hsp_query-frame")?,
            subject_frame: self.optional("Hsp_hit-frame")?,
            query_seq: self.hsp.get("Hsp_qseq").cloned(),
            subject_seq: self.hsp.get("Hsp_hseq").cloned(),
            midline: self.hsp.get("Hsp_midline").cloned(),
            ..Default::default()
        })
    }
}

impl<R: BufRead> Iterator for XmlHits<R> {
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let tag = match self.next_tag() {
                Ok(tag) => tag,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match tag {
                Tag::Open(name) => {
                    match name.as_str() {
                        "Iteration" => self.query = self.report_query.clone(),
                        "Hit" => {
                            self.hit_id.clear();
                            self.hit_def.clear();
                        }
                        "Hsp" => self.hsp.clear(),
                        _ => {}
                    }
                    self.text.clear();
                }
                Tag::Text(text) => self.text.push_str(&text),
                Tag::Close(name) => {
                    let text = std::mem::take(&mut self.text);
                    match name.as_str() {
                        "Hsp" => {
                            self.count += 1;
                            let hit = self.build_hit();
                            if hit.is_err() {
                                self.done = true;
                            }
                            return Some(hit);
                        }
                        // single-query reports from legacy blastall
                        "BlastOutput_query-def" => {
                            self.report_query = first_word(&text);
                            self.query = self.report_query.clone();
                        }
                        "Iteration_query-def" if !text.trim().is_empty() => {
                            self.query = first_word(&text)
                        }
                        "Iteration_query-ID" if self.query.is_empty() => self.query = text,
                        "Hit_id" => self.hit_id = text,
                        "Hit_def" => self.hit_def = text,
                        n if n.starts_with("Hsp_") => {
                            self.hsp.insert(n.to_string(), text);
                        }
                        _ => {}
                    }
                }
                Tag::Eof => {
                    self.done = true;
                    return None;
                }
                Tag::Other => {}
            }
        }
    }
}

fn first_word(s: &str) -> String {
    s.split_whitespace().next().unwrap_or_default().to_string()
}
