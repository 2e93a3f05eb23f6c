use std::fmt;

use bstr::BString;
use noodles::gff::feature::{
    record::Phase,
    record_buf::{
        attributes::field::{Tag, Value},
        Attributes,
    },
    RecordBuf,
};

use crate::{writer::write_record, Interval};

/// Feature strand of a record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Strand {
    /// `+`
    Forward,
    /// `-`
    Reverse,
    /// `.`
    None,
    /// `?`
    Unknown,
}

impl Strand {
    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Forward | Self::Reverse)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "+",
            Self::Reverse => "-",
            Self::None => ".",
            Self::Unknown => "?",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Strand> for noodles::gff::feature::record::Strand {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => Self::Forward,
            Strand::Reverse => Self::Reverse,
            Strand::None => Self::None,
            Strand::Unknown => Self::Unknown,
        }
    }
}

impl From<noodles::gff::feature::record::Strand> for Strand {
    fn from(strand: noodles::gff::feature::record::Strand) -> Self {
        use noodles::gff::feature::record::Strand as GffStrand;

        match strand {
            GffStrand::Forward => Self::Forward,
            GffStrand::Reverse => Self::Reverse,
            GffStrand::None => Self::None,
            GffStrand::Unknown => Self::Unknown,
        }
    }
}

/// Position of a feature type in the gene/transcript/sub-feature hierarchy.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum FeatureLevel {
    Gene,
    Transcript,
    SubFeature,
}

impl FeatureLevel {
    pub fn classify(feature: &str) -> Option<Self> {
        match feature {
            "gene" | "pseudogene" => Some(Self::Gene),
            "mRNA" | "ncRNA" | "rRNA" | "snRNA" | "tRNA" | "transcript"
            | "pseudogenic_transcript" => Some(Self::Transcript),
            "five_prime_UTR" | "three_prime_UTR" | "CDS" | "exon" | "pseudogenic_exon"
            | "polypeptide" => Some(Self::SubFeature),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("attribute not found: {0}")]
pub struct AttributeNotFound(pub String);

/// A single GFF3 or GTF feature line.
///
/// Attribute values are kept as lists; a GFF3 value such as `Parent=t0,t1` has two entries.
#[derive(Clone, Debug, PartialEq)]
pub struct GffRecord {
    seqname: String,
    source: String,
    feature: String,
    coords: Interval,
    score: Option<f32>,
    strand: Strand,
    phase: Option<Phase>,
    attributes: Vec<(String, Vec<String>)>,
    is_gtf: bool,
}

impl GffRecord {
    pub fn new<S, F>(seqname: S, feature: F, coords: Interval, strand: Strand) -> Self
    where
        S: Into<String>,
        F: Into<String>,
    {
        Self {
            seqname: seqname.into(),
            source: String::from("."),
            feature: feature.into(),
            coords,
            score: None,
            strand,
            phase: None,
            attributes: Vec::new(),
            is_gtf: false,
        }
    }

    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: Into<String>,
    {
        self.source = source.into();
        self
    }

    pub fn with_score(mut self, score: Option<f32>) -> Self {
        self.score = score;
        self
    }

    pub fn with_phase(mut self, phase: Option<Phase>) -> Self {
        self.phase = phase;
        self
    }

    /// Appends single-valued attributes.
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.extend(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), vec![v.into()])),
        );

        self
    }

    pub fn with_attribute_values<K, I, V>(mut self, key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = values.into_iter().map(|v| v.into()).collect();
        self.attributes.push((key.into(), values));
        self
    }

    pub fn with_gtf(mut self, is_gtf: bool) -> Self {
        self.is_gtf = is_gtf;
        self
    }

    pub fn seqname(&self) -> &str {
        &self.seqname
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn level(&self) -> Option<FeatureLevel> {
        FeatureLevel::classify(&self.feature)
    }

    pub fn coords(&self) -> Interval {
        self.coords
    }

    pub fn score(&self) -> Option<f32> {
        self.score
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn attributes(&self) -> &[(String, Vec<String>)] {
        &self.attributes
    }

    pub fn is_gtf(&self) -> bool {
        self.is_gtf
    }

    /// Returns the first value of an attribute.
    pub fn get_attribute(&self, key: &str) -> Result<&str, AttributeNotFound> {
        self.get_attribute_values(key)?
            .first()
            .map(|v| v.as_str())
            .ok_or_else(|| AttributeNotFound(key.into()))
    }

    pub fn get_attribute_values(&self, key: &str) -> Result<&[String], AttributeNotFound> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| AttributeNotFound(key.into()))
    }

    pub fn to_record_buf(&self) -> RecordBuf {
        let attributes: Attributes = self
            .attributes
            .iter()
            .map(|(key, values)| {
                let value = match values.as_slice() {
                    [value] => Value::from(value.as_str()),
                    _ => Value::from(
                        values
                            .iter()
                            .map(|v| BString::from(v.as_str()))
                            .collect::<Vec<_>>(),
                    ),
                };

                (Tag::from(key.as_str()), value)
            })
            .collect();

        let mut builder = RecordBuf::builder()
            .set_reference_sequence_name(self.seqname.as_str())
            .set_source(self.source.as_str())
            .set_type(self.feature.as_str())
            .set_start(self.coords.start())
            .set_end(self.coords.end())
            .set_strand(self.strand.into())
            .set_attributes(attributes);

        if let Some(score) = self.score {
            builder = builder.set_score(score);
        }

        if let Some(phase) = self.phase {
            builder = builder.set_phase(phase);
        }

        builder.build()
    }

    pub(crate) fn set_feature<F>(&mut self, feature: F)
    where
        F: Into<String>,
    {
        self.feature = feature.into();
    }

    pub(crate) fn set_coords(&mut self, coords: Interval) {
        self.coords = coords;
    }

    pub(crate) fn set_phase(&mut self, phase: Option<Phase>) {
        self.phase = phase;
    }

    pub(crate) fn remove_attribute(&mut self, key: &str) {
        self.attributes.retain(|(k, _)| k != key);
    }
}

impl fmt::Display for GffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();

        match write_record(&mut buf, self) {
            Ok(()) => f.write_str(String::from_utf8_lossy(&buf).trim_end_matches('\n')),
            // e.g., a GFF3 CDS without a phase
            Err(_) => write!(
                f,
                "{}:{} {} ({})",
                self.seqname, self.coords, self.feature, self.strand
            ),
        }
    }
}
