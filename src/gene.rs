use std::cmp::Ordering;

use tracing::warn;

use crate::{
    interval,
    record::{AttributeNotFound, FeatureLevel, GffRecord, Strand},
    transcript::{self, Transcript},
    Interval,
};

/// How conflicting strands within a gene are handled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StrandPolicy {
    /// Fail on a conflicting strand.
    #[default]
    Strict,
    /// Warn on a conflicting strand and mark the gene strand as inconsistent.
    Lenient,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GeneStrand {
    Forward,
    Reverse,
    Inconsistent,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("strand inconsistency from record: {0}")]
    StrandConflict(String),
    #[error("gene already has a gene record: {0}")]
    DuplicateGeneRecord(String),
    #[error("gene ID of record is not {expected}: {record}")]
    GeneIdMismatch { expected: String, record: String },
    #[error("unrecognized feature: {0}")]
    UnrecognizedFeature(String),
    #[error("conflicting seqnames for gene: {}", .0.join(", "))]
    SeqnameConflict(Vec<String>),
    /// The gene has neither a gene record nor transcripts to take coordinates from.
    ///
    /// A gene is always created from a record, so this only guards against misuse of the type.
    #[error("cannot resolve coordinates for gene {0}")]
    CoordinateResolutionFailure(String),
    #[error(transparent)]
    MissingAttribute(#[from] AttributeNotFound),
    #[error(transparent)]
    Transcript(#[from] transcript::Error),
}

/// A gene model: an optional gene-level record and the transcripts sharing its gene ID.
///
/// Transcripts are kept in the order they are first seen.
#[derive(Clone, Debug, PartialEq)]
pub struct Gene {
    id: Option<String>,
    transcripts: Vec<Transcript>,
    record: Option<GffRecord>,
    strand: Option<GeneStrand>,
    coords: Interval,
    seqname: String,
}

impl Gene {
    pub fn new(record: GffRecord, policy: StrandPolicy) -> Result<Self, Error> {
        let mut gene = Self {
            id: None,
            transcripts: Vec::new(),
            record: None,
            strand: None,
            coords: record.coords(),
            seqname: record.seqname().into(),
        };

        gene.add_gff_record(record, policy)?;

        Ok(gene)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.transcripts.iter().find(|t| t.id() == id)
    }

    pub fn record(&self) -> Option<&GffRecord> {
        self.record.as_ref()
    }

    pub fn strand(&self) -> Option<GeneStrand> {
        self.strand
    }

    pub fn coords(&self) -> Interval {
        self.coords
    }

    pub fn seqname(&self) -> &str {
        &self.seqname
    }

    /// Adds a record to the gene or to one of its transcripts.
    ///
    /// On error, the gene may be partially updated and should be discarded.
    pub fn add_gff_record(&mut self, record: GffRecord, policy: StrandPolicy) -> Result<(), Error> {
        self.update_strand(&record, policy)?;

        match record.level() {
            Some(FeatureLevel::Gene) => {
                if self.record.is_some() {
                    return Err(Error::DuplicateGeneRecord(record.to_string()));
                }

                let key = if record.is_gtf() { "gene_id" } else { "ID" };
                let gene_id = record.get_attribute(key)?.to_string();
                self.set_id(gene_id, &record)?;
                self.record = Some(record);
            }
            Some(FeatureLevel::Transcript) => {
                let (transcript_key, gene_key) = if record.is_gtf() {
                    ("transcript_id", "gene_id")
                } else {
                    ("ID", "Parent")
                };

                let transcript_id = record.get_attribute(transcript_key)?.to_string();
                let gene_id = record.get_attribute(gene_key)?.to_string();
                self.set_id(gene_id, &record)?;
                self.add_to_transcript(transcript_id, record)?;
            }
            Some(FeatureLevel::SubFeature) => {
                let key = if record.is_gtf() {
                    "transcript_id"
                } else if record.feature() == "polypeptide" {
                    "Derives_from"
                } else {
                    "Parent"
                };

                // A sub-feature shared by several transcripts is added to each.
                let transcript_ids = record.get_attribute_values(key)?.to_vec();

                if let Some((last, rest)) = transcript_ids.split_last() {
                    for transcript_id in rest {
                        self.add_to_transcript(transcript_id.clone(), record.clone())?;
                    }

                    self.add_to_transcript(last.clone(), record)?;
                }
            }
            None => return Err(Error::UnrecognizedFeature(record.to_string())),
        }

        self.update_coords()?;
        self.update_seqname()
    }

    /// Returns the ID of the transcript with the greatest total exon length.
    ///
    /// The first transcript wins a tie.
    pub fn longest_transcript_by_exon_length(&self) -> Option<&str> {
        let mut longest: Option<(&Transcript, usize)> = None;

        for transcript in &self.transcripts {
            let len = transcript.total_exon_length();

            if longest.map_or(true, |(_, max_len)| len > max_len) {
                longest = Some((transcript, len));
            }
        }

        longest.map(|(transcript, _)| transcript.id())
    }

    pub fn remove_all_but_longest_transcript(&mut self) {
        let Some(longest) = self.longest_transcript_by_exon_length().map(String::from) else {
            return;
        };

        self.transcripts.retain(|t| t.id() == longest);
        self.refresh_coords();
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.seqname == other.seqname && self.coords.intersects(&other.coords)
    }

    /// Returns whether any transcript of `other` can extend the start or end of any transcript
    /// of this gene by at least `min_extend` bases.
    pub fn can_extend(&self, other: &Self, min_extend: usize) -> bool {
        if self.seqname != other.seqname {
            return false;
        }

        self.transcripts.iter().any(|t| {
            other.transcripts.iter().any(|u| {
                t.can_extend_start(u, min_extend) || t.can_extend_end(u, min_extend)
            })
        })
    }

    /// Extends the UTRs of each transcript using the transcript of `other` sharing the most
    /// splice sites with it.
    ///
    /// Nothing changes unless `other` can extend this gene by at least one base and reaches at
    /// least `min_extend` bases past its start or end. A transcript sharing no splice sites with
    /// any transcript of `other` is still matched, to the first one.
    pub fn extend(&mut self, other: &Self, min_extend: usize, exclude_coords: &[Interval]) {
        let start_delta_too_small = usize::from(self.coords.start())
            < usize::from(other.coords.start()).saturating_add(min_extend);
        let end_delta_too_small = usize::from(other.coords.end())
            < usize::from(self.coords.end()).saturating_add(min_extend);

        if !self.can_extend(other, 1) || (start_delta_too_small && end_delta_too_small) {
            return;
        }

        for t in &mut self.transcripts {
            let mut best_match: Option<(&Transcript, usize)> = None;

            for u in &other.transcripts {
                let n = t.number_of_common_splice_sites(u);

                if best_match.map_or(true, |(_, max_n)| n > max_n) {
                    best_match = Some((u, n));
                }
            }

            if let Some((u, _)) = best_match {
                t.update_utrs(u, exclude_coords);
            }
        }

        self.refresh_coords();
    }

    /// Compares the positions of two genes on the same seqname.
    ///
    /// Genes on different seqnames are not comparable.
    pub fn position_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.seqname == other.seqname {
            Some(self.coords.cmp(&other.coords))
        } else {
            None
        }
    }

    pub fn is_before(&self, other: &Self) -> bool {
        self.position_cmp(other) == Some(Ordering::Less)
    }

    /// Returns the gene record followed by the records of each transcript.
    ///
    /// A sub-feature with several parents is listed once unless an extension changed one of its
    /// copies.
    pub fn to_gff_list(&self) -> Vec<GffRecord> {
        let mut records: Vec<_> = self.record.iter().cloned().collect();

        for transcript in &self.transcripts {
            for record in transcript.to_gff_list() {
                if has_multiple_parents(&record) && records.contains(&record) {
                    continue;
                }

                records.push(record);
            }
        }

        records
    }

    fn update_strand(&mut self, record: &GffRecord, policy: StrandPolicy) -> Result<(), Error> {
        let strand = match record.strand() {
            Strand::Forward => GeneStrand::Forward,
            Strand::Reverse => GeneStrand::Reverse,
            _ => return Ok(()),
        };

        match self.strand {
            None => self.strand = Some(strand),
            Some(s) if s == strand => {}
            Some(_) => match policy {
                StrandPolicy::Strict => return Err(Error::StrandConflict(record.to_string())),
                StrandPolicy::Lenient => {
                    warn!("strand inconsistency from record: {record}");
                    self.strand = Some(GeneStrand::Inconsistent);
                }
            },
        }

        Ok(())
    }

    fn set_id(&mut self, gene_id: String, record: &GffRecord) -> Result<(), Error> {
        match &self.id {
            None => self.id = Some(gene_id),
            Some(id) if *id == gene_id => {}
            Some(id) => {
                return Err(Error::GeneIdMismatch {
                    expected: id.clone(),
                    record: record.to_string(),
                })
            }
        }

        Ok(())
    }

    fn add_to_transcript(&mut self, transcript_id: String, record: GffRecord) -> Result<(), Error> {
        match self.transcripts.iter_mut().find(|t| t.id() == transcript_id) {
            Some(transcript) => transcript.add_gff_record(record)?,
            None => self
                .transcripts
                .push(Transcript::new(transcript_id, record)?),
        }

        Ok(())
    }

    fn bounding_coords(&self) -> Option<Interval> {
        interval::bounding(self.transcripts.iter().map(|t| t.coords()))
            .or_else(|| self.record.as_ref().map(|record| record.coords()))
    }

    fn update_coords(&mut self) -> Result<(), Error> {
        if self.bounding_coords().is_none() {
            let id = self.id.clone().unwrap_or_default();
            return Err(Error::CoordinateResolutionFailure(id));
        }

        self.refresh_coords();

        Ok(())
    }

    fn refresh_coords(&mut self) {
        if let Some(coords) = self.bounding_coords() {
            self.coords = coords;

            if let Some(record) = self.record.as_mut() {
                record.set_coords(coords);
            }
        }
    }

    fn update_seqname(&mut self) -> Result<(), Error> {
        let mut names: Vec<&str> = self.transcripts.iter().map(|t| t.seqname()).collect();
        names.sort_unstable();
        names.dedup();

        let name = match (names.as_slice(), &self.record) {
            ([name], _) => (*name).to_string(),
            (_, Some(record)) => record.seqname().to_string(),
            _ => {
                return Err(Error::SeqnameConflict(
                    names.iter().map(|name| name.to_string()).collect(),
                ))
            }
        };

        if name != self.seqname {
            return Err(Error::SeqnameConflict(vec![self.seqname.clone(), name]));
        }

        Ok(())
    }
}

fn has_multiple_parents(record: &GffRecord) -> bool {
    record
        .get_attribute_values("Parent")
        .map_or(false, |parents| parents.len() > 1)
}
