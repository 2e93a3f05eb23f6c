use std::{cmp::Ordering, collections::HashSet};

use noodles::core::Position;

use crate::{
    interval,
    record::{FeatureLevel, GffRecord, Strand},
    Interval,
};

/// An exon boundary adjacent to an intron.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SpliceSite {
    /// The last base of an exon followed by an intron.
    ExonEnd(Position),
    /// The first base of an exon preceded by an intron.
    ExonStart(Position),
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("transcript already has a transcript record: {0}")]
    DuplicateTranscriptRecord(String),
    #[error("seqname mismatch: expected {expected}, got {actual}")]
    SeqnameMismatch { expected: String, actual: String },
    #[error("unexpected feature for a transcript: {0}")]
    UnexpectedFeature(String),
}

#[derive(Clone, Copy)]
enum Side {
    Start,
    End,
}

/// The records of a single transcript: an optional transcript-level record and its exons, CDSs,
/// UTRs and polypeptides.
///
/// Sub-features are kept sorted by coordinates, so the result does not depend on the order
/// records are added in.
#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
    id: String,
    seqname: String,
    strand: Strand,
    coords: Interval,
    record: Option<GffRecord>,
    features: Vec<GffRecord>,
}

impl Transcript {
    pub fn new<I>(id: I, record: GffRecord) -> Result<Self, Error>
    where
        I: Into<String>,
    {
        let mut transcript = Self {
            id: id.into(),
            seqname: record.seqname().into(),
            strand: Strand::None,
            coords: record.coords(),
            record: None,
            features: Vec::new(),
        };

        transcript.add_gff_record(record)?;

        Ok(transcript)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn seqname(&self) -> &str {
        &self.seqname
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn coords(&self) -> Interval {
        self.coords
    }

    pub fn record(&self) -> Option<&GffRecord> {
        self.record.as_ref()
    }

    pub fn features(&self) -> &[GffRecord] {
        &self.features
    }

    pub fn add_gff_record(&mut self, record: GffRecord) -> Result<(), Error> {
        if record.seqname() != self.seqname {
            return Err(Error::SeqnameMismatch {
                expected: self.seqname.clone(),
                actual: record.seqname().into(),
            });
        }

        match record.level() {
            Some(FeatureLevel::Transcript) => {
                if self.record.is_some() {
                    return Err(Error::DuplicateTranscriptRecord(record.to_string()));
                }

                self.set_strand(record.strand());
                self.record = Some(record);
            }
            Some(FeatureLevel::SubFeature) => {
                self.set_strand(record.strand());
                self.insert_feature(record);
            }
            _ => return Err(Error::UnexpectedFeature(record.to_string())),
        }

        self.update_coords();

        Ok(())
    }

    /// Returns the exons as merged, sorted intervals.
    ///
    /// Exon records are used when present. Otherwise, exons are built from the CDS and UTR
    /// records. A transcript with neither is a single exon spanning its coordinates.
    pub fn exons(&self) -> Vec<Interval> {
        let exons: Vec<_> = self
            .features
            .iter()
            .filter(|record| is_exon(record.feature()))
            .map(|record| record.coords())
            .collect();

        if !exons.is_empty() {
            return interval::merge(&exons);
        }

        let pieces: Vec<_> = self
            .features
            .iter()
            .filter(|record| record.feature() == "CDS" || is_utr(record.feature()))
            .map(|record| record.coords())
            .collect();

        if pieces.is_empty() {
            vec![self.coords]
        } else {
            interval::merge(&pieces)
        }
    }

    pub fn total_exon_length(&self) -> usize {
        self.exons().iter().map(|exon| exon.len()).sum()
    }

    pub fn splice_sites(&self) -> Vec<SpliceSite> {
        let exons = self.exons();
        let mut sites = Vec::with_capacity(2 * exons.len().saturating_sub(1));

        for pair in exons.windows(2) {
            sites.push(SpliceSite::ExonEnd(pair[0].end()));
            sites.push(SpliceSite::ExonStart(pair[1].start()));
        }

        sites
    }

    pub fn number_of_common_splice_sites(&self, other: &Self) -> usize {
        if self.seqname != other.seqname {
            return 0;
        }

        let sites: HashSet<_> = self.splice_sites().into_iter().collect();

        other
            .splice_sites()
            .into_iter()
            .collect::<HashSet<_>>()
            .intersection(&sites)
            .count()
    }

    /// Returns whether an exon of `other` overlaps the first exon and starts at least
    /// `min_extend` bases before it.
    pub fn can_extend_start(&self, other: &Self, min_extend: usize) -> bool {
        self.extended_start(other, min_extend).is_some()
    }

    /// Returns whether an exon of `other` overlaps the last exon and ends at least `min_extend`
    /// bases after it.
    pub fn can_extend_end(&self, other: &Self, min_extend: usize) -> bool {
        self.extended_end(other, min_extend).is_some()
    }

    /// Widens the terminal exons and UTRs to the boundaries of `other`.
    ///
    /// A newly covered range never intersects an interval in `exclude_coords`; the new boundary
    /// is pulled back to the nearest excluded interval instead.
    pub fn update_utrs(&mut self, other: &Self, exclude_coords: &[Interval]) {
        let start = self
            .extended_start(other, 1)
            .map(|start| clamp_start(start, self.coords.start(), exclude_coords))
            .filter(|&start| start < self.coords.start());

        let end = self
            .extended_end(other, 1)
            .map(|end| clamp_end(end, self.coords.end(), exclude_coords))
            .filter(|&end| end > self.coords.end());

        if let Some(start) = start {
            self.extend_to(Side::Start, start);
        }

        if let Some(end) = end {
            self.extend_to(Side::End, end);
        }

        self.features.sort_by(cmp_records);
        self.update_coords();
    }

    pub fn to_gff_list(&self) -> Vec<GffRecord> {
        self.record
            .iter()
            .chain(self.features.iter())
            .cloned()
            .collect()
    }

    fn set_strand(&mut self, strand: Strand) {
        if !self.strand.is_defined() && strand.is_defined() {
            self.strand = strand;
        }
    }

    fn insert_feature(&mut self, record: GffRecord) {
        let i = self
            .features
            .partition_point(|r| cmp_records(r, &record) != Ordering::Greater);

        self.features.insert(i, record);
    }

    fn update_coords(&mut self) {
        let coords = interval::bounding(self.features.iter().map(|record| record.coords()))
            .or_else(|| self.record.as_ref().map(|record| record.coords()));

        if let Some(coords) = coords {
            self.coords = coords;
        }

        if let Some(record) = self.record.as_mut() {
            record.set_coords(self.coords);
        }
    }

    fn is_compatible(&self, other: &Self) -> bool {
        self.seqname == other.seqname
            && !(self.strand.is_defined()
                && other.strand.is_defined()
                && self.strand != other.strand)
    }

    fn extended_start(&self, other: &Self, min_extend: usize) -> Option<Position> {
        if !self.is_compatible(other) {
            return None;
        }

        let first = *self.exons().first()?;

        other
            .exons()
            .into_iter()
            .filter(|exon| {
                exon.intersects(&first)
                    && usize::from(exon.start()).saturating_add(min_extend)
                        <= usize::from(first.start())
            })
            .map(|exon| exon.start())
            .min()
    }

    fn extended_end(&self, other: &Self, min_extend: usize) -> Option<Position> {
        if !self.is_compatible(other) {
            return None;
        }

        let last = *self.exons().last()?;

        other
            .exons()
            .into_iter()
            .filter(|exon| {
                exon.intersects(&last)
                    && usize::from(exon.end()) >= usize::from(last.end()).saturating_add(min_extend)
            })
            .map(|exon| exon.end())
            .max()
    }

    fn utr_feature(&self, side: Side) -> Option<&'static str> {
        match (side, self.strand) {
            (Side::Start, Strand::Forward) | (Side::End, Strand::Reverse) => {
                Some("five_prime_UTR")
            }
            (Side::Start, Strand::Reverse) | (Side::End, Strand::Forward) => {
                Some("three_prime_UTR")
            }
            _ => None,
        }
    }

    fn extend_to(&mut self, side: Side, position: Position) {
        let boundary = match side {
            Side::Start => self.coords.start(),
            Side::End => self.coords.end(),
        };

        let widen = |coords: Interval| match side {
            Side::Start => coords.with_start(position),
            Side::End => coords.with_end(position),
        };

        let on_boundary = |coords: Interval| match side {
            Side::Start => coords.start() == boundary,
            Side::End => coords.end() == boundary,
        };

        if self.features.is_empty() {
            if let Some(record) = self.record.as_mut() {
                record.set_coords(widen(record.coords()));
            }

            return;
        }

        let utr_feature = self.utr_feature(side);
        let mut has_utr = false;
        let mut cds = None;

        for record in &mut self.features {
            if !on_boundary(record.coords()) {
                continue;
            }

            let feature = record.feature();

            if is_exon(feature) {
                record.set_coords(widen(record.coords()));
            } else if is_utr(feature) {
                record.set_coords(widen(record.coords()));
                has_utr = true;
            } else if feature == "CDS" && cds.is_none() {
                cds = Some(record.clone());
            }
        }

        if has_utr {
            return;
        }

        if let (Some(mut utr), Some(feature)) = (cds, utr_feature) {
            let coords = match side {
                Side::Start => Position::new(usize::from(boundary) - 1)
                    .and_then(|end| Interval::new(position, end).ok()),
                Side::End => boundary
                    .checked_add(1)
                    .and_then(|start| Interval::new(start, position).ok()),
            };

            if let Some(coords) = coords {
                utr.set_feature(feature);
                utr.set_coords(coords);
                utr.set_phase(None);
                utr.remove_attribute("ID");
                utr.remove_attribute("Name");
                self.insert_feature(utr);
            }
        }
    }
}

fn is_exon(feature: &str) -> bool {
    feature == "exon" || feature == "pseudogenic_exon"
}

fn is_utr(feature: &str) -> bool {
    feature == "five_prime_UTR" || feature == "three_prime_UTR"
}

fn cmp_records(a: &GffRecord, b: &GffRecord) -> Ordering {
    a.coords()
        .cmp(&b.coords())
        .then_with(|| a.feature().cmp(b.feature()))
}

// Moves a new start forward past any excluded interval in the newly covered range, i.e.,
// [start, boundary - 1].
fn clamp_start(start: Position, boundary: Position, exclude_coords: &[Interval]) -> Position {
    let mut start = start;

    for excluded in exclude_coords {
        if excluded.start() < boundary && excluded.end() >= start {
            start = if excluded.end() < boundary {
                excluded
                    .end()
                    .checked_add(1)
                    .map_or(boundary, |p| p.max(start))
            } else {
                boundary
            };
        }
    }

    start
}

// Moves a new end back before any excluded interval in the newly covered range, i.e.,
// [boundary + 1, end].
fn clamp_end(end: Position, boundary: Position, exclude_coords: &[Interval]) -> Position {
    let mut end = end;

    for excluded in exclude_coords {
        if excluded.end() > boundary && excluded.start() <= end {
            end = if excluded.start() > boundary {
                Position::new(usize::from(excluded.start()) - 1).map_or(boundary, |p| p.min(end))
            } else {
                boundary
            };
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::build;

    fn build_record(feature: &str, start: usize, end: usize, strand: Strand) -> GffRecord {
        GffRecord::new("sq0", feature, build(start, end), strand).with_attributes([("Parent", "t0")])
    }

    fn build_transcript(
        features: &[(&str, usize, usize)],
        strand: Strand,
    ) -> Result<Transcript, Error> {
        let mut records = features
            .iter()
            .map(|&(feature, start, end)| build_record(feature, start, end, strand));

        let first = records.next().expect("missing features");
        let mut transcript = Transcript::new("t0", first)?;

        for record in records {
            transcript.add_gff_record(record)?;
        }

        Ok(transcript)
    }

    fn feature_coords(transcript: &Transcript) -> Vec<(String, Interval)> {
        transcript
            .features()
            .iter()
            .map(|record| (record.feature().into(), record.coords()))
            .collect()
    }

    #[test]
    fn test_add_gff_record() -> Result<(), Error> {
        let mut transcript = Transcript::new(
            "t0",
            GffRecord::new("sq0", "mRNA", build(100, 400), Strand::Forward)
                .with_attributes([("ID", "t0"), ("Parent", "g0")]),
        )?;

        assert_eq!(transcript.coords(), build(100, 400));
        assert_eq!(transcript.strand(), Strand::Forward);

        transcript.add_gff_record(build_record("exon", 300, 420, Strand::Forward))?;
        transcript.add_gff_record(build_record("exon", 110, 200, Strand::Forward))?;

        assert_eq!(transcript.coords(), build(110, 420));
        assert_eq!(
            transcript.record().map(|record| record.coords()),
            Some(build(110, 420))
        );
        assert_eq!(transcript.exons(), [build(110, 200), build(300, 420)]);

        assert!(matches!(
            transcript.add_gff_record(GffRecord::new(
                "sq0",
                "mRNA",
                build(100, 400),
                Strand::Forward
            )),
            Err(Error::DuplicateTranscriptRecord(_))
        ));

        assert!(matches!(
            transcript.add_gff_record(GffRecord::new(
                "sq0",
                "gene",
                build(100, 400),
                Strand::Forward
            )),
            Err(Error::UnexpectedFeature(_))
        ));

        assert_eq!(
            transcript.add_gff_record(GffRecord::new(
                "sq1",
                "exon",
                build(100, 400),
                Strand::Forward
            )),
            Err(Error::SeqnameMismatch {
                expected: String::from("sq0"),
                actual: String::from("sq1"),
            })
        );

        Ok(())
    }

    #[test]
    fn test_add_gff_record_is_order_independent() -> Result<(), Error> {
        let features = [
            ("exon", 100, 200),
            ("CDS", 150, 200),
            ("five_prime_UTR", 100, 149),
            ("exon", 300, 400),
            ("CDS", 300, 350),
            ("three_prime_UTR", 351, 400),
        ];

        let expected = build_transcript(&features, Strand::Forward)?;

        let mut reversed = features;
        reversed.reverse();
        let actual = build_transcript(&reversed, Strand::Forward)?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn test_exons() -> Result<(), Error> {
        let transcript = build_transcript(
            &[
                ("five_prime_UTR", 100, 149),
                ("CDS", 150, 200),
                ("CDS", 300, 350),
                ("three_prime_UTR", 351, 400),
            ],
            Strand::Forward,
        )?;

        assert_eq!(transcript.exons(), [build(100, 200), build(300, 400)]);
        assert_eq!(transcript.total_exon_length(), 202);

        let transcript = Transcript::new(
            "t0",
            GffRecord::new("sq0", "ncRNA", build(10, 19), Strand::Reverse),
        )?;

        assert_eq!(transcript.exons(), [build(10, 19)]);
        assert_eq!(transcript.total_exon_length(), 10);

        Ok(())
    }

    #[test]
    fn test_splice_sites() -> Result<(), Box<dyn std::error::Error>> {
        let transcript = build_transcript(
            &[("exon", 100, 200), ("exon", 300, 400), ("exon", 500, 600)],
            Strand::Forward,
        )?;

        assert_eq!(
            transcript.splice_sites(),
            [
                SpliceSite::ExonEnd(Position::try_from(200)?),
                SpliceSite::ExonStart(Position::try_from(300)?),
                SpliceSite::ExonEnd(Position::try_from(400)?),
                SpliceSite::ExonStart(Position::try_from(500)?),
            ]
        );

        let transcript = build_transcript(&[("exon", 100, 200)], Strand::Forward)?;
        assert!(transcript.splice_sites().is_empty());

        Ok(())
    }

    #[test]
    fn test_number_of_common_splice_sites() -> Result<(), Error> {
        let t1 = build_transcript(&[("exon", 100, 200), ("exon", 300, 400)], Strand::Forward)?;
        let t2 = build_transcript(&[("exon", 90, 210), ("exon", 300, 410)], Strand::Forward)?;
        let t3 = build_transcript(&[("exon", 90, 200), ("exon", 300, 410)], Strand::Forward)?;
        let t4 = build_transcript(&[("exon", 100, 400)], Strand::Forward)?;

        assert_eq!(t1.number_of_common_splice_sites(&t2), 1);
        assert_eq!(t2.number_of_common_splice_sites(&t1), 1);
        assert_eq!(t1.number_of_common_splice_sites(&t3), 2);
        assert_eq!(t1.number_of_common_splice_sites(&t4), 0);

        // An exon start never matches an exon end at the same position.
        let t5 = build_transcript(&[("exon", 50, 99), ("exon", 200, 250)], Strand::Forward)?;
        assert_eq!(t1.number_of_common_splice_sites(&t5), 0);

        Ok(())
    }

    #[test]
    fn test_can_extend() -> Result<(), Error> {
        let t1 = build_transcript(&[("exon", 100, 200), ("exon", 300, 400)], Strand::Forward)?;
        let t2 = build_transcript(&[("exon", 90, 210), ("exon", 300, 410)], Strand::Forward)?;

        assert!(t1.can_extend_start(&t2, 1));
        assert!(t1.can_extend_start(&t2, 10));
        assert!(!t1.can_extend_start(&t2, 11));
        assert!(t1.can_extend_end(&t2, 10));
        assert!(!t1.can_extend_end(&t2, 11));

        assert!(!t2.can_extend_start(&t1, 1));
        assert!(!t2.can_extend_end(&t1, 1));

        let reverse = build_transcript(&[("exon", 90, 210), ("exon", 300, 410)], Strand::Reverse)?;
        assert!(!t1.can_extend_start(&reverse, 1));
        assert!(!t1.can_extend_end(&reverse, 1));

        // The extending exon must overlap the terminal exon.
        let upstream = build_transcript(&[("exon", 10, 50), ("exon", 150, 410)], Strand::Forward)?;
        assert!(!t1.can_extend_start(&upstream, 1));
        assert!(t1.can_extend_end(&upstream, 1));

        assert!(!t1.can_extend_start(&t2, usize::MAX));
        assert!(!t1.can_extend_end(&t2, usize::MAX));

        Ok(())
    }

    #[test]
    fn test_update_utrs() -> Result<(), Error> {
        let mut t1 = build_transcript(
            &[
                ("exon", 100, 200),
                ("five_prime_UTR", 100, 149),
                ("CDS", 150, 200),
                ("exon", 300, 400),
                ("CDS", 300, 350),
                ("three_prime_UTR", 351, 400),
            ],
            Strand::Forward,
        )?;
        let t2 = build_transcript(&[("exon", 90, 210), ("exon", 300, 410)], Strand::Forward)?;

        t1.update_utrs(&t2, &[]);

        assert_eq!(t1.coords(), build(90, 410));
        assert_eq!(
            feature_coords(&t1),
            [
                (String::from("five_prime_UTR"), build(90, 149)),
                (String::from("exon"), build(90, 200)),
                (String::from("CDS"), build(150, 200)),
                (String::from("CDS"), build(300, 350)),
                (String::from("exon"), build(300, 410)),
                (String::from("three_prime_UTR"), build(351, 410)),
            ]
        );

        Ok(())
    }

    #[test]
    fn test_update_utrs_creates_missing_utrs() -> Result<(), Error> {
        let mut t1 = build_transcript(
            &[
                ("exon", 100, 200),
                ("CDS", 100, 200),
                ("exon", 300, 400),
                ("CDS", 300, 400),
            ],
            Strand::Reverse,
        )?;
        let t2 = build_transcript(&[("exon", 90, 210), ("exon", 300, 410)], Strand::Reverse)?;

        t1.update_utrs(&t2, &[]);

        assert_eq!(
            feature_coords(&t1),
            [
                (String::from("three_prime_UTR"), build(90, 99)),
                (String::from("exon"), build(90, 200)),
                (String::from("CDS"), build(100, 200)),
                (String::from("CDS"), build(300, 400)),
                (String::from("exon"), build(300, 410)),
                (String::from("five_prime_UTR"), build(401, 410)),
            ]
        );

        let utr = &t1.features()[0];
        assert_eq!(utr.phase(), None);
        assert_eq!(utr.get_attribute("Parent"), Ok("t0"));

        Ok(())
    }

    #[test]
    fn test_update_utrs_with_exclude_coords() -> Result<(), Error> {
        let t2 = build_transcript(&[("exon", 50, 210), ("exon", 300, 500)], Strand::Forward)?;

        let mut t1 = build_transcript(&[("exon", 100, 200), ("exon", 300, 400)], Strand::Forward)?;
        t1.update_utrs(&t2, &[build(60, 80), build(450, 470)]);
        assert_eq!(t1.exons(), [build(81, 200), build(300, 449)]);

        let mut t1 = build_transcript(&[("exon", 100, 200), ("exon", 300, 400)], Strand::Forward)?;
        t1.update_utrs(&t2, &[build(95, 105), build(1, 30)]);
        assert_eq!(t1.exons(), [build(100, 200), build(300, 500)]);

        Ok(())
    }

    #[test]
    fn test_update_utrs_without_sub_features() -> Result<(), Error> {
        let mut t1 = Transcript::new(
            "t0",
            GffRecord::new("sq0", "transcript", build(100, 200), Strand::None),
        )?;
        let t2 = build_transcript(&[("exon", 90, 250)], Strand::Forward)?;

        t1.update_utrs(&t2, &[]);

        assert_eq!(t1.coords(), build(90, 250));
        assert_eq!(
            t1.record().map(|record| record.coords()),
            Some(build(90, 250))
        );

        Ok(())
    }

    #[test]
    fn test_to_gff_list() -> Result<(), Error> {
        let mrna = GffRecord::new("sq0", "mRNA", build(100, 400), Strand::Forward)
            .with_attributes([("ID", "t0")]);
        let exon_1 = build_record("exon", 100, 200, Strand::Forward);
        let exon_2 = build_record("exon", 300, 400, Strand::Forward);

        let mut transcript = Transcript::new("t0", mrna.clone())?;
        transcript.add_gff_record(exon_1.clone())?;
        transcript.add_gff_record(exon_2.clone())?;

        assert_eq!(transcript.to_gff_list(), [mrna, exon_1, exon_2]);

        Ok(())
    }
}
