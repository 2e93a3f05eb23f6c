use std::{
    ffi::OsStr,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use flate2::read::MultiGzDecoder;
use noodles::{
    gff,
    gtf,
};

use crate::{GffRecord, Interval, Strand};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Gff3,
    Gtf,
}

impl Format {
    /// Detects the annotation format from a path extension, ignoring a trailing `.gz`.
    pub fn detect<P>(src: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = src.as_ref();

        let path = if path.extension() == Some(OsStr::new("gz")) {
            path.file_stem().map(Path::new).unwrap_or(path)
        } else {
            path
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gtf") => Ok(Self::Gtf),
            Some("gff" | "gff3") => Ok(Self::Gff3),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "unable to detect annotation format: {}",
                    src.as_ref().display()
                ),
            )),
        }
    }
}

fn open<P>(src: P) -> io::Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let extension = path.extension();
    let file = File::open(path)?;

    match extension.and_then(|ext| ext.to_str()) {
        Some("gz") => {
            let decoder = MultiGzDecoder::new(file);
            Ok(Box::new(BufReader::new(decoder)))
        }
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// Reads all feature records from a GFF3 or GTF file.
pub fn read_records<P>(src: P) -> io::Result<(Format, Vec<GffRecord>)>
where
    P: AsRef<Path>,
{
    let format = Format::detect(src.as_ref())?;
    let inner = open(src)?;

    let mut records = Vec::new();

    match format {
        Format::Gff3 => {
            let mut reader = gff::io::Reader::new(inner);

            for result in reader.record_bufs() {
                let record = result?;
                records.push(convert_record_buf(&record, false)?);
            }
        }
        Format::Gtf => {
            let mut reader = gtf::io::Reader::new(inner);

            for result in reader.record_bufs() {
                let record = result?;
                records.push(convert_record_buf(&record, true)?);
            }
        }
    }

    Ok((format, records))
}

fn convert_record_buf(record_buf: &gff::feature::RecordBuf, is_gtf: bool) -> io::Result<GffRecord> {
    let coords = Interval::new(record_buf.start(), record_buf.end())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut record = GffRecord::new(
        record_buf.reference_sequence_name().to_string(),
        record_buf.ty().to_string(),
        coords,
        Strand::from(record_buf.strand()),
    )
    .with_source(record_buf.source().to_string())
    .with_score(record_buf.score())
    .with_phase(record_buf.phase())
    .with_gtf(is_gtf);

    for (key, value) in record_buf.attributes().as_ref() {
        let values = value.iter().map(|v| v.to_string());
        record = record.with_attribute_values(key.to_string(), values);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() -> io::Result<()> {
        assert_eq!(Format::detect("annotations.gff3")?, Format::Gff3);
        assert_eq!(Format::detect("annotations.gff")?, Format::Gff3);
        assert_eq!(Format::detect("annotations.gff3.gz")?, Format::Gff3);
        assert_eq!(Format::detect("transcripts.gtf")?, Format::Gtf);
        assert_eq!(Format::detect("transcripts.gtf.gz")?, Format::Gtf);

        assert!(Format::detect("transcripts.bed").is_err());
        assert!(Format::detect("transcripts.gz").is_err());
        assert!(Format::detect("transcripts").is_err());

        Ok(())
    }

    #[test]
    fn test_read_records() -> io::Result<()> {
        use std::{env, fs};

        let working_prefix = env::temp_dir().join("utrex-test-read-records");
        fs::create_dir_all(&working_prefix)?;

        let src = working_prefix.join("annotations.gff3");
        fs::write(
            &src,
            "\
##gff-version 3
sq0\tNDLS\tgene\t1\t10\t.\t+\t.\tID=g0;Note=a%3Bb%3Dc
sq0\tNDLS\texon\t1\t10\t.\t+\t.\tParent=t0,t1
",
        )?;

        let (format, records) = read_records(&src)?;

        assert_eq!(format, Format::Gff3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_attribute("Note"), Ok("a;b=c"));
        assert_eq!(
            records[1].get_attribute_values("Parent"),
            Ok(&[String::from("t0"), String::from("t1")][..])
        );

        Ok(())
    }
}
