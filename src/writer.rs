use std::io::{self, Write};

use noodles::{
    gff::{
        self,
        directive_buf::{key, Value},
        DirectiveBuf,
    },
    gtf,
};

use crate::{Gene, GffRecord};

pub struct Writer<W> {
    inner: W,
}

impl<W> Writer<W>
where
    W: Write,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        let version = DirectiveBuf::new(
            key::GFF_VERSION,
            Some(Value::GffVersion(Default::default())),
        );

        gff::io::Writer::new(&mut self.inner).write_directive(&version)
    }

    /// Writes every record of the gene, one line each, in GFF3 or GTF per record.
    pub fn write_gene(&mut self, gene: &Gene) -> io::Result<()> {
        for record in gene.to_gff_list() {
            write_record(&mut self.inner, &record)?;
        }

        Ok(())
    }

    pub fn write_genes(&mut self, genes: &[Gene]) -> io::Result<()> {
        for gene in genes {
            self.write_gene(gene)?;
        }

        Ok(())
    }
}

pub(crate) fn write_record<W>(writer: &mut W, record: &GffRecord) -> io::Result<()>
where
    W: Write,
{
    let record_buf = record.to_record_buf();

    if record.is_gtf() {
        gtf::io::Writer::new(writer).write_record(&record_buf)
    } else {
        gff::io::Writer::new(writer).write_record(&record_buf)
    }
}
