use std::{
    fs::File,
    io::{self, BufWriter, Write},
    num::NonZeroUsize,
    path::Path,
};

use anyhow::Context as AnyhowContext;
use tracing::info;

use crate::{
    annotate::{self, Options},
    genes::build_genes,
    gff::{self, Format},
    Gene, StrandPolicy, Writer,
};

pub fn annotate<P, Q, R>(
    annotations_src: P,
    evidence_src: Q,
    options: &Options,
    policy: StrandPolicy,
    worker_count: NonZeroUsize,
    dst: Option<R>,
) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let (format, reference) = read_genes(annotations_src.as_ref(), policy)?;
    info!("read {} reference genes", reference.len());

    let (_, evidence) = read_genes(evidence_src.as_ref(), policy)?;
    info!("read {} evidence genes", evidence.len());

    let (genes, _) = annotate::annotate(reference, evidence, options, worker_count);

    info!("writing genes");

    let inner: Box<dyn Write> = if let Some(dst) = dst {
        let file = File::create(dst.as_ref())
            .with_context(|| format!("Could not create {}", dst.as_ref().display()))?;

        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout().lock()))
    };

    let mut writer = Writer::new(inner);

    if format == Format::Gff3 {
        writer.write_header()?;
    }

    writer.write_genes(&genes)?;
    writer.into_inner().flush()?;

    Ok(())
}

fn read_genes(src: &Path, policy: StrandPolicy) -> anyhow::Result<(Format, Vec<Gene>)> {
    let (format, records) =
        gff::read_records(src).with_context(|| format!("Could not read {}", src.display()))?;

    let genes = build_genes(records, policy)
        .with_context(|| format!("Could not build genes from {}", src.display()))?;

    Ok((format, genes))
}
