use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::{
    gene::{self, Gene, StrandPolicy},
    record::{AttributeNotFound, FeatureLevel, GffRecord},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    MissingAttribute(#[from] AttributeNotFound),
    #[error("unknown parent transcript {parent} of record: {record}")]
    OrphanRecord { parent: String, record: String },
    #[error("invalid gene {id}")]
    InvalidGene {
        id: String,
        #[source]
        source: gene::Error,
    },
}

/// Groups records into genes.
///
/// Genes are returned in the order they first appear. GTF records are grouped by their
/// `gene_id`; GFF3 records, by following `Parent` (or `Derives_from`) links to a gene ID.
/// Records with features outside of the gene/transcript/sub-feature hierarchy are skipped, as are
/// the sub-features of skipped transcripts (e.g., the exons of an `lnc_RNA`).
pub fn build_genes(records: Vec<GffRecord>, policy: StrandPolicy) -> Result<Vec<Gene>, Error> {
    let parents = Parents::new(&records)?;

    let mut genes: Vec<Gene> = Vec::new();
    let mut indices: HashMap<String, usize> = HashMap::new();
    let mut skipped_record_count = 0;

    for record in records {
        let Some(level) = record.level() else {
            debug!("skipping record: {record}");
            skipped_record_count += 1;
            continue;
        };

        let Some(id) = gene_id(&record, level, &parents)? else {
            debug!("skipping record with a skipped parent: {record}");
            skipped_record_count += 1;
            continue;
        };

        match indices.get(&id) {
            Some(&i) => genes[i]
                .add_gff_record(record, policy)
                .map_err(|source| Error::InvalidGene { id, source })?,
            None => {
                let gene = Gene::new(record, policy).map_err(|source| Error::InvalidGene {
                    id: id.clone(),
                    source,
                })?;

                indices.insert(id, genes.len());
                genes.push(gene);
            }
        }
    }

    if skipped_record_count > 0 {
        info!("skipped {skipped_record_count} records with unrecognized features or parents");
    }

    Ok(genes)
}

#[derive(Default)]
struct Parents {
    transcript_genes: HashMap<String, String>,
    skipped_ids: HashSet<String>,
}

impl Parents {
    fn new(records: &[GffRecord]) -> Result<Self, Error> {
        let mut parents = Self::default();

        for record in records {
            if record.is_gtf() {
                continue;
            }

            match record.level() {
                Some(FeatureLevel::Transcript) => {
                    let transcript_id = record.get_attribute("ID")?;
                    let gene_id = record.get_attribute("Parent")?;

                    parents
                        .transcript_genes
                        .insert(transcript_id.into(), gene_id.into());
                }
                None => {
                    if let Ok(id) = record.get_attribute("ID") {
                        parents.skipped_ids.insert(id.into());
                    }
                }
                _ => {}
            }
        }

        Ok(parents)
    }
}

fn gene_id(
    record: &GffRecord,
    level: FeatureLevel,
    parents: &Parents,
) -> Result<Option<String>, Error> {
    if record.is_gtf() {
        return Ok(Some(record.get_attribute("gene_id")?.into()));
    }

    match level {
        FeatureLevel::Gene => Ok(Some(record.get_attribute("ID")?.into())),
        FeatureLevel::Transcript => Ok(Some(record.get_attribute("Parent")?.into())),
        FeatureLevel::SubFeature => {
            let key = if record.feature() == "polypeptide" {
                "Derives_from"
            } else {
                "Parent"
            };

            let transcript_ids = record.get_attribute_values(key)?;

            if let Some(gene_id) = transcript_ids
                .iter()
                .find_map(|id| parents.transcript_genes.get(id))
            {
                Ok(Some(gene_id.clone()))
            } else if transcript_ids
                .iter()
                .all(|id| parents.skipped_ids.contains(id))
            {
                Ok(None)
            } else {
                Err(Error::OrphanRecord {
                    parent: transcript_ids.join(","),
                    record: record.to_string(),
                })
            }
        }
    }
}
