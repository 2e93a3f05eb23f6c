use std::{collections::HashMap, num::NonZeroUsize, panic, thread};

use tracing::{debug, info};

use crate::{Gene, Interval};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Options {
    /// Minimum number of bases a boundary must move for an extension.
    pub min_extend: usize,
    /// Reduce every evidence gene to its longest transcript before matching.
    pub longest_evidence_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min_extend: 1,
            longest_evidence_only: false,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Context {
    pub genes: u64,
    pub extended: u64,
    pub ambiguous_evidence: u64,
}

impl Context {
    pub fn add(&mut self, other: &Context) {
        self.genes += other.genes;
        self.extended += other.extended;
        self.ambiguous_evidence += other.ambiguous_evidence;
    }
}

struct Batch {
    index: usize,
    reference: Vec<Gene>,
    evidence: Vec<Gene>,
}

/// Extends reference genes with the evidence genes overlapping them.
///
/// Each reference sequence is processed independently on a pool of `worker_count` threads.
/// Genes are returned grouped by reference sequence name, in the order the names first appear
/// in `reference`, and sorted by coordinates within a group.
pub fn annotate(
    reference: Vec<Gene>,
    evidence: Vec<Gene>,
    options: &Options,
    worker_count: NonZeroUsize,
) -> (Vec<Gene>, Context) {
    let batches = group_by_seqname(reference, evidence);
    let batch_count = batches.len();

    info!("annotating {batch_count} reference sequences");

    let (mut results, ctx) = thread::scope(move |scope| {
        let (tx, rx) = crossbeam_channel::bounded(worker_count.get());

        scope.spawn(move || {
            for batch in batches {
                if tx.send(batch).is_err() {
                    break;
                }
            }
        });

        let handles: Vec<_> = (0..worker_count.get())
            .map(|_| {
                let rx = rx.clone();

                scope.spawn(move || {
                    let mut results = Vec::new();
                    let mut ctx = Context::default();

                    while let Ok(batch) = rx.recv() {
                        let Batch {
                            index,
                            reference,
                            evidence,
                        } = batch;

                        let (genes, c) = annotate_sequence(reference, evidence, options);
                        results.push((index, genes));
                        ctx.add(&c);
                    }

                    (results, ctx)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(batch_count);
        let mut ctx = Context::default();

        for handle in handles {
            let (r, c) = handle.join().unwrap_or_else(|e| panic::resume_unwind(e));

            results.extend(r);
            ctx.add(&c);
        }

        (results, ctx)
    });

    results.sort_unstable_by_key(|(index, _)| *index);

    let genes = results.into_iter().flat_map(|(_, genes)| genes).collect();

    info!(
        "extended {} of {} genes ({} ambiguous evidence genes)",
        ctx.extended, ctx.genes, ctx.ambiguous_evidence
    );

    (genes, ctx)
}

fn group_by_seqname(reference: Vec<Gene>, evidence: Vec<Gene>) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    let mut indices: HashMap<String, usize> = HashMap::new();

    for gene in reference {
        match indices.get(gene.seqname()) {
            Some(&i) => batches[i].reference.push(gene),
            None => {
                let index = batches.len();
                indices.insert(gene.seqname().into(), index);

                batches.push(Batch {
                    index,
                    reference: vec![gene],
                    evidence: Vec::new(),
                });
            }
        }
    }

    let mut unmatched_evidence_count = 0;

    for gene in evidence {
        match indices.get(gene.seqname()) {
            Some(&i) => batches[i].evidence.push(gene),
            None => unmatched_evidence_count += 1,
        }
    }

    if unmatched_evidence_count > 0 {
        debug!("{unmatched_evidence_count} evidence genes are on sequences without reference genes");
    }

    batches
}

fn annotate_sequence(
    mut reference: Vec<Gene>,
    mut evidence: Vec<Gene>,
    options: &Options,
) -> (Vec<Gene>, Context) {
    reference.sort_by_key(|gene| gene.coords());

    if options.longest_evidence_only {
        for gene in &mut evidence {
            gene.remove_all_but_longest_transcript();
        }
    }

    let mut ctx = Context {
        genes: reference.len() as u64,
        ..Default::default()
    };

    let mut hits: Vec<Vec<&Gene>> = vec![Vec::new(); reference.len()];

    for e in &evidence {
        let mut overlaps = reference
            .iter()
            .enumerate()
            .filter(|(_, gene)| gene.intersects(e))
            .map(|(i, _)| i);

        match (overlaps.next(), overlaps.next()) {
            (Some(i), None) => hits[i].push(e),
            (Some(_), Some(_)) => {
                debug!(
                    "skipping evidence gene {} overlapping multiple reference genes",
                    e.id().unwrap_or(".")
                );

                ctx.ambiguous_evidence += 1;
            }
            _ => {}
        }
    }

    for (i, candidates) in hits.into_iter().enumerate() {
        if candidates.is_empty() {
            continue;
        }

        // Neighbors may already have grown from earlier extensions.
        let exclude_coords: Vec<Interval> = reference
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, gene)| gene.coords())
            .collect();

        let gene = &mut reference[i];
        let original = gene.clone();

        for e in candidates {
            gene.extend(e, options.min_extend, &exclude_coords);
        }

        if *gene != original {
            ctx.extended += 1;
        }
    }

    (reference, ctx)
}
