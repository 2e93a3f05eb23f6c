use std::path::PathBuf;

use clap::Parser;
use git_testament::{git_testament, render_testament};

git_testament!(TESTAMENT);

/// Extend the UTRs of reference gene models using assembled transcripts.
#[derive(Parser)]
#[command(version = render_testament!(TESTAMENT))]
pub struct Cli {
    /// Input reference annotations file (GFF3 or GTF, optionally gzip-compressed).
    #[arg(short = 'a', long)]
    pub annotations: PathBuf,

    /// Input transcript evidence file (GTF or GFF3, optionally gzip-compressed), e.g., Cufflinks
    /// transcripts.
    #[arg(short = 'e', long)]
    pub evidence: PathBuf,

    /// Output destination for the extended annotations. Defaults to stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Minimum number of bases a gene boundary must move to be extended.
    #[arg(long, default_value_t = 1)]
    pub min_extend: usize,

    /// Allow genes with inconsistent strands.
    #[arg(long)]
    pub lenient: bool,

    /// Only use the longest transcript of each evidence gene.
    #[arg(long)]
    pub longest_evidence_only: bool,

    /// Force a specific number of threads.
    #[arg(long)]
    pub threads: Option<usize>,
}
