pub mod annotate;
pub mod cli;
pub mod commands;
pub mod gene;
pub mod genes;
pub mod gff;
pub mod interval;
pub mod record;
pub mod transcript;
pub mod writer;

pub use self::{
    cli::Cli,
    gene::{Gene, GeneStrand, StrandPolicy},
    interval::Interval,
    record::{FeatureLevel, GffRecord, Strand},
    transcript::{SpliceSite, Transcript},
    writer::Writer,
};
