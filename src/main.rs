use std::{num::NonZeroUsize, thread};

use clap::Parser;
use mimalloc::MiMalloc;
use utrex::{annotate::Options, commands, Cli, StrandPolicy};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let worker_count = if let Some(n) = cli.threads.and_then(NonZeroUsize::new) {
        n
    } else {
        thread::available_parallelism()?
    };

    let options = Options {
        min_extend: cli.min_extend,
        longest_evidence_only: cli.longest_evidence_only,
    };

    let policy = if cli.lenient {
        StrandPolicy::Lenient
    } else {
        StrandPolicy::Strict
    };

    commands::annotate(
        cli.annotations,
        cli.evidence,
        &options,
        policy,
        worker_count,
        cli.output,
    )
}
