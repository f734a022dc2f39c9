use anyhow::{Context, Result};
use convmatrix_core::rules::{self, RuleMismatch};
use convmatrix_core::{synthesizer_for, GoBuildProbe, Pipeline, PipelineOutcome};
use std::io::{self, BufWriter, Write};
use std::time::Instant;
use tracing::{info, warn};

use super::resolve_config;
use crate::render::{self, Glyphs, JsonReport};
use crate::{OutputFormat, RunArgs};

/// Executes the full synthesize, compile and extract pipeline and prints the matrix.
pub fn run(args: &RunArgs) -> Result<()> {
    let started = Instant::now();

    let config = resolve_config(args.source.config.as_deref(), args.layer())?;
    let probe = GoBuildProbe::from_config(&config).context("Failed to locate the Go toolchain")?;
    info!(
        go = %probe.toolchain().go_path().display(),
        pattern = probe.pattern().version(),
        "using Go toolchain"
    );
    let synthesizer = synthesizer_for(&config).context("Failed to load source template")?;

    let pipeline =
        Pipeline::new(config.catalog.clone(), config.source_path.clone(), probe)
            .with_synthesizer(synthesizer);
    let outcome = pipeline
        .run()
        .context("Could not derive the conversion matrix")?;

    let mismatches = if args.verify {
        let mismatches = rules::verify(&outcome.matrix);
        if mismatches.is_empty() {
            info!(
                modelled = rules::modelled_types(outcome.matrix.catalog()).len(),
                "compiler verdicts match Go's conversion rules"
            );
        }
        mismatches
    } else {
        Vec::new()
    };

    let mut out = BufWriter::new(io::stdout().lock());
    report(&mut out, &pipeline, &outcome, args, started)?;
    out.flush()?;

    if !mismatches.is_empty() {
        for mismatch in &mismatches {
            warn!("{}", describe(mismatch));
        }
        anyhow::bail!(
            "{} conversion verdict(s) disagree with Go's conversion rules, first: {}",
            mismatches.len(),
            describe(&mismatches[0])
        );
    }
    Ok(())
}

fn report(
    out: &mut impl Write,
    pipeline: &Pipeline<GoBuildProbe>,
    outcome: &PipelineOutcome,
    args: &RunArgs,
    started: Instant,
) -> Result<()> {
    let glyphs = Glyphs::new(args.ascii);
    match args.format {
        OutputFormat::Text | OutputFormat::Table => {
            if args.format == OutputFormat::Text {
                render::write_text(out, &outcome.matrix, glyphs)?;
            } else {
                render::write_table(out, &outcome.matrix, glyphs)?;
            }
            writeln!(out, "{}", render::summary_line(&outcome.matrix))?;
            writeln!(out, "execution took {:?}", started.elapsed())?;
        }
        OutputFormat::Json => {
            let probe = pipeline.probe();
            let report = JsonReport::new(
                &outcome.matrix,
                probe.toolchain_version(),
                probe.pattern().version(),
                started.elapsed(),
            );
            render::write_json(out, &report)?;
        }
    }
    Ok(())
}

fn describe(mismatch: &RuleMismatch) -> String {
    format!(
        "{} is {} but Go's rules say {}",
        mismatch.pair, mismatch.observed, mismatch.expected
    )
}
