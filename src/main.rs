//! SegForge: deterministic customer segmentation CLI
//!
//! This is the main entrypoint that orchestrates session loading, the
//! segmentation pipeline, and tabular output of assignments and summary.

use std::fs::File;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use polars::prelude::*;
use segforge::{load_sessions, run_segmentation, Args, SegmentationResult};

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if args.verbose { "debug" } else { "info" },
    ))
    .init();

    let config = args
        .resolve_config()
        .context("failed to load pipeline configuration")?;

    println!("=== Segmentation Pipeline ===\n");
    let start_time = Instant::now();

    // Step 1: Load raw sessions
    if args.verbose {
        println!("Step 1: Loading sessions");
        println!("  Input file: {}", args.input);
    }
    let loaded = load_sessions(&args.input)?;
    println!("✓ Sessions loaded: {}", loaded.sessions.len());
    if loaded.malformed_records > 0 {
        println!("  Malformed rows excluded: {}", loaded.malformed_records);
    }

    // Step 2: Run the pipeline
    if args.verbose {
        println!("\nStep 2: Running segmentation");
        println!("  Cohort start: {}", config.cohort_start);
        println!("  Min sessions (exclusive): {}", config.min_sessions);
        println!("  Others threshold: {}", config.others_threshold);
    }
    let result = run_segmentation(&loaded.sessions, &config)?;
    println!(
        "✓ Assigned {} users ({} unrecoverable sessions excluded)",
        result.cohort_size, result.excluded_sessions
    );

    // Step 3: Report and persist
    println!("\n=== Segment Summary ===");
    for row in &result.summary {
        println!(
            "{:<18} {:>6} users ({:>5.2} of cohort)  perk: {}",
            row.segment, row.user_count, row.cohort_share, row.perk
        );
    }

    write_assignments(&args.output, &result)?;
    println!("\nAssignments saved to: {}", args.output);

    if let Some(summary_path) = &args.summary_output {
        write_summary(summary_path, &result)?;
        println!("Summary saved to: {summary_path}");
    }

    println!(
        "\n=== Pipeline Complete ===\nTotal processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

fn write_assignments(path: &str, result: &SegmentationResult) -> Result<()> {
    let user_ids: Vec<i64> = result.assignments.iter().map(|a| a.user_id).collect();
    let segments: Vec<String> = result
        .assignments
        .iter()
        .map(|a| a.final_segment.clone())
        .collect();
    let perks: Vec<String> = result
        .assignments
        .iter()
        .map(|a| a.assigned_perk.clone())
        .collect();
    let scores: Vec<f64> = result.assignments.iter().map(|a| a.top_score).collect();

    let mut df = DataFrame::new(vec![
        Series::new("user_id", user_ids),
        Series::new("final_segment", segments),
        Series::new("assigned_perk", perks),
        Series::new("top_score", scores),
    ])?;

    let mut file = File::create(path).with_context(|| format!("cannot create {path}"))?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

fn write_summary(path: &str, result: &SegmentationResult) -> Result<()> {
    let segments: Vec<String> = result.summary.iter().map(|s| s.segment.clone()).collect();
    let counts: Vec<i64> = result.summary.iter().map(|s| s.user_count as i64).collect();
    let shares: Vec<f64> = result.summary.iter().map(|s| s.cohort_share).collect();
    let perks: Vec<String> = result.summary.iter().map(|s| s.perk.clone()).collect();

    let mut df = DataFrame::new(vec![
        Series::new("segment", segments),
        Series::new("user_count", counts),
        Series::new("cohort_share", shares),
        Series::new("perk", perks),
    ])?;

    let mut file = File::create(path).with_context(|| format!("cannot create {path}"))?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
