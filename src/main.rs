use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use wildfire_common::{AggregateResult, Landscape, SimulationConfig, VegetationType};
use wildfire_engine::{replicate_seed, simulate_many, simulate_one, FireResult};

/// Monte Carlo wildfire spread simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the number of replicates from the config
    #[arg(short, long)]
    replicates: Option<u32>,

    /// Override the number of worker threads from the config
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Wildfire Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(replicates) = args.replicates {
        config.run.replicates = replicates;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0.");
        }
        config.run.workers = Some(workers);
    }
    debug!("Configuration: {:#?}", config);

    // --- Build Landscape ---
    let start_time = Instant::now();
    let landscape = Landscape::generate(&config.landscape)?;
    let (elev_mean, elev_sd) = landscape.elevation_stats();
    info!(
        "Landscape {}x{} ready in {:.2} s: {} burnable cells, elevation {:.1} +/- {:.1}.",
        landscape.width(),
        landscape.height(),
        start_time.elapsed().as_secs_f64(),
        landscape.burnable_count(),
        elev_mean,
        elev_sd
    );

    // --- Run Replicates ---
    let params = config.simulation_params();
    let settings = config.spread_settings();
    let run = config.run_settings();
    let ignitions = &config.ignition.points;

    let aggregate = simulate_many(&landscape, ignitions, &params, &settings, &run)
        .context("Monte Carlo run failed")?;

    match aggregate.metrics() {
        Ok(m) => {
            info!("  SIMULATION PERFORMANCE DATA");
            info!("* Replicates: {} on {} workers", aggregate.replicates, m.workers);
            info!("* Throughput: {:.0} - {:.0} cells/sec processed", m.min_throughput, m.max_throughput);
            info!("* Parallel time: {:.3} s, total busy time: {:.3} s, wall time: {:.3} s",
                m.parallel_time_secs, m.total_busy_secs, m.wall_time_secs);
            info!("* Cells burned at least once: {} (max count {})", aggregate.ever_burned(), aggregate.max_count());
        }
        Err(e) => warn!("No performance data: {}", e),
    }

    // --- Save Recorded Data ---
    if config.output.save_aggregate {
        let output_format = config.output.format.as_deref().unwrap_or("json");
        if let Err(e) = write_aggregate(&aggregate, &config.output.base_filename, output_format) {
            error!("Error saving aggregate result: {:#}", e);
        }
    } else {
        info!("Skipping saving aggregate result as per config (save_aggregate is false).");
    }

    if config.output.save_generation_log {
        // Replicate 0 of the Monte Carlo run, reproduced from its seed.
        let fire = simulate_one(&landscape, ignitions, &params, &settings, replicate_seed(run.base_seed, 0))?;
        let stats = fire.fire_stats(&landscape);
        info!(
            "Replicate 0: {} cells over {} generations (subalpine {}, wet {}, dry {}, matorral {}).",
            fire.burned_count(),
            fire.generation_ends().len(),
            stats.count(VegetationType::Subalpine),
            stats.count(VegetationType::Wet),
            stats.count(VegetationType::Dry),
            stats.count(VegetationType::Matorral)
        );
        let filename = format!("{}_generations.csv", config.output.base_filename);
        match write_generation_log(&fire, &filename) {
            Ok(()) => info!("Generation log saved to {}", filename),
            Err(e) => error!("Error saving generation log '{}': {:#}", filename, e),
        }
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Writes the aggregate in `format` ("json", "bincode" or "messagepack").
fn write_aggregate(aggregate: &AggregateResult, base_filename: &str, format: &str) -> Result<()> {
    match format {
        "json" => {
            let filename = format!("{}_aggregate.json", base_filename);
            let json_string = serde_json::to_string(aggregate).context("Error serializing aggregate to JSON")?;
            let mut file = File::create(&filename).with_context(|| format!("Error creating file '{}'", filename))?;
            file.write_all(json_string.as_bytes())
                .with_context(|| format!("Error writing '{}'", filename))?;
            info!("Aggregate saved to {} ({} KB)", filename, json_string.len() / 1024);
        }
        "bincode" => {
            // Binary format (much more compact)
            let filename = format!("{}_aggregate.bin", base_filename);
            write_buffered(&filename, |writer| {
                bincode::serialize_into(writer, aggregate).context("Error serializing aggregate to bincode")
            })?;
            info!("Aggregate saved to {} (binary format)", filename);
        }
        "messagepack" => {
            // MessagePack format (compact and cross-platform)
            let filename = format!("{}_aggregate.msgpack", base_filename);
            write_buffered(&filename, |writer| {
                rmp_serde::encode::write(writer, aggregate).context("Error serializing aggregate to MessagePack")
            })?;
            info!("Aggregate saved to {} (MessagePack format)", filename);
        }
        _ => {
            error!("Unknown output format: {}. Using JSON instead.", format);
            write_aggregate(aggregate, base_filename, "json")?;
        }
    }
    Ok(())
}

/// Runs `encode` against a buffered file and flushes it, so a failed final
/// write is reported instead of being dropped with the buffer.
fn write_buffered<F>(filename: &str, encode: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(filename).with_context(|| format!("Error creating file '{}'", filename))?;
    let mut writer = BufWriter::new(file);
    encode(&mut writer)?;
    writer.flush().with_context(|| format!("Error writing '{}'", filename))?;
    Ok(())
}

/// One row per burned cell: the generation it ignited in and its coordinates.
fn write_generation_log(fire: &FireResult, filename: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)?;
    writer.write_record(["generation", "x", "y"])?;
    for (generation, cells) in fire.generations().enumerate() {
        for &(x, y) in cells {
            writer.write_record(&[generation.to_string(), x.to_string(), y.to_string()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn full_disk_surfaces_as_error() {
        let aggregate = AggregateResult::empty(4, 4);
        let err = write_buffered("/dev/full", |writer| {
            bincode::serialize_into(writer, &aggregate).context("Error serializing aggregate to bincode")
        })
        .unwrap_err();
        assert!(err.to_string().contains("/dev/full"), "{err:#}");
    }

    #[test]
    fn buffered_write_reaches_the_file() {
        let path = std::env::temp_dir().join(format!("wildfire-aggregate-{}.msgpack", std::process::id()));
        let filename = path.to_string_lossy().into_owned();
        let aggregate = AggregateResult::empty(3, 2);
        write_buffered(&filename, |writer| {
            rmp_serde::encode::write(writer, &aggregate).context("Error serializing aggregate to MessagePack")
        })
        .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let decoded: AggregateResult = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, aggregate);
    }
}
