use crate::rng::replicate_seed;
use crate::simulation::{validate_inputs, FireResult, FireSimulation};
use log::{debug, info, trace, warn};
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use wildfire_common::{
    AggregateMetrics, AggregateResult, Grid, Landscape, RunSettings, SimError, SimulationParams,
    SpreadSettings,
};

/// Private accumulator of one worker, folded into the shared result once.
#[derive(Debug, Clone)]
struct WorkerTally {
    burn_counts: Grid<u32>,
    replicates: u32,
    processed_cells: u64,
    min_throughput: f64,
    max_throughput: f64,
    busy: Duration,
}

impl WorkerTally {
    fn new(width: usize, height: usize) -> Self {
        Self {
            burn_counts: Grid::new(width, height),
            replicates: 0,
            processed_cells: 0,
            min_throughput: f64::INFINITY,
            max_throughput: f64::NEG_INFINITY,
            busy: Duration::ZERO,
        }
    }

    fn record(&mut self, fire: &FireResult) {
        for &(x, y) in fire.burned_ids() {
            self.burn_counts[(x, y)] += 1;
        }
        let throughput = fire.throughput();
        self.min_throughput = self.min_throughput.min(throughput);
        self.max_throughput = self.max_throughput.max(throughput);
        self.processed_cells += fire.processed_cells;
        self.replicates += 1;
    }
}

/// Shared state every worker folds its tally into, under a single lock.
#[derive(Debug)]
struct RunAccumulator {
    burn_counts: Grid<u32>,
    replicates: u32,
    processed_cells: u64,
    min_throughput: f64,
    max_throughput: f64,
    /// Busy time of each worker that ran at least one replicate.
    worker_busy: Vec<Duration>,
    pool_size: usize,
}

impl RunAccumulator {
    fn new(width: usize, height: usize, pool_size: usize) -> Self {
        Self {
            burn_counts: Grid::new(width, height),
            replicates: 0,
            processed_cells: 0,
            min_throughput: f64::INFINITY,
            max_throughput: f64::NEG_INFINITY,
            worker_busy: Vec::new(),
            pool_size,
        }
    }

    fn fold(&mut self, tally: &WorkerTally) {
        for (total, &count) in self
            .burn_counts
            .as_mut_slice()
            .iter_mut()
            .zip(tally.burn_counts.as_slice())
        {
            *total += count;
        }
        self.replicates += tally.replicates;
        self.processed_cells += tally.processed_cells;
        self.min_throughput = self.min_throughput.min(tally.min_throughput);
        self.max_throughput = self.max_throughput.max(tally.max_throughput);
        self.worker_busy.push(tally.busy);
    }

    fn finish(self, wall_time: Duration) -> AggregateResult {
        let metrics = (self.replicates > 0).then(|| AggregateMetrics {
            min_throughput: self.min_throughput,
            max_throughput: self.max_throughput,
            parallel_time_secs: self
                .worker_busy
                .iter()
                .max()
                .copied()
                .unwrap_or_default()
                .as_secs_f64(),
            total_busy_secs: self.worker_busy.iter().sum::<Duration>().as_secs_f64(),
            wall_time_secs: wall_time.as_secs_f64(),
            total_processed_cells: self.processed_cells,
            workers: self.pool_size,
        });
        AggregateResult {
            burn_counts: self.burn_counts,
            replicates: self.replicates,
            metrics,
        }
    }
}

/// Runs `run.replicates` independent fires and aggregates their burned layers.
///
/// Replicates are handed out one at a time to a pool of `run.workers` threads.
/// Replicate `i` is seeded with `replicate_seed(run.base_seed, i)`, whichever
/// worker runs it. Each worker keeps a private tally and folds it into the
/// shared result once, after its last replicate.
///
/// Inputs are validated before any worker starts. With zero replicates the
/// result is an all-zero matrix with `metrics == None`.
pub fn simulate_many(
    landscape: &Landscape,
    ignitions: &[(usize, usize)],
    params: &SimulationParams,
    settings: &SpreadSettings,
    run: &RunSettings,
) -> Result<AggregateResult, SimError> {
    validate_inputs(landscape, ignitions, params, settings)?;

    let (width, height) = (landscape.width(), landscape.height());
    let replicates = run.replicates;
    if replicates == 0 {
        warn!("No replicates requested; burn counts stay zero and metrics are undefined.");
        return Ok(AggregateResult::empty(width, height));
    }

    let workers = run
        .workers
        .unwrap_or_else(rayon::current_num_threads)
        .clamp(1, replicates as usize);
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("fire-worker-{}", i))
        .build()
        .map_err(|e| SimError::ThreadPool(e.to_string()))?;
    info!(
        "Running {} replicates on {} workers ({}x{} landscape, {} ignitions).",
        replicates,
        workers,
        width,
        height,
        ignitions.len()
    );

    let next_replicate = AtomicU32::new(0);
    let shared = Mutex::new(RunAccumulator::new(width, height, workers));
    let wall_start = Instant::now();

    let outcomes = pool.broadcast(|ctx| -> Result<(), SimError> {
        let mut tally = WorkerTally::new(width, height);
        loop {
            let replicate = next_replicate.fetch_add(1, Ordering::Relaxed);
            if replicate >= replicates {
                break;
            }
            let started = Instant::now();
            let seed = replicate_seed(run.base_seed, u64::from(replicate));
            let fire = FireSimulation::new(landscape, ignitions, *params, *settings, seed)?.run();
            tally.record(&fire);
            tally.busy += started.elapsed();
            trace!(
                "Worker {} finished replicate {}: {} cells burned.",
                ctx.index(),
                replicate,
                fire.burned_count()
            );
        }

        if tally.replicates > 0 {
            debug!(
                "Worker {} folding {} replicates ({:.3} s busy).",
                ctx.index(),
                tally.replicates,
                tally.busy.as_secs_f64()
            );
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .fold(&tally);
        }
        Ok(())
    });
    outcomes.into_iter().collect::<Result<Vec<()>, SimError>>()?;

    let accumulator = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
    let result = accumulator.finish(wall_start.elapsed());
    if let Some(m) = &result.metrics {
        info!(
            "Monte Carlo finished: {} replicates, max {:.0} cells/s, parallel {:.3} s, busy {:.3} s, wall {:.3} s.",
            result.replicates, m.max_throughput, m.parallel_time_secs, m.total_busy_secs, m.wall_time_secs
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::simulate_one;
    use wildfire_common::Cell;

    fn fuel() -> Cell {
        Cell {
            elevation: 1000.0,
            burnable: true,
            ..Cell::default()
        }
    }

    fn settings(upper_limit: f64) -> SpreadSettings {
        SpreadSettings {
            distance: 30.0,
            elevation_mean: 1000.0,
            elevation_sd: 100.0,
            upper_limit,
        }
    }

    #[test]
    fn zero_replicates_give_zero_counts_and_no_metrics() {
        let landscape = Landscape::uniform(5, 4, fuel());
        let result = simulate_many(
            &landscape,
            &[(2, 2)],
            &SimulationParams::default(),
            &settings(0.5),
            &RunSettings::new(0, 1),
        )
        .unwrap();
        assert_eq!(result.replicates, 0);
        assert_eq!(result.max_count(), 0);
        assert_eq!(result.burn_counts.len(), 20);
        assert_eq!(result.metrics().unwrap_err(), SimError::ZeroReplicates);
    }

    #[test]
    fn preconditions_fail_before_any_replicate() {
        let landscape = Landscape::uniform(5, 4, fuel());
        let err = simulate_many(
            &landscape,
            &[(9, 9)],
            &SimulationParams::default(),
            &settings(0.5),
            &RunSettings::new(10, 1),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::IgnitionOutOfBounds { .. }));
    }

    #[test]
    fn ignitions_burn_in_every_replicate() {
        let landscape = Landscape::uniform(6, 6, fuel());
        let ignitions = [(1, 1), (4, 4)];
        let run = RunSettings::new(25, 3).with_workers(4);
        let result =
            simulate_many(&landscape, &ignitions, &SimulationParams::default(), &settings(0.4), &run)
                .unwrap();
        assert_eq!(result.replicates, 25);
        for &(x, y) in &ignitions {
            assert_eq!(result.burn_counts[(x, y)], 25);
        }
        assert!(result.burn_counts.as_slice().iter().all(|&c| c <= 25));
        let metrics = result.metrics().unwrap();
        assert_eq!(metrics.workers, 4);
        assert!(metrics.min_throughput <= metrics.max_throughput);
        assert!(metrics.parallel_time_secs <= metrics.total_busy_secs);
    }

    #[test]
    fn aggregate_matches_sequential_sum() {
        let landscape = Landscape::uniform(12, 9, fuel());
        let ignitions = [(6, 4)];
        let params = SimulationParams::default();
        let s = settings(0.7);
        let run = RunSettings::new(30, 99).with_workers(3);

        let mut expected: Grid<u32> = Grid::new(12, 9);
        let mut processed = 0;
        for i in 0..run.replicates {
            let fire = simulate_one(&landscape, &ignitions, &params, &s, replicate_seed(99, u64::from(i)))
                .unwrap();
            processed += fire.processed_cells;
            for &(x, y) in fire.burned_ids() {
                expected[(x, y)] += 1;
            }
        }

        let result = simulate_many(&landscape, &ignitions, &params, &s, &run).unwrap();
        assert_eq!(result.burn_counts, expected);
        assert_eq!(result.metrics().unwrap().total_processed_cells, processed);
    }

    #[test]
    fn tally_fold_is_order_independent() {
        let mut a = WorkerTally::new(2, 1);
        a.burn_counts[(0, 0)] = 3;
        a.replicates = 3;
        a.min_throughput = 10.0;
        a.max_throughput = 50.0;
        a.busy = Duration::from_millis(30);
        let mut b = WorkerTally::new(2, 1);
        b.burn_counts[(1, 0)] = 2;
        b.burn_counts[(0, 0)] = 1;
        b.replicates = 2;
        b.min_throughput = 5.0;
        b.max_throughput = 20.0;
        b.busy = Duration::from_millis(80);

        let mut ab = RunAccumulator::new(2, 1, 2);
        ab.fold(&a);
        ab.fold(&b);
        let mut ba = RunAccumulator::new(2, 1, 2);
        ba.fold(&b);
        ba.fold(&a);

        let ab = ab.finish(Duration::from_millis(90));
        let ba = ba.finish(Duration::from_millis(90));
        assert_eq!(ab, ba);
        assert_eq!(ab.burn_counts.as_slice(), &[4, 2]);
        let m = ab.metrics().unwrap();
        assert_eq!(m.min_throughput, 5.0);
        assert_eq!(m.max_throughput, 50.0);
        assert_eq!(m.parallel_time_secs, 0.08);
        assert!((m.total_busy_secs - 0.11).abs() < 1e-12);
        assert_eq!(m.workers, 2);
    }

    #[test]
    fn idle_workers_still_count_towards_pool_size() {
        let mut tally = WorkerTally::new(1, 1);
        tally.burn_counts[(0, 0)] = 1;
        tally.replicates = 1;
        tally.min_throughput = 1.0;
        tally.max_throughput = 1.0;
        tally.busy = Duration::from_millis(5);

        // Only one of three workers claimed a replicate.
        let mut acc = RunAccumulator::new(1, 1, 3);
        acc.fold(&tally);
        let m = *acc.finish(Duration::from_millis(6)).metrics().unwrap();
        assert_eq!(m.workers, 3);
        assert_eq!(m.parallel_time_secs, 0.005);
    }

    #[test]
    fn non_finite_coefficient_fails_the_run() {
        let landscape = Landscape::uniform(5, 4, fuel());
        let params = SimulationParams {
            intercept: f64::NAN,
            ..SimulationParams::default()
        };
        let err = simulate_many(&landscape, &[(2, 2)], &params, &settings(0.5), &RunSettings::new(8, 1))
            .unwrap_err();
        assert!(err.is_precondition(), "{err}");
    }
}
