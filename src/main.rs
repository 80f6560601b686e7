// src/main.rs
use clap::Parser;
use crossbeam_channel::unbounded;
use ierc_miner_rs::miner::search;
use ierc_miner_rs::utils::init_bench_logging;
use ierc_miner_rs::{self, *};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// Main entry point for the IERC PoW miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts mining with the given configuration options
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads the configuration and applies CLI overrides
/// 3. Validates it; nothing is started on a configuration error
/// 4. Starts the worker pool and the statistics reporter
/// 5. Mines until Ctrl-C, then stops the pool and prints a summary
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut raw = config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(workers) = opts.workers {
        raw.worker_threads = Some(workers);
    }
    if let Some(environment) = opts.environment {
        raw.environment = environment;
    }
    if let Some(rpc) = opts.rpc {
        raw.rpc_url = Some(rpc);
    }
    if let Some(premium) = opts.gas_premium {
        raw.gas_premium = Some(premium);
    }

    let workers = raw.worker_count()?;
    let config = Arc::new(raw.validate()?);

    // Submissions run on this runtime; the search loops run on their own threads.
    let rt = Runtime::new()?;
    let submitter = Arc::new(ChainSubmitter::new(&config)?);
    let aggregator = Aggregator::new(config.log_capacity);
    let scheduler = Scheduler::new(
        Arc::new(Keccak),
        submitter,
        rt.handle().clone(),
        aggregator.clone(),
    );

    let pool = scheduler.start(Arc::clone(&config), workers)?;
    StatsReporter::new(aggregator.clone(), config.report_interval).start_reporting();
    log::info!("Press Ctrl-C to stop");

    rt.block_on(tokio::signal::ctrl_c())?;

    pool.stop();
    let state = aggregator.snapshot();
    log::info!("{}", state.header());
    log::info!(
        "Submitted {} mints, {} failed",
        state.success_count(),
        state.failure_count()
    );

    // Workers may still be waiting on a submission; the runtime must outlive them.
    pool.join();
    Ok(())
}

/// Runs search benchmarks
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Spawns hashing threads over disjoint nonce partitions
/// 3. Aggregates their per-second rate samples
/// 4. Reports total hashes and the average rate
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    if opts.threads == 0 {
        return Err(MinerError::ConfigError(
            "benchmark needs at least one thread".into(),
        ));
    }

    let inscription = Arc::new(Inscription::new(
        opts.tick.clone(),
        opts.amount,
        Environment::Production,
    )?);
    let algorithm: Arc<dyn Algorithm> = Arc::new(Keccak);
    let (sender, receiver) = unbounded();

    log::info!(
        "Starting {} benchmark for {} seconds on {} threads",
        algorithm.name(),
        opts.duration,
        opts.threads
    );

    let duration = Duration::from_secs(opts.duration);
    let stride = opts.threads as u64;
    let start_time = Instant::now();
    let handles = (0..opts.threads)
        .map(|index| {
            let algo = Arc::clone(&algorithm);
            let inscription = Arc::clone(&inscription);
            let sender = sender.clone();
            std::thread::Builder::new()
                .name(format!("bench-{}", index))
                .spawn(move || -> Result<u64, MinerError> {
                    let mut nonce = index as u64;
                    let mut total: u64 = 0;
                    let mut hashes: u64 = 0;
                    let mut last_sample = Instant::now();

                    loop {
                        search(algo.as_ref(), &inscription, nonce)?;
                        nonce = nonce.wrapping_add(stride);
                        total += 1;
                        hashes += 1;

                        if total % 64 != 0 {
                            continue;
                        }
                        if start_time.elapsed() >= duration {
                            break;
                        }
                        let elapsed = last_sample.elapsed();
                        if elapsed >= Duration::from_secs(1) {
                            let rate = (hashes as f64 / elapsed.as_secs_f64()).round() as u64;
                            log::debug!("Thread {}: {} c/s", index, rate);
                            let _ = sender.send(WorkerEvent::Rate { index, rate });
                            hashes = 0;
                            last_sample = Instant::now();
                        }
                    }
                    Ok(total)
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    drop(sender);

    let mut state = AggregateState::new(1);
    let mut peak = 0;
    for event in receiver {
        state.apply_event(event);
        peak = peak.max(state.total_rate());
    }

    let mut total_hashes = 0;
    for handle in handles {
        total_hashes += handle
            .join()
            .map_err(|_| MinerError::TaskError("benchmark thread panicked".into()))??;
    }

    // Report final results
    let elapsed = start_time.elapsed().as_secs_f64();
    log::info!("Benchmark results:");
    log::info!("Total hashes: {}", total_hashes);
    log::info!("Average rate: {:.2} c/s", total_hashes as f64 / elapsed);
    log::info!("Peak sampled rate: {} c/s", peak);
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    utils::init_logging();
    std::fs::write(&opts.output, config::generate_template())?;
    log::info!("Configuration template written to {}", opts.output.display());
    Ok(())
}
