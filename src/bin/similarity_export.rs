use std::env;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use moneyball_scout::config::AppConfig;
use moneyball_scout::dataset::{PlayerFilter, Population};
use moneyball_scout::demo::demo_population;
use moneyball_scout::export::{BatchEntry, export_batch_with_progress};
use moneyball_scout::logging;
use moneyball_scout::similarity::SimilarityIndex;

const DEFAULT_OUT: &str = "exports/similar_players.xlsx";
const DEFAULT_K: usize = 5;

fn main() -> Result<()> {
    logging::init_stderr()?;
    let config = AppConfig::from_env();
    let args = env::args().skip(1).collect::<Vec<_>>();

    let population = if args.iter().any(|a| a == "--demo") {
        demo_population(2_000, 2024)?
    } else {
        let path = arg_value(&args, "data")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_path.clone());
        Population::load(&path).with_context(|| format!("failed to load {}", path.display()))?
    };
    let population = match config.min_minutes {
        Some(min) => population.filter(&PlayerFilter {
            min_minutes: Some(min),
            ..PlayerFilter::default()
        }),
        None => population,
    };
    let out = arg_value(&args, "out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));
    let k = arg_value(&args, "k")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_K)
        .clamp(1, 50);

    let index = SimilarityIndex::build(population, &config.index)?;
    let started = Instant::now();
    let pool = build_pool();
    let ids = index.matrix().ids().to_vec();
    let entries: Vec<BatchEntry> = with_pool(&pool, || {
        ids.par_iter()
            .filter_map(|id| match index.find_similar(*id, k) {
                Ok(similar) => Some(BatchEntry {
                    target: *id,
                    similar,
                }),
                Err(err) => {
                    warn!(player = %id, error = %err, "similarity query failed");
                    None
                }
            })
            .collect()
    });
    info!(
        players = entries.len(),
        k,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scored population"
    );

    let report = export_batch_with_progress(&out, &index, &entries, |p| {
        info!(current = p.current, total = p.total, "{}", p.message);
    })?;

    println!("Similarity export complete");
    println!("File: {}", out.display());
    println!("Rows: {}", report.rows);
    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
        for err in report.errors.iter().take(8) {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn build_pool() -> Option<rayon::ThreadPool> {
    let threads = env::var("SCOUT_EXPORT_THREADS")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())?
        .clamp(1, 64);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    args.iter()
        .find_map(|arg| arg.strip_prefix(&prefix))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
