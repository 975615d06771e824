//! Generation engine: computes universe `n + 1` from universe `n`.
//!
//! [`GenerationEngine::next_generation`] runs a small dataflow graph on
//! the Tokio runtime for every step:
//!
//! ```text
//!               +--> survive worker --+--> candidates --> dedup --+--> birth worker --+
//! live cells ---+--> survive worker --+                           +--> birth worker --+--> collector
//!               +--> survive worker ------- survivors ---------------------------------+
//! ```
//!
//! Survive workers own disjoint slices of the live set and decide the
//! fate of live cells only. Birth workers see each dead neighbour exactly
//! once (after dedup) and decide the fate of dead cells only, so no
//! coordinate is ever decided twice and the result is independent of
//! scheduling order.
//!
//! Every channel is bounded. A stage stops as soon as its downstream
//! closes, and the engine joins every task before returning.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::cell::Cell;
use crate::error::EngineError;
use crate::universe::Universe;

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Workers per pool. `0` uses the available parallelism.
    #[serde(default)]
    pub workers: usize,

    /// Capacity of every intermediate channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How many times a failed generation is recomputed before the
    /// producer gives up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            channel_capacity: default_channel_capacity(),
            max_retries: default_max_retries(),
        }
    }
}

const fn default_channel_capacity() -> usize {
    1024
}

const fn default_max_retries() -> u32 {
    3
}

/// Stateless parallel engine. Cheap to clone; holds only pool sizes.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    workers: usize,
    channel_capacity: usize,
}

impl GenerationEngine {
    /// Build an engine from configuration.
    pub fn new(config: &EngineConfig) -> Self {
        let workers = if config.workers == 0 {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            config.workers
        };
        Self {
            workers,
            channel_capacity: config.channel_capacity.max(1),
        }
    }

    /// Number of workers in each pool.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Compute the next generation under B3/S23.
    ///
    /// The input is only read. On error the caller can retry with the
    /// same `Arc`.
    pub async fn next_generation(&self, current: Arc<Universe>) -> Result<Universe, EngineError> {
        let next_generation = current.generation().saturating_add(1);
        if current.is_empty() {
            return Ok(Universe::with_generation(next_generation));
        }

        let (result_tx, result_rx) = mpsc::channel::<Cell>(self.channel_capacity);
        let (candidate_tx, candidate_rx) = mpsc::channel::<Cell>(self.channel_capacity);

        let collector = tokio::spawn(collect(result_rx, next_generation));
        let mut tasks = JoinSet::new();

        let mut birth_txs = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let (tx, rx) = mpsc::channel::<Cell>(self.channel_capacity);
            birth_txs.push(tx);
            tasks.spawn(birth_worker(Arc::clone(&current), rx, result_tx.clone()));
        }
        tasks.spawn(dedup_candidates(candidate_rx, birth_txs));

        for slice in partition(&current, self.workers) {
            tasks.spawn(survive_worker(
                Arc::clone(&current),
                slice,
                candidate_tx.clone(),
                result_tx.clone(),
            ));
        }
        // The pools hold the only remaining senders; channels close as they finish.
        drop(candidate_tx);
        drop(result_tx);

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                if failure.is_none() {
                    failure = Some(EngineError::from(err));
                    tasks.abort_all();
                }
            }
        }
        if let Some(err) = failure {
            collector.abort();
            return Err(err);
        }

        let next = collector.await?;
        debug!(
            generation = next.generation(),
            live = next.len(),
            previous_live = current.len(),
            workers = self.workers,
            "Generation computed"
        );
        Ok(next)
    }
}

/// A source of successor universes.
///
/// The producer loop is written against this trait rather than against
/// [`GenerationEngine`] directly, so any step function (the parallel
/// engine, the sequential reference, or a test double) can drive it.
pub trait GenerationStep: Send + Sync + 'static {
    /// Compute the generation after `current`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the step could not be completed. The
    /// input is left untouched so the caller may retry with it.
    fn step(&self, current: Arc<Universe>) -> impl Future<Output = Result<Universe, EngineError>> + Send;
}

impl GenerationStep for GenerationEngine {
    fn step(&self, current: Arc<Universe>) -> impl Future<Output = Result<Universe, EngineError>> + Send {
        self.next_generation(current)
    }
}

/// Split the live set into at most `workers` owned slices.
fn partition(universe: &Universe, workers: usize) -> Vec<Vec<Cell>> {
    let cells: Vec<Cell> = universe.cells().copied().collect();
    let slice_len = cells.len().div_ceil(workers.max(1)).max(1);
    cells.chunks(slice_len).map(<[Cell]>::to_vec).collect()
}

/// Apply the survive rule to owned live cells and emit dead neighbours.
async fn survive_worker(
    universe: Arc<Universe>,
    cells: Vec<Cell>,
    candidates: mpsc::Sender<Cell>,
    results: mpsc::Sender<Cell>,
) {
    for cell in cells {
        let mut live = 0_u8;
        for neighbor in cell.neighbors() {
            if universe.contains(neighbor) {
                live = live.saturating_add(1);
            } else if candidates.send(neighbor).await.is_err() {
                return;
            }
        }
        if matches!(live, 2 | 3) && results.send(cell).await.is_err() {
            return;
        }
    }
}

/// Forward each birth candidate once, dealing them round-robin.
async fn dedup_candidates(mut candidates: mpsc::Receiver<Cell>, births: Vec<mpsc::Sender<Cell>>) {
    let mut seen = HashSet::new();
    let mut targets = births.iter().cycle();
    while let Some(cell) = candidates.recv().await {
        if !seen.insert(cell) {
            continue;
        }
        let Some(target) = targets.next() else {
            return;
        };
        if target.send(cell).await.is_err() {
            return;
        }
    }
}

/// Apply the birth rule to deduplicated dead candidates.
async fn birth_worker(
    universe: Arc<Universe>,
    mut candidates: mpsc::Receiver<Cell>,
    results: mpsc::Sender<Cell>,
) {
    while let Some(cell) = candidates.recv().await {
        if universe.live_neighbors(cell) == 3 && results.send(cell).await.is_err() {
            return;
        }
    }
}

/// Gather survivors and births into the next universe.
async fn collect(mut results: mpsc::Receiver<Cell>, generation: u64) -> Universe {
    let mut next = Universe::with_generation(generation);
    while let Some(cell) = results.recv().await {
        next.insert(cell);
    }
    next
}

/// Brute-force sequential B3/S23 step.
///
/// Counts every live cell's contribution to its neighbours in one map and
/// then applies both rules. The parallel engine must agree with this for
/// every input.
pub fn reference_next_generation(current: &Universe) -> Universe {
    let mut counts: HashMap<Cell, u8> = HashMap::new();
    for cell in current.cells() {
        for neighbor in cell.neighbors() {
            let count = counts.entry(neighbor).or_insert(0);
            *count = count.saturating_add(1);
        }
    }
    let alive = counts
        .into_iter()
        .filter(|&(cell, n)| n == 3 || (n == 2 && current.contains(cell)))
        .map(|(cell, _)| cell);
    Universe::from_cells_at(current.generation().saturating_add(1), alive)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn engine(workers: usize) -> GenerationEngine {
        GenerationEngine::new(&EngineConfig {
            workers,
            channel_capacity: 8,
            max_retries: 0,
        })
    }

    fn cells(coords: &[(i64, i64)]) -> Universe {
        Universe::from_cells(coords.iter().copied().map(Cell::from))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn empty_stays_empty() {
        let e = engine(4);
        let once = e.next_generation(Arc::new(Universe::empty())).await.unwrap();
        let twice = e.next_generation(Arc::new(once)).await.unwrap();
        assert!(twice.is_empty());
        assert_eq!(twice.generation(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn isolated_cells_die() {
        let e = engine(3);
        let next = e
            .next_generation(Arc::new(cells(&[(0, 0), (10, 10), (-7, 3)])))
            .await
            .unwrap();
        assert!(next.is_empty());
        assert_eq!(next.bounds(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn blinker_has_period_two() {
        let e = engine(4);
        let row = cells(&[(0, 0), (1, 0), (2, 0)]);
        let column = e.next_generation(Arc::new(row.clone())).await.unwrap();
        assert_eq!(
            column.sorted_cells(),
            vec![Cell::new(1, -1), Cell::new(1, 0), Cell::new(1, 1)]
        );
        let back = e.next_generation(Arc::new(column)).await.unwrap();
        assert_eq!(back.sorted_cells(), row.sorted_cells());
        assert_eq!(back.generation(), 2);
    }

    #[tokio::test]
    async fn block_is_still_life_on_current_thread_runtime() {
        let e = engine(2);
        let block = cells(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let next = e.next_generation(Arc::new(block.clone())).await.unwrap();
        assert_eq!(next.sorted_cells(), block.sorted_cells());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn glider_translates_diagonally() {
        let e = engine(4);
        let start = Pattern::Glider.seed();
        let mut u = Arc::new(start.clone());
        for _ in 0..4 {
            u = Arc::new(e.next_generation(Arc::clone(&u)).await.unwrap());
        }
        let shifted: Vec<Cell> = start
            .sorted_cells()
            .into_iter()
            .map(|c| Cell::new(c.x + 1, c.y + 1))
            .collect();
        assert_eq!(u.sorted_cells(), shifted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn matches_reference_for_r_pentomino_run() {
        let e = engine(4);
        let mut parallel = Arc::new(Pattern::RPentomino.seed());
        let mut sequential = Pattern::RPentomino.seed();
        for _ in 0..60 {
            parallel = Arc::new(e.next_generation(Arc::clone(&parallel)).await.unwrap());
            sequential = reference_next_generation(&sequential);
            assert_eq!(parallel.generation(), sequential.generation());
            assert_eq!(parallel.sorted_cells(), sequential.sorted_cells());
            assert_eq!(parallel.bounds(), sequential.bounds());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn step_trait_drives_the_engine() {
        async fn advance<S: GenerationStep>(stepper: &S, u: Universe) -> Universe {
            stepper.step(Arc::new(u)).await.unwrap()
        }
        let next = advance(&engine(2), Pattern::Toad.seed()).await;
        assert_eq!(next, reference_next_generation(&Pattern::Toad.seed()));
    }

    #[test]
    fn zero_workers_means_available_parallelism() {
        let e = GenerationEngine::new(&EngineConfig::default());
        assert!(e.workers() >= 1);
    }

    #[test]
    fn partition_covers_every_cell_once() {
        let u = Pattern::GosperGliderGun.seed();
        let slices = partition(&u, 5);
        assert!(slices.len() <= 5);
        let total: usize = slices.iter().map(Vec::len).sum();
        assert_eq!(total, u.len());
        let unique: HashSet<Cell> = slices.into_iter().flatten().collect();
        assert_eq!(unique.len(), u.len());
    }
}
