//! Resumable flood fill over chunk coordinates.
//!
//! The walk starts from a seed chunk with a failure budget. A successful visit
//! keeps the budget, a failed one (the chunk is absent) spends one unit. Neighbours
//! are only expanded while the budget stays positive, so the walk covers a
//! contiguous world, probes a thin margin of empty chunks around it, and stops.
//!
//! All state lives in [`FloodFill`]; [`FloodFill::advance`] runs a bounded number
//! of visits and returns, and the next call resumes where the last one stopped.

use crate::chunk::ChunkCoord;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_START: ChunkCoord = ChunkCoord::new(1, 1);
pub const DEFAULT_DEPTH: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continuing,
    Exhausted,
}

/// How a pending coordinate's budget is updated when another neighbour rediscovers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPolicy {
    /// The most recent discovery overwrites the pending budget.
    #[default]
    LastWrite,
    /// The largest budget ever proposed is kept.
    Maximum,
}

#[derive(Debug, Clone)]
pub struct FloodFill {
    visited: FxHashSet<ChunkCoord>,
    frontier: VecDeque<ChunkCoord>,
    budgets: FxHashMap<ChunkCoord, i32>,
    policy: BudgetPolicy,
    visits: u64,
    failures: u64,
    exhausted: bool,
}

impl FloodFill {
    pub fn new(depth: i32) -> Self {
        Self::with_start(DEFAULT_START, depth, BudgetPolicy::default())
    }

    pub fn with_start(start: ChunkCoord, depth: i32, policy: BudgetPolicy) -> Self {
        let mut budgets = FxHashMap::default();
        budgets.insert(start, depth);
        Self {
            visited: FxHashSet::default(),
            frontier: VecDeque::from([start]),
            budgets,
            policy,
            visits: 0,
            failures: 0,
            exhausted: false,
        }
    }

    /// Performs up to `batch_size` visits.
    ///
    /// Returns [`Progress::Exhausted`] once no unvisited coordinate is left. An error
    /// from `visit` aborts the batch: the coordinate stays marked visited and is not
    /// expanded, every other piece of state is kept for the next call.
    pub fn advance<F, E>(&mut self, batch_size: usize, mut visit: F) -> Result<Progress, E>
    where
        F: FnMut(ChunkCoord) -> Result<bool, E>,
    {
        if self.exhausted {
            return Ok(Progress::Exhausted);
        }

        let mut performed = 0;
        while performed < batch_size {
            let Some((coord, budget)) = self.next_pending() else {
                self.exhausted = true;
                return Ok(Progress::Exhausted);
            };

            self.visited.insert(coord);
            self.visits += 1;
            performed += 1;

            let budget = if visit(coord)? {
                budget
            } else {
                self.failures += 1;
                budget - 1
            };

            if budget > 0 {
                for neighbor in coord.neighbors() {
                    if self.visited.contains(&neighbor) {
                        continue;
                    }
                    self.propose(neighbor, budget);
                    self.frontier.push_back(neighbor);
                }
            }
        }

        self.drop_visited_front();
        if self.frontier.is_empty() {
            self.exhausted = true;
            Ok(Progress::Exhausted)
        } else {
            Ok(Progress::Continuing)
        }
    }

    fn next_pending(&mut self) -> Option<(ChunkCoord, i32)> {
        while let Some(coord) = self.frontier.pop_front() {
            if self.visited.contains(&coord) {
                continue;
            }
            let budget = self.budgets.remove(&coord).unwrap_or(0);
            return Some((coord, budget));
        }
        None
    }

    fn drop_visited_front(&mut self) {
        while let Some(front) = self.frontier.front() {
            if !self.visited.contains(front) {
                break;
            }
            self.frontier.pop_front();
        }
    }

    fn propose(&mut self, coord: ChunkCoord, budget: i32) {
        match self.policy {
            BudgetPolicy::LastWrite => {
                self.budgets.insert(coord, budget);
            }
            BudgetPolicy::Maximum => {
                let pending = self.budgets.entry(coord).or_insert(budget);
                *pending = (*pending).max(budget);
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn has_visited(&self, coord: ChunkCoord) -> bool {
        self.visited.contains(&coord)
    }

    pub fn visited(&self) -> &FxHashSet<ChunkCoord> {
        &self.visited
    }

    /// Total visits so far, successful or not.
    pub fn visits(&self) -> u64 {
        self.visits
    }

    /// Visits that reported the chunk as absent.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Queue entries not yet dequeued, duplicates included.
    pub fn pending(&self) -> usize {
        self.frontier.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn square(size: i32) -> impl Fn(ChunkCoord) -> bool {
        move |c| (0..size).contains(&c.x) && (0..size).contains(&c.z)
    }

    fn run(fill: &mut FloodFill, batch: usize, present: impl Fn(ChunkCoord) -> bool) -> Vec<ChunkCoord> {
        let mut order = Vec::new();
        loop {
            let progress = fill
                .advance(batch, |c| {
                    order.push(c);
                    Ok::<_, Infallible>(present(c))
                })
                .unwrap();
            if progress == Progress::Exhausted {
                return order;
            }
        }
    }

    /// Manhattan distance from `c` to the `size`x`size` square at the origin.
    fn distance_to_square(c: ChunkCoord, size: i32) -> i32 {
        let dx = if c.x < 0 { -c.x } else { (c.x - (size - 1)).max(0) };
        let dz = if c.z < 0 { -c.z } else { (c.z - (size - 1)).max(0) };
        dx + dz
    }

    #[test]
    fn test_starts_at_seed() {
        let mut fill = FloodFill::new(3);
        let order = run(&mut fill, 1, square(3));
        assert_eq!(order[0], ChunkCoord::new(1, 1));
    }

    #[test]
    fn test_depth_one_probes_single_ring() {
        let mut fill = FloodFill::new(1);
        let order = run(&mut fill, 200, square(3));

        assert_eq!(order.len(), 9 + 12);
        assert_eq!(fill.failures(), 12);
        for c in &order {
            assert!(distance_to_square(*c, 3) <= 1, "{c} is outside the probe ring");
        }
    }

    #[test]
    fn test_depth_two_starves_after_second_ring() {
        let mut fill = FloodFill::new(2);
        let order = run(&mut fill, 200, square(3));

        for x in 0..3 {
            for z in 0..3 {
                assert!(fill.has_visited(ChunkCoord::new(x, z)));
            }
        }
        let ring: Vec<_> = order
            .iter()
            .filter(|c| distance_to_square(**c, 3) == 1)
            .collect();
        assert_eq!(ring.len(), 12, "first ring must be fully probed");
        assert!(order.iter().all(|c| distance_to_square(*c, 3) <= 2));
        assert!(fill.is_exhausted());

        // later ring-1 proposals overwrite earlier ones, so ring 2 is only partly reached
        assert_eq!(order.len(), 33);
        assert_eq!(fill.failures(), 24);
    }

    #[test]
    fn test_no_coordinate_visited_twice() {
        let mut fill = FloodFill::new(4);
        let order = run(&mut fill, 7, square(6));
        let unique: FxHashSet<_> = order.iter().copied().collect();
        assert_eq!(unique.len(), order.len());
        assert_eq!(fill.visits() as usize, order.len());
    }

    #[test]
    fn test_batch_split_does_not_change_order() {
        let reference = run(&mut FloodFill::new(3), usize::MAX, square(5));
        for batch in [1, 2, 3, 10, 64] {
            let order = run(&mut FloodFill::new(3), batch, square(5));
            assert_eq!(order, reference, "batch size {batch}");
        }
    }

    #[test]
    fn test_batch_boundary_is_exact() {
        let mut fill = FloodFill::new(3);
        let mut seen = 0;
        let progress = fill
            .advance(5, |_| {
                seen += 1;
                Ok::<_, Infallible>(true)
            })
            .unwrap();
        assert_eq!(progress, Progress::Continuing);
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_exhausted_is_sticky() {
        let mut fill = FloodFill::new(1);
        run(&mut fill, 100, |_| false);
        assert_eq!(fill.visits(), 1);
        let mut called = false;
        let progress = fill
            .advance(100, |_| {
                called = true;
                Ok::<_, Infallible>(true)
            })
            .unwrap();
        assert_eq!(progress, Progress::Exhausted);
        assert!(!called);
    }

    #[test]
    fn test_exhaustion_reported_at_batch_boundary() {
        // A lone chunk at the seed with depth 1: one success, four failed probes.
        let mut fill = FloodFill::new(1);
        let progress = fill
            .advance(5, |c| Ok::<_, Infallible>(c == DEFAULT_START))
            .unwrap();
        assert_eq!(progress, Progress::Exhausted);
    }

    #[test]
    fn test_visit_error_keeps_state() {
        let mut fill = FloodFill::new(2);
        let err = fill
            .advance(10, |c| {
                if c == ChunkCoord::new(2, 1) {
                    Err("io")
                } else {
                    Ok(true)
                }
            })
            .unwrap_err();
        assert_eq!(err, "io");
        assert!(fill.has_visited(ChunkCoord::new(2, 1)));

        let before = fill.visits();
        fill.advance(1, |_| Ok::<_, &str>(true)).unwrap();
        assert_eq!(fill.visits(), before + 1);
    }

    #[test]
    fn test_budget_policies() {
        let target = ChunkCoord::new(9, 9);

        let mut last = FloodFill::with_start(DEFAULT_START, 5, BudgetPolicy::LastWrite);
        last.propose(target, 3);
        last.propose(target, 1);
        assert_eq!(last.budgets[&target], 1);

        let mut max = FloodFill::with_start(DEFAULT_START, 5, BudgetPolicy::Maximum);
        max.propose(target, 3);
        max.propose(target, 1);
        assert_eq!(max.budgets[&target], 3);
    }
}
