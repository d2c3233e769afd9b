//! Genetic search for a short closed tour.
//!
//! Candidates are permutations of waypoint indices scored by total cycle
//! distance (lower is better). Each generation keeps an elite, fills the rest
//! with order-crossover offspring of tournament-selected parents, and applies
//! swap mutation. The search stops after a configured number of consecutive
//! generations without improvement, not after a fixed generation count.
//!
//! The search is stochastic: results depend on the injected random source.
//! A seeded generator reproduces a run exactly; different seeds may return
//! different tours of equal or different quality.

use log::{debug, info, warn};
use rand::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::config::OptimizerConfig;
use crate::error::{Result, TourError};
use crate::model::{DistanceMatrix, Tour};

/// Relative gain a generation must achieve to count as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Redraws allowed when the second parent equals the first.
const DISTINCT_PARENT_ATTEMPTS: usize = 8;

/// Generations between progress log lines.
const PROGRESS_INTERVAL: usize = 250;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No improvement for `max_stagnant_attempts` consecutive generations.
    Stagnated,
    /// Reached `max_generations`.
    GenerationLimit,
    /// Cancellation token was set between generations.
    Cancelled,
    /// Two waypoints; the only tour was returned without searching.
    Trivial,
}

/// Best tour found by a search run.
#[derive(Debug, Clone)]
pub struct OptimizedTour {
    pub tour: Tour,              // Permutation of 0..n
    pub distance: f64,           // Fitness of `tour`
    pub generations: usize,      // Generations evolved after the initial population
    pub history: Vec<f64>,       // Best-ever fitness after each generation, index 0 = initial population
    pub stop_reason: StopReason, // Why the search ended
}

#[derive(Debug, Clone)]
pub struct TourOptimizer {
    config: OptimizerConfig,
}

impl TourOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    // =================== GENETIC ALGORITHM CORE ===================

    /// Evolves a population of tours over `matrix` until the search stagnates.
    ///
    /// # Arguments
    /// * `matrix` - Complete pairwise distances; a missing pair is an error
    /// * `rng` - Random source for initialization, selection, crossover and mutation
    /// * `cancel` - Checked between generations; a cancelled run returns the best so far
    ///
    /// # Returns
    /// * `OptimizedTour` - Best tour seen and its cycle distance
    pub fn optimize<R: Rng>(
        &self,
        matrix: &DistanceMatrix,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<OptimizedTour> {
        let n = matrix.size();
        if n < 2 {
            return Err(TourError::DegenerateInput { count: n });
        }

        let costs = matrix.to_dense()?;

        if n == 2 {
            let distance = costs[0][1];
            return Ok(OptimizedTour {
                tour: vec![0, 1],
                distance,
                generations: 0,
                history: vec![distance],
                stop_reason: StopReason::Trivial,
            });
        }

        let config = &self.config;
        let population_size = config.population_size;
        let elite_count = config.elite_count();

        let mut population = initialize_population(n, population_size, rng);
        let mut fitness_values = evaluate_population(&population, &costs);

        let best_idx = find_best_index(&fitness_values);
        let mut best_tour = population[best_idx].clone();
        let mut best_fitness = fitness_values[best_idx];
        let mut history = vec![best_fitness];

        info!("Initial best tour distance: {:.2}", best_fitness);

        let mut generation = 0;
        let mut generations_no_improvement = 0;

        let stop_reason = loop {
            if generations_no_improvement >= config.max_stagnant_attempts {
                break StopReason::Stagnated;
            }
            if config.max_generations.is_some_and(|max| generation >= max) {
                break StopReason::GenerationLimit;
            }
            if cancel.is_cancelled() {
                warn!("Search cancelled at generation {}", generation);
                break StopReason::Cancelled;
            }

            let mut new_population = Vec::with_capacity(population_size);

            // Elitism: carry the best tours over unchanged
            let mut ranked: Vec<usize> = (0..population_size).collect();
            ranked.sort_by(|&a, &b| fitness_values[a].total_cmp(&fitness_values[b]));
            new_population.extend(ranked[..elite_count].iter().map(|&i| population[i].clone()));

            while new_population.len() < population_size {
                let parent1_idx = tournament_selection(&fitness_values, config.tournament_size, rng);
                let mut parent2_idx = tournament_selection(&fitness_values, config.tournament_size, rng);
                for _ in 0..DISTINCT_PARENT_ATTEMPTS {
                    if parent2_idx != parent1_idx {
                        break;
                    }
                    parent2_idx = tournament_selection(&fitness_values, config.tournament_size, rng);
                }

                let mut child = order_crossover(&population[parent1_idx], &population[parent2_idx], rng);

                if rng.gen::<f64>() < config.mutation_probability {
                    swap_mutation(&mut child, rng);
                }

                new_population.push(child);
            }

            // The old population is replaced wholesale; no slot is shared across generations
            population = new_population;
            fitness_values = evaluate_population(&population, &costs);
            generation += 1;

            let current_idx = find_best_index(&fitness_values);
            let current_fitness = fitness_values[current_idx];

            if current_fitness < best_fitness - IMPROVEMENT_EPSILON * best_fitness.abs().max(1.0) {
                best_tour = population[current_idx].clone();
                best_fitness = current_fitness;
                generations_no_improvement = 0;
                info!("Generation {}: new best distance = {:.2}", generation, best_fitness);
            } else {
                generations_no_improvement += 1;
            }

            history.push(best_fitness);

            if generation % PROGRESS_INTERVAL == 0 {
                debug!(
                    "Progress - generation {}: best {:.2}, {} generations without improvement",
                    generation, best_fitness, generations_no_improvement
                );
            }
        };

        info!(
            "Search complete after {} generations ({:?}): best distance = {:.2}",
            generation, stop_reason, best_fitness
        );

        Ok(OptimizedTour {
            tour: best_tour,
            distance: best_fitness,
            generations: generation,
            history,
            stop_reason,
        })
    }
}

// =================== FITNESS ===================

/// Total length of the closed cycle through `tour`, including the edge from
/// the last stop back to the first.
pub fn tour_distance(tour: &[usize], costs: &[Vec<f64>]) -> f64 {
    if tour.len() < 2 {
        return 0.0;
    }
    let closing = costs[tour[tour.len() - 1]][tour[0]];
    tour.windows(2).map(|w| costs[w[0]][w[1]]).sum::<f64>() + closing
}

fn evaluate_population(population: &[Tour], costs: &[Vec<f64>]) -> Vec<f64> {
    population.par_iter().map(|tour| tour_distance(tour, costs)).collect()
}

fn find_best_index(fitness_values: &[f64]) -> usize {
    fitness_values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

// =================== GENETIC OPERATORS ===================

fn initialize_population<R: Rng>(n: usize, population_size: usize, rng: &mut R) -> Vec<Tour> {
    (0..population_size)
        .map(|_| {
            let mut tour: Tour = (0..n).collect();
            tour.shuffle(rng);
            tour
        })
        .collect()
}

/// Picks the fittest of `tournament_size` uniformly drawn candidates.
fn tournament_selection<R: Rng>(fitness_values: &[f64], tournament_size: usize, rng: &mut R) -> usize {
    let mut best_idx = rng.gen_range(0..fitness_values.len());

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..fitness_values.len());
        if fitness_values[idx] < fitness_values[best_idx] {
            best_idx = idx;
        }
    }

    best_idx
}

/// Order crossover (OX).
///
/// A random slice of `parent1` is copied in place; the remaining positions
/// are filled left to right with the missing genes in the order they appear
/// in `parent2`. The child is always a permutation.
fn order_crossover<R: Rng>(parent1: &[usize], parent2: &[usize], rng: &mut R) -> Tour {
    let n = parent1.len();
    let a = rng.gen_range(0..n);
    let b = rng.gen_range(0..n);
    let (start, end) = if a <= b { (a, b) } else { (b, a) };

    let mut child = vec![usize::MAX; n];
    let mut taken = vec![false; n];
    for i in start..=end {
        child[i] = parent1[i];
        taken[parent1[i]] = true;
    }

    let mut donor = parent2.iter().copied().filter(|&gene| !taken[gene]);
    for (i, slot) in child.iter_mut().enumerate() {
        if (start..=end).contains(&i) {
            continue;
        }
        if let Some(gene) = donor.next() {
            *slot = gene;
        }
    }

    child
}

/// Swaps two distinct positions.
fn swap_mutation<R: Rng>(tour: &mut [usize], rng: &mut R) {
    let n = tour.len();
    if n < 2 {
        return;
    }
    let i = rng.gen_range(0..n);
    let mut j = rng.gen_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    tour.swap(i, j);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn is_permutation(tour: &[usize], n: usize) -> bool {
        let mut seen = vec![false; n];
        tour.len() == n
            && tour.iter().all(|&i| i < n && !std::mem::replace(&mut seen[i], true))
    }

    fn matrix_from(points: &[(f64, f64)]) -> DistanceMatrix {
        let mut matrix = DistanceMatrix::new(points.len());
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let (dx, dy) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
                matrix.insert(i, j, (dx * dx + dy * dy).sqrt());
            }
        }
        matrix
    }

    fn unit_square() -> DistanceMatrix {
        matrix_from(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
    }

    fn circle(n: usize) -> Vec<(f64, f64)> {
        // Scrambled so index order is not already the optimal tour
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(99));
        order
            .into_iter()
            .map(|k| {
                let angle = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
                (angle.cos(), angle.sin())
            })
            .collect()
    }

    fn optimizer(config: OptimizerConfig) -> TourOptimizer {
        TourOptimizer::new(config).unwrap()
    }

    #[test]
    fn unit_square_converges_to_perimeter() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = optimizer(OptimizerConfig::default())
            .optimize(&unit_square(), &mut rng, &CancellationToken::new())
            .unwrap();

        assert!((result.distance - 4.0).abs() < 1e-9, "got {}", result.distance);
        assert!(is_permutation(&result.tour, 4));
        assert_eq!(result.stop_reason, StopReason::Stagnated);
    }

    #[test]
    fn two_waypoints_skip_the_search() {
        let mut matrix = DistanceMatrix::new(2);
        matrix.insert(0, 1, 12.5);

        let mut rng = StdRng::seed_from_u64(1);
        let result = optimizer(OptimizerConfig::default())
            .optimize(&matrix, &mut rng, &CancellationToken::new())
            .unwrap();

        assert_eq!(result.tour, vec![0, 1]);
        assert_eq!(result.distance, 12.5);
        assert_eq!(result.generations, 0);
        assert_eq!(result.stop_reason, StopReason::Trivial);
    }

    #[test]
    fn fewer_than_two_waypoints_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in 0..2 {
            let result = optimizer(OptimizerConfig::default()).optimize(
                &DistanceMatrix::new(n),
                &mut rng,
                &CancellationToken::new(),
            );
            assert!(matches!(result, Err(TourError::DegenerateInput { count }) if count == n));
        }
    }

    #[test]
    fn missing_entry_is_fatal() {
        let full = unit_square();
        let mut matrix = DistanceMatrix::new(4);
        for ((i, j), d) in full.entries() {
            if (i, j) != (1, 3) {
                matrix.insert(i, j, d);
            }
        }

        let mut rng = StdRng::seed_from_u64(1);
        let result = optimizer(OptimizerConfig::default()).optimize(&matrix, &mut rng, &CancellationToken::new());
        assert!(matches!(result, Err(TourError::MissingDistance { i: 1, j: 3 })));
    }

    #[test]
    fn result_is_a_permutation_with_matching_distance() {
        let points = circle(12);
        let matrix = matrix_from(&points);
        let costs = matrix.to_dense().unwrap();

        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = optimizer(OptimizerConfig::default())
                .optimize(&matrix, &mut rng, &CancellationToken::new())
                .unwrap();

            assert!(is_permutation(&result.tour, 12));
            assert!((tour_distance(&result.tour, &costs) - result.distance).abs() < 1e-9);
        }
    }

    #[test]
    fn finds_a_short_tour_around_a_circle() {
        let n = 10;
        let matrix = matrix_from(&circle(n));
        let perimeter = n as f64 * 2.0 * (std::f64::consts::PI / n as f64).sin();

        let config = OptimizerConfig {
            max_stagnant_attempts: 100,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2024);
        let result = optimizer(config)
            .optimize(&matrix, &mut rng, &CancellationToken::new())
            .unwrap();

        assert!(result.distance >= perimeter - 1e-9);
        assert!(result.distance < perimeter * 1.25, "{} vs optimum {}", result.distance, perimeter);
    }

    #[test]
    fn best_fitness_history_never_increases() {
        let matrix = matrix_from(&circle(15));
        let mut rng = StdRng::seed_from_u64(3);
        let result = optimizer(OptimizerConfig {
            max_stagnant_attempts: 30,
            ..Default::default()
        })
        .optimize(&matrix, &mut rng, &CancellationToken::new())
        .unwrap();

        assert_eq!(result.history.len(), result.generations + 1);
        assert!(result.history.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(result.history.last().copied(), Some(result.distance));
    }

    #[test]
    fn stops_exactly_after_stagnation_limit() {
        let matrix = matrix_from(&circle(9));
        for k in [1, 5, 20] {
            let mut rng = StdRng::seed_from_u64(k as u64);
            let result = optimizer(OptimizerConfig {
                max_stagnant_attempts: k,
                ..Default::default()
            })
            .optimize(&matrix, &mut rng, &CancellationToken::new())
            .unwrap();

            let last_improvement = result
                .history
                .windows(2)
                .rposition(|w| w[1] < w[0])
                .map(|p| p + 1)
                .unwrap_or(0);
            assert_eq!(result.stop_reason, StopReason::Stagnated);
            assert_eq!(result.generations, last_improvement + k);
        }
    }

    #[test]
    fn generation_cap_is_honoured() {
        let matrix = matrix_from(&circle(8));
        let mut rng = StdRng::seed_from_u64(11);
        let result = optimizer(OptimizerConfig {
            max_stagnant_attempts: 1_000,
            max_generations: Some(3),
            ..Default::default()
        })
        .optimize(&matrix, &mut rng, &CancellationToken::new())
        .unwrap();

        assert_eq!(result.generations, 3);
        assert_eq!(result.stop_reason, StopReason::GenerationLimit);
    }

    #[test]
    fn cancelled_search_returns_best_so_far() {
        let matrix = matrix_from(&circle(8));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut rng = StdRng::seed_from_u64(5);
        let result = optimizer(OptimizerConfig::default())
            .optimize(&matrix, &mut rng, &cancel)
            .unwrap();

        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.generations, 0);
        assert!(is_permutation(&result.tour, 8));
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let matrix = matrix_from(&circle(11));
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            optimizer(OptimizerConfig::default())
                .optimize(&matrix, &mut rng, &CancellationToken::new())
                .unwrap()
        };

        let (a, b) = (run(42), run(42));
        assert_eq!(a.tour, b.tour);
        assert_eq!(a.distance, b.distance);
        assert_eq!(a.generations, b.generations);
    }

    #[test]
    fn order_crossover_keeps_slice_and_permutation() {
        let mut rng = StdRng::seed_from_u64(17);
        let parent1: Tour = (0..9).collect();
        let parent2: Tour = vec![8, 6, 4, 2, 0, 1, 3, 5, 7];

        for _ in 0..200 {
            let child = order_crossover(&parent1, &parent2, &mut rng);
            assert!(is_permutation(&child, 9), "{:?}", child);
        }
    }

    #[test]
    fn order_crossover_fills_in_donor_order() {
        // Deterministic check of the fill rule with a fixed slice
        let parent1 = [0, 1, 2, 3, 4, 5];
        let parent2 = [5, 4, 3, 2, 1, 0];
        let mut rng = StdRng::seed_from_u64(0);
        let child = order_crossover(&parent1, &parent2, &mut rng);

        let kept: Vec<usize> = child
            .iter()
            .enumerate()
            .filter(|&(i, &g)| parent1[i] == g)
            .map(|(_, &g)| g)
            .collect();
        let filled: Vec<usize> = child.iter().copied().filter(|g| !kept.contains(g)).collect();
        let donor_order: Vec<usize> = parent2.iter().copied().filter(|g| !kept.contains(g)).collect();
        assert_eq!(filled, donor_order);
    }

    #[test]
    fn swap_mutation_moves_exactly_two_genes() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..100 {
            let mut tour: Tour = (0..6).collect();
            swap_mutation(&mut tour, &mut rng);
            let moved = tour.iter().enumerate().filter(|&(i, &g)| i != g).count();
            assert_eq!(moved, 2);
        }
    }

    #[test]
    fn tour_distance_closes_the_cycle() {
        let costs = unit_square().to_dense().unwrap();
        assert!((tour_distance(&[0, 1, 2, 3], &costs) - 4.0).abs() < 1e-12);
        assert!((tour_distance(&[0, 2, 1, 3], &costs) - (2.0 + 2.0 * 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let result = TourOptimizer::new(OptimizerConfig {
            mutation_probability: -0.1,
            ..Default::default()
        });
        assert!(matches!(result, Err(TourError::InvalidConfig(_))));
    }
}
