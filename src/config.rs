use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, TourError};
use crate::model::Waypoint;

// =================== OPTIMIZER SETTINGS ===================

/// Genetic search parameters.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    pub population_size: usize,         // Candidate tours kept per generation
    pub mutation_probability: f64,      // Chance an offspring gets a swap mutation
    pub max_stagnant_attempts: usize,   // Consecutive generations without improvement before stopping
    pub max_generations: Option<usize>, // Optional hard cap on generations
    pub tournament_size: usize,         // Candidates drawn per parent selection
    pub elite_fraction: f64,            // Share of best tours copied unchanged
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            mutation_probability: 0.1,
            max_stagnant_attempts: 10,
            max_generations: None,
            tournament_size: 5,
            elite_fraction: 0.1,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(TourError::InvalidConfig(format!(
                "mutation_probability must be within [0, 1], got {}",
                self.mutation_probability
            )));
        }
        if self.max_stagnant_attempts == 0 {
            return Err(TourError::InvalidConfig(
                "max_stagnant_attempts must be positive".to_string(),
            ));
        }
        if self.population_size < 2 {
            return Err(TourError::InvalidConfig(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.tournament_size == 0 {
            return Err(TourError::InvalidConfig(
                "tournament_size must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.elite_fraction) {
            return Err(TourError::InvalidConfig(format!(
                "elite_fraction must be within [0, 1), got {}",
                self.elite_fraction
            )));
        }
        Ok(())
    }

    /// Number of top candidates carried over unchanged each generation.
    pub fn elite_count(&self) -> usize {
        ((self.population_size as f64 * self.elite_fraction).ceil() as usize)
            .min(self.population_size.saturating_sub(1))
            .max(1)
    }
}

// =================== MATRIX SETTINGS ===================

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MatrixConfig {
    /// Concurrent distance queries; `None` uses one per core.
    pub workers: Option<usize>,
}

// =================== PROBLEM FILE ===================

/// A planning run as read from disk. The first waypoint is the origin.
#[derive(Deserialize, Debug, Clone)]
pub struct Problem {
    #[serde(default = "default_name")]
    pub name: String,
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
}

fn default_name() -> String {
    "tour".to_string()
}

/// Reads and parses a problem from a JSON file.
pub fn read_problem(path: impl AsRef<Path>) -> Result<Problem> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let problem: Problem = serde_json::from_reader(reader)?;
    Ok(problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_mutation_probability() {
        let config = OptimizerConfig {
            mutation_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TourError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_stagnation_limit() {
        let config = OptimizerConfig {
            max_stagnant_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TourError::InvalidConfig(_))));
    }

    #[test]
    fn elite_count_leaves_room_for_offspring() {
        let config = OptimizerConfig {
            population_size: 2,
            elite_fraction: 0.9,
            ..Default::default()
        };
        assert_eq!(config.elite_count(), 1);
        assert_eq!(OptimizerConfig::default().elite_count(), 20);
    }

    #[test]
    fn reads_problem_with_partial_optimizer_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "name": "hamburg",
                "waypoints": [
                    {{"latitude": 53.622673, "longitude": 10.028393, "name": "Starting Point"}},
                    {{"latitude": 53.63, "longitude": 10.03, "name": "Zone A"}}
                ],
                "optimizer": {{"mutation_probability": 0.3, "max_stagnant_attempts": 1000}}
            }}"#
        )
        .unwrap();

        let problem = read_problem(file.path()).unwrap();
        assert_eq!(problem.name, "hamburg");
        assert_eq!(problem.waypoints.len(), 2);
        assert_eq!(problem.waypoints[0].name, "Starting Point");
        assert_eq!(problem.optimizer.mutation_probability, 0.3);
        assert_eq!(problem.optimizer.max_stagnant_attempts, 1000);
        assert_eq!(problem.optimizer.population_size, 200);
        assert_eq!(problem.matrix.workers, None);
    }
}
