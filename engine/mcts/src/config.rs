//! Search configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("thread count must be at least 1")]
    ZeroThreads,

    #[error("determinization count must be at least 1")]
    ZeroDeterminizations,

    #[error("either an iteration budget or a time budget is required")]
    NoBudget,

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidConstant { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("playouts per simulation must be at least 1")]
    ZeroPlayouts,

    #[error("determinization attempts must be at least 1")]
    ZeroAttempts,

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// How the move to play is picked from the root's children once the budget
/// is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSelectionPolicy {
    /// Most visited child.
    #[default]
    RobustChild,
    /// Highest average score for the player to move (plus bound biases).
    MaxChild,
    /// Highest pessimistic bound; ties go to the more visited child.
    BoundSecureChild,
}

impl FromStr for FinalSelectionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "robustchild" | "robust" => Ok(Self::RobustChild),
            "maxchild" | "max" => Ok(Self::MaxChild),
            "boundsecurechild" | "secure" => Ok(Self::BoundSecureChild),
            _ => Err(ConfigError::UnknownVariant {
                kind: "final selection policy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FinalSelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RobustChild => "robust_child",
            Self::MaxChild => "max_child",
            Self::BoundSecureChild => "bound_secure_child",
        };
        f.write_str(name)
    }
}

/// How work is split across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// Independent trees for hidden information, one shared tree otherwise.
    #[default]
    Auto,
    /// One private tree per determinization, merged at the end.
    IndependentTrees,
    /// One tree mutated concurrently by every thread.
    SharedTree,
}

impl FromStr for Parallelism {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "auto" => Ok(Self::Auto),
            "independenttrees" | "independent" | "root" => Ok(Self::IndependentTrees),
            "sharedtree" | "shared" | "tree" => Ok(Self::SharedTree),
            _ => Err(ConfigError::UnknownVariant {
                kind: "parallelism",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::IndependentTrees => "independent_trees",
            Self::SharedTree => "shared_tree",
        };
        f.write_str(name)
    }
}

/// Playing strength presets.
///
/// Each level fixes a determinization factor, a thinking time and an
/// iteration budget per tree. The number of determinizations grows with the
/// number of tricks still to be played, see
/// [`StrengthLevel::determinizations_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    FastTest,
    Test,
    Fast,
    Strong,
    Powerful,
    Extreme,
    Insane,
    Superman,
    Ironman,
}

impl StrengthLevel {
    /// (determinization factor, thinking time in ms, iterations per tree)
    const fn params(self) -> (usize, u64, u64) {
        match self {
            Self::FastTest => (1, 50, 10),
            Self::Test => (2, 100, 20),
            Self::Fast => (4, 200, 40),
            Self::Strong => (6, 500, 100),
            Self::Powerful => (8, 1000, 200),
            Self::Extreme => (12, 2000, 400),
            Self::Insane => (16, 2500, 500),
            Self::Superman => (32, 5000, 1000),
            Self::Ironman => (32, 10000, 2000),
        }
    }

    pub fn determinization_factor(self) -> usize {
        self.params().0
    }

    pub fn thinking_time(self) -> Duration {
        Duration::from_millis(self.params().1)
    }

    pub fn iterations(self) -> u64 {
        self.params().2
    }

    /// Number of determinizations to run when `remaining` decisions (tricks)
    /// are left. Never less than one.
    pub fn determinizations_for(self, remaining: usize) -> usize {
        (self.determinization_factor() * remaining).max(1)
    }
}

impl FromStr for StrengthLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match normalize(s).as_str() {
            "fasttest" => Self::FastTest,
            "test" => Self::Test,
            "fast" => Self::Fast,
            "strong" => Self::Strong,
            "powerful" => Self::Powerful,
            "extreme" => Self::Extreme,
            "insane" => Self::Insane,
            "superman" => Self::Superman,
            "ironman" => Self::Ironman,
            _ => {
                return Err(ConfigError::UnknownVariant {
                    kind: "strength level",
                    value: s.to_string(),
                })
            }
        };
        Ok(level)
    }
}

/// Lowercase and strip separators so `bound_secure_child`,
/// `BoundSecureChild` and `bound-secure-child` all parse.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Configuration for a determinized Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Exploration constant `C` of UCB1. Higher values explore more.
    pub exploration: f64,

    /// Worker threads in the search pool.
    pub threads: usize,

    /// Independent determinizations per decision. `None` runs one per thread.
    /// Ignored when a shared tree is searched.
    pub determinizations: Option<usize>,

    /// Iterations per tree (independent trees) or per thread (shared tree).
    pub iterations: Option<u64>,

    /// Wall-clock budget for one decision.
    pub time_budget: Option<Duration>,

    pub final_selection: FinalSelectionPolicy,

    /// Mark branches dominated by proven bounds and stop selecting them.
    pub pruning: bool,

    pub parallelism: Parallelism,

    /// Rollouts averaged into one simulation result.
    pub playouts: u32,

    /// Weight of a child's optimistic bound in selection and MaxChild.
    pub optimistic_bias: f64,

    /// Weight of a child's pessimistic bound in selection and MaxChild.
    pub pessimistic_bias: f64,

    /// Constrained sampling attempts before falling back to a relaxed deal.
    pub determinization_attempts: u32,

    /// Base seed; every decision and every task derive their own stream.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration: std::f64::consts::SQRT_2,
            threads: 4,
            determinizations: None,
            iterations: Some(1000),
            time_budget: None,
            final_selection: FinalSelectionPolicy::RobustChild,
            pruning: true,
            parallelism: Parallelism::Auto,
            playouts: 1,
            optimistic_bias: 0.0,
            pessimistic_bias: 0.0,
            determinization_attempts: 32,
            seed: 42,
        }
    }
}

impl SearchConfig {
    /// Create a fast, single-threaded config for testing.
    pub fn for_testing() -> Self {
        Self {
            threads: 1,
            iterations: Some(200),
            ..Self::default()
        }
    }

    /// Config matching a strength preset, `remaining` decisions before the
    /// end of the game.
    pub fn for_strength(level: StrengthLevel, remaining: usize) -> Self {
        Self {
            determinizations: Some(level.determinizations_for(remaining)),
            iterations: Some(level.iterations()),
            time_budget: Some(level.thinking_time()),
            ..Self::default()
        }
    }

    /// Builder pattern: set iteration budget.
    pub fn with_iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Builder pattern: set time budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Builder pattern: set thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Builder pattern: set number of determinizations.
    pub fn with_determinizations(mut self, n: usize) -> Self {
        self.determinizations = Some(n);
        self
    }

    /// Builder pattern: set exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    pub fn with_final_selection(mut self, policy: FinalSelectionPolicy) -> Self {
        self.final_selection = policy;
        self
    }

    pub fn with_pruning(mut self, enabled: bool) -> Self {
        self.pruning = enabled;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_playouts(mut self, playouts: u32) -> Self {
        self.playouts = playouts;
        self
    }

    pub fn with_biases(mut self, optimistic: f64, pessimistic: f64) -> Self {
        self.optimistic_bias = optimistic;
        self.pessimistic_bias = pessimistic;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of independent determinizations a decision runs.
    pub fn determinization_count(&self) -> usize {
        self.determinizations.unwrap_or(self.threads)
    }

    /// Reject values the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.determinizations == Some(0) {
            return Err(ConfigError::ZeroDeterminizations);
        }
        if self.iterations.is_none() && self.time_budget.is_none() {
            return Err(ConfigError::NoBudget);
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(ConfigError::InvalidConstant {
                name: "exploration",
                value: self.exploration,
            });
        }
        for (name, value) in [
            ("optimistic_bias", self.optimistic_bias),
            ("pessimistic_bias", self.pessimistic_bias),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
        }
        if self.playouts == 0 {
            return Err(ConfigError::ZeroPlayouts);
        }
        if self.determinization_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}
