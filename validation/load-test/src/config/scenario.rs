//! Load profiles: how many concurrent journeys run, and for how long.

use super::duration::serde_compact;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Scenario used when none is requested.
pub const DEFAULT_SCENARIO: &str = "baseline";

/// One leg of a ramp: move linearly to `target` VUs over `duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "serde_compact")]
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// How journeys are scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum Executor {
    /// Vary the number of VUs through a list of stages.
    RampingVus {
        #[serde(default)]
        start_vus: u32,
        stages: Vec<Stage>,
        #[serde(default = "default_graceful_ramp_down", with = "serde_compact")]
        graceful_ramp_down: Duration,
    },
    /// A fixed number of VUs looping for a fixed time.
    ConstantVus {
        vus: u32,
        #[serde(with = "serde_compact")]
        duration: Duration,
    },
    /// A fixed number of iterations shared between VUs.
    SharedIterations {
        vus: u32,
        iterations: u64,
        #[serde(default = "default_max_duration", with = "serde_compact")]
        max_duration: Duration,
    },
}

fn default_graceful_ramp_down() -> Duration {
    Duration::from_secs(30)
}

fn default_max_duration() -> Duration {
    Duration::from_secs(600)
}

fn default_graceful_stop() -> Duration {
    Duration::from_secs(30)
}

impl Executor {
    pub fn kind(&self) -> &'static str {
        match self {
            Executor::RampingVus { .. } => "ramping-vus",
            Executor::ConstantVus { .. } => "constant-vus",
            Executor::SharedIterations { .. } => "shared-iterations",
        }
    }

    /// Highest number of VUs this executor ever runs.
    pub fn max_vus(&self) -> u32 {
        match self {
            Executor::RampingVus {
                start_vus, stages, ..
            } => stages.iter().map(|s| s.target).fold(*start_vus, u32::max),
            Executor::ConstantVus { vus, .. } | Executor::SharedIterations { vus, .. } => *vus,
        }
    }

    /// Scheduled run time, excluding graceful stop periods.
    pub fn duration(&self) -> Duration {
        match self {
            Executor::RampingVus { stages, .. } => stages.iter().map(|s| s.duration).sum(),
            Executor::ConstantVus { duration, .. } => *duration,
            Executor::SharedIterations { max_duration, .. } => *max_duration,
        }
    }
}

/// A named load profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub executor: Executor,
    /// How long in-flight journeys may run past the scheduled end.
    #[serde(default = "default_graceful_stop", with = "serde_compact")]
    pub graceful_stop: Duration,
}

impl Scenario {
    /// Validate executor parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidScenario {
            name: self.name.clone(),
            message: message.to_string(),
        };
        match &self.executor {
            Executor::RampingVus { stages, .. } => {
                if stages.is_empty() {
                    return Err(invalid("ramping-vus needs at least one stage"));
                }
                if self.executor.max_vus() == 0 {
                    return Err(invalid("ramping-vus never exceeds 0 VUs"));
                }
            }
            Executor::ConstantVus { vus, duration } => {
                if *vus == 0 {
                    return Err(invalid("vus must be > 0"));
                }
                if duration.is_zero() {
                    return Err(invalid("duration must be > 0"));
                }
            }
            Executor::SharedIterations {
                vus, iterations, ..
            } => {
                if *vus == 0 {
                    return Err(invalid("vus must be > 0"));
                }
                if *iterations == 0 {
                    return Err(invalid("iterations must be > 0"));
                }
            }
        }
        Ok(())
    }
}

/// Number of VUs a ramping executor wants active `elapsed` into the run.
///
/// Targets move linearly from the previous stage's target (or `start_vus`)
/// to the current stage's target. Past the last stage, the last target holds.
pub fn target_vus_at(start_vus: u32, stages: &[Stage], elapsed: Duration) -> u32 {
    let mut from = start_vus;
    let mut stage_start = Duration::ZERO;
    for stage in stages {
        let stage_end = stage_start + stage.duration;
        if elapsed < stage_end {
            let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
            let delta = stage.target as f64 - from as f64;
            return (from as f64 + delta * progress).round() as u32;
        }
        from = stage.target;
        stage_start = stage_end;
    }
    from
}

/// All known scenarios keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCatalog {
    pub scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioCatalog {
    /// Scenarios shipped with the suite.
    pub fn builtin() -> Self {
        let secs = Duration::from_secs;
        let entries = [
            Scenario {
                name: "baseline".to_string(),
                description: "Gentle ramp to 5 VUs to establish reference numbers".to_string(),
                executor: Executor::RampingVus {
                    start_vus: 0,
                    stages: vec![
                        Stage::new(secs(30), 2),
                        Stage::new(secs(60), 5),
                        Stage::new(secs(30), 0),
                    ],
                    graceful_ramp_down: secs(15),
                },
                graceful_stop: secs(30),
            },
            Scenario {
                name: "stress".to_string(),
                description: "Ramp to 20 VUs over three minutes".to_string(),
                executor: Executor::RampingVus {
                    start_vus: 0,
                    stages: vec![Stage::new(secs(180), 20)],
                    graceful_ramp_down: secs(30),
                },
                graceful_stop: secs(35),
            },
            Scenario {
                name: "load".to_string(),
                description: "Hold 10 VUs for three minutes".to_string(),
                executor: Executor::RampingVus {
                    start_vus: 0,
                    stages: vec![
                        Stage::new(secs(60), 10),
                        Stage::new(secs(180), 10),
                        Stage::new(secs(60), 0),
                    ],
                    graceful_ramp_down: secs(30),
                },
                graceful_stop: secs(30),
            },
            Scenario {
                name: "smoke".to_string(),
                description: "One journey end to end".to_string(),
                executor: Executor::SharedIterations {
                    vus: 1,
                    iterations: 1,
                    max_duration: secs(120),
                },
                graceful_stop: secs(30),
            },
        ];

        Self {
            scenarios: entries.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Load scenarios from a YAML file of the form `scenarios: {name: {...}}`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut catalog: ScenarioCatalog = serde_yaml::from_str(content)?;
        for (name, scenario) in catalog.scenarios.iter_mut() {
            scenario.name = name.clone();
            scenario.validate()?;
        }
        Ok(catalog)
    }

    /// Add `other`'s scenarios, replacing any with the same name.
    pub fn merge(mut self, other: ScenarioCatalog) -> Self {
        self.scenarios.extend(other.scenarios);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }

    /// Look up a scenario; `None` selects [`DEFAULT_SCENARIO`].
    pub fn select(&self, name: Option<&str>) -> Result<&Scenario, ConfigError> {
        let name = name.unwrap_or(DEFAULT_SCENARIO);
        self.scenarios
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScenario {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_builtin_scenarios_are_valid() {
        let catalog = ScenarioCatalog::builtin();
        assert_eq!(catalog.names(), vec!["baseline", "load", "smoke", "stress"]);
        for scenario in catalog.scenarios.values() {
            scenario.validate().unwrap();
        }
    }

    #[test]
    fn test_select_defaults_to_baseline() {
        let catalog = ScenarioCatalog::builtin();
        assert_eq!(catalog.select(None).unwrap().name, "baseline");
        assert_eq!(catalog.select(Some("stress")).unwrap().executor.max_vus(), 20);
    }

    #[test]
    fn test_select_unknown_scenario() {
        let err = ScenarioCatalog::builtin().select(Some("soak")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScenario { ref name, .. } if name == "soak"));
        assert!(err.to_string().contains("baseline, load, smoke, stress"));
    }

    #[test]
    fn test_target_vus_interpolates() {
        let stages = [Stage::new(secs(30), 2), Stage::new(secs(60), 5), Stage::new(secs(30), 0)];
        assert_eq!(target_vus_at(0, &stages, secs(0)), 0);
        assert_eq!(target_vus_at(0, &stages, secs(15)), 1);
        assert_eq!(target_vus_at(0, &stages, secs(30)), 2);
        assert_eq!(target_vus_at(0, &stages, secs(60)), 4); // 2 + 3 * 0.5 = 3.5
        assert_eq!(target_vus_at(0, &stages, secs(90)), 5);
        assert_eq!(target_vus_at(0, &stages, secs(105)), 3); // 5 - 5 * 0.5 = 2.5
        assert_eq!(target_vus_at(0, &stages, secs(500)), 0);
    }

    #[test]
    fn test_target_vus_zero_length_stage_jumps() {
        let stages = [Stage::new(Duration::ZERO, 4), Stage::new(secs(10), 4)];
        assert_eq!(target_vus_at(0, &stages, secs(0)), 4);
    }

    #[test]
    fn test_duration_and_max_vus() {
        let baseline = ScenarioCatalog::builtin().select(None).unwrap().clone();
        assert_eq!(baseline.executor.duration(), secs(120));
        assert_eq!(baseline.executor.max_vus(), 5);
        assert_eq!(baseline.executor.kind(), "ramping-vus");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
scenarios:
  soak:
    description: Long steady run
    executor: constant-vus
    vus: 3
    duration: 1h
  spike:
    executor: ramping-vus
    stages:
      - duration: 10s
        target: 50
      - duration: 1m30s
        target: 0
    graceful_ramp_down: 5s
"#;
        let catalog = ScenarioCatalog::from_yaml(yaml).unwrap();
        let soak = catalog.select(Some("soak")).unwrap();
        assert_eq!(soak.name, "soak");
        assert_eq!(
            soak.executor,
            Executor::ConstantVus {
                vus: 3,
                duration: secs(3600)
            }
        );
        let spike = catalog.select(Some("spike")).unwrap();
        assert_eq!(spike.executor.duration(), secs(100));
        assert_eq!(spike.graceful_stop, secs(30));

        let merged = ScenarioCatalog::builtin().merge(catalog);
        assert_eq!(merged.names().len(), 6);
    }

    #[test]
    fn test_bundled_scenario_file() {
        let catalog = ScenarioCatalog::from_yaml(include_str!("../../scenarios/extended.yaml")).unwrap();
        assert_eq!(catalog.names(), vec!["regression", "soak", "spike"]);
        assert_eq!(catalog.select(Some("spike")).unwrap().executor.max_vus(), 30);
        assert_eq!(catalog.select(Some("soak")).unwrap().graceful_stop, secs(60));
    }

    #[test]
    fn test_from_yaml_rejects_invalid() {
        let yaml = "scenarios:\n  empty:\n    executor: shared-iterations\n    vus: 1\n    iterations: 0\n";
        assert!(matches!(
            ScenarioCatalog::from_yaml(yaml),
            Err(ConfigError::InvalidScenario { .. })
        ));
        let yaml = "scenarios:\n  bad:\n    executor: constant-vus\n    vus: 1\n    duration: soon\n";
        assert!(matches!(ScenarioCatalog::from_yaml(yaml), Err(ConfigError::Yaml(_))));
    }
}
