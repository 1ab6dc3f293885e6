use std::env;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use tnet::TimeUnit;

/// Reads a value from an environment variable, falling back to a hardcoded
/// default when the variable is unset or fails to parse. Mirrors the
/// teacher's `env_param::EnvParam<T>` static-parameter pattern
/// (`EnvParam::new("ARIES_LCP_SYMMETRY_BREAKING", "simple")`) for the one
/// setting that is genuinely environment-tunable here: the external temporal
/// solver binary's path.
pub struct EnvParam<T> {
    key: &'static str,
    default: &'static str,
    _marker: PhantomData<T>,
}

impl<T: FromStr> EnvParam<T> {
    pub const fn new(key: &'static str, default: &'static str) -> Self {
        EnvParam { key, default, _marker: PhantomData }
    }

    /// Re-reads the environment on every call rather than caching, so tests
    /// that set the variable mid-run observe the change.
    pub fn get(&self) -> T
    where
        T::Err: std::fmt::Debug,
    {
        env::var(self.key).ok().and_then(|v| v.parse().ok()).unwrap_or_else(|| {
            self.default.parse().unwrap_or_else(|e| panic!("default for {:?} does not parse: {e:?}", self.key))
        })
    }
}

/// Names the external temporal CSP solver binary, if one is configured. Empty
/// means none: the coordinator runs on the Floyd–Warshall fallback and the
/// conservative checker alone.
pub static EXTERNAL_SOLVER_PATH: EnvParam<String> = EnvParam::new("CHRONOPLAN_EXTERNAL_SOLVER", "");

/// Runtime configuration threaded through [`crate::PlannerBuilder`] into the
/// coordinator and STN solver. Every field here corresponds to one of
/// `stevewillcock-aries`'s scattered `EnvParam` statics, collected into a
/// single struct since this system has few enough settings that a builder is
/// clearer than per-setting environment lookups sprinkled through the code.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Seed for the deterministic RNG threaded through tie-breaking;
    /// `Coordinator`/`PlanOptions` default to 0 per spec §5.
    pub seed: u64,
    pub max_retries: u32,
    pub solver_timeout_ms: u64,
    pub verify_goals: bool,
    pub lod_resolution: f64,
    pub time_unit: TimeUnit,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            seed: 0,
            max_retries: 5,
            solver_timeout_ms: 500,
            verify_goals: false,
            lod_resolution: 1000.0,
            time_unit: TimeUnit::Seconds,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    pub fn new() -> Self {
        PlannerConfigBuilder::default()
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn solver_timeout_ms(mut self, ms: u64) -> Self {
        self.config.solver_timeout_ms = ms;
        self
    }

    pub fn verify_goals(mut self, verify: bool) -> Self {
        self.config.verify_goals = verify;
        self
    }

    pub fn lod_resolution(mut self, resolution: f64) -> Self {
        self.config.lod_resolution = resolution;
        self
    }

    pub fn time_unit(mut self, unit: TimeUnit) -> Self {
        self.config.time_unit = unit;
        self
    }

    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

/// Resolves the configured external solver binary path, if any is set.
pub fn external_solver_path() -> Option<PathBuf> {
    let raw = EXTERNAL_SOLVER_PATH.get();
    if raw.is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.seed, 0);
        assert!(!config.verify_goals);
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let config = PlannerConfigBuilder::new().seed(7).max_retries(2).verify_goals(true).build();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_retries, 2);
        assert!(config.verify_goals);
    }

    #[test]
    fn external_solver_path_is_none_by_default() {
        assert!(external_solver_path().is_none());
    }
}
