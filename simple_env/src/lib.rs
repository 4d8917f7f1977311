// simple_env/src/lib.rs
//
// Python bindings for the guess-the-target environment.
//
// - SimpleEnv: reset() -> int, step(action) -> (obs, reward, done)
// - VecEnv: N environments stepped together
//
// All operations are deterministic given seeds.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use simpletest::{
    ConfigError, EnvConfig, SimpleEnv as RustSimpleEnv, StepInfo, VecEnv as RustVecEnv,
};

fn to_py_err(err: ConfigError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn make_env_config(max_steps: u32, num_targets: i32) -> PyResult<EnvConfig> {
    let cfg = EnvConfig {
        max_steps,
        num_targets,
        ..EnvConfig::default()
    };
    cfg.validate().map_err(to_py_err)?;
    Ok(cfg)
}

/// Convert a StepInfo to a Python dictionary.
fn step_info_to_dict(py: Python<'_>, info: &StepInfo) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);

    dict.set_item("step", info.step)?;
    dict.set_item(
        "termination_reason",
        info.termination_reason.map(|r| r.as_str()),
    )?;
    dict.set_item("target_hit", info.target_hit)?;
    dict.set_item("seed", info.seed)?;

    Ok(dict.into())
}

/// Guess-the-target environment.
///
/// The environment is reset on construction.
#[pyclass]
pub struct SimpleEnv {
    inner: RustSimpleEnv,
}

#[pymethods]
impl SimpleEnv {
    /// Create a new environment.
    ///
    /// Args:
    ///     max_steps: Steps before the episode is cut off (default: 100)
    ///     num_targets: Target is drawn from range(num_targets) (default: 10)
    ///     seed: Optional seed for the stream of episode seeds
    #[new]
    #[pyo3(signature = (max_steps=100, num_targets=10, seed=None))]
    fn new(max_steps: u32, num_targets: i32, seed: Option<u64>) -> PyResult<Self> {
        let cfg = make_env_config(max_steps, num_targets)?;
        let inner = match seed {
            Some(seed) => RustSimpleEnv::with_seed(cfg, seed),
            None => RustSimpleEnv::new(cfg),
        }
        .map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Reset the environment and return the initial observation (0).
    #[pyo3(signature = (seed=None))]
    fn reset(&mut self, seed: Option<u64>) -> u32 {
        self.inner.reset(seed)
    }

    /// Take a step.
    ///
    /// Returns:
    ///     Tuple of (observation, reward, done)
    fn step(&mut self, action: i32) -> (u32, f64, bool) {
        let result = self.inner.step(action);
        (result.observation, result.reward, result.done)
    }

    /// Take a step and also return an info dict.
    ///
    /// Returns:
    ///     Tuple of (observation, reward, done, info)
    fn step_with_info(
        &mut self,
        py: Python<'_>,
        action: i32,
    ) -> PyResult<(u32, f64, bool, Py<PyDict>)> {
        let result = self.inner.step(action);
        let info = step_info_to_dict(py, &result.info)?;
        Ok((result.observation, result.reward, result.done, info))
    }

    #[getter]
    fn step_count(&self) -> u32 {
        self.inner.step_count()
    }

    #[getter]
    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    #[getter]
    fn seed(&self) -> u64 {
        self.inner.seed()
    }

    #[getter]
    fn max_steps(&self) -> u32 {
        self.inner.config().max_steps
    }

    fn __repr__(&self) -> String {
        format!(
            "SimpleEnv(step_count={}, done={}, seed={})",
            self.inner.step_count(),
            self.inner.is_done(),
            self.inner.seed()
        )
    }
}

/// Vectorised environment.
#[pyclass]
pub struct VecEnv {
    inner: RustVecEnv,
}

#[pymethods]
impl VecEnv {
    /// Create N environments.
    ///
    /// Args:
    ///     n: Number of environments
    ///     max_steps: Steps before each episode is cut off (default: 100)
    ///     num_targets: Target range size (default: 10)
    #[new]
    #[pyo3(signature = (n, max_steps=100, num_targets=10))]
    fn new(n: usize, max_steps: u32, num_targets: i32) -> PyResult<Self> {
        let cfg = make_env_config(max_steps, num_targets)?;
        let inner = RustVecEnv::new(n, cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Reset all environments with optional per-environment seeds.
    #[pyo3(signature = (seeds=None))]
    fn reset_all(&mut self, seeds: Option<Vec<u64>>) -> Vec<u32> {
        self.inner.reset_all(seeds.as_deref())
    }

    /// Step all environments.
    ///
    /// Returns:
    ///     Tuple of (observations, rewards, dones)
    fn step(&mut self, actions: Vec<i32>) -> PyResult<(Vec<u32>, Vec<f64>, Vec<bool>)> {
        let results = self.inner.step(&actions).map_err(to_py_err)?;

        let observations = results.iter().map(|r| r.observation).collect();
        let rewards = results.iter().map(|r| r.reward).collect();
        let dones = results.iter().map(|r| r.done).collect();

        Ok((observations, rewards, dones))
    }

    #[getter]
    fn num_envs(&self) -> usize {
        self.inner.num_envs()
    }

    fn seeds(&self) -> Vec<u64> {
        self.inner.seeds()
    }

    fn dones(&self) -> Vec<bool> {
        self.inner.dones()
    }
}

/// Default episode step limit.
#[pyfunction]
fn default_max_steps() -> u32 {
    EnvConfig::default().max_steps
}

/// Python module definition.
#[pymodule]
fn simple_env(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<SimpleEnv>()?;
    m.add_class::<VecEnv>()?;
    m.add_function(wrap_pyfunction!(default_max_steps, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_env_config_rejects_zero_targets() {
        assert!(make_env_config(100, 0).is_err());
    }

    #[test]
    fn test_step_returns_obs_reward_done() {
        let mut env = SimpleEnv::new(100, 10, Some(42)).unwrap();
        assert_eq!(env.reset(Some(1)), 0);
        let (obs, reward, done) = env.step(-1);
        assert_eq!(obs, 1);
        assert!((reward - (-0.1)).abs() < 1e-12);
        assert!(!done);
        assert_eq!(env.step_count(), 1);
    }

    #[test]
    fn test_vec_env_step_length_mismatch() {
        let mut env = VecEnv::new(2, 100, 10).unwrap();
        env.reset_all(Some(vec![1, 2]));
        assert!(env.step(vec![0]).is_err());
        let (obs, _, _) = env.step(vec![-1, -1]).unwrap();
        assert_eq!(obs, vec![1, 1]);
    }
}
