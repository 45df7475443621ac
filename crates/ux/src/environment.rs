//! Environment-side data: generated names, build status and the YAML
//! specification typed into the editor

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{UxError, UxResult};

/// Prefix of every generated environment name
pub const NAME_PREFIX: &str = "test_env_";

/// Largest random suffix (inclusive)
pub const NAME_SUFFIX_MAX: u32 = 100_000;

/// Specification written into the raw YAML editor. The trailing blank line
/// matches what the editor produces on its own.
pub const REPLACEMENT_YAML: &str = "channels:\n  - conda-forge\ndependencies:\n  - rich\n  - python\n  - pip:\n      - nothing\n  - ipykernel\n\n";

/// Name of an environment created by this run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues `test_env_<n>` names, never the same one twice per generator.
///
/// Reruns against the same server only avoid collisions probabilistically,
/// bounded by the suffix range.
pub struct NameGenerator<R> {
    rng: R,
    issued: HashSet<String>,
}

impl NameGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> NameGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            issued: HashSet::new(),
        }
    }

    pub fn next_name(&mut self) -> UxResult<EnvironmentName> {
        let capacity = NAME_SUFFIX_MAX as usize + 1;
        if self.issued.len() >= capacity {
            return Err(UxError::NamesExhausted(capacity));
        }

        loop {
            let suffix = self.rng.gen_range(0..=NAME_SUFFIX_MAX);
            let name = format!("{}{}", NAME_PREFIX, suffix);
            if self.issued.insert(name.clone()) {
                return Ok(EnvironmentName(name));
            }
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

/// Build status shown by the UI. Observed only; the server owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Building,
    Completed,
}

impl BuildStatus {
    /// Text the UI displays for this status
    pub fn label(&self) -> &'static str {
        match self {
            BuildStatus::Building => "Building",
            BuildStatus::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Completed)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Minimal conda environment specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Conda(String),
    Pip { pip: Vec<String> },
}

impl EnvironmentSpec {
    pub fn from_yaml(yaml: &str) -> UxResult<Self> {
        serde_yaml::from_str(yaml).map_err(UxError::from)
    }

    /// The specification in `REPLACEMENT_YAML`
    pub fn replacement() -> UxResult<Self> {
        Self::from_yaml(REPLACEMENT_YAML)
    }

    pub fn conda_packages(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().filter_map(|dep| match dep {
            Dependency::Conda(name) => Some(name.as_str()),
            Dependency::Pip { .. } => None,
        })
    }

    pub fn pip_packages(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter_map(|dep| match dep {
                Dependency::Pip { pip } => Some(pip.iter().map(String::as_str)),
                Dependency::Conda(_) => None,
            })
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_format() {
        let mut names = NameGenerator::with_rng(StdRng::seed_from_u64(7));
        let name = names.next_name().unwrap();
        let suffix: u32 = name
            .as_str()
            .strip_prefix(NAME_PREFIX)
            .expect("prefix")
            .parse()
            .expect("numeric suffix");
        assert!(suffix <= NAME_SUFFIX_MAX);
    }

    #[test]
    fn test_names_unique_within_run() {
        let mut names = NameGenerator::with_rng(StdRng::seed_from_u64(42));
        let mut seen = HashSet::new();
        for _ in 0..5_000 {
            let name = names.next_name().unwrap();
            assert!(seen.insert(name), "duplicate name issued");
        }
        assert_eq!(names.issued(), 5_000);
    }

    #[test]
    fn test_names_exhausted() {
        let mut names = NameGenerator::with_rng(StdRng::seed_from_u64(1));
        names.issued = (0..=NAME_SUFFIX_MAX)
            .map(|n| format!("{}{}", NAME_PREFIX, n))
            .collect();
        assert!(matches!(names.next_name(), Err(UxError::NamesExhausted(_))));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(BuildStatus::Building.label(), "Building");
        assert_eq!(BuildStatus::Completed.to_string(), "Completed");
        assert!(BuildStatus::Completed.is_terminal());
        assert!(!BuildStatus::Building.is_terminal());
    }

    #[test]
    fn test_replacement_spec() {
        let spec = EnvironmentSpec::replacement().unwrap();
        assert_eq!(spec.channels, vec!["conda-forge"]);
        assert_eq!(
            spec.conda_packages().collect::<Vec<_>>(),
            vec!["rich", "python", "ipykernel"]
        );
        assert_eq!(spec.pip_packages().collect::<Vec<_>>(), vec!["nothing"]);
    }
}
