//! Dataflow file discovery
//!
//! Finds the YAML document describing an example's execution graph by naming
//! convention. Only the examples root is searched: hub agents are atomic and
//! carry no dataflow. Candidates are collected in directory-listing order,
//! which is filesystem-defined and deliberately not sorted here — callers
//! must not assume lexical order beyond "deterministic within one invocation
//! on an unchanged directory".

use crate::config::WorkspaceConfig;
use crate::error::AppError;
use crate::services::workspace::validate_agent_name;
use std::path::PathBuf;
use tracing::debug;

/// Suffix that marks a file as the conventional dataflow configuration
const DATAFLOW_SUFFIX: &str = "_dataflow.yml";

/// Result of a convention search
#[derive(Debug)]
pub struct DataflowDescriptor {
    /// First match in directory-listing order; what a run would use
    pub primary: String,
    /// Directory the search ran over
    pub agent_path: PathBuf,
    /// All matches found, for caller inspection
    pub candidates: Vec<String>,
}

/// Convention-based locator over the examples root
#[derive(Debug, Clone)]
pub struct DataflowLocator {
    examples_dir: PathBuf,
}

impl DataflowLocator {
    /// Create a locator over the configured examples root
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            examples_dir: config.examples_dir.clone(),
        }
    }

    /// Locate the dataflow configuration for an example
    ///
    /// Search order, first non-empty set wins:
    /// 1. entries named `*_dataflow.yml`
    /// 2. entries named `*.yml` or `*.yaml`
    ///
    /// Matching is by name only; entry type is not inspected.
    pub fn locate(&self, agent_name: &str) -> Result<DataflowDescriptor, AppError> {
        validate_agent_name(agent_name)?;

        let agent_path = self.examples_dir.join(agent_name);
        if !agent_path.is_dir() {
            return Err(AppError::AgentNotFound(format!(
                "{agent_name} not found in examples directory"
            )));
        }

        let entries = std::fs::read_dir(&agent_path)
            .map_err(|e| {
                AppError::OperationFailed(format!("Failed to read {agent_name}: {e}"))
            })?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect::<Vec<_>>();

        let conventional: Vec<String> = entries
            .iter()
            .filter(|name| name.ends_with(DATAFLOW_SUFFIX))
            .cloned()
            .collect();

        let candidates = if conventional.is_empty() {
            entries
                .iter()
                .filter(|name| name.ends_with(".yml") || name.ends_with(".yaml"))
                .cloned()
                .collect()
        } else {
            conventional
        };

        match candidates.first() {
            Some(primary) => {
                debug!(
                    agent = %agent_name,
                    dataflow = %primary,
                    candidates = candidates.len(),
                    "Located dataflow file"
                );
                Ok(DataflowDescriptor {
                    primary: primary.clone(),
                    agent_path,
                    candidates,
                })
            }
            None => Err(AppError::FileNotFound(format!(
                "No dataflow configuration file found in {agent_name}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn test_locator() -> (TempDir, DataflowLocator) {
        let temp = tempdir().expect("Failed to create temp dir");
        let config = WorkspaceConfig {
            hub_dir: temp.path().join("hub"),
            examples_dir: temp.path().join("examples"),
        };
        std::fs::create_dir_all(&config.examples_dir).unwrap();
        (temp, DataflowLocator::new(&config))
    }

    fn add_example(locator: &DataflowLocator, name: &str, files: &[&str]) {
        let dir = locator.examples_dir.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for file in files {
            std::fs::write(dir.join(file), "nodes: []\n").unwrap();
        }
    }

    #[test]
    fn test_locate_conventional_name() {
        let (_temp, locator) = test_locator();
        add_example(&locator, "demo", &["a.txt", "demo_dataflow.yml"]);

        let descriptor = locator.locate("demo").unwrap();
        assert_eq!(descriptor.primary, "demo_dataflow.yml");
        assert_eq!(descriptor.candidates, vec!["demo_dataflow.yml"]);
        assert!(descriptor.agent_path.ends_with("examples/demo"));
    }

    #[test]
    fn test_locate_prefers_convention_over_generic_yaml() {
        let (_temp, locator) = test_locator();
        add_example(
            &locator,
            "demo",
            &["settings.yml", "demo_dataflow.yml", "other.yaml"],
        );

        let descriptor = locator.locate("demo").unwrap();
        assert_eq!(descriptor.primary, "demo_dataflow.yml");
        assert_eq!(descriptor.candidates, vec!["demo_dataflow.yml"]);
    }

    #[test]
    fn test_locate_falls_back_to_generic_yaml() {
        let (_temp, locator) = test_locator();
        add_example(&locator, "demo", &["flow.yaml", "README.md"]);

        let descriptor = locator.locate("demo").unwrap();
        assert_eq!(descriptor.primary, "flow.yaml");
        assert_eq!(descriptor.candidates, vec!["flow.yaml"]);
    }

    #[test]
    fn test_locate_no_yaml_at_all() {
        let (_temp, locator) = test_locator();
        add_example(&locator, "demo", &["README.md"]);

        assert!(matches!(
            locator.locate("demo"),
            Err(AppError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_locate_missing_example() {
        let (_temp, locator) = test_locator();
        assert!(matches!(
            locator.locate("ghost"),
            Err(AppError::AgentNotFound(_))
        ));
    }

    #[test]
    fn test_locate_ignores_hub_root() {
        let (_temp, locator) = test_locator();
        // A hub agent of the same name must not satisfy the lookup.
        let hub_dir = locator.examples_dir.parent().unwrap().join("hub/demo");
        std::fs::create_dir_all(&hub_dir).unwrap();
        std::fs::write(hub_dir.join("demo_dataflow.yml"), "nodes: []\n").unwrap();

        assert!(matches!(
            locator.locate("demo"),
            Err(AppError::AgentNotFound(_))
        ));
    }
}
