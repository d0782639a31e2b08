// Identifiers handed to the workflow engine. Opaque on this side: the engine
// owns their syntax and decides whether they are valid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One point in the workflow's repetition, e.g. `201808121200`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleIdentifier(String);

impl CycleIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CycleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CycleIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CycleIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CycleIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A named group of tasks within the workflow, e.g. `gsi`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskListIdentifier(String);

impl TaskListIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskListIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskListIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskListIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskListIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_passed_through_verbatim() {
        let cycle = CycleIdentifier::from(" 2018-08-12 12:00 ");
        let tasks = TaskListIdentifier::from("");

        assert_eq!(cycle.as_str(), " 2018-08-12 12:00 ");
        assert_eq!(tasks.to_string(), "");
    }

    #[test]
    fn test_identifiers_serialize_as_plain_strings() {
        #[derive(Serialize, Deserialize)]
        struct Target {
            cycle: CycleIdentifier,
            task_list: TaskListIdentifier,
        }

        let parsed: Target = toml::from_str("cycle = \"201808121200\"\ntask_list = \"gsi\"\n").unwrap();
        assert_eq!(parsed.cycle, CycleIdentifier::new("201808121200"));
        assert_eq!(parsed.task_list.as_ref(), "gsi");

        let rendered = toml::to_string(&parsed).unwrap();
        assert!(rendered.contains("cycle = \"201808121200\""));
    }
}
