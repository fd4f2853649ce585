use std::fmt;

/// Opaque identifier of a logical management plane instance.
///
/// A single process may federate against several management nodes; [`ManagementNodeId::default_node`]
/// stands in for callers that never configured one explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ManagementNodeId(String);

impl ManagementNodeId {
    pub const DEFAULT: &'static str = "default";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel id used when a job's parameters don't carry one.
    pub fn default_node() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Option<String>> for ManagementNodeId {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(id) if !id.is_empty() => Self(id),
            _ => Self::default_node(),
        }
    }
}

impl fmt::Display for ManagementNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
