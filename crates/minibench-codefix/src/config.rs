//! Codefix evaluator configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::host::FunctionHost;
use crate::node::NodeHost;
use crate::script::EmbeddedHost;

/// Which function host materializes patched code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    #[default]
    Embedded,
    Node,
}

impl HostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Embedded => "embedded",
            HostKind::Node => "node",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" => Ok(HostKind::Embedded),
            "node" => Ok(HostKind::Node),
            other => Err(format!(
                "unknown codefix host \"{}\" (expected embedded or node)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodefixConfig {
    #[serde(default)]
    pub host: HostKind,

    /// `node` executable for [`HostKind::Node`].
    #[serde(default = "default_node_bin")]
    pub node_bin: PathBuf,

    /// Per-verification timeout for the node host.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_node_bin() -> PathBuf {
    PathBuf::from("node")
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for CodefixConfig {
    fn default() -> Self {
        Self {
            host: HostKind::default(),
            node_bin: default_node_bin(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl CodefixConfig {
    pub fn with_host(mut self, host: HostKind) -> Self {
        self.host = host;
        self
    }

    pub fn with_node_bin(mut self, node_bin: impl Into<PathBuf>) -> Self {
        self.node_bin = node_bin.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Instantiate the configured host.
    pub fn build_host(&self) -> Arc<dyn FunctionHost> {
        match self.host {
            HostKind::Embedded => Arc::new(EmbeddedHost::new()),
            HostKind::Node => Arc::new(NodeHost::new(&self.node_bin, self.timeout_ms)),
        }
    }
}
