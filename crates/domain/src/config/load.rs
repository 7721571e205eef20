use serde::{Deserialize, Serialize};

/// Parameters of the load driver shipped with the binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,

    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Number of distinct loopback ContactInfos when no endpoint is set.
    #[serde(default = "default_contact_infos")]
    pub contact_infos: usize,

    /// `host:port` entries. When non-empty the TCP transport is used.
    #[serde(default)]
    pub endpoints: Vec<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound of responses a simulated request waits for.
    #[serde(default = "default_max_responses")]
    pub max_responses_per_request: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: default_iterations(),
            contact_infos: default_contact_infos(),
            endpoints: Vec::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_responses_per_request: default_max_responses(),
        }
    }
}

fn default_threads() -> usize {
    8
}

fn default_iterations() -> usize {
    10_000
}

fn default_contact_infos() -> usize {
    16
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_max_responses() -> usize {
    2
}
