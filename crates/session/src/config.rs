//! Session Service configuration

/// Session Service configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path to the symmetric key file used to sign session tokens.
    /// Generated on first run if it does not exist.
    pub key_path: String,
    /// Token lifetime, in seconds
    pub token_lifetime_secs: i64,
    /// Max idle age before a session is eligible for GC, in seconds
    pub max_idle_secs: i64,
    /// Interval between GC sweeps, in seconds
    pub gc_interval_secs: u64,
}

impl From<&phylo_common::Config> for SessionConfig {
    fn from(config: &phylo_common::Config) -> Self {
        Self {
            key_path: config.session_key_path.clone(),
            token_lifetime_secs: config.session_token_lifetime_secs,
            max_idle_secs: config.session_max_idle_secs,
            gc_interval_secs: config.session_gc_interval_secs,
        }
    }
}
