use super::*;

/// Engine tunables. Built from [`crate::settings::Settings`] for the CLI and
/// constructed directly by embedders and tests.
#[derive(Debug, Clone)]
pub struct Config {
    pub algorithm: AlgorithmKind,
    pub mining_threads: usize,
    pub queue: usize,
    pub scan_time: u32,
    pub expiry: u32,
    pub delaynet: bool,
    pub fail_only: bool,
    pub lowmem: bool,
    pub socks_proxy: Option<String>,
    pub vote: u16,
    pub request_timeout: Duration,
    pub longpoll_timeout: Duration,
    pub rate_limit_spacing: Duration,
    pub gbt_refresh: Duration,
    pub submit_retry: Duration,
    pub lp_no_pool_retry: Duration,
    pub lp_failure_backoff: Duration,
    pub lp_timeout_threshold: Duration,
    pub reap_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::Sha256d,
            mining_threads: 1,
            queue: 1,
            scan_time: 7,
            expiry: 28,
            delaynet: false,
            fail_only: false,
            lowmem: false,
            socks_proxy: None,
            vote: 0,
            request_timeout: Duration::from_secs(60),
            longpoll_timeout: Duration::from_secs(60 * 60),
            rate_limit_spacing: Duration::from_millis(250),
            gbt_refresh: Duration::from_secs(60),
            submit_retry: Duration::from_secs(5),
            lp_no_pool_retry: Duration::from_secs(60),
            lp_failure_backoff: Duration::from_secs(30),
            lp_timeout_threshold: Duration::from_secs(30),
            reap_interval: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Most connections a single pool may hold at once.
    pub fn connection_ceiling(&self) -> usize {
        if self.delaynet {
            5
        } else {
            2 * (self.mining_threads + self.queue)
        }
    }

    /// Number of work items the miner wants staged.
    pub fn demand(&self) -> usize {
        self.mining_threads + self.queue
    }
}
