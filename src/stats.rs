use super::*;

/// Per-pool network and share statistics. Only the transport and the
/// submission path write these.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub times_sent: u64,
    pub times_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub getwork_calls: u64,
    pub getwork_wait_rolling: f64,
    pub getwork_wait_total: f64,
    pub getwork_wait_avg: f64,
    pub getwork_wait_min: Option<f64>,
    pub getwork_wait_max: f64,
    pub rolltime: u32,
    pub had_rolltime: bool,
    pub can_roll: bool,
    pub had_expire: bool,
    pub accepted: u64,
    pub rejected: u64,
    pub stale: u64,
}

impl PoolStats {
    pub(crate) fn record_getwork(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();

        self.getwork_wait_rolling = (self.getwork_wait_rolling + secs * 0.63) / 1.63;
        self.getwork_wait_total += secs;
        self.getwork_wait_max = self.getwork_wait_max.max(secs);
        self.getwork_wait_min = Some(self.getwork_wait_min.map_or(secs, |min| min.min(secs)));
        self.getwork_calls += 1;
        self.getwork_wait_avg = self.getwork_wait_total / self.getwork_calls as f64;
    }

    pub(crate) fn record_headers(&mut self, headers: &HeaderInfo) {
        self.rolltime = headers.rolltime;
        self.had_rolltime = headers.had_rolltime;
        self.can_roll = headers.can_roll;
        self.had_expire = headers.had_expire;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getwork_latency() {
        let mut stats = PoolStats::default();

        stats.record_getwork(Duration::from_secs(1));
        assert_eq!(stats.getwork_calls, 1);
        assert!((stats.getwork_wait_rolling - 0.63 / 1.63).abs() < 1e-9);
        assert_eq!(stats.getwork_wait_min, Some(1.0));

        stats.record_getwork(Duration::from_secs(3));
        assert_eq!(stats.getwork_calls, 2);
        assert_eq!(stats.getwork_wait_min, Some(1.0));
        assert_eq!(stats.getwork_wait_max, 3.0);
        assert_eq!(stats.getwork_wait_avg, 2.0);
    }

    #[test]
    fn serializes() {
        let value = serde_json::to_value(PoolStats::default()).unwrap();
        assert_eq!(value["getwork_wait_min"], Value::Null);
        assert_eq!(value["accepted"], 0);
    }
}
