use super::*;

/// Stable handle into [`Pools`]. Work refers back to its pool through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[serde(transparent)]
pub struct PoolId(usize);

impl PoolId {
    pub fn new(n: usize) -> Self {
        Self(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    #[display("alive")]
    Alive,
    #[display("dead")]
    Dead,
    #[display("rejecting")]
    Rejecting,
}

/// Sequential rejects after which a pool is considered rejecting.
const REJECTING_THRESHOLD: u32 = 10;

/// The current block template plus the nonce2 counter handed out to
/// generated headers. Always read and written together under `gbt`.
#[derive(Debug)]
pub(crate) struct GbtSession {
    pub(crate) template: Template,
    pub(crate) transactions: Arc<Vec<String>>,
    pub(crate) nonce2: u64,
}

#[derive(Debug, Default)]
struct Endpoints {
    lp_path: Option<String>,
    lp_url: Option<String>,
    stratum_url: Option<String>,
    rpc_req: String,
}

#[derive(Debug)]
pub struct Pool {
    pub id: PoolId,
    pub url: String,
    pub user: String,
    pub pass: String,
    pub proxy: Option<String>,
    pub quota: u32,
    pub(crate) gbt: RwLock<Option<GbtSession>>,
    pub(crate) connections: Connections,
    pub(crate) stats: Mutex<PoolStats>,
    endpoints: RwLock<Endpoints>,
    status: Mutex<PoolStatus>,
    last_work: Mutex<Option<Instant>>,
    has_gbt: AtomicBool,
    has_stratum: AtomicBool,
    probed: AtomicBool,
    removed: AtomicBool,
    enabled: AtomicBool,
    submit_fail: AtomicBool,
    submit_old: AtomicBool,
    epoch: AtomicU64,
    seq_rejects: AtomicU32,
    getworks: AtomicU64,
    remote_failures: AtomicU64,
}

impl Display for Pool {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Pool {} ({})", self.id, self.url)
    }
}

impl Pool {
    pub(crate) fn new(id: PoolId, url: &PoolUrl, user: &str, pass: &str) -> Self {
        Self {
            id,
            url: url.url.clone(),
            user: user.into(),
            pass: pass.into(),
            proxy: url.proxy.as_ref().map(Proxy::to_url),
            quota: url.quota.unwrap_or(1),
            gbt: RwLock::new(None),
            connections: Connections::default(),
            stats: Mutex::new(PoolStats::default()),
            endpoints: RwLock::new(Endpoints {
                rpc_req: gbt::getwork_request(),
                ..Default::default()
            }),
            status: Mutex::new(PoolStatus::Dead),
            last_work: Mutex::new(None),
            has_gbt: AtomicBool::new(false),
            has_stratum: AtomicBool::new(false),
            probed: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            submit_fail: AtomicBool::new(false),
            submit_old: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            seq_rejects: AtomicU32::new(0),
            getworks: AtomicU64::new(0),
            remote_failures: AtomicU64::new(0),
        }
    }

    pub fn has_gbt(&self) -> bool {
        self.has_gbt.load(Ordering::Acquire)
    }

    pub(crate) fn set_has_gbt(&self, has_gbt: bool) {
        self.has_gbt.store(has_gbt, Ordering::Release);
    }

    pub fn has_stratum(&self) -> bool {
        self.has_stratum.load(Ordering::Acquire)
    }

    pub(crate) fn set_has_stratum(&self, has_stratum: bool) {
        self.has_stratum.store(has_stratum, Ordering::Release);
    }

    pub fn probed(&self) -> bool {
        self.probed.load(Ordering::Acquire)
    }

    /// Lets the next probe call record advertised endpoints again.
    pub(crate) fn clear_probed(&self) {
        self.probed.store(false, Ordering::Release);
    }

    pub fn removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Marks the pool removed and drains its idle connections. Long-poll and
    /// submit loops notice at their next checkpoint.
    pub fn remove(&self) {
        self.removed.store(true, Ordering::Release);
        self.enabled.store(false, Ordering::Release);
        self.connections.drain();
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn status(&self) -> PoolStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: PoolStatus) {
        *self.status.lock() = status;
    }

    pub fn submit_old(&self) -> bool {
        self.submit_old.load(Ordering::Acquire)
    }

    pub(crate) fn set_submit_old(&self, submit_old: bool) {
        self.submit_old.store(submit_old, Ordering::Release);
    }

    /// Sets the submit failure flag, returning whether it was already set.
    pub(crate) fn set_submit_fail(&self) -> bool {
        self.submit_fail.swap(true, Ordering::AcqRel)
    }

    /// Clears the submit failure flag, returning whether it was set.
    pub(crate) fn clear_submit_fail(&self) -> bool {
        self.submit_fail.swap(false, Ordering::AcqRel)
    }

    pub fn submit_failing(&self) -> bool {
        self.submit_fail.load(Ordering::Acquire)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Invalidates all work previously fetched from this pool.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn lp_path(&self) -> Option<String> {
        self.endpoints.read().lp_path.clone()
    }

    pub fn lp_url(&self) -> Option<String> {
        self.endpoints.read().lp_url.clone()
    }

    pub fn stratum_url(&self) -> Option<String> {
        self.endpoints.read().stratum_url.clone()
    }

    pub fn rpc_req(&self) -> String {
        self.endpoints.read().rpc_req.clone()
    }

    pub(crate) fn set_rpc_req(&self, rpc_req: String) {
        self.endpoints.write().rpc_req = rpc_req;
    }

    /// Stores what the first successful call advertised. Later calls never
    /// reach here.
    pub(crate) fn record_probe(&self, headers: &HeaderInfo) {
        let mut endpoints = self.endpoints.write();

        endpoints.lp_url = headers
            .lp_path
            .as_deref()
            .map(|path| resolve_lp_url(&self.url, path));
        endpoints.lp_path = headers.lp_path.clone();

        if let Some(stratum_url) = &headers.stratum_url {
            endpoints.stratum_url = Some(stratum_url.clone());
        }

        self.probed.store(true, Ordering::Release);
    }

    pub fn longpollid(&self) -> Option<String> {
        self.gbt
            .read()
            .as_ref()
            .map(|session| session.template.longpollid.clone())
    }

    pub(crate) fn touch_last_work(&self) {
        *self.last_work.lock() = Some(Instant::now());
    }

    pub fn last_work_elapsed(&self) -> Option<Duration> {
        self.last_work.lock().map(|last| last.elapsed())
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    pub fn getworks(&self) -> u64 {
        self.getworks.load(Ordering::Relaxed)
    }

    pub(crate) fn count_getwork(&self) {
        self.getworks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn remote_failures(&self) -> u64 {
        self.remote_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn count_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.stats.lock().accepted += 1;
        self.seq_rejects.store(0, Ordering::Relaxed);

        let mut status = self.status.lock();
        if *status == PoolStatus::Rejecting {
            info!("{self} now accepting shares");
        }
        *status = PoolStatus::Alive;
    }

    pub(crate) fn record_rejected(&self) {
        self.stats.lock().rejected += 1;

        let seq = self.seq_rejects.fetch_add(1, Ordering::Relaxed) + 1;

        if seq == REJECTING_THRESHOLD {
            warn!("{self} rejected {seq} sequential shares, flagging as rejecting");
            self.set_status(PoolStatus::Rejecting);
        }
    }

    pub(crate) fn record_stale(&self) {
        self.stats.lock().stale += 1;
    }
}

/// Joins a long-poll path advertised by `X-Long-Polling` onto the RPC URL.
/// Absolute URLs are taken as-is.
pub(crate) fn resolve_lp_url(rpc_url: &str, path: &str) -> String {
    if path.contains("://") {
        return path.into();
    }

    let path = path.strip_prefix('/').unwrap_or(path);

    if rpc_url.ends_with('/') {
        format!("{rpc_url}{path}")
    } else {
        format!("{rpc_url}/{path}")
    }
}

/// Index-stable arena of pools. Pools are never moved or dropped while the
/// engine runs; removal only flags them.
#[derive(Debug, Default)]
pub struct Pools {
    pools: RwLock<Vec<Arc<Pool>>>,
}

impl Pools {
    pub fn add(&self, url: &PoolUrl, user: &str, pass: &str) -> PoolId {
        let mut pools = self.pools.write();
        let id = PoolId(pools.len());
        pools.push(Arc::new(Pool::new(id, url, user, pass)));
        id
    }

    pub fn get(&self, id: PoolId) -> Option<Arc<Pool>> {
        self.pools.read().get(id.0).cloned()
    }

    pub fn all(&self) -> Vec<Arc<Pool>> {
        self.pools.read().clone()
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools() -> Pools {
        let pools = Pools::default();
        pools.add(&"http://a.example:8332".parse().unwrap(), "u", "p");
        pools.add(&"3;socks5:127.0.0.1:9050|b.example".parse().unwrap(), "u", "p");
        pools
    }

    #[test]
    fn arena_ids_are_stable() {
        let pools = pools();
        let b = pools.get(PoolId::new(1)).unwrap();

        assert_eq!(b.id, PoolId::new(1));
        assert_eq!(b.url, "http://b.example");
        assert_eq!(b.quota, 3);
        assert_eq!(b.proxy.as_deref(), Some("socks5://127.0.0.1:9050"));

        b.remove();
        assert!(b.removed());
        assert_eq!(pools.len(), 2);
        assert!(pools.get(PoolId::new(1)).unwrap().removed());
        assert!(pools.get(PoolId::new(2)).is_none());
    }

    #[test]
    fn lp_url_resolution() {
        assert_eq!(
            resolve_lp_url("http://pool:8332", "/LP"),
            "http://pool:8332/LP"
        );
        assert_eq!(resolve_lp_url("http://pool:8332/", "LP"), "http://pool:8332/LP");
        assert_eq!(
            resolve_lp_url("http://pool:8332", "http://other:9000/lp"),
            "http://other:9000/lp"
        );
    }

    #[test]
    fn probe_records_endpoints() {
        let pools = pools();
        let pool = pools.get(PoolId::new(0)).unwrap();

        pool.record_probe(&HeaderInfo {
            lp_path: Some("/LP".into()),
            stratum_url: Some("stratum+tcp://a.example:3333".into()),
            ..Default::default()
        });

        assert!(pool.probed());
        assert_eq!(pool.lp_url().as_deref(), Some("http://a.example:8332/LP"));
        assert_eq!(
            pool.stratum_url().as_deref(),
            Some("stratum+tcp://a.example:3333")
        );
    }

    #[test]
    fn submit_fail_flag_edges() {
        let pools = pools();
        let pool = pools.get(PoolId::new(0)).unwrap();

        assert!(!pool.set_submit_fail());
        assert!(pool.set_submit_fail());
        assert!(pool.clear_submit_fail());
        assert!(!pool.clear_submit_fail());
    }

    #[test]
    fn sequential_rejects_flag_pool() {
        let pools = pools();
        let pool = pools.get(PoolId::new(0)).unwrap();
        pool.set_status(PoolStatus::Alive);

        for _ in 0..REJECTING_THRESHOLD {
            pool.record_rejected();
        }
        assert_eq!(pool.status(), PoolStatus::Rejecting);

        pool.record_accepted();
        assert_eq!(pool.status(), PoolStatus::Alive);
        assert_eq!(pool.stats().rejected, u64::from(REJECTING_THRESHOLD));
        assert_eq!(pool.stats().accepted, 1);
    }
}
