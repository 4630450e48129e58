use {super::*, snafu::OptionExt};

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Process-wide counters.
#[derive(Debug, Default)]
pub struct Totals {
    pub getworks: AtomicU64,
    pub local_work: AtomicU64,
    pub stale: AtomicU64,
    pub remote_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TotalsSnapshot {
    pub getworks: u64,
    pub local_work: u64,
    pub stale: u64,
    pub remote_failures: u64,
}

impl Totals {
    pub fn snapshot(&self) -> TotalsSnapshot {
        TotalsSnapshot {
            getworks: self.getworks.load(Ordering::Relaxed),
            local_work: self.local_work.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
        }
    }
}

/// Everything the engine shares between threads. Passed explicitly to every
/// component, usually behind an `Arc`.
#[derive(Debug)]
pub struct ClientContext {
    pub config: Config,
    pub pools: Pools,
    pub stage: Stage,
    pub blocks: BlockTracker,
    pub nettime: NetTime,
    pub algorithm: Box<dyn Algorithm>,
    pub totals: Totals,
    pub cancel: CancellationToken,
    current: RwLock<Option<PoolId>>,
    total_work: AtomicU64,
    have_longpoll: AtomicBool,
    lp_lock: Mutex<()>,
    lp_cond: Condvar,
}

impl ClientContext {
    pub fn new(config: Config) -> Self {
        let algorithm = algorithm::from_kind(config.algorithm);
        Self::with_algorithm(config, algorithm)
    }

    pub fn with_algorithm(config: Config, algorithm: Box<dyn Algorithm>) -> Self {
        Self {
            config,
            pools: Pools::default(),
            stage: Stage::new(),
            blocks: BlockTracker::default(),
            nettime: NetTime::default(),
            algorithm,
            totals: Totals::default(),
            cancel: CancellationToken::new(),
            current: RwLock::new(None),
            total_work: AtomicU64::new(0),
            have_longpoll: AtomicBool::new(false),
            lp_lock: Mutex::new(()),
            lp_cond: Condvar::new(),
        }
    }

    pub fn with_cancel(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    /// Adds a pool. The first pool added becomes current.
    pub fn add_pool(&self, url: &PoolUrl, user: &str, pass: &str) -> PoolId {
        let id = self.pools.add(url, user, pass);

        let mut current = self.current.write();
        if current.is_none() {
            *current = Some(id);
        }

        id
    }

    pub fn pool(&self, id: PoolId) -> Result<Arc<Pool>, FetchError> {
        self.pools
            .get(id)
            .filter(|pool| !pool.removed())
            .context(fetch_error::RemovedSnafu { pool: id })
    }

    pub fn current_pool_id(&self) -> Option<PoolId> {
        *self.current.read()
    }

    pub fn current_pool(&self) -> Option<Arc<Pool>> {
        self.current_pool_id().and_then(|id| self.pools.get(id))
    }

    pub fn switch_pool(&self, id: PoolId) {
        if let Some(pool) = self.pools.get(id) {
            info!("Switching to {pool}");
            *self.current.write() = Some(id);
            self.lp_cond.notify_all();
        }
    }

    pub fn enable_pool(&self, id: PoolId) {
        if let Some(pool) = self.pools.get(id) {
            pool.set_enabled(true);
            self.lp_cond.notify_all();
        }
    }

    pub fn disable_pool(&self, id: PoolId) {
        if let Some(pool) = self.pools.get(id) {
            pool.set_enabled(false);
        }
    }

    pub fn remove_pool(&self, id: PoolId) {
        if let Some(pool) = self.pools.get(id) {
            info!("Removing {pool}");
            pool.remove();
            self.lp_cond.notify_all();
        }
    }

    pub fn have_longpoll(&self) -> bool {
        self.have_longpoll.load(Ordering::Acquire)
    }

    pub(crate) fn set_have_longpoll(&self) {
        self.have_longpoll.store(true, Ordering::Release);
    }

    pub(crate) fn next_work_id(&self) -> u64 {
        self.total_work.fetch_add(1, Ordering::Relaxed)
    }

    /// Sleeps for `duration` unless cancelled first. Returns false on
    /// cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;

        while !self.cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }

        false
    }

    /// Parks the long-poll loop while `pool` is disabled or, under
    /// failover-only, while it is not the current pool. Returns false once
    /// the pool is removed or the engine shuts down.
    pub fn wait_lpcurrent(&self, pool: &Pool) -> bool {
        let mut guard = self.lp_lock.lock();

        while !pool.enabled()
            || (self.config.fail_only && self.current_pool_id() != Some(pool.id))
        {
            if pool.removed() || self.cancel.is_cancelled() {
                return false;
            }
            self.lp_cond.wait_for(&mut guard, SLEEP_SLICE);
        }

        !pool.removed() && !self.cancel.is_cancelled()
    }

    pub fn roll_work(&self, work: &mut Work) {
        work.roll();
        work.id = self.next_work_id();
        self.totals.local_work.fetch_add(1, Ordering::Relaxed);
    }

    /// Clones `work` for staging. Decred clones get fresh extra-data so they
    /// never duplicate the master's header.
    pub fn make_clone(&self, work: &Work) -> Work {
        let mut clone = work.make_clone();

        if self.algorithm.kind() == AlgorithmKind::Decred {
            clone.randomize_extra_data();
        }

        clone
    }

    pub fn should_roll(&self, work: &Work) -> bool {
        self.should_roll_with(work, self.stage.len())
    }

    /// As [`ClientContext::should_roll`] with the staged count supplied, for
    /// callers already holding the stage lock.
    pub(crate) fn should_roll_with(&self, work: &Work, staged: usize) -> bool {
        let Some(pool) = self.pools.get(work.pool) else {
            return false;
        };

        let current = self.current_pool_id() == Some(work.pool);
        let live = self.config.fail_only && pool.status() != PoolStatus::Dead;

        (current || live) && staged < self.config.demand()
    }

    /// Fills outstanding demand by rolling `work` and staging clones. When
    /// anything was cloned the rolled master is staged too and the last
    /// clone returned; otherwise `work` comes back untouched.
    pub fn clone_work(&self, mut work: Work) -> Work {
        let mut need = self.config.demand().saturating_sub(self.stage.len());

        if need == 0 {
            return work;
        }

        let mut cloned = false;
        let mut clone = self.make_clone(&work);

        while need > 1 && work.can_roll() && self.should_roll(&work) {
            debug!("Pushing rolled work {} to stage", clone.id);
            self.stage_work(clone);
            self.roll_work(&mut work);
            clone = self.make_clone(&work);
            self.roll_work(&mut work);
            cloned = true;
            need -= 1;
        }

        if cloned {
            self.stage_work(work);
            clone
        } else {
            work
        }
    }

    /// Rolls one staged item that can and should roll and stages a clone
    /// of it.
    pub fn clone_available(&self) -> bool {
        let clone = self.stage.find_rollable(|work, staged| {
            (work.can_roll() && self.should_roll_with(work, staged)).then(|| {
                self.roll_work(work);
                let clone = self.make_clone(work);
                self.roll_work(work);
                clone
            })
        });

        match clone {
            Some(clone) => {
                debug!("Pushing cloned available work {} to stage", clone.id);
                self.stage_work(clone);
                true
            }
            None => false,
        }
    }

    pub fn stage_work(&self, mut work: Work) {
        self.test_work_current(&mut work);
        self.stage.push(work);
    }

    /// Claims the oldest staged item that is still valid, discarding stale
    /// ones on the way.
    pub fn claim_work(&self, timeout: Duration) -> Option<Work> {
        loop {
            let work = self.stage.claim_timeout(timeout)?;

            if !self.stale_work(&work, false) {
                return Some(work);
            }

            debug!("Discarded stale work {}", work.id);
        }
    }

    /// Checks `work` against the block tracker. A new tip becomes current
    /// and flushes stale staged work; a block seen before the current one
    /// marks the work stale. Returns whether the work is still usable.
    pub fn test_work_current(&self, work: &mut Work) -> bool {
        if work.mandatory {
            return true;
        }

        let name = self
            .pools
            .get(work.pool)
            .map(|pool| pool.to_string())
            .unwrap_or_else(|| work.pool.to_string());

        match self.blocks.observe(work.prev_block_hash()) {
            BlockChange::New { work_block, first } => {
                work.work_block = work_block;

                if first {
                    info!("Found initial block {}", hex::encode(work.prev_block_hash()));
                } else {
                    let discarded = self.discard_stale();

                    if work.longpoll {
                        warn!("LONGPOLL from {name} detected new block");
                    } else {
                        warn!("New block detected on network from {name}");
                    }

                    debug!("Discarded {discarded} stale staged items");
                }
            }
            BlockChange::Current => {
                if work.longpoll {
                    work.work_block = self.blocks.restart();
                    let discarded = self.discard_stale();
                    info!("LONGPOLL from {name} requested work restart");
                    debug!("Discarded {discarded} stale staged items");
                } else {
                    work.work_block = self.blocks.work_block();
                }
            }
            BlockChange::Old => {
                debug!("Work {} from {name} refers to an old block", work.id);
                work.stale = true;
            }
        }

        work.longpoll = false;

        !work.stale
    }

    /// Whether `work` is no longer worth mining (`share == false`) or
    /// submitting (`share == true`).
    pub fn stale_work(&self, work: &Work, share: bool) -> bool {
        let Some(pool) = self.pools.get(work.pool) else {
            return true;
        };

        if pool.removed() || work.stale || work.epoch != pool.epoch() {
            return true;
        }

        if work.work_block != self.blocks.work_block() && !(share && pool.submit_old()) {
            debug!("Work {} stale due to block mismatch", work.id);
            return true;
        }

        if share {
            return false;
        }

        let expiry = work.rolltime.max(self.config.expiry);

        if work.tv_staged.elapsed() >= Duration::from_secs(expiry.into()) {
            debug!("Work {} stale due to expiry", work.id);
            return true;
        }

        self.config.fail_only && self.current_pool_id() != Some(work.pool) && !work.mandatory
    }

    pub fn discard_stale(&self) -> usize {
        self.stage.discard(|work| self.stale_work(work, false))
    }
}
