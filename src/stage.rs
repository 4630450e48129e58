use super::*;

/// Staged work waiting for a consumer, ordered by staging time and then
/// insertion order. Clones carry an earlier staging time than their master
/// so they are claimed first.
#[derive(Debug, Default)]
pub struct Stage {
    inner: Mutex<Staged>,
    available: Condvar,
}

#[derive(Debug, Default)]
struct Staged {
    works: BTreeMap<(Instant, u64), Work>,
    seq: u64,
}

impl Staged {
    fn rollable(&self) -> usize {
        self.works.values().filter(|work| work.rolltime > 0).count()
    }
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, work: Work) {
        let mut staged = self.inner.lock();
        let seq = staged.seq;
        staged.seq += 1;
        staged.works.insert((work.tv_staged, seq), work);
        drop(staged);

        self.available.notify_one();
    }

    /// Removes and returns the oldest staged item, if any.
    pub fn claim(&self) -> Option<Work> {
        self.inner.lock().works.pop_first().map(|(_, work)| work)
    }

    /// Like [`Stage::claim`] but waits up to `timeout` for work to arrive.
    pub fn claim_timeout(&self, timeout: Duration) -> Option<Work> {
        let deadline = Instant::now() + timeout;
        let mut staged = self.inner.lock();

        loop {
            if let Some((_, work)) = staged.works.pop_first() {
                return Some(work);
            }

            if self.available.wait_until(&mut staged, deadline).timed_out() {
                return staged.works.pop_first().map(|(_, work)| work);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rollable(&self) -> usize {
        self.inner.lock().rollable()
    }

    /// Visits staged items under the lock until `f` produces a value,
    /// skipping the scan when nothing staged has a roll window. `f` also
    /// receives the staged count so it never needs to re-enter the lock.
    pub(crate) fn find_rollable<T>(
        &self,
        mut f: impl FnMut(&mut Work, usize) -> Option<T>,
    ) -> Option<T> {
        let mut staged = self.inner.lock();

        if staged.rollable() == 0 {
            return None;
        }

        let count = staged.works.len();
        staged.works.values_mut().find_map(|work| f(work, count))
    }

    /// Drops every staged item matching `stale`, returning how many went.
    pub(crate) fn discard(&self, mut stale: impl FnMut(&Work) -> bool) -> usize {
        let mut staged = self.inner.lock();
        let before = staged.works.len();
        staged.works.retain(|_, work| !stale(work));
        before - staged.works.len()
    }
}
