use super::*;

const SEEN_BLOCKS: usize = 64;

/// What a previous-block hash means relative to what we already know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChange {
    /// First sighting. Becomes the current block.
    New { work_block: u64, first: bool },
    Current,
    /// A block we saw before the current one.
    Old,
}

#[derive(Debug)]
struct Blocks {
    current: Option<[u8; 32]>,
    work_block: u64,
    seen: LruCache<[u8; 32], ()>,
}

/// Tracks the chain tip as observed through fetched work. `work_block`
/// increases on every tip change or forced restart; work stamped with an
/// older value is stale.
#[derive(Debug)]
pub struct BlockTracker {
    inner: Mutex<Blocks>,
}

impl Default for BlockTracker {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Blocks {
                current: None,
                work_block: 0,
                seen: LruCache::new(NonZeroUsize::new(SEEN_BLOCKS).expect("should be non-zero")),
            }),
        }
    }
}

impl BlockTracker {
    pub fn observe(&self, prev_hash: [u8; 32]) -> BlockChange {
        let mut blocks = self.inner.lock();

        if blocks.current == Some(prev_hash) {
            return BlockChange::Current;
        }

        if blocks.seen.put(prev_hash, ()).is_some() {
            return BlockChange::Old;
        }

        let first = blocks.current.is_none();
        blocks.current = Some(prev_hash);
        blocks.work_block += 1;

        BlockChange::New {
            work_block: blocks.work_block,
            first,
        }
    }

    /// Invalidates outstanding work without a tip change.
    pub fn restart(&self) -> u64 {
        let mut blocks = self.inner.lock();
        blocks.work_block += 1;
        blocks.work_block
    }

    pub fn work_block(&self) -> u64 {
        self.inner.lock().work_block
    }

    pub fn current(&self) -> Option<[u8; 32]> {
        self.inner.lock().current
    }
}
