use super::*;

const NTIME_OFFSET: usize = 68;

const DECRED_VOTE_OFFSET: usize = 100;
const DECRED_EXTRA_WORDS: [usize; 2] = [36, 37];

/// Where a work item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum GetworkMode {
    #[display("P")]
    Pool,
    #[display("L")]
    LongPoll,
    #[display("G")]
    Gbt,
}

/// One mining job candidate.
///
/// `data` is the header buffer in 32-bit big-endian words, `work_len` bytes
/// long. GBT work also carries the coinbase snapshot and transactions needed
/// to rebuild the block on submission.
#[derive(Debug, Clone)]
pub struct Work {
    pub id: u64,
    pub pool: PoolId,
    pub data: Vec<u8>,
    pub target: [u8; 32],
    pub midstate: Option<[u8; 32]>,
    pub job_id: Option<String>,
    pub gbt: bool,
    pub gbt_txns: usize,
    pub coinbase: Option<Coinbase>,
    pub transactions: Arc<Vec<String>>,
    pub nonce2: u64,
    pub mode: GetworkMode,
    pub rolltime: u32,
    pub rolls: u32,
    pub work_block: u64,
    pub epoch: u64,
    pub clone: bool,
    pub mandatory: bool,
    pub longpoll: bool,
    pub stale: bool,
    pub tv_getwork: Option<Instant>,
    pub tv_getwork_reply: Option<Instant>,
    pub tv_staged: Instant,
    pub tv_cloned: Option<Instant>,
}

impl Work {
    pub fn new(pool: PoolId, work_len: usize) -> Self {
        Self {
            id: 0,
            pool,
            data: vec![0; work_len],
            target: [0; 32],
            midstate: None,
            job_id: None,
            gbt: false,
            gbt_txns: 0,
            coinbase: None,
            transactions: Arc::default(),
            nonce2: 0,
            mode: GetworkMode::Pool,
            rolltime: 0,
            rolls: 0,
            work_block: 0,
            epoch: 0,
            clone: false,
            mandatory: false,
            longpoll: false,
            stale: false,
            tv_getwork: None,
            tv_getwork_reply: None,
            tv_staged: Instant::now(),
            tv_cloned: None,
        }
    }

    pub fn ntime(&self) -> u32 {
        BigEndian::read_u32(&self.data[NTIME_OFFSET..NTIME_OFFSET + 4])
    }

    /// Previous block hash in display byte order.
    pub fn prev_block_hash(&self) -> [u8; 32] {
        let mut words = [0u8; 32];
        words.copy_from_slice(&self.data[4..36]);
        gbt::swap256(&words)
    }

    /// Whether the ntime window still has room. Long-poll work is never
    /// rolled until block detection has consumed it.
    pub fn can_roll(&self) -> bool {
        !self.longpoll
            && self.rolltime > 0
            && self.rolls < self.rolltime
            && self.tv_staged.elapsed() < Duration::from_secs(self.rolltime.into())
    }

    /// Advances ntime by one second in place. The caller assigns a new id.
    pub(crate) fn roll(&mut self) {
        let ntime = self.ntime().wrapping_add(1);
        BigEndian::write_u32(&mut self.data[NTIME_OFFSET..NTIME_OFFSET + 4], ntime);
        self.rolls += 1;
    }

    /// Deep copy that schedulers will prefer over the master, which stays
    /// available for further rolling.
    pub(crate) fn make_clone(&self) -> Self {
        let mut clone = self.clone();
        clone.clone = true;
        clone.tv_cloned = Some(Instant::now());
        clone.longpoll = false;
        clone.mandatory = false;
        clone.tv_staged = self
            .tv_staged
            .checked_sub(Duration::from_secs(1))
            .unwrap_or(self.tv_staged);
        clone
    }

    /// Writes the Decred vote bits into the header.
    pub(crate) fn set_vote(&mut self, vote: u16) {
        LittleEndian::write_u16(
            &mut self.data[DECRED_VOTE_OFFSET..DECRED_VOTE_OFFSET + 2],
            (vote << 1) | 1,
        );
    }

    /// Fills the two Decred extra-data words with fresh random values so
    /// every copy of a job hashes a different header.
    pub(crate) fn randomize_extra_data(&mut self) {
        let [first, second] = DECRED_EXTRA_WORDS.map(|word| word * 4);
        let mut rng = rand::rng();

        LittleEndian::write_u32(
            &mut self.data[first..first + 4],
            rng.next_u32().wrapping_mul(4),
        );
        LittleEndian::write_u32(
            &mut self.data[second..second + 4],
            rng.next_u32().wrapping_mul(4) << 8,
        );
    }

    pub fn header_hex(&self) -> String {
        hex::encode(&self.data)
    }

    pub fn target_hex(&self) -> String {
        hex::encode(self.target)
    }
}
