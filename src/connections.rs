use super::*;

#[derive(Debug, Clone, PartialEq)]
struct ClientKey {
    nodelay: bool,
    proxy: Option<String>,
}

/// One reusable transport handle. The underlying HTTP client is built on
/// first use and dropped after any failure so the next call reconnects.
#[derive(Debug)]
pub struct Connection {
    pub id: u64,
    pub last_error: Option<String>,
    client: Option<(Client, ClientKey)>,
    last_used: Instant,
}

impl Connection {
    fn new(id: u64) -> Self {
        Self {
            id,
            last_error: None,
            client: None,
            last_used: Instant::now(),
        }
    }

    /// A handle outside any ring, for long-poll and template refresh calls
    /// that must not reuse TCP state.
    pub fn fresh() -> Self {
        Self::new(u64::MAX)
    }

    pub(crate) fn client(
        &mut self,
        proxy: Option<&str>,
        nodelay: bool,
    ) -> Result<Client, reqwest::Error> {
        let key = ClientKey {
            nodelay,
            proxy: proxy.map(String::from),
        };

        if let Some((client, cached)) = &self.client
            && *cached == key
        {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(nodelay);

        builder = match proxy {
            Some(proxy) => builder.proxy(reqwest::Proxy::all(proxy)?),
            None => builder.no_proxy(),
        };

        let client = builder.build()?;
        self.client = Some((client.clone(), key));

        Ok(client)
    }

    pub(crate) fn reset(&mut self) {
        self.client = None;
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }
}

#[derive(Debug, Default)]
struct Ring {
    idle: VecDeque<Connection>,
    total: usize,
    next_id: u64,
    drained: bool,
}

/// Bounded ring of transport handles for one pool. When the ceiling is
/// reached and nothing is idle, callers block until a handle comes back.
#[derive(Debug, Default)]
pub struct Connections {
    ring: Mutex<Ring>,
    available: Condvar,
}

impl Connections {
    pub fn acquire(&self, ceiling: usize) -> Connection {
        let mut ring = self.ring.lock();

        loop {
            if let Some(conn) = ring.idle.pop_front() {
                return conn;
            }

            if ring.total < ceiling.max(1) {
                ring.total += 1;
                let id = ring.next_id;
                ring.next_id += 1;
                debug!("Recruited new connection {id}, {} outstanding", ring.total);
                return Connection::new(id);
            }

            self.available.wait(&mut ring);
        }
    }

    pub fn release(&self, mut conn: Connection) {
        conn.last_used = Instant::now();

        let mut ring = self.ring.lock();

        if ring.drained {
            ring.total = ring.total.saturating_sub(1);
        } else {
            ring.idle.push_back(conn);
        }

        drop(ring);

        self.available.notify_all();
    }

    /// Drops idle handles unused for longer than `idle_timeout`, always
    /// keeping at least one handle outstanding.
    pub fn reap(&self, idle_timeout: Duration) -> usize {
        let mut ring = self.ring.lock();
        let mut reaped = 0;
        let mut kept = VecDeque::with_capacity(ring.idle.len());

        while let Some(conn) = ring.idle.pop_front() {
            if ring.total >= 2 && conn.idle_for() > idle_timeout {
                ring.total -= 1;
                reaped += 1;
            } else {
                kept.push_back(conn);
            }
        }

        ring.idle = kept;
        reaped
    }

    /// Discards every idle handle. Handles still out are dropped as they
    /// come back.
    pub(crate) fn drain(&self) {
        let mut ring = self.ring.lock();
        let idle = ring.idle.len();
        ring.idle.clear();
        ring.total -= idle;
        ring.drained = true;
        drop(ring);

        self.available.notify_all();
    }

    /// Idle and outstanding handle counts.
    pub fn counts(&self) -> (usize, usize) {
        let ring = self.ring.lock();
        (ring.idle.len(), ring.total)
    }
}

pub fn spawn_reaper(ctx: Arc<ClientContext>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("reaper".into())
        .spawn(move || {
            while ctx.sleep(ctx.config.reap_interval) {
                for pool in ctx.pools.all() {
                    let reaped = pool.connections.reap(ctx.config.idle_timeout);
                    if reaped > 0 {
                        debug!("Reaped {reaped} idle connections from {pool}");
                    }
                }
            }

            debug!("Reaper shutting down");
        })
}
