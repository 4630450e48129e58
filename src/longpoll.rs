use super::*;

/// Why a long-poll machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LongpollExit {
    #[display("handed off to stratum")]
    Stratum,
    #[display("pool removed")]
    PoolRemoved,
    #[display("cancelled")]
    Cancelled,
}

enum State {
    SelectingPool,
    Polling { pool: Arc<Pool>, lp_url: String },
}

/// Picks the pool whose long-poll stands in for `cp`: `cp` itself when it
/// long-polls or speaks GBT, else the first pool advertising stratum or a
/// long-poll path.
pub fn select_longpoll_pool(ctx: &ClientContext, cp: &Arc<Pool>) -> Option<Arc<Pool>> {
    if cp.lp_path().is_some() || cp.has_gbt() {
        return Some(cp.clone());
    }

    ctx.pools
        .all()
        .into_iter()
        .find(|pool| !pool.removed() && (pool.has_stratum() || pool.lp_path().is_some()))
}

fn stopped(ctx: &ClientContext, cp: &Pool) -> Option<LongpollExit> {
    if cp.removed() {
        Some(LongpollExit::PoolRemoved)
    } else if ctx.cancel.is_cancelled() {
        Some(LongpollExit::Cancelled)
    } else {
        None
    }
}

fn activate(ctx: &ClientContext, cp: &Pool, pool: &Pool) -> String {
    ctx.set_have_longpoll();

    if pool.has_gbt() {
        warn!("GBT longpoll ID activated for {}", pool.url);
        return pool.url.clone();
    }

    let lp_url = pool.lp_url().unwrap_or_else(|| pool.url.clone());

    if cp.id == pool.id {
        warn!("Long-polling activated for {lp_url}");
    } else {
        warn!("Long-polling activated for {} via {lp_url}", cp.url);
    }

    lp_url
}

/// Runs the long-poll loop on behalf of `cp` until it hands off to stratum,
/// `cp` is removed, or the engine shuts down.
pub fn run_longpoll(ctx: &ClientContext, cp: Arc<Pool>) -> LongpollExit {
    let mut conn = Connection::fresh();
    let mut failures = 0u32;
    let mut state = State::SelectingPool;

    loop {
        if let Some(exit) = stopped(ctx, &cp) {
            return exit;
        }

        state = match state {
            State::SelectingPool => {
                let Some(pool) = select_longpoll_pool(ctx, &cp) else {
                    warn!("No suitable long-poll found for {}", cp.url);

                    if !ctx.sleep(ctx.config.lp_no_pool_retry) {
                        return LongpollExit::Cancelled;
                    }

                    state = State::SelectingPool;
                    continue;
                };

                if pool.has_stratum() {
                    warn!(
                        "Block change for {} detection via {} stratum",
                        cp.url, pool.url
                    );
                    return LongpollExit::Stratum;
                }

                if !ctx.wait_lpcurrent(&cp) {
                    return stopped(ctx, &cp).unwrap_or(LongpollExit::Cancelled);
                }

                let lp_url = activate(ctx, &cp, &pool);

                State::Polling { pool, lp_url }
            }
            State::Polling { pool, lp_url } => {
                if !ctx.wait_lpcurrent(&cp) {
                    return stopped(ctx, &cp).unwrap_or(LongpollExit::Cancelled);
                }

                let start = Instant::now();

                let body = if pool.has_gbt() {
                    gbt::gbt_request(pool.longpollid().as_deref())
                } else {
                    gbt::getwork_request()
                };

                conn.reset();

                let call = RpcCall::new(&lp_url, body).longpoll();

                match json_rpc_call(ctx, &mut conn, &pool, &call) {
                    Ok(response) => {
                        let reply = Instant::now();

                        pool.set_submit_old(
                            response
                                .result()
                                .get("submitold")
                                .and_then(Value::as_bool)
                                .unwrap_or(false),
                        );

                        if let Err(err) = convert_to_work(ctx, &pool, &response, start, reply) {
                            debug!("Long-poll reply from {pool} unusable: {err}");
                        }

                        failures = 0;
                    }
                    Err(err) => {
                        if start.elapsed() > ctx.config.lp_timeout_threshold {
                            debug!("Long-poll to {lp_url} timed out, restarting: {err}");
                            state = State::Polling { pool, lp_url };
                            continue;
                        }

                        failures += 1;

                        if failures == 1 {
                            warn!(
                                "longpoll failed for {lp_url}, retrying every {}s",
                                ctx.config.lp_failure_backoff.as_secs()
                            );
                        }

                        if !ctx.sleep(ctx.config.lp_failure_backoff) {
                            return LongpollExit::Cancelled;
                        }
                    }
                }

                if pool.id != cp.id {
                    match select_longpoll_pool(ctx, &cp) {
                        Some(next) if next.has_stratum() => {
                            warn!(
                                "Block change for {} detection via {} stratum",
                                cp.url, next.url
                            );
                            return LongpollExit::Stratum;
                        }
                        Some(next) if next.id == pool.id => State::Polling { pool, lp_url },
                        _ => State::SelectingPool,
                    }
                } else if pool.removed() {
                    State::SelectingPool
                } else {
                    State::Polling { pool, lp_url }
                }
            }
        };
    }
}

pub fn spawn_longpoll(ctx: Arc<ClientContext>, cp: PoolId) -> io::Result<JoinHandle<LongpollExit>> {
    thread::Builder::new()
        .name(format!("{cp}/Longpoll"))
        .spawn(move || {
            let Some(pool) = ctx.pools.get(cp) else {
                return LongpollExit::PoolRemoved;
            };

            let exit = run_longpoll(&ctx, pool);
            debug!("Long-poll for pool {cp} exited: {exit}");
            exit
        })
}
