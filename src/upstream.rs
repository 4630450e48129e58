use {super::*, crate::pool::GbtSession, snafu::OptionExt};

/// Replaces the pool's template session with a freshly decoded one. A reply
/// that fails to decode leaves the existing session untouched.
pub(crate) fn decode_gbt(ctx: &ClientContext, pool: &Pool, result: &Value) -> Result<(), DecodeError> {
    let mut template = Template::decode(result, |data| ctx.algorithm.hash(data))?;
    let transactions = Arc::new(mem::take(&mut template.txn_data));

    pool.set_submit_old(template.submitold);

    let mut gbt = pool.gbt.write();
    let nonce2 = gbt.as_ref().map_or(0, |session| session.nonce2);

    debug!(
        "{pool} template: prevhash {} workid {:?} expires {} txns {}",
        hex::encode(template.previous_block_hash),
        template.workid,
        template.expires,
        template.txn_count(),
    );

    *gbt = Some(GbtSession {
        template,
        transactions,
        nonce2,
    });

    Ok(())
}

/// Decodes a successful reply. GBT replies update the pool's template
/// session and leave `work` for [`gen_gbt_work`]; getwork replies fill
/// `work` directly.
pub fn work_decode(
    ctx: &ClientContext,
    pool: &Pool,
    work: &mut Work,
    response: &RpcResponse,
) -> Result<(), FetchError> {
    pool.touch_last_work();

    let result = response.result();
    work.pool = pool.id;

    if pool.has_gbt() {
        decode_gbt(ctx, pool, result)?;
        work.gbt = true;
        return Ok(());
    }

    let kind = ctx.algorithm.kind();
    let job = gbt::decode_getwork(result, kind.work_len(), kind.wants_midstate())?;

    work.data = job.data;
    work.target = job.target;

    if kind == AlgorithmKind::Decred {
        work.set_vote(ctx.config.vote);
        work.randomize_extra_data();
    }

    work.midstate = match job.midstate {
        Some(midstate) => Some(midstate),
        None => ctx
            .algorithm
            .midstate()
            .map(|compute| compute.midstate(&work.data)),
    };
    work.tv_staged = Instant::now();

    Ok(())
}

/// Refetches the block template on a fresh connection. Failures are logged
/// and the old template stays in use.
pub fn update_gbt(ctx: &ClientContext, pool: &Pool) {
    let mut conn = Connection::fresh();
    let call = RpcCall::new(&pool.url, pool.rpc_req()).probe();

    match json_rpc_call(ctx, &mut conn, pool, &call) {
        Ok(response) => {
            let mut work = Work::new(pool.id, ctx.algorithm.kind().work_len());

            ctx.totals.getworks.fetch_add(1, Ordering::Relaxed);
            pool.count_getwork();

            match work_decode(ctx, pool, &mut work, &response) {
                Ok(()) => debug!("Successfully retrieved and updated GBT from {pool}"),
                Err(err) => {
                    debug!("Successfully retrieved but failed to decipher GBT from {pool}: {err}")
                }
            }
        }
        Err(err) => debug!("Failed to update GBT from {pool}: {err}"),
    }
}

/// Builds a header from the pool's current template, handing out the next
/// nonce2. The template is refreshed first when it is older than the refresh
/// interval.
pub fn gen_gbt_work(ctx: &ClientContext, pool: &Pool, work: &mut Work) -> Result<(), FetchError> {
    if pool
        .last_work_elapsed()
        .is_none_or(|elapsed| elapsed > ctx.config.gbt_refresh)
    {
        update_gbt(ctx, pool);
    }

    let mut gbt = pool.gbt.write();

    let session = gbt
        .as_mut()
        .context(fetch_error::NoTemplateSnafu { pool: pool.id })?;

    let nonce2 = session.nonce2;
    session.template.coinbase.set_nonce2(nonce2);
    session.nonce2 += 1;

    let gbt = RwLockWriteGuard::downgrade(gbt);

    let session = gbt
        .as_ref()
        .context(fetch_error::NoTemplateSnafu { pool: pool.id })?;

    let merkle_root = session.template.merkle_root(|data| ctx.algorithm.hash(data));
    let header = session.template.header(&merkle_root);

    if work.data.len() < header.len() {
        work.data.resize(header.len(), 0);
    }
    work.data[..header.len()].copy_from_slice(&header);
    work.target = session.template.target;
    work.coinbase = Some(session.template.coinbase.clone());
    work.transactions = session.transactions.clone();
    work.gbt_txns = session.template.txn_count();
    work.job_id = session.template.workid.clone();
    work.nonce2 = nonce2;

    drop(gbt);

    debug!("Generated GBT header {}", hex::encode(header));

    work.midstate = ctx
        .algorithm
        .midstate()
        .map(|compute| compute.midstate(&work.data));

    ctx.totals.local_work.fetch_add(1, Ordering::Relaxed);

    work.pool = pool.id;
    work.gbt = true;
    work.id = ctx.next_work_id();
    work.longpoll = false;
    work.mode = GetworkMode::Gbt;
    work.work_block = ctx.blocks.work_block();
    work.epoch = pool.epoch();
    work.tv_staged = Instant::now();

    Ok(())
}

fn fetch(
    ctx: &ClientContext,
    pool: &Pool,
    conn: &mut Connection,
    call: &RpcCall,
) -> Result<Work, FetchError> {
    let mut work = Work::new(pool.id, ctx.algorithm.kind().work_len());
    work.epoch = pool.epoch();

    debug!("Sending {} get RPC call: {}", pool.url, call.body);

    let start = Instant::now();
    work.tv_getwork = Some(start);

    let result = json_rpc_call(ctx, conn, pool, call)
        .map_err(FetchError::from)
        .and_then(|response| {
            work.rolltime = response.rolltime;
            work_decode(ctx, pool, &mut work, &response)
        });

    let reply = Instant::now();
    work.tv_getwork_reply = Some(reply);
    pool.stats.lock().record_getwork(reply - start);

    work.longpoll = false;
    work.mode = GetworkMode::Pool;
    ctx.totals.getworks.fetch_add(1, Ordering::Relaxed);
    pool.count_getwork();

    if let Err(err) = result {
        debug!("Failed to fetch work from {pool}: {err}");
        return Err(err);
    }

    if work.gbt {
        gen_gbt_work(ctx, pool, &mut work)?;
    } else {
        work.id = ctx.next_work_id();
        work.work_block = ctx.blocks.work_block();
    }

    Ok(work)
}

/// One pool-poll round trip: request work with the pool's current request
/// body and decode it.
pub fn get_upstream_work(
    ctx: &ClientContext,
    pool: &Pool,
    conn: &mut Connection,
) -> Result<Work, FetchError> {
    fetch(ctx, pool, conn, &RpcCall::new(&pool.url, pool.rpc_req()))
}

/// Turns a long-poll reply into staged work. Returns whether anything was
/// staged.
pub fn convert_to_work(
    ctx: &ClientContext,
    pool: &Pool,
    response: &RpcResponse,
    tv_lp: Instant,
    tv_lp_reply: Instant,
) -> Result<bool, FetchError> {
    let mut work = Work::new(pool.id, ctx.algorithm.kind().work_len());
    work.epoch = pool.epoch();

    work_decode(ctx, pool, &mut work, response)
        .inspect_err(|err| error!("Could not convert longpoll data to work: {err}"))?;

    ctx.totals.getworks.fetch_add(1, Ordering::Relaxed);
    pool.count_getwork();

    work.rolltime = response.rolltime;
    work.tv_getwork = Some(tv_lp);
    work.tv_getwork_reply = Some(tv_lp_reply);

    if pool.status() == PoolStatus::Rejecting {
        work.mandatory = true;
    }

    if pool.has_gbt() {
        gen_gbt_work(ctx, pool, &mut work)?;
    } else {
        work.id = ctx.next_work_id();
        work.work_block = ctx.blocks.work_block();
    }

    work.longpoll = true;
    work.mode = GetworkMode::LongPoll;

    ctx.test_work_current(&mut work);

    if ctx.current_pool_id() != Some(pool.id)
        && ctx.config.fail_only
        && pool.status() != PoolStatus::Rejecting
    {
        debug!("Discarding longpoll work from backup {pool}");
        return Ok(false);
    }

    let work = ctx.clone_work(work);
    debug!("Pushing converted work {} to stage", work.id);
    ctx.stage_work(work);

    Ok(true)
}

/// Probes a pool: GBT first, falling back to getwork. Records what the pool
/// advertised and marks it alive on success.
pub fn pool_active(ctx: &ClientContext, pool: &Pool) -> Result<Work, FetchError> {
    let mut conn = pool.connections.acquire(ctx.config.connection_ceiling());
    let result = probe(ctx, pool, &mut conn);
    pool.connections.release(conn);

    match &result {
        Ok(_) => {
            pool.set_status(PoolStatus::Alive);
            pool.set_has_stratum(pool.stratum_url().is_some());

            if let Some(stratum_url) = pool.stratum_url() {
                info!("{pool} advertises stratum at {stratum_url}");
            }

            if let Some(lp_url) = pool.lp_url() {
                debug!("{pool} advertises long-poll at {lp_url}");
            }
        }
        Err(err) => {
            warn!("{pool} not responding: {err}");
            pool.set_status(PoolStatus::Dead);
        }
    }

    result
}

fn probe(ctx: &ClientContext, pool: &Pool, conn: &mut Connection) -> Result<Work, FetchError> {
    let gbt_req = gbt::gbt_request(None);

    debug!("Probing {pool} for GBT support");

    pool.set_has_gbt(true);
    pool.set_rpc_req(gbt_req.clone());

    match fetch(ctx, pool, conn, &RpcCall::new(&pool.url, gbt_req).probe()) {
        Ok(work) => {
            info!("GBT support detected on {pool}");
            return Ok(work);
        }
        Err(err) => debug!("No usable GBT on {pool} ({err}), falling back to getwork"),
    }

    pool.set_has_gbt(false);
    pool.clear_probed();
    pool.set_rpc_req(gbt::getwork_request());

    fetch(
        ctx,
        pool,
        conn,
        &RpcCall::new(&pool.url, pool.rpc_req()).probe(),
    )
}
