use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SubmitOutcome {
    Accepted,
    Rejected { reason: Option<String> },
    Stale,
    Discarded,
}

/// Serializes a solved work item into the JSON-RPC submission body.
pub fn submit_body(kind: AlgorithmKind, work: &Work) -> String {
    if work.gbt
        && let Some(coinbase) = &work.coinbase
    {
        let header = gbt::flip80(&work.data);
        let block = gbt::serialize_block(&header, work.gbt_txns, coinbase, &work.transactions);
        return gbt::submitblock_request(&block, work.job_id.as_deref());
    }

    let mut data = match kind {
        AlgorithmKind::Decred => gbt::flip180(&work.data).to_vec(),
        AlgorithmKind::Credits => gbt::flip168(&work.data).to_vec(),
        _ => gbt::flip128(&work.data).to_vec(),
    };

    if kind == AlgorithmKind::Decred {
        LittleEndian::write_u32(&mut data[45 * 4..46 * 4], 0x8000_0001);
        LittleEndian::write_u32(&mut data[46 * 4..47 * 4], 0);
        LittleEndian::write_u32(&mut data[47 * 4..48 * 4], 0x0000_05a0);
    }

    gbt::getwork_submit_request(&hex::encode(&data[..kind.submit_len()]))
}

fn share_result(pool: &Pool, work: &Work, response: &RpcResponse, resubmit: bool) -> SubmitOutcome {
    let result = response.result();
    let resubmitted = if resubmit { " (resubmit)" } else { "" };

    if result.as_bool() == Some(true) || (work.gbt && result.is_null()) {
        pool.record_accepted();
        info!("Accepted work {} from {pool}{resubmitted}", work.id);
        return SubmitOutcome::Accepted;
    }

    let reason = response
        .json
        .get("reject-reason")
        .and_then(Value::as_str)
        .or_else(|| result.as_str())
        .map(String::from);

    pool.record_rejected();

    match &reason {
        Some(reason) => info!("Rejected work {} from {pool} ({reason}){resubmitted}", work.id),
        None => info!("Rejected work {} from {pool}{resubmitted}", work.id),
    }

    SubmitOutcome::Rejected { reason }
}

/// Sends one submission attempt. The first failure flags the pool and warns
/// once; the first success afterwards clears it.
pub fn submit_upstream_work(
    ctx: &ClientContext,
    pool: &Pool,
    work: &Work,
    conn: &mut Connection,
    resubmit: bool,
) -> Result<SubmitOutcome, TransportError> {
    let body = submit_body(ctx.algorithm.kind(), work);

    debug!("Sending {} submit RPC call: {body}", pool.url);

    let mut call = RpcCall::new(&pool.url, body).share();

    if work.gbt {
        call = call.null_result();
    }

    let response = match json_rpc_call(ctx, conn, pool, &call) {
        Ok(response) => response,
        Err(err) => {
            info!("Submit to {pool} failed: {err}");

            if !pool.set_submit_fail() {
                ctx.totals.remote_failures.fetch_add(1, Ordering::Relaxed);
                pool.count_remote_failure();

                if ctx.config.lowmem {
                    warn!("{pool} communication failure, discarding shares");
                } else {
                    warn!("{pool} communication failure, caching submissions");
                }
            }

            return Err(err);
        }
    };

    if pool.clear_submit_fail() {
        warn!("{pool} communication resumed, submitting work");
    }

    Ok(share_result(pool, work, &response, resubmit))
}

/// Submits `work`, retrying until it is accepted or rejected, goes stale,
/// or low-memory mode asks for it to be dropped.
pub fn submit_work(ctx: &ClientContext, work: &Work) -> SubmitOutcome {
    let Some(pool) = ctx.pools.get(work.pool) else {
        return SubmitOutcome::Discarded;
    };

    let mut conn = pool.connections.acquire(ctx.config.connection_ceiling());
    let mut resubmit = false;

    let outcome = loop {
        if let Ok(outcome) = submit_upstream_work(ctx, &pool, work, &mut conn, resubmit) {
            break outcome;
        }

        if ctx.config.lowmem {
            info!("{pool} share being discarded to minimise memory cache");
            break SubmitOutcome::Discarded;
        }

        resubmit = true;

        if ctx.stale_work(work, true) {
            info!("{pool} share became stale while retrying submit, discarding");
            ctx.totals.stale.fetch_add(1, Ordering::Relaxed);
            pool.record_stale();
            break SubmitOutcome::Stale;
        }

        if !ctx.sleep(ctx.config.submit_retry) {
            break SubmitOutcome::Discarded;
        }

        info!("Retrying submit of work {} to {pool}", work.id);
    };

    pool.connections.release(conn);

    outcome
}

pub fn spawn_submit(ctx: Arc<ClientContext>, work: Work) -> io::Result<JoinHandle<SubmitOutcome>> {
    thread::Builder::new()
        .name(format!("submit-{}", work.id))
        .spawn(move || submit_work(&ctx, &work))
}
