use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Watch {
    #[arg(long, help = "Report staged work every <INTERVAL> seconds. [default: 10]")]
    interval: Option<u64>,
}

impl Watch {
    pub(crate) fn run(self, settings: Settings, cancel: CancellationToken) -> Result {
        let interval = Duration::from_secs(self.interval.unwrap_or(10).max(1));

        let ctx = Arc::new(ClientContext::new(settings.engine_config()).with_cancel(cancel));

        for url in settings.pools() {
            ctx.add_pool(url, settings.user(), settings.pass());
        }

        for pool in ctx.pools.all() {
            match upstream::pool_active(&ctx, &pool) {
                Ok(work) if ctx.current_pool_id() == Some(pool.id) => ctx.stage_work(work),
                Ok(_) => {}
                Err(err) => {
                    ctx.disable_pool(pool.id);
                    debug!("Disabled {pool}: {err}");
                }
            }
        }

        let current = ctx
            .pools
            .all()
            .into_iter()
            .find(|pool| pool.status() == PoolStatus::Alive)
            .ok_or_else(|| anyhow!("no pool responded"))?;

        ctx.switch_pool(current.id);

        let longpoll = longpoll::spawn_longpoll(ctx.clone(), current.id)?;
        let reaper = connections::spawn_reaper(ctx.clone())?;

        let mut block = ctx.blocks.work_block();

        while ctx.sleep(interval) {
            let work_block = ctx.blocks.work_block();

            if work_block != block {
                info!(
                    "Block {} is current",
                    ctx.blocks
                        .current()
                        .map(hex::encode)
                        .unwrap_or_default()
                );
                block = work_block;
            }

            if ctx.stage.len() < ctx.config.demand() && !ctx.clone_available() {
                refill(&ctx, &current);
            }

            let totals = ctx.totals.snapshot();

            info!(
                "{} staged, {} rollable, {} getworks, {} stale, longpoll {}",
                ctx.stage.len(),
                ctx.stage.rollable(),
                totals.getworks,
                totals.stale,
                if ctx.have_longpoll() { "active" } else { "inactive" },
            );
        }

        info!("Shutting down");

        // A long-poll parked in a request is abandoned at exit.
        if longpoll.is_finished() {
            match longpoll.join() {
                Ok(exit) => debug!("Long-poll exited: {exit}"),
                Err(_) => error!("Long-poll thread panicked"),
            }
        }

        if reaper.join().is_err() {
            error!("Reaper thread panicked");
        }

        Ok(())
    }
}

fn refill(ctx: &ClientContext, pool: &Pool) {
    let mut conn = pool.connections.acquire(ctx.config.connection_ceiling());

    match upstream::get_upstream_work(ctx, pool, &mut conn) {
        Ok(work) => ctx.stage_work(work),
        Err(err) => warn!("Failed to refill work from {pool}: {err}"),
    }

    pool.connections.release(conn);
}
