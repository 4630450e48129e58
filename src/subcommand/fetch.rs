use {super::*, anyhow::Context};

#[derive(Debug, Parser)]
pub(crate) struct Fetch {
    #[arg(long, help = "Fetch from pool number <INDEX> in the pool list. [default: 0]")]
    index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Output {
    pub pool: String,
    pub gbt: bool,
    pub longpoll_url: Option<String>,
    pub stratum_url: Option<String>,
    pub mode: GetworkMode,
    pub header: String,
    pub target: String,
    pub job_id: Option<String>,
    pub rolltime: u32,
    pub stats: PoolStats,
    pub totals: TotalsSnapshot,
}

impl Fetch {
    pub(crate) fn run(self, settings: Settings) -> Result {
        let index = self.index.unwrap_or_default();

        let url = settings
            .pools()
            .get(index)
            .with_context(|| format!("no pool at index {index}"))?;

        let ctx = ClientContext::new(settings.engine_config());
        let pool = ctx.pool(ctx.add_pool(url, settings.user(), settings.pass()))?;

        info!("Fetching work from {pool}");

        let work = upstream::pool_active(&ctx, &pool)
            .with_context(|| format!("failed to fetch work from `{}`", pool.url))?;

        let output = Output {
            pool: pool.url.clone(),
            gbt: pool.has_gbt(),
            longpoll_url: pool.lp_url(),
            stratum_url: pool.stratum_url(),
            mode: work.mode,
            header: work.header_hex(),
            target: work.target_hex(),
            job_id: work.job_id.clone(),
            rolltime: work.rolltime,
            stats: pool.stats(),
            totals: ctx.totals.snapshot(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);

        Ok(())
    }
}
