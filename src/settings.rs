use {super::*, anyhow::Context};

const SUBMIT_RETRY: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pools: Vec<PoolUrl>,
    user: Option<String>,
    pass: Option<String>,
    algorithm: Option<AlgorithmKind>,
    threads: Option<usize>,
    queue: Option<usize>,
    scan_time: Option<u32>,
    expiry: Option<u32>,
    vote: Option<u16>,
    delaynet: bool,
    failover_only: bool,
    lowmem: bool,
    socks_proxy: Option<String>,
    intensity: Option<String>,
    xintensity: Option<String>,
    rawintensity: Option<String>,
}

impl Settings {
    /// Loads settings from the command line and `POOLWORK_*` environment
    /// variables, in that order of priority.
    pub fn load(options: Options) -> Result<Self> {
        let mut env = BTreeMap::<String, String>::new();

        for (var, value) in env::vars_os() {
            let Some(var) = var.to_str() else {
                continue;
            };

            let Some(key) = var.strip_prefix("POOLWORK_") else {
                continue;
            };

            env.insert(
                key.into(),
                value.into_string().map_err(|value| {
                    anyhow!(
                        "environment variable `{var}` not valid unicode: `{}`",
                        value.to_string_lossy()
                    )
                })?,
            );
        }

        Self::merge(options, env)
    }

    pub fn merge(options: Options, env: BTreeMap<String, String>) -> Result<Self> {
        let settings = Self::from_options(&options)
            .or(Self::from_env(&env)?)
            .or_defaults();

        settings.validate()?;

        Ok(settings)
    }

    pub fn from_options(options: &Options) -> Self {
        Self {
            pools: options.pools.clone(),
            user: options.user.clone(),
            pass: options.pass.clone(),
            algorithm: options.algorithm,
            threads: options.threads,
            queue: options.queue,
            scan_time: options.scan_time,
            expiry: options.expiry,
            vote: options.vote,
            delaynet: options.delaynet,
            failover_only: options.failover_only,
            lowmem: options.lowmem,
            socks_proxy: options.socks_proxy.clone(),
            intensity: options.intensity.clone(),
            xintensity: options.xintensity.clone(),
            rawintensity: options.rawintensity.clone(),
        }
    }

    pub fn from_env(env: &BTreeMap<String, String>) -> Result<Self> {
        let get_bool = |key: &str| {
            env.get(key)
                .map(|value| !value.is_empty() && value != "0" && value.to_lowercase() != "false")
                .unwrap_or_default()
        };

        let get_string = |key: &str| env.get(key).cloned();

        let get_u32 = |key: &str| -> Result<Option<u32>> {
            env.get(key)
                .map(|int| int.parse::<u32>())
                .transpose()
                .with_context(|| {
                    format!("failed to parse environment variable POOLWORK_{key} as u32")
                })
        };

        let get_usize = |key: &str| -> Result<Option<usize>> {
            env.get(key)
                .map(|int| int.parse::<usize>())
                .transpose()
                .with_context(|| {
                    format!("failed to parse environment variable POOLWORK_{key} as usize")
                })
        };

        let get_u16 = |key: &str| -> Result<Option<u16>> {
            env.get(key)
                .map(|int| int.parse::<u16>())
                .transpose()
                .with_context(|| {
                    format!("failed to parse environment variable POOLWORK_{key} as u16")
                })
        };

        let pools = env
            .get("POOL")
            .map(|pools| {
                pools
                    .split(',')
                    .map(str::trim)
                    .filter(|pool| !pool.is_empty())
                    .map(|pool| {
                        pool.parse::<PoolUrl>().with_context(|| {
                            format!("failed to parse environment variable POOLWORK_POOL entry `{pool}`")
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let algorithm = env
            .get("ALGORITHM")
            .map(|algorithm| algorithm.parse::<AlgorithmKind>())
            .transpose()
            .context("failed to parse environment variable POOLWORK_ALGORITHM as algorithm")?;

        Ok(Self {
            pools,
            user: get_string("USER"),
            pass: get_string("PASS"),
            algorithm,
            threads: get_usize("THREADS")?,
            queue: get_usize("QUEUE")?,
            scan_time: get_u32("SCAN_TIME")?,
            expiry: get_u32("EXPIRY")?,
            vote: get_u16("VOTE")?,
            delaynet: get_bool("DELAYNET"),
            failover_only: get_bool("FAILOVER_ONLY"),
            lowmem: get_bool("LOWMEM"),
            socks_proxy: get_string("SOCKS_PROXY"),
            intensity: get_string("INTENSITY"),
            xintensity: get_string("XINTENSITY"),
            rawintensity: get_string("RAWINTENSITY"),
        })
    }

    /// Merge self with another Settings, self takes priority
    pub fn or(self, other: Self) -> Self {
        Self {
            pools: if self.pools.is_empty() {
                other.pools
            } else {
                self.pools
            },
            user: self.user.or(other.user),
            pass: self.pass.or(other.pass),
            algorithm: self.algorithm.or(other.algorithm),
            threads: self.threads.or(other.threads),
            queue: self.queue.or(other.queue),
            scan_time: self.scan_time.or(other.scan_time),
            expiry: self.expiry.or(other.expiry),
            vote: self.vote.or(other.vote),
            delaynet: self.delaynet || other.delaynet,
            failover_only: self.failover_only || other.failover_only,
            lowmem: self.lowmem || other.lowmem,
            socks_proxy: self.socks_proxy.or(other.socks_proxy),
            intensity: self.intensity.or(other.intensity),
            xintensity: self.xintensity.or(other.xintensity),
            rawintensity: self.rawintensity.or(other.rawintensity),
        }
    }

    fn or_defaults(self) -> Self {
        let defaults = Config::default();

        Self {
            user: Some(self.user.unwrap_or_default()),
            pass: Some(self.pass.unwrap_or_default()),
            algorithm: Some(self.algorithm.unwrap_or(defaults.algorithm)),
            threads: Some(self.threads.unwrap_or(defaults.mining_threads)),
            queue: Some(self.queue.unwrap_or(defaults.queue)),
            scan_time: Some(self.scan_time.unwrap_or(defaults.scan_time)),
            expiry: Some(self.expiry.unwrap_or(defaults.expiry)),
            vote: Some(self.vote.unwrap_or(defaults.vote)),
            ..self
        }
    }

    fn validate(&self) -> Result {
        ensure!(
            !self.pools.is_empty(),
            "no pools configured, pass `--pool` or set POOLWORK_POOL"
        );

        ensure!(self.threads() > 0, "mining threads must be at least 1");
        ensure!(self.scan_time() > 0, "scan time must be at least 1 second");

        self.intensity()
            .context("invalid GPU intensity settings")?;

        Ok(())
    }

    pub fn pools(&self) -> &[PoolUrl] {
        &self.pools
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or_default()
    }

    pub fn pass(&self) -> &str {
        self.pass.as_deref().unwrap_or_default()
    }

    pub fn algorithm(&self) -> AlgorithmKind {
        self.algorithm.unwrap_or(AlgorithmKind::Sha256d)
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or(1)
    }

    pub fn queue(&self) -> usize {
        self.queue.unwrap_or(1)
    }

    pub fn scan_time(&self) -> u32 {
        self.scan_time.unwrap_or(7)
    }

    pub fn expiry(&self) -> u32 {
        self.expiry.unwrap_or(28)
    }

    pub fn vote(&self) -> u16 {
        self.vote.unwrap_or_default()
    }

    pub fn intensity(&self) -> Result<Option<IntensityMode>> {
        IntensityMode::resolve(
            self.rawintensity.as_deref(),
            self.xintensity.as_deref(),
            self.intensity.as_deref(),
        )
    }

    pub fn engine_config(&self) -> Config {
        Config {
            algorithm: self.algorithm(),
            mining_threads: self.threads(),
            queue: self.queue(),
            scan_time: self.scan_time(),
            expiry: self.expiry(),
            delaynet: self.delaynet,
            fail_only: self.failover_only,
            lowmem: self.lowmem,
            socks_proxy: self.socks_proxy.clone(),
            vote: self.vote(),
            submit_retry: SUBMIT_RETRY,
            ..Default::default()
        }
    }
}
