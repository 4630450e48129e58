use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
    #[arg(
        long = "pool",
        short = 'o',
        help = "Fetch work from <POOL>. Accepts `[quota;][proxytype:host:port|]url`. May be repeated."
    )]
    pub pools: Vec<PoolUrl>,

    #[arg(long, short = 'u', help = "Authenticate to pools as <USER>.")]
    pub user: Option<String>,

    #[arg(long, short = 'p', help = "Authenticate to pools with <PASS>.")]
    pub pass: Option<String>,

    #[arg(long, help = "Use header layout for <ALGORITHM>. [default: sha256d]")]
    pub algorithm: Option<AlgorithmKind>,

    #[arg(long, short = 't', help = "Size work demand for <THREADS> mining threads. [default: 1]")]
    pub threads: Option<usize>,

    #[arg(long, short = 'Q', help = "Keep <QUEUE> extra work items staged. [default: 1]")]
    pub queue: Option<usize>,

    #[arg(long, short = 's', help = "Roll work for <SCAN_TIME> seconds. [default: 7]")]
    pub scan_time: Option<u32>,

    #[arg(long, short = 'E', help = "Expire work after <EXPIRY> seconds. [default: 28]")]
    pub expiry: Option<u32>,

    #[arg(long, help = "Set Decred vote bits to <VOTE>. [default: 0]")]
    pub vote: Option<u16>,

    #[arg(long, help = "Batch network requests and space them out.")]
    pub delaynet: bool,

    #[arg(long, help = "Only fetch work from the current pool.")]
    pub failover_only: bool,

    #[arg(long, help = "Drop shares instead of caching them on communication failure.")]
    pub lowmem: bool,

    #[arg(long, help = "Reach pools through SOCKS proxy at <SOCKS_PROXY>.")]
    pub socks_proxy: Option<String>,

    #[arg(long, short = 'I', help = "Set plain GPU <INTENSITY>, comma separated per device.")]
    pub intensity: Option<String>,

    #[arg(long, short = 'X', help = "Set GPU <XINTENSITY>, comma separated per device.")]
    pub xintensity: Option<String>,

    #[arg(long, help = "Set raw GPU <RAWINTENSITY>, comma separated per device.")]
    pub rawintensity: Option<String>,
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    #[test]
    fn repeated_pools() {
        let options = Options::try_parse_from([
            "poolwork",
            "--pool",
            "http://a.example:8332",
            "-o",
            "2;b.example",
        ])
        .unwrap();

        assert_eq!(
            options.pools,
            vec![
                "http://a.example:8332".parse::<PoolUrl>().unwrap(),
                "2;http://b.example".parse::<PoolUrl>().unwrap(),
            ]
        );
    }

    #[test]
    fn flags_and_values() {
        let options = Options::try_parse_from([
            "poolwork",
            "--algorithm",
            "neoscrypt",
            "--threads",
            "4",
            "--failover-only",
            "--lowmem",
            "--socks-proxy",
            "127.0.0.1:9050",
        ])
        .unwrap();

        assert_eq!(options.algorithm, Some(AlgorithmKind::Neoscrypt));
        assert_eq!(options.threads, Some(4));
        assert!(options.failover_only);
        assert!(options.lowmem);
        assert!(!options.delaynet);
        assert_eq!(options.socks_proxy.as_deref(), Some("127.0.0.1:9050"));
    }

    #[test]
    fn malformed_pool_rejected() {
        assert!(Options::try_parse_from(["poolwork", "--pool", "x;http://pool"]).is_err());
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(Options::try_parse_from(["poolwork", "--algorithm", "x11"]).is_err());
    }
}
