use {super::*, anyhow::Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProxyKind {
    #[display("http")]
    Http,
    #[display("http0")]
    Http0,
    #[display("socks4")]
    Socks4,
    #[display("socks4a")]
    Socks4a,
    #[display("socks5")]
    Socks5,
    #[display("socks5h")]
    Socks5h,
}

impl FromStr for ProxyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "http0" => Ok(Self::Http0),
            "socks4" => Ok(Self::Socks4),
            "socks4a" => Ok(Self::Socks4a),
            "socks5" => Ok(Self::Socks5),
            "socks5h" => Ok(Self::Socks5h),
            _ => bail!("unknown proxy type `{s}`"),
        }
    }
}

impl ProxyKind {
    fn scheme(self) -> &'static str {
        match self {
            Self::Http | Self::Http0 => "http",
            Self::Socks4 => "socks4",
            Self::Socks4a => "socks4a",
            Self::Socks5 => "socks5",
            Self::Socks5h => "socks5h",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub kind: ProxyKind,
    pub address: String,
}

impl Proxy {
    pub fn to_url(&self) -> String {
        format!("{}://{}", self.kind.scheme(), self.address)
    }
}

impl FromStr for Proxy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, address) = s
            .split_once(':')
            .with_context(|| format!("proxy `{s}` is not of the form type:host:port"))?;

        let address = address.trim_start_matches("//");

        ensure!(
            address
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok()),
            "proxy address `{address}` is not host:port"
        );

        Ok(Self {
            kind: kind.parse()?,
            address: address.into(),
        })
    }
}

/// A pool address in the legacy `[quota;][proxytype:host:port|]url` form.
/// URLs without a scheme default to `http://`.
#[derive(Debug, Clone, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct PoolUrl {
    pub quota: Option<u32>,
    pub proxy: Option<Proxy>,
    pub url: String,
}

impl FromStr for PoolUrl {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        let (quota, rest) = match s.split_once(';') {
            Some((quota, rest)) => (
                Some(
                    quota
                        .trim()
                        .parse::<u32>()
                        .with_context(|| format!("invalid quota `{quota}` in pool `{s}`"))?,
                ),
                rest,
            ),
            None => (None, s),
        };

        let (proxy, url) = match rest.split_once('|') {
            Some((proxy, url)) => (
                Some(
                    proxy
                        .parse::<Proxy>()
                        .with_context(|| format!("invalid proxy in pool `{s}`"))?,
                ),
                url,
            ),
            None => (None, rest),
        };

        let url = url.trim();

        ensure!(!url.is_empty(), "pool `{s}` has no URL");
        ensure!(
            !url.chars().any(char::is_whitespace),
            "pool URL `{url}` contains whitespace"
        );

        let url = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{url}")
        };

        Ok(Self { quota, proxy, url })
    }
}

impl Display for PoolUrl {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(quota) = self.quota {
            write!(f, "{quota};")?;
        }

        if let Some(proxy) = &self.proxy {
            write!(f, "{}:{}|", proxy.kind, proxy.address)?;
        }

        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq, serde_json::json};

    #[test]
    fn plain_url() {
        let url = "http://pool.example:8332".parse::<PoolUrl>().unwrap();
        assert_eq!(
            url,
            PoolUrl {
                quota: None,
                proxy: None,
                url: "http://pool.example:8332".into(),
            }
        );
    }

    #[test]
    fn bare_host_gets_scheme() {
        let url = "pool.example:8332".parse::<PoolUrl>().unwrap();
        assert_eq!(url.url, "http://pool.example:8332");
    }

    #[test]
    fn quota_and_proxy() {
        let url = "5;socks5h:127.0.0.1:9050|https://pool.example"
            .parse::<PoolUrl>()
            .unwrap();

        assert_eq!(url.quota, Some(5));
        assert_eq!(
            url.proxy,
            Some(Proxy {
                kind: ProxyKind::Socks5h,
                address: "127.0.0.1:9050".into(),
            })
        );
        assert_eq!(url.proxy.as_ref().unwrap().to_url(), "socks5h://127.0.0.1:9050");
        assert_eq!(url.url, "https://pool.example");
    }

    #[test]
    fn http0_proxy_maps_to_http() {
        let url = "http0:proxy:3128|pool".parse::<PoolUrl>().unwrap();
        assert_eq!(url.proxy.unwrap().to_url(), "http://proxy:3128");
    }

    #[test]
    fn display_round_trips() {
        for s in [
            "http://pool.example",
            "3;http://pool.example",
            "2;socks4:10.0.0.1:1080|http://pool.example",
        ] {
            assert_eq!(s.parse::<PoolUrl>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn malformed() {
        for s in [
            "",
            "x;http://pool",
            "-1;http://pool",
            "ftp:host:1|http://pool",
            "socks5:host|http://pool",
            "socks5:host:port|http://pool",
            "3;",
            "http://po ol",
        ] {
            assert!(s.parse::<PoolUrl>().is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn deserializes_from_string() {
        let url: PoolUrl = serde_json::from_value(json!("1;pool.example")).unwrap();
        assert_eq!(url.quota, Some(1));
        assert_eq!(serde_json::to_value(&url).unwrap(), json!("1;http://pool.example"));
    }
}
