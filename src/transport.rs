use {
    super::*,
    error::{DecodeSnafu, EmptyResponseSnafu, NetworkSnafu, RpcSnafu},
    reqwest::header::{CONTENT_TYPE, HeaderMap, USER_AGENT as USER_AGENT_HEADER},
    snafu::ResultExt,
};

const MINING_EXTENSIONS: &str = "longpoll midstate rollntime submitold";

/// Pool capabilities advertised in HTTP response headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderInfo {
    pub lp_path: Option<String>,
    pub reason: Option<String>,
    pub stratum_url: Option<String>,
    pub rolltime: u32,
    pub had_rolltime: bool,
    pub can_roll: bool,
    pub had_expire: bool,
}

impl HeaderInfo {
    /// Header names match case-insensitively; values are trimmed and blank
    /// values ignored.
    pub fn parse(headers: &HeaderMap, scan_time: u32) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        let mut info = Self {
            lp_path: get("x-long-polling"),
            reason: get("x-reject-reason"),
            stratum_url: get("x-stratum"),
            ..Default::default()
        };

        if let Some(roll) = get("x-roll-ntime") {
            if roll.starts_with(['N', 'n']) {
                debug!("X-Roll-Ntime: N found");
            } else {
                info.can_roll = true;

                let expiry = roll
                    .get(..7)
                    .filter(|prefix| prefix.eq_ignore_ascii_case("expire="))
                    .and_then(|_| roll.get(7..))
                    .filter(|rest| !rest.is_empty());

                if let Some(expiry) = expiry {
                    info.rolltime = expiry.trim().parse().unwrap_or(0);
                    info.had_expire = true;
                    debug!("X-Roll-Ntime expiry set to {}", info.rolltime);
                } else {
                    info.rolltime = scan_time;
                    debug!("X-Roll-Ntime found");
                }
            }

            info.had_rolltime = true;
        }

        info
    }
}

/// Time of the last non-share network call, shared by every pool.
#[derive(Debug, Default)]
pub struct NetTime {
    last: RwLock<Option<Instant>>,
}

impl NetTime {
    /// Keeps non-share calls at least `spacing` apart. Shares are never
    /// delayed but still stamp the clock.
    pub fn throttle(&self, share: bool, spacing: Duration) {
        if !share {
            let last = *self.last.read();

            if let Some(wait) = last.and_then(|last| spacing.checked_sub(last.elapsed()))
                && !wait.is_zero()
            {
                debug!("Delaying {}ms for network rate limiting", wait.as_millis());
                thread::sleep(wait);
            }
        }

        *self.last.write() = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct RpcCall {
    pub url: String,
    pub body: String,
    pub probe: bool,
    pub longpoll: bool,
    pub share: bool,
    /// Accept `"result": null` as success. `submitblock` answers a
    /// good block with null.
    pub null_result: bool,
}

impl RpcCall {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            probe: false,
            longpoll: false,
            share: false,
            null_result: false,
        }
    }

    pub fn probe(self) -> Self {
        Self {
            probe: true,
            ..self
        }
    }

    pub fn longpoll(self) -> Self {
        Self {
            longpoll: true,
            ..self
        }
    }

    pub fn share(self) -> Self {
        Self {
            share: true,
            ..self
        }
    }

    pub fn null_result(self) -> Self {
        Self {
            null_result: true,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct RpcResponse {
    pub json: Value,
    pub rolltime: u32,
}

impl RpcResponse {
    pub fn result(&self) -> &Value {
        &self.json["result"]
    }
}

fn proxy_url(ctx: &ClientContext, pool: &Pool) -> Option<String> {
    pool.proxy.clone().or_else(|| {
        ctx.config.socks_proxy.as_ref().map(|proxy| {
            if proxy.contains("://") {
                proxy.clone()
            } else {
                format!("socks4://{proxy}")
            }
        })
    })
}

/// Performs one JSON-RPC round trip on `conn`. Any failure drops the
/// connection's client so the next call starts from a fresh socket.
pub fn json_rpc_call(
    ctx: &ClientContext,
    conn: &mut Connection,
    pool: &Pool,
    call: &RpcCall,
) -> Result<RpcResponse, TransportError> {
    match perform(ctx, conn, pool, call) {
        Ok(response) => {
            conn.last_error = None;
            Ok(response)
        }
        Err(err) => {
            info!("{err}");
            conn.last_error = Some(err.to_string());
            conn.reset();
            Err(err)
        }
    }
}

fn perform(
    ctx: &ClientContext,
    conn: &mut Connection,
    pool: &Pool,
    call: &RpcCall,
) -> Result<RpcResponse, TransportError> {
    let timeout = if call.longpoll {
        ctx.config.longpoll_timeout
    } else {
        ctx.config.request_timeout
    };

    let probing = call.probe && !pool.probed();
    let proxy = proxy_url(ctx, pool);
    let client = conn
        .client(proxy.as_deref(), !ctx.config.delaynet || call.share)
        .context(NetworkSnafu)?;

    debug!("JSON protocol request:\n{}", call.body);

    if ctx.config.delaynet {
        ctx.nettime.throttle(call.share, ctx.config.rate_limit_spacing);
    }

    let response = client
        .post(&call.url)
        .timeout(timeout)
        .basic_auth(&pool.user, Some(&pool.pass))
        .header(CONTENT_TYPE, "application/json")
        .header("X-Mining-Extensions", MINING_EXTENSIONS)
        .header(USER_AGENT_HEADER, USER_AGENT)
        .body(call.body.clone())
        .send()
        .and_then(Response::error_for_status)
        .context(NetworkSnafu)?;

    let headers = HeaderInfo::parse(response.headers(), ctx.config.scan_time);

    debug!("HTTP response headers: {:?}", response.headers());

    let body = response.text().context(NetworkSnafu)?;

    if body.is_empty() {
        return EmptyResponseSnafu.fail();
    }

    {
        let mut stats = pool.stats.lock();
        stats.times_sent += 1;
        stats.bytes_sent += call.body.len() as u64;
        stats.times_received += 1;
        stats.bytes_received += body.len() as u64;
        stats.record_headers(&headers);
    }

    if probing {
        pool.record_probe(&headers);
    }

    let mut json = serde_json::from_str::<Value>(&body)
        .inspect_err(|_| debug!("JSON protocol response:\n{body}"))
        .context(DecodeSnafu)?;

    debug!("JSON protocol response:\n{json:#}");

    let error = json.get("error").filter(|error| !error.is_null());

    let result_missing = match json.get("result") {
        None => true,
        Some(result) => result.is_null() && !call.null_result,
    };

    if result_missing || error.is_some() {
        let message = error
            .map(|error| error.to_string())
            .unwrap_or_else(|| "(unknown reason)".into());
        return RpcSnafu { message }.fail();
    }

    if let (Some(reason), Some(object)) = (headers.reason, json.as_object_mut()) {
        object.insert("reject-reason".into(), Value::String(reason));
    }

    Ok(RpcResponse {
        json,
        rolltime: headers.rolltime,
    })
}
