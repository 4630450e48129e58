use super::*;

/// Capabilities advertised on every getblocktemplate request.
pub const GBT_CAPABILITIES: [&str; 3] = ["coinbasetxn", "workid", "coinbase/append"];

fn rpc(method: &str, params: Value) -> String {
    let mut request = Map::new();
    request.insert("method".into(), method.into());
    request.insert("params".into(), params);
    request.insert("id".into(), 0.into());
    Value::Object(request).to_string()
}

pub fn gbt_request(longpollid: Option<&str>) -> String {
    let mut params = json!({ "capabilities": GBT_CAPABILITIES });

    if let Some(longpollid) = longpollid {
        params["longpollid"] = longpollid.into();
    }

    rpc("getblocktemplate", json!([params]))
}

pub fn getwork_request() -> String {
    rpc("getwork", json!([]))
}

pub fn getwork_submit_request(data_hex: &str) -> String {
    rpc("getwork", json!([data_hex]))
}

pub fn submitblock_request(block_hex: &str, workid: Option<&str>) -> String {
    let options = match workid {
        Some(workid) => json!({ "workid": workid }),
        None => json!({}),
    };

    rpc("submitblock", json!([block_hex, options]))
}
