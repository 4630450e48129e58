use super::*;

fn fetched(mock: &MockPool, config: Config) -> (Arc<ClientContext>, Arc<poolwork::Pool>, poolwork::Work) {
    let (ctx, pool) = context_with(mock, config);
    let work = pool_active(&ctx, &pool).unwrap();
    (ctx, pool, work)
}

fn submissions(mock: &MockPool, call: &str) -> Vec<Value> {
    mock.requests()
        .into_iter()
        .filter(|request| request.call == call)
        .map(|request| request.body)
        .collect()
}

#[test]
fn getwork_share_accepted() {
    let mock = MockPool::spawn();
    mock.on("getwork", Reply::result(getwork(1)));
    mock.on("getwork-submit", Reply::result(json!(true)));

    let (ctx, pool, work) = fetched(&mock, config());

    assert_eq!(submit_work(&ctx, &work), SubmitOutcome::Accepted);
    assert_eq!(pool.stats().accepted, 1);

    let submitted = submissions(&mock, "getwork-submit");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["params"][0].as_str().unwrap().len(), 256);
}

#[test]
fn rejection_carries_reason() {
    let mock = MockPool::spawn();
    mock.on("getwork", Reply::result(getwork(1)));
    mock.on(
        "getwork-submit",
        Reply::result(json!(false)).header("x-reject-reason", "high-hash"),
    );

    let (ctx, pool, work) = fetched(&mock, config());

    assert_eq!(
        submit_work(&ctx, &work),
        SubmitOutcome::Rejected {
            reason: Some("high-hash".into())
        }
    );
    assert_eq!(pool.stats().rejected, 1);
}

#[test]
fn gbt_block_submitted_with_workid() {
    let mock = MockPool::spawn();
    mock.on("getblocktemplate", Reply::result(template("w7")));
    mock.on("submitblock", Reply::result(Value::Null));

    let (ctx, pool, work) = fetched(&mock, config());

    assert_eq!(submit_work(&ctx, &work), SubmitOutcome::Accepted);
    assert_eq!(pool.stats().accepted, 1);

    let submitted = submissions(&mock, "submitblock");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["params"][1], json!({ "workid": "w7" }));

    let block = submitted[0]["params"][0].as_str().unwrap();
    assert_eq!(&block[160..162], "02");
    assert!(block.ends_with("00"));
}

#[test]
fn communication_failure_then_recovery() {
    let mock = MockPool::spawn();
    mock.on("getwork", Reply::result(getwork(1)));
    mock.on("getwork-submit", Reply::raw(500, ""));
    mock.on("getwork-submit", Reply::raw(502, ""));
    mock.on("getwork-submit", Reply::result(json!(true)));

    let (ctx, pool, work) = fetched(&mock, config());

    assert_eq!(submit_work(&ctx, &work), SubmitOutcome::Accepted);
    assert!(!pool.submit_failing());
    assert_eq!(pool.remote_failures(), 1);
    assert_eq!(ctx.totals.snapshot().remote_failures, 1);
    assert_eq!(submissions(&mock, "getwork-submit").len(), 3);
}

#[test]
fn lowmem_discards_failed_share() {
    let mock = MockPool::spawn();
    mock.on("getwork", Reply::result(getwork(1)));
    mock.on("getwork-submit", Reply::raw(500, ""));

    let (ctx, pool, work) = fetched(
        &mock,
        Config {
            lowmem: true,
            ..config()
        },
    );

    assert_eq!(submit_work(&ctx, &work), SubmitOutcome::Discarded);
    assert!(pool.submit_failing());
    assert_eq!(submissions(&mock, "getwork-submit").len(), 1);
}

#[test]
fn share_going_stale_during_retry() {
    let mock = MockPool::spawn();
    mock.on("getwork", Reply::result(getwork(1)));
    mock.on("getwork-submit", Reply::raw(500, ""));

    let (ctx, pool, work) = fetched(&mock, config());

    pool.invalidate();

    assert_eq!(submit_work(&ctx, &work), SubmitOutcome::Stale);
    assert_eq!(pool.stats().stale, 1);
    assert_eq!(ctx.totals.snapshot().stale, 1);
}

#[test]
fn spawned_submission_reports_outcome() {
    let mock = MockPool::spawn();
    mock.on("getwork", Reply::result(getwork(1)));
    mock.on("getwork-submit", Reply::result(json!(true)));

    let (ctx, _, work) = fetched(&mock, config());

    let handle = poolwork::spawn_submit(ctx, work).unwrap();

    assert_eq!(handle.join().unwrap(), SubmitOutcome::Accepted);
}
