use super::*;

#[test]
fn longpoll_reply_is_staged() {
    let mock = MockPool::spawn();
    mock.on(
        "getwork",
        Reply::result(getwork(1)).header("x-long-polling", "/LP"),
    );
    mock.on_path(
        "/LP",
        "getwork",
        Reply::result(getwork(2)).delay(Duration::from_millis(50)),
    );

    let (ctx, pool) = context(&mock);
    ctx.stage_work(pool_active(&ctx, &pool).unwrap());

    let handle = spawn_longpoll(ctx.clone(), pool.id).unwrap();

    let work = loop {
        let work = ctx.claim_work(Duration::from_secs(10)).unwrap();
        if work.mode == GetworkMode::LongPoll {
            break work;
        }
    };

    assert_eq!(work.prev_block_hash(), [2; 32]);
    assert!(ctx.have_longpoll());
    assert!(mock.requests().iter().any(|request| request.path == "/LP"));

    ctx.cancel.cancel();

    assert_eq!(handle.join().unwrap(), LongpollExit::Cancelled);
}

#[test]
fn new_block_from_longpoll_flushes_stage() {
    let mock = MockPool::spawn();
    mock.on(
        "getwork",
        Reply::result(getwork(1)).header("x-long-polling", "/LP"),
    );
    mock.on_path(
        "/LP",
        "getwork",
        Reply::result(getwork(3)).delay(Duration::from_millis(200)),
    );

    let (ctx, pool) = context(&mock);
    ctx.stage_work(pool_active(&ctx, &pool).unwrap());
    assert_eq!(ctx.stage.len(), 1);

    let handle = spawn_longpoll(ctx.clone(), pool.id).unwrap();

    wait_for("a new block", || ctx.blocks.current() == Some([3; 32]));

    let work = ctx.claim_work(Duration::from_secs(10)).unwrap();
    assert_eq!(work.prev_block_hash(), [3; 32]);

    ctx.cancel.cancel();
    handle.join().unwrap();
}

#[test]
fn stratum_pool_ends_longpoll() {
    let mock = MockPool::spawn();
    mock.on(
        "getwork",
        Reply::result(getwork(1)).header("x-stratum", "stratum+tcp://pool.example:3333"),
    );

    let (ctx, pool) = context(&mock);
    pool_active(&ctx, &pool).unwrap();

    let handle = spawn_longpoll(ctx.clone(), pool.id).unwrap();

    assert_eq!(handle.join().unwrap(), LongpollExit::Stratum);
}

#[test]
fn removed_pool_ends_longpoll() {
    let mock = MockPool::spawn();
    mock.on(
        "getwork",
        Reply::result(getwork(1)).header("x-long-polling", "/LP"),
    );
    mock.on_path(
        "/LP",
        "getwork",
        Reply::result(getwork(1)).delay(Duration::from_millis(50)),
    );

    let (ctx, pool) = context(&mock);
    pool_active(&ctx, &pool).unwrap();

    let handle = spawn_longpoll(ctx.clone(), pool.id).unwrap();

    wait_for("long-poll activation", || ctx.have_longpoll());

    ctx.remove_pool(pool.id);

    assert_eq!(handle.join().unwrap(), LongpollExit::PoolRemoved);
}

#[test]
fn failing_longpoll_retries() {
    let mock = MockPool::spawn();
    mock.on(
        "getwork",
        Reply::result(getwork(1)).header("x-long-polling", "/LP"),
    );
    mock.on_path("/LP", "getwork", Reply::raw(503, ""));

    let (ctx, pool) = context(&mock);
    pool_active(&ctx, &pool).unwrap();

    let handle = spawn_longpoll(ctx.clone(), pool.id).unwrap();

    wait_for("three long-poll attempts", || {
        mock.requests()
            .iter()
            .filter(|request| request.path == "/LP")
            .count()
            >= 3
    });

    ctx.cancel.cancel();

    assert_eq!(handle.join().unwrap(), LongpollExit::Cancelled);
    assert!(ctx.stage.is_empty());
}
