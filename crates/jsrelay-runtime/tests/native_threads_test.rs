//! Calls made directly from Rust threads, without the `tests` module.

mod support;

use boa_engine::JsNativeError;
use jsrelay_runtime::{LoopConfig, RelayError, ThreadSafeCallback, UncaughtPolicy};
use serde_json::json;
use std::thread;
use support::{eval_string, event_loop, event_loop_with};

#[test]
fn test_calls_from_one_thread_arrive_in_order() {
    let mut event_loop = event_loop();
    let f = event_loop
        .eval("(function (i) { results.push(i); })")
        .unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let producer = thread::spawn(move || {
        for i in 0..100u32 {
            callback.call_args((i,)).unwrap();
        }
    });

    event_loop.run().unwrap();
    producer.join().unwrap();

    let results: Vec<u32> =
        serde_json::from_str(&eval_string(&mut event_loop, "JSON.stringify(results)")).unwrap();
    assert_eq!(results, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_every_producer_call_is_delivered_once() {
    let mut event_loop = event_loop();
    let f = event_loop
        .eval("(function (worker, i) { results.push(worker * 1000 + i); })")
        .unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let producers: Vec<_> = (0..4u32)
        .map(|worker| {
            let callback = callback.clone();
            thread::spawn(move || {
                for i in 0..25u32 {
                    callback.call_args((worker, i)).unwrap();
                }
            })
        })
        .collect();
    drop(callback);

    event_loop.run().unwrap();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut results: Vec<u32> =
        serde_json::from_str(&eval_string(&mut event_loop, "JSON.stringify(results)")).unwrap();
    results.sort_unstable();
    let expected: Vec<u32> = (0..4)
        .flat_map(|worker| (0..25).map(move |i| worker * 1000 + i))
        .collect();
    assert_eq!(results, expected);

    let stats = event_loop.stats();
    assert_eq!(stats.invoked_calls, 100);
    assert_eq!(stats.released_channels, 1);
    assert_eq!(stats.live_channels, 0);
}

#[test]
fn test_receipt_returns_callback_result() {
    let mut event_loop = event_loop();
    let f = event_loop
        .eval("(function (doc) { return { echoed: doc.name, count: doc.items.length }; })")
        .unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let waiter = thread::spawn(move || {
        let receipt = callback
            .call_with_receipt(|cx| Ok(vec![cx.json(json!({"name": "x", "items": [1, 2, 3]}))?]))
            .unwrap();
        receipt.wait()
    });

    event_loop.run().unwrap();
    let reply = waiter.join().unwrap().unwrap();
    assert_eq!(reply, json!({"echoed": "x", "count": 3}));
}

#[test]
fn test_receipt_rejects_cyclic_return_value() {
    let mut event_loop = event_loop();
    let f = event_loop
        .eval("(function () { const o = {}; o.self = o; return o; })")
        .unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let waiter = thread::spawn(move || callback.call_with_receipt(|_| Ok(Vec::new())).unwrap().wait());

    event_loop.run().unwrap();
    match waiter.join().unwrap() {
        Err(RelayError::Marshal(message)) => assert_eq!(message, "cyclic value"),
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert_eq!(event_loop.stats().invoked_calls, 1);
}

#[test]
fn test_receipt_reports_marshal_failure() {
    let mut event_loop = event_loop_with(LoopConfig::new().with_uncaught(UncaughtPolicy::Log));
    let f = event_loop.eval("(function () { results.push('called'); })").unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let waiter = thread::spawn(move || {
        callback
            .call_with_receipt(|_| Err(JsNativeError::typ().with_message("no arguments").into()))
            .unwrap()
            .wait()
    });

    event_loop.run().unwrap();
    assert!(matches!(waiter.join().unwrap(), Err(RelayError::Marshal(_))));
    assert_eq!(eval_string(&mut event_loop, "JSON.stringify(results)"), "[]");
}

#[test]
fn test_receipt_reports_thrown_exception() {
    let mut event_loop = event_loop_with(LoopConfig::new().with_uncaught(UncaughtPolicy::Log));
    let f = event_loop
        .eval("(function () { throw new Error('nope'); })")
        .unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let waiter = thread::spawn(move || callback.call_with_receipt(|_| Ok(Vec::new())).unwrap().wait());

    event_loop.run().unwrap();
    match waiter.join().unwrap() {
        Err(RelayError::UncaughtException(message)) => assert!(message.contains("nope")),
        other => panic!("expected the thrown error, got {other:?}"),
    }
}

#[test]
fn test_receipt_is_abandoned_when_loop_drops_request() {
    let mut event_loop = event_loop();
    let f = event_loop.eval("(function () {})").unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();
    let receipt = callback.call_with_receipt(|_| Ok(Vec::new())).unwrap();
    drop(event_loop);

    let waiter = thread::spawn(move || receipt.wait());
    assert!(matches!(
        waiter.join().unwrap(),
        Err(RelayError::CallAbandoned)
    ));
    assert!(matches!(callback.call_empty(), Err(RelayError::LoopClosed)));
}

#[tokio::test]
async fn test_run_async_with_receipts() {
    let mut event_loop = event_loop();
    let f = event_loop.eval("(function (a, b) { return a + b; })").unwrap();
    let callback = ThreadSafeCallback::new(event_loop.owner(), &f).unwrap();

    let first = callback.call_with_receipt(|cx| Ok(vec![cx.json(json!(20))?, cx.json(json!(22))?])).unwrap();
    let second = callback
        .call_with_receipt(|cx| Ok(vec![cx.string("a"), cx.string("b")]))
        .unwrap();
    drop(callback);

    let (run, first, second) = tokio::join!(event_loop.run_async(), first.recv(), second.recv());
    run.unwrap();
    assert_eq!(first.unwrap(), json!(42));
    assert_eq!(second.unwrap(), json!("ab"));
}
