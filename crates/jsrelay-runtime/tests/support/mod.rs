//! Native test module exposed to scripts as the `tests` global.
//!
//! Each binding builds a thread-safe callback from its JavaScript arguments on
//! the owning thread and hands it to a freshly spawned native thread, the same
//! way an addon would.

#![allow(dead_code)]

use boa_engine::{
    js_string, native_function::NativeFunction, object::FunctionObjectBuilder,
    object::JsObject, Context, JsError, JsNativeError, JsResult, JsString, JsValue,
};
use jsrelay_runtime::{EventLoop, LoopConfig, Owner, RelayError, ThreadSafeCallback};
use std::thread;
use std::time::Duration;

type Binding = fn(&JsValue, &[JsValue], &Owner, &mut Context) -> JsResult<JsValue>;

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Creates a loop with the `tests` module and an empty `results` array installed.
pub fn event_loop_with(config: LoopConfig) -> EventLoop {
    init_tracing();
    let mut event_loop = EventLoop::with_config(config).expect("event loop");
    install(&mut event_loop);
    event_loop.eval("var results = [];").expect("results array");
    event_loop
}

pub fn event_loop() -> EventLoop {
    event_loop_with(LoopConfig::default())
}

/// Evaluates `source`, drains every call it triggered and returns
/// `JSON.stringify(results)`.
pub fn run_script(source: &str) -> String {
    let mut event_loop = event_loop();
    event_loop.eval(source).expect("script evaluates");
    event_loop.run().expect("loop drains");
    eval_string(&mut event_loop, "JSON.stringify(results)")
}

/// Runs `statement` and returns `"ok"` or the message of the thrown error.
pub fn construct(statement: &str) -> String {
    let mut event_loop = event_loop();
    let outcome = eval_string(
        &mut event_loop,
        &format!("(function () {{ try {{ {statement}; return 'ok'; }} catch (e) {{ return e.message; }} }})()"),
    );
    event_loop.run().expect("loop drains");
    outcome
}

pub fn eval_string(event_loop: &mut EventLoop, source: &str) -> String {
    event_loop
        .eval(source)
        .expect("expression evaluates")
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .expect("expression is a string")
}

pub fn install(event_loop: &mut EventLoop) {
    let owner = event_loop.owner().clone();
    let ctx = event_loop.context();
    let module = JsObject::with_object_proto(ctx.intrinsics());

    let bindings: [(&str, Binding); 7] = [
        ("constructor", constructor),
        ("constructor2", constructor2),
        ("call", call),
        ("call2", call2),
        ("call_args", call_args),
        ("call_error", call_error),
        ("example_async_work", example_async_work),
    ];

    for (name, binding) in bindings {
        let function = FunctionObjectBuilder::new(
            ctx.realm(),
            NativeFunction::from_copy_closure_with_captures(binding, owner.clone()),
        )
        .build();
        module
            .set(JsString::from(name), function, false, ctx)
            .expect("binding installs");
    }

    ctx.global_object()
        .set(js_string!("tests"), module, false, ctx)
        .expect("tests module installs");
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

fn throw(err: RelayError) -> JsError {
    JsNativeError::typ().with_message(err.to_string()).into()
}

fn constructor(_this: &JsValue, args: &[JsValue], owner: &Owner, _ctx: &mut Context) -> JsResult<JsValue> {
    ThreadSafeCallback::new(owner, &arg(args, 0)).map_err(throw)?;
    Ok(JsValue::undefined())
}

fn constructor2(_this: &JsValue, args: &[JsValue], owner: &Owner, _ctx: &mut Context) -> JsResult<JsValue> {
    ThreadSafeCallback::with_receiver(owner, &arg(args, 0), &arg(args, 1)).map_err(throw)?;
    Ok(JsValue::undefined())
}

fn call(_this: &JsValue, args: &[JsValue], owner: &Owner, _ctx: &mut Context) -> JsResult<JsValue> {
    let callback = ThreadSafeCallback::new(owner, &arg(args, 0)).map_err(throw)?;
    thread::spawn(move || callback.call_empty().expect("enqueue"));
    Ok(JsValue::undefined())
}

fn call2(_this: &JsValue, args: &[JsValue], owner: &Owner, _ctx: &mut Context) -> JsResult<JsValue> {
    let callback =
        ThreadSafeCallback::with_receiver(owner, &arg(args, 0), &arg(args, 1)).map_err(throw)?;
    thread::spawn(move || callback.call_empty().expect("enqueue"));
    Ok(JsValue::undefined())
}

fn call_args(_this: &JsValue, args: &[JsValue], owner: &Owner, _ctx: &mut Context) -> JsResult<JsValue> {
    let callback = ThreadSafeCallback::new(owner, &arg(args, 0)).map_err(throw)?;
    let pin = owner.pin(&arg(args, 1));
    thread::spawn(move || callback.call_args((pin,)).expect("enqueue"));
    Ok(JsValue::undefined())
}

fn call_error(_this: &JsValue, args: &[JsValue], owner: &Owner, _ctx: &mut Context) -> JsResult<JsValue> {
    let callback = ThreadSafeCallback::new(owner, &arg(args, 0)).map_err(throw)?;
    thread::spawn(move || callback.call_error("foo").expect("enqueue"));
    Ok(JsValue::undefined())
}

fn example_async_work(
    _this: &JsValue,
    args: &[JsValue],
    owner: &Owner,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let callback = ThreadSafeCallback::new(owner, &arg(args, 0)).map_err(throw)?;
    let fail = arg(args, 1).to_string(ctx)?.to_std_string_escaped() == "fail";

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        let result = if fail {
            Err("Failure during async work")
        } else {
            Ok("foo")
        };
        callback.call_async_result(result).expect("enqueue");
    });
    Ok(JsValue::undefined())
}
