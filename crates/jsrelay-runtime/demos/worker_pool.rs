//! Fans work out to native threads and reports results through an
//! error-first JavaScript callback.
//!
//! ```text
//! RUST_LOG=debug cargo run -p jsrelay-runtime --example worker_pool
//! ```

use jsrelay_runtime::{EventLoop, ThreadSafeCallback};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const WORKERS: u64 = 4;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut event_loop = EventLoop::new()?;
    let on_done = event_loop.eval(
        r#"
        var reports = [];
        (function (err, value) {
            reports.push(err ? 'failed: ' + err.message : 'result: ' + value);
        })
        "#,
    )?;
    let callback = ThreadSafeCallback::new(event_loop.owner(), &on_done)?;

    for worker in 0..WORKERS {
        let callback = callback.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10 * worker));
            let result = if worker == 2 {
                Err(format!("worker {worker} gave up"))
            } else {
                Ok((1..=worker + 10).sum::<u64>() as f64)
            };
            if let Err(err) = callback.call_async_result(result) {
                tracing::error!("worker {worker} could not report: {err}");
            }
        });
    }
    drop(callback);

    event_loop.run()?;

    let reports = event_loop.eval("reports.join('\\n')")?;
    if let Some(reports) = reports.as_string() {
        for line in reports.to_std_string_escaped().lines() {
            tracing::info!("worker {line}");
        }
    }

    let stats = event_loop.stats();
    tracing::info!(
        invoked = stats.invoked_calls,
        released = stats.released_channels,
        "All workers reported"
    );
    Ok(())
}
