use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use formsaathi::guidance::error::GuidanceError;
use formsaathi::guidance::guidance_model::GuidanceRecord;

/// The record from the email-subscribe walkthrough.
pub fn email_record() -> GuidanceRecord {
    GuidanceRecord::new("Enter a valid email address.")
        .with_examples(["name@example.com"])
        .with_format_hint("user@domain.tld")
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

/// A fetch producer that counts its invocations and resolves to `result`
/// after `delay`.
pub fn fetch_after<P: Send + 'static>(
    calls: &Arc<AtomicUsize>,
    delay: Duration,
    result: Result<P, GuidanceError>,
) -> impl FnOnce() -> BoxFuture<'static, Result<P, GuidanceError>> + use<P> {
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

/// A fetch producer that never resolves.
pub fn fetch_forever(
    calls: &Arc<AtomicUsize>,
) -> impl FnOnce() -> BoxFuture<'static, Result<GuidanceRecord, GuidanceError>> + use<> {
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(futures::future::pending())
    }
}
