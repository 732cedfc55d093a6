// Panic isolation for the probe worker
use std::any::Any;
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Run `f`, turning a panic into `Err(message)`
///
/// The worker thread always reaches its send, even when the remote client
/// panics.
pub fn catch_panic<T>(f: impl FnOnce() -> T + UnwindSafe) -> Result<T, String> {
    catch_unwind(f).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!(panic_msg = %message, "Probe worker panicked");
        message
    })
}

/// `panic!` payloads are `&str` or `String`; anything else has no message
fn panic_message(payload: &(dyn Any + Send)) -> String {
    match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(s), _) => s.to_string(),
        (None, Some(s)) => s.clone(),
        (None, None) => "Unknown panic".to_string(),
    }
}
