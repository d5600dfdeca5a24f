use std::fmt::Display;
use std::time::Duration;

/// Run `op`, and run it exactly once more after `backoff` if the first
/// failure satisfies `is_retryable`. Any other failure is returned as is.
pub fn retry_once<T, E, F, R>(what: &str, backoff: Duration, is_retryable: R, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    match op() {
        Ok(value) => Ok(value),
        Err(e) if is_retryable(&e) => {
            tracing::debug!("{} failed ({}), retrying in {:?}", what, e, backoff);
            std::thread::sleep(backoff);
            op()
        }
        Err(e) => Err(e),
    }
}
