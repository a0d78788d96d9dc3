// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Base delay between attempts; doubles after each failure.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Run `op` until it succeeds, at most `max_retries + 1` times.
///
/// Waits `base_delay * 2^attempt` between attempts and returns the last
/// error once attempts are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
