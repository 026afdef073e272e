use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use reqwest::header::HeaderMap;

pub const REQUESTS_REMAINING: &str = "requests-remaining";
pub const REQUESTS_RESET: &str = "requests-reset";
pub const COOLDOWN_RESET: &str = "cooldown-reset";

/// Rate-limit metadata pulled off one response.
///
/// Two shapes exist: a remaining-count/reset pair tied to the account's
/// quota, or a bare cooldown meaning the endpoint itself is cooling down.
/// The counter takes priority when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateLimit {
    pub remaining: Option<u64>,
    pub reset_secs: Option<f64>,
    pub cooldown_secs: Option<f64>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_value(headers, REQUESTS_REMAINING),
            reset_secs: header_value(headers, REQUESTS_RESET),
            cooldown_secs: header_value(headers, COOLDOWN_RESET),
        }
    }

    /// How long the next request must wait. `None` means go ahead now.
    pub fn delay(&self) -> Option<Duration> {
        match self.remaining {
            Some(0) => self.reset_secs.and_then(to_duration),
            Some(_) => None,
            None => self.cooldown_secs.and_then(to_duration),
        }
    }
}

fn to_duration(secs: f64) -> Option<Duration> {
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

fn header_value<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Inspect one response's headers and suspend until the backend will accept
/// another request. The sleep is a single contiguous suspension; sub-second
/// reset values are honoured as given.
pub async fn obey(headers: &HeaderMap) {
    let limit = RateLimit::from_headers(headers);
    if let Some(remaining) = limit.remaining {
        log::info!("{remaining} requests remaining");
    } else if limit.cooldown_secs.is_some() {
        log::info!("on cooldown");
    }
    if let Some(delay) = limit.delay() {
        log_sleep(delay);
        tokio::time::sleep(delay).await;
    }
}

pub(crate) fn log_sleep(delay: Duration) {
    log::info!("sleeping for {} seconds", delay.as_secs_f64());
    if let Ok(delay) = chrono::Duration::from_std(delay) {
        let finish = Local::now() + delay;
        log::info!("finish sleeping at {}", finish.format("%a %b %e %H:%M:%S %Y"));
    }
}
