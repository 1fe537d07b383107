//! Simulated uptime history
//!
//! No time series is stored anywhere. The history endpoint draws a jittered
//! series around the node's current uptime over the trailing week.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::format::round1;
use crate::models::UptimeDataPoint;

/// Points per series, oldest first, ending at `now`
pub const HISTORY_POINTS: usize = 101;
pub const HISTORY_DAYS: i64 = 7;
/// Jitter spans +/- half of this, in percentage points
const JITTER_SPAN: f64 = 10.0;
/// Used in place of a zero uptime
const FALLBACK_UPTIME: f64 = 95.0;

pub fn synthesize_uptime_history<R: Rng>(
    base_uptime: f64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<UptimeDataPoint> {
    let steps = (HISTORY_POINTS - 1) as i32;
    let interval = Duration::days(HISTORY_DAYS) / steps;
    let base = if base_uptime > 0.0 { base_uptime } else { FALLBACK_UPTIME };

    (0..=steps)
        .rev()
        .map(|i| {
            let variance = (rng.gen::<f64>() - 0.5) * JITTER_SPAN;
            UptimeDataPoint {
                timestamp: now - interval * i,
                uptime: round1((base + variance).clamp(0.0, 100.0)),
            }
        })
        .collect()
}
