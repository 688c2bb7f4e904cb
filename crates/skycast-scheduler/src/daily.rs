//! Daily trigger math: when does "06:00 in Europe/Moscow" next happen?
//!
//! Times are always read in the configured zone, never the host zone.
//! A local time skipped by a DST jump does not fire that day; an ambiguous
//! one fires at its first occurrence.

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Earliest instant strictly after `after` whose wall-clock time in `tz` is `at`.
pub fn next_fire_after(at: NaiveTime, tz: Tz, after: DateTime<Utc>) -> DateTime<Utc> {
    let mut date = after.with_timezone(&tz).date_naive();

    // Two DST gaps in a row cannot happen; a few days is plenty.
    for _ in 0..4 {
        if let Some(local) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            let utc = local.with_timezone(&Utc);
            if utc > after {
                return utc;
            }
        }
        date = match date.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    // Unreachable for real zones; keep the loop bounded anyway.
    after + chrono::Duration::days(1)
}
