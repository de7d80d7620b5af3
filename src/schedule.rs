use chrono::{Duration, NaiveDateTime, NaiveTime};

/// The first of `times` strictly after `now`, rolling over to the earliest time tomorrow.
///
/// With no times configured this is one day after `now`.
pub fn next_run_after(now: NaiveDateTime, times: &[NaiveTime]) -> NaiveDateTime {
    let today = now.date();
    times
        .iter()
        .map(|time| today.and_time(*time))
        .filter(|at| *at > now)
        .min()
        .or_else(|| {
            times
                .iter()
                .min()
                .map(|time| (today + Duration::days(1)).and_time(*time))
        })
        .unwrap_or(now + Duration::days(1))
}
