//! Week window of the digest.
//!
//! The window is the Monday–Sunday span of the ISO week containing a given
//! day. Week 1 is anchored on January 1 of the ISO year: when that day is a
//! Friday, Saturday or Sunday the anchor moves forward to the next Monday,
//! otherwise back to the Monday of its own week.

use chrono::{DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use inkpost_core::error::AppError;
use inkpost_core::result::AppResult;

/// Inclusive range of calendar days covered by one digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    /// ISO year the window belongs to.
    pub year: i32,
    /// ISO week number.
    pub week: u32,
    /// First day (a Monday).
    pub start: NaiveDate,
    /// Last day, six days after `start`.
    pub end: NaiveDate,
}

/// Monday that anchors week 1 of `year`.
pub fn base_monday(year: i32) -> AppResult<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| AppError::validation(format!("Year {year} is out of range")))?;
    let weekday = u64::from(jan1.weekday().num_days_from_monday());

    let anchor = if weekday > 3 {
        jan1.checked_add_days(Days::new(7 - weekday))
    } else {
        jan1.checked_sub_days(Days::new(weekday))
    };
    anchor.ok_or_else(|| AppError::validation(format!("Year {year} is out of range")))
}

/// Window for ISO `(year, week)`.
pub fn window_for(year: i32, week: u32) -> AppResult<WeekWindow> {
    let out_of_range = || AppError::validation(format!("Week {year}-W{week:02} is out of range"));
    if week == 0 {
        return Err(out_of_range());
    }

    let start = base_monday(year)?
        .checked_add_days(Days::new(u64::from(week - 1) * 7))
        .ok_or_else(out_of_range)?;
    let end = start.checked_add_days(Days::new(6)).ok_or_else(out_of_range)?;

    Ok(WeekWindow {
        year,
        week,
        start,
        end,
    })
}

/// Window of the ISO week containing `today`.
pub fn week_window(today: NaiveDate) -> AppResult<WeekWindow> {
    let iso = today.iso_week();
    window_for(iso.year(), iso.week())
}

impl WeekWindow {
    /// Half-open UTC instant range `[start 00:00, end+1 00:00)` in `tz`,
    /// covering every moment of the seven days.
    pub fn bounds_in(&self, tz: Tz) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let after_end = self
            .end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::validation("Week window end is out of range"))?;
        Ok((start_of_day(self.start, tz)?, start_of_day(after_end, tz)?))
    }

    /// Whether `day` falls inside the window.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// First instant of `day` in `tz`.
///
/// Midnight can be skipped by a DST jump; the earliest existing instant of
/// the day is used then.
fn start_of_day(day: NaiveDate, tz: Tz) -> AppResult<DateTime<Utc>> {
    let mut time = NaiveTime::MIN;
    for _ in 0..24 {
        match tz.from_local_datetime(&day.and_time(time)) {
            LocalResult::Single(dt) => return Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                time = time
                    .overflowing_add_signed(chrono::Duration::hours(1))
                    .0;
            }
        }
    }
    Err(AppError::internal(format!(
        "No valid local time on {day} in {tz}"
    )))
}
