//! Earliest-fit auto-scheduling inside a fixed 08:00-18:00 UTC workday.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{PrioError, Result};
use crate::model::{DEFAULT_ESTIMATE_MINUTES, Task};

pub const WORKDAY_START_HOUR: u32 = 8;
pub const WORKDAY_END_HOUR: u32 = 18;
pub const STEP_MINUTES: i64 = 30;
pub const SCHEDULED_STATUS: &str = "scheduled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workday {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Workday {
    pub fn on(date: NaiveDate) -> Self {
        let at = |hour| {
            date.and_hms_opt(hour, 0, 0)
                .map(|naive| naive.and_utc())
                .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc())
        };
        Self {
            date,
            start: at(WORKDAY_START_HOUR),
            end: at(WORKDAY_END_HOUR),
        }
    }
}

/// Requested minutes, else the task's estimate, else the default. Zero counts as missing.
pub fn resolve_duration(requested: Option<u32>, task: &Task) -> u32 {
    requested
        .filter(|m| *m > 0)
        .or(task.estimated_minutes.filter(|m| *m > 0))
        .unwrap_or(DEFAULT_ESTIMATE_MINUTES)
}

/// Scheduled spans of every task except `exclude`. Empty or inverted spans occupy nothing.
pub fn occupied_intervals(tasks: &[Task], exclude: u64) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    tasks
        .iter()
        .filter(|t| t.id != exclude)
        .filter_map(Task::occupied)
        .filter(|(start, end)| start < end)
        .collect()
}

/// First slot of `minutes` length, stepping 30 minutes from the window
/// start, that overlaps nothing in `occupied` and ends by the window end.
pub fn find_slot(
    occupied: &[(DateTime<Utc>, DateTime<Utc>)],
    minutes: u32,
    day: &Workday,
) -> Result<Slot> {
    let duration = Duration::minutes(i64::from(minutes));
    let step = Duration::minutes(STEP_MINUTES);
    let mut candidate = day.start;

    while candidate + duration <= day.end {
        let slot = Slot {
            start: candidate,
            end: candidate + duration,
        };
        if !occupied.iter().any(|&(start, end)| slot.overlaps(start, end)) {
            return Ok(slot);
        }
        candidate += step;
    }

    Err(PrioError::SchedulingExhausted {
        date: day.date,
        minutes,
    })
}

/// Place task `id` into the first free slot on `date`. On exhaustion nothing
/// is modified.
pub fn auto_schedule(
    tasks: &mut [Task],
    id: u64,
    requested: Option<u32>,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Task> {
    let index = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or(PrioError::TaskNotFound(id))?;
    let minutes = resolve_duration(requested, &tasks[index]);
    let occupied = occupied_intervals(tasks, id);
    let slot = find_slot(&occupied, minutes, &Workday::on(date))?;

    let task = &mut tasks[index];
    task.scheduled_start = Some(slot.start);
    task.scheduled_end = Some(slot.end);
    task.set_status(SCHEDULED_STATUS);
    task.record(
        format!(
            "Auto-scheduled for {}-{} UTC",
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M")
        ),
        now,
    );
    task.updated_at = now;
    Ok(task.clone())
}
