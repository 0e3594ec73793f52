//! Slot calendar
//!
//! Maps abstract slot indices onto concrete sittings. Slot `s` lives on the
//! `s / exams_per_day`-th *valid* day of the period and takes the
//! `s % exams_per_day`-th equal share of that day's window.
//!
//! A day is valid when it lies inside `[start_date, end_date]`, is not
//! explicitly excluded, and is not a weekend day while weekends are excluded.
//!
//! Resolutions are memoized per slot on first use, so memory follows the
//! slots the search actually touches rather than the size of the period. The
//! memo belongs to one calendar value and is never shared: a different
//! `exams_per_day` (or any other setting) means building a new calendar.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use examplan_core::{TimeWindow, TimetableConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

/// A slot resolved to its date and time share
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotTime {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Immutable slot-to-date mapping for one scheduling run
#[derive(Debug)]
pub struct SlotCalendar {
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_weekends: bool,
    excluded_dates: BTreeSet<NaiveDate>,
    custom_windows: BTreeMap<NaiveDate, TimeWindow>,
    default_window: TimeWindow,
    exams_per_day: usize,
    /// Valid days of the period, in order
    valid_days: Vec<NaiveDate>,
    /// Slots resolved so far
    resolved: Mutex<BTreeMap<usize, SlotTime>>,
}

impl SlotCalendar {
    /// Build the calendar described by `config`
    pub fn new(config: &TimetableConfig) -> Self {
        Self::with_exams_per_day(config, config.max_exams_per_day)
    }

    /// Build the calendar for `config` with a different number of slots per day
    pub fn with_exams_per_day(config: &TimetableConfig, exams_per_day: u32) -> Self {
        let mut calendar = Self {
            start_date: config.start_date,
            end_date: config.last_day(),
            exclude_weekends: config.exclude_weekends,
            excluded_dates: config.excluded_dates.clone(),
            custom_windows: config.custom_time_slots.clone(),
            default_window: config.daily_window_range(),
            exams_per_day: exams_per_day.max(1) as usize,
            valid_days: Vec::new(),
            resolved: Mutex::new(BTreeMap::new()),
        };

        calendar.valid_days = calendar
            .start_date
            .iter_days()
            .take_while(|d| *d <= calendar.end_date)
            .filter(|d| calendar.is_valid_date(*d))
            .collect();
        calendar
    }

    /// Check if exams may be held on `date`
    pub fn is_valid_date(&self, date: NaiveDate) -> bool {
        if self.excluded_dates.contains(&date) {
            return false;
        }
        if self.exclude_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        self.start_date <= date && date <= self.end_date
    }

    /// Number of slots in the whole period
    pub fn total_slots(&self) -> usize {
        self.valid_days.len().saturating_mul(self.exams_per_day)
    }

    /// Number of days exams may be held on
    pub fn available_days(&self) -> usize {
        self.valid_days.len()
    }

    /// Length of the period in calendar days, both ends included
    pub fn period_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn exams_per_day(&self) -> usize {
        self.exams_per_day
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Index of the valid day a slot falls on
    pub fn day_index(&self, slot: usize) -> usize {
        slot / self.exams_per_day
    }

    /// Date of a slot, if the slot exists
    pub fn date_of(&self, slot: usize) -> Option<NaiveDate> {
        self.valid_days.get(self.day_index(slot)).copied()
    }

    /// Calendar days between the dates of two slots
    pub fn day_gap(&self, a: usize, b: usize) -> Option<i64> {
        Some((self.date_of(a)? - self.date_of(b)?).num_days().abs())
    }

    /// Window in force on `date`
    pub fn window_for(&self, date: NaiveDate) -> TimeWindow {
        self.custom_windows
            .get(&date)
            .copied()
            .unwrap_or(self.default_window)
    }

    /// Length of each slot on `date`, in minutes
    pub fn slot_minutes(&self, date: NaiveDate) -> i64 {
        self.window_for(date).minutes() / self.exams_per_day as i64
    }

    /// Resolve a slot to its date and time share.
    ///
    /// Returns `None` for slots past the end of the period.
    pub fn resolve_slot(&self, slot: usize) -> Option<SlotTime> {
        if slot >= self.total_slots() {
            return None;
        }
        let mut memo = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        Some(*memo.entry(slot).or_insert_with(|| self.compute(slot)))
    }

    fn compute(&self, slot: usize) -> SlotTime {
        let date = self.valid_days[self.day_index(slot)];
        let slot_in_day = (slot % self.exams_per_day) as i64;
        let window = self.window_for(date);
        let share = self.slot_minutes(date);

        let start = window.start + Duration::minutes(share * slot_in_day);
        SlotTime {
            date,
            start,
            end: start + Duration::minutes(share),
        }
    }
}
