use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Declared start slot of a work day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening];

    /// Anything other than the morning and afternoon codes starts in the evening.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "morning" => TimeSlot::Morning,
            "afternoon" => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|slot| slot.label() == label)
    }

    pub const fn code(self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TimeSlot::Morning => "上午",
            TimeSlot::Afternoon => "下午",
            TimeSlot::Evening => "晚上",
        }
    }

    pub fn starts_at(self) -> NaiveTime {
        let hour = match self {
            TimeSlot::Morning => 8,
            TimeSlot::Afternoon => 14,
            TimeSlot::Evening => 20,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Declared working duration, each with an explicit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkDuration {
    OneHour,
    TwoHours,
    HalfDay,
    SixHours,
    OneDay,
    Overnight,
}

impl WorkDuration {
    pub const ALL: [WorkDuration; 6] = [
        WorkDuration::OneHour,
        WorkDuration::TwoHours,
        WorkDuration::HalfDay,
        WorkDuration::SixHours,
        WorkDuration::OneDay,
        WorkDuration::Overnight,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|duration| duration.code() == code)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|duration| duration.label() == label)
    }

    pub const fn code(self) -> &'static str {
        match self {
            WorkDuration::OneHour => "one_hour",
            WorkDuration::TwoHours => "two_hours",
            WorkDuration::HalfDay => "half_day",
            WorkDuration::SixHours => "six_hours",
            WorkDuration::OneDay => "one_day",
            WorkDuration::Overnight => "overnight",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            WorkDuration::OneHour => "1小时",
            WorkDuration::TwoHours => "2小时",
            WorkDuration::HalfDay => "半天",
            WorkDuration::SixHours => "6小时",
            WorkDuration::OneDay => "一天",
            WorkDuration::Overnight => "通宵",
        }
    }

    pub const fn hours(self) -> i64 {
        match self {
            WorkDuration::OneHour => 1,
            WorkDuration::TwoHours => 2,
            WorkDuration::HalfDay => 4,
            WorkDuration::SixHours => 6,
            WorkDuration::OneDay => 8,
            WorkDuration::Overnight => 12,
        }
    }
}

/// Start and end of the declared work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WorkWindow {
    pub fn new(date: NaiveDate, slot: TimeSlot, duration: WorkDuration) -> Self {
        let start = date.and_time(slot.starts_at());
        Self {
            start,
            end: start + Duration::hours(duration.hours()),
        }
    }

    /// Whole hours between start and end.
    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

/// Parse a form date. Accepts `YYYY-MM-DD` and ISO timestamps whose date part is one.
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
