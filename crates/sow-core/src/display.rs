use crate::calendar::CreatorDate;
use crate::parts::{CreatorTime, ordinal};

pub fn display_lines(date: &CreatorDate, time: &CreatorTime, progress: f64) -> [String; 3] {
    let sabbath = if date.is_sabbath() { " (Sabbath)" } else { "" };
    [
        format!(
            "Year {} · Month {} · Day {}",
            date.year, date.month, date.day
        ),
        format!(
            "Weekday {}{sabbath} · {} part {} min",
            date.week_day,
            ordinal(time.part),
            ordinal(time.minute)
        ),
        format!(
            "Day of year {} · {} · {:.1}% of day",
            date.day_of_year,
            date.kind,
            progress * 100.0
        ),
    ]
}
