use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::CreatorDate;
use crate::config::Config;
use crate::engine::CalendarSnapshot;

/// One row of the month view.
#[derive(Debug, Clone)]
pub struct MonthRow {
    pub date: CreatorDate,
    pub gregorian: NaiveDate,
    pub is_today: bool,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, snap))]
    pub fn print_lines(&mut self, snap: &CalendarSnapshot) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for (idx, line) in snap.lines.iter().enumerate() {
            let line = if idx == 0 {
                self.paint(line, "1")
            } else if idx == 1 && snap.date.is_sabbath() {
                self.paint(line, "33")
            } else {
                line.clone()
            };
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, snap))]
    pub fn print_wheel(&mut self, snap: &CalendarSnapshot) -> anyhow::Result<()> {
        let mut rows: Vec<Vec<String>> = snap
            .wheel
            .rings()
            .iter()
            .map(|(name, degrees)| {
                vec![
                    self.paint(name, "36"),
                    format!("{degrees:.3}"),
                    format!("{:.3}", degrees.rem_euclid(360.0)),
                ]
            })
            .collect();
        rows.push(vec![
            self.paint("hand", "36"),
            format!("{:.3}", snap.reading.hand_angle),
            format!("{:.3}", snap.reading.hand_angle.rem_euclid(360.0)),
        ]);

        write_table(
            io::stdout().lock(),
            vec!["Ring".to_string(), "Degrees".to_string(), "Mod 360".to_string()],
            rows,
        )
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_month(&mut self, rows: &[MonthRow]) -> anyhow::Result<()> {
        let rows = rows
            .iter()
            .map(|row| {
                let day = row.date.day.to_string();
                let day = if row.is_today {
                    self.paint(&day, "1;32")
                } else {
                    day
                };
                let weekday = if row.date.is_sabbath() {
                    self.paint(&format!("{} Sabbath", row.date.week_day), "33")
                } else {
                    row.date.week_day.to_string()
                };
                vec![
                    day,
                    weekday,
                    row.date.day_of_year.to_string(),
                    row.gregorian.format("%Y-%m-%d %a").to_string(),
                ]
            })
            .collect();

        write_table(
            io::stdout().lock(),
            vec![
                "Day".to_string(),
                "Weekday".to_string(),
                "DOY".to_string(),
                "Gregorian".to_string(),
            ],
            rows,
        )
    }

    pub fn print_json<T: serde::Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
