use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::calendar::{self, DayKind, MONTH_LENGTHS};
use crate::cli::Invocation;
use crate::config::Config;
use crate::engine::{CalendarSnapshot, CreatorCalendar};
use crate::render::{MonthRow, Renderer};

pub fn known_command_names() -> Vec<&'static str> {
    vec!["now", "show", "wheel", "json", "month", "_show", "help", "version"]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(engine, cfg, renderer, inv))]
pub fn dispatch(
    engine: &CreatorCalendar,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "now" => cmd_show(engine, renderer, &[], now),
        "show" => cmd_show(engine, renderer, &inv.command_args, now),
        "wheel" => cmd_wheel(engine, renderer, &inv.command_args, now),
        "json" => cmd_json(engine, renderer, &inv.command_args, now),
        "month" => cmd_month(engine, renderer, &inv.command_args, now),
        "_show" => cmd_show_config(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn snapshot_for(
    engine: &CreatorCalendar,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<CalendarSnapshot> {
    if args.is_empty() {
        return engine.snapshot(now).context("failed to compute current calendar");
    }
    let expr = args.join(" ");
    engine
        .snapshot_expr(&expr, now)
        .with_context(|| format!("failed to compute calendar for '{expr}'"))
}

fn cmd_show(
    engine: &CreatorCalendar,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let snap = snapshot_for(engine, args, now)?;
    renderer.print_lines(&snap)
}

fn cmd_wheel(
    engine: &CreatorCalendar,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let snap = snapshot_for(engine, args, now)?;
    renderer.print_wheel(&snap)
}

fn cmd_json(
    engine: &CreatorCalendar,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let snap = snapshot_for(engine, args, now)?;
    renderer.print_json(&snap.to_payload())
}

fn cmd_month(
    engine: &CreatorCalendar,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let snap = snapshot_for(engine, args, now)?;
    let rows = month_rows(engine, &snap.date)?;
    println!("Year {} · Month {}", snap.date.year, snap.date.month);
    renderer.print_month(&rows)
}

/// Every day of the month containing `date`, with the Gregorian date each
/// one begins on.
pub fn month_rows(
    engine: &CreatorCalendar,
    date: &calendar::CreatorDate,
) -> anyhow::Result<Vec<MonthRow>> {
    let rule = engine.settings().year_rule;
    if date.kind == DayKind::Overflow {
        let gregorian = calendar::gregorian_date(date.year, date.day_of_year, rule)?;
        return Ok(vec![MonthRow {
            date: *date,
            gregorian,
            is_today: true,
        }]);
    }

    let month_idx = usize::try_from(date.month.saturating_sub(1))?;
    let length = MONTH_LENGTHS
        .get(month_idx)
        .copied()
        .ok_or_else(|| anyhow!("invalid month {}", date.month))?;
    let first = calendar::day_of_year(date.month, 1)
        .ok_or_else(|| anyhow!("invalid month {}", date.month))?;

    (0..length)
        .map(|offset| -> anyhow::Result<MonthRow> {
            let day_of_year = first + offset;
            let gregorian = calendar::gregorian_date(date.year, day_of_year, rule)?;
            let total_days = gregorian.signed_duration_since(calendar::EPOCH_DATE).num_days();
            let row_date = calendar::from_day_count(total_days, rule)?;
            Ok(MonthRow {
                date: row_date,
                gregorian,
                is_today: day_of_year == date.day_of_year,
            })
        })
        .collect()
}

fn cmd_show_config(cfg: &Config) -> anyhow::Result<()> {
    for (key, value) in cfg.iter() {
        println!("{key}={value}");
    }
    for file in &cfg.loaded_files {
        println!("# loaded {}", file.display());
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "sow [--rc KEY=VALUE]... [--sowrc PATH] [-v|-q] <command> [instant]\n\n\
         commands:\n  \
         now             current date, part and minute\n  \
         show <instant>  same for an instant expression\n  \
         wheel [instant] wheel ring angles\n  \
         json [instant]  full JSON payload\n  \
         month [instant] every day of the creator month\n  \
         _show           effective configuration\n  \
         help, version\n\n\
         instants: now, today, tomorrow, yesterday, +Nd/-Nh/+Nm, RFC3339,\n\
         YYYY-MM-DD, YYYY-MM-DD HH:MM, unix milliseconds"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::calendar::CalendarSettings;

    #[test]
    fn resolves_unique_prefixes_only() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("mo", &known), Some("month"));
        assert_eq!(expand_command_abbrev("now", &known), Some("now"));
        assert_eq!(expand_command_abbrev("_", &known), Some("_show"));
        assert_eq!(expand_command_abbrev("x", &known), None);
    }

    #[test]
    fn month_view_lists_every_day_of_month() {
        let engine = CreatorCalendar::new(CalendarSettings::default());
        let instant = Utc
            .with_ymd_and_hms(2025, 5, 20, 12, 0, 0)
            .single()
            .expect("valid instant");
        let snap = engine.snapshot(instant).expect("snapshot");
        assert_eq!((snap.date.month, snap.date.day), (3, 2));

        let rows = month_rows(&engine, &snap.date).expect("rows");
        assert_eq!(rows.len(), 31);
        assert_eq!(rows[0].date.day_of_year, 61);
        assert_eq!(
            rows[0].gregorian,
            NaiveDate::from_ymd_opt(2025, 5, 19).expect("valid date")
        );
        assert!(rows[1].is_today);
        assert_eq!(rows.iter().filter(|row| row.is_today).count(), 1);
        assert!(rows.iter().all(|row| row.date.month == 3));
    }
}
