pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod display;
pub mod engine;
pub mod error;
pub mod parts;
pub mod render;
pub mod wheel;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

pub use calendar::{
  CalendarSettings,
  CreatorDate,
  DayKind,
  YearRule
};
pub use engine::{
  CalendarSnapshot,
  CreatorCalendar
};
pub use error::CalendarError;
pub use parts::CreatorTime;
pub use wheel::WheelAngles;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(cli::level_for(
    cli.verbose,
    cli.quiet
  ))?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting sow CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.sowrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let engine =
    CreatorCalendar::from_config(&cfg)?;
  let mut renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &engine,
    &cfg,
    &mut renderer,
    inv
  )?;

  info!("done");
  Ok(())
}
