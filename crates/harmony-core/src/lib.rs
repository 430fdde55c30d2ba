pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod model;
pub mod render;
pub mod seed;
pub mod state;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting harmony CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre
      .rc_overrides
      .into_iter()
      .chain(cli.rc_overrides)
  );

  let seed_path = cfg.seed_location();
  let seed =
    seed::Seed::resolve(
      seed_path.as_deref()
    )
    .context(
      "failed to load seed data"
    )?;
  let app = state::AppState::from_seed(
    seed,
    cfg.rewards()?
  );

  let mut renderer =
    render::Renderer::stdout(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  if inv.command == "shell" {
    let stdin = std::io::stdin();
    commands::run_shell(
      &app,
      &cfg,
      &mut renderer,
      stdin.lock(),
      commands::stdin_is_interactive()
    )?;
  } else {
    commands::dispatch(
      &app,
      &cfg,
      &mut renderer,
      inv
    )?;
  }

  info!("done");
  Ok(())
}
