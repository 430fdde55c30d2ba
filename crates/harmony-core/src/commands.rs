mod community;
mod events;
mod issues;
mod modifiers;

use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::cli::{Invocation, tokenize_line};
use crate::config::Config;
use crate::model::{EventCategory, IssueCategory, IssuePriority, IssueStatus, ResourceCategory};
use crate::render::Renderer;
use crate::state::AppState;

const SHELL_PROMPT: &str = "harmony> ";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "dashboard",
        "issues",
        "issue",
        "report",
        "comment",
        "modify",
        "events",
        "event",
        "create",
        "join",
        "leave",
        "rsvp",
        "notifications",
        "read",
        "leaderboard",
        "resources",
        "resource",
        "login",
        "logout",
        "whoami",
        "export",
        "config",
        "shell",
        "help",
        "version",
    ]
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

#[instrument(skip(state, cfg, renderer, inv))]
pub fn dispatch<W: Write>(
    state: &AppState,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();
    let args = inv.args.as_slice();

    debug!(command, args = ?args, "dispatching command");

    match command {
        "dashboard" => community::cmd_dashboard(state, renderer, now),
        "issues" => issues::cmd_issues(state, renderer, args),
        "issue" => issues::cmd_issue(state, renderer, args),
        "report" => issues::cmd_report(state, cfg, renderer, args, now),
        "comment" => issues::cmd_comment(state, renderer, args, now),
        "modify" => issues::cmd_modify(state, renderer, args, now),
        "events" => events::cmd_events(state, renderer, args, now),
        "event" => events::cmd_event(state, renderer, args, now),
        "create" => events::cmd_create(state, cfg, renderer, args, now),
        "join" => events::cmd_join(state, renderer, args),
        "leave" => events::cmd_leave(state, renderer, args),
        "rsvp" => events::cmd_rsvp(state, renderer, args, now),
        "notifications" => community::cmd_notifications(state, renderer),
        "read" => community::cmd_read(state, renderer, args),
        "leaderboard" => community::cmd_leaderboard(state, renderer),
        "resources" => community::cmd_resources(state, renderer, args),
        "resource" => community::cmd_resource(state, renderer, args),
        "login" => cmd_login(state, cfg, renderer, args),
        "logout" => {
            state.logout();
            renderer.line("Signed out.")
        }
        "whoami" => cmd_whoami(state, renderer),
        "export" => cmd_export(state, renderer, args),
        "config" => cmd_config(cfg, renderer),
        "shell" => Err(anyhow!("shell: already running inside a shell")),
        "help" => cmd_help(renderer),
        "version" => renderer.line(env!("CARGO_PKG_VERSION")),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Reads one command per line until EOF or `exit`. A failing line is reported
/// and the loop continues with the next one.
#[instrument(skip_all)]
pub fn run_shell<R: BufRead, W: Write>(
    state: &AppState,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    input: R,
    interactive: bool,
) -> anyhow::Result<()> {
    info!(interactive, "shell started");
    let mut lines = input.lines();

    loop {
        if interactive {
            let mut stderr = std::io::stderr();
            write!(stderr, "{SHELL_PROMPT}")?;
            stderr.flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if matches!(trimmed, "exit" | "quit") {
            break;
        }

        let outcome = tokenize_line(trimmed)
            .and_then(|tokens| Invocation::from_tokens(cfg, tokens))
            .and_then(|inv| dispatch(state, cfg, renderer, inv));
        if let Err(err) = outcome {
            warn!(line = %trimmed, error = %err, "shell command failed");
            renderer.line(&format!("error: {err:#}"))?;
        }
    }

    info!("shell finished");
    Ok(())
}

pub fn stdin_is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

pub(crate) fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        debug!(ms = delay.as_millis(), "simulating submit latency");
        std::thread::sleep(delay);
    }
}

#[instrument(skip(state, cfg, renderer, args))]
fn cmd_login<W: Write>(
    state: &AppState,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let email = args.first().map(String::as_str).unwrap_or_default();
    let password = args.get(1).map(String::as_str).unwrap_or_default();
    if email.trim().is_empty() {
        return Err(anyhow!("login: an email is required"));
    }

    simulate_latency(cfg.login_latency()?);

    if state.login(email, password) {
        let name = state.user().map(|u| u.name).unwrap_or_default();
        renderer.line(&format!("Welcome back, {name}!"))
    } else {
        renderer.line("Login failed.")
    }
}

fn cmd_whoami<W: Write>(state: &AppState, renderer: &mut Renderer<W>) -> anyhow::Result<()> {
    match state.user() {
        Some(user) => renderer.line(&format!(
            "{} <{}> {} ({} points)",
            user.name, user.email, user.role, user.points
        )),
        None => renderer.line("Not signed in."),
    }
}

#[instrument(skip(state, renderer))]
fn cmd_export<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let path = args
        .first()
        .ok_or_else(|| anyhow!("export: a destination path is required"))?;
    let path = Path::new(path);
    state.snapshot().export(path)?;
    info!(path = %path.display(), "state exported");
    renderer.line(&format!("Exported state to {}", path.display()))
}

fn cmd_config<W: Write>(cfg: &Config, renderer: &mut Renderer<W>) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (k, v) in entries {
        renderer.line(&format!("{k}={v}"))?;
    }
    for file in &cfg.loaded_files {
        renderer.line(&format!("# loaded {}", file.display()))?;
    }
    Ok(())
}

fn cmd_help<W: Write>(renderer: &mut Renderer<W>) -> anyhow::Result<()> {
    let text = "\
Usage: harmony [--config FILE] [--rc KEY=VALUE] [rc.KEY=VALUE] <command> [args]

Issues
  issues [words] [cat:X] [status:X] [pri:X]   list and filter issues
  issue <id>                                  show one issue
  report <title> [desc:X] [cat:X] [pri:X] [addr:X] [photo:URL] [lat:N lng:N]
  comment <id> <text>                         add a comment
  modify <id> [title:X] [desc:X] [cat:X] [pri:X] [status:X [msg:X]] [addr:X] [photo:URL]

Events
  events [words] [tab:upcoming|past|mine|all]
  event <id>                                  show one event
  create <title> date:X start:HH:MM end:HH:MM [desc:X] [cat:X] [addr:X] [max:N]
  join <id> | leave <id> | rsvp <id>

Community
  dashboard  notifications  read <id>  leaderboard  resources [words] [cat:X]  resource <id>

Session
  login <email> [password]  logout  whoami  export <path>  config  shell  help  version

Commands may be abbreviated to any unique prefix. `--` ends modifier parsing.";
    renderer.line(text)?;

    renderer.line("")?;
    renderer.line("Values")?;
    for (key, values) in [
        ("issue cat", choices(IssueCategory::ALL, IssueCategory::as_str)),
        ("pri", choices(IssuePriority::ALL, IssuePriority::as_str)),
        ("status", choices(IssueStatus::ALL, IssueStatus::as_str)),
        ("event cat", choices(EventCategory::ALL, EventCategory::as_str)),
        ("resource cat", choices(ResourceCategory::ALL, ResourceCategory::as_str)),
    ] {
        renderer.line(&format!("  {key:<13} {values}"))?;
    }
    Ok(())
}

fn choices<T: Copy>(all: &[T], name: fn(T) -> &'static str) -> String {
    all.iter().map(|v| name(*v)).collect::<Vec<_>>().join("|")
}
