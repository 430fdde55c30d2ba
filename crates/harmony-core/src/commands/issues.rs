use std::io::Write;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::modifiers::{Field, ParsedArgs};
use super::simulate_latency;
use crate::config::Config;
use crate::model::{
    Comment, IssueCategory, IssuePatch, IssuePriority, IssueStatus, Location, StatusUpdate,
};
use crate::render::Renderer;
use crate::state::{AppState, IssueDraft};
use crate::views::IssueQuery;

#[instrument(skip_all)]
pub(super) fn cmd_issues<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let parsed = ParsedArgs::parse(args, &[Field::Category, Field::Status, Field::Priority]);
    let query = IssueQuery {
        search: parsed.text(),
        category: parsed.parse_field::<IssueCategory>(Field::Category)?,
        status: parsed.parse_field::<IssueStatus>(Field::Status)?,
        priority: parsed.parse_field::<IssuePriority>(Field::Priority)?,
    };

    let issues = state.issues();
    let matched = query.apply(&issues);
    if matched.is_empty() {
        renderer.line("No issues found. Try adjusting your filters or report a new issue.")?;
    } else {
        renderer.issue_table(&matched)?;
    }
    renderer.line(&format!("Showing {} of {} issues", matched.len(), issues.len()))
}

pub(super) fn cmd_issue<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let id = first_id(args, "issue")?;
    match state.issue(id) {
        Some(issue) => renderer.issue_info(&issue),
        None => renderer.line("Issue not found"),
    }
}

#[instrument(skip_all)]
pub(super) fn cmd_report<W: Write>(
    state: &AppState,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let Some(user) = state.user() else {
        return renderer.line("Log in to report an issue.");
    };

    let parsed = ParsedArgs::parse(
        args,
        &[
            Field::Desc,
            Field::Category,
            Field::Priority,
            Field::Address,
            Field::Photo,
            Field::Lat,
            Field::Lng,
        ],
    );
    let title = parsed.text();
    if title.trim().is_empty() {
        return Err(anyhow!("report: a title is required"));
    }

    let mut draft = IssueDraft::new(title);
    if let Some(desc) = parsed.get(Field::Desc) {
        draft.description = desc.to_string();
    }
    if let Some(category) = parsed.parse_field(Field::Category)? {
        draft.category = category;
    }
    if let Some(priority) = parsed.parse_field(Field::Priority)? {
        draft.priority = priority;
    }
    draft.address = parsed.get(Field::Address).map(str::to_string);
    draft.photo_url = parsed
        .get(Field::Photo)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string);
    draft.coordinates = coordinates(&parsed)?;

    simulate_latency(cfg.submit_latency()?);

    let issue = draft.into_issue(&user, now);
    let id = issue.id.clone();
    state.add_issue(issue);
    info!(id = %id, "command report");

    renderer.line(&format!(
        "Reported {id}. Thank you for helping improve our community. You have earned {} points!",
        state.rewards().report
    ))
}

pub(super) fn cmd_comment<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let id = first_id(args, "comment")?;
    let Some(user) = state.user() else {
        return renderer.line("Log in to comment.");
    };
    let content = args.get(1..).unwrap_or_default().join(" ");
    if content.trim().is_empty() {
        return renderer.line("Nothing to add: the comment is empty.");
    }
    let Some(issue) = state.issue(id) else {
        return renderer.line("Issue not found");
    };

    let patch = IssuePatch::append_comment(&issue, Comment::from_user(&user, content, now));
    match state.update_issue(id, patch) {
        Some(updated) => renderer.line(&format!(
            "Added comment to {id} ({} comments).",
            updated.comments.len()
        )),
        None => renderer.line("Issue not found"),
    }
}

#[instrument(skip_all)]
pub(super) fn cmd_modify<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let id = first_id(args, "modify")?;
    let Some(user) = state.user() else {
        return renderer.line("Log in to modify issues.");
    };
    let Some(issue) = state.issue(id) else {
        return renderer.line("Issue not found");
    };

    let parsed = ParsedArgs::parse(
        args.get(1..).unwrap_or_default(),
        &[
            Field::Title,
            Field::Desc,
            Field::Category,
            Field::Priority,
            Field::Status,
            Field::Address,
            Field::Photo,
            Field::Message,
        ],
    );

    let mut patch = match parsed.parse_field::<IssueStatus>(Field::Status)? {
        Some(status) if status != issue.status => {
            let message = parsed
                .get(Field::Message)
                .map_or_else(|| format!("Status changed to {status}"), str::to_string);
            IssuePatch::transition(&issue, StatusUpdate::by_user(&user, status, message, now))
        }
        _ => IssuePatch::default(),
    };
    patch.title = parsed.get(Field::Title).map(str::to_string);
    patch.description = parsed.get(Field::Desc).map(str::to_string);
    patch.category = parsed.parse_field(Field::Category)?;
    patch.priority = parsed.parse_field(Field::Priority)?;
    patch.location = parsed.get(Field::Address).map(|address| Location {
        address: address.to_string(),
        ..issue.location.clone()
    });
    patch.photo_url = parsed.get(Field::Photo).map(|photo| {
        let photo = photo.trim();
        (!photo.is_empty() && photo != "none").then(|| photo.to_string())
    });

    if patch.is_empty() {
        return Err(anyhow!("modify: nothing to change for {id}"));
    }

    match state.update_issue(id, patch) {
        Some(updated) => renderer.line(&format!(
            "Updated {id} ({}, {} priority).",
            updated.status, updated.priority
        )),
        None => renderer.line("Issue not found"),
    }
}

pub(super) fn coordinates(parsed: &ParsedArgs) -> anyhow::Result<Option<(f64, f64)>> {
    match (
        parsed.parse_field::<f64>(Field::Lat)?,
        parsed.parse_field::<f64>(Field::Lng)?,
    ) {
        (Some(lat), Some(lng)) => Ok(Some((lat, lng))),
        (None, None) => Ok(None),
        _ => Err(anyhow!("lat: and lng: must be given together")),
    }
}

pub(super) fn first_id<'a>(args: &'a [String], command: &str) -> anyhow::Result<&'a str> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{command}: an id is required"))
}
