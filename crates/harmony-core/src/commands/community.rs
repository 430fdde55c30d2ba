use std::io::Write;

use chrono::{DateTime, Utc};

use super::issues::first_id;
use super::modifiers::{Field, ParsedArgs};
use crate::model::ResourceCategory;
use crate::render::Renderer;
use crate::state::AppState;
use crate::views::{DashboardSummary, ResourceQuery, earning_rules, leaderboard, rank_of};

pub(super) fn cmd_dashboard<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let user = state.user();
    let summary = DashboardSummary::compute(user.as_ref(), &state.issues(), &state.events(), now);
    renderer.dashboard(user.as_ref(), &summary, state.unread_count())
}

pub(super) fn cmd_notifications<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let notifications = state.notifications();
    if notifications.is_empty() {
        return renderer.line("No notifications.");
    }
    renderer.notification_table(&notifications)?;
    renderer.line(&format!("{} unread", state.unread_count()))
}

pub(super) fn cmd_read<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let id = first_id(args, "read")?;
    if state.mark_notification_read(id) {
        renderer.line(&format!("Marked {id} as read."))
    } else {
        renderer.line("Notification not found")
    }
}

pub(super) fn cmd_leaderboard<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let user = state.user();
    let rows = leaderboard(state.standings(), user.as_ref());
    let rank = user.as_ref().and_then(|u| rank_of(&rows, &u.id));
    renderer.leaderboard(user.as_ref(), rank, &rows, &earning_rules(state.rewards()))
}

pub(super) fn cmd_resources<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let parsed = ParsedArgs::parse(args, &[Field::Category]);
    let query = ResourceQuery {
        search: parsed.text(),
        category: parsed.parse_field::<ResourceCategory>(Field::Category)?,
    };

    let resources = query.apply(state.resources());
    if resources.is_empty() {
        return renderer.line("No resources found.");
    }
    renderer.resource_table(&resources)
}

pub(super) fn cmd_resource<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let id = first_id(args, "resource")?;
    match state.resource(id) {
        Some(resource) => renderer.resource_info(resource),
        None => renderer.line("Resource not found"),
    }
}
