use std::io::Write;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::issues::{coordinates, first_id};
use super::modifiers::{Field, ParsedArgs};
use super::simulate_latency;
use crate::config::Config;
use crate::datetime::{parse_clock_time, parse_event_date};
use crate::model::EventCategory;
use crate::render::Renderer;
use crate::state::{AppState, EventDraft};
use crate::views::{EventQuery, EventTab, RsvpAction};

const DEFAULT_MAX_PARTICIPANTS: u32 = 20;

#[instrument(skip_all)]
pub(super) fn cmd_events<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let parsed = ParsedArgs::parse(args, &[Field::Tab]);
    let query = EventQuery {
        search: parsed.text(),
        tab: parsed.parse_field::<EventTab>(Field::Tab)?.unwrap_or_default(),
    };

    let user = state.user();
    let user_id = user.as_ref().map(|u| u.id.as_str());
    let events = query.apply(&state.events(), user_id, now);
    if !events.is_empty() {
        return renderer.event_table(&events, user_id);
    }

    renderer.line("No events found")?;
    match query.tab {
        EventTab::Upcoming => renderer.line("There are no upcoming events. Why not create one?"),
        EventTab::Past => renderer.line("No past events to show."),
        EventTab::Mine => renderer.line("You haven't joined or created any events yet."),
        EventTab::All => Ok(()),
    }
}

pub(super) fn cmd_event<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let id = first_id(args, "event")?;
    let Some(event) = state.event(id) else {
        return renderer.line("Event not found");
    };
    let rsvp = RsvpAction::for_event(&event, state.user().as_ref(), now);
    renderer.event_info(&event, rsvp, now)
}

#[instrument(skip_all)]
pub(super) fn cmd_create<W: Write>(
    state: &AppState,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let Some(user) = state.user() else {
        return renderer.line("Log in to create an event.");
    };

    let parsed = ParsedArgs::parse(
        args,
        &[
            Field::Desc,
            Field::Category,
            Field::Address,
            Field::Lat,
            Field::Lng,
            Field::Date,
            Field::Start,
            Field::End,
            Field::Max,
        ],
    );
    let title = parsed.text();
    if title.trim().is_empty() {
        return Err(anyhow!("create: a title is required"));
    }

    let date = parse_event_date(parsed.require(Field::Date, "create")?, now.date_naive())?;
    let start_time = parse_clock_time(parsed.require(Field::Start, "create")?)?;
    let end_time = parse_clock_time(parsed.require(Field::End, "create")?)?;
    if end_time <= start_time {
        return Err(anyhow!(
            "create: end time {} is not after start time {}",
            end_time.format("%H:%M"),
            start_time.format("%H:%M")
        ));
    }

    let draft = EventDraft {
        title,
        description: parsed.get(Field::Desc).unwrap_or_default().to_string(),
        category: parsed
            .parse_field(Field::Category)?
            .unwrap_or(EventCategory::Cleanup),
        address: parsed.get(Field::Address).map(str::to_string),
        coordinates: coordinates(&parsed)?,
        date,
        start_time,
        end_time,
        max_participants: parsed
            .parse_field(Field::Max)?
            .unwrap_or(DEFAULT_MAX_PARTICIPANTS),
    };

    simulate_latency(cfg.submit_latency()?);

    let event = draft.into_event(&user, now);
    let id = event.id.clone();
    state.add_event(event);
    info!(id = %id, "command create");

    renderer.line(&format!(
        "Created {id}. You have earned {} points for organizing!",
        state.rewards().organize
    ))
}

pub(super) fn cmd_join<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let id = first_id(args, "join")?;
    if !state.is_authenticated() {
        return renderer.line("Log in to join events.");
    }
    match state.join_event(id) {
        Some(event) => renderer.line(&format!(
            "Joined {} ({}/{}).",
            event.title,
            event.participants.len(),
            event.max_participants
        )),
        None => renderer.line("Event not found"),
    }
}

pub(super) fn cmd_leave<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    let id = first_id(args, "leave")?;
    if !state.is_authenticated() {
        return renderer.line("Log in to leave events.");
    }
    match state.leave_event(id) {
        Some(event) => renderer.line(&format!("Cancelled RSVP for {}.", event.title)),
        None => renderer.line("Event not found"),
    }
}

/// Joins or leaves depending on what the event page would offer.
#[instrument(skip(state, renderer, now))]
pub(super) fn cmd_rsvp<W: Write>(
    state: &AppState,
    renderer: &mut Renderer<W>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let id = first_id(args, "rsvp")?;
    let Some(event) = state.event(id) else {
        return renderer.line("Event not found");
    };

    match RsvpAction::for_event(&event, state.user().as_ref(), now) {
        RsvpAction::Join => cmd_join(state, renderer, args),
        RsvpAction::Leave => cmd_leave(state, renderer, args),
        RsvpAction::Full => renderer.line("This event is full"),
        RsvpAction::Past => renderer.line("This event has ended."),
        RsvpAction::Organizer => renderer.line("You are organizing this event."),
        RsvpAction::SignedOut => renderer.line("Log in to RSVP."),
    }
}
