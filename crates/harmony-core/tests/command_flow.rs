use std::io::Cursor;

use harmony_core::cli::{Invocation, tokenize_line};
use harmony_core::commands::{dispatch, run_shell};
use harmony_core::config::Config;
use harmony_core::model::IssueStatus;
use harmony_core::render::Renderer;
use harmony_core::seed::Seed;
use harmony_core::state::{AppState, Rewards};
use tempfile::tempdir;

fn demo_state() -> AppState {
    AppState::from_seed(Seed::builtin().expect("builtin seed"), Rewards::default())
}

fn run_line(state: &AppState, cfg: &Config, line: &str) -> anyhow::Result<String> {
    let tokens = tokenize_line(line)?;
    let inv = Invocation::from_tokens(cfg, tokens)?;
    let mut renderer = Renderer::new(Vec::new(), false);
    dispatch(state, cfg, &mut renderer, inv)?;
    Ok(String::from_utf8(renderer.into_inner()).expect("utf8 output"))
}

#[test]
fn report_then_modify_and_comment() {
    let state = demo_state();
    let cfg = Config::default();
    let points = state.user().expect("signed in").points;

    let out = run_line(
        &state,
        &cfg,
        r#"report Loose manhole cover cat:roads pri:high addr:"9 Elm Street""#,
    )
    .expect("report");
    assert!(out.contains("earned 25 points"));

    let issue = state.issues().into_iter().next().expect("new issue");
    assert_eq!(issue.title, "Loose manhole cover");
    assert_eq!(issue.location.address, "9 Elm Street");
    assert_eq!(state.user().expect("signed in").points, points + 25);

    let out = run_line(&state, &cfg, &format!("modify {} status:ack", issue.id)).expect("modify");
    assert!(out.contains("Acknowledged"));
    let issue = state.issue(&issue.id).expect("still there");
    assert_eq!(issue.status, IssueStatus::Acknowledged);
    assert_eq!(issue.status_history.len(), 2);
    assert_eq!(issue.status_history[1].message, "Status changed to Acknowledged");

    run_line(&state, &cfg, &format!("comment {} On it tomorrow", issue.id)).expect("comment");
    let issue = state.issue(&issue.id).expect("still there");
    assert_eq!(issue.comments.len(), 1);
    assert_eq!(issue.comments[0].content, "On it tomorrow");
}

#[test]
fn issue_listing_filters_and_counts() {
    let state = demo_state();
    let cfg = Config::default();

    let out = run_line(&state, &cfg, "issues status:resolved").expect("issues");
    assert!(out.contains("Overflowing Trash Bin"));
    assert!(out.contains("Showing 1 of 5 issues"));

    let out = run_line(&state, &cfg, "issues zebra crossing").expect("issues");
    assert!(out.contains("No issues found"));
    assert!(out.contains("Showing 0 of 5 issues"));

    let out = run_line(&state, &cfg, "issue issue-404").expect("issue");
    assert_eq!(out.trim(), "Issue not found");

    assert!(run_line(&state, &cfg, "issues pri:urgent").is_err());
}

#[test]
fn organizer_and_signed_out_user_cannot_rsvp() {
    let state = demo_state();
    let cfg = Config::default();

    let out = run_line(&state, &cfg, "events").expect("events");
    assert!(out.contains("There are no upcoming events"));

    run_line(
        &state,
        &cfg,
        "create Storm Drain Stenciling date:+7d start:9am end:11:30 max:2 cat:repair",
    )
    .expect("create");
    let event = state.events().into_iter().next().expect("new event");
    assert_eq!(event.max_participants, 2);
    assert_eq!(event.organizer_id, "user-1");

    let out = run_line(&state, &cfg, "events").expect("events");
    assert!(out.contains("Storm Drain Stenciling"));

    let out = run_line(&state, &cfg, &format!("rsvp {}", event.id)).expect("rsvp");
    assert!(out.contains("organizing"));

    state.logout();
    let out = run_line(&state, &cfg, &format!("rsvp {}", event.id)).expect("rsvp");
    assert!(out.contains("Log in"));
    assert!(state.event(&event.id).expect("event").participants.is_empty());
}

#[test]
fn rsvp_joins_then_leaves_an_event_organized_by_someone_else() {
    let state = demo_state();
    let cfg = Config::default();
    let demo = state.user().expect("signed in");

    let mut organizer = demo.clone();
    organizer.id = "user-4".to_string();
    organizer.name = "Sarah Chen".to_string();
    state.set_user(Some(organizer));
    run_line(
        &state,
        &cfg,
        "create Community Garden Planting date:+3d start:10:00 end:12:00 cat:gardening",
    )
    .expect("create");
    let event = state.events().into_iter().next().expect("new event");
    assert_eq!(event.organizer_id, "user-4");

    state.set_user(Some(demo));
    let out = run_line(&state, &cfg, &format!("event {}", event.id)).expect("event");
    assert!(out.contains("Run `join` or `rsvp`"));

    let out = run_line(&state, &cfg, &format!("rsvp {}", event.id)).expect("rsvp");
    assert!(out.contains("Joined Community Garden Planting (1/20)"));
    let roster = state.event(&event.id).expect("event").participants;
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].user_id, "user-1");

    let out = run_line(&state, &cfg, &format!("rsvp {}", event.id)).expect("rsvp");
    assert!(out.contains("Cancelled RSVP"));
    assert!(state.event(&event.id).expect("event").participants.is_empty());
}

#[test]
fn rsvp_on_past_event_is_refused_but_join_is_raw() {
    let state = demo_state();
    let cfg = Config::default();

    let out = run_line(&state, &cfg, "rsvp event-3").expect("rsvp");
    assert!(out.contains("ended"));
    assert!(state.event("event-3").expect("event").participants.is_empty());

    run_line(&state, &cfg, "join event-3").expect("join");
    run_line(&state, &cfg, "join event-3").expect("join");
    assert_eq!(state.event("event-3").expect("event").participants.len(), 2);

    run_line(&state, &cfg, "leave event-3").expect("leave");
    assert!(state.event("event-3").expect("event").participants.is_empty());
}

#[test]
fn signed_out_commands_are_guarded() {
    let state = demo_state();
    let cfg = Config::default();
    run_line(&state, &cfg, "logout").expect("logout");

    let before = state.issues().len();
    let out = run_line(&state, &cfg, "report Anything").expect("report");
    assert!(out.contains("Log in to report"));
    assert_eq!(state.issues().len(), before);

    let out = run_line(&state, &cfg, "whoami").expect("whoami");
    assert!(out.contains("Not signed in"));

    let out = run_line(&state, &cfg, "login alex@example.com pw").expect("login");
    assert!(out.contains("Alex Johnson"));
    assert!(state.is_authenticated());
}

#[test]
fn notifications_leaderboard_and_resources() {
    let state = demo_state();
    let cfg = Config::default();

    let out = run_line(&state, &cfg, "notifications").expect("notifications");
    assert!(out.contains("2 unread"));
    run_line(&state, &cfg, "read notif-1").expect("read");
    assert_eq!(state.unread_count(), 1);

    let out = run_line(&state, &cfg, "leaderboard").expect("leaderboard");
    assert!(out.contains("rank #3"));
    assert!(out.contains("Alex Johnson (you)"));
    assert!(out.contains("Organize an Event"));

    let out = run_line(&state, &cfg, "resources cat:safety").expect("resources");
    assert!(out.contains("Volunteer Safety Guidelines"));
    assert!(!out.contains("Building a Cleaner Community"));

    let out = run_line(&state, &cfg, "resource resource-404").expect("resource");
    assert_eq!(out.trim(), "Resource not found");
}

#[test]
fn help_lists_accepted_values() {
    let state = demo_state();
    let cfg = Config::default();

    let out = run_line(&state, &cfg, "help").expect("help");
    assert!(out.contains("reported|acknowledged|in-progress|resolved"));
    assert!(out.contains("low|medium|high"));
    assert!(out.contains("cleanup|repair|gardening|other"));
}

#[test]
fn shell_keeps_one_session_and_survives_errors() {
    let state = demo_state();
    let cfg = Config::default();
    let script = "\
# comment lines are skipped
report \"Shell reported issue\" pri:low
frobnicate
modify issue-404 title:nothing
shell
read notif-2
exit
read notif-1
";
    let mut renderer = Renderer::new(Vec::new(), false);
    run_shell(&state, &cfg, &mut renderer, Cursor::new(script), false).expect("shell");
    let out = String::from_utf8(renderer.into_inner()).expect("utf8");

    assert!(out.contains("Reported issue-"));
    assert!(out.contains("error: unknown or ambiguous command: frobnicate"));
    assert!(out.contains("Issue not found"));
    assert!(out.contains("error: shell: already running inside a shell"));
    assert!(out.contains("Marked notif-2 as read."));
    assert!(!out.contains("notif-1"));

    assert_eq!(state.issues()[0].title, "Shell reported issue");
    let unread: Vec<String> = state
        .notifications()
        .into_iter()
        .filter(|n| !n.read)
        .map(|n| n.id)
        .collect();
    assert_eq!(unread.len(), 2);
    assert!(unread.contains(&"notif-1".to_string()));
}

#[test]
fn export_round_trips_through_seed_loader() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("snapshot.json");

    let state = demo_state();
    let cfg = Config::default();
    run_line(&state, &cfg, "report Exported issue").expect("report");
    run_line(&state, &cfg, &format!("export {}", path.display())).expect("export");

    let seed = Seed::load(&path).expect("load snapshot");
    assert_eq!(seed.issues.len(), 6);
    assert_eq!(seed.issues[0].title, "Exported issue");
    assert_eq!(seed.user.points, 1275);
    assert!(seed.signed_in);

    let restored = AppState::from_seed(seed, Rewards::default());
    let ids = |issues: Vec<harmony_core::model::Issue>| -> Vec<String> {
        issues.into_iter().map(|i| i.id).collect()
    };
    assert_eq!(ids(restored.issues()), ids(state.issues()));
    assert_eq!(restored.notifications(), state.notifications());
}
