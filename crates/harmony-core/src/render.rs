use std::io::{self, IsTerminal, Stdout, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::model::{
    Issue, IssuePriority, IssueStatus, Notification, Resource, User, VolunteerEvent,
};
use crate::views::{DashboardSummary, EarningRule, LeaderboardRow, RsvpAction};

const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug)]
pub struct Renderer<W: Write = Stdout> {
    out: W,
    color: bool,
}

impl Renderer<Stdout> {
    pub fn stdout(cfg: &Config) -> anyhow::Result<Self> {
        let color = color_setting(cfg)? && io::stdout().is_terminal();
        Ok(Self {
            out: io::stdout(),
            color,
        })
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = issues.len()))]
    pub fn issue_table(&mut self, issues: &[Issue]) -> anyhow::Result<()> {
        let headers = ["ID", "Status", "Priority", "Category", "Title", "Address"];
        let rows = issues
            .iter()
            .map(|issue| {
                vec![
                    self.paint(&issue.id, "33"),
                    self.paint_status(issue.status),
                    self.paint_priority(issue.priority),
                    issue.category.label().to_string(),
                    issue.title.clone(),
                    issue.location.address.clone(),
                ]
            })
            .collect();
        write_table(&mut self.out, &headers, rows)
    }

    #[tracing::instrument(skip_all, fields(id = %issue.id))]
    pub fn issue_info(&mut self, issue: &Issue) -> anyhow::Result<()> {
        let status = self.paint_status(issue.status);
        let priority = self.paint_priority(issue.priority);
        let out = &mut self.out;

        writeln!(out, "id        {}", issue.id)?;
        writeln!(out, "title     {}", issue.title)?;
        writeln!(out, "status    {status}")?;
        writeln!(out, "priority  {priority}")?;
        writeln!(out, "category  {}", issue.category)?;
        writeln!(out, "address   {}", issue.location.address)?;
        writeln!(
            out,
            "coords    {:.4}, {:.4}",
            issue.location.lat, issue.location.lng
        )?;
        writeln!(out, "reporter  {}", issue.reporter_name)?;
        writeln!(out, "reported  {}", issue.created_at.format(STAMP_FORMAT))?;
        writeln!(out, "updated   {}", issue.updated_at.format(STAMP_FORMAT))?;
        if let Some(photo) = &issue.photo_url {
            writeln!(out, "photo     {photo}")?;
        }
        writeln!(out)?;
        writeln!(out, "{}", issue.description)?;

        writeln!(out)?;
        writeln!(out, "Status history")?;
        for update in &issue.status_history {
            writeln!(
                out,
                "  {}  {:<12}  {} ({})",
                update.updated_at.format(STAMP_FORMAT),
                update.status.label(),
                update.message,
                update.updated_by
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Comments ({})", issue.comments.len())?;
        if issue.comments.is_empty() {
            writeln!(out, "  No comments yet. Be the first to comment!")?;
        }
        for comment in &issue.comments {
            writeln!(
                out,
                "  {}  {}: {}",
                comment.created_at.format(STAMP_FORMAT),
                comment.user_name,
                comment.content
            )?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = events.len()))]
    pub fn event_table(
        &mut self,
        events: &[VolunteerEvent],
        user_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let headers = ["ID", "Date", "Time", "Category", "Title", "Spots", "You"];
        let rows = events
            .iter()
            .map(|event| {
                let spots = if event.is_full() {
                    self.paint("full", "31")
                } else {
                    format!("{}/{}", event.participants.len(), event.max_participants)
                };
                let you = match user_id {
                    Some(id) if event.is_organizer(id) => "organizer",
                    Some(id) if event.is_participant(id) => "going",
                    _ => "",
                };
                vec![
                    self.paint(&event.id, "33"),
                    event.date.format("%a %b %d, %Y").to_string(),
                    format!(
                        "{}-{}",
                        event.start_time.format("%H:%M"),
                        event.end_time.format("%H:%M")
                    ),
                    event.category.label().to_string(),
                    event.title.clone(),
                    spots,
                    you.to_string(),
                ]
            })
            .collect();
        write_table(&mut self.out, &headers, rows)
    }

    #[tracing::instrument(skip_all, fields(id = %event.id))]
    pub fn event_info(
        &mut self,
        event: &VolunteerEvent,
        rsvp: RsvpAction,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let out = &mut self.out;

        writeln!(out, "id         {}", event.id)?;
        writeln!(out, "title      {}", event.title)?;
        writeln!(out, "category   {}", event.category)?;
        writeln!(out, "date       {}", event.date.format("%A, %B %d, %Y"))?;
        writeln!(
            out,
            "time       {} - {}",
            event.start_time.format("%H:%M"),
            event.end_time.format("%H:%M")
        )?;
        writeln!(out, "address    {}", event.location.address)?;
        writeln!(out, "organizer  {}", event.organizer_name)?;
        writeln!(
            out,
            "spots      {} of {} left",
            event.spots_left(),
            event.max_participants
        )?;
        if event.is_past(now) {
            writeln!(out, "           (this event has ended)")?;
        }
        writeln!(out)?;
        writeln!(out, "{}", event.description)?;

        writeln!(out)?;
        writeln!(
            out,
            "Participants ({}/{})",
            event.participants.len(),
            event.max_participants
        )?;
        if event.participants.is_empty() {
            writeln!(out, "  No participants yet. Be the first to join!")?;
        }
        for participant in &event.participants {
            writeln!(out, "  {}", participant.user_name)?;
        }

        writeln!(out)?;
        let hint = match rsvp {
            RsvpAction::Join => "Run `join` or `rsvp` with this id to attend.",
            RsvpAction::Leave => "You are attending this event! `rsvp` again to cancel.",
            RsvpAction::Full => "This event is full.",
            RsvpAction::Past => "RSVP is closed.",
            RsvpAction::Organizer => "You are organizing this event.",
            RsvpAction::SignedOut => "Log in to RSVP.",
        };
        writeln!(out, "{hint}")?;
        Ok(())
    }

    pub fn notification_table(&mut self, notifications: &[Notification]) -> anyhow::Result<()> {
        let headers = ["ID", "", "Type", "When", "Message"];
        let rows = notifications
            .iter()
            .map(|n| {
                vec![
                    self.paint(&n.id, "33"),
                    if n.read {
                        String::new()
                    } else {
                        self.paint("*", "36")
                    },
                    n.kind.label().to_string(),
                    n.created_at.format(STAMP_FORMAT).to_string(),
                    n.message.clone(),
                ]
            })
            .collect();
        write_table(&mut self.out, &headers, rows)
    }

    pub fn leaderboard(
        &mut self,
        user: Option<&User>,
        rank: Option<usize>,
        rows: &[LeaderboardRow],
        rules: &[EarningRule],
    ) -> anyhow::Result<()> {
        if let Some(user) = user {
            let rank = rank.map_or_else(|| "-".to_string(), |r| format!("#{r}"));
            writeln!(
                self.out,
                "{}: {} points, {} badges, rank {rank}",
                user.name,
                user.points,
                user.badges.len()
            )?;
            for badge in &user.badges {
                writeln!(self.out, "  [{}] {}", badge.name, badge.description)?;
            }
            writeln!(self.out)?;
        }

        let headers = ["Rank", "Name", "Points", "Badges"];
        let table = rows
            .iter()
            .map(|row| {
                let name = if row.is_current_user {
                    self.paint(&format!("{} (you)", row.name), "1")
                } else {
                    row.name.clone()
                };
                vec![
                    row.rank.to_string(),
                    name,
                    row.points.to_string(),
                    row.badges.to_string(),
                ]
            })
            .collect();
        write_table(&mut self.out, &headers, table)?;

        writeln!(self.out)?;
        writeln!(self.out, "How to earn points")?;
        for rule in rules {
            writeln!(self.out, "  +{:<4} {} - {}", rule.points, rule.action, rule.hint)?;
        }
        Ok(())
    }

    pub fn resource_table(&mut self, resources: &[&Resource]) -> anyhow::Result<()> {
        let headers = ["ID", "Category", "Title", "Summary"];
        let rows = resources
            .iter()
            .map(|r| {
                vec![
                    self.paint(&r.id, "33"),
                    r.category.label().to_string(),
                    r.title.clone(),
                    r.description.clone(),
                ]
            })
            .collect();
        write_table(&mut self.out, &headers, rows)
    }

    pub fn resource_info(&mut self, resource: &Resource) -> anyhow::Result<()> {
        writeln!(self.out, "{} [{}]", resource.title, resource.category)?;
        writeln!(self.out, "{}", resource.description)?;
        writeln!(self.out)?;
        write!(self.out, "{}", resource.content)?;
        Ok(())
    }

    pub fn dashboard(
        &mut self,
        user: Option<&User>,
        summary: &DashboardSummary,
        unread: usize,
    ) -> anyhow::Result<()> {
        let name = user.map_or("Neighbor", |u| u.first_name());
        writeln!(self.out, "Welcome back, {name}!")?;
        writeln!(
            self.out,
            "Reports {}  Resolved {}  In progress {}  Points {}  Unread {}",
            summary.total_reports, summary.resolved, summary.in_progress, summary.points, unread
        )?;

        writeln!(self.out)?;
        writeln!(self.out, "Nearby issues")?;
        if summary.nearby_issues.is_empty() {
            writeln!(self.out, "  Nothing open nearby.")?;
        } else {
            self.issue_table(&summary.nearby_issues)?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "Upcoming events")?;
        if summary.upcoming_events.is_empty() {
            writeln!(self.out, "  No upcoming events.")?;
        } else {
            let user_id = user.map(|u| u.id.as_str());
            self.event_table(&summary.upcoming_events, user_id)?;
        }
        Ok(())
    }

    fn paint_status(&self, status: IssueStatus) -> String {
        let code = match status {
            IssueStatus::Reported => "37",
            IssueStatus::Acknowledged => "34",
            IssueStatus::InProgress => "33",
            IssueStatus::Resolved => "32",
        };
        self.paint(status.label(), code)
    }

    fn paint_priority(&self, priority: IssuePriority) -> String {
        let code = match priority {
            IssuePriority::Low => "34",
            IssuePriority::Medium => "33",
            IssuePriority::High => "31",
        };
        self.paint(priority.label(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn color_setting(cfg: &Config) -> anyhow::Result<bool> {
    let color = cfg
        .get_bool("color")
        .map_err(|err| anyhow!("invalid color setting: {err}"))?;
    Ok(color.unwrap_or(true))
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| UnicodeWidthStr::width(*h))
        .collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, &width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for &width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
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
