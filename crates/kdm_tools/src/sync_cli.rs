#![forbid(unsafe_code)]

use std::time::Instant;

use kdm_contracts::LanternYear;
use kdm_engines::roster::MoveOutcome;
use kdm_os::endeavor::{DepartingView, EndeavorView};
use kdm_os::roster::RosterView;
use kdm_os::timeline::TimelineView;
use kdm_os::{SessionContext, SurvivorLookup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    Summary,
    Timeline { year: Option<u32> },
    Survivor { id: String },
    SetYear { year: u32 },
    Tokens { delta: i64 },
    Depart { survivor_id: String },
    Quarry { name: String },
}

/// Runs one command against an initialized session and renders the result
/// as plain text.
pub fn execute_sync_command(
    session: &mut SessionContext,
    command: &SyncCommand,
) -> Result<String, String> {
    if session.document().is_none() {
        return Err(format!(
            "settlement {} could not be loaded",
            session.settlement_id()
        ));
    }
    match command {
        SyncCommand::Summary => Ok(render_summary(session)),
        SyncCommand::Timeline { year } => {
            let mut view = TimelineView::new();
            view.load_timeline(session);
            Ok(render_timeline(session, &view, *year))
        }
        SyncCommand::Survivor { id } => match session.load_survivor(id) {
            SurvivorLookup::Found(sheet) => {
                let mut out = format!("{} <{}>", sheet.name, sheet.email);
                for (key, value) in &sheet.attributes {
                    if value.is_number() {
                        out.push_str(&format!("\n  {key}: {value}"));
                    }
                }
                Ok(out)
            }
            SurvivorLookup::NotFound => Err(format!("survivor {id} not found")),
            SurvivorLookup::Unloaded => Err(format!("survivor {id} could not be loaded")),
        },
        SyncCommand::SetYear { year } => {
            TimelineView::set_lantern_year(session, LanternYear(*year));
            Ok(format!("LY {year}"))
        }
        SyncCommand::Tokens { delta } => {
            let mut tokens = None;
            let step = delta.signum();
            for _ in 0..delta.unsigned_abs() {
                tokens = if step > 0 {
                    EndeavorView::add_token(session)
                } else {
                    EndeavorView::rm_token(session)
                };
            }
            let current = tokens.or_else(|| session.document().map(|d| d.sheet.endeavor_tokens));
            Ok(format!("endeavor tokens: {}", current.unwrap_or(0)))
        }
        SyncCommand::Depart { survivor_id } => {
            let mut roster = RosterView::new(session);
            roster.init_cards(session, Instant::now());
            match RosterView::toggle_departing_status(session, survivor_id) {
                MoveOutcome::Moved | MoveOutcome::GroupNotFound => Ok(format!(
                    "departing survivors: {}",
                    RosterView::departing_group_len(session)
                )),
                MoveOutcome::SurvivorNotFound => {
                    Err(format!("survivor {survivor_id} not in any group"))
                }
            }
        }
        SyncCommand::Quarry { name } => {
            match DepartingView::save_current_quarry(session, name) {
                Some(_) => Ok(format!("quarry: {name}")),
                None => Ok(format!("quarry: {name} (not on timeline)")),
            }
        }
    }
}

fn render_summary(session: &SessionContext) -> String {
    let Some(doc) = session.document() else {
        return String::new();
    };
    let mut out = format!(
        "{} (LY {}, {} endeavor tokens)",
        doc.sheet.name, doc.sheet.lantern_year, doc.sheet.endeavor_tokens
    );
    for group in &doc.user_assets.survivor_groups {
        out.push_str(&format!("\n{} [{}]", group.name, group.survivors.len()));
        for entry in &group.survivors {
            let marker = if entry.meta.manageable { "*" } else { " " };
            out.push_str(&format!("\n  {marker} {} ({})", entry.sheet.name, entry.sheet.id));
        }
    }
    out
}

fn render_timeline(session: &SessionContext, view: &TimelineView, year: Option<u32>) -> String {
    let Some(doc) = session.document() else {
        return String::new();
    };
    let mut out = String::new();
    for entry in doc
        .sheet
        .timeline
        .iter()
        .filter(|y| year.map_or(true, |want| y.year.0 == want))
    {
        out.push_str(&format!("LY {}", entry.year));
        for (kind, events) in &entry.buckets {
            for event in events {
                out.push_str(&format!("\n  {kind}: {}", event.name));
            }
        }
        if let Some(lines) = TimelineView::event_log_for_year(session, i64::from(entry.year.0)) {
            for line in lines {
                out.push_str(&format!("\n  log: {}", line.event));
            }
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "{} story events, {} settlement events available",
        view.story_events().len(),
        view.settlement_events().len()
    ));
    out
}
