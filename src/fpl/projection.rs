use std::collections::HashMap;

use super::models::{Bootstrap, Element, LeaderboardItem, StatKind};

/// Maximum rows in a leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// FPL `element_type` for goalkeepers.
const GOALKEEPER: u32 = 1;

/// Relay paths for the two headshot resolutions.
const FACE_LARGE: &str = "/img/players/250x250";
const FACE_SMALL: &str = "/img/players/110x140";

/// Build the top-10 leaderboard for `kind` from a bootstrap document.
///
/// Records with a zero value, an unknown team or no name are dropped. Ties
/// keep their order from the document.
pub fn project(payload: &Bootstrap, kind: StatKind) -> Vec<LeaderboardItem> {
    let teams: HashMap<u32, &str> = payload
        .teams
        .iter()
        .map(|t| (t.id, t.name.as_str()))
        .collect();

    let mut items: Vec<LeaderboardItem> = payload
        .elements
        .iter()
        .filter(|p| kind != StatKind::Cleansheets || p.element_type == Some(GOALKEEPER))
        .filter_map(|p| {
            let value = stat_value(p, kind);
            let team = p
                .team
                .and_then(|id| teams.get(&id))
                .copied()
                .unwrap_or_default();
            let name = display_name(p);
            if value == 0 || team.is_empty() || name.is_empty() {
                return None;
            }
            let avatar_ref = photo_code(p);
            Some(LeaderboardItem {
                name,
                team: team.to_string(),
                value,
                face: face_url(FACE_LARGE, &avatar_ref),
                face_small: face_url(FACE_SMALL, &avatar_ref),
                avatar_ref,
            })
        })
        .collect();

    // sort_by is stable, so equal values keep document order
    items.sort_by(|a, b| b.value.cmp(&a.value));
    items.truncate(LEADERBOARD_SIZE);
    items
}

fn stat_value(p: &Element, kind: StatKind) -> u32 {
    match kind {
        StatKind::Scorers => p.goals_scored,
        StatKind::Assists => p.assists,
        StatKind::Cleansheets => p.clean_sheets,
    }
    .unwrap_or(0)
}

fn display_name(p: &Element) -> String {
    if let Some(web) = p.web_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return web.to_string();
    }
    format!(
        "{} {}",
        p.first_name.as_deref().unwrap_or(""),
        p.second_name.as_deref().unwrap_or("")
    )
    .trim()
    .to_string()
}

/// "223340.jpg" → "p223340"
fn photo_code(p: &Element) -> String {
    let code = p
        .photo
        .as_deref()
        .and_then(|s| s.split('.').next())
        .map(str::trim)
        .unwrap_or("");
    if code.is_empty() {
        String::new()
    } else {
        format!("p{}", code)
    }
}

fn face_url(base: &str, avatar_ref: &str) -> String {
    if avatar_ref.is_empty() {
        String::new()
    } else {
        format!("{}/{}.png", base, avatar_ref)
    }
}
