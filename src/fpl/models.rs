use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::StatsError;

/// Which leaderboard to build from the fantasy bootstrap document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Scorers,
    Assists,
    Cleansheets,
}

impl StatKind {
    pub const ALL: [StatKind; 3] = [StatKind::Scorers, StatKind::Assists, StatKind::Cleansheets];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Scorers => "scorers",
            StatKind::Assists => "assists",
            StatKind::Cleansheets => "cleansheets",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        StatKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| StatsError::InvalidResourceKind(s.to_string()))
    }
}

/// The FPL `bootstrap-static` document, reduced to the fields the
/// leaderboards read. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub teams: Vec<Team>,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// A player record. Counters may be missing, null, or numeric strings upstream;
/// anything unreadable reads as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub web_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub second_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub team: Option<u32>,
    /// 1 = goalkeeper, 2 = defender, 3 = midfielder, 4 = forward
    #[serde(default, deserialize_with = "lenient_u32")]
    pub element_type: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub goals_scored: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub assists: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub clean_sheets: Option<u32>,
    /// e.g. "223340.jpg"
    #[serde(default)]
    pub photo: Option<String>,
}

/// Accepts a number, a numeric string, or null. Anything else reads as `None`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One row of a leaderboard as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardItem {
    pub name: String,
    pub team: String,
    pub value: u32,
    /// Photo code, e.g. "p223340"; empty when the record has no photo
    pub avatar_ref: String,
    /// Large headshot via the image relay
    pub face: String,
    /// Small headshot via the image relay
    pub face_small: String,
}
