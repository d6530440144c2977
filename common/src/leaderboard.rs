use log::warn;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ranking projection of an account's best score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: i32,
    pub nickname: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Score,
    Name,
}

impl SortKey {
    /// Parse the wire value. Anything other than `name` sorts by score.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "name" | "nickname" => SortKey::Name,
            _ => SortKey::Score,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Score => "score",
            SortKey::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Parse the wire value. Anything other than `asc` sorts descending.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Parse a combined selector such as `score_desc` or `name_asc`
pub fn parse_sort_selection(value: &str) -> (SortKey, SortOrder) {
    let (key, order) = value.split_once('_').unwrap_or((value, ""));
    (SortKey::parse(key), SortOrder::parse(order))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedLeaderboard {
    pub entries: Vec<LeaderboardEntry>,
    /// 1-based position of the requested user, if present
    pub position: Option<usize>,
}

impl RankedLeaderboard {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// "N of M" summary for the requested user
    pub fn position_label(&self) -> Option<String> {
        self.position
            .map(|position| format!("{} of {}", position, self.entries.len()))
    }
}

impl fmt::Display for RankedLeaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "No entries yet.");
        }
        for (idx, entry) in self.entries.iter().enumerate() {
            let marker = if self.position == Some(idx + 1) { " *" } else { "" };
            writeln!(f, "{:>3}. {:<24} {:>6}{}", idx + 1, entry.nickname, entry.score, marker)?;
        }
        if let Some(label) = self.position_label() {
            writeln!(f, "Your place: {}", label)?;
        }
        Ok(())
    }
}

fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry, sort_key: SortKey) -> Ordering {
    match sort_key {
        SortKey::Score => a.score.cmp(&b.score),
        SortKey::Name => a.nickname.to_lowercase().cmp(&b.nickname.to_lowercase()),
    }
}

/// Order entries by the chosen key. Equal keys keep their input order in
/// both directions. Pure: the input is not modified.
pub fn rank(
    entries: &[LeaderboardEntry],
    sort_key: SortKey,
    order: SortOrder,
    for_user_id: Option<i32>,
) -> RankedLeaderboard {
    let mut ordered = entries.to_vec();
    ordered.sort_by(|a, b| {
        let ordering = compare(a, b, sort_key);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    let position = for_user_id.and_then(|user_id| {
        ordered
            .iter()
            .position(|entry| entry.user_id == user_id)
            .map(|idx| idx + 1)
    });

    RankedLeaderboard {
        entries: ordered,
        position,
    }
}

/// Entries with a positive score, best first, at most `limit` of them
pub fn top_scores(entries: &[LeaderboardEntry], limit: usize) -> Vec<LeaderboardEntry> {
    let scored: Vec<LeaderboardEntry> = entries
        .iter()
        .filter(|entry| entry.score > 0)
        .cloned()
        .collect();
    let mut ranked = rank(&scored, SortKey::Score, SortOrder::Descending, None).entries;
    ranked.truncate(limit);
    ranked
}

/// Decode a leaderboard payload. Malformed input yields no entries.
pub fn parse_entries(payload: &str) -> Vec<LeaderboardEntry> {
    match serde_json::from_str::<Vec<LeaderboardEntry>>(payload) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring malformed leaderboard payload: {}", e);
            Vec::new()
        }
    }
}
