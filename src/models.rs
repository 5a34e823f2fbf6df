use serde::{Deserialize, Serialize};

/// One combat fact: the named player on the other side of an event,
/// the guild they fought under, and when it happened (HH:MM:SS).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KillEvent {
    pub player_name: String,
    pub guild_name: String,
    pub timestamp: String,
}

/// A kill streak bounded by deaths: the kills scored since the previous
/// death (or log start), and the death that ended it. A life with no
/// `death` means the player survived to the end of the log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Life {
    pub kills: Vec<KillEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death: Option<KillEvent>,
}

/// Kill/death count against a single opposing player or guild.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KillStat {
    pub name: String,
    pub count: u32,
}

/// Kill/death count attributed to a single opposing guild.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuildTally {
    pub guild_name: String,
    pub count: u32,
}

/// Aggregated stats for one player across the whole log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    pub name: String,
    /// 1-based position in the points ranking; 0 until ranked.
    pub rank: u32,
    /// Last guild this player was seen fighting under, in log order.
    pub guild_name: String,
    /// Character class from the roster lookup, purely decorative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub total_points: i64,
    pub total_kills: u32,
    pub total_deaths: u32,
    pub total_kills_each_guild: Vec<GuildTally>,
    pub total_deaths_each_guild: Vec<GuildTally>,
    pub lives: Vec<Life>,
    pub kills: Vec<KillStat>,
    pub killed_by: Vec<KillStat>,
}

/// Aggregated stats for one guild across the whole log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuildStat {
    pub name: String,
    pub rank: u32,
    /// Distinct players ever seen fighting for this guild.
    pub player_count: u32,
    pub total_points_from_kills: i64,
    /// `player_count * 10 - total_deaths`; negative when deaths exceed
    /// the nominal life pool, deliberately not clamped.
    pub total_extra_life_points: i64,
    pub total_points: i64,
    pub total_kills: u32,
    pub total_deaths: u32,
    pub kills: Vec<KillStat>,
    pub killed_by: Vec<KillStat>,
}

/// The parsed output for one siege log: ranked players and guilds.
/// Fully self-contained; callers persist or display it verbatim.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BattleReport {
    pub player_results: Vec<PlayerStat>,
    pub guild_results: Vec<GuildStat>,
}

/// One persisted log entry as stored on disk and returned by the API.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoredLog {
    pub id: String,
    /// Calendar date of the siege (YYYY-MM-DD), supplied at upload time.
    pub log_date: String,
    pub server_name: String,
    pub parsed_data: BattleReport,
}

/// Listing info for a saved log (no parsed payload).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoredLogInfo {
    pub id: String,
    pub log_date: String,
    pub server_name: String,
}

/// Per-server log counts for the unfiltered listing.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroup {
    pub name: String,
    pub count: u32,
}
