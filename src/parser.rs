use std::collections::{HashMap, HashSet};

use chrono::NaiveTime;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{opt, rest, verify};
use nom::sequence::delimited;
use nom::IResult;

use crate::models::*;

/// Nominal lives each guild member contributes to the extra-life pool.
const LIFE_POINTS_PER_MEMBER: i64 = 10;

/// Parse a raw siege log and aggregate it into ranked player and guild
/// statistics.
///
/// Pure and total: malformed entries are skipped rather than reported,
/// and the empty string yields an empty report. One entry is a
/// blank-line-delimited paragraph whose first line carries the kill
/// record and whose second line carries the `+N` point bonuses.
pub fn parse_siege_log(log: &str) -> BattleReport {
    let entries = split_entries(log);
    let mut session = ParseSession::default();

    // First pass: name discovery. Every player mentioned on either side
    // of an entry gets a zero-stat record, even when the other half of
    // that entry never matches and pass two skips it.
    for lines in &entries {
        if lines.len() < 2 {
            continue;
        }
        let stat_line = lines[0].trim();
        if let Ok((_, parsed)) = attacker(stat_line) {
            session.player(parsed.name);
        }
        if let Ok((_, parsed)) = defender(stat_line) {
            session.player(parsed.name);
        }
    }

    // Second pass: accumulation over fully-matched kill records.
    for lines in &entries {
        let record = match extract_kill_record(lines) {
            Some(r) => r,
            None => continue,
        };

        {
            let guild = session.guild(&record.attacker_guild);
            guild.total_points_from_kills += record.points;
            guild.total_kills += 1;
            bump_stat(&mut guild.kills, &record.defender_guild);
            guild.players.insert(record.attacker_name.clone());
        }
        {
            let guild = session.guild(&record.defender_guild);
            guild.total_deaths += 1;
            bump_stat(&mut guild.killed_by, &record.attacker_guild);
            guild.players.insert(record.defender_name.clone());
        }
        {
            // Guild affiliation is overwritten on every event: the last
            // guild a player fought under, in log order, wins.
            let player = session.player(&record.attacker_name);
            player.guild_name = record.attacker_guild.clone();
            player.total_points += record.points;
            player.total_kills += 1;
            player.events.push(RawEvent::Kill(KillEvent {
                player_name: record.defender_name.clone(),
                guild_name: record.defender_guild.clone(),
                timestamp: record.timestamp.clone(),
            }));
        }
        {
            let player = session.player(&record.defender_name);
            player.guild_name = record.defender_guild.clone();
            player.total_deaths += 1;
            player.events.push(RawEvent::Death(KillEvent {
                player_name: record.attacker_name.clone(),
                guild_name: record.attacker_guild.clone(),
                timestamp: record.timestamp.clone(),
            }));
        }
    }

    session.finish()
}

/// Tagged per-player event, consumed when lives and tallies are derived.
#[derive(Debug, Clone)]
enum RawEvent {
    Kill(KillEvent),
    Death(KillEvent),
}

impl RawEvent {
    fn data(&self) -> &KillEvent {
        match self {
            RawEvent::Kill(e) | RawEvent::Death(e) => e,
        }
    }
}

#[derive(Debug, Default)]
struct PlayerAccum {
    guild_name: String,
    total_points: i64,
    total_kills: u32,
    total_deaths: u32,
    events: Vec<RawEvent>,
}

#[derive(Debug, Default)]
struct GuildAccum {
    total_points_from_kills: i64,
    total_kills: u32,
    total_deaths: u32,
    kills: Vec<KillStat>,
    killed_by: Vec<KillStat>,
    players: HashSet<String>,
}

/// All accumulator state for one parse invocation. Insertion order is
/// tracked separately so output and tie-breaking stay deterministic.
#[derive(Debug, Default)]
struct ParseSession {
    players: HashMap<String, PlayerAccum>,
    player_order: Vec<String>,
    guilds: HashMap<String, GuildAccum>,
    guild_order: Vec<String>,
}

impl ParseSession {
    fn player(&mut self, name: &str) -> &mut PlayerAccum {
        if !self.players.contains_key(name) {
            self.player_order.push(name.to_string());
        }
        self.players.entry(name.to_string()).or_default()
    }

    fn guild(&mut self, name: &str) -> &mut GuildAccum {
        if !self.guilds.contains_key(name) {
            self.guild_order.push(name.to_string());
        }
        self.guilds.entry(name.to_string()).or_default()
    }

    fn finish(mut self) -> BattleReport {
        let mut player_results: Vec<PlayerStat> = Vec::with_capacity(self.player_order.len());
        for name in &self.player_order {
            let acc = match self.players.remove(name) {
                Some(a) => a,
                None => continue,
            };
            player_results.push(build_player_stat(name, acc));
        }
        player_results.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        for (index, player) in player_results.iter_mut().enumerate() {
            player.rank = index as u32 + 1;
        }

        let mut guild_results: Vec<GuildStat> = Vec::with_capacity(self.guild_order.len());
        for name in &self.guild_order {
            let acc = match self.guilds.remove(name) {
                Some(a) => a,
                None => continue,
            };
            let player_count = acc.players.len() as u32;
            let max_life_points = player_count as i64 * LIFE_POINTS_PER_MEMBER;
            // Unclamped: a guild that dies more than its life pool goes negative.
            let total_extra_life_points = max_life_points - acc.total_deaths as i64;
            guild_results.push(GuildStat {
                name: name.clone(),
                rank: 0,
                player_count,
                total_points_from_kills: acc.total_points_from_kills,
                total_extra_life_points,
                total_points: acc.total_points_from_kills + total_extra_life_points,
                total_kills: acc.total_kills,
                total_deaths: acc.total_deaths,
                kills: acc.kills,
                killed_by: acc.killed_by,
            });
        }
        guild_results.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        for (index, guild) in guild_results.iter_mut().enumerate() {
            guild.rank = index as u32 + 1;
        }

        BattleReport {
            player_results,
            guild_results,
        }
    }
}

/// Replay one player's events into final per-player stats: lives,
/// per-opponent and per-guild tallies.
fn build_player_stat(name: &str, mut acc: PlayerAccum) -> PlayerStat {
    // Events are re-sorted by time of day; block order in the source
    // text is not trusted. HH:MM:SS only, all within one sitting.
    acc.events
        .sort_by(|a, b| time_of_day(&a.data().timestamp).cmp(&time_of_day(&b.data().timestamp)));

    let mut lives: Vec<Life> = Vec::new();
    let mut current = Life {
        kills: Vec::new(),
        death: None,
    };
    let mut kills: Vec<KillStat> = Vec::new();
    let mut killed_by: Vec<KillStat> = Vec::new();
    let mut kills_each_guild: Vec<GuildTally> = Vec::new();
    let mut deaths_each_guild: Vec<GuildTally> = Vec::new();

    for event in &acc.events {
        match event {
            RawEvent::Kill(e) => {
                current.kills.push(e.clone());
                bump_stat(&mut kills, &e.player_name);
                bump_tally(&mut kills_each_guild, &e.guild_name);
            }
            RawEvent::Death(e) => {
                current.death = Some(e.clone());
                lives.push(std::mem::replace(
                    &mut current,
                    Life {
                        kills: Vec::new(),
                        death: None,
                    },
                ));
                bump_stat(&mut killed_by, &e.player_name);
                bump_tally(&mut deaths_each_guild, &e.guild_name);
            }
        }
    }
    // A trailing streak with kills but no death still counts as a life;
    // an empty trailing life is not emitted.
    if !current.kills.is_empty() {
        lives.push(current);
    }

    // Stable sorts keep first-occurrence order on equal counts.
    kills.sort_by(|a, b| b.count.cmp(&a.count));
    killed_by.sort_by(|a, b| b.count.cmp(&a.count));
    kills_each_guild.sort_by(|a, b| b.count.cmp(&a.count));
    deaths_each_guild.sort_by(|a, b| b.count.cmp(&a.count));

    PlayerStat {
        name: name.to_string(),
        rank: 0,
        guild_name: acc.guild_name,
        class: None,
        total_points: acc.total_points,
        total_kills: acc.total_kills,
        total_deaths: acc.total_deaths,
        total_kills_each_guild: kills_each_guild,
        total_deaths_each_guild: deaths_each_guild,
        lives,
        kills,
        killed_by,
    }
}

/// Fully extracted kill record from one 2+ line entry block.
#[derive(Debug)]
struct KillRecord {
    timestamp: String,
    attacker_guild: String,
    attacker_name: String,
    defender_guild: String,
    defender_name: String,
    points: i64,
}

struct AttackerPart<'a> {
    timestamp: &'a str,
    guild: &'a str,
    name: &'a str,
}

struct DefenderPart<'a> {
    guild: &'a str,
    name: &'a str,
}

/// Both the attacker and the defender pattern must match line one for
/// the block to count; one-sided matches are dropped so partial records
/// never corrupt the aggregates.
fn extract_kill_record(lines: &[&str]) -> Option<KillRecord> {
    if lines.len() < 2 {
        return None;
    }
    let stat_line = lines[0].trim();
    let (_, attack) = attacker(stat_line).ok()?;
    let (_, defense) = defender(stat_line).ok()?;
    Some(KillRecord {
        timestamp: attack.timestamp.trim().to_string(),
        attacker_guild: attack.guild.trim().to_string(),
        attacker_name: attack.name.to_string(),
        defender_guild: defense.guild.trim().to_string(),
        defender_name: defense.name.to_string(),
        points: sum_point_bonuses(lines[1]),
    })
}

fn bracketed(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_until("]"), char(']'))(input)
}

/// `[HH:MM:SS] [guild] name(...)` — the leading half of a kill line.
fn attacker(input: &str) -> IResult<&str, AttackerPart> {
    let (input, _) = multispace0(input)?;
    let (input, timestamp) = bracketed(input)?;
    let (input, _) = multispace1(input)?;
    let (input, guild) = bracketed(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = opt(tag("Guild Master"))(input)?;
    let (input, name) = verify(take_until("("), |s: &str| !s.trim().is_empty())(input)?;
    Ok((
        input,
        AttackerPart {
            timestamp,
            guild,
            name: name.trim(),
        },
    ))
}

/// `→ Attack [guild] (Guild Master |Defender )?name` — the trailing half.
fn defender(input: &str) -> IResult<&str, DefenderPart> {
    let (input, _) = take_until("→ Attack ")(input)?;
    let (input, _) = tag("→ Attack ")(input)?;
    let (input, guild) = bracketed(input)?;
    let (input, _) = char(' ')(input)?;
    let (input, _) = opt(alt((tag("Guild Master "), tag("Defender "))))(input)?;
    let (input, name) = verify(rest, |s: &str| !s.trim().is_empty())(input)?;
    Ok((
        input,
        DefenderPart {
            guild,
            name: name.trim(),
        },
    ))
}

/// Sum every `+<integer>` bonus token on the points line. Bonuses stack
/// (base kill, guild-vs-guild, streak), so all of them count.
fn sum_point_bonuses(line: &str) -> i64 {
    let mut total = 0i64;
    for chunk in line.split('+').skip(1) {
        let digits: &str = &chunk[..chunk
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(chunk.len())];
        if digits.is_empty() {
            continue;
        }
        if let Ok(value) = digits.parse::<i64>() {
            total += value;
        }
    }
    total
}

/// Split raw text into entry blocks on blank-line boundaries. Blocks
/// keep their source order; whitespace-only lines never join a block.
fn split_entries(log: &str) -> Vec<Vec<&str>> {
    let mut entries: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in log.trim().lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                entries.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        entries.push(current);
    }
    entries
}

fn time_of_day(timestamp: &str) -> NaiveTime {
    NaiveTime::parse_from_str(timestamp, "%H:%M:%S").unwrap_or(NaiveTime::MIN)
}

fn bump_stat(list: &mut Vec<KillStat>, name: &str) {
    match list.iter_mut().find(|s| s.name == name) {
        Some(existing) => existing.count += 1,
        None => list.push(KillStat {
            name: name.to_string(),
            count: 1,
        }),
    }
}

fn bump_tally(list: &mut Vec<GuildTally>, guild_name: &str) {
    match list.iter_mut().find(|s| s.guild_name == guild_name) {
        Some(existing) => existing.count += 1,
        None => list.push(GuildTally {
            guild_name: guild_name.to_string(),
            count: 1,
        }),
    }
}
