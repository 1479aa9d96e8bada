//! Player-list extraction from console output
//!
//! The server answers the `list` command with a line such as
//! `There are 2 of a max of 20 players online: Alice, Bob`. The scraper
//! finds the newest such line in recent output and pulls the counts and
//! names out of it.

use regex::Regex;
use std::sync::LazyLock;

/// Command that makes the server print the player-list header
pub(crate) const PLAYER_LIST_COMMAND: &str = "list";

static PLAYER_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"There are (\d+) of a max of (\d+) players online:?\s*(.*)")
        .expect("player list pattern is valid")
});

/// Counts and names pulled from one player-list line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPlayerList {
    /// Player count as reported by the header
    pub count: u32,
    /// Configured server capacity
    pub max_players: u32,
    /// Names listed after the header, possibly fewer than `count`
    pub online: Vec<String>,
}

/// Parse one line of console output; `None` when the line is not a
/// player-list header.
pub fn parse_player_line(line: &str) -> Option<ParsedPlayerList> {
    let caps = PLAYER_LIST.captures(line)?;
    let count = caps.get(1)?.as_str().parse().ok()?;
    let max_players = caps.get(2)?.as_str().parse().ok()?;
    let online = caps
        .get(3)
        .map(|m| m.as_str())
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    Some(ParsedPlayerList {
        count,
        max_players,
        online,
    })
}

/// Scan a block of recent output for the newest player-list line.
pub fn scan_output(output: &str) -> Option<ParsedPlayerList> {
    output.lines().rev().find_map(parse_player_line)
}
