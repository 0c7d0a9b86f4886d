//! Project-wide constants.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// XP credited for completing a quest, indexed by `difficulty - 1`.
pub const XP_BY_DIFFICULTY: [i64; 5] = [10, 20, 30, 40, 50];

/// Number of parchment textures a quest card can be drawn on.
pub const PARCHMENT_VARIANTS: u8 = 16;

/// Largest horizontal pin offset (pixels, either direction).
pub const MAX_PIN_OFFSET_PX: i8 = 5;

/// Days a DONE quest stays on the board before the archival sweep takes it.
pub const DEFAULT_ARCHIVE_AFTER_DAYS: i64 = 7;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

/// Default database path: `~/.guildboard/guild.db`.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".guildboard").join("guild.db"))
}

/// Format a number with comma separators (e.g. -1,234).
pub fn format_number(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3 + 1);
    if n < 0 {
        result.push('-');
    }
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
