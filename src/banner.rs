//! Startup banner and member table display.

use std::net::SocketAddr;

use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_number};
use crate::domain::UserProfile;

/// Server configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub addr: SocketAddr,
    pub backend: &'a str,
    pub store: &'a str,
    pub retention: &'a str,
}

/// Print the startup banner with server info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║         G U I L D B O A R D           ║
   ║    quests pinned, quests completed    ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   listen    http://{}
   backend   {}
   store     {}
   archive   {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.addr,
        info.backend,
        info.store,
        info.retention,
    );
}

/// Render members as an aligned table, one per line.
pub fn member_table(members: &[UserProfile]) -> String {
    let width = members
        .iter()
        .map(|m| m.display_name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "{:<36}  {:<width$}  {:<6}  {:<8}  {:>8}\n",
        "id", "name", "role", "status", "xp"
    );
    for m in members {
        out.push_str(&format!(
            "{:<36}  {:<width$}  {:<6}  {:<8}  {:>8}\n",
            m.id,
            m.display_name,
            m.role.as_str(),
            m.membership_status.as_str(),
            format_number(m.total_xp),
        ));
    }
    out
}
