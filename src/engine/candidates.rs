// Market and weak-link candidate selection.

use std::collections::HashSet;

use crate::model::{Player, SquadMember};

/// Build the market pool of transfer targets: selectable players (available
/// or doubtful) at or above `min_form`, excluding ids in `exclude_ids`
/// (the current squad), stable-sorted descending by form and truncated to
/// `limit`. Stable sorting preserves first-seen order for equal forms.
pub fn select_market(
    all_players: &[Player],
    exclude_ids: &HashSet<u32>,
    min_form: f64,
    limit: usize,
) -> Vec<Player> {
    let mut market: Vec<Player> = all_players
        .iter()
        .filter(|p| {
            p.status.is_selectable() && p.form >= min_form && !exclude_ids.contains(&p.id)
        })
        .cloned()
        .collect();

    market.sort_by(|a, b| {
        b.form
            .partial_cmp(&a.form)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    market.truncate(limit);
    market
}

/// Squad members whose form has dropped below `threshold`, weakest first.
/// Stable sorting keeps squad order for equal forms.
pub fn select_weak_links(squad: &[SquadMember], threshold: f64) -> Vec<SquadMember> {
    let mut weak: Vec<SquadMember> = squad
        .iter()
        .filter(|m| m.player.form < threshold)
        .cloned()
        .collect();

    weak.sort_by(|a, b| {
        a.player
            .form
            .partial_cmp(&b.player.form)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    weak
}
