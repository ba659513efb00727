// Forward-looking fixture difficulty profiles and blank/double detection.

use std::collections::HashMap;

use crate::model::Fixture;

/// Number of clubs in the league; used to count blanking teams.
pub const LEAGUE_TEAMS: usize = 20;

/// Gameweek window used when ranking difficulty runs (current..=current+5).
pub const RANKING_WINDOW: u32 = 5;

/// Gameweek lookahead used for blank/double detection
/// (current..=current+10).
pub const DETECTION_LOOKAHEAD: u32 = 10;

/// An easy run means the first few fixtures are all at or below this FDR.
const EASY_RUN_MAX_DIFFICULTY: u8 = 2;

/// How many leading fixtures an easy run is judged on.
const EASY_RUN_SPAN: usize = 3;

// ---------------------------------------------------------------------------
// FixtureEntry / profiles
// ---------------------------------------------------------------------------

/// One upcoming fixture from a single team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureEntry {
    pub gameweek: u32,
    pub difficulty: u8,
    pub is_home: bool,
    pub opponent: u32,
}

/// Per-team forward-looking difficulty profiles.
///
/// Every fixture whose gameweek lies in `[from_gameweek, from_gameweek +
/// window]` contributes one entry to each participating team's sequence
/// (home side gets the home rating, away side the away rating). Sequences
/// are sorted by `(gameweek, opponent)` so the result does not depend on
/// the order of the input fixture list.
pub fn build_profiles(
    fixtures: &[Fixture],
    from_gameweek: u32,
    window: u32,
) -> HashMap<u32, Vec<FixtureEntry>> {
    let to_gameweek = from_gameweek.saturating_add(window);
    let mut profiles: HashMap<u32, Vec<FixtureEntry>> = HashMap::new();

    for fixture in fixtures {
        if fixture.gameweek < from_gameweek || fixture.gameweek > to_gameweek {
            continue;
        }
        profiles.entry(fixture.home_team).or_default().push(FixtureEntry {
            gameweek: fixture.gameweek,
            difficulty: fixture.home_difficulty,
            is_home: true,
            opponent: fixture.away_team,
        });
        profiles.entry(fixture.away_team).or_default().push(FixtureEntry {
            gameweek: fixture.gameweek,
            difficulty: fixture.away_difficulty,
            is_home: false,
            opponent: fixture.home_team,
        });
    }

    for entries in profiles.values_mut() {
        entries.sort_by_key(|e| (e.gameweek, e.opponent));
    }

    profiles
}

// ---------------------------------------------------------------------------
// Blank / double detection
// ---------------------------------------------------------------------------

/// A gameweek where at least one team plays twice or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialGameweek {
    pub gameweek: u32,
    /// Teams scheduled for two or more fixtures.
    pub teams_with_double: usize,
    /// Teams with no fixture at all (out of the 20-team league).
    pub teams_blank: usize,
}

/// Scan `[from_gameweek, from_gameweek + lookahead]` for blank and double
/// gameweeks. Only qualifying gameweeks are returned, in ascending order.
pub fn detect_special_gameweeks(
    fixtures: &[Fixture],
    from_gameweek: u32,
    lookahead: u32,
) -> Vec<SpecialGameweek> {
    let mut special = Vec::new();

    for gameweek in from_gameweek..=from_gameweek.saturating_add(lookahead) {
        let mut appearances: HashMap<u32, usize> = HashMap::new();
        for fixture in fixtures.iter().filter(|f| f.gameweek == gameweek) {
            *appearances.entry(fixture.home_team).or_default() += 1;
            *appearances.entry(fixture.away_team).or_default() += 1;
        }

        let teams_with_double = appearances.values().filter(|&&c| c >= 2).count();
        let teams_blank = LEAGUE_TEAMS.saturating_sub(appearances.len());

        if teams_with_double > 0 || teams_blank > 0 {
            special.push(SpecialGameweek {
                gameweek,
                teams_with_double,
                teams_blank,
            });
        }
    }

    special
}

// ---------------------------------------------------------------------------
// Difficulty runs
// ---------------------------------------------------------------------------

/// Rank teams by mean difficulty over their first `horizon` upcoming
/// fixtures, easiest run first. Teams with no upcoming fixtures are
/// omitted. Ties break on team id so output is deterministic.
pub fn rank_by_run(
    profiles: &HashMap<u32, Vec<FixtureEntry>>,
    horizon: usize,
) -> Vec<(u32, f64)> {
    let mut ranked: Vec<(u32, f64)> = profiles
        .iter()
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(&team, entries)| {
            let span = entries.len().min(horizon);
            let total: u32 = entries[..span].iter().map(|e| e.difficulty as u32).sum();
            (team, total as f64 / span as f64)
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}

/// Teams whose next few fixtures are all easy (FDR 2 or less over the
/// first up-to-three entries). Sorted by team id.
pub fn teams_with_easy_run(profiles: &HashMap<u32, Vec<FixtureEntry>>) -> Vec<u32> {
    let mut teams: Vec<u32> = profiles
        .iter()
        .filter(|(_, entries)| {
            !entries.is_empty()
                && entries
                    .iter()
                    .take(EASY_RUN_SPAN)
                    .all(|e| e.difficulty <= EASY_RUN_MAX_DIFFICULTY)
        })
        .map(|(&team, _)| team)
        .collect();
    teams.sort_unstable();
    teams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(gw: u32, home: u32, away: u32, home_fdr: u8, away_fdr: u8) -> Fixture {
        Fixture {
            gameweek: gw,
            home_team: home,
            away_team: away,
            home_difficulty: home_fdr,
            away_difficulty: away_fdr,
        }
    }

    /// A full round: teams 1..=20 paired off (1v2, 3v4, ...).
    fn full_round(gw: u32) -> Vec<Fixture> {
        (0..10)
            .map(|i| fixture(gw, 2 * i + 1, 2 * i + 2, 3, 3))
            .collect()
    }

    #[test]
    fn profiles_assign_each_side_its_own_rating() {
        let fixtures = vec![fixture(10, 1, 2, 2, 4)];
        let profiles = build_profiles(&fixtures, 10, 5);

        assert_eq!(
            profiles[&1],
            vec![FixtureEntry {
                gameweek: 10,
                difficulty: 2,
                is_home: true,
                opponent: 2,
            }]
        );
        assert_eq!(
            profiles[&2],
            vec![FixtureEntry {
                gameweek: 10,
                difficulty: 4,
                is_home: false,
                opponent: 1,
            }]
        );
    }

    #[test]
    fn profiles_exclude_fixtures_outside_window() {
        let fixtures = vec![
            fixture(9, 1, 2, 3, 3),  // before window
            fixture(10, 1, 3, 2, 2), // in window
            fixture(15, 1, 4, 5, 5), // in window (inclusive upper bound)
            fixture(16, 1, 5, 1, 1), // past window
        ];
        let profiles = build_profiles(&fixtures, 10, 5);

        let gameweeks: Vec<u32> = profiles[&1].iter().map(|e| e.gameweek).collect();
        assert_eq!(gameweeks, vec![10, 15]);
    }

    #[test]
    fn profiles_are_input_order_independent() {
        let mut fixtures = vec![
            fixture(12, 3, 7, 2, 3),
            fixture(10, 1, 3, 4, 2),
            fixture(11, 3, 5, 1, 5),
            fixture(10, 7, 3, 3, 3),
        ];
        let forward = build_profiles(&fixtures, 10, 5);
        fixtures.reverse();
        let reversed = build_profiles(&fixtures, 10, 5);

        assert_eq!(forward, reversed);
        // And the per-team sequence is gameweek-ordered.
        let gameweeks: Vec<u32> = forward[&3].iter().map(|e| e.gameweek).collect();
        assert_eq!(gameweeks, vec![10, 10, 11, 12]);
    }

    #[test]
    fn detects_blanks_when_teams_missing() {
        // Only 18 of 20 teams play: drop the 1v2 pairing.
        let fixtures: Vec<Fixture> = full_round(10)
            .into_iter()
            .filter(|f| f.home_team != 1)
            .collect();

        let special = detect_special_gameweeks(&fixtures, 10, 0);
        assert_eq!(special.len(), 1);
        assert_eq!(special[0].gameweek, 10);
        assert_eq!(special[0].teams_blank, 2);
        assert_eq!(special[0].teams_with_double, 0);
    }

    #[test]
    fn detects_doubles() {
        let mut fixtures = full_round(10);
        // Teams 1 and 2 play each other twice that week.
        fixtures.push(fixture(10, 2, 1, 3, 3));

        let special = detect_special_gameweeks(&fixtures, 10, 0);
        assert_eq!(special.len(), 1);
        assert_eq!(special[0].teams_with_double, 2);
        assert_eq!(special[0].teams_blank, 0);
    }

    #[test]
    fn ordinary_gameweeks_are_not_special() {
        let mut fixtures = full_round(10);
        fixtures.extend(full_round(11));
        let special = detect_special_gameweeks(&fixtures, 10, 1);
        assert!(special.is_empty());
    }

    #[test]
    fn special_gameweeks_cover_lookahead_in_order() {
        let mut fixtures = full_round(10);
        fixtures.extend(full_round(12).into_iter().filter(|f| f.home_team != 5));
        // Gameweek 11 has no fixtures at all: 20 blanks.
        let special = detect_special_gameweeks(&fixtures, 10, 2);

        assert_eq!(special.len(), 2);
        assert_eq!(special[0].gameweek, 11);
        assert_eq!(special[0].teams_blank, 20);
        assert_eq!(special[1].gameweek, 12);
        assert_eq!(special[1].teams_blank, 2);
    }

    #[test]
    fn rank_by_run_orders_easiest_first() {
        let fixtures = vec![
            fixture(10, 1, 2, 2, 5),
            fixture(11, 1, 3, 1, 4),
            fixture(10, 4, 5, 3, 3),
            fixture(11, 5, 4, 3, 3),
        ];
        let profiles = build_profiles(&fixtures, 10, 5);
        let ranked = rank_by_run(&profiles, 5);

        // Team 1 averages 1.5; teams 4 and 5 tie at 3.0; team 3 has 4.0;
        // team 2 has 5.0.
        assert_eq!(ranked[0].0, 1);
        assert!((ranked[0].1 - 1.5).abs() < f64::EPSILON);
        assert_eq!(ranked.last().unwrap().0, 2);
        // Tie between 4 and 5 breaks on team id.
        let mid: Vec<u32> = ranked[1..4].iter().map(|r| r.0).collect();
        assert_eq!(mid, vec![4, 5, 3]);
    }

    #[test]
    fn easy_run_requires_all_leading_fixtures_easy() {
        let fixtures = vec![
            // Team 1: 2, 2, 1 -> easy run.
            fixture(10, 1, 8, 2, 4),
            fixture(11, 1, 9, 2, 4),
            fixture(12, 1, 10, 1, 4),
            // Team 2: 2, 5 -> not easy.
            fixture(10, 2, 11, 2, 4),
            fixture(11, 2, 12, 5, 4),
        ];
        let profiles = build_profiles(&fixtures, 10, 5);
        let easy = teams_with_easy_run(&profiles);
        assert_eq!(easy, vec![1]);
    }
}
