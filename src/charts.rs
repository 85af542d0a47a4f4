//! Numbers behind the analysis screen: percentile radars, comparison bars and
//! leaderboards. Rendering lives in the TUI; everything here is plain data.

use crate::dataset::Population;
use crate::error::Result;
use crate::player::{PlayerId, PlayerRecord, Position};

pub const RADAR_FORWARD: &[&str] = &["Gls", "Ast", "xG", "xAG", "Sh", "SoT", "PrgC", "PrgR"];
pub const RADAR_MIDFIELDER: &[&str] = &["Gls", "Ast", "xG", "xAG", "PrgP", "Tkl", "Int", "PrgC"];
pub const RADAR_DEFENDER: &[&str] = &["Tkl", "TklW", "Int", "Clr", "PrgP", "PrgC", "Ast", "Touches"];
pub const RADAR_ALL: &[&str] = &["Gls", "Ast", "xG", "Tkl", "Int", "PrgC", "PrgP", "Touches"];

/// Stats on the side-by-side comparison radar.
pub const COMPARE_RADAR: &[&str] = &["Gls", "Ast", "xG", "xAG", "PrgC", "PrgP", "Tkl", "Int"];
pub const BAR_STATS: &[&str] = &["Gls", "Ast", "G+A", "xG", "xAG", "Sh", "SoT"];
pub const TABLE_STATS: &[&str] = &[
    "Gls", "Ast", "G+A", "xG", "xAG", "Sh", "SoT", "PrgC", "PrgP", "Tkl", "Int", "Min",
];

pub fn radar_fields(pos: Position) -> &'static [&'static str] {
    match pos {
        Position::Forward => RADAR_FORWARD,
        Position::Midfielder => RADAR_MIDFIELDER,
        Position::Defender => RADAR_DEFENDER,
        Position::Goalkeeper | Position::Unknown => RADAR_ALL,
    }
}

pub fn stat_label(code: &str) -> &str {
    match code {
        "Gls" => "Goals",
        "Ast" => "Assists",
        "G+A" => "Goals + Assists",
        "xG" => "Expected Goals",
        "xAG" => "Expected Assists",
        "Sh" => "Shots",
        "SoT" => "Shots on Target",
        "PrgC" => "Progressive Carries",
        "PrgP" => "Progressive Passes",
        "PrgR" => "Progressive Receives",
        "Tkl" => "Tackles",
        "TklW" => "Tackles Won",
        "Int" => "Interceptions",
        "Clr" => "Clearances",
        "Touches" => "Touches",
        "Min" => "Minutes",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatPoint {
    pub field: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub id: PlayerId,
    pub name: String,
    pub squad: String,
    pub value: f64,
}

/// Share of the comparison group at or below the player's value, as 0..=100.
/// Fields missing from the dataset are skipped.
pub fn percentile_ranks(
    population: &Population,
    id: PlayerId,
    fields: &[&str],
    position: Option<Position>,
) -> Result<Vec<StatPoint>> {
    let player = population.get(id)?;
    let group: Vec<&PlayerRecord> = population
        .players()
        .iter()
        .filter(|p| position.is_none_or(|pos| p.main_position == pos))
        .collect();

    Ok(fields
        .iter()
        .filter(|f| population.has_column(f))
        .map(|field| {
            let value = player.stat_or_zero(field);
            let pct = if group.is_empty() {
                0.0
            } else {
                let at_or_below = group
                    .iter()
                    .filter(|p| p.stat_or_zero(field) <= value)
                    .count();
                at_or_below as f64 / group.len() as f64 * 100.0
            };
            StatPoint {
                field: field.to_string(),
                value: pct,
            }
        })
        .collect())
}

/// Value as a percentage of the column maximum; 0 when the maximum is not
/// positive.
pub fn max_scaled(population: &Population, id: PlayerId, fields: &[&str]) -> Result<Vec<StatPoint>> {
    let player = population.get(id)?;
    Ok(fields
        .iter()
        .map(|field| {
            let max = population
                .players()
                .iter()
                .filter_map(|p| p.stat(field))
                .fold(f64::NEG_INFINITY, f64::max);
            let value = if max > 0.0 {
                player.stat_or_zero(field) / max * 100.0
            } else {
                0.0
            };
            StatPoint {
                field: field.to_string(),
                value,
            }
        })
        .collect())
}

pub fn stat_values(population: &Population, id: PlayerId, fields: &[&str]) -> Result<Vec<StatPoint>> {
    let player = population.get(id)?;
    Ok(fields
        .iter()
        .map(|field| StatPoint {
            field: field.to_string(),
            value: player.stat_or_zero(field),
        })
        .collect())
}

pub fn top_players(
    population: &Population,
    field: &str,
    n: usize,
    position: Option<Position>,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<LeaderboardEntry> = population
        .players()
        .iter()
        .filter(|p| position.is_none_or(|pos| p.main_position == pos))
        .filter_map(|p| {
            p.stat(field).map(|value| LeaderboardEntry {
                id: p.id,
                name: p.name.clone(),
                squad: p.squad.clone(),
                value,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    rows.truncate(n);
    rows
}

/// Most common values of a text column, most frequent first.
pub fn value_counts(population: &Population, column: &str, top_n: usize) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = population.value_counts(column).into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.truncate(top_n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::COL_POS_MAIN;

    fn sample() -> Population {
        let rows = [
            (1, "FW", "Arsenal", 10.0),
            (2, "FW", "Chelsea", 20.0),
            (3, "DF", "Arsenal", 2.0),
            (4, "MF", "Arsenal", 5.0),
        ];
        let players = rows
            .iter()
            .map(|(id, pos, squad, gls)| {
                PlayerRecord::new(PlayerId(*id), format!("P{id}"), *pos, *squad, "Premier League")
                    .with_stat("Gls", *gls)
            })
            .collect();
        Population::from_records(vec!["Gls".into()], players).unwrap()
    }

    #[test]
    fn percentile_of_maximum_is_hundred() {
        let pop = sample();
        let all = percentile_ranks(&pop, PlayerId(2), &["Gls"], None).unwrap();
        assert_eq!(all[0].value, 100.0);
        let fw = percentile_ranks(&pop, PlayerId(1), &["Gls"], Some(Position::Forward)).unwrap();
        assert_eq!(fw[0].value, 50.0);
    }

    #[test]
    fn percentile_skips_unknown_fields() {
        let pop = sample();
        let out = percentile_ranks(&pop, PlayerId(1), &["Gls", "Nope"], None).unwrap();
        assert_eq!(out.len(), 1);
        assert!(percentile_ranks(&pop, PlayerId(9), &["Gls"], None).is_err());
    }

    #[test]
    fn max_scaled_uses_column_max() {
        let pop = sample();
        let out = max_scaled(&pop, PlayerId(1), &["Gls", "Nope"]).unwrap();
        assert_eq!(out[0].value, 50.0);
        assert_eq!(out[1].value, 0.0);
    }

    #[test]
    fn leaderboard_and_counts() {
        let pop = sample();
        let top = top_players(&pop, "Gls", 2, None);
        assert_eq!(top.iter().map(|e| e.id.0).collect::<Vec<_>>(), vec![2, 1]);
        let fw = top_players(&pop, "Gls", 5, Some(Position::Defender));
        assert_eq!(fw.len(), 1);

        let squads = value_counts(&pop, "Squad", 5);
        assert_eq!(squads[0], ("Arsenal".to_string(), 3));
        let pos = value_counts(&pop, COL_POS_MAIN, 1);
        assert_eq!(pos, vec![("FW".to_string(), 2)]);
    }
}
