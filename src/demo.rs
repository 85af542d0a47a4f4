//! Seeded synthetic population for offline runs and benchmarks.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::dataset::{
    COL_AGE, COL_COMP, COL_NATION, COL_PLAYER, COL_POS, COL_RANK, COL_SQUAD, Population,
};
use crate::error::{Result, ScoutError};
use crate::features::{
    COMMON_FEATURES, DEFENDER_FEATURES, FORWARD_FEATURES, GOALKEEPER_FEATURES, MIDFIELDER_FEATURES,
};
use crate::player::{PlayerId, PlayerRecord};

const LEAGUES: &[(&str, &[&str])] = &[
    ("eng Premier League", &["Arsenal", "Liverpool", "Chelsea", "Brighton"]),
    ("es La Liga", &["Barcelona", "Real Madrid", "Sevilla", "Girona"]),
    ("it Serie A", &["Inter", "Milan", "Napoli", "Roma"]),
    ("de Bundesliga", &["Bayern Munich", "Leverkusen", "Dortmund", "Stuttgart"]),
    ("fr Ligue 1", &["Paris S-G", "Marseille", "Monaco", "Lille"]),
];

const NATIONS: &[&str] = &["eng ENG", "es ESP", "it ITA", "de GER", "fr FRA", "br BRA", "ar ARG", "pt POR"];
const FIRST: &[&str] = &["Luca", "Marco", "Joao", "Kai", "Theo", "Mason", "Pedro", "Leon", "Nico", "Rafa"];
const LAST: &[&str] = &["Silva", "Rossi", "Muller", "Garcia", "Martin", "Smith", "Costa", "Weber", "Ferrari", "Lopez"];

/// Position code with its share of the squad.
const POSITIONS: &[(&str, f64)] = &[("GK", 0.1), ("DF", 0.35), ("MF", 0.33), ("FW", 0.22)];

/// Every stat column any feature set can ask for.
pub fn stat_columns() -> Vec<String> {
    let all: BTreeSet<&str> = COMMON_FEATURES
        .iter()
        .chain(FORWARD_FEATURES)
        .chain(MIDFIELDER_FEATURES)
        .chain(DEFENDER_FEATURES)
        .chain(GOALKEEPER_FEATURES)
        .copied()
        .chain(["Min", "Clr", "Sh", "SoT"])
        .collect();
    all.into_iter().map(str::to_string).collect()
}

pub fn demo_population(size: usize, seed: u64) -> Result<Population> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns: Vec<String> = [COL_RANK, COL_PLAYER, COL_NATION, COL_POS, COL_SQUAD, COL_COMP, COL_AGE]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let stats = stat_columns();
    columns.extend(stats.iter().cloned());

    let players = (0..size)
        .map(|i| demo_player(&mut rng, PlayerId(i as u32 + 1), &stats))
        .collect();
    Population::from_records(columns, players)
}

/// Loads `path`, or a seeded demo population when the file does not exist.
/// The flag is true for the demo. A file that exists but fails to parse is an
/// error, never replaced.
pub fn load_or_demo(path: &Path, size: usize, seed: u64) -> Result<(Population, bool)> {
    match Population::load(path) {
        Ok(population) => Ok((population, false)),
        Err(ScoutError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), size, "dataset not found, using demo population");
            Ok((demo_population(size, seed)?, true))
        }
        Err(err) => Err(err),
    }
}

fn demo_player(rng: &mut StdRng, id: PlayerId, stats: &[String]) -> PlayerRecord {
    let (comp, squads) = LEAGUES[rng.gen_range(0..LEAGUES.len())];
    let squad = squads[rng.gen_range(0..squads.len())];
    let pos = pick_position(rng);
    let name = format!(
        "{} {} {}",
        FIRST[rng.gen_range(0..FIRST.len())],
        LAST[rng.gen_range(0..LAST.len())],
        id.0
    );
    let nineties: f64 = rng.gen_range(2.0..38.0);
    let minutes = (nineties * 90.0).round();

    let mut player = PlayerRecord::new(id, name, pos, squad, comp)
        .with_nation(NATIONS[rng.gen_range(0..NATIONS.len())])
        .with_age(Some(rng.gen_range(17..37)));
    for field in stats {
        let per90 = per90_profile(pos, field) * rng.gen_range(0.4..1.6);
        let value = match field.as_str() {
            "90s" => (nineties * 10.0).round() / 10.0,
            "Min" => minutes,
            "MP" => (nineties * rng.gen_range(1.0..1.3)).round(),
            "Starts" => (nineties * rng.gen_range(0.7..1.0)).round(),
            _ => (per90 * nineties * 10.0).round() / 10.0,
        };
        player = player.with_stat(field.clone(), value);
    }
    let goals = player.stat_or_zero("Gls");
    let assists = player.stat_or_zero("Ast");
    player.with_stat("G+A", goals + assists)
}

fn pick_position(rng: &mut StdRng) -> &'static str {
    let roll: f64 = rng.gen_range(0.0..1.0);
    let mut acc = 0.0;
    for &(code, share) in POSITIONS {
        acc += share;
        if roll < acc {
            return code;
        }
    }
    "MF"
}

/// Rough per-90 baseline by position, enough for clusters to form.
fn per90_profile(pos: &str, field: &str) -> f64 {
    let attack = matches!(field, "Gls" | "xG" | "npxG" | "G-PK" | "Sh" | "SoT" | "Sh/90" | "SoT/90" | "PrgR");
    let create = matches!(field, "Ast" | "xAG" | "KP" | "PPA" | "CrsPA" | "1/3" | "PrgP");
    let defend = matches!(field, "Tkl" | "TklW" | "Int" | "Clr" | "Def 3rd" | "Mid 3rd" | "Err");
    let volume = matches!(field, "Cmp" | "Att" | "Touches" | "Carries" | "TotDist" | "PrgDist" | "PrgC");
    let base = match (pos, attack, create, defend, volume) {
        ("FW", true, ..) => 2.0,
        ("FW", _, true, ..) => 1.2,
        ("FW", _, _, true, _) => 0.4,
        ("MF", true, ..) => 0.6,
        ("MF", _, true, ..) => 2.0,
        ("MF", _, _, true, _) => 1.5,
        ("DF", true, ..) => 0.15,
        ("DF", _, true, ..) => 0.7,
        ("DF", _, _, true, _) => 2.5,
        ("GK", _, _, _, true) => 1.0,
        ("GK", ..) => 0.02,
        (_, _, _, _, true) => 3.0,
        _ => 0.3,
    };
    match field {
        "Touches" | "Cmp" | "Att" | "TotDist" | "PrgDist" => base * 20.0,
        "G-xG" => 0.05,
        _ => base,
    }
}
