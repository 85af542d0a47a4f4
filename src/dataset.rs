use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, ScoutError};
use crate::player::{PlayerId, PlayerRecord, Position, parse_age, parse_number};

pub const COL_RANK: &str = "Rk";
pub const COL_PLAYER: &str = "Player";
pub const COL_NATION: &str = "Nation";
pub const COL_POS: &str = "Pos";
pub const COL_SQUAD: &str = "Squad";
pub const COL_COMP: &str = "Comp";
pub const COL_AGE: &str = "Age";
pub const COL_BORN: &str = "Born";
pub const COL_MINUTES: &str = "Min";
pub const COL_POS_MAIN: &str = "Pos_Main";

const REQUIRED_COLUMNS: &[&str] = &[COL_PLAYER, COL_POS, COL_SQUAD, COL_COMP];
const TEXT_COLUMNS: &[&str] = &[
    COL_RANK,
    COL_PLAYER,
    COL_NATION,
    COL_POS,
    COL_SQUAD,
    COL_COMP,
    COL_AGE,
    COL_BORN,
    COL_POS_MAIN,
    "Matches",
];

/// The full, ordered, read-only player table.
#[derive(Debug, Clone, Default)]
pub struct Population {
    players: Vec<PlayerRecord>,
    columns: Vec<String>,
    index: HashMap<PlayerId, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub position: Option<Position>,
    pub squad: Option<String>,
    pub competition: Option<String>,
    pub min_minutes: Option<f64>,
}

impl PlayerFilter {
    pub fn matches(&self, player: &PlayerRecord) -> bool {
        if let Some(pos) = self.position
            && player.main_position != pos
        {
            return false;
        }
        if let Some(squad) = self.squad.as_deref()
            && !contains_ci(&player.squad, squad)
        {
            return false;
        }
        if let Some(comp) = self.competition.as_deref()
            && !contains_ci(&player.comp, comp)
        {
            return false;
        }
        if let Some(min) = self.min_minutes
            && min > 0.0
        {
            return player.minutes().is_some_and(|m| m >= min);
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationSummary {
    pub players: usize,
    pub leagues: usize,
    pub teams: usize,
}

impl Population {
    /// Builds a population from already-parsed records. Ids must be unique.
    pub fn from_records(columns: Vec<String>, players: Vec<PlayerRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(players.len());
        for (idx, player) in players.iter().enumerate() {
            if index.insert(player.id, idx).is_some() {
                return Err(ScoutError::Data(format!(
                    "duplicate player id {} ({})",
                    player.id, player.name
                )));
            }
        }
        Ok(Self {
            players,
            columns,
            index,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let population = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            players = population.len(),
            columns = population.columns.len(),
            "loaded player dataset"
        );
        Ok(population)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ScoutError::Data("dataset has no header row".to_string()));
        }
        let columns = dedup_columns(headers.iter());

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.iter().any(|h| h == c))
            .collect();
        if !missing.is_empty() {
            return Err(ScoutError::Data(format!(
                "dataset is missing required columns: {}",
                missing.join(", ")
            )));
        }

        let col_idx = |name: &str| columns.iter().position(|c| c == name);
        let player_col = col_idx(COL_PLAYER);
        let pos_col = col_idx(COL_POS);
        let squad_col = col_idx(COL_SQUAD);
        let comp_col = col_idx(COL_COMP);
        let rank_col = col_idx(COL_RANK);
        let nation_col = col_idx(COL_NATION);
        let age_col = col_idx(COL_AGE);
        let born_col = col_idx(COL_BORN);
        let stat_cols: Vec<(usize, &str)> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !TEXT_COLUMNS.contains(&c.as_str()))
            .map(|(i, c)| (i, c.as_str()))
            .collect();

        let mut players = Vec::new();
        for (row_no, row) in rdr.records().enumerate() {
            let row = row?;
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

            let name = cell(player_col);
            // Scraped tables repeat the header every few dozen rows.
            if name == COL_PLAYER {
                continue;
            }
            if name.is_empty() {
                warn!(row = row_no + 2, "skipping row without a player name");
                continue;
            }

            let id = match rank_col {
                Some(_) => {
                    let raw = cell(rank_col);
                    let rank = parse_number(raw).filter(|v| *v >= 0.0 && v.fract() == 0.0);
                    let Some(rank) = rank else {
                        warn!(
                            row = row_no + 2,
                            player = name,
                            value = raw,
                            "skipping row with an invalid rank"
                        );
                        continue;
                    };
                    PlayerId(rank as u32)
                }
                None => PlayerId(players.len() as u32 + 1),
            };

            let mut record =
                PlayerRecord::new(id, name, cell(pos_col), cell(squad_col), cell(comp_col))
                    .with_nation(cell(nation_col))
                    .with_age(parse_age(cell(age_col)))
                    .with_born(parse_number(cell(born_col)).map(|v| v as u32));
            for (idx, col) in &stat_cols {
                if let Some(v) = row.get(*idx).and_then(parse_number) {
                    record = record.with_stat(*col, v);
                }
            }
            players.push(record);
        }

        Self::from_records(columns, players)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Dataset-order index of a player.
    pub fn position_of(&self, id: PlayerId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn try_get(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.position_of(id).map(|idx| &self.players[idx])
    }

    pub fn get(&self, id: PlayerId) -> Result<&PlayerRecord> {
        self.try_get(id)
            .ok_or_else(|| ScoutError::NotFound(format!("player {id}")))
    }

    /// Exact (case-insensitive) name wins; otherwise the first player whose
    /// name contains the query, in dataset order.
    pub fn find_by_name(&self, query: &str) -> Result<&PlayerRecord> {
        let q = query.trim();
        if q.is_empty() {
            return Err(ScoutError::NotFound("empty player name".to_string()));
        }
        let q_lower = q.to_lowercase();
        self.players
            .iter()
            .find(|p| p.name.to_lowercase() == q_lower)
            .or_else(|| self.players.iter().find(|p| contains_ci(&p.name, q)))
            .ok_or_else(|| ScoutError::NotFound(format!("player '{q}'")))
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<&PlayerRecord> {
        let q = query.trim();
        if q.is_empty() {
            return Vec::new();
        }
        self.players
            .iter()
            .filter(|p| contains_ci(&p.name, q))
            .take(limit)
            .collect()
    }

    /// A filtered copy. The result is its own population: any vectors built
    /// from it are scaled against it alone.
    pub fn filter(&self, filter: &PlayerFilter) -> Population {
        let players: Vec<PlayerRecord> = self
            .players
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        let index = players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        Population {
            players,
            columns: self.columns.clone(),
            index,
        }
    }

    pub fn unique_values(&self, column: &str) -> Vec<String> {
        let values: BTreeSet<String> = self
            .players
            .iter()
            .filter_map(|p| text_value(p, column))
            .filter(|v| !v.is_empty())
            .collect();
        values.into_iter().collect()
    }

    pub fn value_counts(&self, column: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for value in self.players.iter().filter_map(|p| text_value(p, column)) {
            if value.is_empty() {
                continue;
            }
            *counts.entry(value).or_insert(0usize) += 1;
        }
        counts
    }

    pub fn summary(&self) -> PopulationSummary {
        PopulationSummary {
            players: self.players.len(),
            leagues: self.unique_values(COL_COMP).len(),
            teams: self.unique_values(COL_SQUAD).len(),
        }
    }
}

fn text_value(player: &PlayerRecord, column: &str) -> Option<String> {
    match column {
        COL_PLAYER => Some(player.name.clone()),
        COL_SQUAD => Some(player.squad.clone()),
        COL_COMP => Some(player.comp.clone()),
        COL_POS => Some(player.position.clone()),
        COL_NATION => Some(player.nation.clone()),
        COL_POS_MAIN => Some(player.main_position.code().to_string()),
        _ => None,
    }
}

/// Repeated header names get a ".1", ".2" suffix so every column stays addressable.
fn dedup_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|h| {
            let h = h.trim().to_string();
            let n = seen.entry(h.clone()).or_insert(0);
            let name = if *n == 0 { h.clone() } else { format!("{h}.{n}") };
            *n += 1;
            name
        })
        .collect()
}

pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Rk,Player,Nation,Pos,Squad,Comp,Age,Born,Min,Gls,Ast,Gls
1,Kai Berg,de GER,\"FW,MF\",Alpha FC,eng Premier League,25-120,1999,\"2,100\",12,4,9
2,Player,Nation,Pos,Squad,Comp,Age,Born,Min,Gls,Ast,Gls
3,Luis Mora,es ESP,DF,Beta CF,es La Liga,31-002,1993,900,,1,0
";

    #[test]
    fn loads_rows_and_skips_repeated_headers() {
        let pop = Population::from_reader(CSV.as_bytes()).expect("csv should load");
        assert_eq!(pop.len(), 2);
        let kai = pop.get(PlayerId(1)).expect("rank 1 exists");
        assert_eq!(kai.main_position, Position::Forward);
        assert_eq!(kai.minutes(), Some(2100.0));
        assert_eq!(kai.age, Some(25));
        assert_eq!(kai.stat("Gls"), Some(12.0));
        assert_eq!(kai.stat("Gls.1"), Some(9.0));
        let luis = pop.get(PlayerId(3)).expect("rank 3 exists");
        assert!(luis.stat("Gls").is_none());
    }

    #[test]
    fn missing_identity_columns_is_data_error() {
        let raw = "Player,Pos,Gls\nA,FW,1\n";
        let err = Population::from_reader(raw.as_bytes()).unwrap_err();
        assert!(err.is_data());
        assert!(err.to_string().contains("Squad"));
    }

    #[test]
    fn duplicate_rank_is_data_error() {
        let raw = "Rk,Player,Pos,Squad,Comp\n1,A,FW,X,L\n1,B,DF,Y,L\n";
        let err = Population::from_reader(raw.as_bytes()).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn rows_with_bad_rank_are_skipped() {
        let raw = "Rk,Player,Pos,Squad,Comp\n1,A,FW,X,L\n,B,DF,Y,L\nx,C,MF,Z,L\n4,D,GK,W,L\n";
        let pop = Population::from_reader(raw.as_bytes()).unwrap();
        let names: Vec<&str> = pop.players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "D"]);
        assert_eq!(pop.get(PlayerId(4)).unwrap().name, "D");
    }

    #[test]
    fn row_numbers_are_ids_without_rank_column() {
        let raw = "Player,Pos,Squad,Comp\nA,FW,X,L\nB,DF,Y,L\n";
        let pop = Population::from_reader(raw.as_bytes()).unwrap();
        assert_eq!(pop.players()[1].id, PlayerId(2));
    }

    #[test]
    fn dedup_columns_suffixes_repeats() {
        let cols = dedup_columns(["Gls", "Ast", "Gls", "Gls"].into_iter());
        assert_eq!(cols, vec!["Gls", "Ast", "Gls.1", "Gls.2"]);
    }
}
