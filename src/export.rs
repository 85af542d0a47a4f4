use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::charts::TABLE_STATS;
use crate::dataset::Population;
use crate::player::{PlayerId, PlayerRecord};
use crate::similarity::{SimilarPlayer, SimilarityIndex};

pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
    pub errors: Vec<String>,
}

pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// One target with its ranked neighbours, as produced by the batch exporter.
pub struct BatchEntry {
    pub target: PlayerId,
    pub similar: Vec<SimilarPlayer>,
}

pub fn export_recommendations(
    path: &Path,
    index: &SimilarityIndex,
    target: PlayerId,
    similar: &[SimilarPlayer],
) -> Result<ExportReport> {
    let population = index.population();
    let player = population.get(target)?;

    let target_rows = vec![profile_header(), profile_row(player, None)];
    let rec_rows = recommendation_rows(population, similar);
    let feature_rows = feature_rows(index);

    let mut workbook = Workbook::new();
    add_sheet(&mut workbook, "Target", &target_rows)?;
    add_sheet(&mut workbook, "Recommendations", &rec_rows)?;
    add_sheet(&mut workbook, "Features", &feature_rows)?;
    save(&mut workbook, path)?;

    Ok(ExportReport {
        sheets: 3,
        rows: rec_rows.len().saturating_sub(1),
        errors: Vec::new(),
    })
}

pub fn export_comparison(
    path: &Path,
    index: &SimilarityIndex,
    players: &[PlayerId],
) -> Result<ExportReport> {
    let population = index.population();
    let records = players
        .iter()
        .map(|id| population.get(*id))
        .collect::<crate::error::Result<Vec<_>>>()?;

    let stat_rows = comparison_rows(&records);
    let mut matrix = vec![
        std::iter::once(String::new())
            .chain(records.iter().map(|p| p.name.clone()))
            .collect::<Vec<_>>(),
    ];
    let mut errors = Vec::new();
    for a in &records {
        let mut row = vec![a.name.clone()];
        for b in &records {
            match index.score_between(a.id, b.id) {
                Ok(score) => row.push(format!("{score:.4}")),
                Err(err) => {
                    errors.push(format!("{} vs {}: {err}", a.name, b.name));
                    row.push(String::new());
                }
            }
        }
        matrix.push(row);
    }

    let mut workbook = Workbook::new();
    add_sheet(&mut workbook, "Comparison", &stat_rows)?;
    add_sheet(&mut workbook, "Similarity", &matrix)?;
    save(&mut workbook, path)?;

    Ok(ExportReport {
        sheets: 2,
        rows: stat_rows.len().saturating_sub(1),
        errors,
    })
}

pub fn export_batch_with_progress(
    path: &Path,
    index: &SimilarityIndex,
    entries: &[BatchEntry],
    mut on_progress: impl FnMut(ExportProgress),
) -> Result<ExportReport> {
    let population = index.population();
    let total = entries.len();
    let mut rows = vec![vec![
        "Player ID".to_string(),
        "Player".to_string(),
        "Squad".to_string(),
        "Pos".to_string(),
        "Rank".to_string(),
        "Similar ID".to_string(),
        "Similar".to_string(),
        "Similar Squad".to_string(),
        "Similar Pos".to_string(),
        "Score".to_string(),
    ]];
    let mut errors = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        let Some(target) = population.try_get(entry.target) else {
            errors.push(format!("unknown player {}", entry.target));
            continue;
        };
        for rec in &entry.similar {
            let Some(other) = population.try_get(rec.id) else {
                errors.push(format!("unknown player {}", rec.id));
                continue;
            };
            rows.push(vec![
                target.id.0.to_string(),
                target.name.clone(),
                target.squad.clone(),
                target.position.clone(),
                rec.rank.to_string(),
                other.id.0.to_string(),
                other.name.clone(),
                other.squad.clone(),
                other.position.clone(),
                format!("{:.4}", rec.score),
            ]);
        }
        if (i + 1) % 100 == 0 || i + 1 == total {
            on_progress(ExportProgress {
                current: i + 1,
                total,
                message: format!("Collected {}", target.name),
            });
        }
    }

    let mut workbook = Workbook::new();
    add_sheet(&mut workbook, "Similar", &rows)?;
    add_sheet(&mut workbook, "Features", &feature_rows(index))?;
    save(&mut workbook, path)?;

    Ok(ExportReport {
        sheets: 2,
        rows: rows.len().saturating_sub(1),
        errors,
    })
}

fn profile_header() -> Vec<String> {
    let mut header: Vec<String> = ["Player ID", "Player", "Nation", "Pos", "Squad", "Comp", "Age"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(TABLE_STATS.iter().map(|s| s.to_string()));
    header
}

fn profile_row(player: &PlayerRecord, extra: Option<Vec<String>>) -> Vec<String> {
    let mut row = extra.unwrap_or_default();
    row.extend([
        player.id.0.to_string(),
        player.name.clone(),
        player.nation.clone(),
        player.position.clone(),
        player.squad.clone(),
        player.comp.clone(),
        opt_to_string(player.age),
    ]);
    row.extend(TABLE_STATS.iter().map(|f| opt_to_string(player.stat(f))));
    row
}

pub fn recommendation_rows(population: &Population, similar: &[SimilarPlayer]) -> Vec<Vec<String>> {
    let mut header = vec!["Rank".to_string(), "Similarity %".to_string()];
    header.extend(profile_header());
    let mut rows = vec![header];
    for rec in similar {
        if let Some(p) = population.try_get(rec.id) {
            rows.push(profile_row(
                p,
                Some(vec![rec.rank.to_string(), format!("{:.1}", rec.score * 100.0)]),
            ));
        }
    }
    rows
}

/// Stat per row, one column per player.
pub fn comparison_rows(players: &[&PlayerRecord]) -> Vec<Vec<String>> {
    let mut rows = vec![
        std::iter::once("Stat".to_string())
            .chain(players.iter().map(|p| p.name.clone()))
            .collect::<Vec<_>>(),
    ];
    for label in ["Squad", "Comp", "Pos"] {
        let mut row = vec![label.to_string()];
        row.extend(players.iter().map(|p| match label {
            "Squad" => p.squad.clone(),
            "Comp" => p.comp.clone(),
            _ => p.position.clone(),
        }));
        rows.push(row);
    }
    for field in TABLE_STATS {
        let mut row = vec![field.to_string()];
        row.extend(players.iter().map(|p| opt_to_string(p.stat(field))));
        rows.push(row);
    }
    rows
}

fn feature_rows(index: &SimilarityIndex) -> Vec<Vec<String>> {
    let matrix = index.matrix();
    let mut rows = vec![vec![
        "Field".to_string(),
        "Fill".to_string(),
        "Min".to_string(),
        "Max".to_string(),
        "Mean".to_string(),
        "Std".to_string(),
    ]];
    rows.extend(matrix.params().iter().map(|p| {
        vec![
            p.name.clone(),
            format!("{:.4}", p.fill),
            format!("{:.4}", p.min),
            format!("{:.4}", p.max),
            format!("{:.4}", p.mean),
            format!("{:.4}", p.std),
        ]
    }));
    rows.push(vec![
        "scaling".to_string(),
        matrix.scaling().label().to_string(),
    ]);
    rows.push(vec!["metric".to_string(), index.metric().label().to_string()]);
    rows
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn add_sheet(workbook: &mut Workbook, name: &str, rows: &[Vec<String>]) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    write_rows(sheet, rows)
}

fn save(workbook: &mut Workbook, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population() -> Population {
        let players = vec![
            PlayerRecord::new(PlayerId(1), "Alpha", "FW", "Arsenal", "Premier League")
                .with_stat("Gls", 12.0)
                .with_age(Some(24)),
            PlayerRecord::new(PlayerId(2), "Beta", "MF", "Milan", "Serie A").with_stat("Gls", 3.5),
        ];
        Population::from_records(vec!["Gls".into()], players).unwrap()
    }

    #[test]
    fn recommendation_rows_skip_unknown_ids() {
        let pop = population();
        let recs = [
            SimilarPlayer { rank: 1, id: PlayerId(2), score: 0.912 },
            SimilarPlayer { rank: 2, id: PlayerId(7), score: 0.5 },
        ];
        let rows = recommendation_rows(&pop, &recs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "1");
        assert_eq!(rows[1][1], "91.2");
        assert_eq!(rows[1][3], "Beta");
        assert_eq!(rows[0].len(), rows[1].len());
    }

    #[test]
    fn comparison_rows_have_a_column_per_player() {
        let pop = population();
        let a = pop.get(PlayerId(1)).unwrap();
        let b = pop.get(PlayerId(2)).unwrap();
        let rows = comparison_rows(&[a, b]);
        assert_eq!(rows[0], vec!["Stat", "Alpha", "Beta"]);
        let gls = rows.iter().find(|r| r[0] == "Gls").unwrap();
        assert_eq!(gls[1], "12");
        assert_eq!(gls[2], "3.5");
        let min = rows.iter().find(|r| r[0] == "Min").unwrap();
        assert_eq!(min[1], "");
    }
}
