use std::path::PathBuf;

use moneyball_scout::dataset::{COL_COMP, COL_POS_MAIN, COL_SQUAD, PlayerFilter, Population};
use moneyball_scout::demo::load_or_demo;
use moneyball_scout::player::{PlayerId, Position};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn load() -> Population {
    Population::load(&fixture_path("players_small.csv")).expect("fixture should load")
}

#[test]
fn loads_fixture_and_drops_repeated_header() {
    let pop = load();
    assert_eq!(pop.len(), 12);
    assert!(pop.has_column("PrgR"));
    assert!(pop.has_column("Def 3rd"));
    assert!(pop.players().iter().all(|p| p.name != "Player"));
}

#[test]
fn parses_identity_and_formatted_numbers() {
    let pop = load();
    let mbappe = pop.get(PlayerId(3)).expect("rank 3 exists");
    assert_eq!(mbappe.name, "Kylian Mbappé");
    assert_eq!(mbappe.position, "FW,MF");
    assert_eq!(mbappe.main_position, Position::Forward);
    assert_eq!(mbappe.comp, "es La Liga");
    assert_eq!(mbappe.minutes(), Some(2088.0));
    assert_eq!(mbappe.age, Some(25));
    assert_eq!(mbappe.born, Some(1998));
    assert_eq!(mbappe.nation_code(), "FRA");

    let alisson = pop.get(PlayerId(10)).expect("rank 10 exists");
    assert_eq!(alisson.main_position, Position::Goalkeeper);
    assert_eq!(alisson.stat("Gls"), Some(0.0));
}

#[test]
fn unknown_id_is_not_found() {
    let pop = load();
    let err = pop.get(PlayerId(999)).unwrap_err();
    assert!(err.is_not_found());
    assert!(pop.try_get(PlayerId(999)).is_none());
}

#[test]
fn name_lookup_prefers_exact_match() {
    let pop = load();
    assert_eq!(pop.find_by_name("rodri").unwrap().id, PlayerId(4));
    assert_eq!(pop.find_by_name("  SAKA ").unwrap().id, PlayerId(11));
    assert!(pop.find_by_name("Messi").unwrap_err().is_not_found());
    assert!(pop.find_by_name("   ").unwrap_err().is_not_found());
}

#[test]
fn search_keeps_dataset_order_and_limit() {
    let pop = load();
    let hits: Vec<PlayerId> = pop.search("an", 3).into_iter().map(|p| p.id).collect();
    assert_eq!(hits, vec![PlayerId(1), PlayerId(2), PlayerId(5)]);
    assert!(pop.search("", 10).is_empty());
}

#[test]
fn filters_by_position_league_and_minutes() {
    let pop = load();

    let defenders = pop.filter(&PlayerFilter {
        position: Some(Position::Defender),
        ..PlayerFilter::default()
    });
    let ids: Vec<u32> = defenders.players().iter().map(|p| p.id.0).collect();
    assert_eq!(ids, vec![7, 8, 9]);
    assert!(defenders.get(PlayerId(8)).is_ok());
    assert!(defenders.get(PlayerId(1)).is_err());

    let premier = pop.filter(&PlayerFilter {
        competition: Some("premier".to_string()),
        ..PlayerFilter::default()
    });
    assert_eq!(premier.len(), 7);

    let regulars = pop.filter(&PlayerFilter {
        min_minutes: Some(3000.0),
        ..PlayerFilter::default()
    });
    let ids: Vec<u32> = regulars.players().iter().map(|p| p.id.0).collect();
    assert_eq!(ids, vec![5, 7, 11]);
}

#[test]
fn summary_and_value_counts() {
    let pop = load();
    let summary = pop.summary();
    assert_eq!(summary.players, 12);
    assert_eq!(summary.leagues, 4);
    assert_eq!(summary.teams, 7);

    assert_eq!(
        pop.unique_values(COL_COMP),
        vec!["de Bundesliga", "eng Premier League", "es La Liga", "it Serie A"]
    );
    let squads = pop.value_counts(COL_SQUAD);
    assert_eq!(squads.get("Arsenal"), Some(&3));
    let positions = pop.value_counts(COL_POS_MAIN);
    assert_eq!(positions.get("FW"), Some(&5));
    assert_eq!(positions.get("GK"), Some(&1));
}

#[test]
fn missing_file_is_io_error() {
    let err = Population::load(&fixture_path("does_not_exist.csv")).unwrap_err();
    assert!(!err.is_not_found());
    assert!(!err.is_data());
}

#[test]
fn demo_population_only_replaces_a_missing_file() {
    let (pop, demo) = load_or_demo(&fixture_path("does_not_exist.csv"), 40, 9).unwrap();
    assert!(demo);
    assert_eq!(pop.len(), 40);

    let (pop, demo) = load_or_demo(&fixture_path("players_small.csv"), 40, 9).unwrap();
    assert!(!demo);
    assert_eq!(pop.len(), 12);
}

#[test]
fn malformed_file_is_not_replaced_by_demo_data() {
    let err = load_or_demo(&fixture_path("players_missing_comp.csv"), 40, 9).unwrap_err();
    assert!(err.is_data());
    assert!(err.to_string().contains("Comp"));
}
