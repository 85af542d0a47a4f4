use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use moneyball_scout::config::AppConfig;
use moneyball_scout::dataset::{PlayerFilter, Population};
use moneyball_scout::demo::demo_population;
use moneyball_scout::logging;
use moneyball_scout::player::Position;
use moneyball_scout::similarity::{SimilarQuery, SimilarityIndex};
use moneyball_scout::storyteller::{GeminiClient, Storyteller, clean_markdown};

fn main() -> Result<()> {
    logging::init_stderr()?;
    let config = AppConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let Some(name) = arg_value(&args, "player") else {
        bail!(
            "usage: similar --player=NAME [--k=N] [--position=FW|MF|DF|GK] [--league=NAME] \
             [--compare=NAME] [--story=profile|report|summary|explain|compare] [--data=PATH] [--demo]"
        );
    };

    let population = if has_flag(&args, "demo") {
        demo_population(600, 2024)?
    } else {
        let path = arg_value(&args, "data")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_path.clone());
        Population::load(&path).with_context(|| format!("failed to load {}", path.display()))?
    };
    let population = match config.min_minutes {
        Some(min) => population.filter(&PlayerFilter {
            min_minutes: Some(min),
            ..PlayerFilter::default()
        }),
        None => population,
    };
    let index = SimilarityIndex::build(population, &config.index)?;
    let summary = index.population().summary();
    info!(
        players = summary.players,
        leagues = summary.leagues,
        teams = summary.teams,
        dimension = index.matrix().dimension(),
        "index built"
    );

    let target = index.population().find_by_name(&name)?;
    let query = SimilarQuery {
        k: arg_value(&args, "k")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(config.top_n),
        position: arg_value(&args, "position")
            .map(|v| Position::from_code(&v))
            .filter(|p| *p != Position::Unknown),
        competition: arg_value(&args, "league"),
    };
    let similar = index.find_similar_with(target.id, &query)?;

    println!(
        "{} | {} | {} | {}",
        target.name, target.squad, target.comp, target.position
    );
    println!();
    println!("{:>3}  {:<28} {:<20} {:<6} {:>8}", "#", "Player", "Squad", "Pos", "Sim %");
    for rec in &similar {
        let p = index.population().get(rec.id)?;
        println!(
            "{:>3}  {:<28} {:<20} {:<6} {:>7.1}%",
            rec.rank,
            p.name,
            p.squad,
            p.position,
            rec.score * 100.0
        );
    }

    let other = match arg_value(&args, "compare") {
        Some(other_name) => {
            let other = index.population().find_by_name(&other_name)?;
            let cmp = index.compare(target.id, other.id)?;
            println!();
            println!("{:<10} {:>12} {:>12}", "Stat", target.name, other.name);
            for row in &cmp.rows {
                println!(
                    "{:<10} {:>12} {:>12}",
                    row.field,
                    row.a.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                    row.b.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                );
            }
            println!("Similarity: {:.1}%", cmp.score * 100.0);
            Some(other.id)
        }
        None => None,
    };

    if let Some(kind) = arg_value(&args, "story") {
        let key = config
            .api_key
            .clone()
            .context("no Gemini API key configured (GEMINI_API_KEY or data/config.json)")?;
        let client = GeminiClient::new(key)?
            .with_model(config.gemini_model.clone())
            .with_base_url(config.gemini_base_url.clone());
        let teller = Storyteller::new(client);
        let population = index.population();
        let text = match (kind.as_str(), other) {
            ("profile", _) => teller.player_description(population, target.id)?,
            ("report", _) => teller.scout_report(population, target.id)?,
            ("summary", _) => teller.quick_summary(population, target.id)?,
            ("explain", _) => teller.recommendation_explanation(
                population,
                target.id,
                &similar,
                None,
            )?,
            ("compare", Some(other)) => teller.comparison_narrative(population, target.id, other)?,
            ("compare", None) => bail!("--story=compare needs --compare=NAME"),
            (other_kind, _) => bail!("unknown story kind: {other_kind}"),
        };
        println!();
        println!("{}", clean_markdown(&text));
    }

    Ok(())
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    let flag = format!("--{name}");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn has_flag(args: &[String], name: &str) -> bool {
    let flag = format!("--{name}");
    args.iter().any(|a| *a == flag)
}
