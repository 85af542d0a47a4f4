use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moneyball_scout::dataset::Population;
use moneyball_scout::error::LlmError;
use moneyball_scout::player::PlayerId;
use moneyball_scout::similarity::{IndexConfig, SimilarityIndex};
use moneyball_scout::state::{AiTask, Command, Delta};
use moneyball_scout::storyteller::{Storyteller, TextGenerator};
use moneyball_scout::worker::spawn_ai_worker;

/// Records every prompt and answers with a fixed reply or error.
#[derive(Clone, Default)]
struct Recorder {
    prompts: Arc<Mutex<Vec<String>>>,
    fail: Option<LlmError>,
}

impl Recorder {
    fn failing(err: LlmError) -> Self {
        Self {
            fail: Some(err),
            ..Self::default()
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for Recorder {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.fail {
            Some(err) => Err(err.clone()),
            None => Ok("**Solid** player".to_string()),
        }
    }
}

fn population() -> Population {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("players_small.csv");
    Population::load(&path).expect("fixture should load")
}

#[test]
fn unknown_player_fails_before_calling_the_model() {
    let pop = population();
    let recorder = Recorder::default();
    let teller = Storyteller::new(recorder.clone());

    assert!(teller.player_description(&pop, PlayerId(999)).unwrap_err().is_not_found());
    assert!(teller.scout_report(&pop, PlayerId(999)).unwrap_err().is_not_found());
    assert!(teller.quick_summary(&pop, PlayerId(999)).unwrap_err().is_not_found());
    assert!(
        teller
            .comparison_narrative(&pop, PlayerId(1), PlayerId(999))
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        teller
            .recommendation_explanation(&pop, PlayerId(999), &[], None)
            .unwrap_err()
            .is_not_found()
    );
    assert!(recorder.prompts().is_empty());
}

#[test]
fn profile_prompt_carries_context_and_stats() {
    let pop = population();
    let recorder = Recorder::default();
    let teller = Storyteller::new(recorder.clone()).with_context("You are a test analyst.");

    let text = teller.player_description(&pop, PlayerId(4)).unwrap();
    assert_eq!(text, "**Solid** player");

    let prompts = recorder.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("You are a test analyst."));
    assert!(prompts[0].contains("Name: Rodri"));
    assert!(prompts[0].contains("Club: Manchester City"));
    assert!(prompts[0].contains("- Goals: 4"));
}

#[test]
fn comparison_prompt_names_both_players() {
    let pop = population();
    let recorder = Recorder::default();
    let teller = Storyteller::new(recorder.clone());
    teller
        .comparison_narrative(&pop, PlayerId(7), PlayerId(8))
        .unwrap();
    let prompt = &recorder.prompts()[0];
    assert!(prompt.contains("Virgil van Dijk"));
    assert!(prompt.contains("William Saliba"));
}

#[test]
fn recommendation_prompt_lists_at_most_five_players() {
    let pop = population();
    let index = SimilarityIndex::build(pop.clone(), &IndexConfig::default()).unwrap();
    let similar = index.find_similar(PlayerId(1), 8).unwrap();
    let recorder = Recorder::default();
    let teller = Storyteller::new(recorder.clone());

    teller
        .recommendation_explanation(&pop, PlayerId(1), &similar, Some("league it Serie A"))
        .unwrap();
    let prompt = &recorder.prompts()[0];
    let listed = prompt.lines().filter(|l| l.contains("Similarity:")).count();
    assert_eq!(listed, 5);
    let first = pop.get(similar[0].id).unwrap();
    assert!(prompt.contains(&first.name));
    let sixth = pop.get(similar[5].id).unwrap();
    assert!(!prompt.contains(&format!("- {} (", sixth.name)));
    assert!(prompt.contains("Search criteria: league it Serie A"));
}

#[test]
fn generator_errors_surface_as_llm_errors() {
    let pop = population();
    let teller = Storyteller::new(Recorder::failing(LlmError::RateLimited));
    let err = teller.quick_summary(&pop, PlayerId(2)).unwrap_err();
    assert!(!err.is_not_found());
    assert!(err.to_string().to_lowercase().contains("rate"));
}

#[test]
fn worker_answers_commands_in_order() {
    let pop = Arc::new(population());
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let handle = spawn_ai_worker(Storyteller::new(Recorder::default()), pop, tx, cmd_rx);

    cmd_tx
        .send(Command::Generate {
            request_id: 7,
            task: AiTask::QuickSummary,
            target: PlayerId(11),
            other: None,
            similar: Vec::new(),
            criteria: None,
        })
        .unwrap();
    cmd_tx
        .send(Command::Generate {
            request_id: 8,
            task: AiTask::Comparison,
            target: PlayerId(11),
            other: None,
            similar: Vec::new(),
            criteria: None,
        })
        .unwrap();
    cmd_tx.send(Command::Shutdown).unwrap();

    let wait = Duration::from_secs(5);
    assert!(matches!(
        rx.recv_timeout(wait).unwrap(),
        Delta::AiStarted { request_id: 7, .. }
    ));
    match rx.recv_timeout(wait).unwrap() {
        Delta::AiText { request_id, text, .. } => {
            assert_eq!(request_id, 7);
            assert_eq!(text, "**Solid** player");
        }
        other => panic!("unexpected delta {other:?}"),
    }
    assert!(matches!(
        rx.recv_timeout(wait).unwrap(),
        Delta::AiStarted { request_id: 8, .. }
    ));
    assert!(matches!(
        rx.recv_timeout(wait).unwrap(),
        Delta::AiFailed { request_id: 8, .. }
    ));
    handle.join().unwrap();
}
