use std::collections::VecDeque;
use std::time::Instant;

use chrono::Local;

use crate::charts::BAR_STATS;
use crate::player::{PlayerId, Position};
use crate::similarity::{SimilarPlayer, SimilarQuery, SimilarityIndex};
use crate::storyteller::clean_markdown;

pub const MAX_LOGS: usize = 200;
pub const MAX_SEARCH_RESULTS: usize = 25;
pub const MAX_COMPARE: usize = 5;
pub const MAX_K: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,
    Recommend,
    Analysis,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTab {
    Percentiles,
    Compare,
    Leaders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTask {
    Profile,
    ScoutReport,
    QuickSummary,
    Comparison,
    Recommendation,
}

impl AiTask {
    pub const ALL: [AiTask; 5] = [
        AiTask::Profile,
        AiTask::ScoutReport,
        AiTask::QuickSummary,
        AiTask::Comparison,
        AiTask::Recommendation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AiTask::Profile => "Player profile",
            AiTask::ScoutReport => "Scout report",
            AiTask::QuickSummary => "Quick summary",
            AiTask::Comparison => "Comparison",
            AiTask::Recommendation => "Recommendation explanation",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Requests sent to the AI worker.
#[derive(Debug, Clone)]
pub enum Command {
    Generate {
        request_id: u64,
        task: AiTask,
        target: PlayerId,
        other: Option<PlayerId>,
        similar: Vec<SimilarPlayer>,
        criteria: Option<String>,
    },
    Shutdown,
}

/// Updates sent back from the AI worker.
#[derive(Debug, Clone)]
pub enum Delta {
    AiStarted { request_id: u64, task: AiTask },
    AiText { request_id: u64, task: AiTask, text: String },
    AiFailed { request_id: u64, task: AiTask, error: String },
    Log(String),
}

#[derive(Debug, Clone, Default)]
pub struct AiPanel {
    pub task: Option<AiTask>,
    pub request_id: u64,
    pub loading: bool,
    pub text: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<Instant>,
}

pub struct AppState {
    pub screen: Screen,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,

    pub search_query: String,
    pub search_editing: bool,
    pub search_results: Vec<PlayerId>,
    pub search_selected: usize,
    pub selected_player: Option<PlayerId>,
    pub compare: Vec<PlayerId>,

    pub rec_k: usize,
    pub rec_position: Option<Position>,
    pub rec_competition: Option<String>,
    pub competitions: Vec<String>,
    pub recommendations: Vec<SimilarPlayer>,
    pub rec_selected: usize,

    pub analysis_tab: AnalysisTab,
    pub leader_field: usize,
    pub leader_position: Option<Position>,

    pub ai_enabled: bool,
    pub ai_task: AiTask,
    pub ai: AiPanel,
    next_request_id: u64,

    pub last_export: Option<String>,
}

impl AppState {
    pub fn new(default_k: usize, competitions: Vec<String>, ai_enabled: bool) -> Self {
        Self {
            screen: Screen::Search,
            help_overlay: false,
            logs: VecDeque::new(),
            search_query: String::new(),
            search_editing: true,
            search_results: Vec::new(),
            search_selected: 0,
            selected_player: None,
            compare: Vec::new(),
            rec_k: default_k.clamp(1, MAX_K),
            rec_position: None,
            rec_competition: None,
            competitions,
            recommendations: Vec::new(),
            rec_selected: 0,
            analysis_tab: AnalysisTab::Percentiles,
            leader_field: 0,
            leader_position: None,
            ai_enabled,
            ai_task: AiTask::Profile,
            ai: AiPanel::default(),
            next_request_id: 0,
            last_export: None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        let stamp = Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("{stamp} {}", msg.into()));
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn run_search(&mut self, index: &SimilarityIndex) {
        self.search_results = index
            .population()
            .search(&self.search_query, MAX_SEARCH_RESULTS)
            .into_iter()
            .map(|p| p.id)
            .collect();
        self.search_selected = 0;
    }

    pub fn search_highlighted(&self) -> Option<PlayerId> {
        self.search_results.get(self.search_selected).copied()
    }

    pub fn select_next(&mut self) {
        match self.screen {
            Screen::Search => {
                if self.search_selected + 1 < self.search_results.len() {
                    self.search_selected += 1;
                }
            }
            Screen::Recommend => {
                if self.rec_selected + 1 < self.recommendations.len() {
                    self.rec_selected += 1;
                }
            }
            Screen::Analysis => {
                if self.analysis_tab == AnalysisTab::Leaders {
                    self.leader_field = (self.leader_field + 1) % leader_fields().len();
                }
            }
            Screen::Ai => self.ai_task = self.ai_task.next(),
        }
    }

    pub fn select_prev(&mut self) {
        match self.screen {
            Screen::Search => self.search_selected = self.search_selected.saturating_sub(1),
            Screen::Recommend => self.rec_selected = self.rec_selected.saturating_sub(1),
            Screen::Analysis => {
                if self.analysis_tab == AnalysisTab::Leaders {
                    let n = leader_fields().len();
                    self.leader_field = (self.leader_field + n - 1) % n;
                }
            }
            Screen::Ai => {
                for _ in 0..AiTask::ALL.len() - 1 {
                    self.ai_task = self.ai_task.next();
                }
            }
        }
    }

    /// Makes the highlighted row the current player. Returns it when changed.
    pub fn choose_highlighted(&mut self) -> Option<PlayerId> {
        let id = match self.screen {
            Screen::Search => self.search_highlighted(),
            Screen::Recommend => self.recommendations.get(self.rec_selected).map(|r| r.id),
            _ => None,
        }?;
        if self.selected_player == Some(id) {
            return None;
        }
        self.selected_player = Some(id);
        Some(id)
    }

    /// Adds or removes a player from the comparison list. Returns false when
    /// the list is full.
    pub fn toggle_compare(&mut self, id: PlayerId) -> bool {
        if let Some(pos) = self.compare.iter().position(|p| *p == id) {
            self.compare.remove(pos);
            return true;
        }
        if self.compare.len() >= MAX_COMPARE {
            return false;
        }
        self.compare.push(id);
        true
    }

    pub fn adjust_k(&mut self, delta: isize) {
        self.rec_k = self.rec_k.saturating_add_signed(delta).clamp(1, MAX_K);
    }

    pub fn cycle_position(&mut self) {
        self.rec_position = match self.rec_position {
            None => Some(Position::Goalkeeper),
            Some(Position::Goalkeeper) => Some(Position::Defender),
            Some(Position::Defender) => Some(Position::Midfielder),
            Some(Position::Midfielder) => Some(Position::Forward),
            Some(Position::Forward) | Some(Position::Unknown) => None,
        };
    }

    pub fn cycle_competition(&mut self) {
        let next = match &self.rec_competition {
            None => 0,
            Some(cur) => match self.competitions.iter().position(|c| c == cur) {
                Some(i) => i + 1,
                None => self.competitions.len(),
            },
        };
        self.rec_competition = self.competitions.get(next).cloned();
    }

    pub fn cycle_leader_position(&mut self) {
        self.leader_position = match self.leader_position {
            None => Some(Position::Forward),
            Some(Position::Forward) => Some(Position::Midfielder),
            Some(Position::Midfielder) => Some(Position::Defender),
            Some(Position::Defender) => Some(Position::Goalkeeper),
            Some(Position::Goalkeeper) | Some(Position::Unknown) => None,
        };
    }

    pub fn cycle_analysis_tab(&mut self) {
        self.analysis_tab = match self.analysis_tab {
            AnalysisTab::Percentiles => AnalysisTab::Compare,
            AnalysisTab::Compare => AnalysisTab::Leaders,
            AnalysisTab::Leaders => AnalysisTab::Percentiles,
        };
    }

    pub fn similar_query(&self) -> SimilarQuery {
        SimilarQuery {
            k: self.rec_k,
            position: self.rec_position,
            competition: self.rec_competition.clone(),
        }
    }

    pub fn criteria_text(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(pos) = self.rec_position {
            parts.push(format!("position {}", pos.label()));
        }
        if let Some(comp) = &self.rec_competition {
            parts.push(format!("league {comp}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    pub fn refresh_recommendations(&mut self, index: &SimilarityIndex) {
        let Some(id) = self.selected_player else {
            self.push_log("[INFO] Select a player first");
            return;
        };
        match index.find_similar_with(id, &self.similar_query()) {
            Ok(recs) => {
                let name = index
                    .population()
                    .try_get(id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| id.to_string());
                self.push_log(format!(
                    "[INFO] {} similar players for {name}",
                    recs.len()
                ));
                self.recommendations = recs;
                self.rec_selected = 0;
            }
            Err(err) => {
                self.recommendations.clear();
                self.push_log(format!("[WARN] Recommendation failed: {err}"));
            }
        }
    }

    /// Builds the worker command for the current AI task, or logs why it
    /// cannot run.
    pub fn ai_command(&mut self) -> Option<Command> {
        if !self.ai_enabled {
            self.push_log("[WARN] AI disabled: no Gemini API key configured");
            return None;
        }
        let Some(target) = self.selected_player else {
            self.push_log("[INFO] Select a player first");
            return None;
        };
        let other = match self.ai_task {
            AiTask::Comparison => {
                let Some(other) = self.compare.iter().copied().find(|p| *p != target) else {
                    self.push_log("[INFO] Add another player to the compare list (c)");
                    return None;
                };
                Some(other)
            }
            _ => None,
        };
        if self.ai_task == AiTask::Recommendation && self.recommendations.is_empty() {
            self.push_log("[INFO] Run a recommendation first (screen 2)");
            return None;
        }
        self.next_request_id += 1;
        Some(Command::Generate {
            request_id: self.next_request_id,
            task: self.ai_task,
            target,
            other,
            similar: self.recommendations.clone(),
            criteria: self.criteria_text(),
        })
    }
}

pub fn leader_fields() -> &'static [&'static str] {
    BAR_STATS
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::AiStarted { request_id, task } => {
            state.ai = AiPanel {
                task: Some(task),
                request_id,
                loading: true,
                text: None,
                error: None,
                started_at: Some(Instant::now()),
            };
        }
        Delta::AiText {
            request_id,
            task,
            text,
        } => {
            if request_id != state.ai.request_id {
                return;
            }
            let took = state
                .ai
                .started_at
                .map(|t| t.elapsed().as_secs_f32())
                .unwrap_or_default();
            state.ai.loading = false;
            state.ai.text = Some(clean_markdown(&text));
            state.ai.error = None;
            state.push_log(format!("[INFO] {} ready ({took:.1}s)", task.label()));
        }
        Delta::AiFailed {
            request_id,
            task,
            error,
        } => {
            if request_id != state.ai.request_id {
                return;
            }
            state.ai.loading = false;
            state.ai.text = None;
            state.push_log(format!("[WARN] {} failed: {error}", task.label()));
            state.ai.error = Some(error);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
