use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Wrap};

use moneyball_scout::charts::{
    self, BAR_STATS, COMPARE_RADAR, TABLE_STATS, radar_fields, stat_label,
};
use moneyball_scout::config::AppConfig;
use moneyball_scout::dataset::{COL_COMP, PlayerFilter};
use moneyball_scout::demo::load_or_demo;
use moneyball_scout::export;
use moneyball_scout::logging;
use moneyball_scout::player::PlayerId;
use moneyball_scout::similarity::SimilarityIndex;
use moneyball_scout::state::{
    AiTask, AnalysisTab, AppState, Command, Delta, MAX_COMPARE, Screen, apply_delta,
    leader_fields,
};
use moneyball_scout::storyteller::{GeminiClient, Storyteller};
use moneyball_scout::worker::spawn_ai_worker;

const DEMO_SIZE: usize = 600;
const DEMO_SEED: u64 = 2024;
const LEADERBOARD_SIZE: usize = 15;

struct App {
    state: AppState,
    index: SimilarityIndex,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<Command>>,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        if self.state.screen == Screen::Search && self.state.search_editing {
            self.on_search_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.screen = Screen::Search,
            KeyCode::Char('2') => self.state.screen = Screen::Recommend,
            KeyCode::Char('3') => self.state.screen = Screen::Analysis,
            KeyCode::Char('4') => self.state.screen = Screen::Ai,
            KeyCode::Char('/') => {
                self.state.screen = Screen::Search;
                self.state.search_editing = true;
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter => self.on_enter(),
            KeyCode::Char('c') => self.toggle_compare(),
            KeyCode::Char('r') => self.state.refresh_recommendations(&self.index),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.state.adjust_k(1);
                self.state.refresh_recommendations(&self.index);
            }
            KeyCode::Char('-') => {
                self.state.adjust_k(-1);
                self.state.refresh_recommendations(&self.index);
            }
            KeyCode::Char('p') => {
                if self.state.screen == Screen::Analysis {
                    self.state.cycle_leader_position();
                } else {
                    self.state.cycle_position();
                    self.state.refresh_recommendations(&self.index);
                }
            }
            KeyCode::Char('l') => {
                self.state.cycle_competition();
                self.state.refresh_recommendations(&self.index);
            }
            KeyCode::Char('t') => self.state.cycle_analysis_tab(),
            KeyCode::Char('g') => self.request_ai(),
            KeyCode::Char('x') => self.export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.state.search_query.push(c);
                self.state.run_search(&self.index);
            }
            KeyCode::Backspace => {
                self.state.search_query.pop();
                self.state.run_search(&self.index);
            }
            KeyCode::Enter => {
                self.state.search_editing = false;
                self.on_enter();
            }
            KeyCode::Esc => self.state.search_editing = false,
            KeyCode::Down => self.state.select_next(),
            KeyCode::Up => self.state.select_prev(),
            _ => {}
        }
    }

    fn on_enter(&mut self) {
        if let Some(id) = self.state.choose_highlighted() {
            let name = self.player_name(id);
            self.state.push_log(format!("[INFO] Selected {name}"));
            self.state.refresh_recommendations(&self.index);
        }
    }

    fn toggle_compare(&mut self) {
        let id = match self.state.screen {
            Screen::Search => self.state.search_highlighted(),
            Screen::Recommend => self
                .state
                .recommendations
                .get(self.state.rec_selected)
                .map(|r| r.id),
            _ => self.state.selected_player,
        };
        let Some(id) = id else {
            self.state.push_log("[INFO] Nothing to compare");
            return;
        };
        let name = self.player_name(id);
        if self.state.toggle_compare(id) {
            self.state
                .push_log(format!("[INFO] Compare list: {} players", self.state.compare.len()));
        } else {
            self.state.push_log(format!(
                "[WARN] Compare list is full, {name} not added"
            ));
        }
    }

    fn request_ai(&mut self) {
        let Some(cmd) = self.state.ai_command() else {
            return;
        };
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] AI worker unavailable");
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] AI request failed");
        } else {
            self.state.screen = Screen::Ai;
            self.state
                .push_log(format!("[INFO] {} requested", self.state.ai_task.label()));
        }
    }

    fn export(&mut self) {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let result = match (self.state.screen, self.state.selected_player) {
            (Screen::Recommend, Some(target)) if !self.state.recommendations.is_empty() => {
                let path = PathBuf::from(format!("exports/recommendations_{}_{stamp}.xlsx", target.0));
                export::export_recommendations(&path, &self.index, target, &self.state.recommendations)
                    .map(|r| (path, r))
            }
            _ if self.state.compare.len() >= 2 => {
                let path = PathBuf::from(format!("exports/comparison_{stamp}.xlsx"));
                export::export_comparison(&path, &self.index, &self.state.compare).map(|r| (path, r))
            }
            _ => {
                self.state
                    .push_log("[INFO] Nothing to export: run a recommendation or compare two players");
                return;
            }
        };
        match result {
            Ok((path, report)) => {
                for err in &report.errors {
                    self.state.push_log(format!("[WARN] Export: {err}"));
                }
                self.state.push_log(format!(
                    "[INFO] Exported {} rows to {}",
                    report.rows,
                    path.display()
                ));
                self.state.last_export = Some(path.display().to_string());
            }
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }

    fn player_name(&self, id: PlayerId) -> String {
        self.index
            .population()
            .try_get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

fn build(config: &AppConfig) -> Result<(SimilarityIndex, Vec<String>)> {
    let mut notes = Vec::new();
    let (population, demo) = load_or_demo(&config.data_path, DEMO_SIZE, DEMO_SEED)
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;
    if demo {
        notes.push(format!(
            "[WARN] {} not found; using demo population",
            config.data_path.display()
        ));
    }
    let population = match config.min_minutes {
        Some(min) => {
            let filtered = population.filter(&PlayerFilter {
                min_minutes: Some(min),
                ..PlayerFilter::default()
            });
            notes.push(format!(
                "[INFO] Minutes filter {min}: {} of {} players kept",
                filtered.len(),
                population.len()
            ));
            filtered
        }
        None => population,
    };
    let index = SimilarityIndex::build(population, &config.index)
        .context("failed to build similarity index")?;
    Ok((index, notes))
}

fn main() -> Result<()> {
    let config = AppConfig::from_env();
    if let Some(path) = &config.log_file {
        logging::init_file(path)?;
    }

    let (index, notes) = build(&config)?;
    let competitions = index.population().unique_values(COL_COMP);

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let mut ai_note = None;
    let cmd_tx = match config.api_key.as_deref().map(GeminiClient::new) {
        Some(Ok(client)) => {
            let client = client
                .with_model(config.gemini_model.clone())
                .with_base_url(config.gemini_base_url.clone());
            let population = Arc::new(index.population().clone());
            spawn_ai_worker(Storyteller::new(client), population, tx, cmd_rx);
            Some(cmd_tx)
        }
        Some(Err(err)) => {
            ai_note = Some(format!("[WARN] AI disabled: {err}"));
            None
        }
        None => {
            ai_note = Some("[INFO] AI disabled: set GEMINI_API_KEY or data/config.json".to_string());
            None
        }
    };

    let mut state = AppState::new(config.top_n, competitions, cmd_tx.is_some());
    let summary = index.population().summary();
    state.push_log(format!(
        "[INFO] Loaded {} players, {} leagues, {} teams ({} features)",
        summary.players,
        summary.leagues,
        summary.teams,
        index.matrix().dimension()
    ));
    for note in notes.into_iter().chain(ai_note) {
        state.push_log(note);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App {
        state,
        index,
        should_quit: false,
        cmd_tx,
    };
    let res = run_app(&mut terminal, &mut app, rx);

    if let Some(tx) = &app.cmd_tx {
        let _ = tx.send(Command::Shutdown);
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Search => render_search(frame, chunks[1], app),
        Screen::Recommend => render_recommend(frame, chunks[1], app),
        Screen::Analysis => render_analysis(frame, chunks[1], app),
        Screen::Ai => render_ai(frame, chunks[1], app),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::TOP))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let summary = app.index.population().summary();
    let title = match app.state.screen {
        Screen::Search => "SEARCH",
        Screen::Recommend => "RECOMMEND",
        Screen::Analysis => "ANALYSIS",
        Screen::Ai => "AI SCOUT",
    };
    let target = app
        .state
        .selected_player
        .map(|id| app.player_name(id))
        .unwrap_or_else(|| "no player selected".to_string());
    let line1 = format!("  .-.  MONEYBALL SCOUT | {title} | {target}");
    let line2 = format!(
        " /___\\ {} players | {} leagues | {} teams | {} | {}",
        summary.players,
        summary.leagues,
        summary.teams,
        app.index.matrix().scaling().label(),
        app.index.metric().label()
    );
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Search if state.search_editing => {
            "Type to search | Enter Select | Esc Stop typing | ↑/↓ Move".to_string()
        }
        Screen::Search => {
            "1-4 Screens | / Search | j/k Move | Enter Select | c Compare | x Export | ? Help | q Quit"
                .to_string()
        }
        Screen::Recommend => {
            "1-4 Screens | j/k Move | Enter Retarget | +/- K | p Position | l League | c Compare | x Export | q Quit"
                .to_string()
        }
        Screen::Analysis => {
            "1-4 Screens | t Tab | j/k Stat | p Position | c Compare | x Export | ? Help | q Quit"
                .to_string()
        }
        Screen::Ai => "1-4 Screens | j/k Task | g Generate | ? Help | q Quit".to_string(),
    }
}

fn render_search(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(columns[0]);

    let cursor = if app.state.search_editing { "_" } else { "" };
    let input_style = if app.state.search_editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let input = Paragraph::new(format!("{}{cursor}", app.state.search_query))
        .style(input_style)
        .block(Block::default().title("Player name").borders(Borders::ALL));
    frame.render_widget(input, left[0]);

    let population = app.index.population();
    let visible = left[1].height.saturating_sub(2) as usize;
    let (start, end) = visible_range(
        app.state.search_selected,
        app.state.search_results.len(),
        visible,
    );
    let mut lines = Vec::new();
    for (i, id) in app.state.search_results[start..end].iter().enumerate() {
        let Some(p) = population.try_get(*id) else {
            continue;
        };
        let marker = if app.state.compare.contains(id) { "+" } else { " " };
        let text = format!("{marker} {:<24} {:<16} {}", p.name, p.squad, p.position);
        let style = if start + i == app.state.search_selected {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(text, style));
    }
    if lines.is_empty() {
        lines.push(Line::raw(if app.state.search_query.trim().is_empty() {
            "Start typing a player name"
        } else {
            "No players found"
        }));
    }
    let list = Paragraph::new(lines).block(
        Block::default()
            .title(format!("Results ({})", app.state.search_results.len()))
            .borders(Borders::ALL),
    );
    frame.render_widget(list, left[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(7)])
        .split(columns[1]);
    let profile_id = app
        .state
        .search_highlighted()
        .or(app.state.selected_player);
    let profile = Paragraph::new(profile_text(app, profile_id))
        .block(Block::default().title("Profile").borders(Borders::ALL));
    frame.render_widget(profile, right[0]);

    let compare = Paragraph::new(compare_list_text(app)).block(
        Block::default()
            .title(format!(
                "Compare ({}/{})",
                app.state.compare.len(),
                MAX_COMPARE
            ))
            .borders(Borders::ALL),
    );
    frame.render_widget(compare, right[1]);
}

fn profile_text(app: &App, id: Option<PlayerId>) -> String {
    let Some(p) = id.and_then(|id| app.index.population().try_get(id)) else {
        return "No player highlighted".to_string();
    };
    let mut out = format!(
        "{}\n{} | {} | {}\nNation: {}  Age: {}\n\n",
        p.name,
        p.squad,
        p.comp,
        p.position,
        p.nation_code(),
        p.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
    );
    for field in TABLE_STATS {
        let value = p
            .stat(field)
            .map(format_stat)
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{:<22} {value:>8}\n", stat_label(field)));
    }
    out
}

fn compare_list_text(app: &App) -> String {
    if app.state.compare.is_empty() {
        return "Press c on a player to add".to_string();
    }
    app.state
        .compare
        .iter()
        .map(|id| app.player_name(*id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_recommend(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    let filters = format!(
        " K: {} | Position: {} | League: {}",
        app.state.rec_k,
        app.state
            .rec_position
            .map(|p| p.label())
            .unwrap_or("All"),
        app.state.rec_competition.as_deref().unwrap_or("All")
    );
    frame.render_widget(
        Paragraph::new(filters).style(Style::default().fg(Color::Cyan)),
        rows[0],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let population = app.index.population();
    let visible = columns[0].height.saturating_sub(3) as usize;
    let (start, end) = visible_range(
        app.state.rec_selected,
        app.state.recommendations.len(),
        visible,
    );
    let mut lines = vec![Line::styled(
        format!(
            "{:>3}  {:<24} {:<16} {:<6} {:>7}",
            "#", "Player", "Squad", "Pos", "Sim %"
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for (i, rec) in app.state.recommendations[start..end].iter().enumerate() {
        let Some(p) = population.try_get(rec.id) else {
            continue;
        };
        let style = if start + i == app.state.rec_selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        lines.push(Line::styled(
            format!(
                "{:>3}  {:<24} {:<16} {:<6} {:>6.1}%",
                rec.rank,
                p.name,
                p.squad,
                p.position,
                rec.score * 100.0
            ),
            style,
        ));
    }
    if app.state.recommendations.is_empty() {
        lines.push(Line::raw("Select a player on the search screen, then press r"));
    }
    let table = Paragraph::new(lines)
        .block(Block::default().title("Similar players").borders(Borders::ALL));
    frame.render_widget(table, columns[0]);

    let selected = app.state.recommendations.get(app.state.rec_selected);
    match (app.state.selected_player, selected) {
        (Some(target), Some(rec)) => {
            render_compare_bars(frame, columns[1], app, &[target, rec.id], BAR_STATS)
        }
        _ => frame.render_widget(
            Paragraph::new("").block(Block::default().title("Head to head").borders(Borders::ALL)),
            columns[1],
        ),
    }
}

fn render_compare_bars(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    players: &[PlayerId],
    fields: &[&str],
) {
    let population = app.index.population();
    let palette = [Color::Cyan, Color::Magenta, Color::Yellow, Color::Green, Color::Red];
    let mut chart = BarChart::default()
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(1)
        .max(100);
    for field in fields {
        let mut bars = Vec::new();
        for (i, id) in players.iter().enumerate() {
            let Ok(scaled) = charts::max_scaled(population, *id, &[*field]) else {
                continue;
            };
            let raw = population
                .try_get(*id)
                .map(|p| p.stat_or_zero(field))
                .unwrap_or_default();
            let value = scaled.first().map(|s| s.value).unwrap_or_default();
            bars.push(
                Bar::default()
                    .value(value.round().max(0.0) as u64)
                    .text_value(format_stat(raw))
                    .style(Style::default().fg(palette[i % palette.len()])),
            );
        }
        chart = chart.data(BarGroup::default().label(Line::from(field.to_string())).bars(&bars));
    }
    let legend = players
        .iter()
        .map(|id| app.player_name(*id))
        .collect::<Vec<_>>()
        .join(" vs ");
    frame.render_widget(
        chart.block(Block::default().title(legend).borders(Borders::ALL)),
        area,
    );
}

fn render_analysis(frame: &mut Frame, area: Rect, app: &App) {
    let tab = match app.state.analysis_tab {
        AnalysisTab::Percentiles => "Percentiles",
        AnalysisTab::Compare => "Compare",
        AnalysisTab::Leaders => "Leaders",
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    frame.render_widget(
        Paragraph::new(format!(" Tab: {tab} (t to switch)"))
            .style(Style::default().fg(Color::Cyan)),
        rows[0],
    );

    match app.state.analysis_tab {
        AnalysisTab::Percentiles => render_percentiles(frame, rows[1], app),
        AnalysisTab::Compare => {
            if app.state.compare.is_empty() {
                frame.render_widget(
                    Paragraph::new("Add players to the compare list with c")
                        .block(Block::default().title("Compare").borders(Borders::ALL)),
                    rows[1],
                );
            } else {
                render_compare_bars(frame, rows[1], app, &app.state.compare, COMPARE_RADAR);
            }
        }
        AnalysisTab::Leaders => render_leaders(frame, rows[1], app),
    }
}

fn render_percentiles(frame: &mut Frame, area: Rect, app: &App) {
    let population = app.index.population();
    let Some(player) = app.state.selected_player.and_then(|id| population.try_get(id)) else {
        frame.render_widget(
            Paragraph::new("Select a player first")
                .block(Block::default().title("Percentiles").borders(Borders::ALL)),
            area,
        );
        return;
    };
    let fields = radar_fields(player.main_position);
    let points = charts::percentile_ranks(population, player.id, fields, Some(player.main_position))
        .unwrap_or_default();
    let bars: Vec<Bar> = points
        .iter()
        .map(|p| {
            let color = if p.value >= 80.0 {
                Color::Green
            } else if p.value >= 50.0 {
                Color::Yellow
            } else {
                Color::Red
            };
            Bar::default()
                .label(Line::from(stat_label(&p.field).to_string()))
                .value(p.value.round() as u64)
                .text_value(format!("{:.0}", p.value))
                .style(Style::default().fg(color))
        })
        .collect();
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .max(100)
        .block(
            Block::default()
                .title(format!(
                    "{} vs {}s (percentile)",
                    player.name,
                    player.main_position.label()
                ))
                .borders(Borders::ALL),
        );
    frame.render_widget(chart, area);
}

fn render_leaders(frame: &mut Frame, area: Rect, app: &App) {
    let fields = leader_fields();
    let field = fields[app.state.leader_field % fields.len()];
    let leaders = charts::top_players(
        app.index.population(),
        field,
        LEADERBOARD_SIZE,
        app.state.leader_position,
    );
    let mut text = String::new();
    for (i, entry) in leaders.iter().enumerate() {
        text.push_str(&format!(
            "{:>2}. {:<26} {:<18} {:>8}\n",
            i + 1,
            entry.name,
            entry.squad,
            format_stat(entry.value)
        ));
    }
    if leaders.is_empty() {
        text.push_str("No data");
    }
    let scope = app
        .state
        .leader_position
        .map(|p| p.label())
        .unwrap_or("All positions");
    let block = Block::default()
        .title(format!("Top {} | {} (j/k stat, p position)", stat_label(field), scope))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_ai(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(1)])
        .split(area);

    let mut lines: Vec<Line> = AiTask::ALL
        .iter()
        .map(|task| {
            let style = if *task == app.state.ai_task {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::styled(format!(" {}", task.label()), style)
        })
        .collect();
    if !app.state.ai_enabled {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            " No API key configured",
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Tasks").borders(Borders::ALL)),
        columns[0],
    );

    let panel = &app.state.ai;
    let body = if panel.loading {
        let waited = panel
            .started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or_default();
        format!("Generating... {waited}s")
    } else if let Some(err) = &panel.error {
        format!("Error: {err}")
    } else if let Some(text) = &panel.text {
        text.clone()
    } else {
        "Press g to generate".to_string()
    };
    let title = panel
        .task
        .map(|t| t.label())
        .unwrap_or("Output");
    frame.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL)),
        columns[1],
    );
}

fn format_stat(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let n = state.logs.len();
    state
        .logs
        .iter()
        .skip(n.saturating_sub(3))
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Moneyball Scout - Help",
        "",
        "Global:",
        "  1 / 2 / 3 / 4  Search / Recommend / Analysis / AI",
        "  /              Edit search query",
        "  j/k or ↑/↓     Move",
        "  Enter          Select player",
        "  c              Toggle compare list (max 5)",
        "  x              Export recommendations or comparison (xlsx)",
        "  ?              Toggle help",
        "  q              Quit",
        "",
        "Recommend:",
        "  r              Refresh",
        "  + / -          Change K",
        "  p / l          Cycle position / league filter",
        "",
        "Analysis:",
        "  t              Switch tab",
        "  p              Leaderboard position filter",
        "",
        "AI:",
        "  g              Generate for selected task",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
