use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::dataset::Population;
use crate::error::{Result, ScoutError};
use crate::state::{AiTask, Command, Delta};
use crate::storyteller::{Storyteller, TextGenerator};

/// Runs AI requests off the UI thread, one at a time, until the command
/// channel closes or `Shutdown` arrives.
pub fn spawn_ai_worker<G>(
    storyteller: Storyteller<G>,
    population: Arc<Population>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<Command>,
) -> JoinHandle<()>
where
    G: TextGenerator + 'static,
{
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                Command::Shutdown => break,
                Command::Generate {
                    request_id,
                    task,
                    target,
                    other,
                    similar,
                    criteria,
                } => {
                    if tx.send(Delta::AiStarted { request_id, task }).is_err() {
                        break;
                    }
                    debug!(request_id, task = task.label(), player = %target, "ai request");
                    let result: Result<String> = match task {
                        AiTask::Profile => storyteller.player_description(&population, target),
                        AiTask::ScoutReport => storyteller.scout_report(&population, target),
                        AiTask::QuickSummary => storyteller.quick_summary(&population, target),
                        AiTask::Comparison => match other {
                            Some(other) => {
                                storyteller.comparison_narrative(&population, target, other)
                            }
                            None => Err(ScoutError::NotFound("second player for comparison".to_string())),
                        },
                        AiTask::Recommendation => storyteller.recommendation_explanation(
                            &population,
                            target,
                            &similar,
                            criteria.as_deref(),
                        ),
                    };
                    let delta = match result {
                        Ok(text) => Delta::AiText {
                            request_id,
                            task,
                            text,
                        },
                        Err(err) => {
                            warn!(request_id, task = task.label(), error = %err, "ai request failed");
                            Delta::AiFailed {
                                request_id,
                                task,
                                error: err.to_string(),
                            }
                        }
                    };
                    if tx.send(delta).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
