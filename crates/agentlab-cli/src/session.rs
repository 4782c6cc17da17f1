//! NDJSON session driver for `agentlab session`.
//!
//! Each input line is one request tagged by `op`; each request produces
//! exactly one response line. Blank lines and lines starting with `#` are
//! skipped. A failing request never stops the session.
//!
//! ```text
//! {"op":"create","name":"Scout","role":"Explorer","goal":"Map","backstory":"Sailor"}
//! {"op":"update","agent":"Scout","goal":"Chart the coast"}
//! {"op":"experiment","agent":"Scout","name":"Bench","prompt":"Hello","max_iterations":5}
//! {"op":"list"}
//! {"op":"delete","agent":"Scout"}
//! ```

use std::sync::Arc;

use agentlab_core::{
    agent_count_label, chart_rows, winner_line, AgentDraft, AgentPatch, ExperimentEvent,
    ExperimentRequest, LabConfig, LabError, LabService, Notice, RecordingNotifier,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// One session request. Agents are referenced by id or exact name.
///
/// Missing `create` and `experiment` text fields deserialize as empty so they
/// surface as validation failures rather than parse errors.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Create {
        #[serde(default)]
        name: String,
        #[serde(default)]
        role: String,
        #[serde(default)]
        goal: String,
        #[serde(default)]
        backstory: String,
    },
    Update(UpdateRequest),
    Delete {
        agent: String,
    },
    List,
    Experiment {
        agent: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        prompt: String,
        /// Falls back to the configured default budget.
        #[serde(default)]
        max_iterations: Option<u32>,
    },
}

/// Fields of an `update` request. Unknown keys are rejected so a misspelled
/// field is a parse error instead of a silently empty patch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdateRequest {
    pub agent: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub backstory: Option<String>,
}

impl UpdateRequest {
    fn patch(&self) -> AgentPatch {
        AgentPatch {
            name: self.name.clone(),
            role: self.role.clone(),
            goal: self.goal.clone(),
            backstory: self.backstory.clone(),
        }
    }
}

impl Request {
    fn op(&self) -> &'static str {
        match self {
            Request::Create { .. } => "create",
            Request::Update(_) => "update",
            Request::Delete { .. } => "delete",
            Request::List => "list",
            Request::Experiment { .. } => "experiment",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Response {
    /// 1-based input line number.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<&'static str>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    /// Offending field for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl From<&LabError> for ErrorBody {
    fn from(err: &LabError) -> Self {
        let field = match err {
            LabError::Validation(v) => Some(v.field()),
            _ => None,
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            field,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub requests: usize,
    pub failed: usize,
}

pub struct Session {
    lab: LabService,
    notices: Arc<RecordingNotifier>,
}

impl Session {
    pub fn new(config: LabConfig) -> Self {
        let notices = Arc::new(RecordingNotifier::new());
        let lab = LabService::new(config, notices.clone());
        Self { lab, notices }
    }

    pub fn lab(&self) -> &LabService {
        &self.lab
    }

    /// Read requests from `reader` until EOF, writing one response per request.
    pub async fn run<R, W>(&mut self, reader: R, writer: &mut W) -> Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut summary = SessionSummary::default();
        let mut line_no = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read session input")?
        {
            line_no += 1;
            let Some(response) = self.handle_line(line_no, &line).await else {
                continue;
            };
            summary.requests += 1;
            if !response.ok {
                summary.failed += 1;
            }

            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer
                .write_all(out.as_bytes())
                .await
                .context("Failed to write session output")?;
            writer.flush().await?;
        }
        Ok(summary)
    }

    /// Handle one input line. Returns `None` for blank and comment lines.
    pub async fn handle_line(&mut self, line_no: usize, line: &str) -> Option<Response> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let request: Request = match serde_json::from_str(trimmed) {
            Ok(request) => request,
            Err(err) => {
                warn!(line = line_no, error = %err, "unparseable session request");
                return Some(Response {
                    line: line_no,
                    op: None,
                    ok: false,
                    result: None,
                    error: Some(ErrorBody {
                        kind: "parse",
                        message: err.to_string(),
                        field: None,
                    }),
                    notices: Vec::new(),
                });
            }
        };

        let op = request.op();
        debug!(line = line_no, op, "session request");
        let outcome = self.execute(request).await;
        let notices = self.notices.drain();

        Some(match outcome {
            Ok(result) => Response {
                line: line_no,
                op: Some(op),
                ok: true,
                result: Some(result),
                error: None,
                notices,
            },
            Err(err) => Response {
                line: line_no,
                op: Some(op),
                ok: false,
                result: None,
                error: Some(ErrorBody::from(&err)),
                notices,
            },
        })
    }

    async fn execute(&mut self, request: Request) -> agentlab_core::Result<Value> {
        match request {
            Request::Create {
                name,
                role,
                goal,
                backstory,
            } => {
                let agent = self
                    .lab
                    .create_agent(AgentDraft::new(name, role, goal, backstory))?;
                Ok(json!({ "agent": agent }))
            }
            Request::Update(update) => {
                let id = self.lab.resolve(&update.agent)?;
                let agent = self.lab.update_agent(id, update.patch())?;
                Ok(json!({ "agent": agent }))
            }
            Request::Delete { agent } => {
                let id = self.lab.resolve(&agent)?;
                let agent = self.lab.delete_agent(id)?;
                Ok(json!({ "agent": agent }))
            }
            Request::List => {
                let agents = self.lab.list_agents();
                Ok(json!({
                    "label": agent_count_label(agents.len()),
                    "agents": agents,
                }))
            }
            Request::Experiment {
                agent,
                name,
                prompt,
                max_iterations,
            } => {
                let id = self.lab.resolve(&agent)?;
                let budget = max_iterations.unwrap_or(self.lab.config().default_max_iterations);
                let run = self
                    .lab
                    .start_experiment(ExperimentRequest::new(id, name, prompt, budget))?;

                let mut progress_events = 0u32;
                let last = run
                    .finish(|event| {
                        if matches!(event, ExperimentEvent::Progress(_)) {
                            progress_events += 1;
                        }
                    })
                    .await;

                Ok(match last {
                    Some(ExperimentEvent::Completed(outcome)) => json!({
                        "status": "complete",
                        "progress_events": progress_events,
                        "winner": winner_line(&outcome),
                        "chart": chart_rows(&outcome.snapshot),
                        "outcome": outcome,
                    }),
                    Some(ExperimentEvent::Cancelled(snapshot)) => json!({
                        "status": "cancelled",
                        "progress_events": progress_events,
                        "chart": chart_rows(&snapshot),
                    }),
                    _ => json!({ "status": "stopped", "progress_events": progress_events }),
                })
            }
        }
    }
}
