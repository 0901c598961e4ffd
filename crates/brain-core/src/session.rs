use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Session status. Transitions are enforced by `brain-session`'s state
/// machine; `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Paused,
    Complete,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Complete => "COMPLETE",
        };
        write!(f, "{s}")
    }
}

/// Operating mode of a session; governs which tool classes the gate admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Analysis,
    Planning,
    Coding,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeHistoryEntry {
    pub mode: SessionMode,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCategory {
    Fact,
    Decision,
    Requirement,
    Technique,
    Insight,
    Problem,
    Solution,
    Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub category: ObservationCategory,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Implements,
    DependsOn,
    RelatesTo,
    Extends,
    PartOf,
    InspiredBy,
    Contains,
    PairsWith,
    Supersedes,
    LeadsTo,
    CausedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub relation_type: RelationType,
    pub target: String,
    pub context: Option<String>,
}

/// Tagged-variant reification of the orchestrator's dynamically-typed
/// workflow record from the source system (see design notes: "Dynamic
/// typing in the source").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowRecord {
    ActiveAgent { agent_kind: String },
    Phase { phase_kind: String },
    Decision { summary: String, rationale: String },
    Verdict { summary: String, passed: bool },
    Handoff { from_agent: String, to_agent: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorWorkflow {
    pub active_agent: Option<String>,
    pub phase: Option<String>,
    #[serde(default)]
    pub agent_history: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<WorkflowRecord>,
    #[serde(default)]
    pub verdicts: Vec<WorkflowRecord>,
    #[serde(default)]
    pub pending_handoffs: Vec<WorkflowRecord>,
    #[serde(default)]
    pub compaction_history: Vec<String>,
}

/// The durable, signed record of an agent's working context.
///
/// `signature` covers every other field, canonically serialized (see
/// `brain-session::codec`); it is skipped by the signing input itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub version: u64,
    pub status: SessionStatus,
    pub current_mode: SessionMode,
    pub mode_history: Vec<ModeHistoryEntry>,
    pub active_task: Option<String>,
    pub active_feature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub protocol_start_complete: bool,
    pub protocol_end_complete: bool,
    pub protocol_start_evidence: BTreeMap<String, Value>,
    pub protocol_end_evidence: BTreeMap<String, Value>,
    pub orchestrator_workflow: Option<OrchestratorWorkflow>,
    pub signature: String,
}

impl SessionState {
    /// A fresh IN_PROGRESS session at version 1, unsigned (caller must sign
    /// before persisting).
    pub fn new(session_id: impl Into<String>, topic: Option<String>, now: DateTime<Utc>) -> Self {
        let mut protocol_start_evidence = BTreeMap::new();
        if let Some(t) = topic {
            protocol_start_evidence.insert("topic".to_string(), Value::String(t));
        }
        Self {
            session_id: session_id.into(),
            version: 1,
            status: SessionStatus::InProgress,
            current_mode: SessionMode::Analysis,
            mode_history: vec![ModeHistoryEntry {
                mode: SessionMode::Analysis,
                timestamp: now,
            }],
            active_task: None,
            active_feature: None,
            created_at: now,
            updated_at: now,
            protocol_start_complete: false,
            protocol_end_complete: false,
            protocol_start_evidence,
            protocol_end_evidence: BTreeMap::new(),
            orchestrator_workflow: None,
            signature: String::new(),
        }
    }
}
