use brain_core::error::BrainError;
use brain_core::session::{SessionMode, SessionState, SessionStatus};

/// The transitions recognized by the status table. `Create` has no
/// predecessor state; the other three each require exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Resume,
    Pause,
    Complete,
}

impl Transition {
    fn required_from(self) -> Option<SessionStatus> {
        match self {
            Transition::Create => None,
            Transition::Resume => Some(SessionStatus::Paused),
            Transition::Pause => Some(SessionStatus::InProgress),
            Transition::Complete => Some(SessionStatus::InProgress),
        }
    }

    fn target(self) -> SessionStatus {
        match self {
            Transition::Create | Transition::Resume => SessionStatus::InProgress,
            Transition::Pause => SessionStatus::Paused,
            Transition::Complete => SessionStatus::Complete,
        }
    }
}

/// Validates `transition` against `current`, per the status table:
///
/// | From -> To | IN_PROGRESS | PAUSED | COMPLETE |
/// |---|---|---|---|
/// | none (create) | v | - | - |
/// | IN_PROGRESS | - | v | v |
/// | PAUSED | v | - | x |
/// | COMPLETE | x | x | x |
pub fn validate_transition(
    session_id: &str,
    current: Option<SessionStatus>,
    transition: Transition,
) -> Result<(), BrainError> {
    if current == transition.required_from() {
        return Ok(());
    }
    Err(BrainError::InvalidStatusTransition {
        session_id: session_id.to_string(),
        from: current.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()),
        to: transition.target().to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    ReadOnly,
    Destructive,
}

/// Classifies a tool name; unknown names are treated as destructive
/// (fail-closed rather than silently permissive).
pub fn classify_tool(name: &str) -> ToolClass {
    match name {
        "Read" | "Glob" | "Grep" | "LSP" | "WebFetch" | "WebSearch" => ToolClass::ReadOnly,
        _ => ToolClass::Destructive,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny { reason: String },
}

/// Tool-admission gate. `session` is `None` when no current session exists
/// or its signature failed verification (the caller must have already
/// turned a failed `verify` into `session = None` before calling this).
///
/// Mode policy (an implementation decision the source left to us): analysis
/// and planning modes admit only read-only tools; coding admits both;
/// disabled is an explicit opt-out handled before mode policy runs.
pub fn evaluate_gate(session: Option<&SessionState>, tool: ToolClass) -> GateDecision {
    if let Some(state) = session {
        if state.current_mode == SessionMode::Disabled {
            return GateDecision::Allow;
        }
    }

    let Some(state) = session else {
        return fail_closed(tool, "session unavailable");
    };

    match (state.current_mode, tool) {
        (SessionMode::Coding, _) => GateDecision::Allow,
        (_, ToolClass::ReadOnly) => GateDecision::Allow,
        (SessionMode::Analysis, ToolClass::Destructive) => deny("analysis mode is read-only"),
        (SessionMode::Planning, ToolClass::Destructive) => deny("planning mode forbids destructive tools"),
        (SessionMode::Disabled, ToolClass::Destructive) => GateDecision::Allow,
    }
}

/// Fail-closed path used when the session is unavailable or its signature
/// didn't verify: allow read-only tools, block destructive ones.
fn fail_closed(tool: ToolClass, reason: &str) -> GateDecision {
    match tool {
        ToolClass::ReadOnly => GateDecision::Allow,
        ToolClass::Destructive => deny(reason),
    }
}

fn deny(reason: &str) -> GateDecision {
    GateDecision::Deny { reason: reason.to_string() }
}
