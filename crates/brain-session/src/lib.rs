//! Signed, optimistically-locked session state with its status machine.

mod codec;
mod state_machine;
mod store;

pub use codec::{canonical_json, sign, verify};
pub use state_machine::{classify_tool, evaluate_gate, GateDecision, ToolClass};
pub use store::SessionStore;
