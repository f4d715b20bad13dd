//! HTTP router tree. Each submodule owns one endpoint family and exposes a
//! `Router<AppState>` builder; `lib.rs::build_router` composes them with the auth and
//! rate-limit middleware layers spec §4.7 assigns per family.

pub mod admin;
pub mod analytics;
pub mod health;
pub mod pagination;
pub mod repos;
pub mod research;

use crate::error::{CursorSimError, Result};
use crate::state::AppState;

/// Every endpoint except `/health` and the research endpoints is unavailable once the
/// process is running in replay mode (spec §4.6): there is no store to query.
pub fn require_runtime(state: &AppState) -> Result<()> {
    if state.is_replay() {
        Err(CursorSimError::ModeNotSupported(
            "this endpoint requires runtime mode".into(),
        ))
    } else {
        Ok(())
    }
}
