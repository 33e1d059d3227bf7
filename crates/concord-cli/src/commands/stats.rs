//! `concord stats`: print observation bus statistics once and exit.

use std::sync::Arc;

use crate::state::AppState;

pub fn run(state: &Arc<AppState>) -> anyhow::Result<()> {
    let stats = state.observation.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
