//! Terminal nodes: render the document and hand it to the sink.

use chrono::Local;
use tracing::{info, warn};

use crate::model::StudySessionState;
use crate::render::{render_document, render_forced_document};
use crate::sink::{OutputSink, suggested_filename};

/// Render the finished plan and persist it.
pub async fn format_output(sink: &dyn OutputSink, state: &mut StudySessionState) {
    let document = render_document(state);
    finish(sink, state, document, false).await;
}

/// Render the plan under the limited-resources disclaimer and persist it
/// with the limited marker in its filename.
pub async fn forced_output(sink: &dyn OutputSink, state: &mut StudySessionState) {
    let document = render_forced_document(state);
    finish(sink, state, document, true).await;
}

async fn finish(sink: &dyn OutputSink, state: &mut StudySessionState, document: String, limited: bool) {
    let filename = suggested_filename(&state.topic, Local::now(), limited);
    match sink.persist(&document, &filename).await {
        Ok(path) => info!(path = %path.display(), limited, "study plan saved"),
        Err(e) => warn!(filename = %filename, error = %e, "failed to save study plan"),
    }
    state.set_final_output(document);
}
