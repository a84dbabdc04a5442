//! Accumulator inspection for entities defined with `inspect: true`

use tracing::info;

use crate::accumulator::Accumulator;

/// Log the accumulator and hand it to the caller's inspect callback
pub(crate) fn inspect(acc: &Accumulator) {
    info!(
        target: "refract::inspect",
        entity = acc.entity_id().unwrap_or("-"),
        value = %acc.value(),
        locals = %acc.locals(),
        "Inspecting accumulator"
    );
    if let Some(callback) = acc.params().inspect() {
        callback(acc);
    }
}
