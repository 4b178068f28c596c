//! Assertion utilities for pipeline outputs.

use docflow_core::{DataPacket, PipelineOutputs};
use thiserror::Error;

/// Error type for output validation failures
#[derive(Debug, Error, PartialEq)]
pub enum OutputAssertionError {
    #[error("Component '{0}' produced no outputs")]
    NotReached(String),

    #[error("Component '{component}' did not emit on '{socket}'")]
    MissingSocket { component: String, socket: String },

    #[error("Component '{0}' was expected to be skipped but ran")]
    UnexpectedlyReached(String),
}

/// Returns the value a component emitted on a socket.
///
/// # Returns
///
/// * `Ok(&DataPacket)` - If the socket was emitted
/// * `Err(OutputAssertionError)` - If the component or socket is absent
pub fn emitted<'a>(
    outputs: &'a PipelineOutputs,
    component: &str,
    socket: &str,
) -> Result<&'a DataPacket, OutputAssertionError> {
    let sockets = outputs
        .get(component)
        .ok_or_else(|| OutputAssertionError::NotReached(component.to_string()))?;
    sockets
        .get(socket)
        .ok_or_else(|| OutputAssertionError::MissingSocket {
            component: component.to_string(),
            socket: socket.to_string(),
        })
}

/// Asserts that a component never ran.
pub fn assert_not_reached(outputs: &PipelineOutputs, component: &str) -> Result<(), OutputAssertionError> {
    if outputs.contains_key(component) {
        return Err(OutputAssertionError::UnexpectedlyReached(component.to_string()));
    }
    Ok(())
}
