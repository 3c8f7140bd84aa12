// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the error types for the graphics context layer.

use super::context::ContextId;
use std::fmt;

/// An error related to creating or switching graphics contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The platform refused to create the context.
    CreationFailed(String),
    /// The context is current on a different thread.
    CurrentOnOtherThread(ContextId),
    /// The operation requires the context to be current on the calling thread.
    NotCurrent(ContextId),
    /// The context was destroyed or the driver lost it.
    ContextLost(ContextId),
    /// An error originating from the specific backend implementation.
    Backend(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::CreationFailed(msg) => write!(f, "Failed to create context: {msg}"),
            ContextError::CurrentOnOtherThread(id) => {
                write!(f, "Context {id} is current on another thread")
            }
            ContextError::NotCurrent(id) => {
                write!(f, "Context {id} is not current on the calling thread")
            }
            ContextError::ContextLost(id) => write!(f, "Context {id} was lost"),
            ContextError::Backend(msg) => write!(f, "Backend-specific context error: {msg}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// An error related to the creation or use of a GPU object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No context is current on the calling thread.
    NoCurrentContext,
    /// The handle does not name a live object visible from the current context.
    InvalidHandle,
    /// The supplied data does not match the declared size or layout.
    InvalidData(String),
    /// The driver could not allocate the object.
    OutOfMemory,
    /// A context-level failure surfaced while issuing the command.
    Context(ContextError),
    /// An error originating from the specific backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NoCurrentContext => {
                write!(f, "No graphics context is current on this thread.")
            }
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::InvalidData(msg) => write!(f, "Invalid resource data: {msg}"),
            ResourceError::OutOfMemory => write!(f, "Out of GPU memory."),
            ResourceError::Context(err) => write!(f, "Context error: {err}"),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Context(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContextError> for ResourceError {
    fn from(err: ContextError) -> Self {
        ResourceError::Context(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn context_error_display() {
        let err = ContextError::CurrentOnOtherThread(ContextId(7));
        assert_eq!(format!("{err}"), "Context ctx#7 is current on another thread");
    }

    #[test]
    fn resource_error_wraps_context_error() {
        let res_err: ResourceError = ContextError::ContextLost(ContextId(2)).into();
        assert_eq!(
            format!("{res_err}"),
            "Context error: Context ctx#2 was lost"
        );
        assert!(res_err.source().is_some());
        assert!(ResourceError::OutOfMemory.source().is_none());
    }
}
