//! Error types for the drone control and telemetry pipeline.
//!
//! Every failure in this crate is either absorbed (bad data is dropped and
//! the pipeline keeps going) or surfaced once to the host as a
//! [`Notification`](crate::worker::Notification). Nothing here terminates the
//! host process.
//!
//! ## Error Categories
//!
//! - **Malformed packets**: navigation or recording data failing validation
//! - **Decoder failures**: the external video codec rejected a unit
//! - **Worker faults**: unexpected failures inside a worker's handler
//! - **Sink I/O**: read/write failures in the recorder or player (fatal to that worker)
//! - **Configuration**: invalid settings, YAML errors, axis conflicts in objectives
//!
//! ## Classification
//!
//! ```rust
//! use dronewire::DroneError;
//!
//! let error = DroneError::malformed("navdata header", "bad magic 0xdeadbeef");
//! assert!(error.is_absorbed());
//! assert!(!error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use thiserror::Error;

use crate::autopilot::Axis;

/// Result type alias for drone pipeline operations.
pub type Result<T, E = DroneError> = std::result::Result<T, E>;

/// Main error type for the pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DroneError {
    #[error("Malformed packet in {context}: {details}")]
    MalformedPacket { context: String, details: String },

    #[error("Video decoder rejected input: {details}")]
    DecoderFailure { details: String },

    #[error("Worker '{worker}' handler fault: {details}")]
    WorkerFault { worker: String, details: String },

    #[error("Sink I/O failure during {context}: {source}")]
    SinkIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Objective has more than one intent driving the {axis:?} axis")]
    AxisConflict { axis: Axis },

    #[error("Worker '{worker}' is in the wrong state: {details}")]
    WorkerState { worker: String, details: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Autopilot is not bound to a drone client")]
    NotBound,
}

impl DroneError {
    /// Fatal errors stop the worker that raised them. The rest of the
    /// pipeline keeps running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DroneError::SinkIo { .. })
    }

    /// Absorbed errors are dropped on the floor: the offending packet or
    /// frame is skipped and processing continues without a notification.
    pub fn is_absorbed(&self) -> bool {
        matches!(self, DroneError::MalformedPacket { .. } | DroneError::DecoderFailure { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DroneError::MalformedPacket { .. } => vec![
                "Check the drone firmware emits navdata in demo mode",
                "Verify the recording was produced by this library",
            ],
            DroneError::DecoderFailure { .. } => vec![
                "Wait for the next keyframe",
                "Check the configured pixel layout matches the decoder",
            ],
            DroneError::WorkerFault { .. } => vec![
                "Inspect the handler for panics",
                "Restart the affected worker",
            ],
            DroneError::SinkIo { .. } => vec![
                "Check the recording path is writable",
                "Ensure sufficient disk space",
                "Verify the recording file is not truncated",
            ],
            DroneError::AxisConflict { .. } => {
                vec!["Split the intents across separate objectives", "Use one intent per axis"]
            }
            DroneError::WorkerState { .. } => {
                vec!["Call start() exactly once", "Follow stop() with join() before restarting"]
            }
            DroneError::Config { .. } | DroneError::Yaml(_) => vec![
                "Check the configuration file syntax",
                "Compare against the documented defaults",
            ],
            DroneError::NotBound => vec!["Call bind_to_client() before emitting commands"],
        }
    }

    /// Helper constructor for malformed packet errors.
    pub fn malformed(context: impl Into<String>, details: impl Into<String>) -> Self {
        DroneError::MalformedPacket { context: context.into(), details: details.into() }
    }

    /// Helper constructor for video decoder rejections.
    pub fn decoder_failure(details: impl Into<String>) -> Self {
        DroneError::DecoderFailure { details: details.into() }
    }

    /// Helper constructor for sink/source I/O failures.
    pub fn sink_io(context: impl Into<String>, source: std::io::Error) -> Self {
        DroneError::SinkIo { context: context.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        DroneError::Config { details: details.into() }
    }

    /// Helper constructor for lifecycle misuse.
    pub fn worker_state(worker: impl Into<String>, details: impl Into<String>) -> Self {
        DroneError::WorkerState { worker: worker.into(), details: details.into() }
    }
}

impl From<std::io::Error> for DroneError {
    fn from(err: std::io::Error) -> Self {
        DroneError::SinkIo { context: "<unknown>".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                context in "[a-z ]{1,20}",
                details in ".*",
                worker in "\\w+",
            ) {
                let malformed = DroneError::malformed(context.clone(), details.clone());
                let msg = malformed.to_string();
                prop_assert!(msg.contains(&context));
                prop_assert!(msg.contains(&details));

                let fault = DroneError::WorkerFault { worker: worker.clone(), details: details.clone() };
                prop_assert!(fault.to_string().contains(&worker));
                prop_assert!(!fault.is_fatal());
            }

            #[test]
            fn io_conversion_keeps_the_source_message(reason in ".*") {
                let io_err = std::io::Error::other(reason.clone());
                let converted: DroneError = io_err.into();
                prop_assert!(converted.is_fatal());
                let source = std::error::Error::source(&converted).map(|s| s.to_string());
                prop_assert_eq!(source, Some(reason));
            }
        }
    }

    #[test]
    fn sink_io_message_names_the_io_error() {
        let err = DroneError::sink_io("write", std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "Sink I/O failure during write: disk full");
    }

    #[test]
    fn classification_matches_propagation_policy() {
        assert!(DroneError::malformed("navdata", "short").is_absorbed());
        assert!(DroneError::decoder_failure("corrupt slice").is_absorbed());
        assert!(
            DroneError::sink_io("recording write", std::io::Error::other("disk full")).is_fatal()
        );
        assert!(!DroneError::NotBound.is_fatal());
        assert!(!DroneError::AxisConflict { axis: Axis::Yaw }.is_absorbed());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            DroneError::malformed("a", "b"),
            DroneError::decoder_failure("c"),
            DroneError::WorkerFault { worker: "w".into(), details: "d".into() },
            DroneError::sink_io("e", std::io::Error::other("f")),
            DroneError::AxisConflict { axis: Axis::Pitch },
            DroneError::worker_state("w", "already started"),
            DroneError::config("tick interval"),
            DroneError::NotBound,
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn error_is_send_sync_static() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<DroneError>();
    }
}
