//! Flow-to-depth session container with mutable state.
//!
//! The session stores configuration, the input frames and intrinsics, the
//! intermediate results of every stage, and the final estimate. Step
//! functions in [`crate::steps`] mutate it in place.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use vision_flow_core::{FrameVolume, Mat3};
use vision_flow_linear::prelude::*;

use crate::config::FlowDepthConfig;
use crate::estimate::FlowDepthEstimate;

/// Frames and camera intrinsics processed by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDepthInput {
    /// `(H, W, N)` grayscale frame stack.
    pub frames: FrameVolume,
    /// Camera matrix `K`.
    pub intrinsics: Mat3,
}

/// Intermediate results, filled stage by stage.
#[derive(Debug, Clone, Default)]
pub struct FlowDepthState {
    /// Frame the flow was solved on.
    pub frame_index: Option<usize>,
    pub gradients: Option<GradientSlice>,
    pub flow: Option<DenseFlow>,
    pub epipole: Option<EpipoleEstimate>,
}

impl FlowDepthState {
    /// Drop every result downstream of the gradients.
    pub fn clear_flow(&mut self) {
        self.flow = None;
        self.epipole = None;
    }
}

/// One entry of the session operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub operation: String,
    pub success: bool,
    pub notes: Option<String>,
}

impl LogEntry {
    pub fn success(operation: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            operation: operation.into(),
            success: true,
            notes: Some(notes.into()),
        }
    }

    pub fn failure(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            operation: operation.into(),
            success: false,
            notes: Some(error.into()),
        }
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A flow-to-depth session.
///
/// - Setting new input clears the state and the output.
/// - Setting a new config validates it and clears the state and the output;
///   every stage depends on it.
#[derive(Debug, Clone, Default)]
pub struct FlowDepthSession {
    pub config: FlowDepthConfig,
    input: Option<FlowDepthInput>,
    pub state: FlowDepthState,
    output: Option<FlowDepthEstimate>,
    /// Operation log.
    pub log: Vec<LogEntry>,
}

impl FlowDepthSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with a validated config.
    pub fn with_config(config: FlowDepthConfig) -> Result<Self> {
        let mut session = Self::new();
        session.set_config(config)?;
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the input, clearing state and output.
    pub fn set_input(&mut self, frames: FrameVolume, intrinsics: Mat3) -> Result<()> {
        let (h, w, n) = frames.shape();
        if h == 0 || w == 0 || n == 0 {
            return Err(anyhow!("frame volume is empty: {h}x{w}x{n}"));
        }
        self.input = Some(FlowDepthInput { frames, intrinsics });
        self.state = FlowDepthState::default();
        self.output = None;
        Ok(())
    }

    pub fn input(&self) -> Option<&FlowDepthInput> {
        self.input.as_ref()
    }

    pub fn require_input(&self) -> Result<&FlowDepthInput> {
        self.input
            .as_ref()
            .ok_or_else(|| anyhow!("input not set"))
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the config after validating it, clearing state and output.
    pub fn set_config(&mut self, config: FlowDepthConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.state = FlowDepthState::default();
        self.output = None;
        Ok(())
    }

    /// Update the configuration with a closure, then validate it.
    pub fn update_config<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut FlowDepthConfig),
    {
        let mut config = self.config.clone();
        f(&mut config);
        self.set_config(config)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────────

    pub fn output(&self) -> Option<&FlowDepthEstimate> {
        self.output.as_ref()
    }

    pub fn require_output(&self) -> Result<&FlowDepthEstimate> {
        self.output
            .as_ref()
            .ok_or_else(|| anyhow!("output not computed"))
    }

    pub fn set_output(&mut self, output: FlowDepthEstimate) {
        self.output = Some(output);
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Serialize the current output as pretty JSON.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.require_output()?)?)
    }

    /// Check that input is present and config is valid.
    pub fn validate(&self) -> Result<()> {
        let input = self.require_input()?;
        self.config.validate()?;
        self.config.resolve_frame(input.frames.frames())?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    pub fn log_success(&mut self, operation: impl Into<String>, notes: impl Into<String>) {
        self.log.push(LogEntry::success(operation, notes));
    }

    pub fn log_failure(&mut self, operation: impl Into<String>, error: impl Into<String>) {
        self.log.push(LogEntry::failure(operation, error));
    }
}
