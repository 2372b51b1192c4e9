//! Step functions for the flow-to-depth pipeline.
//!
//! Stages run in order: gradients, dense flow, epipole, depth. Each step
//! reads the results of the previous one from the session state and fails
//! with a descriptive error when it is missing.

use anyhow::{Context, Result, anyhow};
use log::info;
use vision_flow_core::{FrameVolume, Mat3};
use vision_flow_linear::prelude::*;

use crate::config::FlowDepthConfig;
use crate::estimate::{FlowDepthEstimate, FlowDepthReport};
use crate::session::FlowDepthSession;

fn record<T>(session: &mut FlowDepthSession, operation: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        session.log_failure(operation, format!("{err:#}"));
    }
    result
}

/// Compute `Ix`, `Iy`, `It` over the whole stack and keep the selected frame.
pub fn step_gradients(session: &mut FlowDepthSession) -> Result<()> {
    session.validate()?;
    let input = session.require_input()?;
    let t = session.config.resolve_frame(input.frames.frames())?;

    let slice = compute_gradients(&input.frames)
        .slice(t)
        .with_context(|| format!("failed to slice gradients at frame {t}"));
    let slice = record(session, "gradients", slice)?;

    let (h, w) = slice.ix.shape();
    info!("gradients: {h}x{w}, frame {t}");
    session.state.frame_index = Some(t);
    session.state.gradients = Some(slice);
    session.state.clear_flow();
    session.log_success("gradients", format!("frame={t}"));
    Ok(())
}

/// Dense Lucas-Kanade flow on the selected frame.
pub fn step_flow(session: &mut FlowDepthSession) -> Result<()> {
    let slice = session
        .state
        .gradients
        .as_ref()
        .ok_or_else(|| anyhow!("gradients required before flow"))?;
    let size = session.config.patch_size;

    let dense = flow_lk_slice(slice, size).context("dense flow failed");
    let dense = record(session, "flow", dense)?;

    let max_conf = dense.confidence.max();
    info!("flow: patch size {size}, max confidence {max_conf:.3}");
    session.state.flow = Some(dense);
    session.state.epipole = None;
    session.log_success("flow", format!("patch_size={size}, max_confidence={max_conf:.3}"));
    Ok(())
}

/// Epipole from the confident flow vectors.
pub fn step_epipole(session: &mut FlowDepthSession) -> Result<()> {
    let dense = session
        .state
        .flow
        .as_ref()
        .ok_or_else(|| anyhow!("flow required before epipole"))?;
    let threshold = session.config.epipole_threshold;

    let est = EpipoleEstimator::estimate(
        &dense.flow.u,
        &dense.flow.v,
        &dense.confidence,
        threshold,
        &session.config.epipole_opts(),
    )
    .context("epipole estimation failed");
    let est = record(session, "epipole", est)?;

    info!(
        "epipole: ({:.3}, {:.3}, {:.3}) from {} of {} points",
        est.epipole.x, est.epipole.y, est.epipole.z, est.num_points, est.num_candidates
    );
    session.log_success(
        "epipole",
        format!(
            "points={}, residual={:.3e}",
            est.num_points, est.residual
        ),
    );
    session.state.epipole = Some(est);
    Ok(())
}

/// Normalized depth map; stores the final [`FlowDepthEstimate`].
pub fn step_depth(session: &mut FlowDepthSession) -> Result<()> {
    let k = session.require_input()?.intrinsics;
    let (Some(t), Some(dense), Some(est)) = (
        session.state.frame_index,
        session.state.flow.clone(),
        session.state.epipole.clone(),
    ) else {
        return Err(anyhow!("flow and epipole required before depth"));
    };

    let (h, w) = dense.flow.shape();
    let epipole_pixel = epipole_to_pixel(&est.epipole, w, h);
    let depth_map = depth(
        &dense.flow,
        &dense.confidence,
        &epipole_pixel,
        &k,
        session.config.depth_threshold,
    )
    .context("depth reconstruction failed");
    let depth_map = record(session, "depth", depth_map)?;

    let depth_pixels = depth_map.iter().filter(|&&d| d > 0.0).count();
    info!("depth: {depth_pixels} of {} pixels", h * w);

    let report = FlowDepthReport {
        frame_index: t,
        patch_size: session.config.patch_size,
        epipole_candidates: est.num_candidates,
        epipole_points: est.num_points,
        epipole_residual: est.residual,
        depth_pixels,
    };
    let output = FlowDepthEstimate {
        flow: dense.flow,
        confidence: dense.confidence,
        epipole_centered: est.epipole,
        epipole_pixel,
        depth: depth_map,
        report,
    };
    session.set_output(output);
    session.log_success("depth", format!("pixels={depth_pixels}"));
    Ok(())
}

/// Run every step on a session that already has input.
pub fn run_session(session: &mut FlowDepthSession) -> Result<()> {
    step_gradients(session)?;
    step_flow(session)?;
    step_epipole(session)?;
    step_depth(session)?;
    Ok(())
}

/// Gradients, dense flow, epipole and depth for one frame stack.
///
/// # Errors
///
/// Fails when the config is invalid for the input or when a stage has no
/// usable data, e.g. a textureless sequence leaves no confident flow for the
/// epipole.
pub fn run_flow_depth(
    frames: &FrameVolume,
    k: &Mat3,
    config: &FlowDepthConfig,
) -> Result<FlowDepthEstimate> {
    let mut session = FlowDepthSession::with_config(config.clone())?;
    session.set_input(frames.clone(), *k)?;
    run_session(&mut session)?;
    session.require_output().cloned()
}
