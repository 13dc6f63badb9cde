use thiserror::Error;

use crate::nav::Section;

/// Failures reported by the hosting page or windowing layer.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host region is not attached to the page")]
    Detached,
    #[error("frame scheduling failed: {0}")]
    Schedule(String),
    #[error("dom operation failed: {0}")]
    Dom(String),
}

/// Failures reported by a [`Renderer`](crate::render::Renderer).
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer has been disposed")]
    Disposed,
    #[error("failed to create rendering surface: {0}")]
    CreateSurface(String),
    #[error("no compatible graphics adapter: {0}")]
    Adapter(String),
    #[error("failed to create graphics device: {0}")]
    Device(String),
    #[error("surface error: {0}")]
    Surface(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("unknown section name {0:?}")]
    UnknownSection(String),
    #[error("section {0} has no registered anchor")]
    Unregistered(Section),
}
