//! Runtime for a single-page portfolio: the animated torus-knot hero and the
//! navigation behaviour of the page around it.
//!
//! Everything that touches a real page or window sits behind the seams in
//! [`host`] and [`render`], so the lifecycle and navigation logic run the same
//! in the browser, in a desktop window and in headless tests.

pub mod app;
pub mod camera;
pub mod config;
pub mod content;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod hero;
pub mod host;
pub mod nav;
pub mod render;
pub mod reveal;
pub mod scene;
pub mod scroll;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{HeadlessSession, PageSession, SessionScript};
pub use camera::PerspectiveCamera;
pub use config::{HeroConfig, KnotParams, NavConfig, RendererOptions};
pub use content::SiteContent;
pub use error::{HostError, NavError, RenderError};
pub use hero::{HeroMount, HeroScene};
pub use host::queued::{HeadlessRegion, QueuedScheduler, SignalHub};
pub use host::{FrameScheduler, HostRegion, HostServices, Subscription, ViewportSignals};
pub use nav::{NavigationController, Section, SectionAnchor, ViewportState};
pub use render::{HeadlessRenderer, RenderStats, Renderer};
pub use reveal::RevealTracker;
pub use scroll::{PageAnchor, PageScroller};
