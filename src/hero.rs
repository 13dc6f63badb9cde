//! Lifecycle of the decorative torus knot drawn in the page header.
//!
//! A [`HeroScene`] owns everything it allocates: the renderer, the mesh
//! resources, the resize subscription and the frame loop. Each acquisition
//! has a matching release, and [`HeroScene::teardown`] runs them all in
//! reverse order exactly once.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use glam::Vec3;
use log::{debug, warn};

use crate::camera::{aspect_ratio, PerspectiveCamera};
use crate::config::{HeroConfig, RendererOptions};
use crate::error::RenderError;
use crate::frame_loop::FrameLoop;
use crate::geometry::torus_knot;
use crate::host::{HostRegion, HostServices, Subscription, ViewportEvent};
use crate::render::Renderer;
use crate::scene::{Geometry, GeometryId, Material, MaterialId, Mesh, MeshIndex, SceneGraph};

/// Everything that must be released together on teardown.
struct Stage<R> {
    renderer: R,
    camera: PerspectiveCamera,
    scene: SceneGraph,
    knot: MeshIndex,
    geometry: GeometryId,
    material: MaterialId,
    rotation_step: f32,
}

impl<R: Renderer> Stage<R> {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.renderer.set_size(width, height);
        self.camera.aspect = aspect_ratio(width, height);
        self.camera.update_projection_matrix();
    }

    fn advance(&mut self) {
        if let Some(knot) = self.scene.get_mut(self.knot) {
            knot.rotation.x += self.rotation_step;
            knot.rotation.y += self.rotation_step;
        }
        if let Err(err) = self.renderer.render(&self.scene, &self.camera) {
            warn!("hero frame failed: {err}");
        }
    }

    fn release<H>(mut self, host: &H)
    where
        H: HostRegion<Surface = R::Surface>,
    {
        let surface = self.renderer.output_surface();
        if host.contains_surface(surface) {
            if let Err(err) = host.remove_surface(surface) {
                warn!("failed to detach hero surface: {err}");
            }
        }
        self.renderer.release_geometry(self.geometry);
        self.renderer.release_material(self.material);
        self.renderer.dispose();
    }
}

type SharedStage<R> = Rc<RefCell<Option<Stage<R>>>>;

/// Size the hero renders at: the viewport's, as long as `host` can show a
/// surface at all. Resizes follow the same viewport reading.
pub fn hero_size<H: HostRegion>(host: &H, services: &HostServices) -> Option<(u32, u32)> {
    host.dimensions()?;
    let reading = services.signals.reading();
    (reading.width > 0 && reading.height > 0).then_some((reading.width, reading.height))
}

fn with_stage<R>(stage: &Weak<RefCell<Option<Stage<R>>>>, f: impl FnOnce(&mut Stage<R>)) {
    if let Some(stage) = stage.upgrade() {
        if let Some(stage) = stage.borrow_mut().as_mut() {
            f(stage);
        }
    }
}

/// A live hero scene bound to one host region.
pub struct HeroScene<H, R>
where
    H: HostRegion,
    R: Renderer<Surface = H::Surface>,
{
    host: Rc<H>,
    stage: SharedStage<R>,
    frame_loop: Option<FrameLoop>,
    resize: Option<Subscription>,
    torn_down: bool,
}

impl<H, R> HeroScene<H, R>
where
    H: HostRegion + 'static,
    R: Renderer<Surface = H::Surface> + 'static,
{
    /// Builds the scene inside `host` and starts animating it.
    ///
    /// Returns `None` without leaving anything behind when the region has no
    /// size or `create` cannot produce a renderer.
    pub fn initialize<F>(
        host: Rc<H>,
        services: &HostServices,
        config: &HeroConfig,
        create: F,
    ) -> Option<Self>
    where
        F: FnOnce(u32, u32, &RendererOptions) -> Result<R, RenderError>,
    {
        let Some((width, height)) = hero_size(host.as_ref(), services) else {
            debug!("hero region unavailable; skipping scene");
            return None;
        };
        match create(width, height, &config.renderer) {
            Ok(renderer) => Self::attach(host, services, config, renderer),
            Err(err) => {
                warn!("hero renderer unavailable: {err}");
                None
            }
        }
    }

    /// Builds the scene around an already created renderer. The renderer is
    /// disposed when the region turns out to be unusable.
    pub fn attach(
        host: Rc<H>,
        services: &HostServices,
        config: &HeroConfig,
        mut renderer: R,
    ) -> Option<Self> {
        let Some((width, height)) = hero_size(host.as_ref(), services) else {
            debug!("hero region went away before the renderer was ready");
            renderer.dispose();
            return None;
        };
        renderer.set_size(width, height);

        let geometry = Geometry::new(torus_knot(&config.knot));
        let material = Material::normal();
        let mut scene = SceneGraph::new();
        let knot = scene.add(Mesh::new(Arc::clone(&geometry), material));
        let stage = Stage {
            renderer,
            camera: PerspectiveCamera::from_config(config, width, height),
            scene,
            knot,
            geometry: geometry.id(),
            material: material.id(),
            rotation_step: config.rotation_step,
        };

        if let Err(err) = host.append_surface(stage.renderer.output_surface()) {
            warn!("failed to attach hero surface: {err}");
            stage.release(host.as_ref());
            return None;
        }

        let stage: SharedStage<R> = Rc::new(RefCell::new(Some(stage)));

        let resize_stage = Rc::downgrade(&stage);
        let resize = services.signals.listen(
            ViewportEvent::Resize,
            Box::new(move |reading| {
                with_stage(&resize_stage, |stage| {
                    stage.resize(reading.width, reading.height)
                })
            }),
        );

        let frame_stage = Rc::downgrade(&stage);
        let frame_loop = match FrameLoop::start(Rc::clone(&services.scheduler), move |_| {
            with_stage(&frame_stage, Stage::advance)
        }) {
            Ok(frame_loop) => frame_loop,
            Err(err) => {
                warn!("failed to start hero animation: {err}");
                drop(resize);
                let stage = stage.borrow_mut().take();
                if let Some(stage) = stage {
                    stage.release(host.as_ref());
                }
                return None;
            }
        };

        debug!("hero scene mounted at {width}x{height}");
        Some(Self {
            host,
            stage,
            frame_loop: Some(frame_loop),
            resize: Some(resize),
            torn_down: false,
        })
    }
}

impl<H, R> HeroScene<H, R>
where
    H: HostRegion,
    R: Renderer<Surface = H::Surface>,
{
    /// Matches the renderer output and camera aspect to a new viewport size.
    ///
    /// A zero width or height (a minimised window) is ignored, so the renderer
    /// keeps the last size it could actually draw at.
    pub fn on_resize(&self, width: u32, height: u32) {
        if let Some(stage) = self.stage.borrow_mut().as_mut() {
            stage.resize(width, height);
        }
    }

    /// Stops the animation and releases every resource. Safe to call more
    /// than once and after the host region has left the page.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.cancel();
        }
        if let Some(mut resize) = self.resize.take() {
            resize.cancel();
        }
        let stage = self.stage.borrow_mut().take();
        if let Some(stage) = stage {
            stage.release(self.host.as_ref());
        }
        debug!("hero scene torn down");
    }

    pub fn is_live(&self) -> bool {
        !self.torn_down
    }

    pub fn renderer_size(&self) -> Option<(u32, u32)> {
        self.stage
            .borrow()
            .as_ref()
            .map(|stage| stage.renderer.size())
    }

    pub fn camera_aspect(&self) -> Option<f32> {
        self.stage.borrow().as_ref().map(|stage| stage.camera.aspect)
    }

    /// Current Euler rotation of the knot.
    pub fn rotation(&self) -> Option<Vec3> {
        self.stage
            .borrow()
            .as_ref()
            .and_then(|stage| stage.scene.get(stage.knot).map(|mesh| mesh.rotation))
    }

    /// Frame steps executed so far.
    pub fn frames(&self) -> u64 {
        self.frame_loop
            .as_ref()
            .map(FrameLoop::ticks)
            .unwrap_or_default()
    }
}

impl<H, R> Drop for HeroScene<H, R>
where
    H: HostRegion,
    R: Renderer<Surface = H::Surface>,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Proof that a mount was started; handed back when an asynchronously
/// created renderer becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountTicket(u64);

/// Keeps at most one live [`HeroScene`] per host region across repeated
/// mount and unmount calls.
pub struct HeroMount<H, R>
where
    H: HostRegion,
    R: Renderer<Surface = H::Surface>,
{
    generation: u64,
    pending: Option<u64>,
    scene: Option<HeroScene<H, R>>,
}

impl<H, R> Default for HeroMount<H, R>
where
    H: HostRegion,
    R: Renderer<Surface = H::Surface>,
{
    fn default() -> Self {
        Self {
            generation: 0,
            pending: None,
            scene: None,
        }
    }
}

impl<H, R> HeroMount<H, R>
where
    H: HostRegion + 'static,
    R: Renderer<Surface = H::Surface> + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        self.scene.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn scene(&self) -> Option<&HeroScene<H, R>> {
        self.scene.as_ref()
    }

    /// Mounts synchronously. Mounting while a scene is live or pending is a
    /// no-op; returns whether a scene is live afterwards.
    pub fn mount<F>(
        &mut self,
        host: Rc<H>,
        services: &HostServices,
        config: &HeroConfig,
        create: F,
    ) -> bool
    where
        F: FnOnce(u32, u32, &RendererOptions) -> Result<R, RenderError>,
    {
        if self.scene.is_some() || self.pending.is_some() {
            debug!("hero already mounted");
            return self.scene.is_some();
        }
        self.generation += 1;
        self.scene = HeroScene::initialize(host, services, config, create);
        self.scene.is_some()
    }

    /// Starts an asynchronous mount. Returns `None` while a scene is live or
    /// another mount is in flight.
    pub fn begin(&mut self) -> Option<MountTicket> {
        if self.scene.is_some() || self.pending.is_some() {
            return None;
        }
        self.generation += 1;
        self.pending = Some(self.generation);
        Some(MountTicket(self.generation))
    }

    /// Finishes the mount started by `ticket`. A ticket invalidated by an
    /// unmount in the meantime only disposes `renderer`.
    pub fn complete(
        &mut self,
        ticket: MountTicket,
        host: Rc<H>,
        services: &HostServices,
        config: &HeroConfig,
        mut renderer: R,
    ) -> bool {
        if self.pending != Some(ticket.0) {
            debug!("discarding renderer from a stale hero mount");
            renderer.dispose();
            return false;
        }
        self.pending = None;
        self.scene = HeroScene::attach(host, services, config, renderer);
        self.scene.is_some()
    }

    /// Gives up on the mount started by `ticket` after renderer creation
    /// failed.
    pub fn abandon(&mut self, ticket: MountTicket) {
        if self.pending == Some(ticket.0) {
            self.pending = None;
        }
    }

    /// Tears down the live scene and invalidates any pending mount.
    pub fn unmount(&mut self) {
        self.pending = None;
        self.generation += 1;
        if let Some(mut scene) = self.scene.take() {
            scene.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::queued::{HeadlessRegion, QueuedScheduler, SignalHub};
    use crate::render::{HeadlessRenderer, RenderStats};

    struct Harness {
        region: Rc<HeadlessRegion>,
        scheduler: Rc<QueuedScheduler>,
        hub: Rc<SignalHub>,
        services: HostServices,
        stats: Rc<RefCell<Option<Rc<RenderStats>>>>,
    }

    type HeadlessScene = HeroScene<HeadlessRegion, HeadlessRenderer>;

    impl Harness {
        fn new(width: u32, height: u32) -> Self {
            let scheduler = Rc::new(QueuedScheduler::new());
            let hub = Rc::new(SignalHub::new(width, height));
            let services = HostServices::new(scheduler.clone(), hub.clone());
            Self {
                region: Rc::new(HeadlessRegion::new(width, height)),
                scheduler,
                hub,
                services,
                stats: Rc::new(RefCell::new(None)),
            }
        }

        fn create(
            &self,
        ) -> impl FnOnce(u32, u32, &RendererOptions) -> Result<HeadlessRenderer, RenderError>
        {
            let slot = Rc::clone(&self.stats);
            move |width, height, options| {
                let renderer = HeadlessRenderer::new(width, height, *options);
                *slot.borrow_mut() = Some(renderer.stats());
                Ok(renderer)
            }
        }

        fn mount(&self) -> HeadlessScene {
            HeroScene::initialize(
                Rc::clone(&self.region),
                &self.services,
                &HeroConfig::default(),
                self.create(),
            )
            .expect("scene should mount")
        }

        fn stats(&self) -> Rc<RenderStats> {
            self.stats.borrow().clone().expect("renderer was created")
        }
    }

    #[test]
    fn mount_attaches_one_surface_and_schedules_one_frame() {
        let harness = Harness::new(800, 600);
        let scene = harness.mount();
        assert_eq!(harness.region.surface_count(), 1);
        assert_eq!(scene.renderer_size(), Some((800, 600)));
        assert!((scene.camera_aspect().unwrap() - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(harness.scheduler.pending(), 1);
        assert_eq!(harness.hub.listener_count(ViewportEvent::Resize), 1);
    }

    #[test]
    fn each_frame_rotates_both_axes_and_renders() {
        let harness = Harness::new(800, 600);
        let scene = harness.mount();
        for frame in 0..3 {
            harness.scheduler.run_frame(frame as f64 * 16.0);
        }
        let rotation = scene.rotation().unwrap();
        assert!((rotation.x - 0.03).abs() < 1e-6);
        assert!((rotation.y - 0.03).abs() < 1e-6);
        assert_eq!(rotation.z, 0.0);
        assert_eq!(harness.stats().frames(), 3);
        assert_eq!(scene.frames(), 3);
        assert_eq!(harness.stats().live_geometries(), 1);
    }

    #[test]
    fn resize_events_track_the_latest_dimensions() {
        let harness = Harness::new(800, 600);
        let scene = harness.mount();
        for (width, height) in [(1024, 768), (390, 844), (1920, 1080)] {
            harness.hub.resize(width, height);
            assert_eq!(scene.renderer_size(), Some((width, height)));
            let expected = width as f32 / height as f32;
            assert!((scene.camera_aspect().unwrap() - expected).abs() < 1e-6);
        }
        scene.on_resize(1920, 1080);
        assert_eq!(scene.renderer_size(), Some((1920, 1080)));
    }

    #[test]
    fn renderer_follows_the_viewport_from_mount_on() {
        let harness = Harness::new(800, 600);
        harness.region.set_size(800, 400);
        let scene = harness.mount();
        assert_eq!(scene.renderer_size(), Some((800, 600)));
        assert!((scene.camera_aspect().unwrap() - 800.0 / 600.0).abs() < 1e-6);

        harness.hub.resize(1280, 720);
        assert_eq!(scene.renderer_size(), Some((1280, 720)));
        assert!((scene.camera_aspect().unwrap() - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn zero_sized_resize_keeps_the_last_size() {
        let harness = Harness::new(800, 600);
        let scene = harness.mount();
        harness.hub.resize(1024, 768);
        harness.hub.resize(0, 0);
        assert_eq!(scene.renderer_size(), Some((1024, 768)));
        assert!((scene.camera_aspect().unwrap() - 1024.0 / 768.0).abs() < 1e-6);
    }

    #[test]
    fn teardown_releases_everything() {
        let harness = Harness::new(800, 600);
        let mut scene = harness.mount();
        harness.scheduler.run_frame(0.0);
        scene.teardown();

        let stats = harness.stats();
        assert_eq!(harness.scheduler.pending(), 0);
        assert_eq!(harness.region.surface_count(), 0);
        assert_eq!(harness.hub.listener_count(ViewportEvent::Resize), 0);
        assert_eq!(stats.live_geometries(), 0);
        assert_eq!(stats.live_materials(), 0);
        assert!(stats.disposed());
        assert!(!scene.is_live());

        harness.scheduler.run_frame(16.0);
        assert_eq!(stats.frames(), 1);
    }

    #[test]
    fn second_teardown_is_a_no_op() {
        let harness = Harness::new(800, 600);
        let mut scene = harness.mount();
        scene.teardown();
        scene.teardown();
        assert_eq!(harness.region.surface_count(), 0);
        assert_eq!(scene.renderer_size(), None);
    }

    #[test]
    fn teardown_tolerates_a_detached_region() {
        let harness = Harness::new(800, 600);
        let mut scene = harness.mount();
        harness.region.disconnect();
        scene.teardown();
        assert!(harness.stats().disposed());
        assert_eq!(harness.scheduler.pending(), 0);
    }

    #[test]
    fn dropping_a_scene_tears_it_down() {
        let harness = Harness::new(800, 600);
        drop(harness.mount());
        assert_eq!(harness.scheduler.pending(), 0);
        assert_eq!(harness.region.surface_count(), 0);
        assert!(harness.stats().disposed());
    }

    #[test]
    fn unavailable_region_mounts_nothing() {
        let harness = Harness::new(800, 600);
        harness.region.disconnect();
        let scene: Option<HeadlessScene> = HeroScene::initialize(
            Rc::clone(&harness.region),
            &harness.services,
            &HeroConfig::default(),
            harness.create(),
        );
        assert!(scene.is_none());
        assert!(harness.stats.borrow().is_none());
        assert_eq!(harness.scheduler.pending(), 0);
        assert_eq!(harness.hub.listener_count(ViewportEvent::Resize), 0);
    }

    #[test]
    fn renderer_failure_degrades_silently() {
        let harness = Harness::new(800, 600);
        let scene: Option<HeadlessScene> = HeroScene::initialize(
            Rc::clone(&harness.region),
            &harness.services,
            &HeroConfig::default(),
            |_, _, _| Err(RenderError::Adapter("no gpu".into())),
        );
        assert!(scene.is_none());
        assert_eq!(harness.region.surface_count(), 0);
        assert_eq!(harness.scheduler.pending(), 0);
    }

    #[test]
    fn repeated_mount_keeps_a_single_scene() {
        let harness = Harness::new(800, 600);
        let mut mount: HeroMount<HeadlessRegion, HeadlessRenderer> = HeroMount::new();
        let config = HeroConfig::default();
        assert!(mount.mount(Rc::clone(&harness.region), &harness.services, &config, harness.create()));
        assert!(mount.mount(Rc::clone(&harness.region), &harness.services, &config, harness.create()));
        assert_eq!(harness.region.surface_count(), 1);
        assert_eq!(harness.scheduler.pending(), 1);

        mount.unmount();
        assert!(!mount.is_live());
        assert_eq!(harness.region.surface_count(), 0);
        assert_eq!(harness.scheduler.pending(), 0);
    }

    #[test]
    fn stale_async_completion_only_disposes_its_renderer() {
        let harness = Harness::new(800, 600);
        let config = HeroConfig::default();
        let mut mount: HeroMount<HeadlessRegion, HeadlessRenderer> = HeroMount::new();

        let ticket = mount.begin().unwrap();
        assert!(mount.is_pending());
        assert!(mount.begin().is_none());
        mount.unmount();
        assert!(!mount.is_pending());

        let late = HeadlessRenderer::new(800, 600, config.renderer);
        let stats = late.stats();
        assert!(!mount.complete(ticket, Rc::clone(&harness.region), &harness.services, &config, late));
        assert!(stats.disposed());
        assert_eq!(harness.region.surface_count(), 0);

        let ticket = mount.begin().unwrap();
        let fresh = HeadlessRenderer::new(800, 600, config.renderer);
        assert!(mount.complete(ticket, Rc::clone(&harness.region), &harness.services, &config, fresh));
        assert!(mount.is_live());
        assert_eq!(harness.region.surface_count(), 1);
    }
}
