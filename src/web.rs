#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::config::{HeroConfig, NavConfig};
use crate::hero::{hero_size, HeroMount};
use crate::host::wasm::{AnimationFrameScheduler, DomRegion, ElementAnchor, WindowSignals};
use crate::host::{HostServices, Subscription, ViewportEvent, ViewportSignals};
use crate::nav::{NavPresenter, NavigationController, Section, SectionRegistry, ViewportState};
use crate::render::wasm::{create_canvas_renderer, CanvasRenderer};
use crate::reveal::RevealTracker;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

fn to_js(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Mirrors the navigation state as CSS classes on the navbar element.
struct ClassPresenter {
    element: Element,
}

impl NavPresenter for ClassPresenter {
    fn present(&mut self, state: ViewportState) {
        let classes = self.element.class_list();
        let _ = classes.toggle_with_force("scrolled", state.scrolled);
        let _ = classes.toggle_with_force("menu-open", state.menu_open);
    }
}

/// Adds the `revealed` class to each section the first time it scrolls into
/// view.
struct SectionReveal {
    tracker: RevealTracker,
    sections: Vec<(Section, Element)>,
}

impl SectionReveal {
    fn observe(&mut self, viewport_height: u32) {
        for (section, element) in &self.sections {
            let rect = element.get_bounding_client_rect();
            if self
                .tracker
                .observe(*section, rect.top(), rect.bottom(), f64::from(viewport_height))
            {
                let _ = element.class_list().add_1("revealed");
            }
        }
    }
}

type DomHero = HeroMount<DomRegion, CanvasRenderer>;

/// Page runtime: owns the navigation controller and the hero mount slot.
#[wasm_bindgen]
pub struct PortfolioApp {
    services: HostServices,
    nav: NavigationController<ElementAnchor>,
    hero: Rc<RefCell<DomHero>>,
    config: HeroConfig,
    _reveal: Vec<Subscription>,
}

#[wasm_bindgen]
impl PortfolioApp {
    /// Binds to the navbar with id `nav_id` and to the section elements whose
    /// ids are the section names.
    #[wasm_bindgen(constructor)]
    pub fn new(nav_id: String) -> Result<PortfolioApp, JsValue> {
        let scheduler = Rc::new(AnimationFrameScheduler::new().map_err(to_js)?);
        let signals = Rc::new(WindowSignals::new().map_err(to_js)?);
        let services = HostServices::new(scheduler, signals.clone());

        let mut anchors = Vec::new();
        let mut section_elements = Vec::new();
        for section in Section::ALL {
            match ElementAnchor::by_id(section.name()) {
                Ok(anchor) => {
                    section_elements.push((section, anchor.element().clone()));
                    anchors.push((section, anchor));
                }
                Err(err) => warn!("section {section} has no anchor: {err}"),
            }
        }

        let registry = SectionRegistry::new(anchors);
        let mut nav = NavigationController::new(registry, NavConfig::default());
        let nav_element = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(&nav_id))
            .ok_or_else(|| JsValue::from_str(&format!("navbar #{nav_id} not found")))?;
        nav.add_presenter(Box::new(ClassPresenter {
            element: nav_element,
        }));
        nav.attach(signals.as_ref());

        let reveal = Rc::new(RefCell::new(SectionReveal {
            tracker: RevealTracker::new(),
            sections: section_elements,
        }));
        reveal.borrow_mut().observe(signals.reading().height);
        let reveal_subscriptions = [ViewportEvent::Scroll, ViewportEvent::Resize]
            .into_iter()
            .map(|event| {
                let reveal = Rc::clone(&reveal);
                signals.listen(
                    event,
                    Box::new(move |reading| reveal.borrow_mut().observe(reading.height)),
                )
            })
            .collect();

        Ok(Self {
            services,
            nav,
            hero: Rc::new(RefCell::new(HeroMount::new())),
            config: HeroConfig::default(),
            _reveal: reveal_subscriptions,
        })
    }

    /// Starts the hero animation inside `#host_id`. Does nothing when the
    /// hero is already live or still starting.
    pub fn mount_hero(&self, host_id: String) -> Result<(), JsValue> {
        let host = Rc::new(DomRegion::by_id(&host_id).map_err(to_js)?);
        let Some((width, height)) = hero_size(host.as_ref(), &self.services) else {
            debug!("hero host #{host_id} has no size; skipping");
            return Ok(());
        };
        let Some(ticket) = self.hero.borrow_mut().begin() else {
            return Ok(());
        };

        let hero = Rc::clone(&self.hero);
        let services = self.services.clone();
        let config = self.config.clone();
        spawn_local(async move {
            match create_canvas_renderer(width, height, config.renderer).await {
                Ok(renderer) => {
                    hero.borrow_mut()
                        .complete(ticket, host, &services, &config, renderer);
                }
                Err(err) => {
                    warn!("hero renderer unavailable: {err}");
                    hero.borrow_mut().abandon(ticket);
                }
            }
        });
        Ok(())
    }

    pub fn unmount_hero(&self) {
        self.hero.borrow_mut().unmount();
    }

    pub fn toggle_menu(&self) -> bool {
        self.nav.toggle_menu()
    }

    pub fn navigate(&self, name: String) -> Result<(), JsValue> {
        self.nav.navigate_by_name(&name).map(|_| ()).map_err(to_js)
    }

    pub fn scrolled(&self) -> bool {
        self.nav.state().scrolled
    }

    pub fn menu_open(&self) -> bool {
        self.nav.state().menu_open
    }

    pub fn hero_live(&self) -> bool {
        self.hero.borrow().is_live()
    }

    /// True while the renderer for a started mount is still being created.
    pub fn hero_pending(&self) -> bool {
        self.hero.borrow().is_pending()
    }

    /// Names of the sections that have an anchor on this page, in page order.
    pub fn sections(&self) -> js_sys::Array {
        self.nav
            .registry()
            .sections()
            .map(|section| JsValue::from_str(section.name()))
            .collect()
    }
}
