//! Viewport chrome state and section navigation.
//!
//! [`ViewportState`] transitions are pure functions; [`ViewportStore`] holds
//! the current value and pushes every change to its presenters, and
//! [`NavigationController`] wires the store to viewport signals and section
//! anchors.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use log::{debug, error, warn};

use crate::config::NavConfig;
use crate::error::{HostError, NavError};
use crate::host::{Subscription, ViewportEvent, ViewportSignals};

/// Named content sections of the page, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    About,
    Projects,
    Skills,
    Education,
    Experience,
    Connect,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::About,
        Section::Projects,
        Section::Skills,
        Section::Education,
        Section::Experience,
        Section::Connect,
    ];

    /// Lower-case identifier used for element ids and CLI arguments.
    pub fn name(self) -> &'static str {
        match self {
            Section::About => "about",
            Section::Projects => "projects",
            Section::Skills => "skills",
            Section::Education => "education",
            Section::Experience => "experience",
            Section::Connect => "connect",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::About => "About",
            Section::Projects => "Projects",
            Section::Skills => "Skills",
            Section::Education => "Education",
            Section::Experience => "Experience",
            Section::Connect => "Connect",
        }
    }

    /// Position in page order, starting at zero.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Result<Self, NavError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| NavError::UnknownSection(name.to_string()))
    }
}

impl FromStr for Section {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportState {
    /// The page has scrolled past the chrome threshold.
    pub scrolled: bool,
    /// The mobile navigation menu is expanded.
    pub menu_open: bool,
}

impl ViewportState {
    /// `scrolled` holds exactly when `offset` is strictly past `threshold`.
    pub fn on_scroll(self, offset: f64, threshold: f64) -> Self {
        Self {
            scrolled: offset > threshold,
            ..self
        }
    }

    pub fn toggle_menu(self) -> Self {
        Self {
            menu_open: !self.menu_open,
            ..self
        }
    }

    pub fn close_menu(self) -> Self {
        Self {
            menu_open: false,
            ..self
        }
    }
}

/// Presentation layer reading the navigation state.
pub trait NavPresenter {
    fn present(&mut self, state: ViewportState);
}

/// Holds the current [`ViewportState`] and notifies presenters when it
/// changes.
#[derive(Default)]
pub struct ViewportStore {
    state: ViewportState,
    presenters: Vec<Box<dyn NavPresenter>>,
}

impl ViewportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Registers `presenter` and shows it the current state.
    pub fn add_presenter(&mut self, mut presenter: Box<dyn NavPresenter>) {
        presenter.present(self.state);
        self.presenters.push(presenter);
    }

    /// Applies a transition; presenters run only when the state changed.
    pub fn apply(
        &mut self,
        transition: impl FnOnce(ViewportState) -> ViewportState,
    ) -> ViewportState {
        let next = transition(self.state);
        if next != self.state {
            self.state = next;
            for presenter in &mut self.presenters {
                presenter.present(next);
            }
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// A scroll target established by the page.
pub trait SectionAnchor {
    /// Scrolls the viewport so the anchor's top aligns with the viewport top.
    fn scroll_into_view(&self, behavior: ScrollBehavior) -> Result<(), HostError>;
}

/// Section anchors fixed at construction.
pub struct SectionRegistry<A> {
    anchors: BTreeMap<Section, A>,
}

impl<A> SectionRegistry<A> {
    pub fn new(anchors: impl IntoIterator<Item = (Section, A)>) -> Self {
        Self {
            anchors: anchors.into_iter().collect(),
        }
    }

    pub fn get(&self, section: Section) -> Option<&A> {
        self.anchors.get(&section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.anchors.contains_key(&section)
    }

    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.anchors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Tracks the chrome and menu flags and performs section navigation.
pub struct NavigationController<A> {
    store: Rc<RefCell<ViewportStore>>,
    registry: SectionRegistry<A>,
    config: NavConfig,
    scroll: Option<Subscription>,
}

impl<A: SectionAnchor> NavigationController<A> {
    pub fn new(registry: SectionRegistry<A>, config: NavConfig) -> Self {
        Self {
            store: Rc::new(RefCell::new(ViewportStore::new())),
            registry,
            config,
            scroll: None,
        }
    }

    /// Subscribes to scroll events and evaluates the current offset. A
    /// previous subscription is released first.
    pub fn attach(&mut self, signals: &dyn ViewportSignals) {
        self.detach();
        self.on_scroll(signals.reading().scroll_y);

        let store = Rc::downgrade(&self.store);
        let threshold = self.config.scroll_threshold;
        self.scroll = Some(signals.listen(
            ViewportEvent::Scroll,
            Box::new(move |reading| {
                if let Some(store) = store.upgrade() {
                    store
                        .borrow_mut()
                        .apply(|state| state.on_scroll(reading.scroll_y, threshold));
                }
            }),
        ));
        debug!("navigation controller attached");
    }

    /// Drops the scroll subscription.
    pub fn detach(&mut self) {
        if let Some(mut scroll) = self.scroll.take() {
            scroll.cancel();
            debug!("navigation controller detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.scroll.is_some()
    }

    pub fn on_scroll(&self, offset: f64) -> ViewportState {
        let threshold = self.config.scroll_threshold;
        self.store
            .borrow_mut()
            .apply(|state| state.on_scroll(offset, threshold))
    }

    /// Flips the menu flag and returns the new value.
    pub fn toggle_menu(&self) -> bool {
        self.store
            .borrow_mut()
            .apply(ViewportState::toggle_menu)
            .menu_open
    }

    /// Smooth-scrolls to `section` and closes the menu.
    ///
    /// A section without an anchor is a wiring mistake: it is logged and the
    /// state is left untouched.
    pub fn navigate_to(&self, section: Section) -> Result<(), NavError> {
        let Some(anchor) = self.registry.get(section) else {
            error!("navigation to unregistered section {section}");
            return Err(NavError::Unregistered(section));
        };
        if let Err(err) = anchor.scroll_into_view(ScrollBehavior::Smooth) {
            warn!("scroll to {section} failed: {err}");
        }
        self.store.borrow_mut().apply(ViewportState::close_menu);
        debug!("navigated to {section}");
        Ok(())
    }

    pub fn navigate_by_name(&self, name: &str) -> Result<Section, NavError> {
        let section = Section::from_name(name).map_err(|err| {
            error!("{err}");
            err
        })?;
        self.navigate_to(section)?;
        Ok(section)
    }

    pub fn state(&self) -> ViewportState {
        self.store.borrow().state()
    }

    pub fn add_presenter(&self, presenter: Box<dyn NavPresenter>) {
        self.store.borrow_mut().add_presenter(presenter);
    }

    pub fn registry(&self) -> &SectionRegistry<A> {
        &self.registry
    }
}

impl<A> Drop for NavigationController<A> {
    fn drop(&mut self) {
        self.scroll.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::queued::SignalHub;
    use std::cell::Cell;

    #[derive(Clone, Default)]
    struct RecordingAnchor {
        requests: Rc<RefCell<Vec<ScrollBehavior>>>,
    }

    impl SectionAnchor for RecordingAnchor {
        fn scroll_into_view(&self, behavior: ScrollBehavior) -> Result<(), HostError> {
            self.requests.borrow_mut().push(behavior);
            Ok(())
        }
    }

    struct CountingPresenter(Rc<Cell<u32>>);

    impl NavPresenter for CountingPresenter {
        fn present(&mut self, _state: ViewportState) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn controller() -> (NavigationController<RecordingAnchor>, Vec<RecordingAnchor>) {
        let anchors: Vec<RecordingAnchor> =
            Section::ALL.iter().map(|_| RecordingAnchor::default()).collect();
        let registry = SectionRegistry::new(Section::ALL.into_iter().zip(anchors.clone()));
        (
            NavigationController::new(registry, NavConfig::default()),
            anchors,
        )
    }

    #[test]
    fn scrolled_is_strictly_past_the_threshold() {
        let state = ViewportState::default();
        assert!(!state.on_scroll(0.0, 10.0).scrolled);
        assert!(!state.on_scroll(10.0, 10.0).scrolled);
        assert!(state.on_scroll(10.5, 10.0).scrolled);
        assert!(!state.on_scroll(11.0, 10.0).on_scroll(3.0, 10.0).scrolled);
    }

    #[test]
    fn navigation_closes_an_open_menu() {
        let (nav, anchors) = controller();
        assert!(nav.toggle_menu());
        nav.navigate_to(Section::Projects).unwrap();
        assert!(!nav.state().menu_open);
        assert_eq!(
            *anchors[Section::Projects.index()].requests.borrow(),
            vec![ScrollBehavior::Smooth]
        );
        assert!(anchors[Section::About.index()].requests.borrow().is_empty());
    }

    #[test]
    fn navigation_keeps_a_closed_menu_closed() {
        let (nav, _) = controller();
        nav.navigate_to(Section::Connect).unwrap();
        assert!(!nav.state().menu_open);
    }

    #[test]
    fn unregistered_section_is_reported_without_side_effects() {
        let registry = SectionRegistry::new([(Section::About, RecordingAnchor::default())]);
        let nav = NavigationController::new(registry, NavConfig::default());
        nav.toggle_menu();
        assert_eq!(
            nav.navigate_to(Section::Skills),
            Err(NavError::Unregistered(Section::Skills))
        );
        assert!(nav.state().menu_open);
        assert!(matches!(
            nav.navigate_by_name("blog"),
            Err(NavError::UnknownSection(_))
        ));
    }

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!("Projects".parse::<Section>().unwrap(), Section::Projects);
        assert_eq!(Section::from_name(" connect ").unwrap(), Section::Connect);
        assert_eq!(Section::Education.to_string(), "Education");
    }

    #[test]
    fn attached_controller_follows_scroll_events_until_detached() {
        let hub = SignalHub::new(800, 600);
        hub.set_scroll(50.0);
        let (mut nav, _) = controller();
        nav.attach(&hub);
        assert!(nav.state().scrolled);

        hub.scroll_to(10.0);
        assert!(!nav.state().scrolled);
        hub.scroll_to(11.0);
        assert!(nav.state().scrolled);

        nav.detach();
        assert_eq!(hub.listener_count(ViewportEvent::Scroll), 0);
        hub.scroll_to(0.0);
        assert!(nav.state().scrolled);
    }

    #[test]
    fn reattaching_does_not_accumulate_listeners() {
        let hub = SignalHub::new(800, 600);
        let (mut nav, _) = controller();
        nav.attach(&hub);
        nav.attach(&hub);
        assert_eq!(hub.listener_count(ViewportEvent::Scroll), 1);
        drop(nav);
        assert_eq!(hub.listener_count(ViewportEvent::Scroll), 0);
    }

    #[test]
    fn presenters_see_only_changes() {
        let (nav, _) = controller();
        let calls = Rc::new(Cell::new(0));
        nav.add_presenter(Box::new(CountingPresenter(Rc::clone(&calls))));
        assert_eq!(calls.get(), 1);
        nav.on_scroll(5.0);
        assert_eq!(calls.get(), 1);
        nav.on_scroll(20.0);
        nav.on_scroll(30.0);
        assert_eq!(calls.get(), 2);
        nav.toggle_menu();
        assert_eq!(calls.get(), 3);
    }
}
