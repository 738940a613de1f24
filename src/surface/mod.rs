//! Walkable window surfaces.
//!
//! The platform reports window rectangles in a top-left origin, y-down space.
//! Everything here is converted to the movement space: origin at the bottom
//! left of the primary display, y growing upward, so a window's walkable
//! height is the y of its top edge.

use std::rc::Rc;
use std::time::Duration;

use glam::Vec2;
use instant::Instant;

use crate::facing::Direction;

/// Surfaces are re-enumerated at most this often.
pub const CACHE_INTERVAL: Duration = Duration::from_millis(500);
/// Windows must be wider than this to count (menus, tooltips).
const MIN_WIDTH: f32 = 100.0;
/// Windows must be taller than this to count.
const MIN_HEIGHT: f32 = 50.0;
/// A surface may sit this far above the probe point and still be "below" it.
const BELOW_TOLERANCE: f32 = 5.0;
/// Max height difference for a gap jump.
const NEXT_SURFACE_TOLERANCE: f32 = 100.0;

/// Owners whose windows are shell chrome, never something to stand on.
/// Compared case-insensitively, with any `.exe` suffix stripped.
pub const IGNORED_OWNERS: &[&str] = &[
    // macOS
    "Dock",
    "Window Server",
    "SystemUIServer",
    "Control Center",
    "Notification Center",
    // Windows shell
    "ShellExperienceHost",
    "StartMenuExperienceHost",
    "SearchHost",
    "SearchApp",
    "TextInputHost",
    "LockApp",
];

/// One window as the platform reports it: top-left origin, y down.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWindow {
    pub owner: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A window top the cat can walk on, in movement space.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSurface {
    pub min_x: f32,
    pub max_x: f32,
    /// Y of the window's top edge.
    pub walkable_y: f32,
    pub owner: Rc<str>,
}

impl WindowSurface {
    pub fn spans(&self, x: f32) -> bool {
        x >= self.min_x && x <= self.max_x
    }
}

/// Source of on-screen windows. Implemented per platform.
pub trait WindowSource {
    /// All visible windows, topmost first. May be empty.
    fn visible_windows(&mut self) -> Vec<RawWindow>;

    /// Primary display size in pixels, if one can be queried.
    fn screen_size(&self) -> Option<(f32, f32)>;
}

/// Read-only snapshot of the surface cache, sorted by descending walkable y.
/// Cloning is cheap; a refresh swaps in a new snapshot instead of editing this one.
#[derive(Debug, Clone)]
pub struct Surfaces(Rc<[WindowSurface]>);

impl Default for Surfaces {
    fn default() -> Self {
        Self(Rc::from(Vec::new()))
    }
}

impl Surfaces {
    pub fn new(mut surfaces: Vec<WindowSurface>) -> Self {
        surfaces.sort_by(|a, b| b.walkable_y.total_cmp(&a.walkable_y));
        Self(surfaces.into())
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[WindowSurface] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest surface under `point.x` whose top is at or below `point.y`
    /// (within tolerance). `None` means the floor.
    pub fn find_surface_below(&self, point: Vec2) -> Option<&WindowSurface> {
        self.0
            .iter()
            .find(|s| s.spans(point.x) && s.walkable_y <= point.y + BELOW_TOLERANCE)
    }

    /// Nearest surface strictly ahead in `direction`, at roughly `current_y`.
    pub fn find_next_surface(
        &self,
        from_x: f32,
        current_y: f32,
        direction: Direction,
    ) -> Option<&WindowSurface> {
        let candidates = self
            .0
            .iter()
            .filter(|s| (s.walkable_y - current_y).abs() < NEXT_SURFACE_TOLERANCE);

        match direction {
            Direction::Right => candidates
                .filter(|s| s.min_x > from_x)
                .min_by(|a, b| a.min_x.total_cmp(&b.min_x)),
            Direction::Left => candidates
                .filter(|s| s.max_x < from_x)
                .max_by(|a, b| a.max_x.total_cmp(&b.max_x)),
        }
    }

    /// Surfaces whose top is more than `min_rise` above `y`.
    pub fn above(&self, y: f32, min_rise: f32) -> impl Iterator<Item = &WindowSurface> {
        self.0.iter().filter(move |s| s.walkable_y > y + min_rise)
    }
}

/// Owns the surface cache and refreshes it from a [`WindowSource`].
pub struct SurfaceTracker<S> {
    source: S,
    /// Our own process name, never treated as a surface.
    own_owner: String,
    fallback_screen: (f32, f32),
    cache: Surfaces,
    last_refresh: Option<Instant>,
    refreshes: u64,
}

impl<S: WindowSource> SurfaceTracker<S> {
    pub fn new(source: S, own_owner: impl Into<String>, fallback_screen: (f32, f32)) -> Self {
        Self {
            source,
            own_owner: own_owner.into(),
            fallback_screen,
            cache: Surfaces::default(),
            last_refresh: None,
            refreshes: 0,
        }
    }

    /// Current surfaces, re-enumerated if the cache is older than [`CACHE_INTERVAL`].
    pub fn walkable_surfaces(&mut self, now: Instant) -> Surfaces {
        let stale = match self.last_refresh {
            Some(last) => now.saturating_duration_since(last) > CACHE_INTERVAL,
            None => true,
        };
        if stale {
            self.refresh();
            self.last_refresh = Some(now);
        }
        self.cache.clone()
    }

    /// Primary display size, or the fallback when none is available.
    pub fn screen_size(&self) -> (f32, f32) {
        self.source.screen_size().unwrap_or(self.fallback_screen)
    }

    #[cfg(test)]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    fn refresh(&mut self) {
        let screen = self.screen_size();
        let raw = self.source.visible_windows();
        let total = raw.len();
        self.cache = build_surfaces(raw, screen, &self.own_owner);
        self.refreshes += 1;
        log::debug!(
            "Surface refresh #{}: {} of {} windows walkable",
            self.refreshes,
            self.cache.len(),
            total
        );
    }
}

/// Filter raw windows and convert them into a sorted surface list.
///
/// Surfaces are clipped to the primary display `(width, height)`. Windows
/// whose top edge is off that display, or whose span does not reach it, are
/// dropped: the overlay cannot draw the cat there.
pub fn build_surfaces(raw: Vec<RawWindow>, screen: (f32, f32), own_owner: &str) -> Surfaces {
    let (screen_w, screen_h) = screen;
    let surfaces = raw
        .into_iter()
        .filter(|w| !is_ignored(&w.owner, own_owner))
        .filter(|w| w.width > MIN_WIDTH && w.height > MIN_HEIGHT)
        .filter_map(|w| {
            // Top edge at `y` (y down) is `screen_h - y` with y up.
            let walkable_y = screen_h - w.y;
            let min_x = w.x.max(0.0);
            let max_x = (w.x + w.width).min(screen_w);
            if !(0.0..=screen_h).contains(&walkable_y) || max_x <= min_x {
                return None;
            }
            Some(WindowSurface {
                min_x,
                max_x,
                walkable_y,
                owner: Rc::from(w.owner),
            })
        })
        .collect();
    Surfaces::new(surfaces)
}

fn is_ignored(owner: &str, own_owner: &str) -> bool {
    let stem = owner_stem(owner);
    stem.eq_ignore_ascii_case(owner_stem(own_owner))
        || IGNORED_OWNERS.iter().any(|i| stem.eq_ignore_ascii_case(i))
}

fn owner_stem(owner: &str) -> &str {
    let len = owner.len();
    if len > 4 && owner.is_char_boundary(len - 4) && owner[len - 4..].eq_ignore_ascii_case(".exe")
    {
        &owner[..len - 4]
    } else {
        owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    const SCREEN: (f32, f32) = (1000.0, 1000.0);

    fn raw(owner: &str, x: f32, y: f32, w: f32, h: f32) -> RawWindow {
        RawWindow {
            owner: owner.to_string(),
            x,
            y,
            width: w,
            height: h,
        }
    }

    fn surface(min_x: f32, max_x: f32, walkable_y: f32) -> WindowSurface {
        WindowSurface {
            min_x,
            max_x,
            walkable_y,
            owner: Rc::from("App"),
        }
    }

    /// Hands out queued enumerations and counts calls.
    struct FakeSource {
        batches: VecDeque<Vec<RawWindow>>,
        calls: usize,
        screen: Option<(f32, f32)>,
    }

    impl WindowSource for FakeSource {
        fn visible_windows(&mut self) -> Vec<RawWindow> {
            self.calls += 1;
            self.batches.pop_front().unwrap_or_default()
        }

        fn screen_size(&self) -> Option<(f32, f32)> {
            self.screen
        }
    }

    #[test]
    fn converts_top_edge_to_y_up() {
        let s = build_surfaces(vec![raw("Editor", 100.0, 200.0, 400.0, 300.0)], SCREEN, "perchcat");
        let top = &s.as_slice()[0];
        assert_eq!(top.min_x, 100.0);
        assert_eq!(top.max_x, 500.0);
        assert_eq!(top.walkable_y, 800.0);
        assert_eq!(&*top.owner, "Editor");
    }

    #[test]
    fn filters_chrome_self_and_tiny_windows() {
        let s = build_surfaces(
            vec![
                raw("Dock", 0.0, 900.0, 1000.0, 100.0),
                raw("perchcat.exe", 0.0, 0.0, 1000.0, 1000.0),
                raw("SearchHost.EXE", 0.0, 0.0, 500.0, 500.0),
                raw("Menu", 0.0, 0.0, 100.0, 300.0),
                raw("Tooltip", 0.0, 0.0, 300.0, 50.0),
                raw("Browser", 0.0, 100.0, 800.0, 600.0),
            ],
            SCREEN,
            "PerchCat",
        );
        assert_eq!(s.len(), 1);
        assert_eq!(&*s.as_slice()[0].owner, "Browser");
    }

    #[test]
    fn clips_to_primary_display() {
        let s = build_surfaces(
            vec![
                raw("LeftHalf", -300.0, 200.0, 500.0, 300.0),
                raw("RightHalf", 800.0, 300.0, 600.0, 300.0),
                raw("OtherMonitor", 1200.0, 480.0, 600.0, 300.0),
                raw("AboveTop", 100.0, -40.0, 400.0, 300.0),
                raw("BelowBottom", 100.0, 1100.0, 400.0, 300.0),
            ],
            SCREEN,
            "perchcat",
        );
        let spans: Vec<(&str, f32, f32)> = s
            .as_slice()
            .iter()
            .map(|w| (&*w.owner, w.min_x, w.max_x))
            .collect();
        assert_eq!(
            spans,
            vec![("LeftHalf", 0.0, 200.0), ("RightHalf", 800.0, 1000.0)]
        );
    }

    #[test]
    fn empty_enumeration_is_not_an_error() {
        let s = build_surfaces(Vec::new(), SCREEN, "perchcat");
        assert!(s.is_empty());
        assert!(s.find_surface_below(Vec2::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn cache_refreshes_only_after_interval() {
        let source = FakeSource {
            batches: VecDeque::from(vec![
                vec![raw("A", 0.0, 100.0, 400.0, 300.0)],
                vec![
                    raw("A", 0.0, 100.0, 400.0, 300.0),
                    raw("B", 500.0, 300.0, 400.0, 300.0),
                ],
            ]),
            calls: 0,
            screen: Some((1000.0, 1000.0)),
        };
        let mut tracker = SurfaceTracker::new(source, "perchcat", (800.0, 600.0));
        let t0 = Instant::now();

        assert_eq!(tracker.walkable_surfaces(t0).len(), 1);
        assert_eq!(tracker.walkable_surfaces(t0 + Duration::from_millis(300)).len(), 1);
        assert_eq!(tracker.walkable_surfaces(t0 + CACHE_INTERVAL).len(), 1);
        assert_eq!(tracker.source.calls, 1);

        let later = tracker.walkable_surfaces(t0 + Duration::from_millis(501));
        assert_eq!(later.len(), 2);
        assert_eq!(tracker.source.calls, 2);
        assert_eq!(tracker.refresh_count(), 2);
    }

    #[test]
    fn old_snapshot_survives_refresh() {
        let source = FakeSource {
            batches: VecDeque::from(vec![vec![raw("A", 0.0, 100.0, 400.0, 300.0)], vec![]]),
            calls: 0,
            screen: Some((1000.0, 1000.0)),
        };
        let mut tracker = SurfaceTracker::new(source, "perchcat", (800.0, 600.0));
        let t0 = Instant::now();
        let before = tracker.walkable_surfaces(t0);
        let after = tracker.walkable_surfaces(t0 + Duration::from_secs(1));
        assert_eq!(before.len(), 1);
        assert!(after.is_empty());
    }

    #[test]
    fn missing_display_uses_fallback_height() {
        let source = FakeSource {
            batches: VecDeque::from(vec![vec![raw("A", 0.0, 100.0, 400.0, 300.0)]]),
            calls: 0,
            screen: None,
        };
        let mut tracker = SurfaceTracker::new(source, "perchcat", (800.0, 600.0));
        let s = tracker.walkable_surfaces(Instant::now());
        assert_eq!(s.as_slice()[0].walkable_y, 500.0);
        assert_eq!(tracker.screen_size(), (800.0, 600.0));
    }

    #[test]
    fn surface_below_prefers_highest_reachable() {
        let s = Surfaces::new(vec![
            surface(0.0, 500.0, 300.0),
            surface(0.0, 500.0, 700.0),
            surface(0.0, 500.0, 503.0),
        ]);
        let found = s.find_surface_below(Vec2::new(250.0, 500.0)).unwrap();
        assert_eq!(found.walkable_y, 503.0);

        let found = s.find_surface_below(Vec2::new(250.0, 400.0)).unwrap();
        assert_eq!(found.walkable_y, 300.0);

        assert!(s.find_surface_below(Vec2::new(600.0, 900.0)).is_none());
    }

    #[test]
    fn next_surface_picks_nearest_ahead() {
        let s = Surfaces::new(vec![
            surface(100.0, 300.0, 500.0),
            surface(700.0, 900.0, 520.0),
            surface(400.0, 600.0, 480.0),
            surface(350.0, 380.0, 800.0),
        ]);
        let right = s.find_next_surface(300.0, 500.0, Direction::Right).unwrap();
        assert_eq!(right.min_x, 400.0);

        let left = s.find_next_surface(650.0, 500.0, Direction::Left).unwrap();
        assert_eq!(left.max_x, 600.0);

        assert!(s.find_next_surface(900.0, 500.0, Direction::Right).is_none());
    }

    fn arb_window() -> impl Strategy<Value = RawWindow> {
        (
            prop::sample::select(vec!["Editor", "Browser", "Dock", "perchcat", "Term"]),
            -200.0f32..2000.0,
            -200.0f32..1200.0,
            0.0f32..1500.0,
            0.0f32..1000.0,
        )
            .prop_map(|(owner, x, y, w, h)| raw(owner, x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_surfaces_sorted_topmost_first(windows in prop::collection::vec(arb_window(), 0..40)) {
            let s = build_surfaces(windows, (1920.0, 1080.0), "perchcat");
            for pair in s.as_slice().windows(2) {
                prop_assert!(pair[0].walkable_y >= pair[1].walkable_y);
            }
        }

        #[test]
        fn prop_surfaces_stay_on_screen(windows in prop::collection::vec(arb_window(), 0..40)) {
            let s = build_surfaces(windows, (1920.0, 1080.0), "perchcat");
            for w in s.as_slice() {
                prop_assert!(w.min_x >= 0.0 && w.max_x <= 1920.0 && w.min_x < w.max_x);
                prop_assert!((0.0..=1080.0).contains(&w.walkable_y));
            }
        }

        #[test]
        fn prop_surface_below_spans_and_is_not_above(
            windows in prop::collection::vec(arb_window(), 0..40),
            x in -200.0f32..2000.0,
            y in 0.0f32..1200.0,
        ) {
            let s = build_surfaces(windows, (1920.0, 1080.0), "perchcat");
            if let Some(found) = s.find_surface_below(Vec2::new(x, y)) {
                prop_assert!(found.spans(x));
                prop_assert!(found.walkable_y <= y + BELOW_TOLERANCE);
            }
        }

        #[test]
        fn prop_next_surface_is_ahead(
            windows in prop::collection::vec(arb_window(), 0..40),
            x in -200.0f32..2000.0,
            y in 0.0f32..1200.0,
            right in any::<bool>(),
        ) {
            let s = build_surfaces(windows, (1920.0, 1080.0), "perchcat");
            let dir = if right { Direction::Right } else { Direction::Left };
            if let Some(next) = s.find_next_surface(x, y, dir) {
                match dir {
                    Direction::Right => prop_assert!(next.min_x > x),
                    Direction::Left => prop_assert!(next.max_x < x),
                }
                prop_assert!((next.walkable_y - y).abs() < NEXT_SURFACE_TOLERANCE);
            }
        }
    }
}
