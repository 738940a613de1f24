/// Behavior and movement knobs. `Default` holds the reference values;
/// tests build their own to pin down geometry and speeds.
#[derive(Debug, Clone)]
pub struct Tuning {
    // --- Sprite / screen ---
    /// Displayed sprite size in pixels (width, height).
    pub sprite_size: (f32, f32),
    /// Extra gap kept between the sprite and the screen edges.
    pub edge_margin: f32,
    /// Screen size used when no display can be queried.
    pub fallback_screen: (f32, f32),
    /// Baseline height when not standing on a window (clears the taskbar/dock).
    pub floor_level: f32,

    // --- Walking ---
    /// Walk speed in pixels/second.
    pub walk_speed: f32,
    /// Running speed as a multiple of walking speed.
    pub run_multiplier: f32,
    /// Bob amplitude in pixels.
    pub bob_amplitude: f32,
    /// Seconds per bob cycle.
    pub bob_period: f32,

    // --- Surfaces ---
    /// How far above the current baseline a surface may be and still be stepped onto.
    pub step_up: f32,
    /// Distance from a surface's far edge that counts as "about to walk off".
    pub walk_off_margin: f32,
    /// Baseline must be this far above the floor before walking off means falling.
    pub fall_height: f32,
    /// 1-in-N per-tick chance to jump from the floor onto a window.
    pub floor_jump_one_in: u32,
    /// A floor jump target must be at least this much higher than the cat.
    pub floor_jump_min_rise: f32,

    // --- Jumps ---
    pub jump_duration: f32,
    /// Apex height above the higher of start and landing.
    pub jump_apex: f32,
    /// Landing point inset from the target's near edge.
    pub jump_landing_inset: f32,
    pub fall_duration: f32,

    // --- Random events ---
    /// Distance between walk/run toggle checks.
    pub run_check_distance: f32,
    pub run_toggle_one_in: u32,
    /// Distance between sit checks (walking only).
    pub sit_check_distance: f32,
    pub sit_one_in: u32,
    /// Walking only starts a new activity while below this count.
    pub activity_cap: u32,
    /// Chaining straight into another activity only while below this count.
    pub chain_cap: u32,
    /// Chance (k, n) of chaining into another activity.
    pub chain_chance: (u32, u32),
    /// Chance (k, n) of turning around when getting up.
    pub reverse_chance: (u32, u32),
    /// Chance (k, n) of a front-facing moment after an activity.
    pub moment_chance: (u32, u32),
    /// Inclusive range of activity loop counts.
    pub activity_loops: (u32, u32),

    // --- Idle ---
    /// Fall asleep when idle strictly exceeds this many seconds.
    pub sleep_after: f64,
    /// Wake when idle drops strictly below this many seconds.
    pub wake_below: f64,
    /// Seconds between idle queries.
    pub idle_poll_interval: f32,

    // --- Interactions ---
    pub interaction_hold: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            sprite_size: (140.0, 110.0),
            edge_margin: 10.0,
            fallback_screen: (800.0, 600.0),
            floor_level: 75.0,

            walk_speed: 60.0,
            run_multiplier: 2.5,
            bob_amplitude: 4.0,
            bob_period: 0.4,

            step_up: 50.0,
            walk_off_margin: 20.0,
            fall_height: 50.0,
            floor_jump_one_in: 6,
            floor_jump_min_rise: 100.0,

            jump_duration: 0.5,
            jump_apex: 80.0,
            jump_landing_inset: 30.0,
            fall_duration: 0.3,

            run_check_distance: 150.0,
            run_toggle_one_in: 5,
            sit_check_distance: 180.0,
            sit_one_in: 3,
            activity_cap: 4,
            chain_cap: 5,
            chain_chance: (2, 5),
            reverse_chance: (2, 5),
            moment_chance: (1, 2),
            activity_loops: (5, 9),

            sleep_after: 300.0,
            wake_below: 10.0,
            idle_poll_interval: 2.0,

            interaction_hold: 3.0,
        }
    }
}

impl Tuning {
    /// Horizontal range the sprite's center may occupy on a screen of `width`.
    pub fn walk_bounds(&self, width: f32) -> (f32, f32) {
        let half = self.sprite_size.0 * 0.5 + self.edge_margin;
        (half, (width - half).max(half))
    }

    pub fn run_speed(&self) -> f32 {
        self.walk_speed * self.run_multiplier
    }
}
