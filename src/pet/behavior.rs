//! Behavior state machine.
//!
//! [`Brain::handle`] is the single transition function: it takes the current
//! mode plus one [`Event`] and returns the [`Effect`]s for the presentation
//! layer. Timed sequences (activity loops, edge-turn bridges, holds) are data
//! in [`Program`], advanced one step per `FrameDue` event, and every new
//! program re-arms the single [`FrameTimer`].

use std::collections::{HashMap, VecDeque};

use super::dice::Dice;
use super::mode::{Activity, FrameRef, FrameSet, InteractionKind, Mode};
use super::movement::Agent;
use super::script::{self, Bridge, Phase};
use super::timer::FrameTimer;
use crate::facing::Direction;
use crate::tuning::Tuning;

const WALK_INTERVAL: f32 = 0.08;
const RUN_INTERVAL: f32 = 0.05;
/// Crossfade into the first frame of a walk/run cycle.
const MOVE_FIRST_FADE: f32 = 0.12;
/// Walk/run crossfades take this share of the frame interval.
const MOVE_FADE_SHARE: f32 = 0.8;

const SIT_INTERVAL: f32 = 0.28;
const SIT_FIRST_FADE: f32 = 0.20;
const SIT_FADE: f32 = 0.22;
/// 1-in-N chance to linger after a frame, for 1-3 frames.
const MID_LINGER_ONE_IN: u32 = 3;
const MID_LINGER: (u32, u32) = (1, 3);
/// 1-in-N chance to rest between loops, for 2-4 frames.
const LOOP_LINGER_ONE_IN: u32 = 2;
const LOOP_LINGER: (u32, u32) = (2, 4);

const POSE_FADE: f32 = 0.15;

/// Loaded frame count per set.
#[derive(Debug, Clone, Default)]
pub struct SetSizes(HashMap<FrameSet, usize>);

impl SetSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, set: FrameSet, len: usize) -> Self {
        self.0.insert(set, len);
        self
    }

    pub fn len(&self, set: FrameSet) -> usize {
        self.0.get(&set).copied().unwrap_or(0)
    }

    /// Activities with at least one frame, in declaration order.
    pub fn available_activities(&self) -> Vec<Activity> {
        Activity::ALL
            .into_iter()
            .filter(|&a| self.len(FrameSet::Activity(a)) > 0)
            .collect()
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Begin (or resume) walking.
    Start,
    /// Stop all frame timing; the overlay is hidden.
    Suspend,
    /// Moved this many pixels while walking or running.
    Travelled(f32),
    /// Bounced off a screen edge. Direction is already reversed.
    EdgeReached,
    /// Turned around at the end of a window. Direction is already reversed.
    Turned,
    JumpStarted,
    Landed,
    /// The frame timer fired.
    FrameDue,
    FellAsleep,
    Woke,
    Interact(InteractionKind),
    /// The sprite's context menu opened. The cat sits still until it closes.
    MenuOpened,
    /// The context menu closed with the user's pick, if any.
    MenuClosed(Option<InteractionKind>),
}

/// A frame to put on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shown {
    pub frame: FrameRef,
    pub facing: Direction,
    /// Crossfade duration in seconds.
    pub fade: f32,
    /// Vertical scale.
    pub scale: f32,
    /// Slow vertical breathing while the pose is held.
    pub breathe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Show(Shown),
    ModeChanged(Mode),
}

/// What should happen when a finite program ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Then {
    Walk,
    FinishActivity,
}

#[derive(Debug, Clone)]
struct ActivityRun {
    activity: Activity,
    index: usize,
    loop_no: u32,
    loops: u32,
    /// Frames left to linger before advancing.
    pause: u32,
}

/// The sequence the frame timer is currently driving.
#[derive(Debug, Clone)]
enum Program {
    /// Nothing scheduled: a held pose, a jump, or suspended.
    Still,
    /// Endless walk or run cycle.
    Loop { set: FrameSet, index: usize },
    Activity(ActivityRun),
    Script {
        phases: VecDeque<Phase>,
        index: usize,
        then: Then,
    },
    /// Hold the current pose for one timer period.
    Hold { then: Then },
}

pub struct Brain {
    tuning: Tuning,
    sizes: SetSizes,
    mode: Mode,
    program: Program,
    timer: FrameTimer,
    since_run_check: f32,
    since_sit_check: f32,
    activities_this_trip: u32,
    effects: Vec<Effect>,
}

impl Brain {
    pub fn new(tuning: Tuning, sizes: SetSizes) -> Self {
        Self {
            tuning,
            sizes,
            mode: Mode::Walking,
            program: Program::Still,
            timer: FrameTimer::new(),
            since_run_check: 0.0,
            since_sit_check: 0.0,
            activities_this_trip: 0,
            effects: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub fn activities_this_trip(&self) -> u32 {
        self.activities_this_trip
    }

    #[cfg(test)]
    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Advance the frame timer; true when a `FrameDue` should be handled.
    pub fn advance_timer(&mut self, dt: f32) -> bool {
        self.timer.advance(dt)
    }

    pub fn handle(&mut self, event: Event, agent: &mut Agent, dice: &mut impl Dice) -> Vec<Effect> {
        match event {
            Event::Start => self.start_moving(Mode::Walking, agent),
            Event::Suspend => {
                self.timer.cancel();
                self.program = Program::Still;
            }
            Event::Travelled(distance) => self.travelled(distance, agent, dice),
            Event::EdgeReached => self.edge_turn(agent, dice),
            Event::Turned => {
                let mode = self.mode;
                if mode.is_moving() {
                    self.start_moving(mode, agent);
                }
            }
            Event::JumpStarted => self.hold_pose(Mode::Jumping, FrameSet::Jump, agent),
            Event::Landed => self.start_moving(Mode::Walking, agent),
            Event::FrameDue => self.frame_due(agent, dice),
            Event::FellAsleep => self.hold_pose(Mode::Sleeping, FrameSet::Sleep, agent),
            Event::Woke => {
                if self.mode == Mode::Sleeping {
                    self.play(script::stretch(agent.direction), Then::Walk, agent, dice);
                }
            }
            Event::Interact(kind) => {
                self.interact(kind, agent);
            }
            Event::MenuOpened => self.menu_opened(agent),
            Event::MenuClosed(choice) => self.menu_closed(choice, agent),
        }
        std::mem::take(&mut self.effects)
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            log::debug!("Mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.effects.push(Effect::ModeChanged(mode));
        }
    }

    fn show(&mut self, frame: FrameRef, facing: Direction, fade: f32, scale: f32) {
        self.effects.push(Effect::Show(Shown {
            frame,
            facing,
            fade,
            scale,
            breathe: false,
        }));
    }

    fn start_moving(&mut self, mode: Mode, agent: &Agent) {
        let (mode, set, interval) = match mode {
            Mode::Running => (Mode::Running, FrameSet::Running, RUN_INTERVAL),
            _ => (Mode::Walking, FrameSet::Walking, WALK_INTERVAL),
        };
        self.set_mode(mode);
        self.program = Program::Loop { set, index: 0 };
        if self.sizes.len(set) > 0 {
            self.show(FrameRef::new(set, 0), agent.direction, MOVE_FIRST_FADE, 1.0);
        }
        self.timer.start(interval);
    }

    fn hold_pose(&mut self, mode: Mode, set: FrameSet, agent: &Agent) {
        self.timer.cancel();
        self.program = Program::Still;
        self.set_mode(mode);
        if self.sizes.len(set) > 0 {
            self.effects.push(Effect::Show(Shown {
                frame: FrameRef::new(set, 0),
                facing: agent.direction,
                fade: POSE_FADE,
                scale: 1.0,
                breathe: mode == Mode::Sleeping,
            }));
        }
    }

    fn travelled(&mut self, distance: f32, agent: &mut Agent, dice: &mut impl Dice) {
        if !self.mode.is_moving() {
            return;
        }

        self.since_run_check += distance;
        if self.since_run_check > self.tuning.run_check_distance
            && self.sizes.len(FrameSet::Running) > 0
        {
            self.since_run_check = 0.0;
            if dice.one_in(self.tuning.run_toggle_one_in) {
                let next = if self.mode == Mode::Running {
                    Mode::Walking
                } else {
                    Mode::Running
                };
                self.start_moving(next, agent);
            }
        }

        if self.mode == Mode::Walking {
            self.since_sit_check += distance;
            if self.since_sit_check > self.tuning.sit_check_distance
                && self.activities_this_trip < self.tuning.activity_cap
            {
                self.since_sit_check = 0.0;
                if dice.one_in(self.tuning.sit_one_in) {
                    self.start_sitting(agent, dice);
                }
            }
        }
    }

    /// Sit down with a random available activity. False if none is loaded.
    fn start_sitting(&mut self, agent: &Agent, dice: &mut impl Dice) -> bool {
        let available = self.sizes.available_activities();
        if available.is_empty() {
            return false;
        }
        let activity = available[dice.pick(available.len())];
        self.perform_activity(activity, agent, dice);
        true
    }

    fn perform_activity(&mut self, activity: Activity, agent: &Agent, dice: &mut impl Dice) {
        let (lo, hi) = self.tuning.activity_loops;
        let loops = dice.between(lo, hi);
        self.set_mode(Mode::Sitting(activity));
        self.activities_this_trip += 1;
        self.show(
            FrameRef::new(FrameSet::Activity(activity), 0),
            agent.direction,
            SIT_FIRST_FADE,
            1.0,
        );
        self.program = Program::Activity(ActivityRun {
            activity,
            index: 1,
            loop_no: 0,
            loops,
            pause: 0,
        });
        self.timer.start(SIT_INTERVAL);
        log::debug!(
            "Doing activity: {} ({} loops, #{} this trip)",
            activity.label(),
            loops,
            self.activities_this_trip
        );
    }

    fn frame_due(&mut self, agent: &mut Agent, dice: &mut impl Dice) {
        match std::mem::replace(&mut self.program, Program::Still) {
            Program::Still => {}
            Program::Loop { set, index } => {
                let len = self.sizes.len(set);
                let index = if len == 0 { index } else { (index + 1) % len };
                if len > 0 {
                    let interval = self.timer.interval().unwrap_or(WALK_INTERVAL);
                    self.show(
                        FrameRef::new(set, index),
                        agent.direction,
                        interval * MOVE_FADE_SHARE,
                        1.0,
                    );
                }
                self.program = Program::Loop { set, index };
            }
            Program::Activity(run) => self.advance_activity(run, agent, dice),
            Program::Script {
                phases,
                index,
                then,
            } => self.advance_script(phases, index, then, agent, dice),
            Program::Hold { then } => {
                self.timer.cancel();
                self.continue_with(then, agent, dice);
            }
        }
    }

    fn advance_activity(&mut self, mut run: ActivityRun, agent: &mut Agent, dice: &mut impl Dice) {
        if run.pause > 0 {
            run.pause -= 1;
            self.program = Program::Activity(run);
            return;
        }

        let set = FrameSet::Activity(run.activity);
        if run.index < self.sizes.len(set) {
            self.show(FrameRef::new(set, run.index), agent.direction, SIT_FADE, 1.0);
            run.index += 1;
            if dice.one_in(MID_LINGER_ONE_IN) {
                run.pause = dice.between(MID_LINGER.0, MID_LINGER.1);
            }
            self.program = Program::Activity(run);
            return;
        }

        run.loop_no += 1;
        if run.loop_no < run.loops {
            run.index = 0;
            if dice.one_in(LOOP_LINGER_ONE_IN) {
                run.pause = dice.between(LOOP_LINGER.0, LOOP_LINGER.1);
            }
            self.program = Program::Activity(run);
        } else {
            self.timer.cancel();
            self.end_activity(run.activity, agent, dice);
        }
    }

    /// Optionally look at the user, then decide what comes next.
    fn end_activity(&mut self, activity: Activity, agent: &mut Agent, dice: &mut impl Dice) {
        let (k, n) = self.tuning.moment_chance;
        if activity != Activity::Front && dice.chance(k, n) {
            if let Some(phases) = self.bridge(Bridge::Moment, agent.direction, dice) {
                self.play(phases, Then::FinishActivity, agent, dice);
                return;
            }
        }
        self.finish_activity(agent, dice);
    }

    /// Chain another activity or get up and walk, maybe the other way.
    fn finish_activity(&mut self, agent: &mut Agent, dice: &mut impl Dice) {
        let (k, n) = self.tuning.chain_chance;
        if dice.chance(k, n)
            && self.activities_this_trip < self.tuning.chain_cap
            && self.start_sitting(agent, dice)
        {
            return;
        }
        let (k, n) = self.tuning.reverse_chance;
        if dice.chance(k, n) {
            agent.direction = agent.direction.reversed();
        }
        self.start_moving(Mode::Walking, agent);
    }

    fn edge_turn(&mut self, agent: &mut Agent, dice: &mut impl Dice) {
        self.activities_this_trip = 0;
        self.since_run_check = 0.0;
        self.since_sit_check = 0.0;

        // The bridge faces the way we came; walking resumes the new way.
        let facing = agent.direction.reversed();
        match self.bridge(Bridge::Turn, facing, dice) {
            Some(phases) => self.play(phases, Then::Walk, agent, dice),
            None => self.start_moving(Mode::Walking, agent),
        }
    }

    fn bridge(
        &self,
        kind: Bridge,
        facing: Direction,
        dice: &mut impl Dice,
    ) -> Option<VecDeque<Phase>> {
        script::bridge(
            kind,
            facing,
            self.sizes.len(FrameSet::Activity(Activity::SitDown)),
            self.sizes.len(FrameSet::Activity(Activity::Front)),
            dice,
        )
    }

    fn play(
        &mut self,
        phases: VecDeque<Phase>,
        then: Then,
        agent: &mut Agent,
        dice: &mut impl Dice,
    ) {
        match phases.front() {
            Some(first) => self.start_phase(first),
            None => {
                self.continue_with(then, agent, dice);
                return;
            }
        }
        self.program = Program::Script {
            phases,
            index: 1,
            then,
        };
    }

    fn start_phase(&mut self, phase: &Phase) {
        self.set_mode(phase.mode);
        self.show(phase.frames[0], phase.facing, phase.first_fade, phase.scale);
        self.timer.start(phase.interval);
    }

    fn advance_script(
        &mut self,
        mut phases: VecDeque<Phase>,
        index: usize,
        then: Then,
        agent: &mut Agent,
        dice: &mut impl Dice,
    ) {
        if let Some(current) = phases.front() {
            if index < current.frames.len() {
                let (frame, facing, fade, scale) =
                    (current.frames[index], current.facing, current.fade, current.scale);
                self.show(frame, facing, fade, scale);
                self.program = Program::Script {
                    phases,
                    index: index + 1,
                    then,
                };
                return;
            }
        }

        phases.pop_front();
        match phases.front() {
            Some(next) => {
                self.start_phase(next);
                self.program = Program::Script {
                    phases,
                    index: 1,
                    then,
                };
            }
            None => {
                self.timer.cancel();
                self.continue_with(then, agent, dice);
            }
        }
    }

    fn continue_with(&mut self, then: Then, agent: &mut Agent, dice: &mut impl Dice) {
        match then {
            Then::Walk => self.start_moving(Mode::Walking, agent),
            Then::FinishActivity => self.finish_activity(agent, dice),
        }
    }

    /// Start a held interaction pose. False if it could not start.
    fn interact(&mut self, kind: InteractionKind, agent: &Agent) -> bool {
        if self.mode == Mode::Jumping {
            return false;
        }
        let set = FrameSet::Interaction(kind);
        if self.sizes.len(set) == 0 {
            log::warn!("No {} pose loaded, ignoring interaction", kind.label());
            return false;
        }
        self.set_mode(Mode::Interacting(kind));
        self.show(FrameRef::new(set, 0), agent.direction, POSE_FADE, 1.0);
        self.program = Program::Hold { then: Then::Walk };
        self.timer.start(self.tuning.interaction_hold);
        log::info!("Interaction: {}", kind.label());
        true
    }

    /// Freeze on the sitting pose while the menu is up. The menu blocks the
    /// frame loop, so the pose is shown without a fade.
    fn menu_opened(&mut self, agent: &Agent) {
        if self.mode == Mode::Jumping {
            return;
        }
        self.timer.cancel();
        self.program = Program::Still;
        if self.sizes.len(FrameSet::Sit) > 0 {
            self.show(FrameRef::new(FrameSet::Sit, 0), agent.direction, 0.0, 1.0);
        }
    }

    fn menu_closed(&mut self, choice: Option<InteractionKind>, agent: &Agent) {
        if self.mode == Mode::Jumping {
            return;
        }
        if choice.is_some_and(|kind| self.interact(kind, agent)) {
            return;
        }
        if self.mode == Mode::Sleeping {
            self.hold_pose(Mode::Sleeping, FrameSet::Sleep, agent);
        } else {
            self.start_moving(Mode::Walking, agent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::dice::scripted::ScriptedDice;
    use proptest::prelude::*;

    fn full_sizes() -> SetSizes {
        SetSizes::new()
            .with(FrameSet::Walking, 8)
            .with(FrameSet::Running, 8)
            .with(FrameSet::Activity(Activity::SitDown), 8)
            .with(FrameSet::Activity(Activity::Yarn), 4)
            .with(FrameSet::Activity(Activity::Belly), 4)
            .with(FrameSet::Activity(Activity::Wave), 8)
            .with(FrameSet::Activity(Activity::Front), 8)
            .with(FrameSet::Sit, 1)
            .with(FrameSet::Jump, 1)
            .with(FrameSet::Sleep, 1)
            .with(FrameSet::Interaction(InteractionKind::Pet), 1)
    }

    fn walk_only() -> SetSizes {
        SetSizes::new().with(FrameSet::Walking, 8)
    }

    fn agent() -> Agent {
        Agent::new(500.0, 75.0, Direction::Right)
    }

    fn shown(effects: &[Effect]) -> Vec<FrameRef> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Show(s) => Some(s.frame),
                Effect::ModeChanged(_) => None,
            })
            .collect()
    }

    /// Feed `FrameDue` until `mode` is reached or `limit` runs out.
    fn run_until(
        brain: &mut Brain,
        agent: &mut Agent,
        dice: &mut ScriptedDice,
        mode: Mode,
        limit: usize,
    ) -> Vec<Mode> {
        let mut seen = Vec::new();
        for _ in 0..limit {
            for e in brain.handle(Event::FrameDue, agent, dice) {
                if let Effect::ModeChanged(m) = e {
                    seen.push(m);
                }
            }
            if brain.mode() == mode {
                break;
            }
        }
        seen
    }

    #[test]
    fn start_shows_first_walk_frame() {
        let mut brain = Brain::new(Tuning::default(), walk_only());
        let mut a = agent();
        let effects = brain.handle(Event::Start, &mut a, &mut ScriptedDice::never());
        assert_eq!(shown(&effects), vec![FrameRef::new(FrameSet::Walking, 0)]);
        assert_eq!(brain.timer().interval(), Some(WALK_INTERVAL));
    }

    #[test]
    fn walk_cycle_wraps() {
        let mut brain = Brain::new(Tuning::default(), walk_only());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        let mut frames = Vec::new();
        for _ in 0..9 {
            frames.extend(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)));
        }
        let indices: Vec<usize> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6, 7, 0, 1]);
    }

    #[test]
    fn run_toggle_after_distance() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never().with_chances(&[true]);
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Travelled(100.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
        brain.handle(Event::Travelled(60.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Running);
        assert_eq!(brain.timer().interval(), Some(RUN_INTERVAL));
    }

    #[test]
    fn sits_after_distance_when_lucky() {
        let mut brain = Brain::new(Tuning::default(), walk_only().with(FrameSet::Activity(Activity::Wave), 8));
        let mut a = agent();
        let mut dice = ScriptedDice::never().with_chances(&[true]);
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Travelled(179.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
        let effects = brain.handle(Event::Travelled(2.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Sitting(Activity::Wave));
        assert_eq!(brain.activities_this_trip(), 1);
        assert!(effects.contains(&Effect::ModeChanged(Mode::Sitting(Activity::Wave))));
        assert_eq!(brain.timer().interval(), Some(SIT_INTERVAL));
    }

    #[test]
    fn walking_stops_sitting_at_activity_cap_until_edge() {
        let mut brain = Brain::new(Tuning::default(), walk_only().with(FrameSet::Activity(Activity::Wave), 8));
        let mut a = agent();
        let mut dice = ScriptedDice::always();
        for _ in 0..4 {
            brain.perform_activity(Activity::Wave, &a, &mut ScriptedDice::never());
        }
        assert_eq!(brain.activities_this_trip(), 4);

        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Travelled(200.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);

        brain.handle(Event::EdgeReached, &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
        assert_eq!(brain.activities_this_trip(), 0);
        brain.handle(Event::Travelled(200.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Sitting(Activity::Wave));
        assert_eq!(brain.activities_this_trip(), 1);
    }

    #[test]
    fn no_sitting_without_activity_frames() {
        let mut brain = Brain::new(Tuning::default(), walk_only());
        let mut a = agent();
        let mut dice = ScriptedDice::always();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Travelled(500.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn activity_loops_then_walks() {
        let sizes = walk_only().with(FrameSet::Activity(Activity::Yarn), 4);
        let mut brain = Brain::new(Tuning::default(), sizes);
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.perform_activity(Activity::Yarn, &a, &mut dice);
        assert_eq!(brain.mode(), Mode::Sitting(Activity::Yarn));

        // Five loops of four frames, plus one tick per loop boundary.
        let mut dues = 0;
        while brain.mode() != Mode::Walking {
            brain.handle(Event::FrameDue, &mut a, &mut dice);
            dues += 1;
            assert!(dues < 100);
        }
        assert_eq!(dues, 3 + 4 * 4 + 5);
        assert_eq!(a.direction, Direction::Right);
    }

    #[test]
    fn lingering_pauses_hold_the_frame() {
        let sizes = walk_only().with(FrameSet::Activity(Activity::Yarn), 4);
        let mut brain = Brain::new(Tuning::default(), sizes);
        let mut a = agent();
        let mut dice = ScriptedDice::never().with_chances(&[true]).with_values(&[2]);
        brain.perform_activity(Activity::Yarn, &a, &mut ScriptedDice::never());
        assert_eq!(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)).len(), 1);
        assert!(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)).is_empty());
        assert!(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)).is_empty());
        assert_eq!(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)).len(), 1);
    }

    #[test]
    fn finishing_can_chain_another_activity() {
        let sizes = walk_only().with(FrameSet::Activity(Activity::Belly), 4);
        let mut brain = Brain::new(Tuning::default(), sizes);
        let mut a = agent();
        brain.perform_activity(Activity::Belly, &a, &mut ScriptedDice::never());
        brain.finish_activity(&mut a, &mut ScriptedDice::always());
        assert_eq!(brain.mode(), Mode::Sitting(Activity::Belly));
        assert_eq!(brain.activities_this_trip(), 2);
    }

    #[test]
    fn chain_respects_cap() {
        let sizes = walk_only().with(FrameSet::Activity(Activity::Belly), 4);
        let mut brain = Brain::new(Tuning::default(), sizes);
        let mut a = agent();
        for _ in 0..5 {
            brain.perform_activity(Activity::Belly, &a, &mut ScriptedDice::never());
        }
        brain.finish_activity(&mut a, &mut ScriptedDice::always());
        assert_eq!(brain.mode(), Mode::Walking);
        // The reverse roll succeeded too.
        assert_eq!(a.direction, Direction::Left);
    }

    #[test]
    fn moment_plays_before_finishing() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never().with_chances(&[true]);
        brain.perform_activity(Activity::Wave, &a, &mut ScriptedDice::never());
        brain.timer.cancel();
        brain.end_activity(Activity::Wave, &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Sitting(Activity::SitDown));
        let modes = run_until(&mut brain, &mut a, &mut dice, Mode::Walking, 50);
        assert_eq!(
            modes,
            vec![
                Mode::Sitting(Activity::Front),
                Mode::Sitting(Activity::SitDown),
                Mode::Walking
            ]
        );
    }

    #[test]
    fn no_moment_after_front_activity() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        // At the chain cap, so finishing can only stand up and walk.
        for _ in 0..5 {
            brain.perform_activity(Activity::Front, &a, &mut ScriptedDice::never());
        }
        brain.end_activity(Activity::Front, &mut a, &mut ScriptedDice::always());
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn edge_turn_bridges_then_walks() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.perform_activity(Activity::Yarn, &a, &mut dice);
        a.direction = Direction::Left;

        let effects = brain.handle(Event::EdgeReached, &mut a, &mut dice);
        assert_eq!(brain.activities_this_trip(), 0);
        assert_eq!(brain.mode(), Mode::Sitting(Activity::SitDown));
        match effects.iter().find_map(|e| match e {
            Effect::Show(s) => Some(*s),
            Effect::ModeChanged(_) => None,
        }) {
            Some(s) => assert_eq!(s.facing, Direction::Right),
            None => panic!("bridge showed nothing"),
        }

        let modes = run_until(&mut brain, &mut a, &mut dice, Mode::Walking, 50);
        assert_eq!(modes.last(), Some(&Mode::Walking));
        assert!(modes.contains(&Mode::Sitting(Activity::Front)));
        assert_eq!(a.direction, Direction::Left);
    }

    #[test]
    fn edge_turn_without_bridge_art_walks_at_once() {
        let mut brain = Brain::new(Tuning::default(), walk_only());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::EdgeReached, &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn jump_then_land_walks() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        let effects = brain.handle(Event::JumpStarted, &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Jumping);
        assert!(!brain.timer().is_armed());
        assert_eq!(shown(&effects), vec![FrameRef::new(FrameSet::Jump, 0)]);

        brain.handle(Event::Interact(InteractionKind::Pet), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Jumping);

        brain.handle(Event::Landed, &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn interaction_holds_then_walks() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Interact(InteractionKind::Pet), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Interacting(InteractionKind::Pet));
        assert_eq!(brain.timer().interval(), Some(3.0));

        brain.handle(Event::FrameDue, &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn menu_sits_still_then_resumes_walking() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);

        let effects = brain.handle(Event::MenuOpened, &mut a, &mut dice);
        assert_eq!(shown(&effects), vec![FrameRef::new(FrameSet::Sit, 0)]);
        assert!(!brain.timer().is_armed());
        assert!(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)).is_empty());

        brain.handle(Event::MenuClosed(None), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
        assert_eq!(brain.timer().interval(), Some(WALK_INTERVAL));
    }

    #[test]
    fn menu_pick_starts_interaction() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::MenuOpened, &mut a, &mut dice);
        brain.handle(Event::MenuClosed(Some(InteractionKind::Pet)), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Interacting(InteractionKind::Pet));

        // Feed has no pose, so the cat gets up instead of freezing.
        brain.handle(Event::MenuOpened, &mut a, &mut dice);
        brain.handle(Event::MenuClosed(Some(InteractionKind::Feed)), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
        assert!(brain.timer().is_armed());
    }

    #[test]
    fn menu_ignored_mid_jump() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::JumpStarted, &mut a, &mut dice);
        assert!(brain.handle(Event::MenuOpened, &mut a, &mut dice).is_empty());
        brain.handle(Event::MenuClosed(None), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Jumping);
    }

    #[test]
    fn missing_interaction_pose_is_ignored() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Interact(InteractionKind::Feed), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn sleep_then_stretch_awake() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        let effects = brain.handle(Event::FellAsleep, &mut a, &mut dice);
        assert!(effects.iter().any(|e| matches!(e, Effect::Show(s) if s.breathe)));
        assert_eq!(brain.mode(), Mode::Sleeping);
        assert!(!brain.timer().is_armed());

        brain.handle(Event::Travelled(500.0), &mut a, &mut dice);
        assert_eq!(brain.mode(), Mode::Sleeping);

        let effects = brain.handle(Event::Woke, &mut a, &mut dice);
        let stretched = effects.iter().any(|e| matches!(e, Effect::Show(s) if s.scale > 1.0));
        assert!(stretched);
        run_until(&mut brain, &mut a, &mut dice, Mode::Walking, 10);
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn wake_while_awake_is_ignored() {
        let mut brain = Brain::new(Tuning::default(), full_sizes());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        let effects = brain.handle(Event::Woke, &mut a, &mut dice);
        assert!(effects.is_empty());
        assert_eq!(brain.mode(), Mode::Walking);
    }

    #[test]
    fn suspend_cancels_timer() {
        let mut brain = Brain::new(Tuning::default(), walk_only());
        let mut a = agent();
        let mut dice = ScriptedDice::never();
        brain.handle(Event::Start, &mut a, &mut dice);
        brain.handle(Event::Suspend, &mut a, &mut dice);
        assert!(!brain.timer().is_armed());
        assert!(shown(&brain.handle(Event::FrameDue, &mut a, &mut dice)).is_empty());
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        prop_oneof![
            6 => (1.0f32..40.0).prop_map(Event::Travelled),
            8 => Just(Event::FrameDue),
            1 => Just(Event::EdgeReached),
            1 => Just(Event::Turned),
            1 => Just(Event::JumpStarted),
            1 => Just(Event::Landed),
            1 => Just(Event::FellAsleep),
            1 => Just(Event::Woke),
            1 => Just(Event::Interact(InteractionKind::Pet)),
            1 => Just(Event::MenuOpened),
            1 => Just(Event::MenuClosed(None)),
        ]
    }

    proptest! {
        #[test]
        fn prop_caps_and_single_timer(
            events in prop::collection::vec(arb_event(), 1..400),
            seed in any::<u64>(),
        ) {
            let tuning = Tuning {
                sit_one_in: 1,
                chain_chance: (1, 1),
                ..Tuning::default()
            };
            let mut brain = Brain::new(tuning.clone(), full_sizes());
            let mut a = agent();
            let mut rng = fastrand::Rng::with_seed(seed);
            brain.handle(Event::Start, &mut a, &mut rng);
            for event in events {
                brain.handle(event, &mut a, &mut rng);
                prop_assert!(brain.activities_this_trip() <= tuning.chain_cap);
                let live = brain.timer().started() - brain.timer().cancelled();
                prop_assert_eq!(live, u64::from(brain.timer().is_armed()));
            }
        }
    }
}
