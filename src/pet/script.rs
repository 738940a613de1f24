use std::collections::VecDeque;

use super::dice::Dice;
use super::mode::{Activity, FrameRef, FrameSet, Mode};
use crate::facing::Direction;

// Front frames: 0-3 head tilt, 4 big eyes, 5 eyes closed, 6 eyes open, 7 wink.
const GOLDEN_BIG_EYES: &[usize] = &[4, 6, 4];
const GOLDEN_BLINK: &[usize] = &[4, 5, 4];
const GOLDEN_WINK: &[usize] = &[6, 7, 6];
const GOLDEN_CURIOUS: &[usize] = &[0, 2, 3, 2];

const TURN_GOLDEN: &[&[usize]] = &[GOLDEN_BIG_EYES, GOLDEN_BLINK, GOLDEN_WINK];
const MOMENT_GOLDEN: &[&[usize]] = &[GOLDEN_CURIOUS, GOLDEN_WINK, GOLDEN_BLINK];

/// Front art needs at least this many frames for the golden sequences.
const MIN_FRONT_FRAMES: usize = 6;

/// One timed run of frames inside a scripted sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub mode: Mode,
    pub frames: Vec<FrameRef>,
    pub facing: Direction,
    /// Seconds each frame is held.
    pub interval: f32,
    /// Crossfade into the first frame.
    pub first_fade: f32,
    /// Crossfade between the remaining frames.
    pub fade: f32,
    /// Vertical sprite scale while this phase plays.
    pub scale: f32,
}

/// Seated bridge around a front-facing golden sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bridge {
    /// Full version played when turning at a screen edge.
    Turn,
    /// Shorter version played between activities.
    Moment,
}

struct BridgeTiming {
    settle: &'static [usize],
    settle_interval: f32,
    settle_fades: (f32, f32),
    golden: &'static [&'static [usize]],
    golden_interval: f32,
    golden_fades: (f32, f32),
    rise: &'static [usize],
    rise_interval: f32,
    rise_fades: (f32, f32),
}

const TURN: BridgeTiming = BridgeTiming {
    settle: &[0, 1, 2, 3],
    settle_interval: 0.12,
    settle_fades: (0.15, 0.10),
    golden: TURN_GOLDEN,
    golden_interval: 0.40,
    golden_fades: (0.20, 0.35),
    rise: &[3, 2, 1, 0],
    rise_interval: 0.10,
    rise_fades: (0.20, 0.08),
};

const MOMENT: BridgeTiming = BridgeTiming {
    settle: &[0, 1, 2],
    settle_interval: 0.10,
    settle_fades: (0.12, 0.08),
    golden: MOMENT_GOLDEN,
    golden_interval: 0.35,
    golden_fades: (0.18, 0.30),
    rise: &[2, 1, 0],
    rise_interval: 0.08,
    rise_fades: (0.12, 0.06),
};

/// Build a sit-down / golden-frames / stand-up sequence.
///
/// Returns `None` when the sitdown or front art is missing; callers then skip
/// straight to their continuation.
pub fn bridge(
    kind: Bridge,
    facing: Direction,
    sitdown_len: usize,
    front_len: usize,
    dice: &mut impl Dice,
) -> Option<VecDeque<Phase>> {
    if sitdown_len == 0 || front_len < MIN_FRONT_FRAMES {
        return None;
    }
    let timing = match kind {
        Bridge::Turn => &TURN,
        Bridge::Moment => &MOMENT,
    };
    let golden = timing.golden[dice.pick(timing.golden.len())];
    let sitdown = FrameSet::Activity(Activity::SitDown);
    let front = FrameSet::Activity(Activity::Front);

    let phases = [
        phase(
            Mode::Sitting(Activity::SitDown),
            sitdown,
            timing.settle,
            sitdown_len,
            facing,
            timing.settle_interval,
            timing.settle_fades,
        ),
        phase(
            Mode::Sitting(Activity::Front),
            front,
            golden,
            front_len,
            facing,
            timing.golden_interval,
            timing.golden_fades,
        ),
        phase(
            Mode::Sitting(Activity::SitDown),
            sitdown,
            timing.rise,
            sitdown_len,
            facing,
            timing.rise_interval,
            timing.rise_fades,
        ),
    ];
    Some(phases.into_iter().flatten().collect())
}

/// Wake-up stretch: tall for a moment, then back to normal.
pub fn stretch(facing: Direction) -> VecDeque<Phase> {
    let sleep = vec![FrameRef::new(FrameSet::Sleep, 0)];
    VecDeque::from(vec![
        Phase {
            mode: Mode::Sleeping,
            frames: sleep.clone(),
            facing,
            interval: 0.3,
            first_fade: 0.1,
            fade: 0.1,
            scale: 1.1,
        },
        Phase {
            mode: Mode::Sleeping,
            frames: sleep,
            facing,
            interval: 0.2,
            first_fade: 0.1,
            fade: 0.1,
            scale: 1.0,
        },
    ])
}

fn phase(
    mode: Mode,
    set: FrameSet,
    indices: &[usize],
    available: usize,
    facing: Direction,
    interval: f32,
    (first_fade, fade): (f32, f32),
) -> Option<Phase> {
    let frames: Vec<FrameRef> = indices
        .iter()
        .filter(|&&i| i < available)
        .map(|&i| FrameRef::new(set, i))
        .collect();
    if frames.is_empty() {
        return None;
    }
    Some(Phase {
        mode,
        frames,
        facing,
        interval,
        first_fade,
        fade,
        scale: 1.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::dice::scripted::ScriptedDice;

    fn indices(phase: &Phase) -> Vec<usize> {
        phase.frames.iter().map(|f| f.index).collect()
    }

    #[test]
    fn turn_bridge_settles_holds_and_rises() {
        let mut dice = ScriptedDice::never().with_picks(&[1]);
        let phases = bridge(Bridge::Turn, Direction::Left, 8, 8, &mut dice).unwrap();
        assert_eq!(phases.len(), 3);
        assert_eq!(indices(&phases[0]), vec![0, 1, 2, 3]);
        assert_eq!(phases[0].mode, Mode::Sitting(Activity::SitDown));
        assert_eq!(indices(&phases[1]), GOLDEN_BLINK.to_vec());
        assert_eq!(phases[1].mode, Mode::Sitting(Activity::Front));
        assert_eq!(phases[1].interval, 0.40);
        assert_eq!(indices(&phases[2]), vec![3, 2, 1, 0]);
        assert!(phases.iter().all(|p| p.facing == Direction::Left));
    }

    #[test]
    fn moment_is_shorter() {
        let mut dice = ScriptedDice::never();
        let phases = bridge(Bridge::Moment, Direction::Right, 8, 8, &mut dice).unwrap();
        assert_eq!(indices(&phases[0]), vec![0, 1, 2]);
        assert_eq!(indices(&phases[1]), GOLDEN_CURIOUS.to_vec());
        assert_eq!(indices(&phases[2]), vec![2, 1, 0]);
    }

    #[test]
    fn needs_front_and_sitdown_art() {
        let mut dice = ScriptedDice::never();
        assert!(bridge(Bridge::Turn, Direction::Right, 0, 8, &mut dice).is_none());
        assert!(bridge(Bridge::Turn, Direction::Right, 8, 5, &mut dice).is_none());
    }

    #[test]
    fn short_sets_drop_missing_frames() {
        let mut dice = ScriptedDice::never().with_picks(&[2]);
        let phases = bridge(Bridge::Turn, Direction::Right, 2, 7, &mut dice).unwrap();
        assert_eq!(indices(&phases[0]), vec![0, 1]);
        assert_eq!(indices(&phases[1]), vec![6, 6]);
        assert_eq!(indices(&phases[2]), vec![1, 0]);
    }
}
