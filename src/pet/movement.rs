use std::f32::consts::TAU;

use glam::Vec2;

use super::dice::Dice;
use crate::facing::Direction;
use crate::surface::{Surfaces, WindowSurface};
use crate::tuning::Tuning;

/// Where the cat is and what it stands on.
#[derive(Debug, Clone)]
pub struct Agent {
    /// x = sprite center, y = feet (bob included).
    pub position: Vec2,
    /// Height of whatever the cat stands on.
    pub base_y: f32,
    pub direction: Direction,
    /// `None` means the floor.
    pub surface: Option<WindowSurface>,
    bob_phase: f32,
}

impl Agent {
    pub fn new(x: f32, floor: f32, direction: Direction) -> Self {
        Self {
            position: Vec2::new(x, floor),
            base_y: floor,
            direction,
            surface: None,
            bob_phase: 0.0,
        }
    }

    /// Land at the end of a flight.
    pub fn land(&mut self, at: Vec2, surface: Option<WindowSurface>) {
        self.position = at;
        self.base_y = at.y;
        self.surface = surface;
        self.bob_phase = 0.0;
    }

    fn bob(&self, tuning: &Tuning) -> f32 {
        self.bob_phase.sin() * tuning.bob_amplitude
    }
}

/// Outcome of one movement tick.
#[derive(Debug, Clone)]
pub enum Step {
    Moved { distance: f32 },
    /// Hit a screen edge; position reflected and direction already reversed.
    EdgeReached,
    /// Reached the end of a window with nowhere to go; direction reversed.
    Turned,
    /// Left the ground. The caller owns the flight until it lands.
    Launched(Flight),
}

/// Advance a walking/running cat by one tick.
pub fn step(
    agent: &mut Agent,
    running: bool,
    dt: f32,
    surfaces: &Surfaces,
    screen_w: f32,
    tuning: &Tuning,
    dice: &mut impl Dice,
) -> Step {
    let speed = if running {
        tuning.run_speed()
    } else {
        tuning.walk_speed
    };
    let dir = agent.direction;
    let dx = speed * dir.sign() * dt;

    agent.bob_phase = (agent.bob_phase + dt * TAU / tuning.bob_period) % TAU;
    let bob = agent.bob(tuning);

    let (lo, hi) = tuning.walk_bounds(screen_w);
    // Only surfaces the cat can land on without leaving the overlay.
    let reachable = |target: &&WindowSurface| {
        (lo..=hi).contains(&Flight::landing_x(target, dir, tuning))
    };

    let mut new_x = agent.position.x + dx;
    let probe = Vec2::new(new_x, agent.base_y + tuning.step_up);

    if let Some(surface) = surfaces.find_surface_below(probe) {
        agent.base_y = surface.walkable_y;
        agent.surface = Some(surface.clone());

        let walking_off = match dir {
            Direction::Right => new_x > surface.max_x - tuning.walk_off_margin,
            Direction::Left => new_x < surface.min_x + tuning.walk_off_margin,
        };
        if walking_off {
            let new_y = agent.base_y + bob;
            if let Some(next) = surfaces.find_next_surface(new_x, new_y, dir).filter(reachable) {
                log::debug!("Jumping from {} to {}", surface.owner, next.owner);
                return Step::Launched(Flight::jump(agent.position, next, dir, tuning));
            }
            if agent.base_y > tuning.floor_level + tuning.fall_height {
                log::debug!("Dropping off {}", surface.owner);
                return Step::Launched(Flight::fall(agent.position, tuning));
            }
            agent.direction = dir.reversed();
            return Step::Turned;
        }
    } else {
        agent.base_y = tuning.floor_level;
        agent.surface = None;

        let feet = agent.base_y + bob;
        let candidates: Vec<&WindowSurface> = surfaces
            .above(feet, tuning.floor_jump_min_rise)
            .filter(reachable)
            .collect();
        if !candidates.is_empty() && dice.one_in(tuning.floor_jump_one_in) {
            let target = candidates[dice.pick(candidates.len())];
            log::debug!("Jumping from the floor onto {}", target.owner);
            return Step::Launched(Flight::jump(agent.position, target, dir, tuning));
        }
    }

    let overshoot = match dir {
        Direction::Right if new_x > hi => Some(hi),
        Direction::Left if new_x < lo => Some(lo),
        _ => None,
    };
    if let Some(bound) = overshoot {
        new_x = (2.0 * bound - new_x).clamp(lo, hi);
        agent.position = Vec2::new(new_x, agent.base_y);
        agent.direction = dir.reversed();
        return Step::EdgeReached;
    }

    agent.position = Vec2::new(new_x, agent.base_y + bob);
    Step::Moved {
        distance: dx.abs(),
    }
}

/// A timed quadratic path from one resting point to another.
#[derive(Debug, Clone)]
pub struct Flight {
    from: Vec2,
    control: Vec2,
    to: Vec2,
    elapsed: f32,
    duration: f32,
    /// Accelerate instead of moving at constant parameter speed.
    ease_in: bool,
    landing: Option<WindowSurface>,
}

impl Flight {
    /// Arc onto `target`, landing just inside its near edge.
    pub fn jump(from: Vec2, target: &WindowSurface, dir: Direction, tuning: &Tuning) -> Self {
        let to = Vec2::new(Self::landing_x(target, dir, tuning), target.walkable_y);
        let apex = from.y.max(to.y) + tuning.jump_apex;
        Self {
            from,
            control: Vec2::new((from.x + to.x) * 0.5, apex),
            to,
            elapsed: 0.0,
            duration: tuning.jump_duration,
            ease_in: false,
            landing: Some(target.clone()),
        }
    }

    /// Where a jump onto `target` heading `dir` touches down.
    pub fn landing_x(target: &WindowSurface, dir: Direction, tuning: &Tuning) -> f32 {
        match dir {
            Direction::Right => target.min_x + tuning.jump_landing_inset,
            Direction::Left => target.max_x - tuning.jump_landing_inset,
        }
    }

    /// Straight drop to the floor.
    pub fn fall(from: Vec2, tuning: &Tuning) -> Self {
        let to = Vec2::new(from.x, tuning.floor_level);
        Self {
            from,
            control: from.lerp(to, 0.5),
            to,
            elapsed: 0.0,
            duration: tuning.fall_duration,
            ease_in: true,
            landing: None,
        }
    }

    /// Advance and return the new position plus whether the flight is over.
    pub fn advance(&mut self, dt: f32) -> (Vec2, bool) {
        self.elapsed += dt;
        let t = if self.duration > 0.0 {
            (self.elapsed / self.duration).min(1.0)
        } else {
            1.0
        };
        (self.point_at(t), t >= 1.0)
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let t = if self.ease_in { t * t } else { t };
        let u = 1.0 - t;
        self.from * (u * u) + self.control * (2.0 * u * t) + self.to * (t * t)
    }

    pub fn destination(&self) -> Vec2 {
        self.to
    }

    #[cfg(test)]
    pub fn landing(&self) -> Option<&WindowSurface> {
        self.landing.as_ref()
    }

    pub fn into_landing(self) -> Option<WindowSurface> {
        self.landing
    }
}
