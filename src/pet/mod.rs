//! The cat itself: movement, behavior and idle detection wired together.

pub mod behavior;
pub mod dice;
pub mod idle;
pub mod mode;
pub mod movement;
pub mod script;
pub mod timer;

use glam::Vec2;

use crate::facing::Direction;
use crate::surface::Surfaces;
use crate::tuning::Tuning;
use behavior::{Brain, Effect, Event, SetSizes};
use dice::Dice;
use idle::{IdleChange, IdleMonitor, IdleSource};
use mode::{InteractionKind, Mode};
use movement::{Agent, Flight, Step};

/// Start this far inside the walkable band, on the side the cat walks away from.
const SPAWN_INSET: f32 = 120.0;

pub struct Pet {
    tuning: Tuning,
    agent: Agent,
    brain: Brain,
    flight: Option<Flight>,
    idle: IdleMonitor,
}

impl Pet {
    pub fn new(tuning: Tuning, sizes: SetSizes, agent: Agent) -> Self {
        let idle = IdleMonitor::new(&tuning);
        Self {
            brain: Brain::new(tuning.clone(), sizes),
            tuning,
            agent,
            flight: None,
            idle,
        }
    }

    /// Place a new cat on the floor heading in a random direction.
    pub fn spawn(tuning: Tuning, sizes: SetSizes, screen_w: f32, rng: &mut fastrand::Rng) -> Self {
        let direction = Direction::random(rng);
        let (lo, hi) = tuning.walk_bounds(screen_w);
        let x = match direction {
            Direction::Right => lo + SPAWN_INSET,
            Direction::Left => hi - SPAWN_INSET,
        }
        .clamp(lo, hi);
        let agent = Agent::new(x, tuning.floor_level, direction);
        log::info!("Spawned at x={x:.0} heading {direction:?}");
        Self::new(tuning, sizes, agent)
    }

    pub fn start(&mut self, dice: &mut impl Dice) -> Vec<Effect> {
        self.brain.handle(Event::Start, &mut self.agent, dice)
    }

    /// Stop frame timing. A cat caught mid-flight is put down where it was headed.
    pub fn suspend(&mut self, dice: &mut impl Dice) -> Vec<Effect> {
        if let Some(flight) = self.flight.take() {
            let to = flight.destination();
            self.agent.land(to, flight.into_landing());
        }
        self.brain.handle(Event::Suspend, &mut self.agent, dice)
    }

    /// One simulation tick.
    pub fn tick(
        &mut self,
        dt: f32,
        surfaces: &Surfaces,
        screen_w: f32,
        dice: &mut impl Dice,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.brain.advance_timer(dt) {
            effects.extend(self.brain.handle(Event::FrameDue, &mut self.agent, dice));
        }

        match self.brain.mode() {
            mode @ (Mode::Walking | Mode::Running) => {
                let running = mode == Mode::Running;
                let event = match movement::step(
                    &mut self.agent,
                    running,
                    dt,
                    surfaces,
                    screen_w,
                    &self.tuning,
                    dice,
                ) {
                    Step::Moved { distance } => Event::Travelled(distance),
                    Step::EdgeReached => Event::EdgeReached,
                    Step::Turned => Event::Turned,
                    Step::Launched(flight) => {
                        self.flight = Some(flight);
                        Event::JumpStarted
                    }
                };
                effects.extend(self.brain.handle(event, &mut self.agent, dice));
            }
            Mode::Jumping => {
                let landed = match &mut self.flight {
                    Some(flight) => {
                        let (at, done) = flight.advance(dt);
                        self.agent.position = at;
                        done
                    }
                    None => true,
                };
                if landed {
                    if let Some(flight) = self.flight.take() {
                        let to = flight.destination();
                        self.agent.land(to, flight.into_landing());
                    }
                    effects.extend(self.brain.handle(Event::Landed, &mut self.agent, dice));
                }
            }
            Mode::Sitting(_) | Mode::Sleeping | Mode::Interacting(_) => {}
        }
        effects
    }

    /// Throttled idle check. Sleep waits until a jump has landed.
    pub fn poll_idle(
        &mut self,
        dt: f32,
        source: &dyn IdleSource,
        dice: &mut impl Dice,
    ) -> Vec<Effect> {
        if self.brain.mode() == Mode::Jumping {
            return Vec::new();
        }
        match self.idle.poll(dt, source) {
            Some(IdleChange::FellAsleep) => {
                log::info!("No input for {:.0}s, sleeping", self.tuning.sleep_after);
                self.brain.handle(Event::FellAsleep, &mut self.agent, dice)
            }
            Some(IdleChange::Woke) => {
                log::info!("Input detected, waking up");
                self.brain.handle(Event::Woke, &mut self.agent, dice)
            }
            None => Vec::new(),
        }
    }

    /// The context menu is about to open.
    pub fn open_menu(&mut self, dice: &mut impl Dice) -> Vec<Effect> {
        self.brain.handle(Event::MenuOpened, &mut self.agent, dice)
    }

    /// The context menu closed, with the chosen interaction if any.
    pub fn close_menu(
        &mut self,
        choice: Option<InteractionKind>,
        dice: &mut impl Dice,
    ) -> Vec<Effect> {
        self.brain.handle(Event::MenuClosed(choice), &mut self.agent, dice)
    }

    pub fn mode(&self) -> Mode {
        self.brain.mode()
    }

    pub fn position(&self) -> Vec2 {
        self.agent.position
    }

}

#[cfg(test)]
impl Pet {
    pub fn direction(&self) -> Direction {
        self.agent.direction
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    pub fn is_asleep(&self) -> bool {
        self.idle.is_asleep()
    }
}
