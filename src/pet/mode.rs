/// Things the cat does while seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Sit and scratch nose.
    SitDown,
    Yarn,
    Belly,
    Wave,
    /// Face the user.
    Front,
}

impl Activity {
    pub const ALL: [Activity; 5] = [
        Activity::SitDown,
        Activity::Yarn,
        Activity::Belly,
        Activity::Wave,
        Activity::Front,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Activity::SitDown => "sitdown",
            Activity::Yarn => "yarn",
            Activity::Belly => "belly",
            Activity::Wave => "wave",
            Activity::Front => "front",
        }
    }
}

/// Direct interactions offered by the sprite's context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Pet,
    Scratch,
    Feed,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::Pet,
        InteractionKind::Scratch,
        InteractionKind::Feed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InteractionKind::Pet => "Pet",
            InteractionKind::Scratch => "Scratch",
            InteractionKind::Feed => "Feed",
        }
    }
}

/// The cat is in exactly one of these at any tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Walking,
    Running,
    Sitting(Activity),
    Jumping,
    Sleeping,
    Interacting(InteractionKind),
}

impl Mode {
    /// Whether the movement controller advances position in this mode.
    pub fn is_moving(self) -> bool {
        matches!(self, Mode::Walking | Mode::Running)
    }
}

/// A named collection of sprite frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Walking,
    Running,
    Activity(Activity),
    /// Single-frame poses.
    Sit,
    Jump,
    Sleep,
    Interaction(InteractionKind),
}

impl FrameSet {
    /// Front-facing art looks the same in both directions.
    pub fn is_symmetric(self) -> bool {
        matches!(self, FrameSet::Activity(Activity::Front))
    }
}

/// One frame of one set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRef {
    pub set: FrameSet,
    pub index: usize,
}

impl FrameRef {
    pub fn new(set: FrameSet, index: usize) -> Self {
        Self { set, index }
    }
}
