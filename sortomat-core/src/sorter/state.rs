//! Sorter states, operating modes and transition guards

/// Operating mode selected from the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SorterMode {
    /// Power-on mode; initialization finishes and then waits
    #[default]
    Init = 0,
    /// Classify and sort
    Running = 1,
    /// Sort while the operator confirms every colour
    Learning = 2,
    Pause = 3,
}

impl SorterMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SorterMode::Init),
            1 => Some(SorterMode::Running),
            2 => Some(SorterMode::Learning),
            3 => Some(SorterMode::Pause),
            _ => None,
        }
    }
}

/// Sorter states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SorterState {
    /// Power-on state
    #[default]
    Reset,
    /// Catcher homing
    InitCatcher,
    /// Conveyor homing
    InitConveyor,
    /// Conveyor half a slot back onto the white reference
    MoveConveyorToReference,
    /// Sensor gain and LED calibration
    InitColorSensor,
    /// Waiting for an operating mode
    InitDone,
    RunningEntry,
    LearningEntry,
    PauseEntry,
    /// Persist the learned colour table
    LeaveLearning,
    EjectSmartie,
    MoveCatcher,
    GetColor,
    AttachColor,
    /// Operator confirms the previous classification
    LearnColor,
    AwaitNewSmartie,
    MoveConveyor,
}

/// Transition guard
///
/// Guards are pure predicates over [`GuardInputs`]; an unmet guard only
/// defers the transition to a later poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Guard {
    Always,
    CatcherIdle,
    ConveyorIdle,
    ModeIs(SorterMode),
    ModeIsNot(SorterMode),
    /// Ejector idle, catcher idle and pause flag clear
    AllDone,
}

/// Live values guards are evaluated against
///
/// Predicates are queried lazily, only for rules whose source state
/// matches, and in the order the guard names them.
pub trait GuardInputs {
    fn catcher_idle(&mut self) -> bool;
    fn conveyor_idle(&mut self) -> bool;
    fn ejector_idle(&mut self) -> bool;
    fn paused(&mut self) -> bool;
    fn mode(&mut self) -> SorterMode;
}

impl Guard {
    pub fn holds<I: GuardInputs + ?Sized>(self, inputs: &mut I) -> bool {
        match self {
            Guard::Always => true,
            Guard::CatcherIdle => inputs.catcher_idle(),
            Guard::ConveyorIdle => inputs.conveyor_idle(),
            Guard::ModeIs(mode) => inputs.mode() == mode,
            Guard::ModeIsNot(mode) => inputs.mode() != mode,
            Guard::AllDone => inputs.ejector_idle() && inputs.catcher_idle() && !inputs.paused(),
        }
    }
}

/// Frozen guard inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardSnapshot {
    pub catcher_idle: bool,
    pub conveyor_idle: bool,
    pub ejector_idle: bool,
    pub paused: bool,
    pub mode: SorterMode,
}

impl GuardSnapshot {
    /// Everything idle, not paused, in `mode`
    pub const fn settled(mode: SorterMode) -> Self {
        Self {
            catcher_idle: true,
            conveyor_idle: true,
            ejector_idle: true,
            paused: false,
            mode,
        }
    }
}

impl GuardInputs for GuardSnapshot {
    fn catcher_idle(&mut self) -> bool {
        self.catcher_idle
    }

    fn conveyor_idle(&mut self) -> bool {
        self.conveyor_idle
    }

    fn ejector_idle(&mut self) -> bool {
        self.ejector_idle
    }

    fn paused(&mut self) -> bool {
        self.paused
    }

    fn mode(&mut self) -> SorterMode {
        self.mode
    }
}
