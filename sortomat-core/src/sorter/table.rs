//! Static transition table
//!
//! Scanned top to bottom; the first rule whose source matches the current
//! state and whose guard holds wins.

use super::state::{Guard, GuardInputs, SorterMode, SorterState};

/// One transition: `from` moves to `to` when `guard` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rule {
    pub from: SorterState,
    pub to: SorterState,
    pub guard: Guard,
}

const fn rule(from: SorterState, to: SorterState, guard: Guard) -> Rule {
    Rule { from, to, guard }
}

use Guard::*;
use SorterMode::{Learning, Pause, Running};
use SorterState::*;

/// Sorter transition table, in evaluation order
pub static RULES: [Rule; 20] = [
    // Initialization
    rule(Reset, InitCatcher, Always),
    rule(InitCatcher, InitConveyor, CatcherIdle),
    rule(InitConveyor, MoveConveyorToReference, ConveyorIdle),
    rule(MoveConveyorToReference, InitColorSensor, ConveyorIdle),
    rule(InitColorSensor, InitDone, Always),
    rule(InitDone, RunningEntry, ModeIs(Running)),
    rule(InitDone, LearningEntry, ModeIs(Learning)),
    rule(InitDone, PauseEntry, ModeIs(Pause)),
    // Running
    rule(RunningEntry, EjectSmartie, Always),
    rule(EjectSmartie, MoveCatcher, Always),
    rule(MoveCatcher, GetColor, ModeIs(Running)),
    rule(GetColor, AttachColor, Always),
    rule(AttachColor, AwaitNewSmartie, Always),
    rule(AwaitNewSmartie, MoveConveyor, AllDone),
    rule(MoveConveyor, EjectSmartie, ConveyorIdle),
    // Learning
    rule(LearningEntry, EjectSmartie, Always),
    rule(MoveCatcher, LearnColor, ModeIs(Learning)),
    rule(LearnColor, GetColor, ModeIs(Learning)),
    rule(LearnColor, LeaveLearning, ModeIsNot(Learning)),
    rule(LeaveLearning, GetColor, Always),
];

/// First satisfied transition out of `current`, if any
pub fn next_state<I: GuardInputs + ?Sized>(current: SorterState, inputs: &mut I) -> Option<SorterState> {
    RULES
        .iter()
        .filter(|rule| rule.from == current)
        .find(|rule| rule.guard.holds(&mut *inputs))
        .map(|rule| rule.to)
}
