//! Sorter state machine evaluator and entry actions

use core::fmt::Debug;

use super::state::{GuardInputs, SorterMode, SorterState};
use super::table::next_state;
use crate::color::{ColorTable, Rgbw};
use crate::control::ControlPanel;
use crate::slots::{ConveyorSlots, CATCHER_OFFSET, PREVIOUS_OFFSET};
use crate::solenoid::Solenoid;
use crate::traits::{CalibrationStore, ColorSensor, Motion, Operator};

/// Sorter state machine with its collaborators
///
/// Device failures reported by the collaborators do not change the state
/// flow: the failing action is logged and the machine carries on with
/// whatever data it had.
pub struct Sorter<'a, M, S, O, C> {
    motion: M,
    sensor: S,
    operator: O,
    store: C,
    control: &'a ControlPanel,
    ejector: &'a Solenoid,
    state: SorterState,
    colors: ColorTable,
    slots: ConveyorSlots,
    measurement: Rgbw,
}

impl<'a, M, S, O, C> Sorter<'a, M, S, O, C>
where
    M: Motion,
    S: ColorSensor,
    O: Operator,
    C: CalibrationStore,
{
    pub fn new(
        motion: M,
        sensor: S,
        operator: O,
        store: C,
        control: &'a ControlPanel,
        ejector: &'a Solenoid,
    ) -> Self {
        Self {
            motion,
            sensor,
            operator,
            store,
            control,
            ejector,
            state: SorterState::Reset,
            colors: ColorTable::FACTORY,
            slots: ConveyorSlots::new(),
            measurement: Rgbw::default(),
        }
    }

    pub fn state(&self) -> SorterState {
        self.state
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    /// Replace the reference colours, e.g. with a table restored from flash
    pub fn set_colors(&mut self, colors: ColorTable) {
        self.colors = colors;
    }

    pub fn slots(&self) -> &ConveyorSlots {
        &self.slots
    }

    /// Last averaged sensor reading
    pub fn measurement(&self) -> Rgbw {
        self.measurement
    }

    pub fn motion(&self) -> &M {
        &self.motion
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// One evaluation step
    ///
    /// Serves a pending persistence request, then takes the first
    /// satisfied transition out of the current state (if any) and runs
    /// its entry action. Returns the state entered.
    pub fn poll(&mut self) -> Option<SorterState> {
        if self.control.take_store_request() {
            self.persist_colors();
        }

        let mut inputs = LiveInputs {
            motion: &mut self.motion,
            control: self.control,
            ejector: self.ejector,
        };
        let next = next_state(self.state, &mut inputs)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("sorter: {} -> {}", self.state, next);

        self.state = next;
        self.enter(next);
        Some(next)
    }

    fn enter(&mut self, state: SorterState) {
        match state {
            SorterState::Reset
            | SorterState::InitDone
            | SorterState::LearningEntry
            | SorterState::PauseEntry
            | SorterState::AwaitNewSmartie => {}
            SorterState::InitCatcher => {
                report("home catcher", self.motion.home_catcher());
            }
            SorterState::InitConveyor => {
                report("home conveyor", self.motion.home_conveyor());
            }
            SorterState::MoveConveyorToReference => self.advance_conveyor(-1),
            SorterState::InitColorSensor => {
                report("adapt gain", self.sensor.adapt_gain());
                report("adapt leds", self.sensor.adapt_leds());
                self.advance_conveyor(1);
            }
            SorterState::RunningEntry => self.slots.clear(),
            // Persist only; the ejector fires in EjectSmartie
            SorterState::LeaveLearning => self.persist_colors(),
            SorterState::EjectSmartie => self.ejector.request(),
            SorterState::MoveCatcher => {
                let color = self.slots.ahead(CATCHER_OFFSET);
                report("move catcher", self.motion.move_catcher(color));
            }
            SorterState::LearnColor => {
                let proposed = self.slots.ahead(PREVIOUS_OFFSET);
                let answer = self.operator.confirm_color(proposed);
                self.slots.set_ahead(PREVIOUS_OFFSET, answer);
                self.colors.correct(answer, &self.measurement);
            }
            SorterState::GetColor => match self.sensor.measure_average() {
                Ok(measurement) => self.measurement = measurement,
                Err(e) => report::<S::Error>("measure colour", Err(e)),
            },
            SorterState::AttachColor => {
                let color = self.colors.classify(&self.measurement);
                self.slots.set_current(color);
            }
            SorterState::MoveConveyor => self.advance_conveyor(2),
        }
    }

    /// The slot index follows the command even if the controller refused it
    fn advance_conveyor(&mut self, half_slots: i8) {
        report("advance conveyor", self.motion.advance_conveyor(half_slots));
        self.slots.advance(half_slots);
    }

    fn persist_colors(&mut self) {
        match self.store.store(&self.colors) {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("colour table stored");
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("colour table not stored: {}", defmt::Debug2Format(&_e));
            }
        }
    }
}

struct LiveInputs<'s, M> {
    motion: &'s mut M,
    control: &'s ControlPanel,
    ejector: &'s Solenoid,
}

impl<M: Motion> GuardInputs for LiveInputs<'_, M> {
    fn catcher_idle(&mut self) -> bool {
        self.motion.is_catcher_idle()
    }

    fn conveyor_idle(&mut self) -> bool {
        self.motion.is_conveyor_idle()
    }

    fn ejector_idle(&mut self) -> bool {
        self.ejector.is_idle()
    }

    fn paused(&mut self) -> bool {
        self.control.is_paused()
    }

    fn mode(&mut self) -> SorterMode {
        self.control.mode()
    }
}

/// Log a failed device action and carry on
fn report<E: Debug>(_action: &str, result: Result<(), E>) {
    if let Err(_e) = result {
        #[cfg(feature = "defmt")]
        defmt::warn!("{=str} failed: {}", _action, defmt::Debug2Format(&_e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorId;
    use crate::solenoid::SolenoidTiming;
    use crate::traits::SolenoidDriver;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum MotionCall {
        HomeCatcher,
        HomeConveyor,
        Catcher(ColorId),
        Conveyor(i8),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Refused;

    #[derive(Default)]
    struct MockMotion {
        calls: Vec<MotionCall>,
        catcher_busy: bool,
        conveyor_busy: bool,
        fail: bool,
    }

    impl MockMotion {
        fn outcome(&self) -> Result<(), Refused> {
            if self.fail {
                Err(Refused)
            } else {
                Ok(())
            }
        }

        fn catcher_moves(&self) -> Vec<ColorId> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    MotionCall::Catcher(color) => Some(*color),
                    _ => None,
                })
                .collect()
        }
    }

    impl Motion for MockMotion {
        type Error = Refused;

        fn home_catcher(&mut self) -> Result<(), Refused> {
            self.calls.push(MotionCall::HomeCatcher);
            self.outcome()
        }

        fn home_conveyor(&mut self) -> Result<(), Refused> {
            self.calls.push(MotionCall::HomeConveyor);
            self.outcome()
        }

        fn move_catcher(&mut self, color: ColorId) -> Result<(), Refused> {
            self.calls.push(MotionCall::Catcher(color));
            self.outcome()
        }

        fn advance_conveyor(&mut self, half_slots: i8) -> Result<(), Refused> {
            self.calls.push(MotionCall::Conveyor(half_slots));
            self.outcome()
        }

        fn is_catcher_idle(&mut self) -> bool {
            !self.catcher_busy
        }

        fn is_conveyor_idle(&mut self) -> bool {
            !self.conveyor_busy
        }
    }

    #[derive(Default)]
    struct MockSensor {
        readings: VecDeque<Rgbw>,
        gain_adapted: bool,
        leds_adapted: bool,
    }

    impl ColorSensor for MockSensor {
        type Error = Refused;

        fn adapt_gain(&mut self) -> Result<(), Refused> {
            self.gain_adapted = true;
            Ok(())
        }

        fn adapt_leds(&mut self) -> Result<(), Refused> {
            self.leds_adapted = true;
            Ok(())
        }

        fn measure_average(&mut self) -> Result<Rgbw, Refused> {
            self.readings.pop_front().ok_or(Refused)
        }
    }

    #[derive(Default)]
    struct ScriptedOperator {
        answers: VecDeque<ColorId>,
        prompts: Vec<ColorId>,
    }

    impl Operator for ScriptedOperator {
        fn confirm_color(&mut self, proposed: ColorId) -> ColorId {
            self.prompts.push(proposed);
            self.answers.pop_front().unwrap_or(proposed)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        stored: Vec<ColorTable>,
    }

    impl CalibrationStore for MemoryStore {
        type Error = Refused;

        fn store(&mut self, colors: &ColorTable) -> Result<(), Refused> {
            self.stored.push(colors.clone());
            Ok(())
        }
    }

    struct Coil;

    impl SolenoidDriver for Coil {
        fn set_energized(&mut self, _on: bool) {}
    }

    type TestSorter<'a> = Sorter<'a, MockMotion, MockSensor, ScriptedOperator, MemoryStore>;

    fn sorter<'a>(control: &'a ControlPanel, ejector: &'a Solenoid) -> TestSorter<'a> {
        Sorter::new(
            MockMotion::default(),
            MockSensor::default(),
            ScriptedOperator::default(),
            MemoryStore::default(),
            control,
            ejector,
        )
    }

    /// Foreground iteration with the ejector pulse run to completion
    fn step(sorter: &mut TestSorter<'_>, ejector: &Solenoid) -> Option<SorterState> {
        ejector.poll(&mut Coil);
        while !ejector.is_idle() {
            ejector.tick();
            ejector.poll(&mut Coil);
        }
        sorter.poll()
    }

    fn run_until(sorter: &mut TestSorter<'_>, ejector: &Solenoid, target: SorterState) {
        for _ in 0..64 {
            if step(sorter, ejector) == Some(target) {
                return;
            }
        }
        panic!("never reached {:?}, stuck in {:?}", target, sorter.state());
    }

    const FAST: SolenoidTiming = SolenoidTiming { on_ms: 1, off_ms: 1 };

    #[test]
    fn test_initialization_actions() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);

        run_until(&mut sorter, &ejector, SorterState::InitDone);
        assert_eq!(
            sorter.motion().calls,
            vec![
                MotionCall::HomeCatcher,
                MotionCall::HomeConveyor,
                MotionCall::Conveyor(-1),
                MotionCall::Conveyor(1),
            ]
        );
        assert!(sorter.sensor().gain_adapted);
        assert!(sorter.sensor().leds_adapted);

        // Init mode: nothing further happens
        assert_eq!(step(&mut sorter, &ejector), None);
        assert_eq!(sorter.state(), SorterState::InitDone);
    }

    #[test]
    fn test_homing_waits_for_idle_motors() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        sorter.motion.catcher_busy = true;

        assert_eq!(sorter.poll(), Some(SorterState::InitCatcher));
        assert_eq!(sorter.poll(), None);
        sorter.motion.catcher_busy = false;
        assert_eq!(sorter.poll(), Some(SorterState::InitConveyor));
    }

    #[test]
    fn test_running_cycle_sorts_by_slot_offset() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        control.set_mode(SorterMode::Running);
        control.set_paused(false);

        let sequence: Vec<ColorId> = (1..=8).filter_map(ColorId::from_index).collect();
        for color in &sequence {
            let reading = *ColorTable::FACTORY.reference(*color);
            sorter.sensor.readings.push_back(reading);
        }

        run_until(&mut sorter, &ejector, SorterState::RunningEntry);
        assert_eq!(sorter.slots().index(), 0);

        let mut visited = Vec::new();
        for _ in 0..(sequence.len() * 6) {
            visited.push(step(&mut sorter, &ejector).expect("running cycle stalled"));
        }
        assert_eq!(
            &visited[..6],
            &[
                SorterState::EjectSmartie,
                SorterState::MoveCatcher,
                SorterState::GetColor,
                SorterState::AttachColor,
                SorterState::AwaitNewSmartie,
                SorterState::MoveConveyor,
            ]
        );

        // The drop point is four slots ahead of the sensor, which the
        // conveyor reaches six moves after a colour was attached.
        let moves = sorter.motion().catcher_moves();
        assert_eq!(moves.len(), 8);
        assert!(moves[..6].iter().all(|c| *c == ColorId::Unknown));
        assert_eq!(moves[6], sequence[0]);
        assert_eq!(moves[7], sequence[1]);
        assert_eq!(sorter.slots().index(), 8);
    }

    #[test]
    fn test_all_done_blocks_conveyor() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        control.set_mode(SorterMode::Running);
        control.set_paused(false);
        sorter.sensor.readings.push_back(Rgbw::new(400, 300, 150, 380));

        run_until(&mut sorter, &ejector, SorterState::AwaitNewSmartie);

        control.set_paused(true);
        assert_eq!(sorter.poll(), None);
        control.set_paused(false);

        sorter.motion.catcher_busy = true;
        assert_eq!(sorter.poll(), None);
        sorter.motion.catcher_busy = false;

        ejector.request();
        ejector.poll(&mut Coil);
        assert!(!ejector.is_idle());
        assert_eq!(sorter.poll(), None);
        while !ejector.is_idle() {
            ejector.tick();
            ejector.poll(&mut Coil);
        }

        assert_eq!(sorter.poll(), Some(SorterState::MoveConveyor));
    }

    #[test]
    fn test_learning_corrects_previous_slot() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        control.set_mode(SorterMode::Learning);
        control.set_paused(false);

        let blue = *ColorTable::FACTORY.reference(ColorId::Blue);
        let sample = Rgbw::new(blue.red + 8, blue.green, blue.blue, blue.clear);
        sorter.sensor.readings.push_back(sample);
        sorter.sensor.readings.push_back(sample);
        sorter.operator.answers.push_back(ColorId::Unknown);
        sorter.operator.answers.push_back(ColorId::Violet);

        run_until(&mut sorter, &ejector, SorterState::LearnColor);
        run_until(&mut sorter, &ejector, SorterState::AttachColor);
        assert_eq!(sorter.slots().current(), ColorId::Blue);

        let violet_before = *sorter.colors().reference(ColorId::Violet);
        run_until(&mut sorter, &ejector, SorterState::LearnColor);

        assert_eq!(sorter.operator.prompts, vec![ColorId::Unknown, ColorId::Blue]);
        assert_eq!(sorter.slots().ahead(PREVIOUS_OFFSET), ColorId::Violet);
        assert_eq!(
            *sorter.colors().reference(ColorId::Violet),
            violet_before.blend(&sample)
        );
    }

    #[test]
    fn test_leaving_learning_persists_table() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        control.set_mode(SorterMode::Learning);
        control.set_paused(false);

        run_until(&mut sorter, &ejector, SorterState::LearnColor);
        control.set_mode(SorterMode::Running);
        assert_eq!(step(&mut sorter, &ejector), Some(SorterState::LeaveLearning));
        assert_eq!(sorter.store().stored.len(), 1);
        assert_eq!(&sorter.store().stored[0], sorter.colors());
        assert_eq!(step(&mut sorter, &ejector), Some(SorterState::GetColor));
    }

    #[test]
    fn test_leaving_learning_does_not_eject() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        control.set_mode(SorterMode::Learning);
        control.set_paused(false);

        run_until(&mut sorter, &ejector, SorterState::LearnColor);
        control.set_mode(SorterMode::Running);
        assert_eq!(sorter.poll(), Some(SorterState::LeaveLearning));

        // A pending request would start a pulse here
        ejector.poll(&mut Coil);
        assert!(ejector.is_idle());
        assert_eq!(sorter.store().stored.len(), 1);
    }

    #[test]
    fn test_store_request_served_in_any_state() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);

        control.request_store();
        sorter.poll();
        assert_eq!(sorter.store().stored.len(), 1);
        sorter.poll();
        assert_eq!(sorter.store().stored.len(), 1);
    }

    #[test]
    fn test_device_failures_do_not_stop_the_cycle() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        control.set_mode(SorterMode::Running);
        control.set_paused(false);
        sorter.motion.fail = true;

        let first = Rgbw::new(406, 316, 147, 373);
        sorter.sensor.readings.push_back(first);

        run_until(&mut sorter, &ejector, SorterState::AttachColor);
        assert_eq!(sorter.slots().current(), ColorId::Yellow);
        run_until(&mut sorter, &ejector, SorterState::MoveConveyor);
        assert_eq!(sorter.slots().index(), 1);

        // No more readings: the measurement fails and the stale one stays
        run_until(&mut sorter, &ejector, SorterState::AttachColor);
        assert_eq!(sorter.measurement(), first);
        assert_eq!(sorter.slots().current(), ColorId::Yellow);
    }

    #[test]
    fn test_restored_colors_replace_table() {
        let control = ControlPanel::new();
        let ejector = Solenoid::new(FAST);
        let mut sorter = sorter(&control, &ejector);
        let mut table = ColorTable::FACTORY;
        table.set_reference(ColorId::Pink, Rgbw::new(1, 2, 3, 4));
        sorter.set_colors(table.clone());
        assert_eq!(sorter.colors(), &table);
    }
}
