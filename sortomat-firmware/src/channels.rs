//! Inter-task communication channels
//!
//! Defines the statics shared between the interrupt executor tasks (wire,
//! tick, console) and the thread-mode foreground. Uses embassy-sync
//! primitives and the critical-section based state of `sortomat-core`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use sortomat_core::bus::Bus;
use sortomat_core::color::{ColorId, ColorTable};
use sortomat_core::control::ControlPanel;
use sortomat_core::solenoid::{Solenoid, SolenoidTiming};
use sortomat_hal::twi::{TwiAction, TwiPort};

/// The engine only ever has one wire action outstanding
const TWI_ACTION_CHANNEL_SIZE: usize = 2;

/// Operator answers typed ahead of the learning prompt
const OPERATOR_CHANNEL_SIZE: usize = 4;

/// Wire actions waiting for the bus interrupt task
pub static TWI_ACTIONS: Channel<CriticalSectionRawMutex, TwiAction, TWI_ACTION_CHANNEL_SIZE> =
    Channel::new();

/// Colour answers from the console
pub static OPERATOR: Channel<CriticalSectionRawMutex, ColorId, OPERATOR_CHANNEL_SIZE> =
    Channel::new();

/// Colour table to persist (set by the sorter)
pub static COLOR_SAVE: Signal<CriticalSectionRawMutex, ColorTable> = Signal::new();

/// Request to reload the colour table from flash (set by the console)
pub static COLOR_RESTORE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Colour table read back from flash, applied by the foreground
pub static COLOR_TABLE_LOADED: Signal<CriticalSectionRawMutex, ColorTable> = Signal::new();

/// Port handing wire actions to [`crate::tasks::twi_irq_task`]
pub struct ChannelPort;

impl TwiPort for ChannelPort {
    fn submit(&self, action: TwiAction) {
        if TWI_ACTIONS.try_send(action).is_err() {
            defmt::error!("Wire action dropped: {:?}", action);
        }
    }
}

/// Two-wire bus shared by the foreground and the bus interrupt task
pub static BUS: Bus<ChannelPort> = Bus::new(ChannelPort);

/// Ejector pulse timing, driven by the millisecond tick
pub static SOLENOID: Solenoid = Solenoid::new(SolenoidTiming::DEFAULT);

/// Mode, pause flag and store request written by the console
pub static CONTROL: ControlPanel = ControlPanel::new();
