//! Host-side bus simulation for tests
//!
//! [`SimWire`] plays the targets: register-file devices that acknowledge
//! their address, take a register pointer as the first written byte and
//! auto-increment it. Faults (arbitration loss, refused data) can be
//! injected. [`with_sim_bus`] runs a [`Bus`] against the wire with a
//! simulated interrupt thread that sleeps on a condition variable until the
//! engine submits the next action.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use sortomat_hal::twi::{Direction, TwiAction, TwiEvent, TwiPort};

use crate::bus::{Bus, BusEngine, Transaction};

/// Register-file target device
#[derive(Debug, Clone)]
pub struct SimDevice {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    expect_pointer: bool,
    accepted: usize,
    refuse_after: Option<usize>,
}

impl SimDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            pointer: 0,
            expect_pointer: false,
            accepted: 0,
            refuse_after: None,
        }
    }

    /// NACK every data byte after the first `count` accepted ones
    pub fn refuse_after(mut self, count: usize) -> Self {
        self.refuse_after = Some(count);
        self
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.registers[reg as usize]
    }

    pub fn set_register(&mut self, reg: u8, value: u8) {
        self.registers[reg as usize] = value;
    }

    fn select(&mut self, direction: Direction) {
        if direction == Direction::Write {
            self.expect_pointer = true;
        }
    }

    fn accept(&mut self, byte: u8) -> bool {
        if self.refuse_after.is_some_and(|limit| self.accepted >= limit) {
            return false;
        }
        self.accepted += 1;
        if self.expect_pointer {
            self.pointer = byte;
            self.expect_pointer = false;
        } else {
            self.registers[self.pointer as usize] = byte;
            self.pointer = self.pointer.wrapping_add(1);
        }
        true
    }

    fn produce(&mut self) -> u8 {
        let byte = self.registers[self.pointer as usize];
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

/// One addressed transfer as seen on the wire, address byte first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Address,
    Writing(usize),
    Reading(usize),
    Refused,
}

/// Simulated wire with attached devices
#[derive(Debug)]
pub struct SimWire {
    devices: Vec<SimDevice>,
    phase: Phase,
    pending_losses: u32,
    starts: u32,
    current: Option<Transfer>,
    log: Vec<Transfer>,
}

impl SimWire {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            phase: Phase::Idle,
            pending_losses: 0,
            starts: 0,
            current: None,
            log: Vec::new(),
        }
    }

    pub fn attach(&mut self, device: SimDevice) {
        self.devices.push(device);
    }

    /// Lose arbitration on the next `count` address bytes
    pub fn lose_arbitration(&mut self, count: u32) {
        self.pending_losses = count;
    }

    pub fn device(&self, address: u8) -> Option<&SimDevice> {
        self.devices.iter().find(|d| d.address == address)
    }

    pub fn device_mut(&mut self, address: u8) -> Option<&mut SimDevice> {
        self.devices.iter_mut().find(|d| d.address == address)
    }

    /// Completed transfers, in wire order
    pub fn transfers(&self) -> &[Transfer] {
        &self.log
    }

    /// Start conditions generated so far
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Execute one action; `None` after a stop condition
    pub fn execute(&mut self, action: TwiAction) -> Option<TwiEvent> {
        match action {
            TwiAction::Start => {
                let event = if self.phase == Phase::Idle {
                    TwiEvent::Start
                } else {
                    TwiEvent::RepeatedStart
                };
                self.close_transfer();
                self.starts += 1;
                self.phase = Phase::Address;
                Some(event)
            }
            TwiAction::Transmit(byte) => Some(self.transmit(byte)),
            TwiAction::Receive { ack } => match self.phase {
                Phase::Reading(index) => {
                    let byte = self.devices[index].produce();
                    self.record(byte);
                    Some(TwiEvent::DataReceived { byte, acked: ack })
                }
                _ => Some(TwiEvent::BusError),
            },
            TwiAction::Stop => {
                self.close_transfer();
                self.phase = Phase::Idle;
                None
            }
        }
    }

    fn transmit(&mut self, byte: u8) -> TwiEvent {
        match self.phase {
            Phase::Address => {
                if self.pending_losses > 0 {
                    self.pending_losses -= 1;
                    self.phase = Phase::Idle;
                    return TwiEvent::ArbitrationLost;
                }
                let direction = Direction::of_address_byte(byte);
                self.current = Some(Transfer { bytes: vec![byte] });

                match self.devices.iter().position(|d| d.address == byte >> 1) {
                    Some(index) => {
                        self.devices[index].select(direction);
                        self.phase = match direction {
                            Direction::Write => Phase::Writing(index),
                            Direction::Read => Phase::Reading(index),
                        };
                        TwiEvent::AddressAcked(direction)
                    }
                    None => {
                        self.phase = Phase::Refused;
                        TwiEvent::AddressNacked(direction)
                    }
                }
            }
            Phase::Writing(index) => {
                self.record(byte);
                if self.devices[index].accept(byte) {
                    TwiEvent::DataAcked
                } else {
                    self.phase = Phase::Refused;
                    TwiEvent::DataNacked
                }
            }
            _ => TwiEvent::BusError,
        }
    }

    fn record(&mut self, byte: u8) {
        if let Some(transfer) = self.current.as_mut() {
            transfer.bytes.push(byte);
        }
    }

    fn close_transfer(&mut self) {
        if let Some(transfer) = self.current.take() {
            self.log.push(transfer);
        }
    }
}

/// Drive an engine against the wire synchronously until the stop condition
pub fn run_to_completion(engine: &mut BusEngine, wire: &mut SimWire, transaction: &Transaction) {
    let mut action = engine.begin(transaction).expect("engine idle");
    for _ in 0..10_000 {
        let Some(event) = wire.execute(action) else {
            return;
        };
        match engine.on_event(event) {
            Some(next) => action = next,
            None => return,
        }
    }
    panic!("transaction did not terminate");
}

/// Port whose actions are picked up by the simulated interrupt thread
pub struct SimPort {
    queue: Mutex<(VecDeque<TwiAction>, bool)>,
    ready: Condvar,
}

impl SimPort {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new((VecDeque::new(), false)),
            ready: Condvar::new(),
        }
    }

    /// Sleep until an action is queued; `None` once closed and drained
    fn next(&self) -> Option<TwiAction> {
        let mut queue = self.queue.lock().expect("queue poisoned");
        loop {
            if let Some(action) = queue.0.pop_front() {
                return Some(action);
            }
            if queue.1 {
                return None;
            }
            queue = self.ready.wait(queue).expect("queue poisoned");
        }
    }

    fn close(&self) {
        let mut queue = self.queue.lock().expect("queue poisoned");
        queue.1 = true;
        self.ready.notify_all();
    }
}

impl TwiPort for SimPort {
    fn submit(&self, action: TwiAction) {
        let mut queue = self.queue.lock().expect("queue poisoned");
        queue.0.push_back(action);
        self.ready.notify_one();
    }
}

struct CloseOnDrop<'a>(&'a SimPort);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Run `f` against a bus wired to `wire`, with a simulated bus interrupt
///
/// Returns the closure result and the wire for inspection.
pub fn with_sim_bus<R>(mut wire: SimWire, f: impl FnOnce(&Bus<SimPort>) -> R) -> (R, SimWire) {
    let bus = Bus::new(SimPort::new());

    let result = std::thread::scope(|scope| {
        let bus = &bus;
        let wire = &mut wire;
        scope.spawn(move || {
            while let Some(action) = bus.port().next() {
                if let Some(event) = wire.execute(action) {
                    bus.on_interrupt(event);
                }
            }
        });

        let _close = CloseOnDrop(bus.port());
        f(bus)
    });

    (result, wire)
}
