//! Sortomat - Colour Sorting Machine Firmware
//!
//! Main firmware binary for RP2040-based colour sorters. A conveyor carries
//! sweets past a colour sensor; each one is classified and dropped into the
//! matching bin by a rotating catcher.
//!
//! Two executors share the CPU:
//! - an interrupt executor (SWI_IRQ_1) runs the bus interrupt task, the
//!   millisecond tick and the console, so they preempt the foreground
//! - the thread-mode executor runs the foreground sorter loop, which spins
//!   on bus transfers, and the flash persistence task

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::*;
use embassy_executor::{Executor, InterruptExecutor};
use embassy_rp::bind_interrupts;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use sortomat_core::sorter::Sorter;
use sortomat_drivers::motion::{Ejector, IoExpander, MotionConfig, MotionController};
use sortomat_drivers::sensor::{ColorSensorConfig, ColorSensorHead};
use sortomat_hal::twi::TwiConfig;
use sortomat_hal_rp2040::flash::FlashStorage;
use sortomat_hal_rp2040::twi::BitBangTwi;

use crate::channels::{BUS, CONTROL, SOLENOID};
use crate::controller::{ConsoleOperator, SignalStore};

mod channels;
mod config;
mod controller;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// Console baud rate
const CONSOLE_BAUD: u32 = 9600;

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_LOW: StaticCell<Executor> = StaticCell::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[entry]
fn main() -> ! {
    info!("Sortomat firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Console (GPIO0 TX, GPIO1 RX)
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = CONSOLE_BAUD;

    let tx_buf = TX_BUF.init([0u8; 16]);
    let rx_buf = RX_BUF.init([0u8; 64]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (_tx, rx) = uart.split();

    info!("UART initialized for console");

    // Two-wire bus (GPIO5 SCL, GPIO4 SDA), bit-banged at standard mode
    let twi = BitBangTwi::new(p.PIN_5, p.PIN_4, TwiConfig::STANDARD);

    let storage = FlashStorage::new(p.FLASH, p.DMA_CH0);

    // Bus completion, tick and console preempt the foreground
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    spawner.spawn(tasks::twi_irq_task(twi)).unwrap();
    spawner.spawn(tasks::tick_task()).unwrap();
    spawner.spawn(tasks::console_task(rx)).unwrap();

    info!("Interrupt tasks spawned");

    // Devices on the bus; the bus task is running from here on
    let motion_config = MotionConfig::default();
    let expander = IoExpander::new(motion_config.expander_address);
    let ejector = Ejector::new(BUS.twi(), expander);
    let motion = MotionController::new(BUS.twi(), motion_config);

    let mut sensor = ColorSensorHead::new(BUS.twi(), Delay, ColorSensorConfig::default());
    if let Err(e) = sensor.init() {
        warn!("LED driver init failed: {:?}", e);
    }

    let sorter = Sorter::new(
        motion,
        sensor,
        ConsoleOperator,
        SignalStore,
        &CONTROL,
        &SOLENOID,
    );

    let executor = EXECUTOR_LOW.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(tasks::calibration_task(storage)).unwrap();
        spawner.spawn(controller::sorter_task(sorter, ejector)).unwrap();
        info!("All tasks spawned, firmware running");
    })
}
