//! Console UART receive task
//!
//! Single-byte commands from the serial console. Commands only touch shared
//! state (control panel, solenoid request, channels); bus traffic stays
//! with the foreground.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use sortomat_core::control::Command;

use crate::channels::{COLOR_RESTORE, CONTROL, OPERATOR, SOLENOID};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 16;

#[embassy_executor::task]
pub async fn console_task(mut rx: BufferedUartRx) {
    info!("Console task started");

    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                for &byte in &buf[..n] {
                    match Command::from_byte(byte) {
                        Some(command) => handle_command(command),
                        None => trace!("Ignoring console byte {=u8:#x}", byte),
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}

fn handle_command(command: Command) {
    debug!("Console command: {:?}", command);

    match command {
        Command::SetMode(mode) => CONTROL.set_mode(mode),
        Command::TogglePause => {
            let paused = CONTROL.toggle_pause();
            info!("Paused: {}", paused);
        }
        Command::Eject => SOLENOID.request(),
        Command::StoreColors => CONTROL.request_store(),
        Command::RestoreColors => COLOR_RESTORE.signal(()),
        Command::Answer(color) => {
            if OPERATOR.try_send(color).is_err() {
                warn!("Operator answer {:?} dropped", color);
            }
        }
    }
}
