//! Two-wire bus interrupt task
//!
//! Plays the role of the bus interrupt: takes the next wire action queued
//! by the engine, runs it on the bit-banged port and hands the resulting
//! event back to the engine, which may queue the following action.

use defmt::*;

use sortomat_hal_rp2040::twi::BitBangTwi;

use crate::channels::{BUS, TWI_ACTIONS};

#[embassy_executor::task]
pub async fn twi_irq_task(mut twi: BitBangTwi<'static>) {
    info!("TWI task started");

    loop {
        let action = TWI_ACTIONS.receive().await;
        trace!("TWI action {:?}", action);

        if let Some(event) = twi.execute(action) {
            BUS.on_interrupt(event);
        }
    }
}
