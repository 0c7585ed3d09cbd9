//! Colour sensor head
//!
//! The ADJD-S311 looks at the conveyor slot under a ring of red, green
//! and blue LEDs. Start-up calibration happens over the white reference
//! slot: first the sensor gain is lowered until the dark offset is small,
//! then each LED colour is dimmed until its channel no longer saturates.

use embedded_hal::delay::DelayNs;
use sortomat_core::color::Rgbw;
use sortomat_core::traits::ColorSensor;
use sortomat_hal::RegisterBus;

use super::adjd_s311::{Adjd311, Adjd311Params};
use super::tlc59116::{channel, Tlc59116};

/// Largest averaging shift; 256 full-scale samples still fit a `u32` sum
pub const MAX_SAMPLE_SHIFT: u8 = 8;

/// Sensor head wiring and calibration targets
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorSensorConfig {
    pub sensor_address: u8,
    pub led_address: u8,
    /// Gain adaptation stops once the clear dark offset is below this
    pub dark_threshold: u8,
    /// LED adaptation dims each colour until its channel reads at most this
    pub led_threshold: u16,
    /// Integration slots gain adaptation starts from
    pub initial_integration: u16,
    /// log2 of the samples averaged per measurement, at most
    /// [`MAX_SAMPLE_SHIFT`]
    pub sample_shift: u8,
    /// LED warm-up before LED adaptation
    pub warmup_ms: u32,
    /// Settle time between LEDs on and the first sample
    pub settle_ms: u32,
    /// Hold time after the last sample
    pub release_ms: u32,
}

impl Default for ColorSensorConfig {
    fn default() -> Self {
        Self {
            sensor_address: 0x74,
            led_address: 0x62,
            dark_threshold: 31,
            led_threshold: 600,
            initial_integration: 0x00F0,
            sample_shift: 2,
            warmup_ms: 500,
            settle_ms: 600,
            release_ms: 10,
        }
    }
}

/// Calibrated LED brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedPwm {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl LedPwm {
    /// Channels 0-5 as wired on the head; the odd channels are unused
    pub fn block(&self) -> [u8; 6] {
        let mut block = [0u8; 6];
        block[channel::BLUE as usize] = self.blue;
        block[channel::GREEN as usize] = self.green;
        block[channel::RED as usize] = self.red;
        block
    }
}

pub struct ColorSensorHead<B, D> {
    bus: B,
    delay: D,
    sensor: Adjd311,
    leds: Tlc59116,
    config: ColorSensorConfig,
    params: Adjd311Params,
    pwm: LedPwm,
}

impl<B: RegisterBus, D: DelayNs> ColorSensorHead<B, D> {
    pub fn new(bus: B, delay: D, config: ColorSensorConfig) -> Self {
        Self {
            bus,
            delay,
            sensor: Adjd311::new(config.sensor_address),
            leds: Tlc59116::new(config.led_address),
            params: Adjd311Params::uniform(0x0F, config.initial_integration),
            config,
            pwm: LedPwm::default(),
        }
    }

    /// Configure the LED driver; LEDs stay dark until a measurement
    pub fn init(&mut self) -> Result<(), B::Error> {
        self.leds.init(&mut self.bus)
    }

    /// Current sensor gain registers
    pub fn params(&self) -> &Adjd311Params {
        &self.params
    }

    pub fn pwm(&self) -> &LedPwm {
        &self.pwm
    }

    /// Lower one LED colour from full brightness until `pick` of the
    /// reading is within the LED threshold
    ///
    /// The channel is switched off again even if a transfer fails.
    fn tune_channel(&mut self, led: u8, pick: fn(&Rgbw) -> u16) -> Result<u8, B::Error> {
        let tuned = self.sweep_channel(led, pick);
        let off = self.leds.set_channel(&mut self.bus, led, 0);
        let duty = tuned?;
        off?;
        Ok(duty)
    }

    fn sweep_channel(&mut self, led: u8, pick: fn(&Rgbw) -> u16) -> Result<u8, B::Error> {
        let mut duty = u8::MAX;
        self.leds.set_channel(&mut self.bus, led, duty)?;
        let mut reading = self.sensor.read_color(&mut self.bus)?;
        while pick(&reading) > self.config.led_threshold && duty > 0 {
            duty -= 1;
            self.leds.set_channel(&mut self.bus, led, duty)?;
            reading = self.sensor.read_color(&mut self.bus)?;
        }
        Ok(duty)
    }

    fn tune_all(&mut self) -> Result<LedPwm, B::Error> {
        self.leds.set_block(&mut self.bus, 0, &[0; 6])?;

        let red = self.tune_channel(channel::RED, |c| c.red)?;
        let green = self.tune_channel(channel::GREEN, |c| c.green)?;
        let blue = self.tune_channel(channel::BLUE, |c| c.blue)?;
        let pwm = LedPwm { red, green, blue };

        self.leds.set_block(&mut self.bus, 0, &pwm.block())?;
        Ok(pwm)
    }

    fn sample_average(&mut self, shift: u8) -> Result<Rgbw, B::Error> {
        let mut sum = [0u32; 4];
        for _ in 0..(1u32 << shift) {
            let sample = self.sensor.read_color(&mut self.bus)?;
            sum[0] += u32::from(sample.red);
            sum[1] += u32::from(sample.green);
            sum[2] += u32::from(sample.blue);
            sum[3] += u32::from(sample.clear);
        }
        let average = sum.map(|s| (s >> shift) as u16);
        Ok(Rgbw::new(average[0], average[1], average[2], average[3]))
    }
}

impl<B: RegisterBus, D: DelayNs> ColorSensor for ColorSensorHead<B, D> {
    type Error = B::Error;

    fn adapt_gain(&mut self) -> Result<(), B::Error> {
        let threshold = i16::from(self.config.dark_threshold);
        let mut slots = self.config.initial_integration;

        self.params = Adjd311Params::uniform(0x0F, slots);
        self.sensor.set_params(&mut self.bus, &self.params)?;
        self.sensor.set_config(&mut self.bus, 0)?;

        loop {
            let offset = self.sensor.read_clear_offset(&mut self.bus)?;
            if i16::from(offset) < threshold {
                break;
            }
            if slots == 0 {
                #[cfg(feature = "defmt")]
                defmt::warn!("gain adaptation ran out of integration slots");
                break;
            }
            slots -= 1;
            self.params.integration = [slots; 4];
            self.sensor.set_params(&mut self.bus, &self.params)?;
        }

        self.params.integration[3] >>= 1;
        self.sensor.set_params(&mut self.bus, &self.params)?;

        #[cfg(feature = "defmt")]
        defmt::info!("sensor integration slots: {}", slots);
        Ok(())
    }

    fn adapt_leds(&mut self) -> Result<(), B::Error> {
        self.leds.set_group_pwm(&mut self.bus, 0xFF)?;
        self.delay.delay_ms(self.config.warmup_ms);

        let tuned = self.tune_all();
        let off = self.leds.set_group_pwm(&mut self.bus, 0);
        self.pwm = tuned?;
        off?;

        #[cfg(feature = "defmt")]
        defmt::info!("led pwm: {}", self.pwm);
        Ok(())
    }

    /// LEDs are switched off again even if a sample fails
    fn measure_average(&mut self) -> Result<Rgbw, B::Error> {
        self.leds.set_group_pwm(&mut self.bus, 0xFF)?;
        self.delay.delay_ms(self.config.settle_ms);

        let shift = self.config.sample_shift.min(MAX_SAMPLE_SHIFT);
        let average = self.sample_average(shift);
        if average.is_ok() {
            self.delay.delay_ms(self.config.release_ms);
        }

        let off = self.leds.set_group_pwm(&mut self.bus, 0);
        let average = average?;
        off?;
        Ok(average)
    }
}
