//! Raspberry Pi GPIO through rppal (BCM numbering).

use super::{ButtonCallback, PinDriver};
use crate::config::Config;
use crate::error::Result;
use rppal::gpio::{Event, Gpio, InputPin, OutputPin, Trigger};
use std::sync::Mutex;
use std::time::Duration;

/// Button input with pull-up, servo on software PWM, LED output.
pub struct RppalPins {
    button: Mutex<InputPin>,
    servo: Mutex<OutputPin>,
    led: Mutex<OutputPin>,
    frequency_hz: f64,
    debounce: Duration,
}

impl RppalPins {
    /// Claim the configured pins and start PWM with a zero duty cycle.
    pub fn open(config: &Config) -> Result<Self> {
        let gpio = Gpio::new()?;
        let pins = &config.pins;

        let button = gpio.get(pins.button)?.into_input_pullup();
        let mut servo = gpio.get(pins.servo)?.into_output_low();
        let led = gpio.get(pins.led)?.into_output_low();

        servo.set_pwm_frequency(config.servo.pwm_frequency_hz, 0.0)?;

        log::info!(
            "GPIO ready: button={}, servo={} ({} Hz), led={}",
            pins.button,
            pins.servo,
            config.servo.pwm_frequency_hz,
            pins.led
        );

        Ok(Self {
            button: Mutex::new(button),
            servo: Mutex::new(servo),
            led: Mutex::new(led),
            frequency_hz: config.servo.pwm_frequency_hz,
            debounce: Duration::from_millis(config.button.debounce_ms),
        })
    }
}

impl PinDriver for RppalPins {
    fn name(&self) -> &'static str {
        "rppal"
    }

    fn set_servo_duty(&self, duty_percent: f64) -> Result<()> {
        let duty = (duty_percent / 100.0).clamp(0.0, 1.0);
        let mut servo = self.servo.lock().expect("servo pin lock poisoned");
        servo.set_pwm_frequency(self.frequency_hz, duty)?;
        Ok(())
    }

    fn set_indicator(&self, on: bool) -> Result<()> {
        let mut led = self.led.lock().expect("led pin lock poisoned");
        if on {
            led.set_high();
        } else {
            led.set_low();
        }
        Ok(())
    }

    fn subscribe_button(&self, callback: ButtonCallback) -> Result<()> {
        let mut button = self.button.lock().expect("button pin lock poisoned");
        button.set_async_interrupt(Trigger::FallingEdge, Some(self.debounce), move |_: Event| {
            callback()
        })?;
        Ok(())
    }

    fn release(&self) -> Result<()> {
        self.button
            .lock()
            .expect("button pin lock poisoned")
            .clear_async_interrupt()?;

        let mut servo = self.servo.lock().expect("servo pin lock poisoned");
        servo.clear_pwm()?;
        servo.set_low();

        self.led.lock().expect("led pin lock poisoned").set_low();
        Ok(())
    }
}
