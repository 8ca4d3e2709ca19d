//! Servo, status LED and push button.
//!
//! [`PinDriver`] is the raw pin capability (set a duty cycle, drive the LED,
//! subscribe to the button). [`Actuators`] builds the servo semantics on top
//! of it: angle to duty conversion, settle-then-release positioning and the
//! scare sweep.

#[cfg(feature = "gpio")]
mod rppal_pins;
mod simulated;

#[cfg(feature = "gpio")]
pub use rppal_pins::RppalPins;
pub use simulated::{PinEvent, SimulatedPins};

use crate::config::{Config, ServoSettings};
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Called on a debounced falling edge of the button, off the main thread.
pub type ButtonCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Raw access to the three pins.
pub trait PinDriver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Set the servo PWM duty cycle in percent. `0.0` stops the signal.
    fn set_servo_duty(&self, duty_percent: f64) -> Result<()>;

    /// Drive the status LED.
    fn set_indicator(&self, on: bool) -> Result<()>;

    /// Register the one button callback, replacing any previous one.
    fn subscribe_button(&self, callback: ButtonCallback) -> Result<()>;

    /// Stop PWM and give the pins back.
    fn release(&self) -> Result<()>;
}

/// Duty cycle (percent) for a servo angle: 0° -> 2%, 180° -> 12%.
pub fn duty_for_angle(angle: f64) -> f64 {
    2.0 + angle / 18.0
}

/// Timing and angles of servo motions.
#[derive(Debug, Clone, PartialEq)]
pub struct ServoMotion {
    /// How long a positioning call holds the signal before releasing it
    pub settle: Duration,
    /// Pause at the scare angle during a sweep
    pub hold: Duration,
    /// Time per degree while returning
    pub step: Duration,
    /// Angle the sweep jumps to first
    pub scare_angle: f64,
    /// Angle the sweep ends at
    pub return_angle: f64,
}

impl Default for ServoMotion {
    fn default() -> Self {
        Self::from_settings(&ServoSettings::default())
    }
}

impl ServoMotion {
    pub fn from_settings(settings: &ServoSettings) -> Self {
        Self {
            settle: Duration::from_millis(settings.settle_ms),
            hold: Duration::from_millis(settings.sweep_hold_ms),
            step: Duration::from_millis(settings.sweep_step_ms),
            scare_angle: settings.scare_angle,
            return_angle: settings.return_angle,
        }
    }
}

/// Servo and LED on top of a [`PinDriver`].
pub struct Actuators {
    driver: Arc<dyn PinDriver>,
    motion: ServoMotion,
    // One servo motion at a time
    servo: Mutex<()>,
    released: AtomicBool,
}

impl Actuators {
    pub fn new(driver: Arc<dyn PinDriver>, motion: ServoMotion) -> Self {
        Self {
            driver,
            motion,
            servo: Mutex::new(()),
            released: AtomicBool::new(false),
        }
    }

    /// Name of the underlying driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    pub fn motion(&self) -> &ServoMotion {
        &self.motion
    }

    /// Move to `angle` (clamped to 0-180), hold for the settle time, then
    /// stop the signal so the servo does not jitter while idle.
    pub fn set_position(&self, angle: f64) -> Result<()> {
        let _servo = self.servo.lock().expect("servo lock poisoned");
        let angle = angle.clamp(0.0, 180.0);
        log::debug!("Servo -> {:.0}° (duty {:.2}%)", angle, duty_for_angle(angle));

        self.driver.set_servo_duty(duty_for_angle(angle))?;
        thread::sleep(self.motion.settle);
        self.driver.set_servo_duty(0.0)
    }

    /// The scare motion: snap to the scare angle, pause, then ramp one
    /// degree at a time to the return angle. The signal is stopped at the
    /// end even if a step failed.
    pub fn sweep(&self) -> Result<()> {
        let _servo = self.servo.lock().expect("servo lock poisoned");
        log::info!(
            "Servo sweep {:.0}° -> {:.0}°",
            self.motion.scare_angle,
            self.motion.return_angle
        );

        let result = self.run_sweep();
        let stopped = self.driver.set_servo_duty(0.0);
        result.and(stopped)
    }

    fn run_sweep(&self) -> Result<()> {
        let from = self.motion.scare_angle.clamp(0.0, 180.0);
        let to = self.motion.return_angle.clamp(0.0, 180.0);

        self.driver.set_servo_duty(duty_for_angle(from))?;
        thread::sleep(self.motion.settle);
        thread::sleep(self.motion.hold);

        let steps = (to - from).abs().round() as u32;
        let direction = if to >= from { 1.0 } else { -1.0 };
        for i in 1..=steps {
            let angle = from + direction * f64::from(i);
            self.driver.set_servo_duty(duty_for_angle(angle))?;
            thread::sleep(self.motion.step);
        }
        Ok(())
    }

    pub fn set_indicator(&self, on: bool) -> Result<()> {
        self.driver.set_indicator(on)
    }

    pub fn subscribe_button(&self, callback: ButtonCallback) -> Result<()> {
        self.driver.subscribe_button(callback)
    }

    /// Stop the servo, switch the LED off and release the pins. Only the
    /// first call does anything.
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        log::info!("Releasing GPIO ({})", self.driver.name());

        let servo = self.driver.set_servo_duty(0.0);
        let led = self.driver.set_indicator(false);
        let pins = self.driver.release();
        servo.and(led).and(pins)
    }
}

impl Drop for Actuators {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::error!("Failed to release GPIO: {}", e);
        }
    }
}

/// Whether a `/proc/cpuinfo` dump belongs to a Raspberry Pi.
pub fn cpuinfo_is_raspberry_pi(cpuinfo: &str) -> bool {
    cpuinfo.contains("BCM") || cpuinfo.to_lowercase().contains("raspberry")
}

/// Whether this machine is a Raspberry Pi.
pub fn is_raspberry_pi() -> bool {
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|info| cpuinfo_is_raspberry_pi(&info))
        .unwrap_or(false)
}

/// Open the pin driver.
///
/// Real GPIO is used when the `gpio` feature is compiled in, `simulate` is
/// not set and the machine is a Raspberry Pi. Initialization failures are
/// logged and fall back to [`SimulatedPins`].
pub fn open_driver(config: &Config, simulate: bool) -> Arc<dyn PinDriver> {
    if simulate {
        log::info!("Using simulated GPIO pins");
        return Arc::new(SimulatedPins::new());
    }

    #[cfg(feature = "gpio")]
    {
        if is_raspberry_pi() {
            match RppalPins::open(config) {
                Ok(pins) => return Arc::new(pins),
                Err(e) => log::error!("GPIO initialization failed: {} (using simulated pins)", e),
            }
        } else {
            log::warn!("Not running on a Raspberry Pi, using simulated pins");
        }
    }

    #[cfg(not(feature = "gpio"))]
    {
        let _ = config;
        log::warn!("Built without the `gpio` feature, using simulated pins");
    }

    Arc::new(SimulatedPins::new())
}
