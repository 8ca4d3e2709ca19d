//! Wiring check: servo to 0°, 90° and 180°, LED on and off, one sweep.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use trickster_core::hardware::{Actuators, PinDriver, ServoMotion};
use trickster_core::{open_driver, Config};

const LED_BLINK: Duration = Duration::from_millis(500);

pub fn run(config: &Config, simulate: bool) -> Result<()> {
    let driver = open_driver(config, simulate);
    exercise(driver, ServoMotion::from_settings(&config.servo), LED_BLINK)
}

fn exercise(driver: Arc<dyn PinDriver>, motion: ServoMotion, blink: Duration) -> Result<()> {
    let actuators = Actuators::new(driver, motion);
    println!("Hardware self-test ({} pins)", actuators.driver_name());

    for angle in [0.0, 90.0, 180.0] {
        println!("  servo -> {}°", angle);
        actuators
            .set_position(angle)
            .with_context(|| format!("Servo failed at {}°", angle))?;
    }

    println!("  LED on");
    actuators.set_indicator(true).context("LED failed")?;
    thread::sleep(blink);
    println!("  LED off");
    actuators.set_indicator(false).context("LED failed")?;

    println!("  sweep");
    actuators.sweep().context("Servo sweep failed")?;

    actuators.release().context("Failed to release GPIO")?;
    println!("Self-test passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trickster_core::hardware::{duty_for_angle, PinEvent};
    use trickster_core::SimulatedPins;

    fn instant_motion() -> ServoMotion {
        ServoMotion {
            settle: Duration::ZERO,
            hold: Duration::ZERO,
            step: Duration::ZERO,
            ..ServoMotion::default()
        }
    }

    #[test]
    fn test_selftest_sequence() {
        let pins = Arc::new(SimulatedPins::new());
        exercise(pins.clone(), instant_motion(), Duration::ZERO).unwrap();

        let duties = pins.duty_history();
        assert_eq!(
            &duties[..6],
            &[
                duty_for_angle(0.0),
                0.0,
                duty_for_angle(90.0),
                0.0,
                duty_for_angle(180.0),
                0.0
            ]
        );
        assert_eq!(pins.indicator_history(), vec![true, false, false]);
        assert_eq!(pins.events().last(), Some(&PinEvent::Released));
    }

    #[test]
    fn test_selftest_reports_servo_fault() {
        let pins = Arc::new(SimulatedPins::new());
        pins.fail_servo_after(1);
        let err = exercise(pins.clone(), instant_motion(), Duration::ZERO).unwrap_err();
        assert!(err.to_string().contains("90"));
    }
}
