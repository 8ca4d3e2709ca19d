//! Simulated pins for development machines and tests.

use super::{ButtonCallback, PinDriver};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Something that happened on a simulated pin.
#[derive(Debug, Clone, PartialEq)]
pub enum PinEvent {
    ServoDuty(f64),
    Indicator(bool),
    Released,
}

/// Pin driver that only logs and records.
///
/// Servo writes can be made to fail (stopping the signal with a zero duty
/// always succeeds), and [`press`](SimulatedPins::press) fires the button
/// callback.
pub struct SimulatedPins {
    events: Mutex<Vec<PinEvent>>,
    callback: Mutex<Option<ButtonCallback>>,
    servo_budget: AtomicUsize,
    fail_indicator: AtomicBool,
    fail_button: AtomicBool,
}

impl Default for SimulatedPins {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
            servo_budget: AtomicUsize::new(usize::MAX),
            fail_indicator: AtomicBool::new(false),
            fail_button: AtomicBool::new(false),
        }
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<PinEvent> {
        self.events.lock().expect("simulated pins lock poisoned").clone()
    }

    /// Servo duty values written so far, in order.
    pub fn duty_history(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PinEvent::ServoDuty(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// LED states written so far, in order.
    pub fn indicator_history(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PinEvent::Indicator(on) => Some(on),
                _ => None,
            })
            .collect()
    }

    /// Let `n` more non-zero servo writes succeed, then fail the rest.
    pub fn fail_servo_after(&self, n: usize) {
        self.servo_budget.store(n, Ordering::SeqCst);
    }

    /// Make every LED write fail.
    pub fn fail_indicator(&self, fail: bool) {
        self.fail_indicator.store(fail, Ordering::SeqCst);
    }

    /// Make button subscription fail, like a refused edge interrupt.
    pub fn fail_button(&self, fail: bool) {
        self.fail_button.store(fail, Ordering::SeqCst);
    }

    /// Simulate a button press. Returns false when nothing is subscribed.
    pub fn press(&self) -> bool {
        let callback = self
            .callback
            .lock()
            .expect("simulated pins lock poisoned")
            .clone();
        match callback {
            Some(callback) => {
                log::info!("[sim] button pressed");
                callback();
                true
            }
            None => false,
        }
    }

    fn record(&self, event: PinEvent) {
        self.events
            .lock()
            .expect("simulated pins lock poisoned")
            .push(event);
    }
}

impl PinDriver for SimulatedPins {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn set_servo_duty(&self, duty_percent: f64) -> Result<()> {
        if duty_percent > 0.0 {
            let allowed = self
                .servo_budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if !allowed {
                return Err(Error::Hardware("simulated servo failure".to_string()));
            }
        }
        log::trace!("[sim] servo duty {:.2}%", duty_percent);
        self.record(PinEvent::ServoDuty(duty_percent));
        Ok(())
    }

    fn set_indicator(&self, on: bool) -> Result<()> {
        if self.fail_indicator.load(Ordering::SeqCst) {
            return Err(Error::Hardware("simulated LED failure".to_string()));
        }
        log::debug!("[sim] LED {}", if on { "on" } else { "off" });
        self.record(PinEvent::Indicator(on));
        Ok(())
    }

    fn subscribe_button(&self, callback: ButtonCallback) -> Result<()> {
        if self.fail_button.load(Ordering::SeqCst) {
            return Err(Error::Hardware(
                "simulated interrupt registration failure".to_string(),
            ));
        }
        *self.callback.lock().expect("simulated pins lock poisoned") = Some(callback);
        Ok(())
    }

    fn release(&self) -> Result<()> {
        self.callback
            .lock()
            .expect("simulated pins lock poisoned")
            .take();
        self.record(PinEvent::Released);
        Ok(())
    }
}
