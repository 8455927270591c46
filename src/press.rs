//! Per-finger press/release tracking.
//!
//! Each finger owns one `FingerStateMachine`. The machine turns a stream of
//! per-frame pressed flags into at most one `KeyPressEvent` per call, emitted
//! on the falling edge only. There is no debounce: a flickering input yields
//! flickering events.

use std::time::Duration;

use crate::hand::Finger;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PressState {
    #[default]
    Idle,
    Pressed {
        /// Pipeline timestamp (ms) of the first pressed observation.
        since_ms: u64,
    },
}

/// A completed press: finger went down at `start_ms` and was released after `duration`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPressEvent {
    pub finger: Finger,
    pub start_ms: u64,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct FingerStateMachine {
    finger: Finger,
    state: PressState,
}

impl FingerStateMachine {
    pub fn new(finger: Finger) -> Self {
        Self {
            finger,
            state: PressState::Idle,
        }
    }

    pub fn finger(&self) -> Finger {
        self.finger
    }

    pub fn state(&self) -> PressState {
        self.state
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, PressState::Pressed { .. })
    }

    /// Feed one observation taken at `now_ms`.
    ///
    /// Returns an event only on the Pressed -> Idle transition.
    pub fn update(&mut self, pressed_now: bool, now_ms: u64) -> Option<KeyPressEvent> {
        match (self.state, pressed_now) {
            (PressState::Idle, true) => {
                self.state = PressState::Pressed { since_ms: now_ms };
                log::debug!("{} down at {}ms", self.finger, now_ms);
                None
            }
            (PressState::Pressed { since_ms }, false) => {
                self.state = PressState::Idle;
                let duration = Duration::from_millis(now_ms.saturating_sub(since_ms));
                log::info!(
                    "{} released. duration: {:.2}s",
                    self.finger,
                    duration.as_secs_f64()
                );
                Some(KeyPressEvent {
                    finger: self.finger,
                    start_ms: since_ms,
                    duration,
                })
            }
            _ => None,
        }
    }
}

/// The five machines of one hand, updated in thumb-to-pinky order.
#[derive(Debug)]
pub struct HandStateMachines {
    fingers: [FingerStateMachine; 5],
}

impl HandStateMachines {
    pub fn new() -> Self {
        Self {
            fingers: Finger::ALL.map(FingerStateMachine::new),
        }
    }

    pub fn update(&mut self, pressed: [bool; 5], now_ms: u64) -> Vec<KeyPressEvent> {
        self.fingers
            .iter_mut()
            .zip(pressed)
            .filter_map(|(machine, pressed_now)| machine.update(pressed_now, now_ms))
            .collect()
    }

    pub fn get(&self, finger: Finger) -> &FingerStateMachine {
        &self.fingers[finger.ordinal()]
    }
}

impl Default for HandStateMachines {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling_edges(inputs: &[bool]) -> usize {
        let mut prev = false;
        let mut count = 0;
        for &value in inputs {
            if prev && !value {
                count += 1;
            }
            prev = value;
        }
        count
    }

    #[test]
    fn press_then_release_emits_one_event() {
        let mut machine = FingerStateMachine::new(Finger::Index);
        assert_eq!(machine.update(true, 100), None);
        assert!(machine.is_pressed());
        let event = machine.update(false, 350).expect("release event");
        assert_eq!(event.finger, Finger::Index);
        assert_eq!(event.start_ms, 100);
        assert_eq!(event.duration, Duration::from_millis(250));
        assert_eq!(machine.state(), PressState::Idle);
    }

    #[test]
    fn repeated_inputs_do_not_duplicate_events() {
        let mut machine = FingerStateMachine::new(Finger::Thumb);
        let mut events = Vec::new();
        for t in 0..5 {
            events.extend(machine.update(true, t));
        }
        assert!(events.is_empty());
        for t in 5..10 {
            events.extend(machine.update(false, t));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_ms, 0);
        assert_eq!(events[0].duration, Duration::from_millis(5));
    }

    #[test]
    fn idle_release_emits_nothing() {
        let mut machine = FingerStateMachine::new(Finger::Ring);
        assert_eq!(machine.update(false, 0), None);
        assert_eq!(machine.update(false, 1), None);
        assert_eq!(machine.state(), PressState::Idle);
    }

    #[test]
    fn event_count_matches_falling_edges() {
        let sequences: [&[bool]; 5] = [
            &[],
            &[true, false, true, false],
            &[false, true, true, true, false, false, true],
            &[true, true, true],
            &[true, false, false, true, false, true, true, false, true, false],
        ];
        for inputs in sequences {
            let mut machine = FingerStateMachine::new(Finger::Middle);
            let events: Vec<KeyPressEvent> = inputs
                .iter()
                .enumerate()
                .filter_map(|(t, &pressed)| machine.update(pressed, t as u64 * 10))
                .collect();
            assert_eq!(events.len(), falling_edges(inputs), "inputs {:?}", inputs);
            assert!(events.iter().all(|e| e.duration >= Duration::ZERO));
        }
    }

    #[test]
    fn hand_machines_emit_in_finger_order() {
        let mut hand = HandStateMachines::new();
        assert!(hand.update([true, false, true, false, true], 0).is_empty());
        let events = hand.update([false; 5], 40);
        let fingers: Vec<Finger> = events.iter().map(|e| e.finger).collect();
        assert_eq!(fingers, vec![Finger::Thumb, Finger::Middle, Finger::Pinky]);
        assert!(!hand.get(Finger::Thumb).is_pressed());
    }
}
