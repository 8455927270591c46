//! Hand landmark types.
//!
//! Landmarks follow the 21-point hand model: index 0 is the wrist, then four
//! points per finger from the base joint out to the tip.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Number of landmarks reported for one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark index of the wrist.
pub const WRIST: usize = 0;

/// Fingertip landmark indices, thumb to pinky.
pub const FINGER_TIPS: [usize; 5] = [4, 8, 12, 16, 20];

/// Knuckle (MCP) landmark indices, thumb to pinky.
pub const FINGER_KNUCKLES: [usize; 5] = [2, 5, 9, 13, 17];

/// Normalized landmark position.
///
/// `x` and `y` are in `[0, 1]` relative to frame width and height, with `y`
/// growing downward. `z` is depth relative to the wrist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// All 21 landmarks of one detected hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks {
    pub points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn tip(&self, finger: Finger) -> Landmark {
        self.points[finger.tip_index()]
    }

    pub fn knuckle(&self, finger: Finger) -> Landmark {
        self.points[finger.knuckle_index()]
    }
}

impl Index<usize> for HandLandmarks {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.points[index]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// Fixed processing order, thumb first.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn ordinal(self) -> usize {
        match self {
            Finger::Thumb => 0,
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Pinky => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "Thumb",
            Finger::Index => "Index",
            Finger::Middle => "Middle",
            Finger::Ring => "Ring",
            Finger::Pinky => "Pinky",
        }
    }

    pub fn tip_index(self) -> usize {
        FINGER_TIPS[self.ordinal()]
    }

    pub fn knuckle_index(self) -> usize {
        FINGER_KNUCKLES[self.ordinal()]
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-finger pressed flags, indexed by `Finger`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerStates(pub [bool; 5]);

impl FingerStates {
    pub const NONE: FingerStates = FingerStates([false; 5]);

    pub fn iter(&self) -> impl Iterator<Item = (Finger, bool)> + '_ {
        Finger::ALL.iter().map(move |&finger| (finger, self[finger]))
    }

    pub fn count_pressed(&self) -> usize {
        self.0.iter().filter(|&&pressed| pressed).count()
    }
}

impl Index<Finger> for FingerStates {
    type Output = bool;

    fn index(&self, finger: Finger) -> &bool {
        &self.0[finger.ordinal()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finger_maps_to_anatomical_indices() {
        let pairs: Vec<(usize, usize)> = Finger::ALL
            .iter()
            .map(|f| (f.tip_index(), f.knuckle_index()))
            .collect();
        assert_eq!(pairs, vec![(4, 2), (8, 5), (12, 9), (16, 13), (20, 17)]);
    }

    #[test]
    fn ordinals_follow_thumb_to_pinky() {
        for (i, finger) in Finger::ALL.iter().enumerate() {
            assert_eq!(finger.ordinal(), i);
        }
    }

    #[test]
    fn landmarks_deserialize_from_nested_arrays_of_points() {
        let json = serde_json::to_string(&vec![Landmark::new(0.5, 0.25, 0.0); LANDMARK_COUNT])
            .unwrap();
        let hand: HandLandmarks = serde_json::from_str(&json).unwrap();
        assert_eq!(hand[WRIST].y, 0.25);
    }
}
