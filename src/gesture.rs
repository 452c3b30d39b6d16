//! Arm-raise gesture classification.
//!
//! The classifier looks at the vertical coordinate of the shoulder, elbow and
//! wrist of each arm. An arm counts as raised when the shoulder-to-elbow step
//! does not go down and the elbow-to-wrist step goes strictly up (image `y`
//! grows downwards). This is a coarse heuristic for "arm extended upward",
//! not a biomechanical model: a bent arm held above the shoulder and a
//! straight arm pointing sideways can both be misread.

use std::fmt;

use crate::error::RelayError;
use crate::keypoints::{joint, PersonKeypoints};

/// Minimum number of joints a person needs for classification.
pub const REQUIRED_JOINTS: usize = joint::LEFT_WRIST + 1;

/// Coarse arm position of one person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    BothHandsUp,
    LeftHandUp,
    RightHandUp,
    BothHandsDown,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; 4] = [
        GestureLabel::BothHandsUp,
        GestureLabel::LeftHandUp,
        GestureLabel::RightHandUp,
        GestureLabel::BothHandsDown,
    ];

    /// Numeric id carried in the status payload.
    pub fn id(self) -> u8 {
        match self {
            GestureLabel::BothHandsUp => 1,
            GestureLabel::LeftHandUp => 2,
            GestureLabel::RightHandUp => 3,
            GestureLabel::BothHandsDown => 4,
        }
    }

    /// Human-readable action text carried in the status payload.
    pub fn action_text(self) -> &'static str {
        match self {
            GestureLabel::BothHandsUp => "Both hands up",
            GestureLabel::LeftHandUp => "left hand up",
            GestureLabel::RightHandUp => "right hand up",
            GestureLabel::BothHandsDown => "both hands down",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureLabel::BothHandsUp => "BothHandsUp",
            GestureLabel::LeftHandUp => "LeftHandUp",
            GestureLabel::RightHandUp => "RightHandUp",
            GestureLabel::BothHandsDown => "BothHandsDown",
        };
        f.write_str(name)
    }
}

/// Vertical coordinates of the six arm joints, in joint-id order 2..=7.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmHeights {
    pub right: [f32; 3],
    pub left: [f32; 3],
}

impl ArmHeights {
    pub fn from_person(person: &PersonKeypoints) -> Result<Self, RelayError> {
        if person.len() < REQUIRED_JOINTS {
            return Err(RelayError::InvalidInput(format!(
                "person has {} joints, classification needs at least {}",
                person.len(),
                REQUIRED_JOINTS
            )));
        }
        let y = |id: usize| person.joints()[id].y;
        Ok(Self {
            right: [
                y(joint::RIGHT_SHOULDER),
                y(joint::RIGHT_ELBOW),
                y(joint::RIGHT_WRIST),
            ],
            left: [
                y(joint::LEFT_SHOULDER),
                y(joint::LEFT_ELBOW),
                y(joint::LEFT_WRIST),
            ],
        })
    }

    pub fn right_raised(&self) -> bool {
        arm_raised(self.right)
    }

    pub fn left_raised(&self) -> bool {
        arm_raised(self.left)
    }

    pub fn label(&self) -> GestureLabel {
        label_for(self.right_raised(), self.left_raised())
    }
}

// Ties on the shoulder-elbow step count as raised.
fn arm_raised([shoulder, elbow, wrist]: [f32; 3]) -> bool {
    shoulder - elbow >= 0.0 && elbow - wrist > 0.0
}

/// Classify one person's arm position.
pub fn classify(person: &PersonKeypoints) -> Result<GestureLabel, RelayError> {
    Ok(ArmHeights::from_person(person)?.label())
}

fn label_for(right_raised: bool, left_raised: bool) -> GestureLabel {
    match (right_raised, left_raised) {
        (true, true) => GestureLabel::BothHandsUp,
        (false, true) => GestureLabel::LeftHandUp,
        (true, false) => GestureLabel::RightHandUp,
        (false, false) => GestureLabel::BothHandsDown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::Keypoint;

    fn person(right: [f32; 3], left: [f32; 3]) -> PersonKeypoints {
        let mut joints = vec![Keypoint::new(0.0, 0.0, 0.9); 25];
        for (i, y) in right.iter().enumerate() {
            joints[joint::RIGHT_SHOULDER + i].y = *y;
        }
        for (i, y) in left.iter().enumerate() {
            joints[joint::LEFT_SHOULDER + i].y = *y;
        }
        PersonKeypoints::new(joints)
    }

    const UP: [f32; 3] = [10.0, 5.0, 0.0];
    const DOWN: [f32; 3] = [0.0, 5.0, 10.0];

    #[test]
    fn both_arms_raised() {
        assert_eq!(classify(&person(UP, UP)).unwrap(), GestureLabel::BothHandsUp);
    }

    #[test]
    fn single_arm_raised() {
        assert_eq!(classify(&person(DOWN, UP)).unwrap(), GestureLabel::LeftHandUp);
        assert_eq!(classify(&person(UP, DOWN)).unwrap(), GestureLabel::RightHandUp);
    }

    #[test]
    fn no_arm_raised() {
        assert_eq!(
            classify(&person(DOWN, DOWN)).unwrap(),
            GestureLabel::BothHandsDown
        );
    }

    #[test]
    fn equal_shoulder_and_elbow_counts_as_raised() {
        let right = [5.0, 5.0, 0.0];
        assert_eq!(
            classify(&person(right, DOWN)).unwrap(),
            GestureLabel::RightHandUp
        );
    }

    #[test]
    fn shoulder_just_above_elbow_is_not_raised() {
        let right = [4.9999, 5.0, 0.0];
        assert_eq!(
            classify(&person(right, DOWN)).unwrap(),
            GestureLabel::BothHandsDown
        );
    }

    #[test]
    fn equal_elbow_and_wrist_is_not_raised() {
        let left = [10.0, 5.0, 5.0];
        assert_eq!(
            classify(&person(DOWN, left)).unwrap(),
            GestureLabel::BothHandsDown
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let p = person(UP, DOWN);
        assert_eq!(classify(&p).unwrap(), classify(&p).unwrap());
    }

    #[test]
    fn only_arm_joints_matter() {
        let mut joints = person(DOWN, UP).joints().to_vec();
        joints[0].y = -500.0;
        joints[10].y = 900.0;
        joints[joint::LEFT_WRIST].x = 1234.0;
        let p = PersonKeypoints::new(joints);
        assert_eq!(classify(&p).unwrap(), GestureLabel::LeftHandUp);
    }

    #[test]
    fn short_person_is_invalid_input() {
        let p = PersonKeypoints::new(vec![Keypoint::default(); REQUIRED_JOINTS - 1]);
        let err = classify(&p).unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
        assert!(err.is_frame_local());
    }

    #[test]
    fn eight_joints_are_enough() {
        let p = PersonKeypoints::new(person(UP, UP).joints()[..REQUIRED_JOINTS].to_vec());
        assert_eq!(classify(&p).unwrap(), GestureLabel::BothHandsUp);
    }

    #[test]
    fn heights_label_agrees_with_classify() {
        for label in GestureLabel::ALL {
            let p = crate::pipeline::posed_person(label);
            let heights = ArmHeights::from_person(&p).unwrap();
            assert_eq!(heights.label(), label);
            assert_eq!(classify(&p).unwrap(), heights.label());
        }
    }
}
