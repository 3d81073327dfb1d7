use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Device family, selects the navigation vocabulary
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Two-button devices
    #[default]
    Nano,
    Touch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPosition {
    RightHeader,
}

/// Navigation instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavIns {
    RightClick,
    BothClick,
    SwipeCenterToLeft,
    UseCaseChoiceReject,
    UseCaseChoiceConfirm,
    UseCaseReviewConfirm,
    Touch(TouchPosition),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingId {
    BlindSigning,
    VerboseEip712,
    DisplayHash,
}

/// Screens to compare against stored references, starting at `start_idx`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capture {
    pub dir: PathBuf,
    pub start_idx: usize,
    /// Write the references instead of comparing
    pub golden: bool,
}

/// Final review screens: the instruction moving through them, the one
/// approving, and the text of the approval screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewMoves {
    pub nav: NavIns,
    pub validate: Vec<NavIns>,
    pub text: &'static str,
}

impl DeviceClass {
    /// Move to the next screen
    pub fn next_move(&self) -> NavIns {
        match self {
            DeviceClass::Nano => NavIns::RightClick,
            DeviceClass::Touch => NavIns::SwipeCenterToLeft,
        }
    }

    /// Acknowledge the blind-signing warning
    pub fn warning_move(&self) -> NavIns {
        match self {
            DeviceClass::Nano => NavIns::BothClick,
            DeviceClass::Touch => NavIns::UseCaseChoiceReject,
        }
    }

    /// Leave the field-by-field review and go to the approval screen
    pub fn skip_moves(&self) -> Option<[NavIns; 2]> {
        match self {
            DeviceClass::Nano => None,
            DeviceClass::Touch => Some([
                NavIns::Touch(TouchPosition::RightHeader),
                NavIns::UseCaseChoiceConfirm,
            ]),
        }
    }

    pub fn review_moves(&self) -> ReviewMoves {
        match self {
            DeviceClass::Nano => ReviewMoves {
                nav: NavIns::RightClick,
                validate: vec![NavIns::BothClick],
                text: "Sign message",
            },
            DeviceClass::Touch => ReviewMoves {
                nav: NavIns::SwipeCenterToLeft,
                validate: vec![NavIns::UseCaseReviewConfirm],
                text: "Hold to sign",
            },
        }
    }

    /// Whole review of a pre-hashed message
    pub fn legacy_moves(&self) -> Vec<NavIns> {
        match self {
            DeviceClass::Nano => {
                let mut moves = vec![NavIns::BothClick];
                moves.extend([NavIns::RightClick; 5]);
                moves.push(NavIns::BothClick);
                moves
            }
            DeviceClass::Touch => vec![
                NavIns::UseCaseChoiceReject,
                NavIns::SwipeCenterToLeft,
                NavIns::SwipeCenterToLeft,
                NavIns::UseCaseReviewConfirm,
            ],
        }
    }
}

/// On-device navigation engine
pub trait Navigator {
    fn navigate(&mut self, moves: &[NavIns], capture: Option<&Capture>) -> Result<()>;

    /// Repeat `nav` until `text` is on screen, then play `validate`
    fn navigate_until_text(
        &mut self,
        nav: NavIns,
        validate: &[NavIns],
        text: &str,
        capture: Option<&Capture>,
    ) -> Result<()>;

    fn toggle_settings(&mut self, settings: &[SettingId]) -> Result<()>;
}
