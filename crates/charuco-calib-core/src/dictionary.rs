//! Predefined marker dictionaries.
//!
//! Only the metadata needed to validate a board lives here; the marker codes
//! themselves belong to the vision backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the predefined ArUco/AprilTag dictionaries shipped with OpenCV.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dictionary {
    DICT_4X4_50,
    DICT_4X4_100,
    DICT_4X4_250,
    DICT_4X4_1000,
    DICT_5X5_50,
    DICT_5X5_100,
    DICT_5X5_250,
    DICT_5X5_1000,
    DICT_6X6_50,
    DICT_6X6_100,
    DICT_6X6_250,
    DICT_6X6_1000,
    DICT_7X7_50,
    DICT_7X7_100,
    DICT_7X7_250,
    DICT_7X7_1000,
    DICT_ARUCO_ORIGINAL,
    DICT_APRILTAG_16h5,
    DICT_APRILTAG_25h9,
    DICT_APRILTAG_36h10,
    DICT_APRILTAG_36h11,
    DICT_ARUCO_MIP_36h12,
}

#[derive(thiserror::Error, Debug)]
#[error("unknown marker dictionary `{0}`")]
pub struct UnknownDictionary(pub String);

impl Dictionary {
    pub const ALL: [Dictionary; 22] = [
        Dictionary::DICT_4X4_50,
        Dictionary::DICT_4X4_100,
        Dictionary::DICT_4X4_250,
        Dictionary::DICT_4X4_1000,
        Dictionary::DICT_5X5_50,
        Dictionary::DICT_5X5_100,
        Dictionary::DICT_5X5_250,
        Dictionary::DICT_5X5_1000,
        Dictionary::DICT_6X6_50,
        Dictionary::DICT_6X6_100,
        Dictionary::DICT_6X6_250,
        Dictionary::DICT_6X6_1000,
        Dictionary::DICT_7X7_50,
        Dictionary::DICT_7X7_100,
        Dictionary::DICT_7X7_250,
        Dictionary::DICT_7X7_1000,
        Dictionary::DICT_ARUCO_ORIGINAL,
        Dictionary::DICT_APRILTAG_16h5,
        Dictionary::DICT_APRILTAG_25h9,
        Dictionary::DICT_APRILTAG_36h10,
        Dictionary::DICT_APRILTAG_36h11,
        Dictionary::DICT_ARUCO_MIP_36h12,
    ];

    /// Canonical OpenCV name, e.g. `DICT_5X5_1000`.
    pub fn name(self) -> &'static str {
        match self {
            Dictionary::DICT_4X4_50 => "DICT_4X4_50",
            Dictionary::DICT_4X4_100 => "DICT_4X4_100",
            Dictionary::DICT_4X4_250 => "DICT_4X4_250",
            Dictionary::DICT_4X4_1000 => "DICT_4X4_1000",
            Dictionary::DICT_5X5_50 => "DICT_5X5_50",
            Dictionary::DICT_5X5_100 => "DICT_5X5_100",
            Dictionary::DICT_5X5_250 => "DICT_5X5_250",
            Dictionary::DICT_5X5_1000 => "DICT_5X5_1000",
            Dictionary::DICT_6X6_50 => "DICT_6X6_50",
            Dictionary::DICT_6X6_100 => "DICT_6X6_100",
            Dictionary::DICT_6X6_250 => "DICT_6X6_250",
            Dictionary::DICT_6X6_1000 => "DICT_6X6_1000",
            Dictionary::DICT_7X7_50 => "DICT_7X7_50",
            Dictionary::DICT_7X7_100 => "DICT_7X7_100",
            Dictionary::DICT_7X7_250 => "DICT_7X7_250",
            Dictionary::DICT_7X7_1000 => "DICT_7X7_1000",
            Dictionary::DICT_ARUCO_ORIGINAL => "DICT_ARUCO_ORIGINAL",
            Dictionary::DICT_APRILTAG_16h5 => "DICT_APRILTAG_16h5",
            Dictionary::DICT_APRILTAG_25h9 => "DICT_APRILTAG_25h9",
            Dictionary::DICT_APRILTAG_36h10 => "DICT_APRILTAG_36h10",
            Dictionary::DICT_APRILTAG_36h11 => "DICT_APRILTAG_36h11",
            Dictionary::DICT_ARUCO_MIP_36h12 => "DICT_ARUCO_MIP_36h12",
        }
    }

    /// Number of distinct marker ids in the dictionary.
    pub fn marker_count(self) -> usize {
        match self {
            Dictionary::DICT_4X4_50
            | Dictionary::DICT_5X5_50
            | Dictionary::DICT_6X6_50
            | Dictionary::DICT_7X7_50 => 50,
            Dictionary::DICT_4X4_100
            | Dictionary::DICT_5X5_100
            | Dictionary::DICT_6X6_100
            | Dictionary::DICT_7X7_100 => 100,
            Dictionary::DICT_4X4_250
            | Dictionary::DICT_5X5_250
            | Dictionary::DICT_6X6_250
            | Dictionary::DICT_7X7_250
            | Dictionary::DICT_ARUCO_MIP_36h12 => 250,
            Dictionary::DICT_4X4_1000
            | Dictionary::DICT_5X5_1000
            | Dictionary::DICT_6X6_1000
            | Dictionary::DICT_7X7_1000 => 1000,
            Dictionary::DICT_ARUCO_ORIGINAL => 1024,
            Dictionary::DICT_APRILTAG_16h5 => 30,
            Dictionary::DICT_APRILTAG_25h9 => 35,
            Dictionary::DICT_APRILTAG_36h10 => 2320,
            Dictionary::DICT_APRILTAG_36h11 => 587,
        }
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dictionary {
    type Err = UnknownDictionary;

    /// Accepts the canonical name with or without the `DICT_` prefix, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        let wanted = wanted.strip_prefix("DICT_").unwrap_or(&wanted);
        Dictionary::ALL
            .into_iter()
            .find(|d| d.name()[5..].eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownDictionary(s.to_string()))
    }
}
