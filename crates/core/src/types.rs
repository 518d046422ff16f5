//! Domain types shared by every stage of the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier of an input point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fid(String);

impl Fid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Fid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A geocoded input point.
///
/// Coordinates are kept as the text that appeared in the input table. That
/// text goes verbatim into tile file names and the conversion request, so a
/// point always maps to the same artifacts across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub fid: Fid,
    pub wgs_x: String,
    pub wgs_y: String,
}

impl Point {
    pub fn new(fid: impl Into<Fid>, wgs_x: impl Into<String>, wgs_y: impl Into<String>) -> Self {
        Self {
            fid: fid.into(),
            wgs_x: wgs_x.into(),
            wgs_y: wgs_y.into(),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.fid, self.wgs_x, self.wgs_y)
    }
}

/// Coordinate in the provider's projected system (bd09mc).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCoordinate {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for ProjectedCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Provider token identifying one 360 degree capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanoramaId(String);

impl PanoramaId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanoramaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Horizontal viewing angle of one directional tile.
///
/// Only the eight multiples of 45 degrees exist. Ordering follows the
/// compass sequence, which is also the order tiles are handed to the
/// stitcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Heading(u16);

impl Heading {
    /// Number of headings in a full panorama.
    pub const COUNT: usize = 8;

    /// All headings in assembly order.
    pub const ALL: [Heading; Self::COUNT] = [
        Heading(0),
        Heading(45),
        Heading(90),
        Heading(135),
        Heading(180),
        Heading(225),
        Heading(270),
        Heading(315),
    ];

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.0 == degrees)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Position in [`Heading::ALL`].
    pub fn index(self) -> usize {
        (self.0 / 45) as usize
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Heading {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_degrees(value).ok_or_else(|| format!("invalid heading: {}", value))
    }
}

impl From<Heading> for u16 {
    fn from(value: Heading) -> Self {
        value.0
    }
}

impl FromStr for Heading {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let degrees: u16 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid heading: {}", s))?;
        Self::try_from(degrees)
    }
}
