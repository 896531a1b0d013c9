//! The rendition profile catalog and the selection rule applied to an
//! uploaded source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendition labels, matching the quality names exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "360")]
    P360,
    #[serde(rename = "480")]
    P480,
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::P360 => "360",
            Quality::P480 => "480",
            Quality::P720 => "720",
            Quality::P1080 => "1080",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Encoder and playlist parameters for one target rendition.
///
/// The bandwidth/resolution pair announced in the master playlist lives in
/// the same entry as the encoding parameters so the two can never drift.
#[derive(Debug)]
pub struct Profile {
    pub quality: Quality,
    pub height: u32,
    pub avg_bitrate: &'static str,
    pub max_bitrate: &'static str,
    pub buf_size: &'static str,
    pub bandwidth: u32,
    pub resolution: &'static str,
}

impl Profile {
    /// Segment filename template handed to the encoder.
    pub fn segment_template(&self) -> String {
        format!("{}p_%03d.ts", self.height)
    }

    /// Filename of this rendition's sub-manifest.
    pub fn manifest_name(&self) -> String {
        format!("{}p.m3u8", self.height)
    }
}

/// Catalog of all target renditions, smallest first.
pub static CATALOG: [Profile; 4] = [
    Profile {
        quality: Quality::P360,
        height: 360,
        avg_bitrate: "800k",
        max_bitrate: "856k",
        buf_size: "1200k",
        bandwidth: 1200,
        resolution: "640x360",
    },
    Profile {
        quality: Quality::P480,
        height: 480,
        avg_bitrate: "1400k",
        max_bitrate: "1498k",
        buf_size: "2100k",
        bandwidth: 2100,
        resolution: "854x480",
    },
    Profile {
        quality: Quality::P720,
        height: 720,
        avg_bitrate: "2800k",
        max_bitrate: "2996k",
        buf_size: "4200k",
        bandwidth: 4200,
        resolution: "1280x720",
    },
    Profile {
        quality: Quality::P1080,
        height: 1080,
        avg_bitrate: "5600k",
        max_bitrate: "5992k",
        buf_size: "8400k",
        bandwidth: 8400,
        resolution: "1920x1080",
    },
];

/// Pick the catalog profiles that apply to a source of the given height:
/// every profile at or below the source resolution. A source below the
/// smallest catalog entry still gets that smallest rendition.
pub fn select(source_height: u32) -> Vec<&'static Profile> {
    let eligible: Vec<&'static Profile> = CATALOG
        .iter()
        .filter(|profile| profile.height <= source_height)
        .collect();

    if eligible.is_empty() {
        vec![&CATALOG[0]]
    } else {
        eligible
    }
}

/// Catalog entry for a rendition label.
pub fn by_quality(quality: Quality) -> &'static Profile {
    CATALOG
        .iter()
        .find(|profile| profile.quality == quality)
        .expect("every quality has a catalog entry")
}
