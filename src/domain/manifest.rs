//! Master playlist composition for adaptive bitrate switching.

use super::profiles;
use super::video::Video;

pub struct VariantStream {
    pub bandwidth: u32,
    pub resolution: &'static str,
    pub uri: String,
}

/// Top-level playlist enumerating every completed rendition of one video.
///
/// Variants keep the insertion order of `available_qualities`; a video with
/// no completed rendition yields a header-only playlist rather than an
/// error.
pub struct MasterPlaylist {
    variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self {
            variants: Vec::new(),
        }
    }

    /// Build the playlist for a video, announcing the bandwidth and pixel
    /// resolution recorded in the encoding catalog. `public_prefix` is the
    /// URL root under which output directories are served.
    pub fn for_video(video: &Video, public_prefix: &str) -> Self {
        let mut playlist = Self::new();

        for &quality in &video.available_qualities {
            let profile = profiles::by_quality(quality);
            playlist.add_variant(
                profile.bandwidth,
                profile.resolution,
                format!(
                    "{}/{}/{}",
                    public_prefix,
                    video.dir_name(),
                    profile.manifest_name()
                ),
            );
        }

        playlist
    }

    pub fn add_variant(&mut self, bandwidth: u32, resolution: &'static str, uri: String) {
        self.variants.push(VariantStream {
            bandwidth,
            resolution,
            uri,
        });
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");

        for variant in &self.variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\n{}\n",
                variant.bandwidth, variant.resolution, variant.uri
            ));
        }

        out
    }
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        Self::new()
    }
}
