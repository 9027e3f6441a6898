//! Vertex format flags.

use std::fmt;
use std::str::FromStr;

use crate::{Error, GeometrySource, Result};

bitflags::bitflags! {
    /// Channels present in each exported vertex, one bit per channel.
    ///
    /// Bit positions are part of the file format. `COLOR`, `BONE_DATA` and
    /// `TWEEN` are reserved: they can be named but are refused at export.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VertexFormat: u8 {
        /// XYZ position, 12 bytes.
        const POSITION = 1 << 0;
        /// XYZ per-loop normal, 12 bytes.
        const NORMAL = 1 << 1;
        /// First UV layer, 8 bytes.
        const UV0 = 1 << 2;
        /// Tangent and bitangent XYZ, 24 bytes.
        const TANGENT_BITANGENT = 1 << 3;
        /// Second UV layer, 8 bytes.
        const UV1 = 1 << 4;
        /// RGB vertex color (reserved).
        const COLOR = 1 << 5;
        /// Bone weights and ids (reserved).
        const BONE_DATA = 1 << 6;
        /// Vertex animation data (reserved).
        const TWEEN = 1 << 7;
    }
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self::POSITION | Self::NORMAL | Self::UV0
    }
}

const CHANNEL_NAMES: [(&str, VertexFormat); 8] = [
    ("pos", VertexFormat::POSITION),
    ("normal", VertexFormat::NORMAL),
    ("uv0", VertexFormat::UV0),
    ("tangent", VertexFormat::TANGENT_BITANGENT),
    ("uv1", VertexFormat::UV1),
    ("color", VertexFormat::COLOR),
    ("bone", VertexFormat::BONE_DATA),
    ("tween", VertexFormat::TWEEN),
];

impl VertexFormat {
    /// Channels this exporter can actually write.
    pub const SUPPORTED: Self = Self::POSITION
        .union(Self::NORMAL)
        .union(Self::UV0)
        .union(Self::TANGENT_BITANGENT)
        .union(Self::UV1);

    /// Size in bytes of one vertex in the binary layout.
    ///
    /// Reserved channels contribute nothing; [`VertexFormat::check_against`]
    /// refuses them before anything is written.
    pub fn bytes_per_vertex(self) -> u8 {
        let mut size = 0;
        if self.contains(Self::POSITION) {
            size += 12;
        }
        if self.contains(Self::NORMAL) {
            size += 12;
        }
        if self.contains(Self::UV0) {
            size += 8;
        }
        if self.contains(Self::TANGENT_BITANGENT) {
            size += 24;
        }
        if self.contains(Self::UV1) {
            size += 8;
        }
        size
    }

    /// Verifies that the format includes a position and that every requested
    /// channel can be produced from `source`.
    pub fn check_against<G: GeometrySource + ?Sized>(self, source: &G) -> Result<()> {
        if !self.contains(Self::POSITION) {
            return Err(Error::FormatMismatch(format!(
                "format '{self}' has no position channel"
            )));
        }
        let reserved = self.difference(Self::SUPPORTED);
        if !reserved.is_empty() {
            return Err(Error::FormatMismatch(format!(
                "channels {reserved} are reserved and cannot be exported"
            )));
        }
        if self.contains(Self::UV0) && source.uv_layer_count() < 1 {
            return Err(Error::FormatMismatch(
                "requested uv0, but the mesh has no uv layer".into(),
            ));
        }
        if self.contains(Self::UV1) && source.uv_layer_count() < 2 {
            return Err(Error::FormatMismatch(
                "requested uv1, but the mesh has no second uv layer".into(),
            ));
        }
        if self.contains(Self::NORMAL) && !source.has_loop_normals() {
            return Err(Error::FormatMismatch(
                "requested normals, but the mesh has none".into(),
            ));
        }
        if self.contains(Self::TANGENT_BITANGENT) && !source.has_loop_tangents() {
            return Err(Error::FormatMismatch(
                "requested tangents, but the mesh has none".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = CHANNEL_NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "{}", names.join(","))
    }
}

impl FromStr for VertexFormat {
    type Err = Error;

    /// Parses channel names separated by `,` or `|`, e.g. `pos,normal,uv0`.
    fn from_str(s: &str) -> Result<Self> {
        let mut format = Self::empty();
        for name in s.split([',', '|']).map(str::trim).filter(|n| !n.is_empty()) {
            let name = name.to_ascii_lowercase();
            let flag = match name.as_str() {
                "position" => Self::POSITION,
                "tangent_bitangent" | "tbn" => Self::TANGENT_BITANGENT,
                other => CHANNEL_NAMES
                    .iter()
                    .find(|(n, _)| *n == other)
                    .map(|(_, flag)| *flag)
                    .ok_or_else(|| {
                        Error::Configuration(format!("unknown vertex channel '{other}'"))
                    })?,
            };
            format |= flag;
        }
        Ok(format)
    }
}
