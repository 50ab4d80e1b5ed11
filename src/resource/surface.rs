// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Main surface descriptions.
//!
//! A [`SurfaceDesc`] is what the allocator hands us for the full-resolution storage of a
//! resource: its dimensionality, its [`Format`], and its mip/array/sample extents.  Nothing
//! in here knows about compression; the auxiliary side lives in [`super::aux_usage`] and
//! [`super::aux_state`].

/// Pixel formats a surface (or a view of one) can be interpreted as.
///
/// The names follow the pixel format types used elsewhere in this codebase.  The format
/// matters to the aux machinery in three ways: whether the color compressor can handle it
/// ([`Format::supports_ccs_d`], [`Format::supports_ccs_e`]), whether two formats may share
/// one compressed representation ([`Format::ccs_e_compatible`]), and whether it is sRGB
/// encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    R8UNorm,
    R16Float,
    R32Float,
    R32SInt,
    RGFloat,
    RGBA8UNorm,
    RGBA8UNormSRGB,
    BGRA8UNorm,
    BGRA8UNormSRGB,
    RGBA16UNorm,
    RGBA16Float,
    RGBA32Float,
    Depth16UNorm,
    Depth24UNormX8,
    Depth32Float,
    Stencil8,
}

impl Format {
    /// Bits stored for each of the r, g, b, a channels (0 for absent channels).
    ///
    /// Depth and stencil formats report their single channel in `r`.
    pub const fn channel_bits(self) -> [u8; 4] {
        match self {
            Format::R8UNorm | Format::Stencil8 => [8, 0, 0, 0],
            Format::R16Float | Format::Depth16UNorm => [16, 0, 0, 0],
            Format::R32Float | Format::R32SInt | Format::Depth32Float => [32, 0, 0, 0],
            Format::Depth24UNormX8 => [24, 0, 0, 0],
            Format::RGFloat => [32, 32, 0, 0],
            Format::RGBA8UNorm
            | Format::RGBA8UNormSRGB
            | Format::BGRA8UNorm
            | Format::BGRA8UNormSRGB => [8, 8, 8, 8],
            Format::RGBA16UNorm | Format::RGBA16Float => [16, 16, 16, 16],
            Format::RGBA32Float => [32, 32, 32, 32],
        }
    }

    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            // X8 padding is stored
            Format::Depth24UNormX8 => 32,
            _ => {
                let [r, g, b, a] = self.channel_bits();
                r as u32 + g as u32 + b as u32 + a as u32
            }
        }
    }

    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            Format::Depth16UNorm | Format::Depth24UNormX8 | Format::Depth32Float
        )
    }

    pub const fn is_stencil(self) -> bool {
        matches!(self, Format::Stencil8)
    }

    pub const fn is_color(self) -> bool {
        !self.is_depth() && !self.is_stencil()
    }

    pub const fn is_srgb(self) -> bool {
        matches!(self, Format::RGBA8UNormSRGB | Format::BGRA8UNormSRGB)
    }

    /// The linear-encoded format with the same layout.
    ///
    /// Resolves operate on raw channel data, so they always run with the linear variant.
    pub const fn to_linear(self) -> Format {
        match self {
            Format::RGBA8UNormSRGB => Format::RGBA8UNorm,
            Format::BGRA8UNormSRGB => Format::BGRA8UNorm,
            other => other,
        }
    }

    /// Whether render targets of this format can use "D" color compression (fast clears only).
    pub const fn supports_ccs_d(self) -> bool {
        self.is_color() && matches!(self.bits_per_pixel(), 32 | 64 | 128)
    }

    /// Whether this format can use "E" (lossless) color compression.
    pub const fn supports_ccs_e(self) -> bool {
        self.supports_ccs_d() && !matches!(self, Format::R32SInt)
    }

    /// Whether data compressed under `self` may be read or written as `other`.
    ///
    /// The compressor only cares about the bit layout of the channels, not about how those
    /// bits are interpreted, so any two "E"-capable formats with identical channel widths
    /// share a compressed representation.
    pub fn ccs_e_compatible(self, other: Format) -> bool {
        self.supports_ccs_e()
            && other.supports_ccs_e()
            && self.channel_bits() == other.channel_bits()
    }
}

/// Dimensionality of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Untyped buffer storage.  Never has auxiliary surfaces.
    Buffer,
    Texture1D,
    Texture2D,
    /// Levels shrink in depth as well as width and height.
    Texture3D,
    /// Six faces per cube, stored as array layers.
    TextureCube,
}

/// Descriptor of the main (uncompressed) surface of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    pub target: Target,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    /// Depth in texels; 1 unless the target is [`Target::Texture3D`].
    pub depth: u32,
    pub levels: u32,
    /// Number of array layers, faces included for cube maps; 1 for 3D surfaces.
    pub array_len: u32,
    pub samples: u32,
}

impl SurfaceDesc {
    /// A single-sampled, single-layer 2D surface.
    pub fn texture_2d(format: Format, width: u32, height: u32, levels: u32) -> Self {
        SurfaceDesc {
            target: Target::Texture2D,
            format,
            width,
            height,
            depth: 1,
            levels,
            array_len: 1,
            samples: 1,
        }
    }

    pub fn with_array_len(mut self, array_len: u32) -> Self {
        self.array_len = array_len;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn texture_3d(format: Format, width: u32, height: u32, depth: u32, levels: u32) -> Self {
        SurfaceDesc {
            target: Target::Texture3D,
            format,
            width,
            height,
            depth,
            levels,
            array_len: 1,
            samples: 1,
        }
    }

    pub fn buffer(size: u32) -> Self {
        SurfaceDesc {
            target: Target::Buffer,
            format: Format::R8UNorm,
            width: size,
            height: 1,
            depth: 1,
            levels: 1,
            array_len: 1,
            samples: 1,
        }
    }

    /// Number of addressable layers at `level`.
    ///
    /// For 3D surfaces every depth slice is a layer, so the count shrinks with the level.
    pub fn logical_layers(&self, level: u32) -> u32 {
        match self.target {
            Target::Texture3D => minify(self.depth, level),
            _ => self.array_len,
        }
    }

    pub fn level_width(&self, level: u32) -> u32 {
        minify(self.width, level)
    }

    pub fn level_height(&self, level: u32) -> u32 {
        minify(self.height, level)
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }
}

/// Size of a dimension at `level`, never below one texel.
pub fn minify(size: u32, level: u32) -> u32 {
    size.checked_shr(level).unwrap_or(0).max(1)
}
