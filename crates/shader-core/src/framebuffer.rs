//! Framebuffer attachment layouts.
//!
//! A [`FramebufferLayout`] is an ordered list of attachments validated as it is built: at most one
//! depth and one stencil role (a depth-stencil attachment takes both), and one common size.
//! Attachment points are derived from the order: color attachments are numbered among
//! themselves, skipping depth and stencil entries.

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};

/// Pixel format of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentFormat {
    /// 8-bit RGBA.
    Rgba8,
    /// 16-bit float RGBA.
    Rgba16F,
    /// 32-bit float RGBA.
    Rgba32F,
    /// 16-bit float RG.
    Rg16F,
    /// 32-bit float R.
    R32F,
    /// 16-bit depth.
    Depth16,
    /// 24-bit depth.
    Depth24,
    /// 32-bit float depth.
    Depth32F,
    /// 8-bit stencil.
    Stencil8,
    /// Packed 24-bit depth, 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth, 8-bit stencil.
    Depth32FStencil8,
}

/// What an attachment is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    /// Color output.
    Color,
    /// Depth buffer.
    Depth,
    /// Stencil buffer.
    Stencil,
    /// Combined depth and stencil buffer.
    DepthStencil,
}

impl AttachmentFormat {
    /// The role a format implies.
    pub fn role(self) -> AttachmentRole {
        match self {
            Self::Rgba8 | Self::Rgba16F | Self::Rgba32F | Self::Rg16F | Self::R32F => {
                AttachmentRole::Color
            }
            Self::Depth16 | Self::Depth24 | Self::Depth32F => AttachmentRole::Depth,
            Self::Stencil8 => AttachmentRole::Stencil,
            Self::Depth24Stencil8 | Self::Depth32FStencil8 => AttachmentRole::DepthStencil,
        }
    }
}

/// Backing object of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStorage {
    /// Sampleable 2D texture.
    #[default]
    Texture,
    /// Render-only buffer.
    Renderbuffer,
}

/// One attachment of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    /// Pixel format.
    pub format: AttachmentFormat,
    /// Backing object.
    #[serde(default)]
    pub storage: AttachmentStorage,
    /// Width in pixels; `0` adopts the framebuffer's size.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels; `0` adopts the framebuffer's size.
    #[serde(default)]
    pub height: u32,
}

impl AttachmentDescriptor {
    /// A texture attachment of the given format and size.
    pub fn texture(format: AttachmentFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            storage: AttachmentStorage::Texture,
            width,
            height,
        }
    }

    /// A renderbuffer attachment of the given format and size.
    pub fn renderbuffer(format: AttachmentFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            storage: AttachmentStorage::Renderbuffer,
            width,
            height,
        }
    }

    fn size(&self) -> Option<(u32, u32)> {
        (self.width != 0 && self.height != 0).then_some((self.width, self.height))
    }
}

/// Where an attachment is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    /// `COLOR_ATTACHMENTn`.
    Color(u32),
    /// `DEPTH_ATTACHMENT`.
    Depth,
    /// `STENCIL_ATTACHMENT`.
    Stencil,
    /// `DEPTH_STENCIL_ATTACHMENT`.
    DepthStencil,
}

/// A validated, ordered set of framebuffer attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramebufferLayout {
    attachments: Vec<AttachmentDescriptor>,
    size: Option<(u32, u32)>,
}

impl FramebufferLayout {
    /// An empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push).
    pub fn attach(mut self, attachment: AttachmentDescriptor) -> Result<Self, LayoutError> {
        self.push(attachment)?;
        Ok(self)
    }

    /// Append an attachment and return its attachment point.
    pub fn push(&mut self, attachment: AttachmentDescriptor) -> Result<AttachmentPoint, LayoutError> {
        let has = |role: AttachmentRole| self.attachments.iter().any(|a| a.format.role() == role);
        match attachment.format.role() {
            AttachmentRole::Color => {}
            AttachmentRole::Depth => {
                if has(AttachmentRole::Depth) || has(AttachmentRole::DepthStencil) {
                    return Err(LayoutError::DuplicateDepth);
                }
            }
            AttachmentRole::Stencil => {
                if has(AttachmentRole::Stencil) || has(AttachmentRole::DepthStencil) {
                    return Err(LayoutError::DuplicateStencil);
                }
            }
            AttachmentRole::DepthStencil => {
                if has(AttachmentRole::Depth)
                    || has(AttachmentRole::Stencil)
                    || has(AttachmentRole::DepthStencil)
                {
                    return Err(LayoutError::DuplicateDepthStencil);
                }
            }
        }

        if let (Some(expected), Some(found)) = (self.size, attachment.size())
            && expected != found
        {
            return Err(LayoutError::SizeMismatch { expected, found });
        }
        self.size = self.size.or(attachment.size());

        self.attachments.push(attachment);
        let index = self.attachments.len() - 1;
        Ok(self.point_of(index))
    }

    /// Attachments in order.
    pub fn attachments(&self) -> &[AttachmentDescriptor] {
        &self.attachments
    }

    /// Number of attachments.
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    /// Returns `true` if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Common size of the sized attachments, if any has a size.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Size used for allocation: the common size, or `context`'s default target size.
    pub fn resolved_size(&self, context: &RenderContext) -> (u32, u32) {
        self.size.unwrap_or_else(|| context.size())
    }

    /// Number of color attachments.
    pub fn color_count(&self) -> usize {
        self.attachments
            .iter()
            .filter(|a| a.format.role() == AttachmentRole::Color)
            .count()
    }

    /// Attachment point of the attachment at `index`.
    pub fn attachment_point(&self, index: usize) -> Option<AttachmentPoint> {
        (index < self.attachments.len()).then(|| self.point_of(index))
    }

    fn point_of(&self, index: usize) -> AttachmentPoint {
        match self.attachments[index].format.role() {
            AttachmentRole::Color => {
                let preceding = self.attachments[..index]
                    .iter()
                    .filter(|a| a.format.role() == AttachmentRole::Color)
                    .count();
                AttachmentPoint::Color(preceding as u32)
            }
            AttachmentRole::Depth => AttachmentPoint::Depth,
            AttachmentRole::Stencil => AttachmentPoint::Stencil,
            AttachmentRole::DepthStencil => AttachmentPoint::DepthStencil,
        }
    }
}

/// The default render target a host draws into (the window's backbuffer).
///
/// Created by the host and passed to whatever needs the default target size. The host calls
/// [`resize`](Self::resize) when its surface changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    width: u32,
    height: u32,
}

impl RenderContext {
    /// A context whose default target is `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Default target size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Width over height, or `1.0` for a degenerate target.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Record a new default target size. Returns `true` if it changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let changed = (width, height) != (self.width, self.height);
        self.width = width;
        self.height = height;
        changed
    }
}
