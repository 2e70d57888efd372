use wgpu::TextureFormat;

use crate::context::Context;
use crate::error::{Error, Result};

use super::target::{validate_size, RenderTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attachment {
    name: String,
    target: RenderTarget,
    format: TextureFormat,
}

/// Named render targets sharing one size, written together by a single draw.
///
/// Attachment order, and therefore `@location(n)` of each fragment output,
/// is construction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiTargetSet {
    attachments: Vec<Attachment>,
}

impl MultiTargetSet {
    pub const MAX_ATTACHMENTS: usize = 8;

    pub(crate) fn validate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        for name in names {
            if seen.contains(&name) {
                return Err(Error::target("multi-target set", format!("duplicate name `{name}`")));
            }
            seen.push(name);
        }
        if seen.is_empty() || seen.len() > Self::MAX_ATTACHMENTS {
            return Err(Error::target(
                "multi-target set",
                format!("needs 1..={} targets, got {}", Self::MAX_ATTACHMENTS, seen.len()),
            ));
        }
        Ok(())
    }

    pub(crate) fn new(entries: Vec<(String, RenderTarget, TextureFormat)>) -> Self {
        Self {
            attachments: entries
                .into_iter()
                .map(|(name, target, format)| Attachment { name, target, format })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<RenderTarget> {
        self.attachments.iter().find(|a| a.name == name).map(|a| a.target)
    }

    pub fn first_target(&self) -> RenderTarget {
        self.attachments[0].target
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attachments.iter().map(|a| a.name.as_str())
    }

    pub fn formats(&self) -> Vec<TextureFormat> {
        self.attachments.iter().map(|a| a.format).collect()
    }

    pub fn attachments(&self) -> Vec<RenderTarget> {
        self.attachments.iter().map(|a| a.target).collect()
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn size(&self, ctx: &Context) -> Result<(u32, u32)> {
        self.first_target().size(ctx)
    }

    /// Resizes every attachment, or none when the new size is rejected.
    pub fn resize(&self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        for a in &self.attachments {
            ctx.registry.target(a.target)?;
        }
        validate_size(ctx.gpu.device(), width, height)?;
        for a in &self.attachments {
            a.target.resize(ctx, width, height)?;
        }
        Ok(())
    }

    /// Disposes every attachment. Idempotent.
    pub fn dispose(&self, ctx: &mut Context) {
        for a in &self.attachments {
            a.target.dispose(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_must_be_unique_and_bounded() {
        assert!(MultiTargetSet::validate_names(["color", "normal"]).is_ok());
        assert!(matches!(
            MultiTargetSet::validate_names(["a", "a"]),
            Err(Error::TargetCreation { .. })
        ));
        assert!(MultiTargetSet::validate_names(std::iter::empty()).is_err());
        let many: Vec<String> = (0..9).map(|i| format!("t{i}")).collect();
        assert!(MultiTargetSet::validate_names(many.iter().map(String::as_str)).is_err());
    }
}
