//! Shader management: WGSL module building and the fixed
//! attribute/uniform name contract.

use std::collections::HashMap;

use crate::error::{RenderError, RenderResult};

/// Builder for creating the ray-caster shader module.
pub struct ShaderBuilder {
    source: Option<String>,
    vertex_entry: String,
    fragment_entry: String,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Creates a new shader builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            label: None,
        }
    }

    /// Sets the WGSL source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the vertex shader entry point.
    pub fn with_vertex_entry(mut self, entry: impl Into<String>) -> Self {
        self.vertex_entry = entry.into();
        self
    }

    /// Sets the fragment shader entry point.
    pub fn with_fragment_entry(mut self, entry: impl Into<String>) -> Self {
        self.fragment_entry = entry.into();
        self
    }

    /// Sets the shader label for debugging.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    #[must_use]
    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }

    /// Builds the shader module.
    pub fn build_module(&self, device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing shader source".into()))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: self.label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(source.as_str().into()),
        });

        Ok(module)
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a registered uniform name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformSlot {
    /// A member of the frame uniform block, at a byte offset.
    Block { offset: u64 },
    /// A sampled texture at a fixed bind-group binding.
    Texture { binding: u32 },
}

/// Registered name→location table for the shader's fixed interface.
///
/// Registration happens once at engine initialization with the exact
/// attribute and uniform names the engine references. Lookups of an
/// unregistered name panic — the contract between engine and shader is
/// compiled in, so a miss is a programming error, not a runtime
/// condition.
#[derive(Debug, Default)]
pub struct ShaderInterface {
    attributes: HashMap<&'static str, u32>,
    uniforms: HashMap<&'static str, UniformSlot>,
}

impl ShaderInterface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vertex attribute at a vertex-buffer slot.
    pub fn add_attribute(&mut self, name: &'static str, location: u32) {
        self.attributes.insert(name, location);
    }

    /// Registers a uniform-block member at a byte offset.
    pub fn add_uniform(&mut self, name: &'static str, offset: u64) {
        self.uniforms.insert(name, UniformSlot::Block { offset });
    }

    /// Registers a sampled texture at a fixed binding index.
    pub fn add_texture(&mut self, name: &'static str, binding: u32) {
        self.uniforms.insert(name, UniformSlot::Texture { binding });
    }

    /// Resolves a registered attribute name.
    ///
    /// # Panics
    /// If the name was never registered.
    #[must_use]
    pub fn attribute_location(&self, name: &str) -> u32 {
        match self.attributes.get(name) {
            Some(&loc) => loc,
            None => panic!("attribute '{name}' was never registered"),
        }
    }

    /// Resolves a registered uniform name.
    ///
    /// # Panics
    /// If the name was never registered.
    #[must_use]
    pub fn uniform_slot(&self, name: &str) -> UniformSlot {
        match self.uniforms.get(name) {
            Some(&slot) => slot,
            None => panic!("uniform '{name}' was never registered"),
        }
    }

    /// Byte offset of a uniform-block member.
    ///
    /// # Panics
    /// If the name resolves to a texture or was never registered.
    #[must_use]
    pub fn uniform_offset(&self, name: &str) -> u64 {
        match self.uniform_slot(name) {
            UniformSlot::Block { offset } => offset,
            UniformSlot::Texture { .. } => {
                panic!("uniform '{name}' is a texture, not a block member")
            }
        }
    }

    /// Binding index of a registered texture uniform.
    ///
    /// # Panics
    /// If the name resolves to a block member or was never registered.
    #[must_use]
    pub fn texture_binding(&self, name: &str) -> u32 {
        match self.uniform_slot(name) {
            UniformSlot::Texture { binding } => binding,
            UniformSlot::Block { .. } => {
                panic!("uniform '{name}' is a block member, not a texture")
            }
        }
    }

    /// Checks that every registered name appears in the WGSL source.
    pub fn validate_against(&self, source: &str) -> RenderResult<()> {
        let missing: Vec<&str> = self
            .attributes
            .keys()
            .chain(self.uniforms.keys())
            .filter(|name| !source.contains(*name))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RenderError::ShaderCompilationFailed(format!(
                "registered names missing from shader source: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> ShaderInterface {
        let mut iface = ShaderInterface::new();
        iface.add_attribute("in_vertex_pos", 0);
        iface.add_uniform("camera_pos", 128);
        iface.add_texture("volume", 0);
        iface
    }

    #[test]
    fn registered_names_resolve() {
        let iface = populated();
        assert_eq!(iface.attribute_location("in_vertex_pos"), 0);
        assert_eq!(iface.uniform_offset("camera_pos"), 128);
        assert_eq!(iface.texture_binding("volume"), 0);
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn unregistered_uniform_panics() {
        populated().uniform_slot("no_such_uniform");
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn unregistered_attribute_panics() {
        populated().attribute_location("in_normal");
    }

    #[test]
    fn validation_flags_missing_names() {
        let iface = populated();
        let good = "@location(0) in_vertex_pos camera_pos volume";
        assert!(iface.validate_against(good).is_ok());

        let err = iface.validate_against("var volume: u32;").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("in_vertex_pos"));
        assert!(msg.contains("camera_pos"));
        assert!(!msg.contains("volume,"));
    }
}
