use crate::defines::SymbolTable;
use shaderforge_common::{ShaderKind, ShaderLanguage};
use shaderforge_store::{IncludeLoader, IncludeStore};
use std::collections::HashMap;

/// Caller-supplied hook applied to the whole source around directive
/// evaluation.
pub type SourceHook = Box<dyn Fn(&str, &SymbolTable, ShaderKind) -> String>;

/// Per-pass configuration for the preprocessor.
///
/// The include store is mutable on purpose: the expander populates it on
/// demand through the loader seam.
pub struct ProcessorOptions {
    pub shader_kind: ShaderKind,
    pub shader_language: ShaderLanguage,
    /// Injected into the symbol table as `__VERSION__`.
    pub version: String,
    /// Injected into the symbol table as a defined name.
    pub platform_name: String,
    /// Selects the uniform-buffer include variants and suppresses the
    /// per-index light rewrite.
    pub supports_uniform_buffers: bool,
    /// Repository root used to derive include URLs for the loader.
    pub shaders_repository: String,
    /// Named upper bounds for `[min..NAME]` include index ranges.
    pub index_parameters: HashMap<String, i64>,
    /// Engine-global `"#define NAME VALUE"` lines added to every pass.
    pub global_defines: Vec<String>,
    pub include_store: IncludeStore,
    pub loader: Option<Box<dyn IncludeLoader>>,
    pub pre_processor: Option<SourceHook>,
    pub post_processor: Option<SourceHook>,
}

impl ProcessorOptions {
    pub fn new(shader_kind: ShaderKind, shader_language: ShaderLanguage) -> Self {
        Self {
            shader_kind,
            shader_language,
            version: "300 es".to_string(),
            platform_name: "DESKTOP".to_string(),
            supports_uniform_buffers: true,
            shaders_repository: "shaders".to_string(),
            index_parameters: HashMap::new(),
            global_defines: Vec::new(),
            include_store: IncludeStore::new(),
            loader: None,
            pre_processor: None,
            post_processor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let options = ProcessorOptions::new(ShaderKind::Vertex, ShaderLanguage::Glsl);
        assert!(options.supports_uniform_buffers);
        assert!(options.include_store.is_empty());
        assert!(options.loader.is_none());
        assert_eq!(options.platform_name, "DESKTOP");
    }
}
