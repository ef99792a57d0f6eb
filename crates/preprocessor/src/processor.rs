use crate::PreprocessError;
use crate::cursor::LineCursor;
use crate::defines::SymbolTable;
use crate::include;
use crate::node;
use crate::options::ProcessorOptions;
use shaderforge_common::ShaderLanguage;
use std::collections::BTreeMap;

/// Result of one preprocessing pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessedShader {
    /// Directive-resolved source, ready for the next compilation stage.
    pub source: String,
    /// Source after include expansion but before directive evaluation,
    /// exposed for diagnostics and caching keys.
    pub pre_include_source: String,
    /// Defines discovered embedded in the source along the executed path.
    pub additional_defines: BTreeMap<String, Option<String>>,
}

/// Run one full preprocessing pass over a shader source.
///
/// Pipeline: expand includes, build the symbol table from `defines` plus
/// built-ins, apply the pre hook, build and evaluate the directive tree,
/// apply the post hook. Every structure is created fresh for the pass.
pub fn preprocess(
    source: &str,
    defines: &[String],
    options: &mut ProcessorOptions,
) -> Result<ProcessedShader, PreprocessError> {
    let _span = tracing::info_span!("preprocess", kind = %options.shader_kind).entered();

    let pre_include_source = include::expand_includes(source, options)?;

    let mut symbols = SymbolTable::from_defines(defines);
    inject_builtins(&mut symbols, options);

    let prepared = match &options.pre_processor {
        Some(hook) => hook(&pre_include_source, &symbols, options.shader_kind),
        None => pre_include_source.clone(),
    };

    let mut cursor = LineCursor::new(&prepared);
    let tree = node::build_tree(&mut cursor)?;

    let (recomposed, additional_defines) = node::recompose(&tree, &mut symbols);

    let processed = match &options.post_processor {
        Some(hook) => hook(&recomposed, &symbols, options.shader_kind),
        None => recomposed,
    };

    tracing::debug!(
        out_lines = processed.lines().count(),
        discovered = additional_defines.len(),
        "preprocessing pass complete"
    );

    Ok(ProcessedShader {
        source: processed,
        pre_include_source,
        additional_defines,
    })
}

/// Symbols every pass starts with, on top of the caller's defines.
fn inject_builtins(symbols: &mut SymbolTable, options: &ProcessorOptions) {
    symbols.define("__VERSION__", Some(options.version.clone()));
    symbols.define(options.platform_name.clone(), Some("true".to_string()));
    for line in &options.global_defines {
        symbols.add_define_line(line);
    }
    if options.shader_language == ShaderLanguage::Glsl {
        symbols.define("GL_ES", Some("true".to_string()));
    }
}
