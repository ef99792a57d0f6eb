use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use shaderforge_common::{ShaderKind, ShaderLanguage};
use shaderforge_preprocessor::{ProcessorOptions, expand_includes, preprocess};
use shaderforge_store::FileIncludeLoader;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shaderforge-cli", about = "CLI front end for shader preprocessing")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate info
    Info,
    /// Preprocess a shader source file
    Process {
        /// Shader source file
        file: PathBuf,
        /// Macro definition, NAME or NAME=VALUE (repeatable)
        #[arg(short = 'D', long = "define")]
        defines: Vec<String>,
        /// Treat the source as a fragment shader
        #[arg(long)]
        fragment: bool,
        /// Target shading language (glsl, wgsl)
        #[arg(long, default_value = "glsl")]
        language: String,
        /// Value injected as __VERSION__
        #[arg(long, default_value = "300 es")]
        shader_version: String,
        /// Platform name defined in the symbol table
        #[arg(long, default_value = "DESKTOP")]
        platform: String,
        /// Disable uniform-buffer include variants
        #[arg(long)]
        no_uniform_buffers: bool,
        /// Shader repository root for include resolution
        #[arg(long, default_value = "shaders")]
        repository: String,
        /// Named index bound, NAME=N (repeatable)
        #[arg(long = "index-param")]
        index_params: Vec<String>,
        /// JSON config carrying defines and index parameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the processed source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print defines discovered in the source as JSON
        #[arg(long)]
        emit_defines: bool,
    },
    /// Expand includes only, printing the pre-directive source
    Expand {
        /// Shader source file
        file: PathBuf,
        /// Shader repository root for include resolution
        #[arg(long, default_value = "shaders")]
        repository: String,
    },
}

/// Optional JSON sidecar config for a processing run.
#[derive(Debug, Default, Deserialize)]
struct ProcessConfig {
    #[serde(default)]
    defines: Vec<String>,
    #[serde(default)]
    global_defines: Vec<String>,
    #[serde(default)]
    index_parameters: HashMap<String, i64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("shaderforge-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", shaderforge_common::crate_info());
            println!("store: {}", shaderforge_store::crate_info());
            println!("preprocessor: {}", shaderforge_preprocessor::crate_info());
        }
        Commands::Process {
            file,
            defines,
            fragment,
            language,
            shader_version,
            platform,
            no_uniform_buffers,
            repository,
            index_params,
            config,
            output,
            emit_defines,
        } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading shader source {}", file.display()))?;

            let config = match config {
                Some(path) => {
                    let data = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading config {}", path.display()))?;
                    serde_json::from_str::<ProcessConfig>(&data)
                        .with_context(|| format!("parsing config {}", path.display()))?
                }
                None => ProcessConfig::default(),
            };

            let kind = if fragment {
                ShaderKind::Fragment
            } else {
                ShaderKind::Vertex
            };
            let language: ShaderLanguage = language
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;

            let mut options = ProcessorOptions::new(kind, language);
            options.version = shader_version;
            options.platform_name = platform;
            options.supports_uniform_buffers = !no_uniform_buffers;
            options.shaders_repository = repository;
            options.global_defines = config.global_defines;
            options.index_parameters = config.index_parameters;
            options.loader = Some(Box::new(FileIncludeLoader::new()));

            for param in &index_params {
                let (name, bound) = parse_index_param(param)?;
                options.index_parameters.insert(name, bound);
            }

            let mut define_lines: Vec<String> = config.defines;
            define_lines.extend(defines.iter().map(|d| define_flag_to_line(d)));

            let processed = preprocess(&source, &define_lines, &mut options)
                .with_context(|| format!("preprocessing {}", file.display()))?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &processed.source)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("processed source written to {}", path.display());
                }
                None => print!("{}", processed.source),
            }

            if emit_defines {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&processed.additional_defines)?
                );
            }
        }
        Commands::Expand { file, repository } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading shader source {}", file.display()))?;

            let mut options = ProcessorOptions::new(ShaderKind::Vertex, ShaderLanguage::Glsl);
            options.shaders_repository = repository;
            options.loader = Some(Box::new(FileIncludeLoader::new()));

            let expanded = expand_includes(&source, &mut options)
                .with_context(|| format!("expanding includes in {}", file.display()))?;
            print!("{expanded}");
        }
    }

    Ok(())
}

/// Turn a `-D NAME[=VALUE]` flag into a `#define` line for the symbol
/// table.
fn define_flag_to_line(flag: &str) -> String {
    match flag.split_once('=') {
        Some((name, value)) => format!("#define {} {}", name.trim(), value.trim()),
        None => format!("#define {}", flag.trim()),
    }
}

/// Parse a `--index-param NAME=N` flag.
fn parse_index_param(param: &str) -> anyhow::Result<(String, i64)> {
    let (name, bound) = param
        .split_once('=')
        .with_context(|| format!("index param '{param}' is not NAME=N"))?;
    let bound = bound
        .trim()
        .parse::<i64>()
        .with_context(|| format!("index param '{param}' has a non-numeric bound"))?;
    Ok((name.trim().to_string(), bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_flag_with_value() {
        assert_eq!(define_flag_to_line("COUNT=3"), "#define COUNT 3");
    }

    #[test]
    fn define_flag_without_value() {
        assert_eq!(define_flag_to_line("FOO"), "#define FOO");
    }

    #[test]
    fn index_param_parses() {
        assert_eq!(
            parse_index_param("LIGHTS=4").unwrap(),
            ("LIGHTS".to_string(), 4)
        );
        assert!(parse_index_param("LIGHTS").is_err());
        assert!(parse_index_param("LIGHTS=four").is_err());
    }
}
