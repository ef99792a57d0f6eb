use crate::PreprocessError;
use crate::options::ProcessorOptions;
use regex::Regex;
use shaderforge_store::include_url;
use std::sync::LazyLock;

/// Bounds the fixed-point expansion rounds; a cycle of includes would
/// otherwise re-expand forever.
pub(crate) const MAX_INCLUDE_ROUNDS: usize = 64;

static INCLUDE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#include\s?<([^>]+)>(?:\(([^)]*)\))?(?:\[([^\]]*)\])?").unwrap());

/// `light{X}.vLightFoo` member accesses are rewritten to `vLightFoo{X}`
/// when uniform buffers are unavailable, preserving the flat uniform
/// naming scheme.
static LIGHT_MEMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"light\{X\}\.(vLight\w*)").unwrap());

/// One `#include<NAME>(PARAMS)[INDEX]` occurrence found in the source.
#[derive(Debug, Clone, PartialEq)]
struct IncludeMatch {
    raw: String,
    name: String,
    params: Option<String>,
    index_string: Option<String>,
}

/// Substitute every `#include<name>` token with its looked-up body,
/// repeating until no include tokens remain.
///
/// An include missing from the store is fetched through the loader seam
/// and the whole expansion retried on the unchanged source; with no loader
/// configured the missing name is a fatal error. Rounds are bounded by an
/// iteration cap so circular includes fail instead of looping.
pub fn expand_includes(
    source: &str,
    options: &mut ProcessorOptions,
) -> Result<String, PreprocessError> {
    let mut current = source.to_string();
    for _ in 0..MAX_INCLUDE_ROUNDS {
        if !INCLUDE_TOKEN.is_match(&current) {
            return Ok(current);
        }
        current = expand_round(&current, options)?;
    }
    Err(PreprocessError::MaxIncludeDepth {
        limit: MAX_INCLUDE_ROUNDS,
    })
}

/// One substitution round over the source. Retries from the top after
/// every loader fetch so a freshly stored body is seen by all tokens.
fn expand_round(source: &str, options: &mut ProcessorOptions) -> Result<String, PreprocessError> {
    loop {
        let matches = collect_matches(source);

        let missing = matches
            .iter()
            .map(|m| resolve_include_name(&m.name, options))
            .find(|name| !options.include_store.contains(name));
        if let Some(name) = missing {
            fetch_include(&name, options)?;
            continue;
        }

        let mut result = source.to_string();
        for m in &matches {
            let name = resolve_include_name(&m.name, options);
            let body = options
                .include_store
                .get(&name)
                .map(str::to_string)
                .unwrap_or_default();
            let content = build_include_content(&body, m, options);
            // Every occurrence of the exact token expands identically.
            result = result.replace(&m.raw, &content);
        }
        return Ok(result);
    }
}

fn collect_matches(source: &str) -> Vec<IncludeMatch> {
    INCLUDE_TOKEN
        .captures_iter(source)
        .map(|caps| IncludeMatch {
            raw: caps[0].to_string(),
            name: caps[1].to_string(),
            params: caps.get(2).map(|m| m.as_str().to_string()),
            index_string: caps.get(3).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Resolve the `__decl__` naming convention to a declaration-only include
/// variant. With uniform-buffer support the stage-specific name is
/// redirected to the shared Ubo variant.
fn resolve_include_name(name: &str, options: &ProcessorOptions) -> String {
    if !name.contains("__decl__") {
        return name.to_string();
    }
    let mut resolved = name.replacen("__decl__", "", 1);
    if options.supports_uniform_buffers {
        resolved = resolved.replacen("Vertex", "Ubo", 1);
        resolved = resolved.replacen("Fragment", "Ubo", 1);
    }
    resolved.push_str("Declaration");
    resolved
}

fn fetch_include(name: &str, options: &mut ProcessorOptions) -> Result<(), PreprocessError> {
    let kind = options.shader_kind;
    let url = include_url(&options.shaders_repository, name);
    let Some(loader) = options.loader.as_mut() else {
        return Err(PreprocessError::MissingInclude {
            name: name.to_string(),
        });
    };
    tracing::debug!(name, url = url.as_str(), "fetching missing include");
    let body = loader
        .load(&url)
        .map_err(|source| PreprocessError::IncludeLoad {
            name: name.to_string(),
            kind,
            source,
        })?;
    options.include_store.insert(name, body);
    Ok(())
}

/// Apply the optional parameter-pair replacements and index expansion to
/// an include body.
fn build_include_content(body: &str, m: &IncludeMatch, options: &ProcessorOptions) -> String {
    let mut content = body.to_string();

    if let Some(params) = &m.params {
        for (pattern, dest) in replacement_pairs(params) {
            content = content.replace(pattern, dest);
        }
    }

    if let Some(index_string) = &m.index_string {
        let index_string = index_string.trim();
        if let Some((min_str, max_str)) = index_string.split_once("..") {
            let min = min_str.trim().parse::<i64>().unwrap_or(0);
            let max = match max_str.trim().parse::<i64>() {
                Ok(value) => value,
                // Non-numeric bound: a named lookup; an unknown name
                // yields an empty range.
                Err(_) => options
                    .index_parameters
                    .get(max_str.trim())
                    .copied()
                    .unwrap_or(min),
            };
            let mut template = content.clone();
            if !options.supports_uniform_buffers {
                template = LIGHT_MEMBER.replace_all(&template, "${1}{X}").to_string();
            }
            content.clear();
            for index in min..max {
                content.push_str(&template.replace("{X}", &index.to_string()));
                content.push('\n');
            }
        } else {
            if !options.supports_uniform_buffers {
                content = content.replace("light{X}", &format!("light{index_string}"));
            }
            content = content.replace("{X}", index_string);
        }
    }

    content
}

/// Split an include parameter list into alternating `(pattern, dest)`
/// pairs. A dangling pattern without a destination is dropped.
fn replacement_pairs(params: &str) -> Vec<(&str, &str)> {
    let parts: Vec<&str> = params.split(',').map(str::trim).collect();
    parts
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}
