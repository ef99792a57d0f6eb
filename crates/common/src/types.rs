use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target shading language of a preprocessing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderLanguage {
    Glsl,
    Wgsl,
}

impl fmt::Display for ShaderLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderLanguage::Glsl => write!(f, "glsl"),
            ShaderLanguage::Wgsl => write!(f, "wgsl"),
        }
    }
}

impl FromStr for ShaderLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glsl" => Ok(ShaderLanguage::Glsl),
            "wgsl" => Ok(ShaderLanguage::Wgsl),
            other => Err(format!("unknown shader language: {other}")),
        }
    }
}

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub fn is_fragment(self) -> bool {
        matches!(self, ShaderKind::Fragment)
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => write!(f, "vertex"),
            ShaderKind::Fragment => write!(f, "fragment"),
        }
    }
}
