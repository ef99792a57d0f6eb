//! Shared types for the shaderforge preprocessing pipeline.

mod types;

pub use types::{ShaderKind, ShaderLanguage};

pub fn crate_info() -> &'static str {
    "shaderforge-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
