
use std::path::Path;

use anyhow::Context as _;

use crate::cache::{Resource, TypeTag};


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}


/// Shader text with every `#include "file"` expanded in place.
#[derive(Clone, Debug)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub source: String,
}

impl Resource for ShaderSource {
    const TAG: TypeTag = TypeTag::new("Shader");
}


fn include_target(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix("#include")?
        .trim()
        .strip_prefix('"')?
        .strip_suffix('"')
}


fn expand_includes(path: &Path, include_depth: usize, max_include_depth: usize, out: &mut String)
    -> anyhow::Result<()>
{
    if include_depth > max_include_depth {
        anyhow::bail!("#include of: {} exceeded max include depth ({})", path.display(), max_include_depth);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    for line in content.lines() {
        match include_target(line) {
            Some(name) => {
                if !super::is_confined(Path::new(name)) {
                    anyhow::bail!("#include of: {} in: {} leaves the shader directory", name, path.display());
                }
                expand_includes(&dir.join(name), include_depth + 1, max_include_depth, out)?
            },
            None => {
                out.push_str(line);
                out.push('\n');
            },
        }
    }

    Ok(())
}


pub fn load_shader_file(path: &Path, max_include_depth: usize) -> anyhow::Result<ShaderSource> {
    let stage = match path.extension() {
        Some(os_str) if os_str == "frag" => ShaderStage::Fragment,
        Some(os_str) if os_str == "vert" => ShaderStage::Vertex,
        Some(os_str) if os_str == "comp" => ShaderStage::Compute,
        _ => anyhow::bail!("Unknown or missing shader extension: {}", path.display()),
    };

    let mut source = String::new();
    expand_includes(path, 0, max_include_depth, &mut source)?;

    Ok(ShaderSource { stage, source })
}



#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_lines_are_recognized() {
        assert_eq!(include_target("#include \"common.glsl\""), Some("common.glsl"));
        assert_eq!(include_target("   #include   \"a/b.glsl\"  "), Some("a/b.glsl"));
        assert_eq!(include_target("#include <system.glsl>"), None);
        assert_eq!(include_target("// #include \"x\""), None);
    }
}
