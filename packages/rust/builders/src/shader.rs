//! Shader builder: assembles a sectioned `.shader` file into stage sources.
//!
//! A shader file holds `#` directives followed by bracketed sections, each
//! with a brace-delimited body:
//!
//! ```text
//! #version 450
//! [vert_input] { vec3 inPosition; vec2 inUV; }
//! [vert_to_frag] { vec2 fragUV; }
//! [frag_output] { vec4 outColor; }
//! [defines] { JOY_VARIABLES; }
//! [vertex_shader] { void main() { ... } }
//! [fragment_shader] { void main() { ... } }
//! ```
//!
//! The artifact is `vertex_len: u32, fragment_len: u32` followed by both
//! assembled GLSL sources. Compiling them is left to the runtime.

use std::collections::BTreeMap;

use joybuild_shared::{AssetKind, BuildConfig, BuildRequest};
use tracing::debug;

use crate::registry::{AssetBuilder, BuildFailure, BuildOutcome};
use crate::{push_u32, section_len};

/// A named snippet injected into the stages that ask for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDefine {
    pub vertex: bool,
    pub fragment: bool,
    pub source: String,
}

/// Sections of a parsed `.shader` file.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ShaderSections {
    pub directives: Vec<String>,
    pub vert_inputs: Vec<String>,
    pub vert_to_frag: Vec<String>,
    pub frag_outputs: Vec<String>,
    pub defines: Vec<String>,
    pub vertex: Option<String>,
    pub fragment: Option<String>,
}

impl ShaderSections {
    pub fn parse(text: &str) -> Result<Self, BuildFailure> {
        let mut sections = Self::default();
        let mut pos = 0;

        while let Some(offset) = text[pos..].find(['#', '[']) {
            let start = pos + offset;
            if text[start..].starts_with('#') {
                let end = text[start + 1..]
                    .find(['#', '['])
                    .map_or(text.len(), |e| start + 1 + e);
                sections.directives.push(text[start..end].trim().to_string());
                pos = end;
                continue;
            }

            let line = line_of(text, start);
            let close = text[start..]
                .find(']')
                .map(|c| start + c)
                .ok_or_else(|| BuildFailure::malformed(line, "unterminated section header"))?;
            let header = text[start + 1..close].trim();
            let open = text[close..]
                .find('{')
                .map(|o| close + o)
                .ok_or_else(|| BuildFailure::malformed(line, format!("section [{header}] has no body")))?;
            let end = matching_brace(text, open)
                .ok_or_else(|| BuildFailure::malformed(line, format!("unbalanced braces in [{header}]")))?;
            let body = text[open + 1..end].trim();

            match header {
                "vert_input" => sections.vert_inputs.extend(split_declarations(body)),
                "vert_to_frag" => sections.vert_to_frag.extend(split_declarations(body)),
                "frag_output" => sections.frag_outputs.extend(split_declarations(body)),
                "defines" => sections.defines.extend(split_declarations(body)),
                "vertex_shader" => sections.vertex = Some(body.to_string()),
                "fragment_shader" => sections.fragment = Some(body.to_string()),
                other => debug!(section = other, "ignoring unknown shader section"),
            }
            pos = end + 1;
        }

        Ok(sections)
    }
}

fn line_of(text: &str, byte: usize) -> usize {
    text[..byte].matches('\n').count() + 1
}

/// Index of the `}` closing the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_declarations(body: &str) -> impl Iterator<Item = String> + '_ {
    body.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Native shader assembler.
#[derive(Debug, Default)]
pub struct ShaderBuilder {
    defines: BTreeMap<String, ShaderDefine>,
}

impl ShaderBuilder {
    pub fn new(defines: BTreeMap<String, ShaderDefine>) -> Self {
        Self { defines }
    }

    /// Build the define table from `[build.shader_defines]`.
    pub fn from_config(config: &BuildConfig) -> Self {
        let defines = config
            .shader_defines
            .iter()
            .map(|(name, define)| {
                let has = |stage: &str| define.stages.iter().any(|s| s == stage);
                let define = ShaderDefine {
                    vertex: has("vertex"),
                    fragment: has("fragment"),
                    source: define.source.clone(),
                };
                (name.clone(), define)
            })
            .collect();
        Self::new(defines)
    }

    /// Assemble `(vertex, fragment)` sources.
    pub(crate) fn assemble(&self, sections: &ShaderSections) -> Result<(String, String), BuildFailure> {
        let defines = sections
            .defines
            .iter()
            .map(|name| {
                self.defines
                    .get(name)
                    .ok_or_else(|| BuildFailure::MissingReference {
                        reference: name.clone(),
                        location: "configured shader defines".into(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let vertex_body = sections
            .vertex
            .as_deref()
            .ok_or_else(|| BuildFailure::Decode("missing [vertex_shader] section".into()))?;
        let fragment_body = sections
            .fragment
            .as_deref()
            .ok_or_else(|| BuildFailure::Decode("missing [fragment_shader] section".into()))?;

        let vertex = assemble_stage(
            &sections.directives,
            (&sections.vert_inputs, &sections.vert_to_frag),
            defines.iter().copied().filter(|d| d.vertex),
            vertex_body,
        );
        let fragment = assemble_stage(
            &sections.directives,
            (&sections.vert_to_frag, &sections.frag_outputs),
            defines.iter().copied().filter(|d| d.fragment),
            fragment_body,
        );
        Ok((vertex, fragment))
    }
}

fn assemble_stage<'a>(
    directives: &[String],
    (inputs, outputs): (&[String], &[String]),
    defines: impl Iterator<Item = &'a ShaderDefine>,
    body: &str,
) -> String {
    let mut out = String::new();
    for directive in directives {
        push_line(&mut out, directive);
    }
    for (location, decl) in inputs.iter().enumerate() {
        push_line(&mut out, &format!("layout(location = {location}) in {decl};"));
    }
    out.push('\n');
    for (location, decl) in outputs.iter().enumerate() {
        push_line(&mut out, &format!("layout(location = {location}) out {decl};"));
    }
    out.push('\n');
    for define in defines {
        push_line(&mut out, &define.source);
    }
    out.push('\n');
    for line in body.lines() {
        push_line(&mut out, line);
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

impl AssetBuilder for ShaderBuilder {
    fn name(&self) -> &str {
        "shader"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Shader
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome {
        let text = std::fs::read_to_string(request.source)
            .map_err(|e| BuildFailure::io(request.source, e))?;
        let sections = ShaderSections::parse(&text)?;
        let (vertex, fragment) = self.assemble(&sections)?;

        let mut out = Vec::with_capacity(8 + vertex.len() + fragment.len());
        push_u32(&mut out, section_len(vertex.len(), "vertex source")?);
        push_u32(&mut out, section_len(fragment.len(), "fragment source")?);
        out.extend_from_slice(vertex.as_bytes());
        out.extend_from_slice(fragment.as_bytes());

        let output = request.artifact_path();
        std::fs::write(&output, out).map_err(|e| BuildFailure::io(&output, e))?;
        debug!(path = %request.source.display(), defines = sections.defines.len(), "shader assembled");
        Ok(())
    }
}
