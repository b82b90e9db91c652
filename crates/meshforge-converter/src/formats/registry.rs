//! Static format table.
//!
//! Adding a format means adding a row to `define_formats!`; nothing else in
//! the registry is logic. Lookups are case-insensitive and accept aliases
//! (`stp` → `step`). Unknown formats answer `false`/`None`, never an error.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

/// Which side of a conversion a format appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Accepted as an upload.
    Input,
    /// Producible as an artifact.
    Output,
}

/// One row of the format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatSpec {
    /// Canonical identifier.
    pub id: &'static str,
    /// Human-readable name.
    pub description: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    /// MIME type.
    pub mime_type: &'static str,
    /// Accepted as input.
    pub input: bool,
    /// Producible as output.
    pub output: bool,
    /// Input must be tessellated by the geometry kernel (BREP formats).
    pub requires_kernel: bool,
}

impl FormatSpec {
    /// Whether the format is usable in the given direction.
    pub fn supports(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input,
            Direction::Output => self.output,
        }
    }
}

macro_rules! define_formats {
    ($(
        $id:literal $(| $alias:literal)* => {
            description: $desc:literal,
            extension: $ext:literal,
            mime: $mime:literal,
            input: $input:literal,
            output: $output:literal,
            kernel: $kernel:literal $(,)?
        }
    ),* $(,)?) => {
        static FORMATS: &[FormatSpec] = &[$(
            FormatSpec {
                id: $id,
                description: $desc,
                extension: $ext,
                mime_type: $mime,
                input: $input,
                output: $output,
                requires_kernel: $kernel,
            },
        )*];

        static LOOKUP: LazyLock<HashMap<&'static str, &'static FormatSpec>> = LazyLock::new(|| {
            let mut map = HashMap::new();
            let mut specs = FORMATS.iter();
            $(
                if let Some(spec) = specs.next() {
                    map.insert($id, spec);
                    $(map.insert($alias, spec);)*
                }
            )*
            map
        });
    };
}

define_formats! {
    "step" | "stp" => {
        description: "STEP (ISO 10303) boundary representation",
        extension: "step",
        mime: "model/step",
        input: true,
        output: false,
        kernel: true,
    },
    "iges" | "igs" => {
        description: "IGES boundary representation",
        extension: "iges",
        mime: "model/iges",
        input: true,
        output: false,
        kernel: true,
    },
    "brep" => {
        description: "Native BREP geometry",
        extension: "brep",
        mime: "application/octet-stream",
        input: true,
        output: false,
        kernel: true,
    },
    "stl" => {
        description: "Stereolithography (binary)",
        extension: "stl",
        mime: "model/stl",
        input: true,
        output: true,
        kernel: false,
    },
    "stl_ascii" => {
        description: "Stereolithography (ASCII)",
        extension: "stl",
        mime: "model/stl",
        input: false,
        output: true,
        kernel: false,
    },
    "obj" => {
        description: "Wavefront OBJ",
        extension: "obj",
        mime: "model/obj",
        input: true,
        output: true,
        kernel: false,
    },
    "gltf" => {
        description: "glTF 2.0 with embedded buffer",
        extension: "gltf",
        mime: "model/gltf+json",
        input: false,
        output: true,
        kernel: false,
    },
    "glb" => {
        description: "glTF 2.0 binary container",
        extension: "glb",
        mime: "model/gltf-binary",
        input: false,
        output: true,
        kernel: false,
    },
}

/// Lookup facade over the static format table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRegistry;

impl FormatRegistry {
    /// Find a format by id or alias (case-insensitive, leading dot allowed).
    pub fn lookup(format: &str) -> Option<&'static FormatSpec> {
        let key = format.trim().trim_start_matches('.').to_ascii_lowercase();
        LOOKUP.get(key.as_str()).copied()
    }

    /// Canonical id for a format, if recognized.
    pub fn canonical(format: &str) -> Option<&'static str> {
        Self::lookup(format).map(|spec| spec.id)
    }

    /// Whether `format` is recognized in `direction`.
    pub fn supports(format: &str, direction: Direction) -> bool {
        Self::lookup(format).is_some_and(|spec| spec.supports(direction))
    }

    /// Whether an input format must go through the geometry kernel.
    pub fn requires_kernel(input_format: &str) -> bool {
        Self::lookup(input_format).is_some_and(|spec| spec.input && spec.requires_kernel)
    }

    /// MIME type for a format, or `""` when unknown.
    pub fn mime_type(format: &str) -> &'static str {
        Self::lookup(format).map(|spec| spec.mime_type).unwrap_or("")
    }

    /// Every format usable in `direction`, in table order.
    pub fn list(direction: Direction) -> Vec<&'static FormatSpec> {
        FORMATS
            .iter()
            .filter(|spec| spec.supports(direction))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_and_case() {
        assert_eq!(FormatRegistry::canonical("STP"), Some("step"));
        assert_eq!(FormatRegistry::canonical(".igs"), Some("iges"));
        assert_eq!(FormatRegistry::canonical(" Obj "), Some("obj"));
        assert_eq!(FormatRegistry::canonical("dwg"), None);
    }

    #[test]
    fn test_direction_support() {
        assert!(FormatRegistry::supports("step", Direction::Input));
        assert!(!FormatRegistry::supports("step", Direction::Output));
        assert!(FormatRegistry::supports("stl", Direction::Input));
        assert!(FormatRegistry::supports("stl", Direction::Output));
        assert!(FormatRegistry::supports("glb", Direction::Output));
        assert!(!FormatRegistry::supports("glb", Direction::Input));
        assert!(!FormatRegistry::supports("unknown", Direction::Input));
    }

    #[test]
    fn test_requires_kernel() {
        assert!(FormatRegistry::requires_kernel("step"));
        assert!(FormatRegistry::requires_kernel("igs"));
        assert!(FormatRegistry::requires_kernel("brep"));
        assert!(!FormatRegistry::requires_kernel("stl"));
        assert!(!FormatRegistry::requires_kernel("obj"));
        assert!(!FormatRegistry::requires_kernel("nope"));
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(FormatRegistry::mime_type("glb"), "model/gltf-binary");
        assert_eq!(FormatRegistry::mime_type("stl_ascii"), "model/stl");
        assert_eq!(FormatRegistry::mime_type("xyz"), "");
    }

    #[test]
    fn test_listing() {
        let inputs: Vec<_> = FormatRegistry::list(Direction::Input)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(inputs, ["step", "iges", "brep", "stl", "obj"]);

        let outputs: Vec<_> = FormatRegistry::list(Direction::Output)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(outputs, ["stl", "stl_ascii", "obj", "gltf", "glb"]);
    }
}
