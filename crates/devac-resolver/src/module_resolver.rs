use std::collections::HashSet;

/// Resolves a module specifier written in one file to the package-relative
/// file path it refers to. Implemented per language, matching the
/// structural parser's own pluggability (spec §4.4: "the resolver is
/// pluggable per language").
pub trait ModuleResolver {
    fn resolve(&self, importing_file: &str, module_specifier: &str) -> Option<String>;
}

/// A resolver for relative-path ESM/CommonJS-style specifiers
/// (`./foo`, `../bar/baz`), the common case across the JS/TS family.
/// Bare specifiers (package imports) are left unresolved here — those
/// are external dependencies, not files inside this package.
pub struct RelativeModuleResolver<'a> {
    known_files: &'a HashSet<String>,
    extensions: &'a [&'a str],
}

impl<'a> RelativeModuleResolver<'a> {
    pub fn new(known_files: &'a HashSet<String>, extensions: &'a [&'a str]) -> Self {
        Self { known_files, extensions }
    }

    fn candidates(&self, joined: &str) -> Vec<String> {
        let mut out = vec![joined.to_string()];
        for ext in self.extensions {
            out.push(format!("{joined}{ext}"));
            out.push(format!("{joined}/index{ext}"));
        }
        out
    }
}

impl ModuleResolver for RelativeModuleResolver<'_> {
    fn resolve(&self, importing_file: &str, module_specifier: &str) -> Option<String> {
        if !module_specifier.starts_with('.') {
            return None;
        }
        let base = std::path::Path::new(importing_file).parent().unwrap_or_else(|| std::path::Path::new(""));
        let joined = normalize(&base.join(module_specifier));
        self.candidates(&joined).into_iter().find(|c| self.known_files.contains(c))
    }
}

fn normalize(path: &std::path::Path) -> String {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                parts.pop();
            }
            std::path::Component::CurDir => {}
            other => parts.push(other.as_os_str()),
        }
    }
    parts.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_specifier_against_known_files() {
        let mut files = HashSet::new();
        files.insert("src/utils/format.ts".to_string());
        let exts = [".ts"];
        let resolver = RelativeModuleResolver::new(&files, &exts);
        assert_eq!(
            resolver.resolve("src/index.ts", "./utils/format"),
            Some("src/utils/format.ts".to_string())
        );
    }

    #[test]
    fn leaves_bare_specifiers_unresolved() {
        let files = HashSet::new();
        let exts = [".ts"];
        let resolver = RelativeModuleResolver::new(&files, &exts);
        assert_eq!(resolver.resolve("src/index.ts", "react"), None);
    }
}
