//! Extension-to-language lookup and default file templates.
//!
//! The editor only needs a language tag for display and syntax configuration,
//! so this is a plain lookup with a fallback rather than anything dynamic.

/// Get the editor language tag for a file path based on its extension.
pub fn language_for_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_lowercase().as_str() {
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "rs" => "rust",
        "py" => "python",
        "rb" => "ruby",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "sh" => "shell",
        "css" => "css",
        "html" | "htm" => "html",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "sql" => "sql",
        "xml" => "xml",
        _ => "plaintext",
    }
}

/// Build the default content seeded into a buffer when a file is opened
/// before it has ever been written to the store.
///
/// The template is deterministic and keyed only by extension: a comment
/// header naming the file, in the comment syntax of its language.
pub fn default_content(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_lowercase().as_str() {
        "py" | "rb" | "sh" | "yaml" | "yml" | "toml" => format!("# {}\n\n", name),
        "html" | "htm" | "md" | "xml" => format!("<!-- {} -->\n\n", name),
        "css" => format!("/* {} */\n\n", name),
        "json" => "{}\n".to_string(),
        _ => format!("// {}\n\n", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_map_to_languages() {
        assert_eq!(language_for_path("src/app.js"), "javascript");
        assert_eq!(language_for_path("lib/main.rs"), "rust");
        assert_eq!(language_for_path("notes/README.md"), "markdown");
        assert_eq!(language_for_path("a/b/c.tsx"), "typescript");
    }

    #[test]
    fn unknown_extension_falls_back_to_plaintext() {
        assert_eq!(language_for_path("data.xyz"), "plaintext");
        assert_eq!(language_for_path("Makefile"), "plaintext");
    }

    #[test]
    fn default_content_uses_comment_syntax_of_language() {
        assert_eq!(default_content("missing.txt"), "// missing.txt\n\n");
        assert_eq!(default_content("src/util.py"), "# util.py\n\n");
        assert_eq!(default_content("index.html"), "<!-- index.html -->\n\n");
        assert_eq!(default_content("style.css"), "/* style.css */\n\n");
    }
}
