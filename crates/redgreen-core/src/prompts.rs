//! Prompt templates for the three agent roles.
//!
//! Every prompt carries the kata rules verbatim plus the code context the
//! role needs. The backend returns free-form text; the strict output-format
//! instructions here only raise the odds that the extractor's first
//! patterns match.

use redgreen_llm::CompletionRequest;
use redgreen_runner::FileSet;

/// Sentinel the Tester emits instead of a file when the kata is done.
pub const KATA_COMPLETE_SENTINEL: &str = "KATA_COMPLETE";

/// Sentinel the Refactorer emits when it declines to change anything.
pub const NO_REFACTOR_SENTINEL: &str = "NO_REFACTOR_NEEDED";

const MAX_DIAGNOSTIC_LEN: usize = 10_000;

pub struct RolePrompts;

impl RolePrompts {
    fn role_header(role: &str, rules: &str) -> String {
        format!(
            "You are the {role} agent in a test-driven development workflow.\n\n\
             KATA RULES:\n{rules}\n\n\
             Follow these rules strictly when generating code and tests.\n\n"
        )
    }

    /// Render a file set the way the roles present code to the backend.
    pub fn code_context(files: &FileSet, language: &str) -> String {
        if files.is_empty() {
            return "No code files present yet.".to_string();
        }

        files
            .iter()
            .map(|(path, content)| {
                format!("### {}\n```{}\n{}\n```", path.display(), language, content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn tester(
        rules: &str,
        crate_name: &str,
        language: &str,
        files: &FileSet,
        last_result: &str,
    ) -> CompletionRequest {
        let system = format!(
            "{header}\
             You are the Tester. Propose the smallest next unit test that WILL FAIL under the kata rules.\n\n\
             Hard rules:\n\
             1. Output exactly one test file and nothing else - no implementation code.\n\
             2. The test must call functions or types that do not exist yet in src/, so it fails.\n\
             3. Do not define helper functions or implementations inside the test file.\n\
             4. Import from the crate root: use {crate_name}::{{TypeName, function_name}};\n\
             5. The file goes under tests/ (for example tests/test_feature.rs).\n\
             6. If the kata rules are already fully covered, reply with the single word {sentinel} instead of a file.\n\n\
             Output format:\n\
             ### tests/test_name.rs\n\
             ```{language}\n\
             use {crate_name}::function_name;\n\n\
             #[test]\n\
             fn it_does_something() {{\n\
                 assert_eq!(function_name(), expected);\n\
             }}\n\
             ```",
            header = Self::role_header("Tester", rules),
            crate_name = crate_name,
            language = language,
            sentinel = KATA_COMPLETE_SENTINEL,
        );

        let user = format!(
            "CURRENT CODE:\n{code}\n\n\
             LAST TEST RESULT:\n{last}\n\n\
             Write the next failing test file now. Only the test, no implementation.",
            code = Self::code_context(files, language),
            last = truncate_at_line(last_result, MAX_DIAGNOSTIC_LEN),
        );

        CompletionRequest::new(system, user)
    }

    pub fn implementer(
        rules: &str,
        language: &str,
        sources: &FileSet,
        failing_output: &str,
    ) -> CompletionRequest {
        let system = format!(
            "{header}\
             You are the Implementer. Make the minimal change to the production code so the failing test passes.\n\n\
             Hard rules:\n\
             1. Only modify files under src/ (for example src/lib.rs).\n\
             2. Do not add #[cfg(test)] modules or any test code.\n\
             3. Write only the public API the external tests need.\n\
             4. Output the full content of every file you change, each in a fenced code block preceded by a `### path` heading. No diffs.",
            header = Self::role_header("Implementer", rules),
        );

        let user = format!(
            "CURRENT SOURCE:\n{code}\n\n\
             FAILING TEST OUTPUT:\n{output}\n\n\
             Produce the full file contents that make the test pass. No test code.",
            code = Self::code_context(sources, language),
            output = truncate_at_line(failing_output, MAX_DIAGNOSTIC_LEN),
        );

        CompletionRequest::new(system, user)
    }

    pub fn refactorer(rules: &str, language: &str, files: &FileSet) -> CompletionRequest {
        let system = format!(
            "{header}\
             You are the Refactorer. Improve the structure or readability of the code without changing its behavior. \
             Every existing test must keep passing.\n\n\
             Output the full content of every file you change, each in a fenced code block preceded by a `### path` heading. No diffs.\n\
             If no worthwhile refactoring exists, reply with the single word {sentinel}.",
            header = Self::role_header("Refactorer", rules),
            sentinel = NO_REFACTOR_SENTINEL,
        );

        let user = format!(
            "CURRENT CODE:\n{code}\n\n\
             Propose a safe refactoring, or reply {sentinel}.",
            code = Self::code_context(files, language),
            sentinel = NO_REFACTOR_SENTINEL,
        );

        CompletionRequest::new(system, user)
    }
}

/// Truncate long diagnostics at a line boundary before prompt injection.
fn truncate_at_line(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        text
    } else if let Some(pos) = text[..max_len].rfind('\n') {
        &text[..pos]
    } else {
        &text[..max_len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn files() -> FileSet {
        let mut files = FileSet::new();
        files.insert(
            PathBuf::from("src/lib.rs"),
            "pub fn double(x: i64) -> i64 { x * 2 }".to_string(),
        );
        files
    }

    #[test]
    fn code_context_renders_headings_and_fences() {
        let rendered = RolePrompts::code_context(&files(), "rust");
        assert!(rendered.starts_with("### src/lib.rs\n```rust\n"));
        assert!(rendered.ends_with("```"));
    }

    #[test]
    fn code_context_empty_placeholder() {
        assert_eq!(
            RolePrompts::code_context(&FileSet::new(), "rust"),
            "No code files present yet."
        );
    }

    #[test]
    fn tester_prompt_carries_crate_name_and_sentinel() {
        let request = RolePrompts::tester("double the input", "kata", "rust", &files(), "No previous test run.");
        assert!(request.system.contains("use kata::"));
        assert!(request.system.contains(KATA_COMPLETE_SENTINEL));
        assert!(request.system.contains("KATA RULES:\ndouble the input"));
        assert!(request.user.contains("No previous test run."));
    }

    #[test]
    fn implementer_prompt_carries_failing_output() {
        let request = RolePrompts::implementer("rules", "rust", &files(), "error[E0425]: not found");
        assert!(request.user.contains("error[E0425]"));
        assert!(request.system.contains("under src/"));
    }

    #[test]
    fn refactorer_prompt_offers_skip_sentinel() {
        let request = RolePrompts::refactorer("rules", "rust", &files());
        assert!(request.system.contains(NO_REFACTOR_SENTINEL));
    }

    #[test]
    fn truncation_respects_line_boundaries() {
        let text = "line one\nline two\nline three";
        let truncated = truncate_at_line(text, 12);
        assert_eq!(truncated, "line one");
        assert_eq!(truncate_at_line("short", 100), "short");
    }
}
