//! Local sanity check of generated scene source.
//!
//! Catches the common ways model output goes wrong before paying for a
//! render: an empty reply, a fence the cleanup missed, a missing import or
//! scene class, and unbalanced brackets. It is not a Python parser.

/// Source check failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("generated source is empty")]
    Empty,

    #[error("code fence left in generated source at line {line}")]
    LeftoverFence { line: usize },

    #[error("generated source does not import manim")]
    MissingImport,

    #[error("generated source does not declare class `{class_name}`")]
    MissingScene { class_name: String },

    #[error("unbalanced `{delimiter}` at line {line}")]
    UnbalancedDelimiter { delimiter: char, line: usize },

    #[error("unterminated string starting at line {line}")]
    UnterminatedString { line: usize },
}

/// Check that `code` looks like a renderable scene declaring `class_name`.
pub fn check_source(code: &str, class_name: &str) -> Result<(), SourceError> {
    debug_assert!(!class_name.is_empty(), "Class name must not be empty");

    if code.trim().is_empty() {
        return Err(SourceError::Empty);
    }

    if let Some(line) = code
        .lines()
        .position(|l| l.trim_start().starts_with("```"))
    {
        return Err(SourceError::LeftoverFence { line: line + 1 });
    }

    let imports_manim = code.lines().map(str::trim_start).any(|l| {
        l.starts_with("from manim import") || l.starts_with("import manim")
    });
    if !imports_manim {
        return Err(SourceError::MissingImport);
    }

    if !declares_class(code, class_name) {
        return Err(SourceError::MissingScene {
            class_name: class_name.to_string(),
        });
    }

    check_delimiters(code)
}

fn declares_class(code: &str, class_name: &str) -> bool {
    code.lines().any(|line| {
        line.trim_start()
            .strip_prefix("class ")
            .and_then(|rest| rest.trim_start().strip_prefix(class_name))
            .is_some_and(|rest| rest.starts_with('(') || rest.starts_with(':'))
    })
}

/// Bracket balance, skipping string literals and `#` comments.
fn check_delimiters(code: &str) -> Result<(), SourceError> {
    let chars: Vec<char> = code.chars().collect();
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\n' => line += 1,
            '#' => {
                while i + 1 < chars.len() && chars[i + 1] != '\n' {
                    i += 1;
                }
            }
            quote @ ('\'' | '"') => {
                let start_line = line;
                let triple = chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote);
                i += if triple { 3 } else { 1 };

                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' => {
                            if chars.get(i + 1) == Some(&'\n') {
                                line += 1;
                            }
                            i += 1;
                        }
                        '\n' if !triple => break,
                        '\n' => line += 1,
                        c if c == quote => {
                            if !triple {
                                closed = true;
                                break;
                            }
                            if chars.get(i + 1) == Some(&quote)
                                && chars.get(i + 2) == Some(&quote)
                            {
                                i += 2;
                                closed = true;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }

                if !closed {
                    return Err(SourceError::UnterminatedString { line: start_line });
                }
            }
            c @ ('(' | '[' | '{') => open.push((c, line)),
            c @ (')' | ']' | '}') => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match open.pop() {
                    Some((o, _)) if o == expected => {}
                    _ => return Err(SourceError::UnbalancedDelimiter { delimiter: c, line }),
                }
            }
            _ => {}
        }
        i += 1;
    }

    match open.pop() {
        Some((delimiter, line)) => Err(SourceError::UnbalancedDelimiter { delimiter, line }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"from manim import *

class GeneratedScene(Scene):
    def construct(self):
        circle = Circle(color=YELLOW, fill_opacity=1)
        hexagon = RegularPolygon(n=6, color=ORANGE, fill_opacity=1)
        self.play(Create(circle))
        self.play(Transform(circle, hexagon))
        self.play(FadeOut(hexagon))"#;

    #[test]
    fn test_accepts_valid_scene() {
        assert_eq!(check_source(SCENE, "GeneratedScene"), Ok(()));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(check_source("  \n\t", "GeneratedScene"), Err(SourceError::Empty));
    }

    #[test]
    fn test_rejects_leftover_fence() {
        let code = format!("```py\n{}\n```", SCENE);
        assert_eq!(
            check_source(&code, "GeneratedScene"),
            Err(SourceError::LeftoverFence { line: 1 })
        );
    }

    #[test]
    fn test_rejects_missing_import() {
        let code = SCENE.replacen("from manim import *", "", 1);
        assert_eq!(check_source(&code, "GeneratedScene"), Err(SourceError::MissingImport));
    }

    #[test]
    fn test_rejects_wrong_class_name() {
        let err = check_source(SCENE, "OtherScene").unwrap_err();
        assert_eq!(
            err,
            SourceError::MissingScene {
                class_name: "OtherScene".to_string()
            }
        );

        // A longer name sharing the prefix is not a match.
        let code = SCENE.replace("class GeneratedScene(", "class GeneratedSceneTwo(");
        assert!(matches!(
            check_source(&code, "GeneratedScene"),
            Err(SourceError::MissingScene { .. })
        ));
    }

    #[test]
    fn test_rejects_unclosed_paren() {
        let code = SCENE.replace("self.play(Create(circle))", "self.play(Create(circle)");
        assert_eq!(
            check_source(&code, "GeneratedScene"),
            Err(SourceError::UnbalancedDelimiter { delimiter: '(', line: 7 })
        );
    }

    #[test]
    fn test_rejects_mismatched_close() {
        let code = "from manim import *\nclass GeneratedScene(Scene):\n    x = [1, 2)\n";
        assert_eq!(
            check_source(code, "GeneratedScene"),
            Err(SourceError::UnbalancedDelimiter { delimiter: ')', line: 3 })
        );
    }

    #[test]
    fn test_brackets_in_strings_and_comments_are_ignored() {
        let code = r#"from manim import *
class GeneratedScene(Scene):
    def construct(self):
        # a stray ( in a comment
        label = Text("f(x = [")
        other = Text('}')
        doc = """multi
        line ) text"""
        self.play(Write(label))"#;
        assert_eq!(check_source(code, "GeneratedScene"), Ok(()));
    }

    #[test]
    fn test_rejects_unterminated_string() {
        let code = "from manim import *\nclass GeneratedScene(Scene):\n    t = Text(\"oops)\n";
        assert_eq!(
            check_source(code, "GeneratedScene"),
            Err(SourceError::UnterminatedString { line: 3 })
        );
    }
}
