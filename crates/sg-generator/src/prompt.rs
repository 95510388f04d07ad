//! Prompt construction and response cleanup.
//!
//! The template pins the scene class name and shows one worked example. The
//! request is inserted verbatim; nothing in it is escaped.

use sg_core::SCENE_CLASS_NAME;

/// Fence opener the model is asked to use.
const FENCE_OPEN: &str = "```python";
const FENCE_CLOSE: &str = "```";

/// Request used by the worked example.
pub const EXAMPLE_REQUEST: &str = "A circle turning into a square.";

/// Scene code used by the worked example.
const EXAMPLE_SCENE: &str = r#"from manim import *
class GeneratedScene(Scene):
    def construct(self):
        circle = Circle()
        square = Square()
        self.play(Create(circle))
        self.play(Transform(circle, square))
        self.play(FadeOut(square))"#;

/// Builds the generation prompt.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Embed `request` into the fixed template.
    pub fn build(request: &str) -> String {
        format!(
            r#"You are an expert Manim programmer. Your task is to generate a single, complete Manim scene in a Python script based on the user's prompt.
Constraints:
- The script must be a single block of Python code.
- Do NOT include any explanations, comments, or text outside of the code.
- The scene class MUST be named `{class}`.
- The code must be runnable with `manim -pql generated_scene.py {class}`.
Example:
User prompt: "{example_request}"
Your output:
{fence_open}
{example}
{fence_close}
User prompt: "{request}"
Your output:
"#,
            class = SCENE_CLASS_NAME,
            example_request = EXAMPLE_REQUEST,
            fence_open = FENCE_OPEN,
            example = EXAMPLE_SCENE,
            fence_close = FENCE_CLOSE,
            request = request,
        )
    }

    /// Scene code of the worked example.
    pub fn worked_example() -> &'static str {
        EXAMPLE_SCENE
    }
}

/// Strip a ```` ```python ```` opener and a ```` ``` ```` closer.
///
/// Each marker is removed only at the very start or end of the trimmed
/// text. Any other wrapping is left for the source check to reject.
pub fn strip_code_fence(text: &str) -> String {
    let mut code = text.trim();
    if let Some(rest) = code.strip_prefix(FENCE_OPEN) {
        code = rest;
    }
    if let Some(rest) = code.strip_suffix(FENCE_CLOSE) {
        code = rest;
    }
    code.trim().to_string()
}
