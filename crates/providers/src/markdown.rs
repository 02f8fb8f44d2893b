//! Markdown filtering for speech output.
//!
//! Code fences and tables read terribly aloud. The TTS stage strips them
//! (replacing fences with a short spoken placeholder) before synthesis.

/// Strip markdown constructs that should not be spoken.
pub fn filter_markdown(text: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;
    let mut fence_announced = false;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            if in_fence && !fence_announced {
                out.push("(code shown on screen)".to_string());
                fence_announced = true;
            }
            if !in_fence {
                fence_announced = false;
            }
            continue;
        }
        if in_fence {
            continue;
        }
        // Table rows and separators.
        if trimmed.starts_with('|') {
            continue;
        }

        out.push(strip_inline(line));
    }

    out.join("\n").trim().to_string()
}

/// Remove inline code backticks and emphasis markers.
fn strip_inline(line: &str) -> String {
    line.replace("**", "").replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fences_replaced_with_placeholder() {
        let text = "Look at this:\n```python\nprint(1)\n```\nDone.";
        let spoken = filter_markdown(text);
        assert!(!spoken.contains("print(1)"));
        assert!(spoken.contains("(code shown on screen)"));
        assert!(spoken.contains("Done."));
    }

    #[test]
    fn tables_are_dropped() {
        let text = "Results:\n| a | b |\n|---|---|\n| 1 | 2 |\nSummary.";
        let spoken = filter_markdown(text);
        assert!(!spoken.contains('|'));
        assert!(spoken.contains("Summary."));
    }

    #[test]
    fn inline_markup_stripped() {
        assert_eq!(filter_markdown("use `map` and **fold**"), "use map and fold");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(filter_markdown("hello there"), "hello there");
    }
}
