use once_cell::sync::Lazy;
use regex::Regex;

static REASONING_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>|<reasoning>[\s\S]*?</reasoning>")
        .expect("reasoning block pattern is valid")
});

/// Reduces raw model output to the JSON document it is supposed to carry.
///
/// Handles reasoning blocks, a chat-completion envelope passed through by a
/// proxy, markdown code fences and prose around the object.
pub(crate) fn extract_json_payload(output: &str) -> String {
    let cleaned = REASONING_BLOCK_PATTERN.replace_all(output, "");
    let trimmed = cleaned.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(content) = value
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
        {
            return extract_json_payload(content);
        }
        return trimmed.to_string();
    }

    let unfenced = strip_code_fence(trimmed);
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced,
    }
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match body {
        Some(body) => body.trim().trim_end_matches("```").trim().to_string(),
        None => trimmed.to_string(),
    }
}

pub(crate) fn preview_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut preview: String = value.chars().take(max_chars).collect();
    preview.push_str("...");
    preview
}
