use stride_types::api::HabitDraftPayload;
use stride_types::models::{HabitCategory, HabitColor, HabitDraft, HabitKind};

use crate::error::{EngineError, EngineResult};

const NAME_MAX: usize = 80;
const UNIT_MAX: usize = 40;
const EMOJI_MAX: usize = 4;
const DESCRIPTION_MAX: usize = 280;

fn clamp_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Validate and clamp a raw draft into a [`HabitDraft`].
///
/// Name/unit/description are trimmed and length-clamped; an empty name,
/// unit, or unrecognized kind rejects the draft. Unknown categories and
/// colors fall back to their defaults instead of erroring.
pub fn normalize_draft(payload: &HabitDraftPayload) -> EngineResult<HabitDraft> {
    let name = clamp_chars(payload.name.trim(), NAME_MAX);
    if name.is_empty() {
        return Err(EngineError::validation("habit draft requires a name"));
    }

    let kind = HabitKind::parse(payload.kind.trim())
        .ok_or_else(|| EngineError::validation("habit draft requires a valid kind"))?;

    let unit = clamp_chars(payload.unit.trim(), UNIT_MAX);
    if unit.is_empty() {
        return Err(EngineError::validation("habit draft requires a unit"));
    }

    let category = payload
        .category
        .as_deref()
        .map(|s| HabitCategory::parse_or_default(s.trim()))
        .unwrap_or_default();
    let color = payload
        .color
        .as_deref()
        .map(|s| HabitColor::parse_or_default(s.trim()))
        .unwrap_or_default();
    let emoji = clamp_chars(payload.emoji.as_deref().unwrap_or("").trim(), EMOJI_MAX);
    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| clamp_chars(s, DESCRIPTION_MAX));

    Ok(HabitDraft {
        name,
        kind,
        unit,
        category,
        color,
        emoji,
        description,
    })
}
