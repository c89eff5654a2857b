//! Parser for synthetic key input specs.
//!
//! A spec is a sequence of steps separated by `/`. Each step is a
//! `-`-chained combination of keycodes (all but the last are held as
//! modifiers while the last is tapped), optionally followed by
//! `+<millis>` to pause before the next step: `29-47/500+100/28`.
//! Codes are Linux input-event numbers or one of a few common aliases.

/// One step of a key input spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Keycodes of the combination; never empty. All but the last are
    /// held while the last is tapped.
    pub codes: Vec<u16>,
    /// Pause after this step, in milliseconds.
    pub delay_ms: Option<u64>,
}

/// Names accepted in place of numeric keycodes.
const ALIASES: &[(&str, u16)] = &[
    ("esc", 1),
    ("tab", 15),
    ("enter", 28),
    ("ctrl", 29),
    ("shift", 42),
    ("rshift", 54),
    ("alt", 56),
    ("space", 57),
    ("up", 103),
    ("down", 108),
    ("left", 105),
    ("right", 106),
    ("super", 125),
];

/// Parse a full key input spec into its steps.
pub fn parse(spec: &str) -> Result<Vec<Step>, String> {
    spec.split('/').map(parse_step).collect()
}

fn parse_step(step: &str) -> Result<Step, String> {
    let (combo, delay_ms) = match step.split_once('+') {
        Some((combo, delay)) => {
            let ms = delay
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("'{}' is not a valid delay", delay.trim()))?;
            (combo, Some(ms))
        }
        None => (step, None),
    };
    let codes = combo
        .split('-')
        .map(|code| lookup(code.trim()))
        .collect::<Result<Vec<u16>, String>>()?;
    Ok(Step { codes, delay_ms })
}

fn lookup(name: &str) -> Result<u16, String> {
    let folded = name.to_ascii_lowercase();
    if let Some((_, code)) = ALIASES.iter().find(|(alias, _)| *alias == folded) {
        return Ok(*code);
    }
    name.parse::<u16>()
        .map_err(|_| format!("'{}' is not a valid keycode", name))
}
