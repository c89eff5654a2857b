//! Concrete widget variants and the config-driven factory.
//!
//! Image compositing and font rendering live outside this workspace, so
//! these widgets draw flat state-keyed fills; everything else (state
//! probes, audio reactions, recent-window bookkeeping) is complete.

mod audio_switch;
mod base;
mod button;
mod mute;
mod recent_window;
mod toggle;

pub use audio_switch::AudioSwitchWidget;
pub use base::BaseWidget;
pub use button::ButtonWidget;
pub use mute::MuteWidget;
pub use recent_window::RecentWindowWidget;
pub use toggle::ToggleWidget;

use deckhand_config::{Error as ConfigError, KeyConfig};
use deckhand_device::Geometry;

use crate::{Result, Widget, services::Services};

/// Fill used by widgets with no color configured.
pub const DEFAULT_COLOR: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
/// Fill used for "off"/empty states.
pub const DIM_COLOR: [u8; 4] = [0x28, 0x28, 0x28, 0xff];

/// Build the widget bound by `cfg` for a device with `geometry`.
pub fn from_config(
    geometry: Geometry,
    cfg: &KeyConfig,
    services: &Services,
) -> Result<Box<dyn Widget>> {
    let widget: Box<dyn Widget> = match cfg.widget.id.as_str() {
        "button" => Box::new(ButtonWidget::from_config(geometry, cfg)?),
        "toggle" => Box::new(ToggleWidget::from_config(geometry, cfg, services)?),
        "audio" => Box::new(AudioSwitchWidget::from_config(geometry, cfg, services)?),
        "mute" => Box::new(MuteWidget::from_config(geometry, cfg, services)?),
        "recentWindow" => Box::new(RecentWindowWidget::from_config(geometry, cfg, services)?),
        other => {
            return Err(ConfigError::Validation {
                message: format!("unknown widget kind '{}' on key {}", other, cfg.index),
            }
            .into());
        }
    };
    Ok(widget)
}

/// Parse a `#rrggbb` color setting into an opaque RGBA fill.
pub fn parse_color(value: Option<String>, default: [u8; 4]) -> Result<[u8; 4]> {
    let Some(value) = value else {
        return Ok(default);
    };
    let hex = value.strip_prefix('#').unwrap_or(&value);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::Validation {
            message: format!("'{}' is not a valid #rrggbb color", value),
        }
        .into());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    Ok([channel(0), channel(2), channel(4), 0xff])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parsing() {
        assert_eq!(parse_color(None, DIM_COLOR).unwrap(), DIM_COLOR);
        assert_eq!(
            parse_color(Some("#20c040".to_string()), DEFAULT_COLOR).unwrap(),
            [0x20, 0xc0, 0x40, 0xff]
        );
        assert_eq!(
            parse_color(Some("ff0000".to_string()), DEFAULT_COLOR).unwrap(),
            [0xff, 0x00, 0x00, 0xff]
        );
        assert!(parse_color(Some("#red".to_string()), DEFAULT_COLOR).is_err());
    }

    #[test]
    fn unknown_widget_kind_is_rejected() {
        let cfg: KeyConfig = toml::from_str(
            r#"
            index = 0
            [widget]
            id = "flubber"
            "#,
        )
        .unwrap();
        let geometry = Geometry {
            rows: 1,
            columns: 1,
            keys: 1,
            pixels: 72,
            padding: 0,
        };
        let err = from_config(geometry, &cfg, &Services::detached()).unwrap_err();
        assert!(err.to_string().contains("flubber"));
    }
}
