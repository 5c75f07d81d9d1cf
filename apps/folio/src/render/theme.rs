//! Theme Applier: palette description → CSS custom properties.
//!
//! Slot values present in the palette are written verbatim. Missing slots are
//! derived from the base colours as `rgba(...)` with a fixed alpha per slot.
//! A base colour that is not valid 3- or 6-digit hex produces nothing for the
//! slots that derive from it.

use crate::dom::RenderTarget;
use crate::models::ThemeColors;

pub const BLOB1_ALPHA: f64 = 0.92;
pub const BLOB2_ALPHA: f64 = 0.84;
pub const BLOB3_ALPHA: f64 = 0.82;
pub const BLOB4_ALPHA: f64 = 0.58;
pub const HIGHLIGHT1_ALPHA: f64 = 0.09;
pub const HIGHLIGHT2_ALPHA: f64 = 0.06;

type Pick = fn(&ThemeColors) -> Option<&str>;

struct Slot {
    var: &'static str,
    explicit: Pick,
    base: Pick,
    alpha: f64,
}

const SLOTS: &[Slot] = &[
    Slot {
        var: "--blob-1",
        explicit: |p| p.blob1.as_deref(),
        base: |p| p.primary.as_deref(),
        alpha: BLOB1_ALPHA,
    },
    Slot {
        var: "--blob-2",
        explicit: |p| p.blob2.as_deref(),
        base: |p| p.secondary.as_deref(),
        alpha: BLOB2_ALPHA,
    },
    Slot {
        var: "--blob-3",
        explicit: |p| p.blob3.as_deref(),
        base: |p| p.accent.as_deref(),
        alpha: BLOB3_ALPHA,
    },
    Slot {
        var: "--blob-4",
        explicit: |p| p.blob4.as_deref(),
        base: |p| p.soft.as_deref(),
        alpha: BLOB4_ALPHA,
    },
    Slot {
        var: "--highlight-1",
        explicit: |p| p.highlight1.as_deref(),
        base: |p| p.primary.as_deref(),
        alpha: HIGHLIGHT1_ALPHA,
    },
    Slot {
        var: "--highlight-2",
        explicit: |p| p.highlight2.as_deref(),
        base: |p| p.accent.as_deref(),
        alpha: HIGHLIGHT2_ALPHA,
    },
];

const BASES: &[(&str, Pick)] = &[
    ("--color-primary", |p| p.primary.as_deref()),
    ("--color-secondary", |p| p.secondary.as_deref()),
    ("--color-accent", |p| p.accent.as_deref()),
    ("--color-soft", |p| p.soft.as_deref()),
];

/// Parses `#rgb`, `rgb`, `#rrggbb` or `rrggbb`.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// `rgba(r,g,b,alpha)` for a hex colour, or `None` when the hex is invalid.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> Option<String> {
    let (r, g, b) = parse_hex(hex)?;
    Some(format!("rgba({r},{g},{b},{alpha})"))
}

/// Computes the custom properties for a palette, in a stable order.
pub fn theme_variables(palette: &ThemeColors) -> Vec<(String, String)> {
    let mut vars = Vec::new();

    for (var, pick) in BASES {
        if let Some((r, g, b)) = pick(palette).and_then(parse_hex) {
            vars.push((var.to_string(), format!("#{r:02x}{g:02x}{b:02x}")));
        }
    }

    for slot in SLOTS {
        let explicit = (slot.explicit)(palette)
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let value = match explicit {
            Some(v) => Some(v.to_string()),
            None => (slot.base)(palette).and_then(|hex| hex_to_rgba(hex, slot.alpha)),
        };
        if let Some(value) = value {
            vars.push((slot.var.to_string(), value));
        }
    }

    vars
}

/// Writes the palette's custom properties to the render target.
pub fn apply_theme_colors(palette: &ThemeColors, target: &mut dyn RenderTarget) -> usize {
    let vars = theme_variables(palette);
    target.set_theme_variables(&vars);
    vars.len()
}
