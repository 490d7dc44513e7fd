use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use cross_xdg::BaseDirs;
use nu_ansi_term::Color;

/// Colours used by the REPL editor to highlight source as it is typed.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightColors {
    pub move_right: Color, // '>'
    pub move_left: Color,  // '<'
    pub increment: Color,  // '+'
    pub decrement: Color,  // '-'
    pub output: Color,     // '.'
    pub input: Color,      // ','
    pub bracket: Color,    // '[' and ']'
    pub comment: Color,
}

impl Default for HighlightColors {
    fn default() -> Self {
        // Catppuccin Mocha accents
        Self {
            move_right: Color::Rgb(137, 220, 235),
            move_left: Color::Rgb(148, 226, 213),
            increment: Color::Rgb(166, 227, 161),
            decrement: Color::Rgb(243, 139, 168),
            output: Color::Rgb(249, 226, 175),
            input: Color::Rgb(250, 179, 135),
            bracket: Color::Rgb(203, 166, 247),
            comment: Color::Rgb(108, 112, 134),
        }
    }
}

static COLORS: OnceLock<HighlightColors> = OnceLock::new();

/// Highlight colours from `$XDG_CONFIG_HOME/bf.toml`, or defaults when the
/// file is missing. Loaded once per process.
pub fn colors() -> &'static HighlightColors {
    COLORS.get_or_init(|| load_from_toml().unwrap_or_default())
}

fn parse_color(value: &str) -> Option<Color> {
    let s = value.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() == 6 && hex.is_ascii() {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return Some(Color::Rgb(r, g, b));
            }
        }
        return None;
    }

    let name = s.to_ascii_lowercase();
    Some(match name.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "purple" | "magenta" => Color::Purple,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" | "darkgray" | "dark_gray" | "darkgrey" | "dark_grey" => Color::DarkGray,
        "lightred" | "light_red" => Color::LightRed,
        "lightgreen" | "light_green" => Color::LightGreen,
        "lightblue" | "light_blue" => Color::LightBlue,
        "lightpurple" | "light_purple" | "lightmagenta" | "light_magenta" => Color::LightPurple,
        "lightcyan" | "light_cyan" => Color::LightCyan,
        _ => return None,
    })
}

fn load_from_toml() -> Option<HighlightColors> {
    let base_dirs = BaseDirs::new().ok()?;

    // Linux: /home/<user>/.config, macOS: /Users/<user>/.config
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bf.toml");

    let content = fs::read_to_string(&path).ok()?;
    tracing::debug!(path = %path.display(), "loaded highlight colours");
    Some(parse_colors(&content))
}

/// Read the `[colors]` section of a small TOML file. Values are strings like
/// `"#RRGGBB"` or colour names; unknown keys and bad values are skipped.
fn parse_colors(content: &str) -> HighlightColors {
    let mut in_colors = false;
    let mut map: HashMap<&str, &str> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
            in_colors = &line[1..line.len() - 1] == "colors";
            continue;
        }
        if !in_colors {
            continue;
        }
        if let Some((key, val_raw)) = line.split_once('=') {
            let val_raw = val_raw.trim();
            let val = val_raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(val_raw);
            map.insert(key.trim(), val);
        }
    }

    let mut cfg = HighlightColors::default();

    macro_rules! set {
        ($field:ident) => {
            if let Some(v) = map.get(stringify!($field)).and_then(|s| parse_color(s)) {
                cfg.$field = v;
            }
        };
    }

    set!(move_right);
    set!(move_left);
    set!(increment);
    set!(decrement);
    set!(output);
    set!(input);
    set!(bracket);
    set!(comment);

    cfg
}
