use serde::{Deserialize, Serialize};

/// A terminal colour.
///
/// `DefaultFg` and `DefaultBg` are sentinels standing for "whatever the
/// host's default foreground/background is"; they resolve to concrete RGB
/// through the state's default-colour pair. Indexed colours refer to the
/// 256-colour palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    DefaultFg,
    DefaultBg,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    pub fn is_default_fg(&self) -> bool {
        matches!(self, Color::DefaultFg)
    }

    pub fn is_default_bg(&self) -> bool {
        matches!(self, Color::DefaultBg)
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, Color::Indexed(_))
    }

    pub fn is_rgb(&self) -> bool {
        matches!(self, Color::Rgb(..))
    }

    pub fn index(&self) -> Option<u8> {
        match self {
            Color::Indexed(idx) => Some(*idx),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::DefaultFg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_predicates() {
        assert!(Color::DefaultFg.is_default_fg());
        assert!(!Color::DefaultFg.is_default_bg());
        assert!(Color::Indexed(7).is_indexed());
        assert_eq!(Color::Indexed(7).index(), Some(7));
        assert!(Color::Rgb(1, 2, 3).is_rgb());
        assert_eq!(Color::Rgb(1, 2, 3).index(), None);
    }
}
