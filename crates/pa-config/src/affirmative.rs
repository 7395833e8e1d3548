//! Tri-state parsing of "affirmative" values.
//!
//! Configuration sources distinguish three cases for boolean-ish strings:
//! no opinion (empty), explicitly true (`true`, `yes`, `1`, any case) and
//! explicitly false (anything else). Only the last two override a default.

/// Parsed affirmative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affirmative {
    /// No value supplied; keep the current setting.
    #[default]
    Unset,
    True,
    False,
}

impl Affirmative {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Affirmative::Unset;
        }
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Affirmative::True,
            _ => Affirmative::False,
        }
    }

    /// Parse an optional value, treating `None` as unset.
    pub fn parse_opt(value: Option<&str>) -> Self {
        value.map_or(Affirmative::Unset, Self::parse)
    }

    /// `Some(bool)` for an explicit value, `None` when unset.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Affirmative::Unset => None,
            Affirmative::True => Some(true),
            Affirmative::False => Some(false),
        }
    }

    pub fn is_true(self) -> bool {
        self == Affirmative::True
    }

    /// Apply an explicit value to `target`, leaving it alone when unset.
    pub fn apply_to(self, target: &mut bool) {
        if let Some(value) = self.as_bool() {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_values() {
        assert_eq!(Affirmative::parse("yes"), Affirmative::True);
        assert_eq!(Affirmative::parse("True"), Affirmative::True);
        assert_eq!(Affirmative::parse("1"), Affirmative::True);
        assert_eq!(Affirmative::parse("YES"), Affirmative::True);
    }

    #[test]
    fn test_empty_is_unset() {
        assert_eq!(Affirmative::parse(""), Affirmative::Unset);
        assert_eq!(Affirmative::parse("   "), Affirmative::Unset);
        assert_eq!(Affirmative::parse_opt(None), Affirmative::Unset);
    }

    #[test]
    fn test_anything_else_is_false() {
        assert_eq!(Affirmative::parse("ok"), Affirmative::False);
        assert_eq!(Affirmative::parse("false"), Affirmative::False);
        assert_eq!(Affirmative::parse("0"), Affirmative::False);
        assert_eq!(Affirmative::parse("disabled"), Affirmative::False);
    }

    #[test]
    fn test_apply_to() {
        let mut flag = true;
        Affirmative::Unset.apply_to(&mut flag);
        assert!(flag);
        Affirmative::False.apply_to(&mut flag);
        assert!(!flag);
        Affirmative::True.apply_to(&mut flag);
        assert!(flag);
    }
}
