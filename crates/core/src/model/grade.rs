use std::fmt;

/// Letter grade on the platform's scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    /// A: 90–100, B: 80–89, C: 70–79, D: 60–69, E: 50–59, F: below 50.
    /// Input is clamped to 0–100 first.
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        let p = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        match p {
            p if p >= 90.0 => Grade::A,
            p if p >= 80.0 => Grade::B,
            p if p >= 70.0 => Grade::C,
            p if p >= 60.0 => Grade::D,
            p if p >= 50.0 => Grade::E,
            _ => Grade::F,
        }
    }

    /// E passes but needs attention.
    #[must_use]
    pub fn is_borderline(self) -> bool {
        self == Grade::E
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Grade::A => "Excellent!",
            Grade::B => "Very Good!",
            Grade::C => "Good",
            Grade::D => "Fair",
            Grade::E => "Borderline. Needs Attention.",
            Grade::F => "Failed. Retake recommended.",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_map_to_letters() {
        assert_eq!(Grade::from_percent(90.0), Grade::A);
        assert_eq!(Grade::from_percent(89.99), Grade::B);
        assert_eq!(Grade::from_percent(70.0), Grade::C);
        assert_eq!(Grade::from_percent(60.0), Grade::D);
        assert_eq!(Grade::from_percent(50.0), Grade::E);
        assert_eq!(Grade::from_percent(49.9), Grade::F);
    }

    #[test]
    fn clamps_out_of_range_input() {
        assert_eq!(Grade::from_percent(140.0), Grade::A);
        assert_eq!(Grade::from_percent(-3.0), Grade::F);
        assert_eq!(Grade::from_percent(f64::NAN), Grade::F);
    }

    #[test]
    fn only_e_is_borderline() {
        assert!(Grade::E.is_borderline());
        assert!(!Grade::F.is_borderline());
        assert_eq!(Grade::E.to_string(), "E");
    }
}
