/// How much of CV-A's full scale reaches the DAC, as a whole percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Attenuation(u8);

impl Attenuation {
    /// No attenuation at all.
    pub const FULL: Self = Self(100);

    /// Constructs an [`Attenuation`], clamping anything above 100%.
    pub fn from_percent(percent: u8) -> Self {
        Self(percent.min(100))
    }

    /// Getter.
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Scales `value` by this percentage, rounding toward zero.
    pub fn apply(self, value: u16) -> u16 {
        (u32::from(value) * u32::from(self.0) / 100) as u16
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_one_hundred() {
        assert_eq!(Attenuation::FULL, Attenuation::from_percent(250));
    }

    #[test]
    fn apply_rounds_toward_zero() {
        let half = Attenuation::from_percent(50);
        assert_eq!(63, half.apply(127), "Expected left but got right");

        let third = Attenuation::from_percent(33);
        assert_eq!(41, third.apply(127), "Expected left but got right");
    }

    #[test]
    fn full_and_silent() {
        assert_eq!(127, Attenuation::FULL.apply(127));
        assert_eq!(0, Attenuation::from_percent(0).apply(127));
    }
}
