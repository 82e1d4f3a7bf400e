use crate::constants::DPRP_EPP_SET_TIMEOUT;
use crate::sys::Dprp;

/// Feature bits reported by `DeppGetPortProperties`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortProperties {
    bits: Dprp,
}

impl PortProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: Dprp) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> Dprp {
        self.bits
    }

    pub fn supports_set_timeout(&self) -> bool {
        self.has_flag(DPRP_EPP_SET_TIMEOUT)
    }

    pub fn set_supports_set_timeout(&mut self, enabled: bool) {
        if enabled {
            self.bits |= DPRP_EPP_SET_TIMEOUT;
        } else {
            self.bits &= !DPRP_EPP_SET_TIMEOUT;
        }
    }

    /// Bits this crate has no name for.
    pub fn unknown_bits(&self) -> Dprp {
        self.bits & !DPRP_EPP_SET_TIMEOUT
    }

    fn has_flag(&self, mask: Dprp) -> bool {
        self.bits & mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_timeout_flag_roundtrip() {
        let mut properties = PortProperties::new();
        assert!(!properties.supports_set_timeout());
        properties.set_supports_set_timeout(true);
        assert_eq!(properties.bits(), DPRP_EPP_SET_TIMEOUT);
        properties.set_supports_set_timeout(false);
        assert_eq!(properties.bits(), 0);
    }

    #[test]
    fn unknown_bits_are_preserved() {
        let properties = PortProperties::from_bits(0x0000_0105);
        assert!(properties.supports_set_timeout());
        assert_eq!(properties.unknown_bits(), 0x0000_0104);
    }
}
