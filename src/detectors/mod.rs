//! Bias detectors.
//!
//! Each detector is a pure function of a [`TradeSet`] plus fixed thresholds.
//! Detectors never fail: sparse input yields a not-detected result.

pub mod loss_aversion;
pub mod overtrading;
pub mod revenge;

use crate::bias::{BiasKind, BiasResult};
use crate::trade::TradeSet;

pub use loss_aversion::LossAversionDetector;
pub use overtrading::OvertradingDetector;
pub use revenge::RevengeTradingDetector;

pub trait BiasDetector: Send + Sync {
    fn kind(&self) -> BiasKind;
    fn detect(&self, trades: &TradeSet) -> BiasResult;
}

/// Detector for `kind`.
pub fn detector_for(kind: BiasKind) -> &'static dyn BiasDetector {
    match kind {
        BiasKind::Overtrading => &OvertradingDetector,
        BiasKind::LossAversion => &LossAversionDetector,
        BiasKind::RevengeTrading => &RevengeTradingDetector,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_for_matches_kind() {
        for kind in BiasKind::ALL {
            assert_eq!(detector_for(kind).kind(), kind);
        }
    }
}
