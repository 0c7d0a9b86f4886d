use rand::RngExt;

use crate::consts::{MAX_PIN_OFFSET_PX, PARCHMENT_VARIANTS};
use crate::domain::{PinVariant, VisualSeed};

/// Roll the cosmetic look of a new quest card.
pub fn roll() -> VisualSeed {
    let mut rng = rand::rng();
    VisualSeed {
        parchment_variant: rng.random_range(1..=PARCHMENT_VARIANTS),
        pin_variant: PinVariant::ALL[rng.random_range(0..PinVariant::ALL.len())],
        pin_offset_px: rng.random_range(-MAX_PIN_OFFSET_PX..=MAX_PIN_OFFSET_PX),
    }
}
