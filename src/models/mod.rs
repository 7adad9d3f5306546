use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

pub mod price_event;
pub mod tracked_item;

// Re-exports for convenience
pub use price_event::*;
pub use tracked_item::*;

/// Number of fractional digits every stored money value carries.
pub const MONEY_SCALE: u32 = 2;

// Helper function to generate UUIDs in the format expected by the database
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Round half-up to cents and pin the scale so `10` is held as `10.00`.
pub fn to_money(value: Decimal) -> Decimal {
    let mut money = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    money.rescale(MONEY_SCALE);
    money
}
