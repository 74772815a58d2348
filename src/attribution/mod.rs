//! # Attribution Engine
//!
//! [`Linker`] credits orders to the touchpoints that preceded them and
//! [`Aggregator`] rolls order revenue up by the credited touchpoint's
//! marketing dimensions.

pub mod aggregator;
pub mod linker;
pub mod window;

pub use aggregator::{Aggregator, RevenueQuery, RevenueRow};
pub use linker::{LinkOptions, Linker, PlannedAttribution, plan_attributions};
pub use window::{DIRECT_KEY, GroupBy, UnknownGroupBy};
