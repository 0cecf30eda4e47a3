//! Virtual device blueprints.
//!
//! Every process unit exposes the same three variables and a reset method,
//! so boilers and pumps share one blueprint.

mod process_unit;

pub use process_unit::{
    INITIAL_PRESSURE, INITIAL_TEMPERATURE, PRESSURE, RESET_DEVICE, RUNNING, TEMPERATURE,
    process_unit, reset_device,
};
