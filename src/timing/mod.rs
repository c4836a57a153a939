//! Time-driven primitives of the round engine: the pausable countdown and
//! the bounded collection window it can freeze.

pub mod pausable;
pub mod window;

pub use pausable::{PausableTimer, TimerOutcome};
pub use window::{CollectionWindow, WindowControl};
