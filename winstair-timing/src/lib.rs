pub mod timer;

pub use timer::{HighPrecisionTimer, StaticPeriod, Timer, VirtualTimer, WaitAccuracy, WaitStats};
