//! Clock Module
//!
//! Host time facilities the transport is driven by:
//! - Elapsed-time sources (stopwatches)
//! - Periodic tickers that invoke the transport's tick handler

pub mod stopwatch;
pub mod ticker;

pub use stopwatch::{ManualStopwatch, Stopwatch, SystemStopwatch};
pub use ticker::{IntervalTicker, ManualTicker, TickCallback, Ticker};
