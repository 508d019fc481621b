pub mod bar;

pub use bar::{DailyBar, EventDay, EventReason, IntradayBar};
