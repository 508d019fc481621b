pub mod config;
pub mod errors;
pub mod trading_calender;
