pub mod db_api;

pub use db_api::{DbApi, LoadReport};
