pub mod consts;
pub mod modules;
pub mod types;
pub mod utils;
