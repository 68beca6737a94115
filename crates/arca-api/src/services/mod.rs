pub mod access_gate;
pub mod activity;
pub mod bulk;
