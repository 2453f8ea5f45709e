#![allow(dead_code)]

pub mod scripted_source;
pub mod strategies;

pub use scripted_source::*;
pub use strategies::*;
