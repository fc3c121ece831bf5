//! Delay buffer module
//!
//! This module provides the bounded queue that sits between acquisition and
//! processing.

mod delay_buffer;

pub use delay_buffer::DelayBuffer;
