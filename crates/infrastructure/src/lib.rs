//! Ferrous ORB Infrastructure Layer
pub mod cache;
pub mod queue;
pub mod transport;
