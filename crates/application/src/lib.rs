//! Ferrous ORB Application Layer
pub mod ports;
