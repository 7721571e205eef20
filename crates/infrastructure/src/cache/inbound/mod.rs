mod blocking;
mod non_blocking;

pub use blocking::BlockingInboundConnectionCache;
pub use non_blocking::NonBlockingInboundConnectionCache;
