mod blocking;
mod non_blocking;

pub use blocking::BlockingOutboundConnectionCache;
pub use non_blocking::NonBlockingOutboundConnectionCache;
