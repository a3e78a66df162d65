pub mod product;
pub mod subscriber;

// Re-exports for convenience
pub use product::*;
pub use subscriber::*;
