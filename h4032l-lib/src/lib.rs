pub mod acquisition;
pub mod constants;
pub mod device;
pub mod error;
pub mod packet;
pub mod scheduler;
pub mod transforms;
pub mod trigger;

// Re-export the H4032L struct for easy access
pub use device::H4032L;
