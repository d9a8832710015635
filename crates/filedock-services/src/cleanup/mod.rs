pub mod service;

pub use service::OrphanSweepService;
