pub mod pool;
pub mod transcoder;
