pub mod flush;
pub mod recorder;
pub mod worker;
