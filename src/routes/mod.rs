pub mod plan;
pub mod storage;
pub mod util;
