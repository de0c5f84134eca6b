pub mod executor;
pub mod pass;
pub mod scheduler;
pub mod sequence;
pub mod types;

pub use executor::RequestExecutor;
pub use pass::Runner;
pub use scheduler::{Repeat, Scheduler, SchedulerConfig};
pub use sequence::RequestSequence;
pub use types::ResponseResult;
