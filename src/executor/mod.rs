mod default_executor;
mod executor;
mod pipeline;
mod process;
mod redirect;

pub mod builtin;
pub mod jobs;

pub use default_executor::DefaultExecutor;
pub use executor::{ExecError, ExecStatus, Executor};
pub use jobs::{Job, JobTable};
pub use pipeline::flatten_pipeline;
pub use redirect::{RedirectHandler, SavedFds};
