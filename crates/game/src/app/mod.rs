pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
pub(crate) mod scenario;
