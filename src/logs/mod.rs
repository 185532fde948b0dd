// Logs module - Output targets for the supervised child

mod sink;

pub use sink::{OutputSink, OutputSinks, OutputTarget, StdStream};
