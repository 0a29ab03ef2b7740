pub mod output;

pub use output::{FileOutput, LogOutput, OutputError, SwitchOutput};
