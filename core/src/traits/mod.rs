pub mod provider;
pub mod tool;

pub use provider::Provider;
pub use tool::{
    ParamType, ParamValue, Parameter, Tool, ToolArgs, ToolCategory, ToolDefinition, ToolHandler,
};
