mod error;
mod param;
mod registry;
mod resolve;

pub use error::{ParamError, ValueFallback};
pub use param::{Choice, DataType, Param, MASK};
pub use registry::ParamRegistry;
pub use resolve::expand_env;

pub mod prelude {
    pub use super::{Choice, DataType, Param, ParamError, ParamRegistry, ValueFallback};
}
