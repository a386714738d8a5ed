pub mod client;
pub mod params;
pub mod rest;
pub mod script;
pub mod shared;

pub mod prelude {
    pub use crate::client::prelude::*;
    pub use crate::params::prelude::*;
    pub use crate::rest::prelude::*;
    pub use crate::script::prelude::*;
    pub use crate::shared::prelude::*;
}
