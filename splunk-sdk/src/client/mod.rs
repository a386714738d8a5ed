mod error;
mod form;
mod options;
mod rest_client;
mod transport;

pub use error::RestError;
pub use form::FormParams;
pub use options::ClientOptions;
pub use rest_client::{Client, LOGIN_PATH, OUTPUT_MODE};
pub use transport::{
    Auth, BodyHandling, DefaultHttpTransport, HttpTransport, Method, MockHttpTransport,
    RequestBody, RestRequest, RestResponse, DEFAULT_TIMEOUT,
};

pub mod prelude {
    pub use super::{
        Auth, Client, ClientOptions, FormParams, HttpTransport, Method, MockHttpTransport,
        RequestBody, RestError, RestRequest, RestResponse,
    };
}
