mod alert;
mod error;
mod modinput;

pub use alert::{AlertAction, AlertPayload, FieldValue, ALERT_ACTIONS_CONF};
pub use error::ScriptError;
pub use modinput::{
    InputConfig, InputStanza, ModularInput, ValidationRequest, XmlConfiguration, XmlItem,
    XmlParam, XmlParamList, XmlStanza, INPUTS_CONF,
};

pub mod prelude {
    pub use super::{
        AlertAction, AlertPayload, FieldValue, InputConfig, InputStanza, ModularInput,
        ScriptError, ValidationRequest,
    };
}
