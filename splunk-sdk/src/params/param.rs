use super::error::ParamError;
use crate::rest::conf_name;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strum::{AsRefStr, Display, EnumString};

pub const MASK: &str = "********";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Boolean,
    Number,
}

/// One allowed value of an enumerated parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub visible_value: String,
}

#[derive(Debug, Default)]
struct ParamState {
    actual_value: Option<String>,
    data_type: DataType,
    required: bool,
    sensitive: bool,
    placeholder: String,
    choices: Vec<Choice>,
    custom_properties: BTreeMap<String, String>,
}

/// A named, typed setting of a script.
///
/// Identity (name, title, description, location, default) is fixed at
/// creation. Everything else, including the forced value, sits behind the
/// parameter's own reader-writer lock, so a `Param` can be configured on one
/// thread and read from any number of workers without outside locking.
pub struct Param {
    name: String,
    title: String,
    description: String,
    config_file: String,
    stanza: String,
    default_value: String,
    state: RwLock<ParamState>,
}

impl Param {
    /// Fails when `name`, `title` or `config_file` is blank. A `.conf` suffix
    /// on `config_file` is dropped; an empty `stanza` means any stanza.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config_file: &str,
        stanza: &str,
        name: &str,
        title: &str,
        description: &str,
        default_value: &str,
        required: bool,
        sensitive: bool,
    ) -> Result<Self, ParamError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParamError::invalid_param("name", "must not be empty"));
        }
        if title.trim().is_empty() {
            return Err(ParamError::invalid_param(name, "title must not be empty"));
        }
        let config_file = conf_name(config_file);
        if config_file.is_empty() {
            return Err(ParamError::invalid_param(name, "config file must not be empty"));
        }

        Ok(Self {
            name: name.to_string(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            config_file: config_file.to_string(),
            stanza: stanza.trim().to_string(),
            default_value: default_value.to_string(),
            state: RwLock::new(ParamState {
                required,
                sensitive,
                ..Default::default()
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, ParamState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ParamState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn stanza(&self) -> &str {
        &self.stanza
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    /// Adds an allowed value, or relabels it when `value` is already a choice.
    /// A blank `visible_value` shows `value` itself.
    pub fn add_choice(&self, value: &str, visible_value: &str) -> Result<(), ParamError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ParamError::invalid_param(
                &self.name,
                "choice value must not be empty",
            ));
        }
        let visible_value = match visible_value.trim() {
            "" => value,
            visible => visible,
        };

        let mut state = self.write();
        match state.choices.iter_mut().find(|c| c.value == value) {
            Some(choice) => choice.visible_value = visible_value.to_string(),
            None => state.choices.push(Choice {
                value: value.to_string(),
                visible_value: visible_value.to_string(),
            }),
        }
        Ok(())
    }

    pub fn choices(&self) -> Vec<Choice> {
        self.read().choices.clone()
    }

    /// Sets the run-time value. With choices defined, the trimmed value must be
    /// one of them. The value is stored as given; expansion happens on read.
    pub fn force_value(&self, value: &str) -> Result<(), ParamError> {
        let value = value.trim();
        let mut state = self.write();
        self.check_choice(&state, value)?;
        state.actual_value = Some(value.to_string());
        Ok(())
    }

    /// Whether `force_value(value)` would succeed, without changing anything.
    pub fn check_value(&self, value: &str) -> Result<(), ParamError> {
        self.check_choice(&self.read(), value.trim())
    }

    fn check_choice(&self, state: &ParamState, value: &str) -> Result<(), ParamError> {
        if state.choices.is_empty() || state.choices.iter().any(|c| c.value == value) {
            return Ok(());
        }
        let choices = state
            .choices
            .iter()
            .map(|c| format!("{:?} ({})", c.value, c.visible_value))
            .join(", ");
        Err(ParamError::InvalidChoice {
            param: self.to_string(),
            value: if state.sensitive {
                MASK.to_string()
            } else {
                value.to_string()
            },
            choices,
        })
    }

    /// Pins the default as the run-time value, bypassing choice validation.
    pub(crate) fn force_default(&self) {
        self.write().actual_value = Some(self.default_value.clone());
    }

    pub fn has_forced_value(&self) -> bool {
        self.read().actual_value.is_some()
    }

    /// The forced value exactly as stored, without expansion.
    pub fn forced_value(&self) -> Option<String> {
        self.read().actual_value.clone()
    }

    pub fn set_data_type(&self, data_type: &str) -> Result<(), ParamError> {
        let data_type = DataType::from_str(data_type.trim()).map_err(|_| {
            ParamError::invalid_param(
                &self.name,
                &format!(
                    "data type {:?} is not one of string, boolean or number",
                    data_type
                ),
            )
        })?;
        self.write().data_type = data_type;
        Ok(())
    }

    pub fn data_type(&self) -> DataType {
        self.read().data_type
    }

    pub fn set_sensitive(&self) {
        self.write().sensitive = true;
    }

    pub fn is_sensitive(&self) -> bool {
        self.read().sensitive
    }

    pub fn set_required(&self) {
        self.write().required = true;
    }

    pub fn is_required(&self) -> bool {
        self.read().required
    }

    pub fn set_placeholder(&self, placeholder: &str) {
        self.write().placeholder = placeholder.to_string();
    }

    pub fn placeholder(&self) -> String {
        self.read().placeholder.clone()
    }

    /// Free-form metadata, e.g. the UI widget to render. Blank names are ignored.
    pub fn set_custom_property(&self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        self.write()
            .custom_properties
            .insert(name.to_string(), value.to_string());
    }

    /// Empty when the property was never set.
    pub fn custom_property(&self, name: &str) -> String {
        self.read()
            .custom_properties
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn custom_properties(&self) -> BTreeMap<String, String> {
        self.read().custom_properties.clone()
    }

    /// `value`, or a mask when the parameter is sensitive. Use it for anything
    /// that gets logged or printed.
    pub fn masked<'a>(&self, value: &'a str) -> &'a str {
        if self.is_sensitive() {
            MASK
        } else {
            value
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.config_file.as_str(), self.stanza.as_str()) {
            ("", _) => write!(f, "{}", self.name),
            (conf, "") => write!(f, "{}[*]/{}", conf, self.name),
            (conf, stanza) => write!(f, "{}[{}]/{}", conf, stanza, self.name),
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        let shown = |value: &str| {
            if state.sensitive {
                MASK.to_string()
            } else {
                value.to_string()
            }
        };
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("config_file", &self.config_file)
            .field("stanza", &self.stanza)
            .field("default_value", &shown(&self.default_value))
            .field("actual_value", &state.actual_value.as_deref().map(shown))
            .field("data_type", &state.data_type)
            .field("required", &state.required)
            .field("sensitive", &state.sensitive)
            .field("choices", &state.choices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn param() -> Param {
        Param::new(
            "alert_actions.conf",
            "notify",
            "priority",
            "Priority",
            "How urgent the notification is",
            "low",
            false,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_new_requires_name_title_and_config_file() {
        assert!(Param::new("inputs", "", " ", "Title", "", "", false, false).is_err());
        assert!(Param::new("inputs", "", "name", "", "", "", false, false).is_err());
        assert!(Param::new(".conf", "", "name", "Title", "", "", false, false).is_err());
        assert!(Param::new("", "", "name", "Title", "", "", false, false).is_err());
    }

    #[test]
    fn test_conf_suffix_is_stripped() {
        assert_eq!("alert_actions", param().config_file());
    }

    #[test]
    fn test_display() {
        assert_eq!("alert_actions[notify]/priority", param().to_string());
        let any_stanza = Param::new("inputs", "", "interval", "Interval", "", "60", false, false)
            .unwrap();
        assert_eq!("inputs[*]/interval", any_stanza.to_string());
    }

    #[test]
    fn test_force_value_without_choices() {
        let param = param();
        assert!(!param.has_forced_value());
        param.force_value("  anything goes ").unwrap();
        assert_eq!(Some("anything goes".to_string()), param.forced_value());
    }

    #[test]
    fn test_force_value_with_choices() {
        let param = param();
        param.add_choice("low", "Low").unwrap();
        param.add_choice("high", "").unwrap();

        param.force_value(" high ").unwrap();
        assert_eq!(Some("high".to_string()), param.forced_value());

        let err = param.force_value("urgent").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("\"low\" (Low)"));
        assert!(message.contains("\"high\" (high)"));
        assert_eq!(Some("high".to_string()), param.forced_value());

        assert!(param.check_value("low").is_ok());
        assert!(param.check_value("urgent").is_err());
        assert_eq!(Some("high".to_string()), param.forced_value());
    }

    #[test]
    fn test_add_choice_overwrites_label() {
        let param = param();
        param.add_choice("low", "Low").unwrap();
        param.add_choice(" low ", "Lowest").unwrap();

        assert_eq!(
            vec![Choice {
                value: "low".to_string(),
                visible_value: "Lowest".to_string()
            }],
            param.choices()
        );
    }

    #[test]
    fn test_add_choice_rejects_blank_value() {
        assert!(matches!(
            param().add_choice("  ", "Nothing"),
            Err(ParamError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_set_data_type() {
        let param = param();
        assert_eq!(DataType::String, param.data_type());
        param.set_data_type("number").unwrap();
        assert_eq!(DataType::Number, param.data_type());
        assert!(param.set_data_type("date").is_err());
        assert_eq!(DataType::Number, param.data_type());
    }

    #[test]
    fn test_flags_are_idempotent() {
        let param = param();
        param.set_required();
        param.set_required();
        param.set_sensitive();
        assert!(param.is_required());
        assert!(param.is_sensitive());
    }

    #[test]
    fn test_custom_properties() {
        let param = param();
        param.set_custom_property("widget", "dropdown");
        param.set_custom_property("", "ignored");
        assert_eq!("dropdown", param.custom_property("widget"));
        assert_eq!("", param.custom_property("missing"));
        assert_eq!(1, param.custom_properties().len());
    }

    #[test]
    fn test_sensitive_values_are_masked() {
        let param = Param::new("inputs", "", "api_key", "API key", "", "", true, true).unwrap();
        param.force_value("hunter2").unwrap();
        assert_eq!(MASK, param.masked("hunter2"));
        assert!(!format!("{:?}", param).contains("hunter2"));
    }

    #[test]
    fn test_concurrent_choice_reads_and_writes() {
        let param = Arc::new(param());
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    param.add_choice(&format!("value-{}", i), "").unwrap();
                }
            });
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let choices = param.choices();
                        for (i, choice) in choices.iter().enumerate() {
                            assert_eq!(format!("value-{}", i), choice.value);
                        }
                    }
                });
            }
        });
        assert_eq!(200, param.choices().len());
    }

    #[test]
    fn test_concurrent_force_and_read() {
        let param = Arc::new(param());
        param.add_choice("a", "").unwrap();
        param.add_choice("b", "").unwrap();
        std::thread::scope(|scope| {
            for name in ["a", "b"] {
                let param = param.clone();
                scope.spawn(move || {
                    for _ in 0..500 {
                        param.force_value(name).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..500 {
                    if let Some(value) = param.forced_value() {
                        assert!(value == "a" || value == "b");
                    }
                }
            });
        });
    }
}
