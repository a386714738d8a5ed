use super::error::ScriptError;
use crate::client::Client;
use crate::params::{expand_env, Param, ParamRegistry};
use educe::Educe;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info};

pub const INPUTS_CONF: &str = "inputs";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlParam {
    pub name: String,
    #[serde(rename = "$value", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlStanza {
    pub name: String,
    #[serde(rename = "param", default)]
    pub params: Vec<XmlParam>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlConfiguration {
    #[serde(rename = "stanza", default)]
    pub stanzas: Vec<XmlStanza>,
}

/// The `<input>` document a modular input receives on stdin at startup.
#[derive(Educe, Clone, Default, Deserialize)]
#[educe(Debug)]
pub struct InputConfig {
    #[serde(default)]
    pub server_host: String,
    #[serde(default)]
    pub server_uri: String,
    #[serde(default)]
    #[educe(Debug(ignore))]
    pub session_key: String,
    #[serde(default)]
    pub checkpoint_dir: String,
    #[serde(default)]
    pub configuration: XmlConfiguration,
}

impl InputConfig {
    pub fn stanzas(&self) -> Vec<InputStanza> {
        self.configuration
            .stanzas
            .iter()
            .map(InputStanza::from)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlParamList {
    pub name: String,
    #[serde(rename = "value", default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlItem {
    pub name: String,
    #[serde(rename = "param", default)]
    pub params: Vec<XmlParam>,
    #[serde(rename = "param_list", default)]
    pub param_lists: Vec<XmlParamList>,
}

/// The `<items>` document sent with `--validate-arguments`.
#[derive(Educe, Clone, Default, Deserialize)]
#[educe(Debug)]
pub struct ValidationRequest {
    #[serde(default)]
    pub server_host: String,
    #[serde(default)]
    pub server_uri: String,
    #[serde(default)]
    #[educe(Debug(ignore))]
    pub session_key: String,
    #[serde(default)]
    pub checkpoint_dir: String,
    #[serde(rename = "item", default)]
    pub items: Vec<XmlItem>,
}

/// One configured instance of the input, e.g. `my_input://prod`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputStanza {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl InputStanza {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The value supplied for `param`, or its default, with environment
    /// variables expanded the same way `Param::get_value` does.
    pub fn value_of(&self, param: &Param) -> String {
        match self.get(param.name()) {
            Some(value) => expand_env(value.trim()),
            None => expand_env(param.default_value()),
        }
    }
}

impl From<&XmlStanza> for InputStanza {
    fn from(stanza: &XmlStanza) -> Self {
        Self {
            name: stanza.name.clone(),
            params: stanza
                .params
                .iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect(),
        }
    }
}

impl From<&XmlItem> for InputStanza {
    /// Multivalue parameters are joined with commas.
    fn from(item: &XmlItem) -> Self {
        let mut params: BTreeMap<String, String> = item
            .params
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        for list in &item.param_lists {
            params.insert(list.name.clone(), list.values.join(","));
        }
        Self {
            name: item.name.clone(),
            params,
        }
    }
}

/// A modular input. Its parameters live in `inputs.conf`, in whichever stanza
/// the platform hands over.
#[derive(Debug, Default)]
pub struct ModularInput {
    registry: ParamRegistry,
}

impl ModularInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ParamRegistry {
        &self.registry
    }

    pub fn register_param(
        &mut self,
        name: &str,
        title: &str,
        description: &str,
        default_value: &str,
        required: bool,
        sensitive: bool,
    ) -> Result<Arc<Param>, ScriptError> {
        let param = Param::new(
            INPUTS_CONF,
            "",
            name,
            title,
            description,
            default_value,
            required,
            sensitive,
        )?;
        Ok(self.registry.register_param(param)?)
    }

    pub fn register_global_param(&mut self, param: Param) -> Result<Arc<Param>, ScriptError> {
        Ok(self.registry.register_global_param(param)?)
    }

    pub fn param(&self, name: &str) -> Option<Arc<Param>> {
        self.registry.get(name)
    }

    pub fn read_config<R: Read>(&self, reader: R) -> Result<InputConfig, ScriptError> {
        read_xml(reader, "input configuration")
    }

    pub fn read_validation<R: Read>(&self, reader: R) -> Result<ValidationRequest, ScriptError> {
        read_xml(reader, "validation request")
    }

    /// Checks every item of a validation request against the registered
    /// parameters.
    pub fn validate(&self, request: &ValidationRequest) -> Result<(), ScriptError> {
        for item in &request.items {
            self.registry.validate(&InputStanza::from(item).params)?;
        }
        Ok(())
    }

    /// Forces the stanza's values onto the registered parameters. Use it when
    /// the platform runs one process per stanza.
    pub fn apply_stanza(&self, stanza: &InputStanza) -> Result<(), ScriptError> {
        info!(target: "script", "Applying stanza {}", stanza.name);
        self.registry.apply(&stanza.params)?;
        Ok(())
    }

    pub fn client(&self, config: &InputConfig) -> Result<Client, ScriptError> {
        Ok(Client::from_session(&config.server_uri, &config.session_key)?)
    }

    /// Runs `worker` once per stanza, each on its own task, and waits for all
    /// of them. Stanzas are validated up front but never forced onto the
    /// shared parameters; workers read their values from the stanza.
    pub async fn run_stanzas<F, Fut>(&self, config: &InputConfig, worker: F) -> Result<(), ScriptError>
    where
        F: Fn(InputStanza, Client) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let client = self.client(config)?;
        let stanzas = config.stanzas();
        let total = stanzas.len();
        let mut failures = Vec::new();
        let mut handles = Vec::with_capacity(total);

        for stanza in stanzas {
            if let Err(error) = self.registry.validate(&stanza.params) {
                error!(target: "script", "Skipping stanza {}: {}", stanza.name, error);
                failures.push(ScriptError::Param(error));
                continue;
            }
            info!(target: "script", "Starting stanza {}", stanza.name);
            let name = stanza.name.clone();
            handles.push((name, tokio::spawn(worker(stanza, client.clone()))));
        }

        for (stanza, handle) in handles {
            let error = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(join_error) => anyhow::Error::new(join_error),
            };
            error!(target: "script", "Stanza {} failed: {:?}", stanza, error);
            failures.push(ScriptError::Worker { stanza, error });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScriptError::Stanzas { total, failures })
        }
    }
}

fn read_xml<T, R>(mut reader: R, what: &'static str) -> Result<T, ScriptError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut document = String::new();
    reader
        .read_to_string(&mut document)
        .map_err(|error| ScriptError::Io { what, error })?;
    serde_xml_rs::from_str(&document).map_err(|error| ScriptError::Xml { what, error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamError;
    use anyhow::{bail, Result};
    use std::sync::Mutex;

    const CONFIG: &str = r#"<input>
  <server_host>myHost</server_host>
  <server_uri>https://127.0.0.1:8089</server_uri>
  <session_key>123102983109283019283</session_key>
  <checkpoint_dir>/opt/splunk/var/lib/splunk/modinputs</checkpoint_dir>
  <configuration>
    <stanza name="weather://berlin">
      <param name="city">Berlin</param>
      <param name="interval">300</param>
    </stanza>
    <stanza name="weather://oslo">
      <param name="city">Oslo</param>
    </stanza>
  </configuration>
</input>"#;

    const VALIDATION: &str = r#"<items>
  <server_host>myHost</server_host>
  <server_uri>https://127.0.0.1:8089</server_uri>
  <session_key>123102983109283019283</session_key>
  <checkpoint_dir>/opt/splunk/var/lib/splunk/modinputs</checkpoint_dir>
  <item name="berlin">
    <param name="city">Berlin</param>
    <param_list name="units">
      <value>metric</value>
      <value>kelvin</value>
    </param_list>
  </item>
</items>"#;

    fn input() -> Result<ModularInput> {
        let mut input = ModularInput::new();
        input.register_param("city", "City", "", "", true, false)?;
        input.register_param("interval", "Interval", "Seconds between polls", "60", false, false)?;
        Ok(input)
    }

    #[test]
    fn test_read_config() -> Result<()> {
        let config = input()?.read_config(CONFIG.as_bytes())?;

        assert_eq!("https://127.0.0.1:8089", config.server_uri);
        assert_eq!("/opt/splunk/var/lib/splunk/modinputs", config.checkpoint_dir);
        let stanzas = config.stanzas();
        assert_eq!(2, stanzas.len());
        assert_eq!("weather://berlin", stanzas[0].name);
        assert_eq!(Some("300"), stanzas[0].get("interval"));
        assert!(!format!("{:?}", config).contains("123102983109283019283"));
        Ok(())
    }

    #[test]
    fn test_read_validation() -> Result<()> {
        let input = input()?;
        let request = input.read_validation(VALIDATION.as_bytes())?;

        let stanza = InputStanza::from(&request.items[0]);
        assert_eq!(Some("metric,kelvin"), stanza.get("units"));
        input.validate(&request)?;
        Ok(())
    }

    #[test]
    fn test_validation_rejects_bad_choice() -> Result<()> {
        let mut input = input()?;
        let units = input.register_param("units", "Units", "", "metric", false, false)?;
        units.add_choice("metric", "Metric")?;
        units.add_choice("imperial", "Imperial")?;

        let request = input.read_validation(VALIDATION.as_bytes())?;
        assert!(matches!(
            input.validate(&request),
            Err(ScriptError::Param(ParamError::InvalidChoice { .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_value_of_matches_get_value() -> Result<()> {
        let mut input = ModularInput::new();
        let data_dir =
            input.register_param("data_dir", "Data directory", "", "${PATH}/default", false, false)?;
        let stanza = InputStanza {
            name: "weather://berlin".to_string(),
            params: BTreeMap::from([("data_dir".to_string(), " $PATH/in ".to_string())]),
        };
        let omitted = InputStanza {
            name: "weather://oslo".to_string(),
            params: BTreeMap::new(),
        };

        let expected = format!("{}/in", std::env::var("PATH").unwrap_or_default());
        assert_eq!(expected, stanza.value_of(&data_dir));
        input.apply_stanza(&stanza)?;
        assert_eq!(data_dir.get_value(None).await?, stanza.value_of(&data_dir));

        assert!(!omitted.value_of(&data_dir).contains('$'));
        input.apply_stanza(&omitted)?;
        assert_eq!(data_dir.get_value(None).await?, omitted.value_of(&data_dir));
        Ok(())
    }

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed"))
        }
    }

    #[test]
    fn test_unreadable_input_is_io_error() -> Result<()> {
        assert!(matches!(
            input()?.read_config(BrokenPipe),
            Err(ScriptError::Io { what: "input configuration", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_malformed_config() -> Result<()> {
        assert!(matches!(
            input()?.read_config("<input><configuration>".as_bytes()),
            Err(ScriptError::Xml { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_stanza() -> Result<()> {
        let input = input()?;
        let config = input.read_config(CONFIG.as_bytes())?;
        input.apply_stanza(&config.stanzas()[1])?;

        assert_eq!("Oslo", input.param("city").unwrap().get_value(None).await?);
        assert_eq!("60", input.param("interval").unwrap().get_value(None).await?);
        assert_eq!("inputs[*]/city", input.param("city").unwrap().to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_run_stanzas_fans_out() -> Result<()> {
        let input = input()?;
        let config = input.read_config(CONFIG.as_bytes())?;
        let interval = input.param("interval").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let collected = seen.clone();
        input
            .run_stanzas(&config, move |stanza, _client| {
                let seen = collected.clone();
                let interval = stanza.value_of(&interval);
                async move {
                    seen.lock().unwrap().push((stanza.name, interval));
                    Ok(())
                }
            })
            .await?;

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            vec![
                ("weather://berlin".to_string(), "300".to_string()),
                ("weather://oslo".to_string(), "60".to_string()),
            ],
            seen
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_run_stanzas_collects_failures() -> Result<()> {
        let input = input()?;
        let config = input.read_config(CONFIG.as_bytes())?;

        let result = input
            .run_stanzas(&config, |stanza, _client| async move {
                if stanza.name.ends_with("oslo") {
                    bail!("station offline");
                }
                Ok(())
            })
            .await;

        match result {
            Err(ScriptError::Stanzas { total, failures }) => {
                assert_eq!(2, total);
                assert_eq!(1, failures.len());
                assert!(failures[0].to_string().contains("weather://oslo"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        Ok(())
    }
}
