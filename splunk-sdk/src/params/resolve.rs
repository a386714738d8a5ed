use super::error::{ParamError, ValueFallback};
use super::param::Param;
use crate::client::Client;
use crate::rest::{Namespace, Properties};
use tracing::{debug, warn};

/// Expands `$VAR` and `${VAR}` from the process environment. Unset variables
/// expand to an empty string.
pub fn expand_env(value: &str) -> String {
    shellexpand::env_with_context_no_errors(value, |var| {
        Some(std::env::var(var).unwrap_or_default())
    })
    .into_owned()
}

impl Param {
    /// Resolves the value of this parameter.
    ///
    /// A forced value wins. Without one, the value is read from the server's
    /// configuration in the system context. When that is impossible the error
    /// carries the expanded default to run with in degraded mode.
    pub async fn get_value(&self, client: Option<&Client>) -> Result<String, ValueFallback> {
        self.resolve(client, &Namespace::system()).await
    }

    /// Same as [`Param::get_value`], scoped to `owner` and `app`.
    pub async fn get_value_ns(
        &self,
        client: Option<&Client>,
        owner: &str,
        app: &str,
    ) -> Result<String, ValueFallback> {
        self.resolve(client, &Namespace::scoped(owner, app)).await
    }

    async fn resolve(
        &self,
        client: Option<&Client>,
        namespace: &Namespace,
    ) -> Result<String, ValueFallback> {
        // Read and release before any network round trip.
        if let Some(value) = self.forced_value() {
            return Ok(expand_env(&value));
        }

        let Some(client) = client else {
            return Err(self.fallback(ParamError::NoClient {
                param: self.to_string(),
            }));
        };
        if self.stanza().is_empty() {
            return Err(self.fallback(ParamError::invalid_param(
                self.name(),
                "a stanza is required to read the value from the server",
            )));
        }

        debug!(target: "params", "Reading {} in {}", self, namespace.services_ns_url());
        Properties::namespaced(client, self.config_file(), namespace)
            .get_property(self.stanza(), self.name())
            .await
            .map(|value| expand_env(&value))
            .map_err(|error| {
                self.fallback(ParamError::Remote {
                    param: self.to_string(),
                    error,
                })
            })
    }

    fn fallback(&self, error: ParamError) -> ValueFallback {
        let fallback = expand_env(self.default_value());
        warn!(
            target: "params",
            "{}, using default {:?}",
            error,
            self.masked(&fallback)
        );
        ValueFallback { fallback, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockHttpTransport, RestResponse};
    use crate::rest::test_support::client_with;
    use anyhow::Result;
    use serde_json::json;

    fn global_param() -> Param {
        Param::new(
            "myapp.conf",
            "settings",
            "threshold",
            "Threshold",
            "",
            "${SPLUNK_SDK_TEST_UNSET_VAR}10",
            false,
            false,
        )
        .unwrap()
    }

    fn settings_body() -> String {
        json!({"entry": [{"name": "threshold", "content": "42"}]}).to_string()
    }

    #[test]
    fn test_expand_env() {
        let home = std::env::var("PATH").unwrap_or_default();
        assert_eq!(format!("{}:x", home), expand_env("${PATH}:x"));
        assert_eq!("a--b", expand_env("a-$SPLUNK_SDK_TEST_UNSET_VAR-b"));
        assert_eq!("plain", expand_env("plain"));
    }

    #[tokio::test]
    async fn test_forced_value_is_returned_without_client() -> Result<()> {
        let param = global_param();
        param.force_value("7")?;
        assert_eq!("7", param.get_value(None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_forced_value_skips_remote_lookup() -> Result<()> {
        let param = global_param();
        param.force_value("7")?;
        let client = client_with(MockHttpTransport::new());
        assert_eq!("7", param.get_value(Some(&client)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_client_falls_back_to_default() {
        let err = global_param().get_value(None).await.unwrap_err();
        assert_eq!("10", err.fallback);
        assert!(matches!(err.error, ParamError::NoClient { .. }));
    }

    #[tokio::test]
    async fn test_remote_value_in_system_context() -> Result<()> {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|request| {
                request.url.path() == "/servicesNS/nobody/system/properties/myapp/settings"
            })
            .returning(|_| Ok(RestResponse::new(200, settings_body())));
        let client = client_with(transport);

        assert_eq!("42", global_param().get_value(Some(&client)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_value_in_namespace() -> Result<()> {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|request| {
                request.url.path() == "/servicesNS/admin/search/properties/myapp/settings"
            })
            .returning(|_| Ok(RestResponse::new(200, settings_body())));
        let client = client_with(transport);

        let value = global_param()
            .get_value_ns(Some(&client), "admin", "search")
            .await?;
        assert_eq!("42", value);
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_default() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(RestResponse::new(404, "")));
        let client = client_with(transport);

        let err = global_param().get_value(Some(&client)).await.unwrap_err();
        assert_eq!("10", err.into_fallback());
    }

    #[tokio::test]
    async fn test_empty_stanza_cannot_be_read_remotely() {
        let param = Param::new("inputs", "", "interval", "Interval", "", "60", false, false)
            .unwrap();
        let client = client_with(MockHttpTransport::new());

        let err = param.get_value(Some(&client)).await.unwrap_err();
        assert_eq!("60", err.fallback);
        assert!(matches!(err.error, ParamError::InvalidParam { .. }));
    }

    #[tokio::test]
    async fn test_rejected_force_keeps_previous_value() -> Result<()> {
        let param = global_param();
        param.add_choice("5", "")?;
        param.add_choice("7", "")?;
        param.force_value("5")?;
        assert!(param.force_value("6").is_err());
        assert_eq!("5", param.get_value(None).await?);
        Ok(())
    }
}
