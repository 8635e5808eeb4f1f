pub mod credential;
pub mod error;
mod request;
pub mod resource_id;
pub mod scale_set_vms;

use credential::TokenCredential;
use reqwest::ClientBuilder;
use std::fmt;
use std::sync::Arc;

pub use resource_id::VirtualMachineScaleSetVmId;

pub type Result<T> = std::result::Result<T, error::Error>;

pub struct Client {
    config: Config,
    credential: Arc<dyn TokenCredential>,
    http_client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct Config {
    address: String,
    api_version: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish()
    }
}

impl Client {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

#[derive(Clone, Default)]
pub struct Builder {
    address: Option<String>,
    api_version: Option<String>,
    credential: Option<Arc<dyn TokenCredential>>,
}

impl Builder {
    pub fn address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn api_version(mut self, api_version: String) -> Self {
        self.api_version = Some(api_version);
        self
    }

    pub fn credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn build(self) -> Result<Client> {
        use error::Error::*;

        Ok(Client {
            config: Config {
                address: self
                    .address
                    .ok_or(MissingConfig("address"))?
                    .trim_end_matches('/')
                    .to_owned(),
                api_version: self.api_version.ok_or(MissingConfig("api_version"))?,
            },
            credential: self.credential.ok_or(MissingConfig("credential"))?,
            http_client: ClientBuilder::new().build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credential::StaticToken;

    #[test]
    fn test_builder_requires_credential() {
        let result = Client::builder()
            .address("https://management.azure.com".into())
            .api_version("2024-07-01".into())
            .build();

        assert!(matches!(
            result,
            Err(error::Error::MissingConfig("credential"))
        ));
    }

    #[test]
    fn test_builder_trims_address() -> Result<()> {
        let client = Client::builder()
            .address("https://management.azure.com/".into())
            .api_version("2024-07-01".into())
            .credential(Arc::new(StaticToken::new("token")))
            .build()?;

        assert_eq!("https://management.azure.com", client.config.address);

        Ok(())
    }
}
