use crate::AppConfig;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub landlord: Landlord,
    pub log: Log,
    pub node_lister: NodeLister,
    pub evicter: Evicter,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct Landlord {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub min_evictions: usize,
    pub max_evictions: usize,
    pub system_pool_marker: String,
    pub scheduled_event_condition: String,
    pub seed: Option<u64>,
}

impl Default for Landlord {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            min_evictions: 5,
            max_evictions: 20,
            system_pool_marker: "syspool".into(),
            scheduled_event_condition: "VMEventScheduled".into(),
            seed: None,
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct Log {
    pub level: String,
    pub format: LogFormat,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "debug".into(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeLister {
    Kubernetes {
        /// Kubeconfig context; the current one when unset.
        context: Option<String>,
        #[serde(default = "default_page_size")]
        page_size: u32,
    },
    File {
        path: PathBuf,
    },
}

impl Default for NodeLister {
    fn default() -> Self {
        NodeLister::Kubernetes {
            context: None,
            page_size: default_page_size(),
        }
    }
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Evicter {
    Azure {
        #[serde(default = "default_azure_address")]
        address: String,
        #[serde(default = "default_api_version")]
        api_version: String,
        #[serde(default)]
        credential: AzureCredential,
    },
    DryRun,
}

impl Default for Evicter {
    fn default() -> Self {
        Evicter::Azure {
            address: default_azure_address(),
            api_version: default_api_version(),
            credential: AzureCredential::default(),
        }
    }
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AzureCredential {
    Cli {
        #[serde(default = "default_token_resource")]
        resource: String,
    },
    Static {
        token: String,
    },
}

impl Default for AzureCredential {
    fn default() -> Self {
        AzureCredential::Cli {
            resource: default_token_resource(),
        }
    }
}

fn default_page_size() -> u32 {
    500
}

fn default_azure_address() -> String {
    "https://management.azure.com".into()
}

fn default_api_version() -> String {
    "2024-07-01".into()
}

fn default_token_resource() -> String {
    "https://management.azure.com/".into()
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let landlord = &self.landlord;

        if landlord.interval.is_zero() {
            bail!("landlord.interval must be greater than zero");
        }

        if landlord.min_evictions >= landlord.max_evictions {
            bail!(
                "landlord.min_evictions ({}) must be less than landlord.max_evictions ({})",
                landlord.min_evictions,
                landlord.max_evictions
            );
        }

        Ok(())
    }
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let config_path = get_config_path()?;
    let file = File::open(&config_path)
        .with_context(|| format!("Failed to open config file {}", &config_path))?;

    let config: Config = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config file {}", &config_path))?;
    config.validate()?;

    Ok(Arc::new(config))
}

fn get_config_path() -> anyhow::Result<String> {
    use std::env;

    // Logging is not initialized yet, the fallback is silent.
    Ok(env::var("APP_CONFIG").unwrap_or_else(|_| "config.yml".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str("{}")?;

        assert_eq!(Duration::from_secs(10), config.landlord.interval);
        assert_eq!(5, config.landlord.min_evictions);
        assert_eq!(20, config.landlord.max_evictions);
        assert_eq!("syspool", config.landlord.system_pool_marker);
        assert_eq!(LogFormat::Json, config.log.format);
        assert_eq!(NodeLister::default(), config.node_lister);
        assert_eq!(Evicter::default(), config.evicter);
        config.validate()?;

        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str(
            r#"
landlord:
  interval: 1m 30s
  min_evictions: 1
  max_evictions: 3
  seed: 42
log:
  level: info
  format: text
node_lister:
  type: file
  path: nodes.yml
evicter:
  type: azure
  api_version: 2023-09-01
  credential:
    type: static
    token: secret
"#,
        )?;

        assert_eq!(Duration::from_secs(90), config.landlord.interval);
        assert_eq!(Some(42), config.landlord.seed);
        assert_eq!("VMEventScheduled", config.landlord.scheduled_event_condition);
        assert_eq!(LogFormat::Text, config.log.format);
        assert_eq!(
            NodeLister::File {
                path: "nodes.yml".into()
            },
            config.node_lister
        );
        assert_eq!(
            Evicter::Azure {
                address: "https://management.azure.com".into(),
                api_version: "2023-09-01".into(),
                credential: AzureCredential::Static {
                    token: "secret".into()
                },
            },
            config.evicter
        );

        Ok(())
    }

    #[test]
    fn test_dry_run_evicter() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str("evicter:\n  type: dryrun\n")?;

        assert_eq!(Evicter::DryRun, config.evicter);

        Ok(())
    }

    #[test]
    fn test_kubernetes_context() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config =
            serde_yaml::from_str("node_lister:\n  type: kubernetes\n  context: aks-dev\n")?;

        assert_eq!(
            NodeLister::Kubernetes {
                context: Some("aks-dev".into()),
                page_size: 500,
            },
            config.node_lister
        );

        Ok(())
    }

    #[test]
    fn test_validate_rejects_empty_count_range() {
        let mut config = Config::default();
        config.landlord.min_evictions = 5;
        config.landlord.max_evictions = 5;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.landlord.interval = Duration::from_secs(0);

        assert!(config.validate().is_err());
    }
}
