use crate::azure_compute::{error::Error, Config, Result};
use http::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::{RequestBuilder, Response, Url};

/// Sends an empty-bodied POST and hands back the response once its status is known to be good.
pub(super) async fn post_action(
    http_client: &reqwest::Client,
    config: &Config,
    token: &str,
    path: &str,
) -> Result<Response> {
    let url = gen_url(config, path)?;
    let request_builder = http_client
        .post(url)
        .with_auth(token)
        .header(ACCEPT, "application/json")
        .header(CONTENT_LENGTH, 0);

    let response = request_builder.send().await?;

    if !response.status().is_success() {
        return Err(Error::BadResponse {
            status: response.status(),
            body: response.text().await?,
        });
    }

    Ok(response)
}

trait Authenticated {
    fn with_auth(self, token: &str) -> Self;
}

impl Authenticated for RequestBuilder {
    fn with_auth(self, token: &str) -> Self {
        self.bearer_auth(token)
    }
}

fn gen_url(config: &Config, path: &str) -> Result<Url> {
    let url = format!("{}{}", config.address, path);
    Url::parse_with_params(&url, &[("api-version", &config.api_version)]).map_err(|e| {
        Error::InvalidUrl {
            source: e,
            url: url.clone(),
        }
    })
}
