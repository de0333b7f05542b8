//! An authenticated session with the Flick Electric API.

use anyhow::{anyhow, Error};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::price::PriceQuote;

/// The production API endpoint.
pub const API_BASE_URL: &str = "https://api.flick.energy";

/// Credentials for the Flick mobile provider API.
///
/// The API uses an OAuth password grant: alongside the account's username
/// and password, token requests carry the client id and secret identifying
/// the application making the request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

/// The pricing capability consumed by [`PricingSensor`](crate::PricingSensor).
///
/// [`FlickApi`] is the production implementation; tests substitute scripted
/// stand-ins.
#[async_trait]
pub trait PricingApi {
    /// Fetch the current [`PriceQuote`].
    async fn pricing(&mut self) -> Result<PriceQuote, Error>;
}

/// An authenticated session with the Flick Electric API.
///
/// Create a new session using [`FlickApi::login`]. The API performs
/// authentication using bearer tokens with a server-assigned lifetime; the
/// `FlickApi` type automatically refreshes the token as required.
#[derive(Debug)]
pub struct FlickApi {
    creds: Credentials,
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
    token_expires: Option<DateTime<Utc>>,
}

impl FlickApi {
    /// Log in to the Flick Electric API, producing a new session on success.
    #[tracing::instrument(skip(creds))]
    pub async fn login(creds: Credentials) -> Result<Self, Error> {
        Self::login_at(API_BASE_URL, creds).await
    }

    /// Log in against a non-default API endpoint.
    #[tracing::instrument(skip(creds))]
    pub async fn login_at(base_url: &str, creds: Credentials) -> Result<Self, Error> {
        let client = reqwest::Client::new();

        let mut api = Self {
            creds,
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
            token: None,
            token_expires: None,
        };

        api.renew().await?;

        Ok(api)
    }

    fn still_valid(&self) -> bool {
        if let Some(expires) = self.token_expires {
            // Renew a minute before the reported expiry so the token cannot
            // expire during an API call.
            Utc::now() < expires - Duration::minutes(1)
        } else {
            false
        }
    }

    #[tracing::instrument(skip(self))]
    async fn renew(&mut self) -> Result<(), Error> {
        if self.still_valid() {
            tracing::trace!("token is still valid");
            return Ok(());
        }

        tracing::debug!("requesting a fresh access token");
        let rsp = self
            .client
            .post(format!("{}/identity/oauth/token", self.base_url))
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.creds.client_id.as_str()),
                ("client_secret", self.creds.client_secret.as_str()),
                ("username", self.creds.username.as_str()),
                ("password", self.creds.password.as_str()),
            ])
            .send()
            .await?
            .text()
            .await?;

        tracing::trace!(?rsp);

        let fields = serde_json::from_str::<serde_json::Value>(&rsp)?;
        self.token = Some(
            fields["id_token"]
                .as_str()
                .map(String::from)
                .ok_or_else(|| anyhow!("Login succeeded but did not give a token"))?,
        );
        // The identity service reports the token lifetime in seconds.
        let expires_in = fields["expires_in"].as_i64().unwrap_or(3600);
        self.token_expires = Some(Utc::now() + Duration::seconds(expires_in));

        Ok(())
    }

    /// Fetch the current price quote for the account's connection.
    ///
    /// The API reports the price for the current half-hour pricing period;
    /// the returned quote's validity window says how long it can be reused
    /// before a fresh fetch is warranted.
    #[tracing::instrument(skip(self))]
    pub async fn pricing(&mut self) -> Result<PriceQuote, Error> {
        self.renew().await?;

        let req = self
            .client
            .get(format!("{}/customer/mobile_provider/price", self.base_url))
            .bearer_auth(self.token.as_ref().expect("recently renewed token"));
        tracing::debug!(?req);

        let rsp = req.send().await?.text().await?;
        tracing::trace!(?rsp);
        let quote = serde_json::from_str(&rsp)?;

        Ok(quote)
    }
}

#[async_trait]
impl PricingApi for FlickApi {
    async fn pricing(&mut self) -> Result<PriceQuote, Error> {
        FlickApi::pricing(self).await
    }
}
