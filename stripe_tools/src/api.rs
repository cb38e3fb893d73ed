use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{NewIntentParams, StripeErrorBody, StripeIntent},
    helpers::form_params,
    StripeApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let auth = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&auth).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Sends a form-encoded request and decodes the JSON response.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳 Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳 REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let text = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            let message = match serde_json::from_str::<StripeErrorBody>(&text) {
                Ok(body) => body.describe(),
                Err(_) => text,
            };
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_payment_intent(&self, params: &NewIntentParams) -> Result<StripeIntent, StripeApiError> {
        debug!("💳 Creating payment intent for {} {}", params.amount, params.currency);
        let form = form_params(params);
        let intent = self
            .rest_query::<StripeIntent>(Method::POST, "/payment_intents", &form, Some(&params.idempotency_key))
            .await?;
        info!("💳 Payment intent {} created", intent.id);
        Ok(intent)
    }

    pub async fn get_payment_intent(&self, id: &str) -> Result<StripeIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}");
        self.rest_query::<StripeIntent>(Method::GET, &path, &[], None).await
    }

    pub async fn cancel_payment_intent(&self, id: &str) -> Result<StripeIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}/cancel");
        debug!("💳 Cancelling payment intent {id}");
        self.rest_query::<StripeIntent>(Method::POST, &path, &[], None).await
    }

    pub async fn confirm_payment_intent(&self, id: &str) -> Result<StripeIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}/confirm");
        debug!("💳 Confirming payment intent {id}");
        self.rest_query::<StripeIntent>(Method::POST, &path, &[], None).await
    }
}
