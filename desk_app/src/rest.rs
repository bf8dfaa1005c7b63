use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{DeskError, Result};
use crate::model::{Instance, InstanceId, OrderAck, OrderRequest, TradeDraft, TradeLeg};

/// Blocking client for the desk backend.
#[derive(Clone, Debug)]
pub struct DeskClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl DeskClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| DeskError::Invalid(format!("base url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(DeskError::Invalid(format!("base url {base_url:?} cannot take a path")));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Base url with `segments` appended, each one percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    fn checked(&self, req: RequestBuilder) -> Result<Response> {
        let resp = self.authed(req).send()?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = resp.text().unwrap_or_default();
            return Err(DeskError::Unauthorized(format!("{status}: {text}")));
        }
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(DeskError::HttpStatus { status, text });
        }
        Ok(resp)
    }

    fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let body = self.checked(req)?.text()?;
        serde_json::from_str(&body).map_err(|e| DeskError::Decode(format!("{e}; body={body:.200}")))
    }

    pub fn list_instances(&self) -> Result<Vec<Instance>> {
        self.send(self.http.get(self.url(&["instances"])))
    }

    pub fn list_trades(&self, instance: &InstanceId) -> Result<Vec<TradeLeg>> {
        self.send(self.http.get(self.url(&["instances", instance.as_str(), "trades"])))
    }

    pub fn add_trade(&self, instance: &InstanceId, draft: &TradeDraft) -> Result<TradeLeg> {
        validate_draft(draft)?;
        self.send(
            self.http
                .post(self.url(&["instances", instance.as_str(), "trades"]))
                .json(draft),
        )
    }

    pub fn edit_trade(&self, trade_id: &str, draft: &TradeDraft) -> Result<TradeLeg> {
        validate_draft(draft)?;
        self.send(self.http.put(self.url(&["trades", trade_id])).json(draft))
    }

    pub fn delete_trade(&self, trade_id: &str) -> Result<()> {
        self.checked(self.http.delete(self.url(&["trades", trade_id])))?;
        Ok(())
    }

    pub fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        if order.quantity == 0 {
            return Err(DeskError::Invalid("order quantity must be > 0".into()));
        }
        if let Some(px) = order.limit_price {
            if !px.is_finite() || px <= 0.0 {
                return Err(DeskError::Invalid("limit price must be > 0".into()));
            }
        }
        self.send(self.http.post(self.url(&["orders"])).json(order))
    }

    pub fn cancel_order(&self, order_id: &str) -> Result<OrderAck> {
        self.send(self.http.post(self.url(&["orders", order_id, "cancel"])))
    }

    /// Close `quantity` lots of `leg`; the backend answers with the leg as it stands after the close.
    pub fn partial_close(&self, leg: &TradeLeg, quantity: u32) -> Result<TradeLeg> {
        if quantity == 0 {
            return Err(DeskError::Invalid("close quantity must be > 0".into()));
        }
        if quantity > leg.quantity {
            return Err(DeskError::Invalid(format!(
                "cannot close {quantity} of {} open on trade {}",
                leg.quantity, leg.id
            )));
        }
        self.send(
            self.http
                .post(self.url(&["trades", leg.id.as_str(), "close"]))
                .json(&json!({ "quantity": quantity })),
        )
    }
}

fn validate_draft(draft: &TradeDraft) -> Result<()> {
    if draft.quantity == 0 {
        return Err(DeskError::Invalid("trade quantity must be > 0".into()));
    }
    if !draft.strike.is_finite() || draft.strike <= 0.0 {
        return Err(DeskError::Invalid("strike must be > 0".into()));
    }
    Ok(())
}
