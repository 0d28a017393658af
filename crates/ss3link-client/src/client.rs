//! REST calls against the SimpliSafe API.

use parking_lot::Mutex;
use serde_json::{Value, json};
use ss3link_http::{ApiRequest, FieldFilter, HttpFacade};

use crate::error::{ClientError, Result};
use crate::types::{AlarmState, Lock, LockState, SetAlarmState, SetLockState, Subscription};

/// Vendor API root.
pub const DEFAULT_API_BASE: &str = "https://api.simplisafe.com/v1";

/// Subscription responses nest one level deeper than the default limit.
const SUBSCRIPTION_NESTING_LIMIT: u8 = 11;

#[derive(Debug, Default, Clone)]
struct Identifiers {
    user_id: Option<String>,
    subscription_id: Option<String>,
    lock_id: Option<String>,
}

/// Alarm and lock operations for one account.
///
/// Only the first active subscription and its first lock are used.
#[derive(Debug)]
pub struct Ss3Client {
    http: HttpFacade,
    api_base: String,
    ids: Mutex<Identifiers>,
}

impl Ss3Client {
    /// `http` must carry the account's credential.
    pub fn new(http: HttpFacade, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            http,
            api_base,
            ids: Mutex::new(Identifiers::default()),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn cached_user_id(&self) -> Option<String> {
        self.ids.lock().user_id.clone()
    }

    pub fn cached_subscription_id(&self) -> Option<String> {
        self.ids.lock().subscription_id.clone()
    }

    pub fn cached_lock_id(&self) -> Option<String> {
        self.ids.lock().lock_id.clone()
    }

    /// Drop cached identifiers, e.g. after signing in as someone else.
    pub fn forget_ids(&self) {
        *self.ids.lock() = Identifiers::default();
    }

    /// The account's user id.
    pub async fn user_id(&self) -> Result<String> {
        if let Some(id) = self.cached_user_id() {
            return Ok(id);
        }

        let doc = self
            .fetch(
                ApiRequest::get(format!("{}/api/authCheck", self.api_base))
                    .authenticated()
                    .filter(FieldFilter::new(json!({ "userId": true }))),
            )
            .await?;

        let user_id = id_string(&doc["userId"]).ok_or(ClientError::MissingField("userId"))?;
        tracing::debug!(user_id = %user_id, "Resolved user id");
        self.ids.lock().user_id = Some(user_id.clone());
        Ok(user_id)
    }

    /// The first active subscription; caches its id.
    pub async fn subscription(&self) -> Result<Subscription> {
        let user_id = self.user_id().await?;
        let filter = FieldFilter::new(json!({
            "subscriptions": [{
                "sid": true,
                "location": { "system": { "alarmState": true, "isAlarming": true } }
            }]
        }));

        let doc = self
            .fetch(
                ApiRequest::get(format!(
                    "{}/users/{}/subscriptions?activeOnly=true",
                    self.api_base, user_id
                ))
                .authenticated()
                .filter(filter)
                .nesting_limit(SUBSCRIPTION_NESTING_LIMIT),
            )
            .await?;

        let first = &doc["subscriptions"][0];
        let sid = id_string(&first["sid"]).ok_or(ClientError::MissingField("subscriptions[0].sid"))?;
        let system = &first["location"]["system"];
        let subscription = Subscription {
            sid: sid.clone(),
            alarm_state: system["alarmState"].as_str().map(str::to_string),
            is_alarming: system["isAlarming"].as_bool().unwrap_or(false),
        };

        tracing::debug!(sid = %sid, "Resolved subscription");
        self.ids.lock().subscription_id = Some(sid);
        Ok(subscription)
    }

    pub async fn alarm_state(&self) -> Result<AlarmState> {
        Ok(self.subscription().await?.state())
    }

    /// Change the alarm mode; returns the state the API reports back.
    pub async fn set_alarm_state(&self, state: SetAlarmState) -> Result<AlarmState> {
        let sid = self.subscription_id().await?;
        let doc = self
            .fetch(
                ApiRequest::post(format!(
                    "{}/ss3/subscriptions/{}/state/{}",
                    self.api_base,
                    sid,
                    state.as_path()
                ))
                .authenticated()
                .filter(FieldFilter::new(json!({ "state": true }))),
            )
            .await?;

        let reported = doc["state"]
            .as_str()
            .map(AlarmState::from_api)
            .unwrap_or(AlarmState::Unknown);
        tracing::info!(requested = state.as_path(), reported = %reported, "Alarm state set");
        Ok(reported)
    }

    /// The first lock on the subscription; caches its serial as the lock id.
    pub async fn lock(&self) -> Result<Lock> {
        let sid = self.subscription_id().await?;
        let filter = FieldFilter::new(json!([{
            "serial": true,
            "status": { "lockState": true, "lockJamState": true }
        }]));

        let doc = self
            .fetch(
                ApiRequest::get(format!("{}/doorlock/{}", self.api_base, sid))
                    .authenticated()
                    .filter(filter),
            )
            .await?;

        let first = &doc[0];
        let serial = id_string(&first["serial"]).ok_or(ClientError::MissingField("[0].serial"))?;
        let lock = Lock {
            serial: serial.clone(),
            lock_state: first["status"]["lockState"].as_i64(),
            jam_state: first["status"]["lockJamState"].as_i64(),
        };

        tracing::debug!(lock_id = %serial, "Resolved lock");
        self.ids.lock().lock_id = Some(serial);
        Ok(lock)
    }

    pub async fn lock_state(&self) -> Result<LockState> {
        Ok(self.lock().await?.state())
    }

    /// Lock or unlock.
    ///
    /// The API applies the command asynchronously and does not report the
    /// outcome. An acknowledged command returns the requested state; an empty
    /// acknowledgement returns `Unknown`.
    pub async fn set_lock_state(&self, state: SetLockState) -> Result<LockState> {
        let sid = self.subscription_id().await?;
        let lock_id = match self.cached_lock_id() {
            Some(id) => id,
            None => self.lock().await?.serial,
        };

        let doc = self
            .fetch(
                ApiRequest::post(format!("{}/doorlock/{}/{}/state", self.api_base, sid, lock_id))
                    .authenticated()
                    .json(json!({ "state": state.as_api_str() })),
            )
            .await?;

        if is_empty_document(&doc) {
            tracing::warn!(lock_id = %lock_id, requested = state.as_api_str(), "Lock command not acknowledged");
            return Ok(LockState::Unknown);
        }

        tracing::info!(lock_id = %lock_id, requested = state.as_api_str(), "Lock command sent");
        Ok(state.target())
    }

    async fn subscription_id(&self) -> Result<String> {
        if let Some(sid) = self.cached_subscription_id() {
            return Ok(sid);
        }
        Ok(self.subscription().await?.sid)
    }

    async fn fetch(&self, request: ApiRequest) -> Result<Value> {
        let response = self.http.execute(request).await?;
        match response.status {
            401 | 403 => {
                return Err(ClientError::Auth {
                    status: response.status,
                });
            }
            status if !response.is_success() => return Err(ClientError::Api { status }),
            _ => {}
        }
        if let Some(e) = response.decode_error {
            return Err(ClientError::Decode(e));
        }
        Ok(response.document)
    }
}

fn is_empty_document(doc: &Value) -> bool {
    match doc {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Ids arrive as numbers or strings.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
