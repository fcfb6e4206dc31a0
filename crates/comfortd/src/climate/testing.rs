//! In-memory cloud used by the controller and service tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use comfortd_cloud::CloudError;
use comfortd_cloud::CloudSession;
use comfortd_cloud::ControlParameters;
use comfortd_cloud::DeviceParameters;
use comfortd_cloud::DeviceStatus;
use comfortd_cloud::RawDevice;
use comfortd_cloud::Result;

/// Shared state behind every [`MockSession`] handle.
#[derive(Debug, Default)]
pub struct MockCloud {
    pub devices: Vec<RawDevice>,
    pub parameters: HashMap<String, DeviceParameters>,
    pub polls: Vec<String>,
    pub pushes: Vec<(String, ControlParameters)>,
    /// Number of upcoming polls that fail.
    pub fail_polls: usize,
    /// Number of upcoming polls rejected because the token was revoked.
    pub revoke_polls: usize,
    /// Number of upcoming pushes that fail with an error.
    pub fail_pushes: usize,
    /// Number of upcoming pushes the cloud accepts but does not apply.
    pub reject_pushes: usize,
    /// Number of upcoming logins that fail.
    pub fail_logins: usize,
    pub logins: usize,
    pub logouts: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockSession {
    cloud: Arc<Mutex<MockCloud>>,
    logged_in: bool,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with one device named `name` reporting `parameters`.
    pub fn with_device(id: &str, name: &str, parameters: DeviceParameters) -> Self {
        let session = Self::new();
        {
            let mut cloud = session.cloud();
            cloud.devices.push(raw_device(id, name));
            cloud.parameters.insert(id.to_string(), parameters);
        }
        session
    }

    /// New logged-out session sharing the same cloud.
    pub fn fresh(&self) -> Self {
        Self {
            cloud: self.cloud.clone(),
            logged_in: false,
        }
    }

    pub fn cloud(&self) -> MutexGuard<'_, MockCloud> {
        self.cloud.lock().unwrap()
    }
}

pub fn raw_device(id: &str, name: &str) -> RawDevice {
    RawDevice {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        group: Some("Home".to_string()),
        model: Some("CS-Z25XKEW".to_string()),
    }
}

fn transient() -> CloudError {
    CloudError::Api {
        status: 503,
        body: "Service Unavailable".to_string(),
    }
}

#[async_trait]
impl CloudSession for MockSession {
    async fn login(&mut self) -> Result<()> {
        let mut cloud = self.cloud();
        cloud.logins += 1;
        if cloud.fail_logins > 0 {
            cloud.fail_logins -= 1;
            return Err(CloudError::Authentication {
                message: "rejected".to_string(),
            });
        }
        drop(cloud);
        self.logged_in = true;
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        self.cloud().logouts += 1;
        self.logged_in = false;
        Ok(())
    }

    fn is_token_valid(&self) -> bool {
        self.logged_in
    }

    async fn get_devices(&self) -> Result<Vec<RawDevice>> {
        Ok(self.cloud().devices.clone())
    }

    async fn get_device(&self, id: &str) -> Result<DeviceStatus> {
        let mut cloud = self.cloud();
        cloud.polls.push(id.to_string());
        if cloud.fail_polls > 0 {
            cloud.fail_polls -= 1;
            return Err(transient());
        }
        if cloud.revoke_polls > 0 {
            cloud.revoke_polls -= 1;
            return Err(CloudError::Authentication {
                message: "token revoked".to_string(),
            });
        }
        let parameters = cloud.parameters.get(id).cloned().unwrap_or_default();
        Ok(DeviceStatus { parameters })
    }

    async fn set_device(&self, id: &str, parameters: &ControlParameters) -> Result<bool> {
        let mut cloud = self.cloud();
        cloud.pushes.push((id.to_string(), *parameters));
        if cloud.fail_pushes > 0 {
            cloud.fail_pushes -= 1;
            return Err(transient());
        }
        if cloud.reject_pushes > 0 {
            cloud.reject_pushes -= 1;
            return Ok(false);
        }
        Ok(true)
    }
}
