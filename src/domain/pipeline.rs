//! The provisioning state machine.
//!
//! ```text
//! INIT -> PURCHASE_VERIFIED -> CREDENTIAL_OBTAINED -> REGION_RESOLVED -> HOST_SELECTED -> PROFILE_READY
//!   \____________________\______________________\_________________\________________\-> ABORTED
//! ```
//!
//! Each completion event has its own transition method. Transitions never perform
//! I/O: they mutate the pipeline and return the [`Action`]s the runner must carry
//! out, including the next remote call to issue.

use super::host::{Host, HostSelectorBox, LeastLoadedSelector, parse_host_list};
use super::message::{ErrorMessage, translate};
use super::payload::RemoteResponse;
use super::preferences::StoredPreferences;
use super::profile::{ProfileCredentials, ProvisionedProfile};
use super::region::{RegionOverride, TimezoneTable, resolve};
use crate::error::{ProvisionError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    PurchaseVerified,
    CredentialObtained,
    RegionResolved,
    HostSelected,
    ProfileReady,
    Aborted,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::ProfileReady | Stage::Aborted)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::PurchaseVerified => "PURCHASE_VERIFIED",
            Stage::CredentialObtained => "CREDENTIAL_OBTAINED",
            Stage::RegionResolved => "REGION_RESOLVED",
            Stage::HostSelected => "HOST_SELECTED",
            Stage::ProfileReady => "PROFILE_READY",
            Stage::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// The five remote calls, in the order they are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    PurchaseVerification,
    SubscriberCredential,
    Timezones,
    Hostnames,
    ProfileCredentials,
}

impl Step {
    /// Stage the pipeline must be in for this step's completion to be accepted.
    pub fn awaited_in(self) -> Stage {
        match self {
            Step::PurchaseVerification => Stage::Init,
            Step::SubscriberCredential => Stage::PurchaseVerified,
            Step::Timezones => Stage::CredentialObtained,
            Step::Hostnames => Stage::RegionResolved,
            Step::ProfileCredentials => Stage::HostSelected,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::PurchaseVerification => "verifyPurchaseToken",
            Step::SubscriberCredential => "verifySubscriberCredential",
            Step::Timezones => "getTimezonesForRegions",
            Step::Hostnames => "getHostnamesForRegion",
            Step::ProfileCredentials => "getWireguardProfileCredentials",
        };
        f.write_str(name)
    }
}

/// A remote call the runner must issue, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    VerifyPurchaseToken {
        purchase_token: String,
        product_id: String,
    },
    VerifySubscriberCredential,
    GetTimezonesForRegions,
    GetHostnamesForRegion {
        region: String,
    },
    GetWireguardProfileCredentials {
        subscriber_credential: String,
        client_public_key: String,
        hostname: String,
    },
}

impl RemoteCall {
    pub fn step(&self) -> Step {
        match self {
            RemoteCall::VerifyPurchaseToken { .. } => Step::PurchaseVerification,
            RemoteCall::VerifySubscriberCredential => Step::SubscriberCredential,
            RemoteCall::GetTimezonesForRegions => Step::Timezones,
            RemoteCall::GetHostnamesForRegion { .. } => Step::Hostnames,
            RemoteCall::GetWireguardProfileCredentials { .. } => Step::ProfileCredentials,
        }
    }
}

/// Completion of a remote call, fed back into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub step: Step,
    pub response: RemoteResponse,
}

impl Completion {
    pub fn new(step: Step, response: RemoteResponse) -> Self {
        Self { step, response }
    }
}

/// Why an attempt was aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    EntitlementRejected,
    RemoteCallFailed(Step),
    RegionNotFound(String),
    EmptyResponse(Step),
    InvalidPayload(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ProvisionError::from(self.clone()), f)
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Issue(RemoteCall),
    /// Clear every purchase preference.
    ResetPurchase,
    /// Tear down the VPN connection if one is active.
    StopVpnIfConnected,
    /// Re-validate any pending purchases.
    ReconcilePurchases,
    PersistServerRegion(String),
    ShowHost(Host),
    ProfileReady(ProvisionedProfile),
    Abort {
        reason: AbortReason,
        message: ErrorMessage,
    },
    DismissProgress,
}

/// Identity of one provisioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transient state of one attempt. Fields fill in as stages complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningContext {
    pub subscriber_credential: String,
    pub client_public_key: String,
    pub server_region: String,
    pub selected_hostname: String,
}

/// Inputs the timezones transition needs beyond the response itself.
pub struct RegionInputs<'a> {
    pub device_timezone: &'a str,
    pub stored_region: &'a str,
    pub region_override: &'a mut RegionOverride,
}

pub struct ProvisioningPipeline {
    attempt: AttemptId,
    stage: Stage,
    context: ProvisioningContext,
    host: Option<Host>,
    selector: HostSelectorBox,
}

impl ProvisioningPipeline {
    /// Creates a pipeline that picks the least-loaded host.
    pub fn new(attempt: AttemptId, client_public_key: impl Into<String>) -> Self {
        Self::with_selector(attempt, client_public_key, Box::new(LeastLoadedSelector))
    }

    /// Creates a pipeline in `INIT` that picks hosts with the given policy.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Id of the attempt this pipeline drives.
    /// * `client_public_key` - Public key sent with the profile-credential call.
    /// * `selector` - Policy choosing one host from the hostnames response.
    pub fn with_selector(
        attempt: AttemptId,
        client_public_key: impl Into<String>,
        selector: HostSelectorBox,
    ) -> Self {
        Self {
            attempt,
            stage: Stage::Init,
            context: ProvisioningContext {
                client_public_key: client_public_key.into(),
                ..Default::default()
            },
            host: None,
            selector,
        }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn context(&self) -> &ProvisioningContext {
        &self.context
    }

    pub fn host(&self) -> Option<&Host> {
        self.host.as_ref()
    }

    /// Issues purchase verification for the stored purchase.
    ///
    /// With no stored purchase token there is nothing to verify and the
    /// attempt is rejected straight away.
    pub fn begin(&mut self, prefs: &StoredPreferences) -> Result<Vec<Action>> {
        self.ensure_awaiting(Step::PurchaseVerification)?;
        if !prefs.has_purchase() {
            return self.on_purchase_failed();
        }
        Ok(vec![Action::Issue(RemoteCall::VerifyPurchaseToken {
            purchase_token: prefs.purchase_token.clone(),
            product_id: prefs.product_id.clone(),
        })])
    }

    /// Routes a completion to its transition.
    ///
    /// `region` is only consulted for the timezones step.
    pub fn handle(
        &mut self,
        completion: Completion,
        region: RegionInputs<'_>,
    ) -> Result<Vec<Action>> {
        let Completion { step, response } = completion;
        match step {
            Step::PurchaseVerification => self.on_purchase_result(response),
            Step::SubscriberCredential => self.on_subscriber_credential_result(response),
            Step::Timezones => self.on_timezones_result(response, region),
            Step::Hostnames => self.on_hostnames_result(response).map(|(_, actions)| actions),
            Step::ProfileCredentials => self.on_profile_credentials_result(response),
        }
    }

    pub fn on_purchase_result(&mut self, response: RemoteResponse) -> Result<Vec<Action>> {
        self.ensure_awaiting(Step::PurchaseVerification)?;
        if !response.success {
            return self.on_purchase_failed();
        }
        self.advance(Stage::PurchaseVerified);
        Ok(vec![Action::Issue(RemoteCall::VerifySubscriberCredential)])
    }

    /// Entitlement rejected: wipe the purchase and drop any live connection.
    pub fn on_purchase_failed(&mut self) -> Result<Vec<Action>> {
        self.ensure_awaiting(Step::PurchaseVerification)?;
        let mut actions = vec![Action::ResetPurchase, Action::StopVpnIfConnected];
        actions.extend(self.abort(
            AbortReason::EntitlementRejected,
            ErrorMessage::purchase_rejected(),
        ));
        Ok(actions)
    }

    pub fn on_subscriber_credential_result(
        &mut self,
        response: RemoteResponse,
    ) -> Result<Vec<Action>> {
        let step = Step::SubscriberCredential;
        self.ensure_awaiting(step)?;
        let fallback = ErrorMessage::subscriber_credential_failed();
        if !response.success {
            return Ok(self.abort(AbortReason::RemoteCallFailed(step), fallback));
        }
        let Some(credential) = response.payload else {
            return Ok(self.abort(AbortReason::EmptyResponse(step), fallback));
        };

        self.context.subscriber_credential = credential;
        self.advance(Stage::CredentialObtained);
        Ok(vec![
            Action::ReconcilePurchases,
            Action::Issue(RemoteCall::GetTimezonesForRegions),
        ])
    }

    pub fn on_timezones_result(
        &mut self,
        response: RemoteResponse,
        inputs: RegionInputs<'_>,
    ) -> Result<Vec<Action>> {
        let step = Step::Timezones;
        self.ensure_awaiting(step)?;
        if !response.success {
            let message = translate(response.payload(), ErrorMessage::timezones_failed());
            return Ok(self.abort(AbortReason::RemoteCallFailed(step), message));
        }
        let Some(json) = response.payload() else {
            return Ok(self.abort(
                AbortReason::EmptyResponse(step),
                ErrorMessage::timezones_failed(),
            ));
        };
        let table = match TimezoneTable::from_json(json) {
            Ok(table) => table,
            Err(e) => {
                return Ok(self.abort(
                    AbortReason::InvalidPayload(format!("timezone table: {e}")),
                    ErrorMessage::timezones_failed(),
                ));
            }
        };
        if table.is_empty() {
            return Ok(self.abort(
                AbortReason::EmptyResponse(step),
                ErrorMessage::timezones_failed(),
            ));
        }

        let resolution = match resolve(
            &table,
            inputs.device_timezone,
            inputs.region_override,
            inputs.stored_region,
        ) {
            Ok(resolution) => resolution,
            Err(not_found) => {
                let message = ErrorMessage::timezone_unmatched(&not_found.timezone_id);
                return Ok(self.abort(AbortReason::RegionNotFound(not_found.timezone_id), message));
            }
        };

        self.context.server_region = resolution.region.clone();
        self.advance(Stage::RegionResolved);

        let mut actions = Vec::with_capacity(2);
        if resolution.region != inputs.stored_region {
            actions.push(Action::PersistServerRegion(resolution.region.clone()));
        }
        actions.push(Action::Issue(RemoteCall::GetHostnamesForRegion {
            region: resolution.region,
        }));
        Ok(actions)
    }

    /// Selects a host and requests its credentials.
    ///
    /// The chosen host is also returned directly for immediate display.
    pub fn on_hostnames_result(
        &mut self,
        response: RemoteResponse,
    ) -> Result<(Option<Host>, Vec<Action>)> {
        let step = Step::Hostnames;
        self.ensure_awaiting(step)?;
        if !response.success {
            let message = translate(response.payload(), ErrorMessage::hostnames_failed());
            return Ok((None, self.abort(AbortReason::RemoteCallFailed(step), message)));
        }
        let Some(json) = response.payload() else {
            return Ok((
                None,
                self.abort(AbortReason::EmptyResponse(step), ErrorMessage::hostnames_failed()),
            ));
        };
        let candidates = match parse_host_list(json) {
            Ok(candidates) => candidates,
            Err(e) => {
                return Ok((
                    None,
                    self.abort(
                        AbortReason::InvalidPayload(format!("host list: {e}")),
                        ErrorMessage::hostnames_failed(),
                    ),
                ));
            }
        };
        let Some(host) = self.selector.select(&candidates) else {
            return Ok((
                None,
                self.abort(AbortReason::EmptyResponse(step), ErrorMessage::hostnames_failed()),
            ));
        };

        self.context.selected_hostname = host.hostname.clone();
        self.host = Some(host.clone());
        self.advance(Stage::HostSelected);

        let actions = vec![
            Action::ShowHost(host.clone()),
            Action::Issue(RemoteCall::GetWireguardProfileCredentials {
                subscriber_credential: self.context.subscriber_credential.clone(),
                client_public_key: self.context.client_public_key.clone(),
                hostname: self.context.selected_hostname.clone(),
            }),
        ];
        Ok((Some(host), actions))
    }

    pub fn on_profile_credentials_result(
        &mut self,
        response: RemoteResponse,
    ) -> Result<Vec<Action>> {
        let step = Step::ProfileCredentials;
        self.ensure_awaiting(step)?;
        let fallback = ErrorMessage::profile_credentials_failed();
        if !response.success {
            let message = translate(response.payload(), fallback);
            return Ok(self.abort(AbortReason::RemoteCallFailed(step), message));
        }
        let Some(json) = response.payload() else {
            return Ok(self.abort(AbortReason::EmptyResponse(step), fallback));
        };
        let credentials = match ProfileCredentials::from_json(json) {
            Ok(credentials) => credentials,
            Err(e) => {
                return Ok(self.abort(
                    AbortReason::InvalidPayload(format!("profile credentials: {e}")),
                    fallback,
                ));
            }
        };
        let Some(host) = self.host.clone() else {
            return Ok(self.abort(AbortReason::EmptyResponse(Step::Hostnames), fallback));
        };

        self.advance(Stage::ProfileReady);
        Ok(vec![Action::ProfileReady(ProvisionedProfile {
            host,
            region: self.context.server_region.clone(),
            client_public_key: self.context.client_public_key.clone(),
            credentials,
        })])
    }

    fn ensure_awaiting(&self, event: Step) -> Result<()> {
        if self.stage == event.awaited_in() {
            Ok(())
        } else {
            Err(ProvisionError::UnexpectedEvent {
                stage: self.stage,
                event,
            })
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(attempt = %self.attempt, from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }

    fn abort(&mut self, reason: AbortReason, message: ErrorMessage) -> Vec<Action> {
        self.advance(Stage::Aborted);
        vec![Action::Abort { reason, message }, Action::DismissProgress]
    }
}
