use crate::domain::host::{Host, HostSelection};
use crate::domain::message::ErrorMessage;
use crate::domain::payload::RemoteResponse;
use crate::domain::pipeline::{
    AbortReason, Action, AttemptId, Completion, ProvisioningPipeline, RegionInputs, RemoteCall,
    Stage,
};
use crate::domain::ports::{
    NotifierBox, PreferenceStoreBox, PurchaseReconcilerBox, RemoteGatewayBox, VpnConnectionBox,
};
use crate::domain::profile::ProvisionedProfile;
use crate::domain::region::RegionOverride;
use crate::error::{ProvisionError, Result};

/// Collaborators the provisioner drives.
pub struct Ports {
    pub gateway: RemoteGatewayBox,
    pub preferences: PreferenceStoreBox,
    pub connection: VpnConnectionBox,
    pub reconciler: PurchaseReconcilerBox,
    pub notifier: NotifierBox,
}

#[derive(Debug, Clone)]
pub struct ProvisionerSettings {
    /// IANA timezone id of the device, e.g. `America/New_York`.
    pub device_timezone: String,
    pub client_public_key: String,
    pub host_selection: HostSelection,
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ProfileReady(ProvisionedProfile),
    Aborted {
        reason: AbortReason,
        message: ErrorMessage,
    },
    /// The hosting UI went away before the attempt finished.
    Abandoned,
}

struct ActiveAttempt {
    pipeline: ProvisioningPipeline,
    pending: Option<RemoteCall>,
}

/// Runs provisioning attempts, at most one at a time.
///
/// The pipeline decides; the provisioner carries out its actions against the
/// ports and feeds every remote completion back in.
pub struct Provisioner {
    ports: Ports,
    settings: ProvisionerSettings,
    region_override: RegionOverride,
    active: Option<ActiveAttempt>,
    last_outcome: Option<Outcome>,
    next_attempt: u64,
}

impl Provisioner {
    /// Creates a new `Provisioner` with no attempt in flight.
    ///
    /// # Arguments
    ///
    /// * `ports` - The gateway, stores and UI surface the attempts are carried out against.
    /// * `settings` - Device timezone, client key and host selection policy for every attempt.
    pub fn new(ports: Ports, settings: ProvisionerSettings) -> Self {
        Self {
            ports,
            settings,
            region_override: RegionOverride::default(),
            active: None,
            last_outcome: None,
            next_attempt: 1,
        }
    }

    /// Records an explicit region pick for the next attempt only.
    pub fn select_region(&mut self, region: impl Into<String>) {
        self.region_override.set(region);
    }

    pub fn region_override(&self) -> &RegionOverride {
        &self.region_override
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.active.as_ref().map(|a| a.pipeline.attempt())
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.active.as_ref().map(|a| a.pipeline.stage())
    }

    /// The remote call the current attempt is waiting on.
    pub fn pending_call(&self) -> Option<&RemoteCall> {
        self.active.as_ref().and_then(|a| a.pending.as_ref())
    }

    pub fn take_outcome(&mut self) -> Option<Outcome> {
        self.last_outcome.take()
    }

    /// Starts a new attempt and issues its first remote call.
    pub async fn begin(&mut self) -> Result<AttemptId> {
        if self.active.is_some() {
            return Err(ProvisionError::AttemptInFlight);
        }

        let attempt = AttemptId(self.next_attempt);
        self.next_attempt += 1;
        self.last_outcome = None;

        let mut pipeline = ProvisioningPipeline::with_selector(
            attempt,
            self.settings.client_public_key.clone(),
            self.settings.host_selection.selector(),
        );
        tracing::debug!(%attempt, "starting provisioning attempt");

        let actions = match self.ports.preferences.load().await {
            Ok(prefs) => pipeline.begin(&prefs)?,
            Err(e) => return Err(self.fail(e)),
        };
        self.active = Some(ActiveAttempt {
            pipeline,
            pending: None,
        });
        self.apply(actions).await?;
        Ok(attempt)
    }

    /// Feeds a remote completion into the current attempt.
    ///
    /// Returns the host picked by the hostnames step, if this completion produced one.
    pub async fn dispatch(
        &mut self,
        attempt: AttemptId,
        completion: Completion,
    ) -> Result<Option<Host>> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(%attempt, step = %completion.step, "completion without an active attempt");
            return Err(ProvisionError::StaleAttempt);
        };
        if active.pipeline.attempt() != attempt {
            tracing::debug!(%attempt, step = %completion.step, "completion for a stale attempt");
            return Err(ProvisionError::StaleAttempt);
        }
        if active.pending.as_ref().map(RemoteCall::step) != Some(completion.step) {
            return Err(ProvisionError::UnexpectedEvent {
                stage: active.pipeline.stage(),
                event: completion.step,
            });
        }

        if !self.ports.notifier.is_alive() {
            tracing::debug!(%attempt, step = %completion.step, "ui gone, abandoning attempt");
            self.active = None;
            self.last_outcome = Some(Outcome::Abandoned);
            return Ok(None);
        }
        active.pending = None;

        let stored_region = match self.ports.preferences.load().await {
            Ok(prefs) => prefs.server_region,
            Err(e) => return Err(self.fail(e)),
        };

        let Some(active) = self.active.as_mut() else {
            return Err(ProvisionError::StaleAttempt);
        };
        let actions = active.pipeline.handle(
            completion,
            RegionInputs {
                device_timezone: &self.settings.device_timezone,
                stored_region: &stored_region,
                region_override: &mut self.region_override,
            },
        )?;
        self.apply(actions).await
    }

    /// Runs one attempt to completion, awaiting the gateway for every call.
    pub async fn run(&mut self) -> Result<Outcome> {
        let attempt = self.begin().await?;
        while let Some(call) = self.pending_call().cloned() {
            let response = match self.ports.gateway.call(&call).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(%attempt, step = %call.step(), "transport error: {e}");
                    RemoteResponse::failed(None)
                }
            };
            self.dispatch(attempt, Completion::new(call.step(), response))
                .await?;
        }
        Ok(self.last_outcome.take().unwrap_or(Outcome::Abandoned))
    }

    async fn apply(&mut self, actions: Vec<Action>) -> Result<Option<Host>> {
        let mut shown = None;
        let mut first_err = None;
        for action in actions {
            match self.execute(action).await {
                Ok(Some(host)) => shown = Some(host),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("provisioning side effect failed: {e}");
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            return Err(self.fail(e));
        }

        let finished = self
            .active
            .as_ref()
            .is_some_and(|a| a.pipeline.stage().is_terminal());
        if finished {
            self.active = None;
        }
        Ok(shown)
    }

    async fn execute(&mut self, action: Action) -> Result<Option<Host>> {
        let attempt = self.current_attempt();
        match action {
            Action::Issue(call) => {
                tracing::debug!(?attempt, step = %call.step(), "issuing remote call");
                if let Some(active) = self.active.as_mut() {
                    active.pending = Some(call);
                }
            }
            Action::ResetPurchase => self.ports.preferences.reset_purchase().await?,
            Action::StopVpnIfConnected => {
                if self.ports.connection.is_connected().await {
                    tracing::info!(?attempt, "stopping active vpn connection");
                    self.ports.connection.stop().await?;
                }
            }
            Action::ReconcilePurchases => {
                if let Err(e) = self.ports.reconciler.reconcile().await {
                    tracing::warn!(?attempt, "purchase reconciliation failed: {e}");
                }
            }
            Action::PersistServerRegion(region) => {
                self.ports.preferences.set_server_region(&region).await?
            }
            Action::ShowHost(host) => {
                self.ports.notifier.show_host(&host);
                return Ok(Some(host));
            }
            Action::ProfileReady(profile) => {
                tracing::info!(?attempt, hostname = %profile.host.hostname, region = %profile.region, "profile ready");
                self.last_outcome = Some(Outcome::ProfileReady(profile));
            }
            Action::Abort { reason, message } => {
                tracing::warn!(?attempt, "provisioning aborted: {reason}");
                self.ports.notifier.show_error(&message);
                self.last_outcome = Some(Outcome::Aborted { reason, message });
            }
            Action::DismissProgress => self.ports.notifier.dismiss_progress(),
        }
        Ok(None)
    }

    /// Ends the current attempt on an infrastructure failure.
    ///
    /// An aborted pipeline has already dismissed progress through its own actions.
    fn fail(&mut self, error: ProvisionError) -> ProvisionError {
        if let Some(active) = self.active.take() {
            if !active.pipeline.stage().is_terminal() {
                self.ports.notifier.dismiss_progress();
            }
        }
        error
    }
}
