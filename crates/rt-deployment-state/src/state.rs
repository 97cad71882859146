// crates/rt-deployment-state/src/state.rs
// ============================================================================
// Module: Deployment State Aggregate
// Description: Multi-backend reads, fan-out writes and deployment bookkeeping.
// Purpose: Give commands one handle over every configured backend.
// Dependencies: rt-config, rt-core, crate::{backend, error, registry}
// ============================================================================

//! ## Overview
//! Reads are served by the first configured backend. Writes go to every
//! backend in document order and stop at the first failure, so a later
//! backend can lag behind an earlier one but never lead it. Deployment
//! bookkeeping (begin and finish) keeps the slot record in step with the
//! deployment record on each backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rt_config::DeploymentStateBlock;
use rt_core::AppName;
use rt_core::ApplicationData;
use rt_core::DeployPilot;
use rt_core::DeploymentData;
use rt_core::DeploymentId;
use rt_core::FinishedTerraformRun;
use rt_core::RT_VERSION;
use rt_core::SlotData;
use rt_core::SlotId;
use rt_core::TerraformRun;
use rt_core::Timestamp;
use rt_core::schema::DEPLOYMENT_SCHEMA_VERSION;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::error::RegistryError;
use crate::error::StateError;
use crate::registry::BackendKindRegistry;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Inputs for starting a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Run destroys the slot's resources.
    pub is_destroy: bool,
    /// Who is deploying.
    pub deploy_pilot: Option<DeployPilot>,
    /// Deployment start instant.
    pub start_time: Timestamp,
    /// Provisioner input variables.
    pub variables: BTreeMap<String, String>,
    /// Provisioner version.
    pub terraform_version: String,
}

// ============================================================================
// SECTION: Aggregate
// ============================================================================

/// Every configured deployment state backend, in document order.
pub struct DeploymentState {
    /// Initialized backends.
    backends: Vec<Box<dyn Backend>>,
}

impl DeploymentState {
    /// Builds the aggregate from `deployment_state` blocks.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] as described on [`BackendKindRegistry::build`].
    pub fn new(kinds: &BackendKindRegistry, blocks: &[DeploymentStateBlock]) -> Result<Self, RegistryError> {
        let backends = kinds.build(blocks)?;
        Ok(Self {
            backends,
        })
    }

    /// Wraps already initialized backends.
    #[must_use]
    pub fn from_backends(backends: Vec<Box<dyn Backend>>) -> Self {
        Self {
            backends,
        }
    }

    /// Returns the configured backends in order.
    #[must_use]
    pub fn backends(&self) -> &[Box<dyn Backend>] {
        &self.backends
    }

    /// Returns kind names of the configured backends in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.backends.iter().map(|backend| backend.kind()).collect()
    }

    /// Returns the backend serving reads.
    fn first(&self) -> Result<&dyn Backend, StateError> {
        self.backends.first().map(Box::as_ref).ok_or(StateError::NoBackend)
    }

    /// Checks every backend; true only when all report ready.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Backend`] naming the first backend that failed.
    pub fn are_backends_ready(&self) -> Result<bool, StateError> {
        let mut ready = true;
        for backend in &self.backends {
            let backend_ready = backend.is_ready().map_err(|err| {
                StateError::backend(format!("There was an error getting backend {} ready", backend.kind()), err)
            })?;
            tracing::debug!(kind = backend.kind(), ready = backend_ready, "checked backend readiness");
            ready &= backend_ready;
        }
        Ok(ready)
    }

    /// Returns whether the read backend supports write locks.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoBackend`] when nothing is configured.
    pub fn supports_write_lock(&self) -> Result<bool, StateError> {
        Ok(self.first()?.supports_write_lock())
    }

    // ------------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------------

    /// Lists every application.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the read backend fails.
    pub fn list_applications(&self) -> Result<Vec<ApplicationData>, StateError> {
        self.first()?
            .list_applications()
            .map_err(|err| StateError::backend("Failed listing applications", err))
    }

    /// Reads one application.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`]; [`StateError::is_not_found`] holds for a
    /// missing application.
    pub fn get_application(&self, app: &AppName) -> Result<ApplicationData, StateError> {
        self.first()?
            .get_application(app)
            .map_err(|err| StateError::backend(format!("Failed to get application \"{app}\""), err))
    }

    /// Writes one application to every backend.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] for the first backend that fails.
    pub fn save_application(&self, app: &AppName, data: &ApplicationData) -> Result<(), StateError> {
        self.fan_out(|backend| {
            backend.save_application(app, data).map_err(|err| {
                StateError::backend(format!("Failed to save application data to backend {}", backend.kind()), err)
            })
        })
    }

    // ------------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------------

    /// Lists every slot of an application.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the read backend fails.
    pub fn list_slots(&self, app: &AppName) -> Result<Vec<SlotData>, StateError> {
        self.first()?
            .list_slots(app)
            .map_err(|err| StateError::backend(format!("Failed to list slots for \"{app}\""), err))
    }

    /// Reads one slot.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`]; [`StateError::is_not_found`] holds for a
    /// missing slot.
    pub fn get_slot(&self, app: &AppName, slot: &SlotId) -> Result<SlotData, StateError> {
        self.first()?
            .get_slot(app, slot)
            .map_err(|err| StateError::backend(format!("Failed to get slot {slot} for \"{app}\""), err))
    }

    /// Writes one slot to every backend.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] for the first backend that fails.
    pub fn save_slot(&self, app: &AppName, slot: &SlotId, data: &SlotData) -> Result<(), StateError> {
        self.fan_out(|backend| {
            backend.save_slot(app, slot, data).map_err(|err| {
                StateError::backend(format!("Unable to save slot data for {app} / {slot}"), err)
            })
        })
    }

    /// Deletes a slot on every backend, attempting all of them.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DeleteSlot`] listing every backend that failed.
    pub fn delete_slot(&self, app: &AppName, slot: &SlotId) -> Result<(), StateError> {
        let mut failures = Vec::new();
        for backend in &self.backends {
            if let Err(err) = backend.delete_slot(app, slot) {
                tracing::warn!(kind = backend.kind(), app = %app, slot = %slot, error = %err, "slot delete failed");
                failures.push(format!("{}: {err}", backend.kind()));
            }
        }
        if failures.is_empty() {
            return Ok(());
        }
        Err(StateError::DeleteSlot {
            app: app.to_string(),
            slot: slot.to_string(),
            failures,
        })
    }

    // ------------------------------------------------------------------------
    // Slot Counters
    // ------------------------------------------------------------------------

    /// Returns the slot counter for `prefix`, if the application has one.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the application cannot be read.
    pub fn get_slot_counter(&self, app: &AppName, prefix: &str) -> Result<Option<i64>, StateError> {
        Ok(self.get_application(app)?.slot_counter(prefix))
    }

    /// Adds a slot counter starting at zero and saves the application.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::SlotCounter`] when the counter already exists.
    pub fn add_slot_counter(&self, app: &AppName, prefix: &str) -> Result<(), StateError> {
        let mut data = self.get_application(app)?;
        data.add_slot_counter(prefix)?;
        self.save_application(app, &data)
    }

    /// Increments a slot counter, saves the application and returns the new
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the application cannot be read or saved.
    pub fn increment_slot_counter(&self, app: &AppName, prefix: &str) -> Result<i64, StateError> {
        let mut data = self.get_application(app)?;
        let value = data.increment_slot_counter(prefix);
        self.save_application(app, &data)?;
        Ok(value)
    }

    /// Removes a slot counter and saves the application.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::SlotCounter`] when the counter does not exist.
    pub fn delete_slot_counter(&self, app: &AppName, prefix: &str) -> Result<(), StateError> {
        let mut data = self.get_application(app)?;
        data.delete_slot_counter(prefix)?;
        self.save_application(app, &data)
    }

    // ------------------------------------------------------------------------
    // Deployments
    // ------------------------------------------------------------------------

    /// Lists the most recent deployments of a slot.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the read backend fails.
    pub fn list_last_deployments(
        &self,
        app: &AppName,
        slot: &SlotId,
        limit: usize,
    ) -> Result<Vec<DeploymentData>, StateError> {
        self.first()?.list_sorted_deployments(app, slot, limit).map_err(|err| {
            StateError::backend(format!("Failed to list last {limit} deployments of \"{app}\"/\"{slot}\""), err)
        })
    }

    /// Reads one deployment.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`]; [`StateError::is_not_found`] holds for a
    /// missing deployment.
    pub fn get_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
    ) -> Result<DeploymentData, StateError> {
        self.first()?.get_deployment(app, slot, deployment).map_err(|err| {
            StateError::backend(format!("Failed getting deployment {deployment} of \"{app}\" for slot {slot}"), err)
        })
    }

    /// Records the start of a deployment on every backend.
    ///
    /// The slot is created active when it does not exist yet. Its pilot and
    /// start time are updated, then the new deployment record is written.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] for the first backend that fails.
    pub fn begin_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        request: DeploymentRequest,
    ) -> Result<DeploymentData, StateError> {
        let deployment_id = DeploymentId::from_start_time(request.start_time);
        let data = DeploymentData {
            schema_version: DEPLOYMENT_SCHEMA_VERSION,
            deployment_id: deployment_id.clone(),
            deploy_pilot: request.deploy_pilot.clone(),
            start_time: request.start_time,
            terraform: Some(TerraformRun {
                is_destroy: request.is_destroy,
                variables: request.variables,
                terraform_version: request.terraform_version,
                ..TerraformRun::default()
            }),
            rt_version: RT_VERSION.to_string(),
            ..DeploymentData::default()
        };
        self.fan_out(|backend| {
            let mut slot_data = match backend.get_slot(app, slot) {
                Ok(slot_data) => slot_data,
                Err(BackendError::SlotNotFound { .. }) => {
                    tracing::debug!(kind = backend.kind(), app = %app, slot = %slot, "creating slot");
                    SlotData {
                        slot_id: slot.clone(),
                        is_active: true,
                        ..SlotData::default()
                    }
                }
                Err(err) => {
                    return Err(StateError::backend(format!("Unable to get slot data for {app} / {slot}"), err));
                }
            };
            slot_data.last_deploy_pilot.clone_from(&request.deploy_pilot);
            slot_data.last_deployment_start_time = request.start_time;
            backend.save_slot(app, slot, &slot_data).map_err(|err| {
                StateError::backend(format!("Unable to save slot data for {app} / {slot}"), err)
            })?;
            backend.save_deployment(app, slot, &deployment_id, &data).map_err(|err| {
                StateError::backend(
                    format!("There was an error beginning the deployment with backend {}", backend.kind()),
                    err,
                )
            })
        })?;
        tracing::debug!(app = %app, slot = %slot, deployment = %deployment_id, "began deployment");
        Ok(data)
    }

    /// Records the end of a deployment on every backend.
    ///
    /// Copies the run results into `data`, saves the deployment, then marks
    /// the slot active or inactive and stores the run as its last run.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] for the first backend that fails.
    pub fn finish_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        is_active: bool,
        data: &mut DeploymentData,
        finished: FinishedTerraformRun,
    ) -> Result<(), StateError> {
        data.terraform.get_or_insert_with(TerraformRun::default).apply_finished(finished);
        let deployment_id = data.deployment_id.clone();
        let record: &DeploymentData = data;
        self.fan_out(|backend| {
            backend.save_deployment(app, slot, &deployment_id, record).map_err(|err| {
                StateError::backend(
                    format!("There was an error finishing the deployment with backend {}", backend.kind()),
                    err,
                )
            })?;
            let mut slot_data = backend.get_slot(app, slot).map_err(|err| {
                StateError::backend(format!("Unable to get slot data for {app} / {slot}"), err)
            })?;
            slot_data.is_active = is_active;
            slot_data.last_deploy_pilot.clone_from(&record.deploy_pilot);
            slot_data.last_terraform_run.clone_from(&record.terraform);
            backend.save_slot(app, slot, &slot_data).map_err(|err| {
                StateError::backend(format!("Unable to save slot data for {app} / {slot}"), err)
            })
        })?;
        tracing::debug!(app = %app, slot = %slot, deployment = %deployment_id, is_active, "finished deployment");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Runs `write` against every backend in order, stopping at the first
    /// failure.
    fn fan_out<F>(&self, mut write: F) -> Result<(), StateError>
    where
        F: FnMut(&dyn Backend) -> Result<(), StateError>,
    {
        if self.backends.is_empty() {
            return Err(StateError::NoBackend);
        }
        for backend in &self.backends {
            write(backend.as_ref())?;
        }
        Ok(())
    }
}
