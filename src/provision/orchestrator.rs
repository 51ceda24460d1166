//! The provisioning state machine: one linear pass that fills, persists,
//! and evaluates the module-to-model mapping, then waits (bounded) for the
//! workspace readiness gate. No remote failure past context loading aborts
//! a run; everything degrades into warnings on the final report.

use crate::provision::contracts::{JobOutcome, ProvisionClient};
use crate::provision::context::{LoadError, ProvisionContext};
use crate::provision::poll::poll_until;
use crate::provision::readiness::ReadinessResult;
use crate::provision::warnings::{ProvisionStep, ProvisionWarning};
use crate::registry::{is_compatible, ModuleMap};
use crate::runtime::telemetry::Telemetry;
use anyhow::{anyhow, bail, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Fixed readiness poll interval.
pub const POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Fixed overall readiness deadline, measured from the start of the poll
/// phase rather than the start of the whole run.
pub const READINESS_DEADLINE: Duration = Duration::from_millis(10_000);

/// Final state of a provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// The working mapping after the fill phase; a superset-or-equal, by
    /// key, of the mapping the run started from.
    pub mapping: ModuleMap,
    /// Last observed readiness, or the synthetic not-ready result when
    /// every probe attempt failed.
    pub readiness: ReadinessResult,
    /// Every failure the run swallowed on its way here.
    pub warnings: Vec<ProvisionWarning>,
}

impl ProvisionReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.readiness.is_ready()
    }
}

/// Drives a backend through best-effort provisioning passes.
///
/// Holds no mutable state between runs; a `Provisioner` can be reused, but
/// only one run per workspace may be in flight at a time. Serializing runs
/// is the caller's responsibility, and a started run has no abort path: it
/// proceeds to completion or to the readiness deadline.
pub struct Provisioner<C> {
    client: C,
    telemetry: Arc<Telemetry>,
}

impl<C: ProvisionClient> Provisioner<C> {
    pub fn new(client: C) -> Self {
        Self::with_telemetry(client, Arc::new(Telemetry::default()))
    }

    pub fn with_telemetry(client: C, telemetry: Arc<Telemetry>) -> Self {
        Self { client, telemetry }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Loads the registry state and runs one provisioning pass over it.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if the initial state cannot be fetched; no
    /// partial run is attempted in that case.
    pub async fn run(&self) -> Result<ProvisionReport, LoadError> {
        let context = ProvisionContext::load(&self.client).await?;
        Ok(self.provision(&context).await)
    }

    /// One linear pass over `context`: fill, validate, persist, evaluate,
    /// then poll readiness.
    pub async fn provision(&self, context: &ProvisionContext) -> ProvisionReport {
        let seed = context.workspace.effective_seed();
        let selected = &context.workspace.selected_modules;
        let mut warnings = Vec::new();
        let mut mapping = context.mapping.clone();

        tracing::info!(
            workspace = %context.workspace.id,
            selected = selected.len(),
            seed,
            "provisioning run started"
        );

        self.fill(selected, seed, &mut mapping, &mut warnings).await;
        let excluded = self.validate_mapping(context, &mut warnings);
        self.persist(&mapping, &mut warnings).await;
        self.evaluate(selected, seed, &mapping, &excluded, &mut warnings)
            .await;
        let readiness = self.await_readiness(&mut warnings).await;

        // Invariant: a run never removes a mapping entry it started with.
        debug_assert!(mapping.is_superset_of(&context.mapping));

        tracing::info!(
            mapped = mapping.len(),
            warnings = warnings.len(),
            ready = readiness.is_ready(),
            "provisioning run finished"
        );

        ProvisionReport {
            mapping,
            readiness,
            warnings,
        }
    }

    /// Trains a model for `module_id` from an explicit neural net spec and
    /// returns the new model id.
    ///
    /// Unlike the provisioning pass this is a user-triggered operation, so
    /// failures propagate instead of becoming warnings; mapping the
    /// returned id is the caller's decision.
    pub async fn materialize_model(
        &self,
        module_id: &str,
        nn_id: &str,
        seed: u64,
    ) -> Result<String> {
        self.telemetry.record_training();
        let outcome = self.client.train(module_id, seed, Some(nn_id)).await?;
        if !outcome.success {
            bail!(
                "training {module_id} from {nn_id} failed: {}",
                outcome.error.as_deref().unwrap_or("job did not finish")
            );
        }
        outcome
            .model_id
            .ok_or_else(|| anyhow!("training {module_id} from {nn_id} finished without a model id"))
    }

    /// Ensures every selected module has a mapping entry where possible.
    /// Unmapped modules get a fresh training run; already-mapped modules
    /// get a warm-up run whose outcome never touches the mapping entry.
    async fn fill(
        &self,
        selected: &[String],
        seed: u64,
        mapping: &mut ModuleMap,
        warnings: &mut Vec<ProvisionWarning>,
    ) {
        for module_id in selected {
            if mapping.contains(module_id) {
                self.telemetry.record_warmup();
                match self.client.train(module_id, seed, None).await {
                    Ok(outcome) if outcome.success => {
                        tracing::debug!(%module_id, "warm-up training refreshed artifacts");
                    }
                    Ok(outcome) => self.warn(
                        warnings,
                        step_warning(ProvisionStep::WarmUp, Some(module_id.as_str()), job_message(&outcome)),
                    ),
                    Err(err) => self.warn(
                        warnings,
                        step_warning(ProvisionStep::WarmUp, Some(module_id.as_str()), format!("{err:#}")),
                    ),
                }
                continue;
            }

            self.telemetry.record_training();
            match self.client.train(module_id, seed, None).await {
                Ok(JobOutcome {
                    success: true,
                    model_id: Some(model_id),
                    ..
                }) => {
                    tracing::info!(%module_id, %model_id, "trained model for unmapped module");
                    mapping.record(module_id.clone(), model_id);
                }
                Ok(outcome) => self.warn(
                    warnings,
                    step_warning(ProvisionStep::Train, Some(module_id.as_str()), job_message(&outcome)),
                ),
                Err(err) => self.warn(
                    warnings,
                    step_warning(ProvisionStep::Train, Some(module_id.as_str()), format!("{err:#}")),
                ),
            }
        }
    }

    /// Checks pre-existing mapping entries for the selected modules against
    /// the known module and model sets. Offending entries stay in the
    /// mapping (an existing entry is never removed) but are excluded from
    /// the evaluate phase. Entries recorded by this run came from the job
    /// runner and are trusted.
    fn validate_mapping(
        &self,
        context: &ProvisionContext,
        warnings: &mut Vec<ProvisionWarning>,
    ) -> HashSet<String> {
        let mut excluded = HashSet::new();
        for module_id in &context.workspace.selected_modules {
            let Some(model_id) = context.mapping.model_for(module_id) else {
                continue;
            };
            // Without module metadata there is nothing to check against.
            let Some(module) = context.module(module_id) else {
                continue;
            };
            match context.model(model_id) {
                None => {
                    excluded.insert(module_id.clone());
                    self.warn(
                        warnings,
                        ProvisionWarning::UnknownModel {
                            module_id: module_id.clone(),
                            model_id: model_id.to_owned(),
                        },
                    );
                }
                Some(model) if !is_compatible(module, model) => {
                    excluded.insert(module_id.clone());
                    self.warn(
                        warnings,
                        ProvisionWarning::Incompatible {
                            module_id: module_id.clone(),
                            model_id: model_id.to_owned(),
                        },
                    );
                }
                Some(_) => {}
            }
        }
        excluded
    }

    /// Saves the working mapping. On failure the run keeps using the
    /// in-memory copy.
    async fn persist(&self, mapping: &ModuleMap, warnings: &mut Vec<ProvisionWarning>) {
        if let Err(err) = self.client.save_mapping(mapping).await {
            self.warn(
                warnings,
                step_warning(ProvisionStep::Persist, None, format!("{err:#}")),
            );
        }
    }

    /// Submits an evaluation for every selected module that is mapped in
    /// the working copy and was not excluded by validation. One module's
    /// failure never blocks another's evaluation.
    async fn evaluate(
        &self,
        selected: &[String],
        seed: u64,
        mapping: &ModuleMap,
        excluded: &HashSet<String>,
        warnings: &mut Vec<ProvisionWarning>,
    ) {
        for module_id in selected {
            let Some(model_id) = mapping.model_for(module_id) else {
                tracing::debug!(%module_id, "module unmapped after fill; skipping evaluation");
                continue;
            };
            if excluded.contains(module_id) {
                continue;
            }
            self.telemetry.record_evaluation();
            match self.client.evaluate(module_id, seed, model_id).await {
                Ok(outcome) if outcome.success => {
                    tracing::debug!(%module_id, model_id, "evaluation produced fresh metrics");
                }
                Ok(outcome) => self.warn(
                    warnings,
                    step_warning(ProvisionStep::Evaluate, Some(module_id.as_str()), job_message(&outcome)),
                ),
                Err(err) => self.warn(
                    warnings,
                    step_warning(ProvisionStep::Evaluate, Some(module_id.as_str()), format!("{err:#}")),
                ),
            }
        }
    }

    /// Polls the readiness probe until `ready` or the fixed deadline. Probe
    /// failures are treated as "not yet ready"; the deadline bounds the
    /// wait but never fails the run.
    async fn await_readiness(&self, warnings: &mut Vec<ProvisionWarning>) -> ReadinessResult {
        let client = &self.client;
        let telemetry = Arc::clone(&self.telemetry);
        let outcome = poll_until(
            POLL_INTERVAL,
            READINESS_DEADLINE,
            move || {
                telemetry.record_probe();
                client.probe()
            },
            ReadinessResult::is_ready,
        )
        .await;

        if !outcome.settled {
            self.warn(
                warnings,
                ProvisionWarning::ReadinessTimeout {
                    waited: outcome.waited,
                },
            );
        }

        match outcome.last {
            Some(result) => result,
            None => ReadinessResult::no_successful_probe(),
        }
    }

    fn warn(&self, warnings: &mut Vec<ProvisionWarning>, warning: ProvisionWarning) {
        self.telemetry.record_warning();
        tracing::warn!(%warning, "provisioning step degraded");
        warnings.push(warning);
    }
}

fn step_warning(
    step: ProvisionStep,
    module_id: Option<&str>,
    message: String,
) -> ProvisionWarning {
    ProvisionWarning::Step {
        step,
        module_id: module_id.map(str::to_owned),
        message,
    }
}

fn job_message(outcome: &JobOutcome) -> String {
    match &outcome.error {
        Some(error) => error.clone(),
        None if outcome.success => "job finished without a model id".to_owned(),
        None => "job did not finish".to_owned(),
    }
}
