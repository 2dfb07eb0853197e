//! Workflow service: the boundary every external collaborator calls
//!
//! - Editor: `submit_definition`
//! - Actor system: `create_instance`, `report_step`
//! - Viewer: `get_report`, `get_history`, `get_instance`, `list_instances`
//!
//! The registry, ledger, and verifier do all the work; this layer resolves
//! definitions, applies configuration, and schedules notary anchoring.
//! Ledger calls that may wait on an instance lock or a role lookup run on
//! the blocking pool, never on an async worker.

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::notary::{ExternalReference, Notary};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use workflow_ledger::{
    HistoryPage, InstanceLedger, LedgerError, NewInstance, RoleResolver, StepReport,
};
use workflow_registry::DefinitionRegistry;
use workflow_types::{
    Digest, RegisteredDefinition, WorkflowDefinition, WorkflowDefinitionId, WorkflowInstance,
    WorkflowInstanceId, WorkflowStepRecord,
};
use workflow_verifier::VerificationReport;

/// Workflow definition registry, instance ledger, and verifier behind one API
pub struct WorkflowService {
    config: ServiceConfig,
    registry: DefinitionRegistry,
    ledger: Arc<InstanceLedger>,
    notary: Option<Arc<dyn Notary>>,
    anchors: Arc<DashMap<Digest, ExternalReference>>,
    pending_anchors: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkflowService {
    /// Build a service using the configured static role table
    pub fn new(config: ServiceConfig) -> Self {
        let roles = Arc::new(config.role_resolver());
        Self::with_role_resolver(config, roles)
    }

    /// Build a service with an externally owned role resolver
    pub fn with_role_resolver(config: ServiceConfig, roles: Arc<dyn RoleResolver>) -> Self {
        let ledger = Arc::new(
            InstanceLedger::new(roles).with_append_wait(config.ledger.append_wait()),
        );
        Self {
            config,
            registry: DefinitionRegistry::new(),
            ledger,
            notary: None,
            anchors: Arc::new(DashMap::new()),
            pending_anchors: Mutex::new(Vec::new()),
        }
    }

    /// Anchor registered content hashes and terminal chain hashes
    pub fn with_notary(mut self, notary: Arc<dyn Notary>) -> Self {
        self.notary = Some(notary);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &InstanceLedger {
        &self.ledger
    }

    // ── Editor ───────────────────────────────────────────────────────

    /// Validate and register a draft
    pub async fn submit_definition(
        &self,
        draft: WorkflowDefinition,
    ) -> ServiceResult<Arc<RegisteredDefinition>> {
        let registered = self.registry.register(draft)?;
        self.anchor_in_background(registered.content_hash());
        Ok(registered)
    }

    /// A registered definition; the latest version when `version` is `None`
    pub fn get_definition(
        &self,
        id: &WorkflowDefinitionId,
        version: Option<u32>,
    ) -> ServiceResult<Arc<RegisteredDefinition>> {
        let found = match version {
            Some(version) => self.registry.get(id, version),
            None => self.registry.latest(id),
        };
        found.ok_or_else(|| ServiceError::DefinitionNotFound {
            id: id.clone(),
            version,
        })
    }

    pub fn list_definitions(&self) -> Vec<Arc<RegisteredDefinition>> {
        self.registry.list()
    }

    // ── Actor system ─────────────────────────────────────────────────

    /// Start a new instance of a registered definition
    pub async fn create_instance(
        &self,
        definition_id: &WorkflowDefinitionId,
        version: Option<u32>,
        request: NewInstance,
    ) -> ServiceResult<WorkflowInstance> {
        let definition = self.get_definition(definition_id, version)?;
        Ok(self.ledger.create(definition, request))
    }

    /// Load an exported instance and verify it against its pinned definition
    pub async fn import_instance(
        &self,
        instance: WorkflowInstance,
    ) -> ServiceResult<VerificationReport> {
        let definition =
            self.get_definition(&instance.definition_id, Some(instance.definition_version))?;
        self.on_ledger(move |ledger| Ok(ledger.import(instance, definition)?))
            .await
    }

    /// Record a step. Once the instance turns terminal its chain hash is
    /// handed to the notary.
    pub async fn report_step(
        &self,
        instance_id: &WorkflowInstanceId,
        report: StepReport,
    ) -> ServiceResult<WorkflowStepRecord> {
        let id = instance_id.clone();
        let (record, instance) = self
            .on_ledger(move |ledger| {
                let record = ledger.append(&id, report)?;
                Ok((record, ledger.get(&id)))
            })
            .await?;

        if let Some(instance) = instance {
            if instance.is_terminal() && instance.chain_hash == record.hash {
                tracing::info!(
                    instance_id = %instance_id,
                    status = %instance.status,
                    chain_hash = %instance.chain_hash,
                    "Workflow instance reached terminal status"
                );
                self.anchor_in_background(instance.chain_hash);
            }
        }
        Ok(record)
    }

    // ── Viewer ───────────────────────────────────────────────────────

    /// Verify an instance; a failed integrity check halts further appends
    pub async fn get_report(
        &self,
        instance_id: &WorkflowInstanceId,
    ) -> ServiceResult<VerificationReport> {
        let id = instance_id.clone();
        self.on_ledger(move |ledger| ledger.verify(&id).map_err(not_found))
            .await
    }

    /// A page of step records; `limit` is bounded by the history config
    pub fn get_history(
        &self,
        instance_id: &WorkflowInstanceId,
        offset: usize,
        limit: Option<usize>,
    ) -> ServiceResult<HistoryPage> {
        let limit = self.config.history.page_size(limit);
        self.ledger
            .history(instance_id, offset, limit)
            .map_err(not_found)
    }

    pub fn get_instance(
        &self,
        instance_id: &WorkflowInstanceId,
    ) -> ServiceResult<WorkflowInstance> {
        self.ledger
            .get(instance_id)
            .ok_or_else(|| ServiceError::InstanceNotFound(instance_id.clone()))
    }

    /// Instances of a definition, in creation order
    pub fn list_instances(&self, definition_id: &WorkflowDefinitionId) -> Vec<WorkflowInstance> {
        self.ledger.instances_for(definition_id)
    }

    /// Run a ledger call on the blocking pool
    async fn on_ledger<T, F>(&self, call: F) -> ServiceResult<T>
    where
        F: FnOnce(&InstanceLedger) -> ServiceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || call(&ledger))
            .await
            .map_err(|error| ServiceError::TaskFailed(error.to_string()))?
    }

    // ── Notary ───────────────────────────────────────────────────────

    /// Reference returned by the notary for a hash, once anchored
    pub fn anchor_for(&self, hash: &Digest) -> Option<ExternalReference> {
        self.anchors.get(hash).map(|entry| entry.value().clone())
    }

    /// Wait for every scheduled anchoring task to finish
    pub async fn flush_anchors(&self) {
        let pending: Vec<_> = std::mem::take(&mut *self.pending_anchors.lock());
        for handle in pending {
            if let Err(error) = handle.await {
                tracing::warn!(error = %error, "Anchoring task aborted");
            }
        }
    }

    fn anchor_in_background(&self, hash: Digest) {
        let Some(notary) = self.notary.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(hash = %hash, "No async runtime; anchoring skipped");
            return;
        };

        let anchors = self.anchors.clone();
        let timeout = self.config.notary.timeout();
        let handle = runtime.spawn(async move {
            match tokio::time::timeout(timeout, notary.anchor(hash)).await {
                Ok(Ok(reference)) => {
                    tracing::info!(
                        hash = %hash,
                        reference = %reference.reference,
                        "Hash anchored"
                    );
                    anchors.insert(hash, reference);
                }
                Ok(Err(error)) => {
                    tracing::warn!(hash = %hash, error = %error, "Anchoring failed");
                }
                Err(_) => {
                    tracing::warn!(
                        hash = %hash,
                        timeout_ms = timeout.as_millis() as u64,
                        "Anchoring timed out"
                    );
                }
            }
        });

        let mut pending = self.pending_anchors.lock();
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }
}

fn not_found(error: LedgerError) -> ServiceError {
    match error {
        LedgerError::InstanceNotFound(id) => ServiceError::InstanceNotFound(id),
        other => ServiceError::Ledger(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notary::LocalNotary;
    use std::time::{Duration, Instant};
    use workflow_types::{InstanceStatus, WorkflowNode};

    fn draft(version: u32) -> WorkflowDefinition {
        let mut def = WorkflowDefinition::new("onboarding", "Onboarding", version)
            .with_node(WorkflowNode::start("start"))
            .with_node(WorkflowNode::manual("setup", "Account setup"))
            .with_node(WorkflowNode::end("end"));
        def.connect("start", "setup");
        def.connect("setup", "end");
        def
    }

    #[tokio::test]
    async fn test_create_instance_uses_latest_version() {
        let service = WorkflowService::new(ServiceConfig::default());
        service.submit_definition(draft(1)).await.unwrap();
        service.submit_definition(draft(2)).await.unwrap();

        let id = WorkflowDefinitionId::new("onboarding");
        let latest = service
            .create_instance(&id, None, NewInstance::new("alice"))
            .await
            .unwrap();
        assert_eq!(latest.definition_version, 2);

        let pinned = service
            .create_instance(&id, Some(1), NewInstance::new("alice"))
            .await
            .unwrap();
        assert_eq!(pinned.definition_version, 1);
    }

    #[tokio::test]
    async fn test_unknown_definition_version() {
        let service = WorkflowService::new(ServiceConfig::default());
        service.submit_definition(draft(1)).await.unwrap();

        let err = service
            .create_instance(
                &WorkflowDefinitionId::new("onboarding"),
                Some(7),
                NewInstance::new("alice"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::DefinitionNotFound {
                version: Some(7),
                ..
            }
        ));
        assert_eq!(err.to_string(), "definition not found: onboarding v7");
    }

    #[tokio::test]
    async fn test_history_limit_is_clamped() {
        let mut config = ServiceConfig::default();
        config.history.max_page_size = 1;
        let service = WorkflowService::new(config);
        let def = service.submit_definition(draft(1)).await.unwrap();

        let instance = service
            .create_instance(def.id(), None, NewInstance::new("alice"))
            .await
            .unwrap();
        service
            .report_step(&instance.id, StepReport::completed("start", "alice"))
            .await
            .unwrap();
        service
            .report_step(&instance.id, StepReport::completed("setup", "alice"))
            .await
            .unwrap();

        let page = service.get_history(&instance.id, 0, Some(10)).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, 2);
        assert_eq!(page.next_offset, Some(1));
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let service = WorkflowService::new(ServiceConfig::default());
        let missing = WorkflowInstanceId::new("missing");

        assert!(matches!(
            service.get_report(&missing).await,
            Err(ServiceError::InstanceNotFound(_))
        ));
        assert!(matches!(
            service.get_history(&missing, 0, None),
            Err(ServiceError::InstanceNotFound(_))
        ));
        assert!(matches!(
            service.get_instance(&missing),
            Err(ServiceError::InstanceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_terminal_chain_hash_is_anchored() {
        let notary = Arc::new(LocalNotary::new());
        let service = WorkflowService::new(ServiceConfig::default()).with_notary(notary.clone());
        let def = service.submit_definition(draft(1)).await.unwrap();

        let instance = service
            .create_instance(def.id(), None, NewInstance::new("alice"))
            .await
            .unwrap();
        for node in ["start", "setup", "end"] {
            service
                .report_step(&instance.id, StepReport::completed(node, "alice"))
                .await
                .unwrap();
        }
        service.flush_anchors().await;

        let instance = service.get_instance(&instance.id).unwrap();
        assert_eq!(instance.status, InstanceStatus::Completed);
        assert!(service.anchor_for(&def.content_hash()).is_some());
        assert!(service.anchor_for(&instance.chain_hash).is_some());
        let anchored = notary.anchored();
        assert_eq!(anchored.len(), 2);
        assert!(anchored.contains(&def.content_hash()));
        assert!(anchored.contains(&instance.chain_hash));
    }

    #[tokio::test]
    async fn test_slow_append_leaves_runtime_responsive() {
        let roles = |actor: &str, role: &str| {
            std::thread::sleep(Duration::from_millis(300));
            actor == "alice" && role == "Admin"
        };
        let service = Arc::new(WorkflowService::with_role_resolver(
            ServiceConfig::default(),
            Arc::new(roles),
        ));

        let mut def = WorkflowDefinition::new("access", "Access request", 1)
            .with_node(WorkflowNode::start("start"))
            .with_node(WorkflowNode::manual("grant", "Grant access").with_role("Admin"))
            .with_node(WorkflowNode::end("end"));
        def.connect("start", "grant");
        def.connect("grant", "end");
        let def = service.submit_definition(def).await.unwrap();
        let instance = service
            .create_instance(def.id(), None, NewInstance::new("alice"))
            .await
            .unwrap();

        let started = Instant::now();
        let append = tokio::spawn({
            let service = service.clone();
            let id = instance.id.clone();
            async move {
                service
                    .report_step(&id, StepReport::completed("grant", "alice"))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(started.elapsed() < Duration::from_millis(200));

        let record = append.await.unwrap().unwrap();
        assert_eq!(record.node_id.as_str(), "grant");
    }
}
