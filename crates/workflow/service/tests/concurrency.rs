//! Concurrent appends and background notary anchoring

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use workflow_service::{
    AppendError, ExternalReference, LocalNotary, NewInstance, Notary, NotaryError, ServiceConfig,
    ServiceError, StepReport, WorkflowService,
};
use workflow_types::{Digest, InstanceStatus, WorkflowDefinition, WorkflowNode};

fn review_chain() -> WorkflowDefinition {
    let mut def = WorkflowDefinition::new("review-chain", "Review Chain", 1)
        .with_node(WorkflowNode::start("start"))
        .with_node(WorkflowNode::review("review", "Peer review"))
        .with_node(WorkflowNode::end("end"));
    def.connect("start", "review");
    def.connect("review", "end");
    def
}

struct FailingNotary {
    calls: AtomicUsize,
}

#[async_trait]
impl Notary for FailingNotary {
    async fn anchor(&self, _hash: Digest) -> Result<ExternalReference, NotaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(NotaryError::Unavailable("connection refused".to_string()))
    }
}

struct SlowNotary;

#[async_trait]
impl Notary for SlowNotary {
    async fn anchor(&self, hash: Digest) -> Result<ExternalReference, NotaryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ExternalReference {
            hash,
            reference: "slow:0".to_string(),
            anchored_at: Utc::now(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_instances_append_in_parallel() {
    let service = Arc::new(WorkflowService::new(ServiceConfig::default()));
    let def = service.submit_definition(review_chain()).await.unwrap();

    let mut tasks = Vec::new();
    for n in 0..16 {
        let service = service.clone();
        let def_id = def.id().clone();
        tasks.push(tokio::spawn(async move {
            let instance = service
                .create_instance(&def_id, None, NewInstance::new(format!("owner-{n}")))
                .await
                .unwrap();
            for node in ["review", "end"] {
                service
                    .report_step(&instance.id, StepReport::completed(node, "reviewer"))
                    .await
                    .unwrap();
            }
            instance.id
        }));
    }

    for task in tasks {
        let id = task.await.unwrap();
        let report = service.get_report(&id).await.unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.status, InstanceStatus::Completed);
        assert_eq!(report.step_count, 2);
    }
    assert_eq!(service.list_instances(def.id()).len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_to_one_instance_serialize() {
    let mut config = ServiceConfig::default();
    config.ledger.append_wait_ms = 1_000;
    let service = Arc::new(WorkflowService::new(config));
    let def = service.submit_definition(review_chain()).await.unwrap();
    let instance = service
        .create_instance(def.id(), None, NewInstance::new("alice"))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let id = instance.id.clone();
        tasks.push(tokio::spawn(async move {
            service
                .report_step(&id, StepReport::completed("start", "reviewer"))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = service.get_instance(&instance.id).unwrap();
    let seqs: Vec<u64> = stored.steps.iter().map(|r| r.sequence_number).collect();
    assert_eq!(seqs, (0..8).collect::<Vec<_>>());
    assert!(service.get_report(&instance.id).await.unwrap().integrity_ok);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failing_notary_never_blocks_operations() {
    let notary = Arc::new(FailingNotary {
        calls: AtomicUsize::new(0),
    });
    let service = WorkflowService::new(ServiceConfig::default()).with_notary(notary.clone());

    let def = service.submit_definition(review_chain()).await.unwrap();
    let instance = service
        .create_instance(def.id(), None, NewInstance::new("alice"))
        .await
        .unwrap();
    for node in ["review", "end"] {
        service
            .report_step(&instance.id, StepReport::completed(node, "reviewer"))
            .await
            .unwrap();
    }
    service.flush_anchors().await;

    assert_eq!(notary.calls.load(Ordering::SeqCst), 2);
    assert!(service.anchor_for(&def.content_hash()).is_none());
    assert_eq!(
        service.get_instance(&instance.id).unwrap().status,
        InstanceStatus::Completed
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_notary_times_out() {
    let mut config = ServiceConfig::default();
    config.notary.timeout_ms = 50;
    let service = WorkflowService::new(config).with_notary(Arc::new(SlowNotary));

    let started = Instant::now();
    let def = service.submit_definition(review_chain()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    service.flush_anchors().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(service.anchor_for(&def.content_hash()).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_notary_records_anchor() {
    let notary = Arc::new(LocalNotary::new());
    let service = WorkflowService::new(ServiceConfig::default()).with_notary(notary.clone());

    let def = service.submit_definition(review_chain()).await.unwrap();
    service.flush_anchors().await;

    let anchor = service.anchor_for(&def.content_hash()).unwrap();
    assert_eq!(anchor.hash, def.content_hash());
    assert_eq!(anchor.reference, "local:0");
    assert_eq!(notary.anchored(), vec![def.content_hash()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_append_to_unknown_instance() {
    let service = WorkflowService::new(ServiceConfig::default());
    let missing = workflow_types::WorkflowInstanceId::new("missing");
    let err = service
        .report_step(&missing, StepReport::completed("review", "reviewer"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Append(AppendError::InstanceNotFound(_))
    ));
}
