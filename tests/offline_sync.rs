mod common;

use common::mocks::CallKind;
use common::offline_support::{setup_engine, test_sync_config};
use fieldsync::application::services::OfflineServiceTrait;
use fieldsync::application::ports::RemoteMethod;
use fieldsync::{
    AppError, AttachmentDraft, EntityClass, OfflineStore, RecordStatus, SyncAction, SyncEvent,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn offline_update_of_offline_create_targets_the_server_id() {
    let engine = setup_engine(test_sync_config(), false).await;

    let temp = engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Create,
            Some("T1"),
            json!({"title": "Leaking valve", "customerRequestId": "cr-1"}),
        )
        .await;
    assert_eq!(temp.as_str(), "T1");
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Update,
            Some("T1"),
            json!({"title": "Leaking valve, replaced"}),
        )
        .await;
    assert_eq!(engine.service.pending_count().await.unwrap(), 2);

    engine.go_online().await;
    let reports = engine.service.sync_now().await.unwrap();

    let work_orders = reports
        .iter()
        .find(|r| r.entity_class == EntityClass::WorkOrder)
        .unwrap();
    assert_eq!(work_orders.synced_count, 2);
    assert_eq!(work_orders.failed_count, 0);

    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 2);
    assert_eq!(sends[0].method, RemoteMethod::Post);
    assert_eq!(sends[0].path, "/work-orders");
    assert_eq!(sends[1].method, RemoteMethod::Put);
    assert_eq!(sends[1].path, "/work-orders/srv-1");
    assert_eq!(sends[1].body["id"], "srv-1");
    assert_eq!(engine.remote.calls_mentioning("T1").await, 0);

    let synced = engine.records(EntityClass::WorkOrder, RecordStatus::Synced).await;
    assert_eq!(synced.len(), 2);
    assert!(synced.iter().all(|r| r.depends_on.is_none()));
    assert_eq!(engine.service.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn group_context_fills_missing_fields_without_overriding_payload() {
    let engine = setup_engine(test_sync_config(), false).await;
    engine
        .remote
        .set_context(
            "/customer-requests/cr-9",
            json!({"customerName": "ACME", "address": "1 Main St", "customerPhone": "555"}),
        )
        .await;

    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Create,
            Some("T1"),
            json!({"customerRequestId": "cr-9"}),
        )
        .await;
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Update,
            Some("T1"),
            json!({"customerName": "Site contact"}),
        )
        .await;
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Execute,
            Some("T1"),
            json!({}),
        )
        .await;

    engine.go_online().await;
    engine.service.sync_now().await.unwrap();

    let context_calls: Vec<_> = engine
        .remote
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == CallKind::Context)
        .collect();
    assert_eq!(context_calls.len(), 1);

    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 3);
    let update = &sends[1];
    assert_eq!(update.body["customerName"], "Site contact");
    assert_eq!(update.body["address"], "1 Main St");
    assert_eq!(update.body["customerPhone"], "555");
    assert_eq!(sends[2].path, "/work-orders/srv-1/execute");
}

#[tokio::test]
async fn failed_context_fetch_does_not_stop_the_group() {
    let engine = setup_engine(test_sync_config(), false).await;

    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Create,
            Some("T5"),
            json!({"title": "Gate sensor", "customerRequestId": "cr-5"}),
        )
        .await;
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Update,
            Some("T5"),
            json!({"notes": "gate code 1234"}),
        )
        .await;

    engine.remote.fail_path_prefix("/customer-requests").await;
    engine.go_online().await;
    let reports = engine.service.sync_now().await.unwrap();

    let work_orders = reports
        .iter()
        .find(|r| r.entity_class == EntityClass::WorkOrder)
        .unwrap();
    assert_eq!(work_orders.synced_count, 2);
    assert_eq!(work_orders.failed_count, 0);

    let context_calls: Vec<_> = engine
        .remote
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == CallKind::Context)
        .collect();
    assert_eq!(context_calls.len(), 1);
    assert_eq!(context_calls[0].path, "/customer-requests/cr-5");

    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 2);
    assert_eq!(sends[0].path, "/work-orders");
    assert_eq!(sends[1].path, "/work-orders/srv-1");
    assert_eq!(
        sends[1].body,
        json!({"id": "srv-1", "notes": "gate code 1234"})
    );
}

#[tokio::test]
async fn images_upload_before_the_owner_update_that_lists_them() {
    let engine = setup_engine(test_sync_config(), false).await;

    let image = engine
        .service
        .save_attachment(
            EntityClass::ExecutionImage,
            AttachmentDraft::new("wo-77", "meter.jpg", "image/jpeg", vec![1, 2, 3, 4]),
        )
        .await
        .unwrap();
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Update,
            Some("wo-77"),
            json!({"imageIds": [image.as_str(), "img-existing", image.as_str()]}),
        )
        .await;

    engine.go_online().await;
    engine.service.sync_now().await.unwrap();

    let calls: Vec<_> = engine
        .remote
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind != CallKind::Context)
        .collect();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].kind, CallKind::Upload);
    assert_eq!(calls[0].path, "/execution-images/upload");
    assert_eq!(calls[0].body["parentId"], "wo-77");
    assert_eq!(calls[0].body["size"], 4);

    assert_eq!(calls[1].path, "/work-orders/wo-77");
    assert_eq!(calls[1].body["imageIds"], json!(["file-1", "img-existing"]));
    assert_eq!(engine.remote.calls_mentioning(image.as_str()).await, 0);
}

#[tokio::test]
async fn attachments_of_an_offline_owner_end_up_with_server_ids_only() {
    let engine = setup_engine(test_sync_config(), false).await;

    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Create,
            Some("T2"),
            json!({"title": "New install"}),
        )
        .await;
    let image = engine
        .service
        .save_attachment(
            EntityClass::ExecutionImage,
            AttachmentDraft::new("T2", "before.png", "image/png", vec![9; 16]),
        )
        .await
        .unwrap();
    let doc = engine
        .service
        .save_attachment(
            EntityClass::ExecutionAttachment,
            AttachmentDraft::new("T2", "sheet.pdf", "application/pdf", vec![7; 8]),
        )
        .await
        .unwrap();
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Update,
            Some("T2"),
            json!({"imageIds": [image.as_str()], "attachmentIds": [doc.as_str()]}),
        )
        .await;

    let queued = engine
        .store
        .get_attachment(EntityClass::ExecutionImage, &image)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(queued.depends_on.as_ref().map(|d| d.as_str()), Some("T2"));

    engine.go_online().await;
    engine.service.sync_now().await.unwrap();

    let uploads = engine.remote.uploads().await;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.body["parentId"].is_null()));

    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 2);
    assert_eq!(sends[1].path, "/work-orders/srv-1");
    assert_eq!(sends[1].body["imageIds"], json!(["file-1"]));
    assert_eq!(sends[1].body["attachmentIds"], json!(["file-2"]));

    for needle in ["T2", image.as_str(), doc.as_str()] {
        assert_eq!(engine.remote.calls_mentioning(needle).await, 0, "{needle} leaked");
    }

    let synced = engine
        .service
        .list_attachments(EntityClass::ExecutionImage, RecordStatus::Synced)
        .await
        .unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].server_id.as_ref().map(|s| s.as_str()), Some("file-1"));
}

#[tokio::test]
async fn child_records_wait_for_their_offline_parent() {
    let engine = setup_engine(test_sync_config(), false).await;

    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Create,
            Some("T3"),
            json!({"title": "Pump service"}),
        )
        .await;
    engine
        .queue(
            EntityClass::MaterialEquipment,
            SyncAction::Create,
            None,
            json!({"workOrderId": "T3", "name": "Gasket", "quantity": 2}),
        )
        .await;

    engine.remote.set_fail_all(true).await;
    engine.go_online().await;
    let reports = engine.service.sync_now().await.unwrap();

    let materials = reports
        .iter()
        .find(|r| r.entity_class == EntityClass::MaterialEquipment)
        .unwrap();
    assert_eq!(materials.deferred_count, 1);
    assert_eq!(engine.remote.sends().await.len(), 1);

    engine.remote.clear_failures().await;
    engine.service.sync_now().await.unwrap();

    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 3);
    assert_eq!(sends[2].path, "/material-equipment");
    assert_eq!(sends[2].body["workOrderId"], "srv-1");

    let synced = engine
        .records(EntityClass::MaterialEquipment, RecordStatus::Synced)
        .await;
    assert_eq!(synced[0].parent_id.as_deref(), Some("srv-1"));
}

#[tokio::test]
async fn failed_create_leaves_its_dependents_pending() {
    let engine = setup_engine(test_sync_config(), false).await;

    engine
        .queue(EntityClass::WorkOrderDraft, SyncAction::Create, Some("D1"), json!({}))
        .await;
    engine
        .queue(
            EntityClass::WorkOrderDraft,
            SyncAction::Update,
            Some("D1"),
            json!({"notes": "call ahead"}),
        )
        .await;

    engine.remote.set_fail_all(true).await;
    engine.go_online().await;
    let reports = engine.service.sync_now().await.unwrap();

    let drafts = reports
        .iter()
        .find(|r| r.entity_class == EntityClass::WorkOrderDraft)
        .unwrap();
    assert_eq!(drafts.failed_count, 1);
    assert_eq!(drafts.deferred_count, 1);
    assert_eq!(engine.remote.sends().await.len(), 1);

    let pending = engine
        .records(EntityClass::WorkOrderDraft, RecordStatus::Pending)
        .await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 0);
    assert_eq!(pending[0].action, SyncAction::Update);

    engine.remote.clear_failures().await;
    engine.service.sync_now().await.unwrap();
    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 3);
    assert_eq!(sends[2].path, "/work-orders/drafts/srv-1");
}

#[tokio::test]
async fn bulk_completion_is_a_single_remote_call() {
    let engine = setup_engine(test_sync_config(), false).await;
    let numbers = json!(["WO-1", "WO-2", "WO-3", "WO-4", "WO-5"]);

    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::CompleteBulk,
            None,
            json!({"workOrderNumbers": numbers}),
        )
        .await;

    engine.go_online().await;
    engine.service.sync_now().await.unwrap();

    let sends = engine.remote.sends().await;
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].path, "/work-orders/complete-bulk");
    assert_eq!(sends[0].body["workOrderNumbers"], numbers);
}

#[tokio::test]
async fn second_pass_with_nothing_pending_is_a_no_op() {
    let engine = setup_engine(test_sync_config(), false).await;
    engine
        .queue(
            EntityClass::Survey,
            SyncAction::Update,
            Some("sv-1"),
            json!({"workOrderId": "wo-1", "notes": "roof access"}),
        )
        .await;
    engine.go_online().await;

    let mut events = engine.service.subscribe_to_completion();
    engine.service.sync_now().await.unwrap();
    assert_eq!(
        events.try_recv(),
        Some(SyncEvent::Completed {
            entity_class: EntityClass::Survey,
            success_count: 1,
        })
    );

    let calls_before = engine.remote.calls().await.len();
    let reports = engine.service.sync_now().await.unwrap();
    assert!(reports.iter().all(|r| r.synced_count == 0 && r.failed_count == 0));
    assert_eq!(engine.remote.calls().await.len(), calls_before);
    assert_eq!(events.try_recv(), None);
}

#[tokio::test]
async fn concurrent_passes_for_one_class_do_not_overlap() {
    let engine = setup_engine(test_sync_config(), true).await;
    engine.remote.set_latency(Duration::from_millis(50)).await;
    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::Cancel,
            Some("wo-3"),
            json!({"reason": "duplicate"}),
        )
        .await;

    let (first, second) = tokio::join!(
        engine.orchestrator.sync_pending(EntityClass::WorkOrder),
        engine.orchestrator.sync_pending(EntityClass::WorkOrder),
    );
    let reports = [first.unwrap(), second.unwrap()];

    assert_eq!(reports.iter().filter(|r| r.skipped).count(), 1);
    assert_eq!(reports.iter().map(|r| r.synced_count).sum::<u32>(), 1);
    assert_eq!(engine.remote.sends().await.len(), 1);
    assert!(!engine.orchestrator.is_syncing());
}

#[tokio::test]
async fn sync_now_requires_connectivity() {
    let engine = setup_engine(test_sync_config(), false).await;
    let err = engine.service.sync_now().await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
}

#[tokio::test]
async fn unavailable_store_rejects_the_enqueue() {
    let engine = setup_engine(test_sync_config(), false).await;
    engine.pool.close().await;

    let err = engine
        .service
        .save_offline(common::offline_support::params(
            EntityClass::WorkOrder,
            SyncAction::Create,
            json!({"title": "never stored"}),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
}

#[tokio::test]
async fn invalid_enqueues_are_rejected() {
    let engine = setup_engine(test_sync_config(), false).await;
    let service = &engine.service;

    let unsupported = service
        .save_offline(common::offline_support::params(
            EntityClass::Survey,
            SyncAction::Execute,
            json!({"id": "sv-1"}),
        ))
        .await;
    assert!(matches!(unsupported, Err(AppError::ValidationError(_))));

    let missing_target = service
        .save_offline(common::offline_support::params(
            EntityClass::WorkOrder,
            SyncAction::Update,
            json!({"title": "no id"}),
        ))
        .await;
    assert!(matches!(missing_target, Err(AppError::ValidationError(_))));

    let wrong_class = service
        .save_attachment(
            EntityClass::WorkOrder,
            AttachmentDraft::new("wo-1", "a.png", "image/png", vec![1]),
        )
        .await;
    assert!(matches!(wrong_class, Err(AppError::ValidationError(_))));

    assert_eq!(service.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn status_subscribers_see_the_pending_count() {
    let engine = setup_engine(test_sync_config(), false).await;
    let mut status = engine.service.subscribe_to_status();

    engine
        .queue(
            EntityClass::WorkOrder,
            SyncAction::UpdateStatus,
            Some("wo-8"),
            json!({"status": "on_hold"}),
        )
        .await;

    let event = status.try_recv().expect("status after enqueue");
    assert_eq!(event.pending_count, 1);
    assert!(!event.network.is_online());
    assert!(!event.syncing);
}
