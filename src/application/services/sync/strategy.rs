use crate::application::ports::{RemoteMethod, RemoteRoute};
use crate::domain::value_objects::{EntityClass, SyncAction};
use crate::shared::error::AppError;

/// Array field holding ids of records from another collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceList {
    pub field: &'static str,
    pub class: EntityClass,
}

/// Scalar field pointing at the owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentReference {
    pub field: &'static str,
    pub class: EntityClass,
}

/// Server-side data fetched once per dependency group and merged into
/// dependent payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSpec {
    pub reference_field: &'static str,
    pub resource: &'static str,
    pub fields: &'static [&'static str],
}

impl ContextSpec {
    pub fn path(&self, id: &str) -> String {
        format!("/{}/{}", self.resource, id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStrategy {
    pub entity_class: EntityClass,
    pub actions: &'static [SyncAction],
    pub parent: Option<ParentReference>,
    pub reference_lists: &'static [ReferenceList],
    pub context: Option<ContextSpec>,
}

const CUSTOMER_REQUEST_CONTEXT: ContextSpec = ContextSpec {
    reference_field: "customerRequestId",
    resource: "customer-requests",
    fields: &["customerName", "customerPhone", "address"],
};

const WORK_ORDER_CONTEXT: ContextSpec = ContextSpec {
    reference_field: "workOrderId",
    resource: "work-orders",
    fields: &["workOrderNumber", "customerName"],
};

const WORK_ORDER_PARENT: ParentReference = ParentReference {
    field: "workOrderId",
    class: EntityClass::WorkOrder,
};

const UPLOAD_ONLY: &[SyncAction] = &[SyncAction::Create];

static WORK_ORDER: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::WorkOrder,
    actions: &[
        SyncAction::Create,
        SyncAction::Update,
        SyncAction::Execute,
        SyncAction::Cancel,
        SyncAction::CompleteSingle,
        SyncAction::CompleteBulk,
        SyncAction::UpdateStatus,
    ],
    parent: None,
    reference_lists: &[
        ReferenceList {
            field: "imageIds",
            class: EntityClass::ExecutionImage,
        },
        ReferenceList {
            field: "attachmentIds",
            class: EntityClass::ExecutionAttachment,
        },
    ],
    context: Some(CUSTOMER_REQUEST_CONTEXT),
};

static WORK_ORDER_DRAFT: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::WorkOrderDraft,
    actions: &[SyncAction::Create, SyncAction::Update, SyncAction::Delete],
    parent: None,
    reference_lists: &[],
    context: Some(CUSTOMER_REQUEST_CONTEXT),
};

static MATERIAL_EQUIPMENT: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::MaterialEquipment,
    actions: &[
        SyncAction::Create,
        SyncAction::Update,
        SyncAction::Delete,
        SyncAction::ToggleActive,
    ],
    parent: Some(WORK_ORDER_PARENT),
    reference_lists: &[],
    context: Some(WORK_ORDER_CONTEXT),
};

static SURVEY: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::Survey,
    actions: &[SyncAction::Create, SyncAction::Update, SyncAction::Delete],
    parent: Some(WORK_ORDER_PARENT),
    reference_lists: &[ReferenceList {
        field: "imageIds",
        class: EntityClass::SurveyImage,
    }],
    context: Some(WORK_ORDER_CONTEXT),
};

static SURVEY_IMAGE: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::SurveyImage,
    actions: UPLOAD_ONLY,
    parent: Some(ParentReference {
        field: "parentId",
        class: EntityClass::Survey,
    }),
    reference_lists: &[],
    context: None,
};

static EXECUTION_IMAGE: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::ExecutionImage,
    actions: UPLOAD_ONLY,
    parent: Some(ParentReference {
        field: "parentId",
        class: EntityClass::WorkOrder,
    }),
    reference_lists: &[],
    context: None,
};

static EXECUTION_ATTACHMENT: SyncStrategy = SyncStrategy {
    entity_class: EntityClass::ExecutionAttachment,
    actions: UPLOAD_ONLY,
    parent: Some(ParentReference {
        field: "parentId",
        class: EntityClass::WorkOrder,
    }),
    reference_lists: &[],
    context: None,
};

/// Replay rules for one entity class.
pub fn strategy_for(class: EntityClass) -> &'static SyncStrategy {
    match class {
        EntityClass::WorkOrder => &WORK_ORDER,
        EntityClass::WorkOrderDraft => &WORK_ORDER_DRAFT,
        EntityClass::MaterialEquipment => &MATERIAL_EQUIPMENT,
        EntityClass::Survey => &SURVEY,
        EntityClass::SurveyImage => &SURVEY_IMAGE,
        EntityClass::ExecutionImage => &EXECUTION_IMAGE,
        EntityClass::ExecutionAttachment => &EXECUTION_ATTACHMENT,
    }
}

impl SyncStrategy {
    pub fn supports(&self, action: SyncAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn ensure_supported(&self, action: SyncAction) -> Result<(), AppError> {
        if self.supports(action) {
            Ok(())
        } else {
            Err(AppError::ValidationError(format!(
                "{} does not support action {}",
                self.entity_class, action
            )))
        }
    }

    /// Endpoint for an operation record. `target` is the entity id for
    /// actions that address a single entity.
    pub fn route(&self, action: SyncAction, target: Option<&str>) -> Result<RemoteRoute, AppError> {
        self.ensure_supported(action)?;
        let resource = self.entity_class.resource();

        if !action.targets_entity() {
            let route = match action {
                SyncAction::CompleteBulk => {
                    RemoteRoute::new(RemoteMethod::Post, format!("/{resource}/complete-bulk"))
                }
                _ => RemoteRoute::new(RemoteMethod::Post, format!("/{resource}")),
            };
            return Ok(route);
        }

        let id = target
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "{} {} requires an entity id",
                    self.entity_class, action
                ))
            })?;

        let route = match action {
            SyncAction::Update => RemoteRoute::new(RemoteMethod::Put, format!("/{resource}/{id}")),
            SyncAction::Execute => {
                RemoteRoute::new(RemoteMethod::Post, format!("/{resource}/{id}/execute"))
            }
            SyncAction::Cancel => {
                RemoteRoute::new(RemoteMethod::Post, format!("/{resource}/{id}/cancel"))
            }
            SyncAction::CompleteSingle => {
                RemoteRoute::new(RemoteMethod::Post, format!("/{resource}/{id}/complete"))
            }
            SyncAction::UpdateStatus => {
                RemoteRoute::new(RemoteMethod::Patch, format!("/{resource}/{id}/status"))
            }
            SyncAction::Delete => {
                RemoteRoute::new(RemoteMethod::Delete, format!("/{resource}/{id}"))
            }
            SyncAction::ToggleActive => {
                RemoteRoute::new(RemoteMethod::Patch, format!("/{resource}/{id}/toggle-active"))
            }
            SyncAction::Create | SyncAction::CompleteBulk => {
                RemoteRoute::new(RemoteMethod::Post, format!("/{resource}"))
            }
        };
        Ok(route)
    }

    pub fn upload_route(&self) -> RemoteRoute {
        RemoteRoute::new(
            RemoteMethod::Post,
            format!("/{}/upload", self.entity_class.resource()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_matching_strategy() {
        for class in EntityClass::SYNC_ORDER {
            let strategy = strategy_for(class);
            assert_eq!(strategy.entity_class, class);
            assert!(strategy.supports(SyncAction::Create));
            if class.is_attachment() {
                assert_eq!(strategy.actions, UPLOAD_ONLY);
            }
        }
    }

    #[test]
    fn routes_follow_the_action() {
        let strategy = strategy_for(EntityClass::WorkOrder);

        let update = strategy.route(SyncAction::Update, Some("42")).unwrap();
        assert_eq!(update.method, RemoteMethod::Put);
        assert_eq!(update.path, "/work-orders/42");

        let status = strategy.route(SyncAction::UpdateStatus, Some("42")).unwrap();
        assert_eq!(status.method, RemoteMethod::Patch);
        assert_eq!(status.path, "/work-orders/42/status");

        let bulk = strategy.route(SyncAction::CompleteBulk, None).unwrap();
        assert_eq!(bulk.method, RemoteMethod::Post);
        assert_eq!(bulk.path, "/work-orders/complete-bulk");

        let create = strategy.route(SyncAction::Create, Some("ignored")).unwrap();
        assert_eq!(create.path, "/work-orders");
    }

    #[test]
    fn unsupported_actions_and_missing_targets_are_rejected() {
        let drafts = strategy_for(EntityClass::WorkOrderDraft);
        assert!(matches!(
            drafts.route(SyncAction::Execute, Some("1")),
            Err(AppError::ValidationError(_))
        ));

        let materials = strategy_for(EntityClass::MaterialEquipment);
        assert!(matches!(
            materials.route(SyncAction::ToggleActive, None),
            Err(AppError::ValidationError(_))
        ));
        let toggle = materials.route(SyncAction::ToggleActive, Some("m-9")).unwrap();
        assert_eq!(toggle.path, "/material-equipment/m-9/toggle-active");
    }

    #[test]
    fn uploads_post_to_the_collection_upload_path() {
        let route = strategy_for(EntityClass::SurveyImage).upload_route();
        assert_eq!(route.method, RemoteMethod::Post);
        assert_eq!(route.path, "/survey-images/upload");
        assert_eq!(
            strategy_for(EntityClass::SurveyImage).parent.map(|p| p.class),
            Some(EntityClass::Survey)
        );
    }
}
